//! Get-or-create helpers for the auxiliary catalogue entities. All of them
//! take a plain connection so the importer's per-line transaction covers the
//! lookups and the creates together.

use anyhow::Result;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use crate::record::split_names;

/// Which auxiliary table a comma+space name list resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxKind {
    Genre,
    Person,
}

/// Lowercase-hyphenated slug for an entity name, unique per table because the
/// name itself is unique.
pub fn slugify(input: &str) -> String {
    let mut slug = String::new();
    let mut last_dash = false;
    for ch in input.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
            last_dash = false;
        } else if !last_dash && !slug.is_empty() {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

async fn ensure_named(conn: &mut SqliteConnection, table: &'static str, name: &str) -> Result<i64> {
    let select = format!("SELECT id FROM {table} WHERE name = ?1");
    if let Some(row) = sqlx::query(&select)
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?
    {
        let id: i64 = row.get("id");
        debug!(table, name, id, "entity exists");
        return Ok(id);
    }
    let insert = format!("INSERT INTO {table} (name, slug) VALUES (?1, ?2)");
    let res = sqlx::query(&insert)
        .bind(name)
        .bind(slugify(name))
        .execute(&mut *conn)
        .await?;
    let id = res.last_insert_rowid();
    debug!(table, name, id, "entity created");
    Ok(id)
}

pub async fn ensure_genre(conn: &mut SqliteConnection, name: &str) -> Result<i64> {
    ensure_named(conn, "genres", name).await
}

pub async fn ensure_person(conn: &mut SqliteConnection, name: &str) -> Result<i64> {
    ensure_named(conn, "people", name).await
}

pub async fn ensure_language(conn: &mut SqliteConnection, name: &str) -> Result<i64> {
    ensure_named(conn, "languages", name).await
}

/// Resolve or create every entity in a comma+space name list, returning ids
/// in input order. Duplicate names yield duplicate ids (no dedup within the
/// call); a blank list yields no ids at all.
pub async fn resolve_names(
    conn: &mut SqliteConnection,
    kind: AuxKind,
    list: &str,
) -> Result<Vec<i64>> {
    let mut ids = Vec::new();
    for name in split_names(list) {
        let id = match kind {
            AuxKind::Genre => ensure_genre(conn, name).await?,
            AuxKind::Person => ensure_person(conn, name).await?,
        };
        ids.push(id);
    }
    Ok(ids)
}
