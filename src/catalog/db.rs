use std::str::FromStr;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

const SCHEMA: &str = include_str!("schema.sql");

/// Explicit storage handle for the film catalogue. Passed into the importer
/// and diagnostics entry points instead of any ambient connection state.
#[derive(Clone)]
pub struct Db {
    pub pool: SqlitePool,
}

impl Db {
    /// Open (creating if missing) the sqlite catalogue and ensure the schema.
    /// The pool is capped at one connection: both pipeline stages are
    /// single-writer batch runs and sqlite gains nothing from more.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        info!("catalogue connected, schema ensured");
        Ok(Self { pool })
    }

    /// Whether a film with this exact title is already catalogued.
    pub async fn film_exists(&self, title: &str) -> Result<bool> {
        let n: i64 = sqlx::query_scalar("SELECT count(*) FROM films WHERE title = ?1")
            .bind(title)
            .fetch_one(&self.pool)
            .await?;
        Ok(n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_applies_schema_idempotently() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        // second application of the DDL must be a no-op
        sqlx::raw_sql(SCHEMA).execute(&db.pool).await.unwrap();
        let films: i64 = sqlx::query_scalar("SELECT count(*) FROM films")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(films, 0);
    }

    #[tokio::test]
    async fn film_exists_matches_exact_title() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        sqlx::query("INSERT INTO languages (name, slug) VALUES ('English', 'english')")
            .execute(&db.pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO films (title, ttcode, ranking, imdb_rating, meta_score, year, language_id)
             VALUES ('Metropolis', 'tt0017136', 1, 8.3, 98, 1927, 1)",
        )
        .execute(&db.pool)
        .await
        .unwrap();

        assert!(db.film_exists("Metropolis").await.unwrap());
        assert!(!db.film_exists("metropolis").await.unwrap());
        assert!(!db.film_exists("Metropolis ").await.unwrap());
    }
}
