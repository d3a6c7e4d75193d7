//! Importer: loads an interchange TSV into the catalogue, skipping films that
//! are already present by title and lazily materializing the auxiliary
//! entities each line references.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::catalog::{ensure_language, resolve_names, AuxKind, Db};
use crate::record::{FilmRecord, META_SCORE_DEFAULT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Imported,
    AlreadyPresent,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ImportSummary {
    pub added: usize,
    pub skipped: usize,
}

/// Import one parsed record. Duplicate titles are skipped, everything else
/// runs inside a single transaction so a failed film insert cannot strand a
/// partially created set of auxiliary entities.
pub async fn import_line(db: &Db, record: &FilmRecord) -> Result<LineOutcome> {
    if db.film_exists(&record.title).await? {
        return Ok(LineOutcome::AlreadyPresent);
    }

    let mut tx = db.pool.begin().await?;

    let genre_ids = resolve_names(&mut tx, AuxKind::Genre, &record.genres).await?;
    let director_ids = resolve_names(&mut tx, AuxKind::Person, &record.directors).await?;
    let actor_ids = resolve_names(&mut tx, AuxKind::Person, &record.actors).await?;
    let language_id = ensure_language(&mut tx, &record.language).await?;

    let meta_score = record.meta_score.unwrap_or(META_SCORE_DEFAULT);
    let film_id = sqlx::query(
        "INSERT INTO films
             (title, ttcode, ranking, imdb_rating, meta_score, year, plot, poster_url, language_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(&record.title)
    .bind(&record.ttcode)
    .bind(record.ranking)
    .bind(record.imdb_rating)
    .bind(meta_score)
    .bind(record.year)
    .bind(&record.plot)
    .bind(&record.poster_url)
    .bind(language_id)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for genre_id in &genre_ids {
        sqlx::query("INSERT INTO film_genres (film_id, genre_id) VALUES (?1, ?2)")
            .bind(film_id)
            .bind(genre_id)
            .execute(&mut *tx)
            .await?;
    }
    for person_id in &director_ids {
        sqlx::query("INSERT INTO film_directors (film_id, person_id) VALUES (?1, ?2)")
            .bind(film_id)
            .bind(person_id)
            .execute(&mut *tx)
            .await?;
    }
    for person_id in &actor_ids {
        sqlx::query("INSERT INTO film_actors (film_id, person_id) VALUES (?1, ?2)")
            .bind(film_id)
            .bind(person_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(LineOutcome::Imported)
}

/// Import every line of the reader in order. Parse or type-conversion
/// failures abort the remaining import; lines committed before the failure
/// stay committed.
pub async fn run_from_reader<R: Read + Send>(db: &Db, reader: R) -> Result<ImportSummary> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut summary = ImportSummary::default();
    let mut line = 0usize;
    for raw in rdr.records() {
        line += 1;
        let raw = raw.with_context(|| format!("failed to read line {line}"))?;
        let record = FilmRecord::from_fields(&raw, line)?;
        match import_line(db, &record).await? {
            LineOutcome::Imported => {
                summary.added += 1;
                info!("{:3} - added the film \"{}\"", summary.added, record.title);
            }
            LineOutcome::AlreadyPresent => {
                summary.skipped += 1;
                info!(title = %record.title, "film already in the catalogue; skipping");
            }
        }
    }
    info!(
        added = summary.added,
        skipped = summary.skipped,
        "import complete"
    );
    Ok(summary)
}

/// Import an interchange file from disk.
pub async fn run(db: &Db, path: &Path) -> Result<ImportSummary> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    run_from_reader(db, file).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE_LINE: &str = "5\ttt9999999\tSample Film\t2005\tComedy\tJ. Doe\tA. One, A. Two\tA plot.\thttp://x/p.jpg\tEnglish\t7.5\t65\n";

    async fn memory_db() -> Db {
        Db::connect("sqlite::memory:").await.unwrap()
    }

    async fn count(db: &Db, sql: &str) -> i64 {
        sqlx::query_scalar(sql).fetch_one(&db.pool).await.unwrap()
    }

    #[tokio::test]
    async fn imports_the_sample_line() {
        let db = memory_db().await;
        let summary = run_from_reader(&db, Cursor::new(SAMPLE_LINE)).await.unwrap();
        assert_eq!(summary.added, 1);
        assert_eq!(summary.skipped, 0);

        assert_eq!(count(&db, "SELECT count(*) FROM films").await, 1);
        assert_eq!(count(&db, "SELECT count(*) FROM genres").await, 1);
        assert_eq!(count(&db, "SELECT count(*) FROM people").await, 3);
        assert_eq!(count(&db, "SELECT count(*) FROM languages").await, 1);
        assert_eq!(count(&db, "SELECT count(*) FROM film_directors").await, 1);
        assert_eq!(count(&db, "SELECT count(*) FROM film_actors").await, 2);

        let (year, meta, ranking): (i64, i64, i64) = sqlx::query_as(
            "SELECT year, meta_score, ranking FROM films WHERE title = 'Sample Film'",
        )
        .fetch_one(&db.pool)
        .await
        .unwrap();
        assert_eq!((year, meta, ranking), (2005, 65, 5));
    }

    #[tokio::test]
    async fn import_is_idempotent_by_title() {
        let db = memory_db().await;
        let two_lines = format!(
            "{SAMPLE_LINE}2\ttt0000002\tOther Film\t1999\tDrama\tJ. Doe\tB. One\tx\t\tFrench\t8.1\tN/A\n"
        );

        let first = run_from_reader(&db, Cursor::new(two_lines.clone()))
            .await
            .unwrap();
        assert_eq!(first.added, 2);

        let second = run_from_reader(&db, Cursor::new(two_lines)).await.unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(count(&db, "SELECT count(*) FROM films").await, 2);
        assert_eq!(count(&db, "SELECT count(*) FROM film_genres").await, 2);
    }

    #[tokio::test]
    async fn metascore_sentinel_imports_as_default() {
        let db = memory_db().await;
        let line = "1\ttt0000001\tOld Film\t1950\tDrama\tJ. Doe\tB. One\tx\t\tEnglish\t8.0\tN/A\n";
        run_from_reader(&db, Cursor::new(line)).await.unwrap();

        let meta: i64 = sqlx::query_scalar("SELECT meta_score FROM films WHERE title = 'Old Film'")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(meta, META_SCORE_DEFAULT);
    }

    #[tokio::test]
    async fn existing_entities_are_reused_and_all_links_attached() {
        let db = memory_db().await;
        {
            let mut conn = db.pool.acquire().await.unwrap();
            crate::catalog::ensure_genre(&mut conn, "Comedy").await.unwrap();
            crate::catalog::ensure_person(&mut conn, "A. One").await.unwrap();
        }

        let line = "1\ttt0000001\tLinked Film\t2000\tComedy, Drama\tJ. Doe\tA. One, A. Two\tx\t\tEnglish\t7.0\t50\n";
        run_from_reader(&db, Cursor::new(line)).await.unwrap();

        // one of two genres and one of two actors pre-existed: only the
        // missing ones are created, but every link is attached
        assert_eq!(count(&db, "SELECT count(*) FROM genres").await, 2);
        assert_eq!(count(&db, "SELECT count(*) FROM people").await, 3);
        assert_eq!(count(&db, "SELECT count(*) FROM film_genres").await, 2);
        assert_eq!(count(&db, "SELECT count(*) FROM film_actors").await, 2);
    }

    #[tokio::test]
    async fn blank_aux_fields_attach_zero_links() {
        let db = memory_db().await;
        let line = "1\ttt0000001\tBare Film\t2000\t\t\t\tx\t\tEnglish\t7.0\t50\n";
        run_from_reader(&db, Cursor::new(line)).await.unwrap();

        assert_eq!(count(&db, "SELECT count(*) FROM films").await, 1);
        assert_eq!(count(&db, "SELECT count(*) FROM genres").await, 0);
        assert_eq!(count(&db, "SELECT count(*) FROM people").await, 0);
        assert_eq!(count(&db, "SELECT count(*) FROM film_genres").await, 0);
    }

    #[tokio::test]
    async fn malformed_line_aborts_but_keeps_prior_commits() {
        let db = memory_db().await;
        let lines = format!("{SAMPLE_LINE}2\ttt0000002\tBroken Film\tnot-a-year\n");

        let err = run_from_reader(&db, Cursor::new(lines)).await.unwrap_err();
        assert!(err.to_string().contains("line 2"));

        // the first line was committed before the failure and stays
        assert_eq!(count(&db, "SELECT count(*) FROM films").await, 1);
    }

    #[tokio::test]
    async fn duplicate_names_on_a_line_attach_duplicate_links() {
        let db = memory_db().await;
        let line = "1\ttt0000001\tDouble Film\t2000\tDrama\tJ. Doe\tA. One, A. One\tx\t\tEnglish\t7.0\t50\n";
        run_from_reader(&db, Cursor::new(line)).await.unwrap();

        assert_eq!(count(&db, "SELECT count(*) FROM people").await, 2);
        assert_eq!(count(&db, "SELECT count(*) FROM film_actors").await, 2);
    }

    #[tokio::test]
    async fn director_and_actor_share_one_person_row() {
        let db = memory_db().await;
        let line = "1\ttt0000001\tAuteur Film\t2000\tDrama\tC. Eastwood\tC. Eastwood\tx\t\tEnglish\t7.9\t70\n";
        run_from_reader(&db, Cursor::new(line)).await.unwrap();

        assert_eq!(count(&db, "SELECT count(*) FROM people").await, 1);
        assert_eq!(count(&db, "SELECT count(*) FROM film_directors").await, 1);
        assert_eq!(count(&db, "SELECT count(*) FROM film_actors").await, 1);
    }
}
