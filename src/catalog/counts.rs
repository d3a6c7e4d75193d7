//! Quick row-count diagnostic for the catalogue tables.

use anyhow::Result;

use crate::catalog::Db;

pub struct CatalogCounts {
    pub films: i64,
    pub people: i64,
    pub genres: i64,
    pub languages: i64,
    pub genre_links: i64,
    pub director_links: i64,
    pub actor_links: i64,
}

pub async fn gather(db: &Db) -> Result<CatalogCounts> {
    async fn count(db: &Db, sql: &str) -> Result<i64> {
        Ok(sqlx::query_scalar(sql).fetch_one(&db.pool).await?)
    }

    Ok(CatalogCounts {
        films: count(db, "SELECT count(*) FROM films").await?,
        people: count(db, "SELECT count(*) FROM people").await?,
        genres: count(db, "SELECT count(*) FROM genres").await?,
        languages: count(db, "SELECT count(*) FROM languages").await?,
        genre_links: count(db, "SELECT count(*) FROM film_genres").await?,
        director_links: count(db, "SELECT count(*) FROM film_directors").await?,
        actor_links: count(db, "SELECT count(*) FROM film_actors").await?,
    })
}

pub async fn run(db: &Db) -> Result<()> {
    let c = gather(db).await?;

    use std::fmt::Write as _;
    let mut out = String::new();
    writeln!(out, "CATALOGUE COUNTS:").ok();
    writeln!(out, "films: {}", c.films).ok();
    writeln!(out, "people: {}", c.people).ok();
    writeln!(out, "genres: {}", c.genres).ok();
    writeln!(out, "languages: {}", c.languages).ok();
    writeln!(
        out,
        "links: genres {}, directors {}, actors {}",
        c.genre_links, c.director_links, c.actor_links
    )
    .ok();
    println!("{}", out);
    Ok(())
}
