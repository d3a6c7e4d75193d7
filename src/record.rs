//! The 12-field interchange record shared by the fetcher (writer) and the
//! importer (reader). One TSV line per film, no header row, fields in the
//! fixed order below.

use anyhow::{bail, Context, Result};
use csv::StringRecord;

/// Number of tab-separated fields per interchange line.
pub const FIELD_COUNT: usize = 12;

/// Metascore stand-in stored when the metadata source reports "N/A".
pub const META_SCORE_DEFAULT: i64 = 80;

/// Sentinel the metadata source uses for an absent Metascore.
pub const META_SCORE_SENTINEL: &str = "N/A";

#[derive(Debug, Clone, PartialEq)]
pub struct FilmRecord {
    pub ranking: i64,
    pub ttcode: String,
    pub title: String,
    pub year: i64,
    /// Comma+space separated genre names; may be empty.
    pub genres: String,
    /// Comma+space separated director names; may be empty.
    pub directors: String,
    /// Comma+space separated actor names; may be empty.
    pub actors: String,
    pub plot: String,
    pub poster_url: String,
    /// Single primary-language name.
    pub language: String,
    pub imdb_rating: f64,
    /// None carries the "N/A" sentinel; the importer substitutes
    /// [`META_SCORE_DEFAULT`] at insert time.
    pub meta_score: Option<i64>,
}

impl FilmRecord {
    /// Parse one raw TSV record. Wrong field count or non-numeric
    /// ranking/year/rating/metascore is an error; the importer treats that as
    /// fatal for the whole run.
    pub fn from_fields(raw: &StringRecord, line: usize) -> Result<Self> {
        if raw.len() != FIELD_COUNT {
            bail!(
                "line {line}: expected {FIELD_COUNT} tab-separated fields, found {}",
                raw.len()
            );
        }

        let field = |idx: usize| raw.get(idx).unwrap_or_default();

        let ranking: i64 = field(0)
            .parse()
            .with_context(|| format!("line {line}: invalid ranking {:?}", field(0)))?;
        let year: i64 = field(3)
            .parse()
            .with_context(|| format!("line {line}: invalid year {:?}", field(3)))?;
        let imdb_rating: f64 = field(10)
            .parse()
            .with_context(|| format!("line {line}: invalid rating {:?}", field(10)))?;
        let meta_score = parse_meta_score(field(11))
            .with_context(|| format!("line {line}: invalid metascore {:?}", field(11)))?;

        Ok(Self {
            ranking,
            ttcode: field(1).to_string(),
            title: field(2).to_string(),
            year,
            genres: field(4).to_string(),
            directors: field(5).to_string(),
            actors: field(6).to_string(),
            plot: field(7).to_string(),
            poster_url: field(8).to_string(),
            language: field(9).to_string(),
            imdb_rating,
            meta_score,
        })
    }

    /// Field values in line order, for the csv writer. The metascore sentinel
    /// is written through verbatim; only the importer substitutes it.
    pub fn to_fields(&self) -> Vec<String> {
        vec![
            self.ranking.to_string(),
            self.ttcode.clone(),
            self.title.clone(),
            self.year.to_string(),
            self.genres.clone(),
            self.directors.clone(),
            self.actors.clone(),
            self.plot.clone(),
            self.poster_url.clone(),
            self.language.clone(),
            self.imdb_rating.to_string(),
            self.meta_score
                .map(|m| m.to_string())
                .unwrap_or_else(|| META_SCORE_SENTINEL.to_string()),
        ]
    }
}

fn parse_meta_score(raw: &str) -> Result<Option<i64>> {
    if raw.contains(META_SCORE_SENTINEL) {
        return Ok(None);
    }
    Ok(Some(raw.parse()?))
}

/// Split a comma+space separated name list. A blank field yields no names at
/// all (zero auxiliary links), never an empty-named entity.
pub fn split_names(list: &str) -> Vec<&str> {
    if list.trim().is_empty() {
        return Vec::new();
    }
    list.split(", ").collect()
}
