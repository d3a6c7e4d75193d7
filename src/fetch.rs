//! Fetcher: scrapes the ranked top-100 list, enriches every title from the
//! OMDb API, and writes the interchange TSV consumed by the importer.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::record::FilmRecord;
use crate::util::env as env_util;

/// Fixed output filename in the working directory.
pub const OUTPUT_FILENAME: &str = "top_100_films.tsv";

/// How many ranked titles to keep from the top of the list page.
pub const TOP_LIST_LEN: usize = 100;

const DEFAULT_TOP_LIST_URL: &str = "https://www.imdb.com/chart/top/";
const DEFAULT_OMDB_API_URL: &str = "http://www.omdbapi.com/";

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub top_list_url: String,
    pub omdb_api_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl FetcherConfig {
    /// Read config from the environment. Only OMDB_API_KEY is required; the
    /// endpoints and HTTP tuning all have defaults.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            top_list_url: env_util::env_opt("TOP_LIST_URL")
                .unwrap_or_else(|| DEFAULT_TOP_LIST_URL.to_string()),
            omdb_api_url: env_util::env_opt("OMDB_API_URL")
                .unwrap_or_else(|| DEFAULT_OMDB_API_URL.to_string()),
            api_key: env_util::env_req("OMDB_API_KEY")?,
            timeout_secs: env_util::env_parse("HTTP_TIMEOUT_SECS", 15),
            max_retries: env_util::env_parse("HTTP_MAX_RETRIES", 3),
        })
    }
}

/// Per-title payload from the OMDb API. All values arrive as strings; the
/// `Response` flag signals absence of data for an id, which is expected and
/// not an error.
#[derive(Debug, Clone, Deserialize)]
pub struct OmdbPayload {
    #[serde(rename = "Response")]
    pub response: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Year", default)]
    pub year: String,
    #[serde(rename = "Genre", default)]
    pub genre: String,
    #[serde(rename = "Director", default)]
    pub director: String,
    #[serde(rename = "Actors", default)]
    pub actors: String,
    #[serde(rename = "Plot", default)]
    pub plot: String,
    #[serde(rename = "Poster", default)]
    pub poster: String,
    #[serde(rename = "Language", default)]
    pub language: String,
    #[serde(rename = "imdbRating", default)]
    pub imdb_rating: String,
    #[serde(rename = "Metascore", default)]
    pub metascore: String,
}

impl OmdbPayload {
    pub fn is_present(&self) -> bool {
        self.response != "False"
    }

    /// Typed interchange record for this payload at the given rank.
    pub fn into_record(self, ranking: i64, ttcode: &str) -> Result<FilmRecord> {
        let year: i64 = self
            .year
            .parse()
            .with_context(|| format!("{ttcode}: unparsable year {:?}", self.year))?;
        let imdb_rating: f64 = self
            .imdb_rating
            .parse()
            .with_context(|| format!("{ttcode}: unparsable rating {:?}", self.imdb_rating))?;
        let meta_score = if self.metascore.contains(crate::record::META_SCORE_SENTINEL) {
            None
        } else {
            Some(self.metascore.parse().with_context(|| {
                format!("{ttcode}: unparsable metascore {:?}", self.metascore)
            })?)
        };

        Ok(FilmRecord {
            ranking,
            ttcode: ttcode.to_string(),
            title: self.title,
            year,
            genres: self.genre,
            directors: self.director,
            actors: self.actors,
            plot: self.plot,
            poster_url: self.poster,
            language: self.language,
            imdb_rating,
            meta_score,
        })
    }
}

pub struct TopFilmsFetcher {
    cfg: FetcherConfig,
    http: Client,
}

impl TopFilmsFetcher {
    pub fn new(cfg: FetcherConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent("top-films/0.1")
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self { cfg, http })
    }

    /// GET with up to `max_retries` sequential attempts. Transport errors are
    /// retried; exhausting the attempts aborts the whole run.
    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response> {
        let max = self.cfg.max_retries.max(1);
        for attempt in 1..=max {
            match self.http.get(url).send().await {
                Ok(resp) => return Ok(resp),
                Err(err) if attempt < max => {
                    warn!(attempt, error = %err, "URL connection failure; retrying");
                }
                Err(err) => {
                    return Err(anyhow!(err)).with_context(|| {
                        format!(
                            "could not fetch {url} after {max} attempts; \
                             please check your internet connection"
                        )
                    });
                }
            }
        }
        unreachable!("retry loop always returns");
    }

    /// Retrieve the ranking page and extract the first [`TOP_LIST_LEN`] title
    /// codes in page order. Zero extracted codes means the page markup has
    /// drifted and the run must abort.
    pub async fn fetch_ranked_ids(&self) -> Result<Vec<String>> {
        let resp = self.get_with_retry(&self.cfg.top_list_url).await?;
        let html = resp.text().await.context("failed to read ranking page body")?;
        let codes = extract_title_codes(&html, TOP_LIST_LEN)?;
        if codes.is_empty() {
            bail!(
                "no title codes found at {}; the ranking page markup may have changed",
                self.cfg.top_list_url
            );
        }
        Ok(codes)
    }

    /// Query the OMDb endpoint for one title. `Response == "False"` means the
    /// source has no data for this id: the title is omitted, not an error.
    pub async fn fetch_metadata(&self, ttcode: &str) -> Result<Option<OmdbPayload>> {
        let url = format!(
            "{}?apikey={}&i={}",
            self.cfg.omdb_api_url.trim_end_matches('/'),
            self.cfg.api_key,
            ttcode
        );
        let resp = self.get_with_retry(&url).await?;
        let payload: OmdbPayload = resp
            .json()
            .await
            .with_context(|| format!("invalid OMDb response body for {ttcode}"))?;
        if !payload.is_present() {
            return Ok(None);
        }
        Ok(Some(payload))
    }

    /// Full fetch: ranked codes, per-title metadata in rank order with
    /// progress reporting, then the TSV. Returns the number of lines written.
    pub async fn run(&self, out_path: &Path) -> Result<usize> {
        info!("fetching top {} title codes", TOP_LIST_LEN);
        let codes = self.fetch_ranked_ids().await?;
        info!(count = codes.len(), "title codes extracted; querying metadata");

        let mut items: Vec<(String, Option<OmdbPayload>)> = Vec::with_capacity(codes.len());
        for (pos, code) in codes.iter().enumerate() {
            info!("{:3}/{} {}", pos + 1, codes.len(), code);
            let payload = self.fetch_metadata(code).await?;
            if payload.is_none() {
                warn!(ttcode = %code, "metadata source has no data for title; omitting");
            }
            items.push((code.clone(), payload));
        }

        let records = ranked_records(items)?;
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .from_path(out_path)
            .with_context(|| format!("failed to open {}", out_path.display()))?;
        for rec in &records {
            wtr.write_record(rec.to_fields())?;
        }
        wtr.flush()?;
        info!(
            written = records.len(),
            path = %out_path.display(),
            "interchange file written"
        );
        Ok(records.len())
    }
}

/// Structural extraction of title codes from the ranking markup: one
/// `td.titleColumn` cell per ranked title, each linking to `/tt<digits>/`.
pub fn extract_title_codes(html: &str, limit: usize) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("td.titleColumn a")
        .map_err(|e| anyhow!("invalid title selector: {e}"))?;
    let code_re = Regex::new(r"/(tt\d+)/")?;

    let mut codes = Vec::new();
    for anchor in document.select(&anchors) {
        if codes.len() == limit {
            break;
        }
        if let Some(href) = anchor.value().attr("href") {
            if let Some(cap) = code_re.captures(href) {
                codes.push(cap[1].to_string());
            }
        }
    }
    Ok(codes)
}

/// Assign gap-free rankings 1..K over the titles that have metadata, in page
/// order. A skipped title does not consume a rank slot, so the written ranking
/// column stays sequential even when ids are omitted upstream.
pub fn ranked_records(items: Vec<(String, Option<OmdbPayload>)>) -> Result<Vec<FilmRecord>> {
    let mut records = Vec::new();
    let mut rank: i64 = 1;
    for (ttcode, payload) in items {
        if let Some(payload) = payload {
            records.push(payload.into_record(rank, &ttcode)?);
            rank += 1;
        }
    }
    Ok(records)
}
