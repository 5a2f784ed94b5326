use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use takt_core::holidays::Holiday;
use takt_core::keys;

const DEFAULT_BASE_URL: &str = "https://date.nager.at/api/v3";

/// One record of the public-holiday feed. The feed is untrusted; only the
/// fields used here are read and each record is validated before merging.
#[derive(Debug, Deserialize)]
struct FeedRecord {
    date: String,
    name: String,
}

pub struct HolidayClient {
    http: reqwest::Client,
    base_url: String,
    country: String,
}

impl HolidayClient {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            country: country.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetches the fixed-holiday list for one year. Any failure (network,
    /// non-2xx status, malformed body) is an error; the caller falls back to
    /// the computed calendar.
    pub async fn fetch(&self, year: i32) -> Result<Vec<Holiday>> {
        let url = format!("{}/PublicHolidays/{}/{}", self.base_url, year, self.country);
        debug!(%url, "fetching holiday feed");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("holiday feed request failed")?
            .error_for_status()
            .context("holiday feed returned an error status")?;
        let records: Vec<FeedRecord> = response
            .json()
            .await
            .context("holiday feed body was not the expected shape")?;
        Ok(validate_records(records))
    }
}

/// Keeps only structurally sound records: a parseable date key and a
/// non-blank name. Rejects are logged, not fatal.
fn validate_records(records: Vec<FeedRecord>) -> Vec<Holiday> {
    records
        .into_iter()
        .filter_map(|record| {
            let name = record.name.trim();
            if name.is_empty() {
                warn!("dropping holiday record with a blank name");
                return None;
            }
            match keys::parse_date_key(&record.date) {
                Some(date) => Some(Holiday {
                    name: name.to_string(),
                    date,
                }),
                None => {
                    warn!(date = %record.date, "dropping holiday record with a malformed date");
                    None
                }
            }
        })
        .collect()
}
