use std::collections::BTreeSet;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use ureq::Agent;

use crate::base::PartitionDate;

/// Location whose estimate gets attached to every enriched row.
pub const TARGET_LOCATION: &str = "Iasi";

const API_TIMEOUT: Duration = Duration::from_secs(10);

/// Date to estimate, built once per run and read-only afterwards.
pub type EstimateMap = im::HashMap<PartitionDate, i64>;

#[derive(Debug, Deserialize)]
pub struct DayReport {
    pub locations: Vec<LocationEstimate>,
}

#[derive(Debug, Deserialize)]
pub struct LocationEstimate {
    pub name: String,
    pub estimate: f64,
}

#[derive(Error, Debug)]
pub enum EstimateError {
    #[error("no 'Iasi' entry in response for date={0}")]
    MissingLocation(PartitionDate),

    #[error("invalid request date: {0}")]
    InvalidDate(String),

    #[error("estimate API returned status {status} for date={date}")]
    Api { date: PartitionDate, status: u16 },

    #[error("estimate API request failed for date={date}: {source}")]
    Http {
        date: PartitionDate,
        source: Box<ureq::Error>,
    },
}

pub trait EstimateSource {
    fn lookup(&self, date: &PartitionDate) -> Result<DayReport, EstimateError>;
}

/// Resolve one estimate per unique date across all datasets in the run.
///
/// Upstream calls are bounded by the number of unique dates no matter how
/// many objects or datasets reference them. Missing target location fails
/// the whole run, before any enrichment writes.
pub fn build_estimate_map<'a, I>(
    dates: I,
    source: &dyn EstimateSource,
) -> Result<EstimateMap, EstimateError>
where
    I: IntoIterator<Item = &'a PartitionDate>,
{
    let unique: BTreeSet<&PartitionDate> = dates.into_iter().collect();
    let mut estimates = EstimateMap::new();

    for date in unique {
        info!(date = date.as_str(), "fetching estimates");
        let report = source.lookup(date)?;
        let entry = report
            .locations
            .iter()
            .find(|location| location.name.eq_ignore_ascii_case(TARGET_LOCATION))
            .ok_or_else(|| EstimateError::MissingLocation(date.clone()))?;
        estimates.insert(date.clone(), entry.estimate as i64);
    }

    Ok(estimates)
}

/// Bearer-authenticated client for the upstream estimate API. Transient
/// retry policy is the service's concern, not ours; requests carry a global
/// timeout only.
pub struct HttpEstimateSource {
    agent: Agent,
    url: String,
    token: String,
}

impl HttpEstimateSource {
    pub fn new(url: String, token: String) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(API_TIMEOUT))
            .build()
            .into();
        HttpEstimateSource { agent, url, token }
    }
}

impl EstimateSource for HttpEstimateSource {
    fn lookup(&self, date: &PartitionDate) -> Result<DayReport, EstimateError> {
        validate_date(date)?;

        let response = self
            .agent
            .get(&self.url)
            .header("Authorization", &format!("Bearer {}", self.token))
            .query("date", date.as_str())
            .call();

        match response {
            Ok(mut response) => response
                .body_mut()
                .read_json::<DayReport>()
                .map_err(|source| EstimateError::Http {
                    date: date.clone(),
                    source: Box::new(source),
                }),
            Err(ureq::Error::StatusCode(status)) => Err(EstimateError::Api {
                date: date.clone(),
                status,
            }),
            Err(source) => Err(EstimateError::Http {
                date: date.clone(),
                source: Box::new(source),
            }),
        }
    }
}

fn validate_date(date: &PartitionDate) -> Result<(), EstimateError> {
    let bytes = date.as_str().as_bytes();
    let well_formed = bytes.len() == 10
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| if matches!(i, 4 | 7) { *b == b'-' } else { b.is_ascii_digit() });
    if well_formed {
        Ok(())
    } else {
        Err(EstimateError::InvalidDate(date.as_str().to_string()))
    }
}
