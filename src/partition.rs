use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::base::{ObjectKey, PartitionDate};

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"date=(\d{4}-\d{2}-\d{2})/").expect("invalid date pattern"));

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("could not extract date from key: {0}")]
    MalformedKey(ObjectKey),

    #[error("key has no path separator: {0}")]
    NoSeparator(ObjectKey),
}

/// Pull the `date=YYYY-MM-DD/` segment out of an object key.
///
/// Pattern match only; `2024-02-30` passes. A key without the segment is a
/// hard error, never skipped.
pub fn extract_date(key: &ObjectKey) -> Result<PartitionDate, KeyError> {
    match DATE_RE.captures(key.as_str()) {
        Some(caps) => Ok(PartitionDate::new(&caps[1])),
        None => Err(KeyError::MalformedKey(key.clone())),
    }
}

/// The key with its dataset-root segment removed, mirrored verbatim at the
/// destination prefix.
pub fn relative_suffix(key: &ObjectKey) -> Result<&str, KeyError> {
    key.as_str()
        .split_once('/')
        .map(|(_, rest)| rest)
        .ok_or_else(|| KeyError::NoSeparator(key.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_date_from_partitioned_key() {
        let key = ObjectKey::new("weather_partitioned/date=2022-04-01/part-0000.csv");
        let date = extract_date(&key).unwrap();
        assert_eq!(date.as_str(), "2022-04-01");
    }

    #[test]
    fn extracts_date_from_nested_key() {
        let key = ObjectKey::new("datasets/raw/date=2024-12-31/hour=03/rows.csv");
        let date = extract_date(&key).unwrap();
        assert_eq!(date.as_str(), "2024-12-31");
    }

    #[test]
    fn accepts_non_calendar_date() {
        let key = ObjectKey::new("weather_partitioned/date=2024-02-30/part-0000.csv");
        let date = extract_date(&key).unwrap();
        assert_eq!(date.as_str(), "2024-02-30");
    }

    #[test]
    fn rejects_key_without_date_segment() {
        let key = ObjectKey::new("weather_partitioned/2022-04-01/part-0000.csv");
        assert!(matches!(
            extract_date(&key),
            Err(KeyError::MalformedKey(_))
        ));
    }

    #[test]
    fn rejects_date_segment_without_trailing_separator() {
        let key = ObjectKey::new("weather_partitioned/date=2022-04-01");
        assert!(extract_date(&key).is_err());
    }

    #[test]
    fn suffix_strips_dataset_root() {
        let key = ObjectKey::new("weather_partitioned/date=2022-04-01/part-0000.csv");
        assert_eq!(
            relative_suffix(&key).unwrap(),
            "date=2022-04-01/part-0000.csv"
        );
    }

    #[test]
    fn suffix_requires_separator() {
        let key = ObjectKey::new("loose-object.csv");
        assert!(matches!(
            relative_suffix(&key),
            Err(KeyError::NoSeparator(_))
        ));
    }
}
