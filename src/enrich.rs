use std::io::Cursor;
use std::string::FromUtf8Error;
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array};
use arrow::csv;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use thiserror::Error;
use tracing::info;

use crate::base::{Bucket, ObjectKey, PartitionDate};
use crate::estimate::EstimateMap;
use crate::partition::{self, KeyError};
use crate::store::{ObjectStore, StoreError};

/// Column appended to every enriched object.
pub const ESTIMATE_COLUMN: &str = "tourist_estimate";

const BATCH_SIZE: usize = 2048 * 10;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("missing estimate for date={date} (key={key})")]
    MissingEstimate {
        date: PartitionDate,
        key: ObjectKey,
    },

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("object {key} is not valid utf-8: {source}")]
    Encoding {
        key: ObjectKey,
        source: FromUtf8Error,
    },

    #[error(transparent)]
    Arrow(#[from] ArrowError),
}

/// Destination key for a source object: the destination prefix plus the
/// source key with its dataset-root segment stripped.
pub fn destination_key(key: &ObjectKey, destination_prefix: &str) -> Result<ObjectKey, KeyError> {
    let suffix = partition::relative_suffix(key)?;
    Ok(ObjectKey::new(format!(
        "{}/{}",
        destination_prefix.trim_end_matches('/'),
        suffix
    )))
}

/// Rewrite one object with the date's estimate appended as a uniform column.
///
/// The destination key is derived deterministically from the source key and
/// the output bytes from the input bytes plus the map, so reruns overwrite
/// the destination with identical content. A date absent from the map is an
/// invariant violation, not a retry case.
pub fn enrich_object(
    store: &dyn ObjectStore,
    bucket: &Bucket,
    key: &ObjectKey,
    date: &PartitionDate,
    destination_prefix: &str,
    estimates: &EstimateMap,
) -> Result<usize, EnrichError> {
    let estimate = *estimates
        .get(date)
        .ok_or_else(|| EnrichError::MissingEstimate {
            date: date.clone(),
            key: key.clone(),
        })?;
    let target = destination_key(key, destination_prefix)?;

    let bytes = store.get(bucket, key)?;
    let text = String::from_utf8(bytes).map_err(|source| EnrichError::Encoding {
        key: key.clone(),
        source,
    })?;

    let (enriched, rows) = append_estimate_column(text.into_bytes(), estimate)?;
    store.put(bucket, &target, &enriched)?;
    info!(key = target.as_str(), rows, "wrote enriched object");
    Ok(rows)
}

fn append_estimate_column(bytes: Vec<u8>, estimate: i64) -> Result<(Vec<u8>, usize), ArrowError> {
    let reader = csv::ReaderBuilder::new()
        .infer_schema(Some(BATCH_SIZE))
        .with_batch_size(BATCH_SIZE)
        .has_header(true)
        .build(Cursor::new(bytes))?;

    let schema = reader.schema();
    let mut fields = schema.fields().clone();
    fields.push(Field::new(ESTIMATE_COLUMN, DataType::Int64, false));
    let enriched_schema = Arc::new(Schema::new(fields));

    let mut rows = 0;
    let mut out = Vec::new();
    {
        let mut writer = csv::Writer::new(&mut out);
        for batch in reader {
            let batch = batch?;
            let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
            columns.push(Arc::new(Int64Array::from(vec![estimate; batch.num_rows()])) as ArrayRef);
            let enriched = RecordBatch::try_new(enriched_schema.clone(), columns)?;
            writer.write(&enriched)?;
            rows += batch.num_rows();
        }
    }

    // Header-only source: the writer saw no batches, so emit the enriched
    // header by hand to keep the destination object well-formed.
    if rows == 0 {
        out.clear();
        let header = enriched_schema
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect::<Vec<_>>()
            .join(",");
        out.extend_from_slice(header.as_bytes());
        out.push(b'\n');
    }

    Ok((out, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::MemoryStore;

    const SRC_KEY: &str = "weather_partitioned/date=2024-01-01/part-0000.csv";
    const DST_KEY: &str = "weather_partitioned_enriched/date=2024-01-01/part-0000.csv";

    fn estimates(value: i64) -> EstimateMap {
        EstimateMap::new().update(PartitionDate::new("2024-01-01"), value)
    }

    fn enrich(store: &MemoryStore, map: &EstimateMap) -> Result<usize, EnrichError> {
        enrich_object(
            store,
            &Bucket::new("data"),
            &ObjectKey::new(SRC_KEY),
            &PartitionDate::new("2024-01-01"),
            "weather_partitioned_enriched/",
            map,
        )
    }

    #[test]
    fn appends_uniform_estimate_column() {
        let store = MemoryStore::new(10);
        store.insert("data", SRC_KEY, b"a,b\n1,2\n3,4\n5,6\n");

        let rows = enrich(&store, &estimates(42)).unwrap();
        assert_eq!(rows, 3);

        let written = store.object("data", DST_KEY).unwrap();
        assert_eq!(
            String::from_utf8(written).unwrap(),
            "a,b,tourist_estimate\n1,2,42\n3,4,42\n5,6,42\n"
        );
    }

    #[test]
    fn rerun_is_byte_identical() {
        let store = MemoryStore::new(10);
        store.insert("data", SRC_KEY, b"a,b\n1,2\n3,4\n");
        let map = estimates(42);

        enrich(&store, &map).unwrap();
        let first = store.object("data", DST_KEY).unwrap();
        enrich(&store, &map).unwrap();
        let second = store.object("data", DST_KEY).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn header_only_object_round_trips() {
        let store = MemoryStore::new(10);
        store.insert("data", SRC_KEY, b"a,b\n");

        let rows = enrich(&store, &estimates(42)).unwrap();
        assert_eq!(rows, 0);

        let written = store.object("data", DST_KEY).unwrap();
        assert_eq!(String::from_utf8(written).unwrap(), "a,b,tourist_estimate\n");
    }

    #[test]
    fn missing_estimate_is_fatal() {
        let store = MemoryStore::new(10);
        store.insert("data", SRC_KEY, b"a,b\n1,2\n");

        let result = enrich(&store, &EstimateMap::new());
        assert!(matches!(result, Err(EnrichError::MissingEstimate { .. })));
        assert!(store.object("data", DST_KEY).is_none());
    }

    #[test]
    fn non_utf8_object_is_rejected() {
        let store = MemoryStore::new(10);
        store.insert("data", SRC_KEY, &[0xff, 0xfe, 0x00]);

        let result = enrich(&store, &estimates(42));
        assert!(matches!(result, Err(EnrichError::Encoding { .. })));
    }

    #[test]
    fn destination_mirrors_structure_below_dataset_root() {
        let key = ObjectKey::new("weather_partitioned/date=2024-01-01/hour=03/part-0001.csv");
        let target = destination_key(&key, "weather_partitioned_enriched/").unwrap();
        assert_eq!(
            target.as_str(),
            "weather_partitioned_enriched/date=2024-01-01/hour=03/part-0001.csv"
        );
    }
}
