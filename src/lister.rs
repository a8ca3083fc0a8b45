use thiserror::Error;
use tracing::debug;

use crate::base::{Bucket, ObjectKey, PartitionDate};
use crate::partition::{self, KeyError};
use crate::store::{ObjectStore, StoreError};

#[derive(Error, Debug)]
pub enum ListError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Walk every page under `prefix` and pair each object key with its
/// partition date. Prefix markers and directory markers are skipped; a key
/// without a date segment aborts the listing. Order is provider order.
pub fn list_dataset(
    store: &dyn ObjectStore,
    bucket: &Bucket,
    prefix: &str,
) -> Result<Vec<(ObjectKey, PartitionDate)>, ListError> {
    let marker = prefix.trim_end_matches('/');
    let mut entries = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = store.list_page(bucket, prefix, cursor.as_deref())?;
        debug!(prefix, keys = page.keys.len(), "listed page");

        for key in page.keys {
            if key.as_str().ends_with('/') || key.as_str() == marker {
                continue;
            }
            let date = partition::extract_date(&key)?;
            entries.push((key, date));
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(entries)
}
