use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::base::{Bucket, ObjectKey};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("no such bucket: {0}")]
    NoSuchBucket(Bucket),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// One page of a prefix-scoped listing. `next_cursor` is an opaque token;
/// `Some` means the provider has more pages.
pub struct ListPage {
    pub keys: Vec<ObjectKey>,
    pub next_cursor: Option<String>,
}

pub trait ObjectStore {
    fn list_page(&self, bucket: &Bucket, prefix: &str, cursor: Option<&str>) -> Result<ListPage>;
    fn get(&self, bucket: &Bucket, key: &ObjectKey) -> Result<Vec<u8>>;
    fn put(&self, bucket: &Bucket, key: &ObjectKey, bytes: &[u8]) -> Result<()>;
}

const DEFAULT_PAGE_SIZE: usize = 1000;

/// Local-filesystem object store. Buckets are child directories of the root,
/// keys are `/`-separated paths beneath the bucket. Listing pages through
/// sorted keys with the last returned key as the cursor.
pub struct FileStore {
    root: PathBuf,
    page_size: usize,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        FileStore {
            root,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(root: PathBuf, page_size: usize) -> Self {
        FileStore { root, page_size }
    }

    fn bucket_path(&self, bucket: &Bucket) -> PathBuf {
        self.root.join(bucket.as_str())
    }

    fn fs_path(&self, bucket: &Bucket, key: &ObjectKey) -> PathBuf {
        self.bucket_path(bucket).join(key.as_str())
    }

    fn collect_keys(dir: &Path, base: &Path, keys: &mut Vec<String>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                Self::collect_keys(&path, base, keys)?;
            } else if let Ok(relative) = path.strip_prefix(base) {
                keys.push(relative.to_string_lossy().to_string());
            }
        }
        Ok(())
    }
}

impl ObjectStore for FileStore {
    fn list_page(&self, bucket: &Bucket, prefix: &str, cursor: Option<&str>) -> Result<ListPage> {
        let base = self.bucket_path(bucket);
        if !base.is_dir() {
            return Err(StoreError::NoSuchBucket(bucket.clone()));
        }

        let mut keys = Vec::new();
        Self::collect_keys(&base, &base, &mut keys)?;
        keys.retain(|key| key.starts_with(prefix));
        keys.sort();

        let start = match cursor {
            Some(cursor) => keys.partition_point(|key| key.as_str() <= cursor),
            None => 0,
        };
        let end = (start + self.page_size).min(keys.len());
        let next_cursor = if end < keys.len() && end > start {
            Some(keys[end - 1].clone())
        } else {
            None
        };

        Ok(ListPage {
            keys: keys[start..end].iter().map(ObjectKey::new).collect(),
            next_cursor,
        })
    }

    fn get(&self, bucket: &Bucket, key: &ObjectKey) -> Result<Vec<u8>> {
        Ok(fs::read(self.fs_path(bucket, key))?)
    }

    fn put(&self, bucket: &Bucket, key: &ObjectKey, bytes: &[u8]) -> Result<()> {
        let path = self.fs_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(fs::write(path, bytes)?)
    }
}
