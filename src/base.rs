use std::fmt;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Bucket(String);

impl Bucket {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Bucket(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn new<S: Into<String>>(key: S) -> Self {
        ObjectKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Calendar date in `YYYY-MM-DD` form, extracted from a partitioned key.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PartitionDate(String);

impl PartitionDate {
    pub fn new<S: Into<String>>(date: S) -> Self {
        PartitionDate(date.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionDate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source and destination prefixes for one logical dataset.
#[derive(Clone, Debug)]
pub struct DatasetSpec {
    pub name: String,
    pub source_prefix: String,
    pub destination_prefix: String,
}

impl DatasetSpec {
    pub fn new<N, S, D>(name: N, source_prefix: S, destination_prefix: D) -> Self
    where
        N: Into<String>,
        S: Into<String>,
        D: Into<String>,
    {
        DatasetSpec {
            name: name.into(),
            source_prefix: source_prefix.into(),
            destination_prefix: destination_prefix.into(),
        }
    }
}
