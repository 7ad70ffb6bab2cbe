use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("Failed to read the published set from {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write the published set to {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("The published set at {path} is not a valid JSON array of strings")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// In-memory set of identities that were already relayed. Preserves the
/// insertion order, which is also the order of the persisted JSON array.
#[derive(Debug, Default)]
pub(crate) struct PublishedSet {
    order: Vec<String>,
    index: HashSet<String>,
}

impl PublishedSet {
    fn from_ids(ids: Vec<String>) -> Self {
        let mut set = Self::default();
        for id in ids {
            set.insert(id);
        }
        set
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Re-adding an existing identity is harmless: it keeps its original
    /// position and the set is unchanged.
    pub(crate) fn insert(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.index.insert(id.clone()) {
            self.order.push(id);
        }
    }

    pub(crate) fn ids(&self) -> &[String] {
        &self.order
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Durable storage for the published set. The whole set is loaded at the
/// start of a relay cycle and rewritten after a successful publish; the
/// store is never partially updated mid-cycle.
#[async_trait]
pub(crate) trait PublishedStore: Send + Sync {
    /// Missing or empty backing storage yields an empty set, never an error.
    async fn load(&self) -> Result<PublishedSet, StoreError>;

    /// Overwrites the backing storage with the full current set. A failure
    /// here must be reported loudly: the publish already happened and cannot
    /// be undone, so the operator has to reconcile manually.
    async fn flush(&self, set: &PublishedSet) -> Result<(), StoreError>;
}

/// [`PublishedStore`] backed by a single JSON array of strings in a flat
/// file. No schema versioning.
pub(crate) struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl PublishedStore for JsonFileStore {
    async fn load(&self) -> Result<PublishedSet, StoreError> {
        let bytes = match fs_err::tokio::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PublishedSet::default())
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if bytes.is_empty() {
            return Ok(PublishedSet::default());
        }

        let ids: Vec<String> =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
                path: self.path.clone(),
                source,
            })?;

        Ok(PublishedSet::from_ids(ids))
    }

    async fn flush(&self, set: &PublishedSet) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(set.ids())
            .expect("BUG: a vector of strings always serializes");

        fs_err::tokio::write(&self.path, bytes)
            .await
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })
    }
}
