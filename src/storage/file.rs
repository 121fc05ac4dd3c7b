use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::StorageError;

use super::{Storage, StoredSeries, series_key};

/// One JSON document per series at `<root>/<measurement>/<field>/<series>.json`,
/// each name percent-encoded.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_for(&self, measurement: &str, field: &str, series: &str) -> PathBuf {
        self.root
            .join(encode_component(measurement))
            .join(encode_component(field))
            .join(format!("{}.json", encode_component(series)))
    }
}

/// Percent-encode a name into one path component. Only ASCII
/// alphanumerics, `-` and `_` pass through, so distinct names never share a
/// path and nothing escapes the root. The empty name encodes as `%`.
fn encode_component(name: &str) -> String {
    if name.is_empty() {
        return "%".to_owned();
    }
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

#[async_trait]
impl Storage for FileStorage {
    async fn load(
        &self,
        measurement: &str,
        field: &str,
        series: &str,
    ) -> Result<Option<StoredSeries>, StorageError> {
        let path = self.path_for(measurement, field, series);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Io {
                    context: "read series",
                    path,
                    source,
                });
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StorageError::Decode {
                key: series_key(measurement, field, series),
                source,
            })
    }

    async fn store(
        &self,
        measurement: &str,
        field: &str,
        series: &str,
        data: &StoredSeries,
    ) -> Result<(), StorageError> {
        let path = self.path_for(measurement, field, series);
        let encoded = serde_json::to_vec(data).map_err(|source| StorageError::Encode {
            key: series_key(measurement, field, series),
            source,
        })?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Io {
                    context: "create series directory",
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, encoded)
            .await
            .map_err(|source| StorageError::Io {
                context: "write series",
                path: staging.clone(),
                source,
            })?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|source| StorageError::Io {
                context: "replace series",
                path,
                source,
            })
    }
}
