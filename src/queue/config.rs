//! Queue configuration and file locations

use std::mem::size_of;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{QueueError, Result};
use crate::layout::headers::{DataHeader, IndexEntry, IndexHeader};

/// Sizing parameters applied when the producer creates the queue files
///
/// Existing files keep their on-disk sizes; these values only matter on first
/// creation (and `max_consumers`, which the producer re-stamps into the
/// control file on every init).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Initial size of the index file in bytes
    pub index_initial_bytes: usize,
    /// Initial size of the data file in bytes
    pub data_initial_bytes: usize,
    /// Fixed capacity of the consumer slot table
    pub max_consumers: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            index_initial_bytes: 1024 * 1024,
            data_initial_bytes: 10 * 1024 * 1024,
            max_consumers: 16,
        }
    }
}

impl QueueConfig {
    /// Check that the sizes leave room for the headers and at least one entry
    pub fn validate(&self) -> Result<()> {
        if self.index_initial_bytes < size_of::<IndexHeader>() + size_of::<IndexEntry>() {
            return Err(QueueError::IndexSanity {
                detail: "index_initial_bytes below header size",
            });
        }
        if self.data_initial_bytes < size_of::<DataHeader>() {
            return Err(QueueError::DataSanity {
                detail: "data_initial_bytes below header size",
            });
        }
        if self.max_consumers == 0 {
            return Err(QueueError::ControlSanity {
                detail: "max_consumers must be at least 1",
            });
        }
        Ok(())
    }
}

/// Locations of the three shared queue files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuePaths {
    /// Index file path
    pub index: PathBuf,
    /// Data file path
    pub data: PathBuf,
    /// Control file path
    pub control: PathBuf,
}

impl QueuePaths {
    /// The conventional `index.mm` / `data.mm` / `control.mm` triple inside
    /// `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            index: dir.join("index.mm"),
            data: dir.join("data.mm"),
            control: dir.join("control.mm"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        QueueConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_tiny_index() {
        let config = QueueConfig {
            index_initial_bytes: 8,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_consumers() {
        let config = QueueConfig {
            max_consumers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_paths_in_dir() {
        let paths = QueuePaths::in_dir(Path::new("/tmp/q"));
        assert_eq!(paths.index, PathBuf::from("/tmp/q/index.mm"));
        assert_eq!(paths.data, PathBuf::from("/tmp/q/data.mm"));
        assert_eq!(paths.control, PathBuf::from("/tmp/q/control.mm"));
    }
}
