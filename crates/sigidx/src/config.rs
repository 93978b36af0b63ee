//! Reader configuration.
//!
//! Loaded from TOML; every key is optional:
//!
//! ```toml
//! save_index = true
//! index_suffix = ".idx"
//! data_extension = "pod5"
//! build_workers = 4
//! fetch_workers = 2
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sigidx_error::{Result, SigIdxError};

/// Index file suffix appended to the data file name.
pub const DEFAULT_INDEX_SUFFIX: &str = ".idx";
/// Extension of the signal files picked up by directory scans.
pub const DEFAULT_DATA_EXTENSION: &str = "pod5";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    /// Persist freshly built indexes next to their data file.
    pub save_index: bool,
    pub index_suffix: String,
    /// Without the leading dot.
    pub data_extension: String,
    /// Concurrent directory builds; `None` probes the disk type.
    pub build_workers: Option<usize>,
    /// Threads used by [`crate::RandomAccessReader::fetch_signals_parallel`].
    pub fetch_workers: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            save_index: true,
            index_suffix: DEFAULT_INDEX_SUFFIX.to_owned(),
            data_extension: DEFAULT_DATA_EXTENSION.to_owned(),
            build_workers: None,
            fetch_workers: 1,
        }
    }
}

impl ReaderConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|err| SigIdxError::config(format!("invalid reader config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| {
            SigIdxError::config(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.index_suffix.is_empty() {
            return Err(SigIdxError::config("index_suffix must not be empty"));
        }
        if self.data_extension.is_empty() || self.data_extension.starts_with('.') {
            return Err(SigIdxError::config(format!(
                "data_extension must be a bare extension, got {:?}",
                self.data_extension
            )));
        }
        if self.build_workers == Some(0) {
            return Err(SigIdxError::config("build_workers must be at least 1"));
        }
        if self.fetch_workers == 0 {
            return Err(SigIdxError::config("fetch_workers must be at least 1"));
        }
        Ok(())
    }

    /// Whether `path` carries the configured data extension.
    #[must_use]
    pub fn is_data_file(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(self.data_extension.as_str()))
    }
}

/// `<dir>/<file name><suffix>` for the data file at `data_path`.
#[must_use]
pub fn index_path_for(data_path: &Path, suffix: &str) -> PathBuf {
    let mut name = data_path
        .file_name()
        .map(ToOwned::to_owned)
        .unwrap_or_default();
    name.push(suffix);
    data_path.with_file_name(name)
}
