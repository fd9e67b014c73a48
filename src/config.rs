//! Indexing configuration.
//!
//! Stored as pretty JSON (`pktidx.json` by convention). Missing fields take
//! their defaults, so a config file only needs the settings it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec::Method;
use crate::error::{IndexError, Result};

/// Conventional config file name inside an output directory.
pub const CONFIG_FILE_NAME: &str = "pktidx.json";

/// Default segment span: just under 4 GiB so relative offsets fit in u32.
pub const DEFAULT_SEGMENT_CAP: u64 = u32::MAX as u64 - 65_535;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IndexConfig {
    /// Block codec for every index written.
    pub method: Method,
    /// Directory receiving `prefix-NNNN.ext` files.
    pub output_dir: PathBuf,
    /// File name prefix.
    pub prefix: String,
    /// Largest capture span (bytes) covered by one segment.
    pub segment_cap: u64,
    /// Bound on queued segment writes; `None` leaves the queue unbounded.
    pub mailbox_capacity: Option<usize>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            method: Method::default(),
            output_dir: PathBuf::from("."),
            prefix: "capture".to_string(),
            segment_cap: DEFAULT_SEGMENT_CAP,
            mailbox_capacity: None,
        }
    }
}

impl IndexConfig {
    /// Read config from a JSON file.
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write config as pretty JSON.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() || self.prefix.contains(['/', '\\']) {
            return Err(IndexError::Config(format!(
                "prefix must be a non-empty file name, got '{}'",
                self.prefix
            )));
        }
        if self.segment_cap == 0 || self.segment_cap > u32::MAX as u64 {
            return Err(IndexError::Config(format!(
                "segment_cap must be in 1..={}, got {}",
                u32::MAX,
                self.segment_cap
            )));
        }
        if self.mailbox_capacity == Some(0) {
            return Err(IndexError::Config(
                "mailbox_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_is_valid() {
        let config = IndexConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.method, Method::StreamVByte128);
        assert!(config.segment_cap < u32::MAX as u64);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = IndexConfig {
            method: Method::BitPack256,
            prefix: "trace".into(),
            mailbox_capacity: Some(4),
            ..Default::default()
        };
        config.write_to(&path).unwrap();
        assert_eq!(IndexConfig::read_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: IndexConfig = serde_json::from_str(r#"{"method": "bitpack128"}"#).unwrap();
        assert_eq!(config.method, Method::BitPack128);
        assert_eq!(config.prefix, "capture");
        assert_eq!(config.mailbox_capacity, None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad = [
            IndexConfig {
                prefix: "a/b".into(),
                ..Default::default()
            },
            IndexConfig {
                segment_cap: 0,
                ..Default::default()
            },
            IndexConfig {
                segment_cap: 1 << 33,
                ..Default::default()
            },
            IndexConfig {
                mailbox_capacity: Some(0),
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(IndexError::Config(_))));
        }
    }
}
