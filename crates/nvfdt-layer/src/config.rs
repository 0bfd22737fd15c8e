use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How much of a blob is validated before cells are enumerated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Validation {
    /// Check the header and walk the whole struct block.
    #[default]
    Full,
    /// Check the header only; interior defects surface during enumeration,
    /// if at all.
    Header,
}

/// Configuration for a translation-layer instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// Validation depth applied when loading the blob.
    pub validation: Validation,
    /// Resolve each cell's descriptor node from the binding's node.
    pub associate_nodes: bool,
    /// Appended to the underlying device name to form the layer's name.
    pub name_suffix: String,
    /// Largest blob, in bytes, the loader will allocate.
    pub max_blob_size: u32,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            validation: Validation::Full,
            associate_nodes: true,
            name_suffix: "-fdt".into(),
            max_blob_size: 64 * 1024 * 1024, // 64 MiB
        }
    }
}

impl LayerConfig {
    /// Header-only validation, matching layers that trust the interior.
    pub fn header_only() -> Self {
        Self {
            validation: Validation::Header,
            ..Default::default()
        }
    }

    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Name of a layer stacked on `lower`.
    pub fn display_name(&self, lower: &str) -> String {
        format!("{lower}{}", self.name_suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = LayerConfig::default();
        assert_eq!(c.validation, Validation::Full);
        assert!(c.associate_nodes);
        assert_eq!(c.name_suffix, "-fdt");
        assert_eq!(c.max_blob_size, 64 * 1024 * 1024);
    }

    #[test]
    fn display_name_appends_suffix() {
        assert_eq!(LayerConfig::default().display_name("eeprom0"), "eeprom0-fdt");
    }

    #[test]
    fn header_only() {
        let c = LayerConfig::header_only();
        assert_eq!(c.validation, Validation::Header);
        assert_eq!(c.name_suffix, "-fdt");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = LayerConfig::from_toml_str("validation = \"header\"\nmax_blob_size = 4096\n").unwrap();
        assert_eq!(c.validation, Validation::Header);
        assert_eq!(c.max_blob_size, 4096);
        assert!(c.associate_nodes);
        assert_eq!(c.name_suffix, "-fdt");
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(LayerConfig::from_toml_str("").unwrap(), LayerConfig::default());
    }

    #[test]
    fn unknown_validation_is_rejected() {
        let err = LayerConfig::from_toml_str("validation = \"paranoid\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layer.toml");
        std::fs::write(&path, "associate_nodes = false\nname_suffix = \"-dt\"\n").unwrap();
        let c = LayerConfig::load(&path).unwrap();
        assert!(!c.associate_nodes);
        assert_eq!(c.display_name("mtd3"), "mtd3-dt");
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = LayerConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
