//! Service configuration
//!
//! Loaded once at startup from TOML. Data-palette enablement is decided
//! here and handed to the aggregator; nothing downstream inspects the
//! environment.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CI_ENDPOINT_PREFIX: &str = "https://ci.kbase.us/";
const DEFAULT_PAGE_SIZE: u64 = 10_000;

/// Raw service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub workspace_url: String,
    pub narrative_method_store_url: String,
    pub set_api_url: String,
    pub data_palette_url: String,
    pub intro_markdown_file: PathBuf,
    #[serde(default)]
    pub kbase_endpoint: String,
    /// Explicit palette switch; derived from `kbase_endpoint` when unset
    #[serde(default)]
    pub data_palettes_enabled: Option<bool>,
    #[serde(default = "default_page_size")]
    pub object_page_size: u64,
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl ServiceConfig {
    /// Parse from TOML text
    ///
    /// # Errors
    /// Invalid TOML or an empty required value
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// I/O failure, invalid TOML or an empty required value
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("workspace_url", &self.workspace_url),
            ("narrative_method_store_url", &self.narrative_method_store_url),
            ("set_api_url", &self.set_api_url),
            ("data_palette_url", &self.data_palette_url),
        ];
        if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ConfigError::Missing(*name));
        }
        if self.intro_markdown_file.as_os_str().is_empty() {
            return Err(ConfigError::Missing("intro_markdown_file"));
        }
        if self.object_page_size == 0 {
            return Err(ConfigError::Missing("object_page_size"));
        }
        Ok(())
    }

    /// Whether the palette overlay is available in this deployment
    #[must_use]
    pub fn palettes_enabled(&self) -> bool {
        self.data_palettes_enabled
            .unwrap_or_else(|| self.kbase_endpoint.starts_with(CI_ENDPOINT_PREFIX))
    }

    /// Aggregator settings derived from this config
    #[must_use]
    pub fn aggregator(&self) -> AggregatorConfig {
        AggregatorConfig {
            data_palettes_enabled: self.palettes_enabled(),
            page_size: self.object_page_size,
        }
    }
}

/// Settings fixed at aggregator construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// When false, palette overlay requests are ignored
    pub data_palettes_enabled: bool,
    /// Object-id range covered by one listing call
    pub page_size: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            data_palettes_enabled: true,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl AggregatorConfig {
    #[inline]
    #[must_use]
    pub fn with_palettes(mut self, enabled: bool) -> Self {
        self.data_palettes_enabled = enabled;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
        workspace_url = "https://kbase.us/services/ws"
        narrative_method_store_url = "https://kbase.us/services/narrative_method_store/rpc"
        set_api_url = "https://kbase.us/dynserv/SetAPI"
        data_palette_url = "https://kbase.us/dynserv/DataPaletteService"
        intro_markdown_file = "/kb/deployment/intro.md"
    "#;

    #[test]
    fn defaults_apply() {
        let config = ServiceConfig::from_toml_str(BASE).unwrap();
        assert_eq!(config.object_page_size, 10_000);
        assert!(!config.palettes_enabled());
    }

    #[test]
    fn ci_endpoint_enables_palettes() {
        let text = format!("{BASE}\nkbase_endpoint = \"https://ci.kbase.us/services\"");
        let config = ServiceConfig::from_toml_str(&text).unwrap();
        assert!(config.aggregator().data_palettes_enabled);
    }

    #[test]
    fn explicit_switch_wins() {
        let text = format!(
            "{BASE}\nkbase_endpoint = \"https://ci.kbase.us/services\"\ndata_palettes_enabled = false"
        );
        let config = ServiceConfig::from_toml_str(&text).unwrap();
        assert!(!config.palettes_enabled());
    }

    #[test]
    fn empty_url_is_rejected() {
        let text = BASE.replace("https://kbase.us/services/ws", "");
        assert!(matches!(
            ServiceConfig::from_toml_str(&text),
            Err(ConfigError::Missing("workspace_url"))
        ));
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(AggregatorConfig::default().with_page_size(0).page_size, 1);
    }
}
