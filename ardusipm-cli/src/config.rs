//! Configuration loading and parsing

use anyhow::{Context, Result};
use ardusipm_decoder::{DecoderConfig, MergeConfig, DEFAULT_ADC_CUT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
///
/// Every section is optional; command-line flags override the file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Write the decoded table to this CSV file
    pub csv: Option<PathBuf>,
    /// Print the per-CPS corruption summary
    #[serde(default)]
    pub quality: bool,
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Txt,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_adc_cut")]
    pub adc_cut: i64,
}

fn default_adc_cut() -> i64 {
    DEFAULT_ADC_CUT
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            adc_cut: default_adc_cut(),
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ardusipm_decoder::ParseMode;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [decoder]
            legacy_payload = true

            [merge]
            include = "bg"
            exclude = "SoloCounts"
            mode = "counts"

            [output]
            csv = "corpus.csv"
            format = "json"
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert!(config.decoder.legacy_payload);
        assert!(config.decoder.flag_adc_overflow);
        assert_eq!(config.decoder.extension, "csv");
        assert_eq!(config.merge.include.as_deref(), Some("bg"));
        assert_eq!(config.merge.mode, ParseMode::Counts);
        assert_eq!(config.output.csv, Some(PathBuf::from("corpus.csv")));
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.thresholds.adc_cut, 16);
    }

    #[test]
    fn test_empty_config() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(!config.decoder.legacy_payload);
        assert!(!config.merge.parallel);
        assert!(!config.output.quality);
        assert_eq!(config.output.format, OutputFormat::Txt);
    }

    #[test]
    fn test_load_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[merge]\nparallel = \"yes\"\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(format!("{}", err).contains("Failed to parse config file"));
        assert!(load_config(&dir.path().join("missing.toml")).is_err());
    }
}
