//! Decoder configuration types
//!
//! This module defines the configuration needed by the decoder library: how
//! frames are decoded ([`DecoderConfig`]) and which files a directory scan
//! merges ([`MergeConfig`]).

use serde::{Deserialize, Serialize};

/// Configuration for frame decoding and file loading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Firmware older than 2.6 emits one extra payload byte before `$`
    #[serde(default)]
    pub legacy_payload: bool,

    /// Tag ADC values above 255 with the corrupted-length signature as -4
    #[serde(default = "default_true")]
    pub flag_adc_overflow: bool,

    /// Log every frame with its markers and decoded rows
    #[serde(default)]
    pub trace_frames: bool,

    /// Extension of frame files (without the dot)
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_true() -> bool {
    true
}

fn default_extension() -> String {
    "csv".to_string()
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            legacy_payload: false,
            flag_adc_overflow: true,
            trace_frames: false,
            extension: default_extension(),
        }
    }
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: decode pre-2.6 firmware payloads
    pub fn with_legacy_payload(mut self, enabled: bool) -> Self {
        self.legacy_payload = enabled;
        self
    }

    /// Builder method: enable or disable the ADC corrupted-length check
    pub fn with_adc_overflow_flag(mut self, enabled: bool) -> Self {
        self.flag_adc_overflow = enabled;
        self
    }

    /// Builder method: enable per-frame tracing
    pub fn with_frame_tracing(mut self, enabled: bool) -> Self {
        self.trace_frames = enabled;
        self
    }

    /// Builder method: set the frame file extension
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// Check if a file name carries the frame file extension
    pub fn has_data_extension(&self, file_name: &str) -> bool {
        file_name
            .strip_suffix(self.extension.as_str())
            .is_some_and(|stem| stem.ends_with('.'))
    }
}

/// How much of each frame a file load decodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Timestamp, count and every TDC/ADC group
    #[default]
    Full,
    /// Timestamp and count only, for files recorded without TDC/ADC
    Counts,
}

/// Configuration for merging every frame file of a directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Only merge files whose name contains this text
    #[serde(default)]
    pub include: Option<String>,

    /// Skip files whose name contains this text
    #[serde(default)]
    pub exclude: Option<String>,

    /// Decoding mode applied to every file of the run
    #[serde(default)]
    pub mode: ParseMode,

    /// Parse files on the rayon thread pool
    #[serde(default)]
    pub parallel: bool,
}

impl MergeConfig {
    /// Create a new merge configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the include filter
    pub fn with_include(mut self, text: impl Into<String>) -> Self {
        self.include = Some(text.into());
        self
    }

    /// Builder method: set the exclude filter
    pub fn with_exclude(mut self, text: impl Into<String>) -> Self {
        self.exclude = Some(text.into());
        self
    }

    /// Builder method: set the decoding mode
    pub fn with_mode(mut self, mode: ParseMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder method: enable parallel file parsing
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Check a file name against the editor-backup, include and exclude filters
    pub fn should_process_file(&self, file_name: &str) -> bool {
        if file_name.contains('~') {
            return false;
        }
        if let Some(include) = &self.include {
            if !file_name.contains(include.as_str()) {
                return false;
            }
        }
        match &self.exclude {
            Some(exclude) => !file_name.contains(exclude.as_str()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_config_builder() {
        let config = DecoderConfig::new()
            .with_legacy_payload(true)
            .with_adc_overflow_flag(false)
            .with_frame_tracing(true)
            .with_extension(".txt");

        assert!(config.legacy_payload);
        assert!(!config.flag_adc_overflow);
        assert!(config.trace_frames);
        assert_eq!(config.extension, "txt");
    }

    #[test]
    fn test_data_extension() {
        let config = DecoderConfig::new();
        assert!(config.has_data_extension("run1.csv"));
        assert!(!config.has_data_extension("run1.csv.bak"));
        assert!(!config.has_data_extension("run1csv"));
        assert!(!config.has_data_extension("run1.xlsx"));
    }

    #[test]
    fn test_filter_logic() {
        let config = MergeConfig::new().with_include("bg").with_exclude("SoloCounts");

        assert!(config.should_process_file("bg1.csv"));
        assert!(!config.should_process_file("thermal1.csv")); // Missing include
        assert!(!config.should_process_file("bg_SoloCounts.csv")); // Excluded
        assert!(!config.should_process_file("~bg1.csv")); // Editor backup
    }

    #[test]
    fn test_no_filters() {
        let config = MergeConfig::new();

        // Without filters, everything but backups should pass
        assert!(config.should_process_file("anything.csv"));
        assert!(!config.should_process_file("anything.csv~"));
    }
}
