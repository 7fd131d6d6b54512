//! Main decoder API
//!
//! This module provides the primary interface for the decoder library.
//! The Decoder struct is the entry point for decoding frames, loading frame
//! files into tables and merging whole directories.

use crate::config::{DecoderConfig, MergeConfig, ParseMode};
use crate::formats::{decode_counts, DecodedLine, FrameDecoder};
use crate::threshold::ThresholdPoint;
use crate::timestamp::to_datetime;
use crate::types::{AcquisitionTable, AcquisitionTime, CorpusTable, DecoderError, EventRecord, Result};
use std::borrow::Cow;
use std::fs;
use std::path::Path;

/// The main decoder struct - entry point for all decoding operations
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    frames: FrameDecoder,
}

impl Decoder {
    /// Create a new decoder instance with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with a specific configuration
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            frames: FrameDecoder::new(config),
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        self.frames.config()
    }

    /// Decode a single raw frame
    pub fn decode_line(&self, line: &str, mode: ParseMode) -> DecodedLine {
        match mode {
            ParseMode::Full => self.frames.decode(line),
            ParseMode::Counts => decode_counts(line),
        }
    }

    /// Load a frame file into an acquisition table
    ///
    /// The file must carry the configured data extension. Its content is split
    /// into frames on commas and line breaks; every frame is decoded and the
    /// rows are kept in order. A file whose timestamps cannot be read still
    /// returns its rows, with [`AcquisitionTime::Unavailable`].
    ///
    /// # Example
    /// ```no_run
    /// use ardusipm_decoder::{Decoder, ParseMode};
    /// use std::path::Path;
    ///
    /// let decoder = Decoder::new();
    /// let table = decoder.parse_file(Path::new("200101120000_bg.csv"), ParseMode::Full).unwrap();
    /// println!("{} rows over {}", table.len(), table.duration);
    /// ```
    pub fn parse_file(&self, path: &Path, mode: ParseMode) -> Result<AcquisitionTable> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        if !self.config().has_data_extension(&name) {
            return Err(DecoderError::UnsupportedExtension {
                path: path.to_path_buf(),
                expected: self.config().extension.clone(),
            });
        }

        log::info!("Loading frame file: {:?}", path);
        let bytes = fs::read(path)?;
        let content = String::from_utf8_lossy(&bytes);
        if let Cow::Owned(_) = content {
            log::warn!("{}: invalid UTF-8 replaced, affected frames are flagged", name);
        }

        let table = self.parse_frames(&name, split_frames(&content), mode);
        if table.corrupted_frames > 0 {
            log::warn!(
                "{}: {} of {} frames corrupted ({} rows flagged)",
                name,
                table.corrupted_frames,
                table.frames,
                table.corrupted_rows()
            );
        }
        if !table.duration.is_available() {
            log::warn!("Error in acquisition time for file {}", name);
        }
        Ok(table)
    }

    /// Build an acquisition table from raw frames
    pub fn parse_frames<'a, I>(&self, source: &str, frames: I, mode: ParseMode) -> AcquisitionTable
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut records = Vec::new();
        let mut decoded_frames = 0;
        let mut corrupted_frames = 0;

        for frame in frames {
            let decoded = self.decode_line(frame, mode);
            if decoded.is_blank() {
                continue;
            }
            decoded_frames += 1;
            if decoded.quality() > 0 {
                corrupted_frames += 1;
            }
            records.extend(decoded.events);
        }

        let duration = acquisition_time(&records);
        log::debug!("{}: {} frames, {} rows, {}", source, decoded_frames, records.len(), duration);

        AcquisitionTable {
            source: source.to_string(),
            records,
            duration,
            frames: decoded_frames,
            corrupted_frames,
        }
    }

    /// Merge every matching frame file of a directory
    pub fn merge_directory(&self, directory: &Path, config: &MergeConfig) -> Result<CorpusTable> {
        crate::merger::merge_directory(self, directory, config)
    }

    /// Summarize every run of a threshold-scan directory
    pub fn scan_thresholds(&self, directory: &Path, config: &MergeConfig, adc_cut: i64) -> Result<Vec<ThresholdPoint>> {
        crate::threshold::scan_thresholds(self, directory, config, adc_cut)
    }
}

/// Split file content into raw frames
///
/// The acquisition program wrote every frame followed by a comma on one line;
/// serial captures separate frames by line breaks.
pub fn split_frames(content: &str) -> impl Iterator<Item = &str> {
    content.split(|c: char| c == ',' || c == '\n' || c == '\r')
}

/// Time between the first and last rows with a valid timestamp
pub fn acquisition_time(records: &[EventRecord]) -> AcquisitionTime {
    let first = records.iter().find_map(|r| to_datetime(r.timestamp));
    let last = records.iter().rev().find_map(|r| to_datetime(r.timestamp));

    match (first, last) {
        (Some(first), Some(last)) => AcquisitionTime::Measured(last - first),
        _ => AcquisitionTime::Unavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::io::Write;

    const FRAMES: &str = "u200101120000.000000t0av14$1,\
                          u200101120001.000000$0,\
                          garbage,\
                          u200101120010.500000t05v20t06v21$2,";

    #[test]
    fn test_parse_frames() {
        let decoder = Decoder::new();
        let table = decoder.parse_frames("run.csv", split_frames(FRAMES), ParseMode::Full);

        // 1 + 1 + 1 sentinel + 2
        assert_eq!(table.len(), 5);
        assert_eq!(table.frames, 4);
        assert_eq!(table.corrupted_frames, 1);
        assert_eq!(table.records[2], EventRecord::unusable());
        assert_eq!(table.duration, AcquisitionTime::Measured(Duration::milliseconds(10_500)));
    }

    #[test]
    fn test_duration_skips_invalid_timestamps() {
        let records = vec![
            EventRecord::unusable(),
            EventRecord { timestamp: 200101120000.0, ..EventRecord::unusable() },
            EventRecord { timestamp: 200101120004.0, ..EventRecord::unusable() },
            EventRecord::unusable(),
        ];
        assert_eq!(acquisition_time(&records).seconds(), 4.0);
    }

    #[test]
    fn test_duration_unavailable() {
        assert_eq!(acquisition_time(&[]), AcquisitionTime::Unavailable);
        assert_eq!(acquisition_time(&[EventRecord::unusable()]).seconds(), -3.0);
    }

    #[test]
    fn test_counts_mode() {
        let decoder = Decoder::new();
        let table = decoder.parse_frames("run.csv", split_frames(FRAMES), ParseMode::Counts);
        assert_eq!(table.len(), 4);
        assert!(table.records.iter().filter(|r| r.quality_flag == 0).all(|r| r.tdc == 0 && r.adc == 0));
        assert_eq!(table.duration.seconds(), 10.5);
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("200101120000_bg.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(FRAMES.as_bytes()).unwrap();

        let table = Decoder::new().parse_file(&path, ParseMode::Full).unwrap();
        assert_eq!(table.source, "200101120000_bg.csv");
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_unsupported_file_extension() {
        let decoder = Decoder::new();
        let result = decoder.parse_file(Path::new("test.txt"), ParseMode::Full);
        assert!(matches!(result, Err(DecoderError::UnsupportedExtension { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = Decoder::new().parse_file(Path::new("nonexistent.csv"), ParseMode::Full);
        assert!(matches!(result, Err(DecoderError::IoError(_))));
    }
}
