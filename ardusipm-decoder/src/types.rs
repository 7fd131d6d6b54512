//! Core types for the ArduSiPM log decoder library
//!
//! This module defines the records the decoder emits when processing frame
//! files, the tables they are collected into, and the error type. Decoding
//! problems inside a frame are never errors: they are reported as [`Anomaly`]
//! values and folded into the per-row quality flag.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Sentinel values stored in the integer columns of an [`EventRecord`]
pub mod sentinel {
    /// Field not present in the frame (or not attempted)
    pub const NOT_PRESENT: i64 = -3;
    /// ADC above the byte range with the known corrupted-length signature
    pub const ADC_LENGTH_CORRUPTED: i64 = -4;
    /// Field present but undecodable because the frame structure is corrupted
    pub const CORRUPTED: i64 = -5;
    /// Acquisition time that could not be computed, in seconds
    pub const DURATION_SECONDS: f64 = -3.0;
}

/// One decoded event: a row of the acquisition table
///
/// Field names follow the on-disk column layout
/// (`UNIXTIME, CPS, TDC, ADC, nData, QF`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Frame time as the `YYMMDDHHMMSS.ffffff` number, 0 when missing
    #[serde(rename = "UNIXTIME")]
    pub timestamp: f64,
    /// Counts per second declared after the `$` marker
    #[serde(rename = "CPS")]
    pub declared_count: i64,
    /// Hex-decoded TDC value or a sentinel
    #[serde(rename = "TDC")]
    pub tdc: i64,
    /// Hex-decoded ADC value or a sentinel
    #[serde(rename = "ADC")]
    pub adc: i64,
    /// Number of sub-field groups found in the frame payload
    #[serde(rename = "nData")]
    pub subfield_count: u32,
    /// Anomalies detected while decoding the frame (0 = clean)
    #[serde(rename = "QF")]
    pub quality_flag: u32,
}

impl EventRecord {
    /// The single fallback row emitted for a frame with no usable count region
    pub fn unusable() -> Self {
        Self {
            timestamp: 0.0,
            declared_count: sentinel::NOT_PRESENT,
            tdc: sentinel::NOT_PRESENT,
            adc: sentinel::NOT_PRESENT,
            subfield_count: 0,
            quality_flag: 1,
        }
    }

    /// True if any anomaly was detected on the frame this row came from
    pub fn is_corrupted(&self) -> bool {
        self.quality_flag > 0
    }

    /// Declared events that were not recovered from the payload
    pub fn count_loss(&self) -> i64 {
        self.declared_count - i64::from(self.subfield_count)
    }
}

/// Which half of a sub-field group an anomaly refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subfield {
    Tdc,
    Adc,
}

impl fmt::Display for Subfield {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subfield::Tdc => write!(f, "TDC"),
            Subfield::Adc => write!(f, "ADC"),
        }
    }
}

/// A problem detected while decoding a single frame
///
/// Each anomaly adds one to the frame's quality flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// No `$` marker past index 1, or no integer after it
    UnusableLine,
    /// The timestamp region is empty or not a number
    TimestampUnparsable(String),
    /// A `v` marker precedes the first `t`, or `u` appears inside the payload
    InterleavedMarkers,
    /// A group with no recoverable half, extra separators or a stray marker
    MalformedGroup { group: usize },
    /// A hex sub-field failed to decode
    SubfieldDecodeFailure {
        group: usize,
        field: Subfield,
        text: String,
    },
    /// ADC above 255 whose third hex digit is 1
    KnownCorruptionPattern { group: usize, value: i64 },
    /// Groups found differ from the declared count
    CountMismatch { declared: i64, found: u32 },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::UnusableLine => write!(f, "no usable count region"),
            Anomaly::TimestampUnparsable(text) => write!(f, "unparsable timestamp {:?}", text),
            Anomaly::InterleavedMarkers => write!(f, "markers interleaved out of order"),
            Anomaly::MalformedGroup { group } => write!(f, "malformed group #{}", group),
            Anomaly::SubfieldDecodeFailure { group, field, text } => {
                write!(f, "{} of group #{} is not hex: {:?}", field, group, text)
            }
            Anomaly::KnownCorruptionPattern { group, value } => {
                write!(f, "ADC of group #{} has corrupted length (0x{:X})", group, value)
            }
            Anomaly::CountMismatch { declared, found } => {
                write!(f, "declared {} events but found {}", declared, found)
            }
        }
    }
}

/// Acquisition time covered by one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionTime {
    /// Last valid timestamp minus first valid timestamp
    Measured(Duration),
    /// No valid timestamp in the file
    Unavailable,
}

impl AcquisitionTime {
    /// Duration in seconds, or the -3 sentinel
    pub fn seconds(&self) -> f64 {
        match self {
            AcquisitionTime::Measured(duration) => duration_seconds(duration),
            AcquisitionTime::Unavailable => sentinel::DURATION_SECONDS,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        match self {
            AcquisitionTime::Measured(duration) => Some(*duration),
            AcquisitionTime::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, AcquisitionTime::Measured(_))
    }
}

impl fmt::Display for AcquisitionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionTime::Measured(duration) => write!(f, "{:.3} s", duration_seconds(duration)),
            AcquisitionTime::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Convert a chrono duration to fractional seconds
pub fn duration_seconds(duration: &Duration) -> f64 {
    match duration.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => duration.num_milliseconds() as f64 / 1_000.0,
    }
}

/// Rows decoded from one frame file
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionTable {
    /// File name the rows came from
    pub source: String,
    /// Rows in frame order
    pub records: Vec<EventRecord>,
    /// Acquisition time derived from the first/last valid timestamps
    pub duration: AcquisitionTime,
    /// Non-blank frames decoded
    pub frames: usize,
    /// Frames with at least one anomaly
    pub corrupted_frames: usize,
}

impl AcquisitionTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EventRecord> {
        self.records.iter()
    }

    /// Rows whose frame had at least one anomaly
    pub fn corrupted_rows(&self) -> usize {
        self.records.iter().filter(|r| r.is_corrupted()).count()
    }
}

/// Per-file entry of a merged corpus
#[derive(Debug, Clone, PartialEq)]
pub struct FileSummary {
    pub name: String,
    pub rows: usize,
    pub corrupted_rows: usize,
    pub duration: AcquisitionTime,
}

/// Rows of every file merged from one directory scan
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusTable {
    /// Concatenated rows in file-name order
    pub records: Vec<EventRecord>,
    /// Merged files in the order their rows appear
    pub files: Vec<FileSummary>,
    /// Sum of the available per-file durations
    pub total_duration: Duration,
    /// Files whose duration could not be computed
    pub duration_errors: usize,
    /// Files that could not be read
    pub failed_files: Vec<PathBuf>,
    /// Files rejected by the name filters
    pub skipped_files: usize,
}

impl Default for CorpusTable {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            files: Vec::new(),
            total_duration: Duration::zero(),
            duration_errors: 0,
            failed_files: Vec::new(),
            skipped_files: 0,
        }
    }
}

impl CorpusTable {
    /// Move the rows of a file table into the corpus
    pub fn append(&mut self, table: AcquisitionTable) {
        match table.duration {
            AcquisitionTime::Measured(duration) => {
                self.total_duration = self.total_duration + duration;
            }
            AcquisitionTime::Unavailable => {
                log::warn!("Acquisition time unavailable for {}", table.source);
                self.duration_errors += 1;
            }
        }

        self.files.push(FileSummary {
            corrupted_rows: table.corrupted_rows(),
            name: table.source,
            rows: table.records.len(),
            duration: table.duration,
        });
        self.records.extend(table.records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn files_merged(&self) -> usize {
        self.files.len()
    }

    pub fn total_seconds(&self) -> f64 {
        duration_seconds(&self.total_duration)
    }

    /// Per-row weight turning counts into rates (1 / total seconds)
    pub fn rate_weight(&self) -> Option<f64> {
        let seconds = self.total_seconds();
        if seconds > 0.0 {
            Some(1.0 / seconds)
        } else {
            None
        }
    }
}

/// Errors that can occur while loading frame files
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported file {path:?}: expected a .{expected} file")]
    UnsupportedExtension { path: PathBuf, expected: String },

    #[error("Directory not found: {0:?}")]
    DirectoryMissing(PathBuf),

    #[error("No files matched in {directory:?} (include: {include:?}, exclude: {exclude:?})")]
    NoFilesMatched {
        directory: PathBuf,
        include: Option<String>,
        exclude: Option<String>,
    },

    #[error("Table format error: {0}")]
    TableFormat(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
