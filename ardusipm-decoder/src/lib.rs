//! ArduSiPM Log Decoder Library
//!
//! A stateless, reusable library for decoding the serial frames written by the
//! ArduSiPM detector into event tables.
//!
//! # Architecture
//!
//! This library is intentionally minimal and focused on decoding:
//! - Decodes raw frames (`u<time>t<tdc>v<adc>...$<cps>`) into event rows
//! - Loads frame files into per-file acquisition tables
//! - Merges whole directories of runs into one corpus table
//! - Summarizes corruption per declared count
//!
//! Decoding never fails on bad data: every problem found in a frame is
//! counted in the quality flag of its rows. Only caller errors (missing
//! directory, unreadable file) are returned as [`DecoderError`].
//!
//! Plotting and interactive analysis are left to the tools that read the
//! exported tables.
//!
//! # Example Usage
//!
//! ```no_run
//! use ardusipm_decoder::{quality_report, Decoder, DecoderConfig, MergeConfig};
//! use std::path::Path;
//!
//! let decoder = Decoder::with_config(DecoderConfig::new().with_legacy_payload(false));
//!
//! // Merge every background run of a directory
//! let config = MergeConfig::new().with_include("bg").with_exclude("SoloCounts");
//! let corpus = decoder.merge_directory(Path::new("data"), &config).unwrap();
//! println!("{} rows over {:.0} s", corpus.len(), corpus.total_seconds());
//!
//! for (cps, rate) in quality_report(&corpus.records) {
//!     println!("CPS {}: {:.1}% corrupted", cps, rate * 100.0);
//! }
//! ```

// Public modules
pub mod capture;
pub mod config;
pub mod decoder;
pub mod export;
pub mod formats;
pub mod merger;
pub mod quality;
pub mod threshold;
pub mod timestamp;
pub mod types;

// Re-export main types for convenience
pub use config::{DecoderConfig, MergeConfig, ParseMode};
pub use decoder::Decoder;
pub use formats::{DecodedLine, FrameDecoder};
pub use quality::{loss_distribution, quality_report, QualityReport};
pub use threshold::{ThresholdPoint, DEFAULT_ADC_CUT};
pub use types::{
    sentinel, AcquisitionTable, AcquisitionTime, Anomaly, CorpusTable, DecoderError,
    EventRecord, FileSummary, Result, Subfield,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
