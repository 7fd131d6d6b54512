//! Threshold scans
//!
//! A threshold scan is a directory of runs named `...Scan_<threshold>.csv`,
//! one per discriminator setting. Each run is summarized on its own.

use crate::config::MergeConfig;
use crate::decoder::Decoder;
use crate::merger::select_files;
use crate::quality::QualityReport;
use crate::types::Result;
use serde::Serialize;
use std::path::Path;

/// ADC cut applied when counting events of a scan point
pub const DEFAULT_ADC_CUT: i64 = 16;

/// Summary of one run of a threshold scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdPoint {
    pub threshold: u32,
    pub file: String,
    pub rows: usize,
    /// Rows whose ADC is above the cut
    pub above_cut: usize,
    pub mean_declared_count: Option<f64>,
    /// Acquisition time in seconds, -3 when unavailable
    pub seconds: f64,
}

impl ThresholdPoint {
    /// Rows above the cut per second of acquisition
    pub fn rate_above_cut(&self) -> Option<f64> {
        if self.seconds > 0.0 {
            Some(self.above_cut as f64 / self.seconds)
        } else {
            None
        }
    }
}

/// Threshold encoded in a scan file name: the integer between `Scan_` and the next `.`
pub fn threshold_from_file_name(name: &str) -> Option<u32> {
    let (_, rest) = name.split_once("Scan_")?;
    let value = rest.split('.').next()?;
    value.parse().ok()
}

/// Summarize every run of a threshold-scan directory, ordered by threshold
pub fn scan_thresholds(
    decoder: &Decoder,
    directory: &Path,
    config: &MergeConfig,
    adc_cut: i64,
) -> Result<Vec<ThresholdPoint>> {
    let selection = select_files(directory, &decoder.config().extension, config)?;
    let mut points = Vec::new();

    for path in &selection.files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let Some(threshold) = threshold_from_file_name(name) else {
            log::info!("Skipping {} (no threshold in name)", name);
            continue;
        };

        let table = match decoder.parse_file(path, config.mode) {
            Ok(table) => table,
            Err(e) => {
                log::error!("Failed to load {:?}: {}", path, e);
                continue;
            }
        };

        let report = QualityReport::from_records(&table.records);
        let point = ThresholdPoint {
            threshold,
            file: table.source.clone(),
            rows: table.len(),
            above_cut: table.iter().filter(|r| r.adc > adc_cut).count(),
            mean_declared_count: report.mean_declared_count,
            seconds: table.duration.seconds(),
        };
        if !table.duration.is_available() {
            log::warn!("Threshold {}: acquisition time unavailable", threshold);
        }
        log::debug!("Threshold {}: {} rows, {} above ADC {}", threshold, point.rows, point.above_cut, adc_cut);
        points.push(point);
    }

    points.sort_by_key(|point| point.threshold);
    Ok(points)
}
