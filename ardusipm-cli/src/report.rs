//! Report generation
//!
//! Renders run summaries as plain text or JSON.

use crate::config::OutputFormat;
use anyhow::Result;
use ardusipm_decoder::{AcquisitionTable, CorpusTable, QualityReport, ThresholdPoint};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// One merged file of a run summary
#[derive(Debug, Clone, Serialize)]
pub struct FileLine {
    pub name: String,
    pub rows: usize,
    pub corrupted_rows: usize,
    /// -3 when the acquisition time is unavailable
    pub seconds: f64,
}

/// Summary of a decoded file or merged directory
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub files: Vec<FileLine>,
    pub rows: usize,
    pub corrupted_rows: usize,
    pub total_seconds: f64,
    pub duration_errors: usize,
    pub skipped_files: usize,
    pub failed_files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityReport>,
}

impl RunSummary {
    pub fn from_table(table: &AcquisitionTable) -> Self {
        let file = FileLine {
            name: table.source.clone(),
            rows: table.len(),
            corrupted_rows: table.corrupted_rows(),
            seconds: table.duration.seconds(),
        };
        Self {
            rows: file.rows,
            corrupted_rows: file.corrupted_rows,
            total_seconds: table.duration.seconds().max(0.0),
            duration_errors: usize::from(!table.duration.is_available()),
            skipped_files: 0,
            failed_files: Vec::new(),
            files: vec![file],
            quality: None,
        }
    }

    pub fn from_corpus(corpus: &CorpusTable) -> Self {
        Self {
            files: corpus
                .files
                .iter()
                .map(|f| FileLine {
                    name: f.name.clone(),
                    rows: f.rows,
                    corrupted_rows: f.corrupted_rows,
                    seconds: f.duration.seconds(),
                })
                .collect(),
            rows: corpus.len(),
            corrupted_rows: corpus.records.iter().filter(|r| r.is_corrupted()).count(),
            total_seconds: corpus.total_seconds(),
            duration_errors: corpus.duration_errors,
            skipped_files: corpus.skipped_files,
            failed_files: corpus.failed_files.clone(),
            quality: None,
        }
    }

    pub fn with_quality(mut self, quality: QualityReport) -> Self {
        self.quality = Some(quality);
        self
    }
}

/// Write a run summary
pub fn write_summary(out: &mut impl Write, summary: &RunSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, summary)?;
            writeln!(out)?;
        }
        OutputFormat::Txt => {
            writeln!(out, "Files:")?;
            for file in &summary.files {
                writeln!(
                    out,
                    "  {:<40} {:>8} rows {:>6} corrupted {:>12.3} s",
                    file.name, file.rows, file.corrupted_rows, file.seconds
                )?;
            }
            writeln!(out)?;
            writeln!(out, "Rows:             {}", summary.rows)?;
            writeln!(out, "Corrupted rows:   {}", summary.corrupted_rows)?;
            writeln!(out, "Acquiring time:   {:.3} s", summary.total_seconds)?;
            if summary.duration_errors > 0 {
                writeln!(out, "Duration errors:  {}", summary.duration_errors)?;
            }
            if summary.skipped_files > 0 {
                writeln!(out, "Skipped files:    {}", summary.skipped_files)?;
            }
            for path in &summary.failed_files {
                writeln!(out, "Failed:           {:?}", path)?;
            }
            if let Some(quality) = &summary.quality {
                write_quality(out, quality)?;
            }
        }
    }
    Ok(())
}

fn write_quality(out: &mut impl Write, quality: &QualityReport) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "Quality by CPS:")?;
    for (cps, stats) in &quality.buckets {
        writeln!(
            out,
            "  CPS {:>4}: {:>8} rows {:>6.2}% corrupted",
            cps,
            stats.rows,
            stats.rate() * 100.0
        )?;
    }
    writeln!(out, "Overall:  {:.2}% corrupted", quality.overall_rate() * 100.0)?;
    if let Some(mean) = quality.mean_declared_count {
        writeln!(out, "CPS mean: {:.3}", mean)?;
    }
    Ok(())
}

/// Write a threshold-scan summary
pub fn write_thresholds(out: &mut impl Write, points: &[ThresholdPoint], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, points)?;
            writeln!(out)?;
        }
        OutputFormat::Txt => {
            writeln!(out, "{:>9} {:>8} {:>9} {:>9} {:>10}", "threshold", "rows", "above cut", "CPS mean", "rate (Hz)")?;
            for point in points {
                let mean = point
                    .mean_declared_count
                    .map_or_else(|| "-".to_string(), |m| format!("{:.3}", m));
                let rate = point
                    .rate_above_cut()
                    .map_or_else(|| "-".to_string(), |r| format!("{:.4}", r));
                writeln!(
                    out,
                    "{:>9} {:>8} {:>9} {:>9} {:>10}",
                    point.threshold, point.rows, point.above_cut, mean, rate
                )?;
            }
        }
    }
    Ok(())
}
