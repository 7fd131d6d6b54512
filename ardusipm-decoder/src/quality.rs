//! Quality summaries over decoded tables
//!
//! Buckets rows by their declared count to show how corruption grows with
//! event rate.

use crate::types::EventRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Row totals of one declared-count bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketStats {
    pub rows: usize,
    pub corrupted: usize,
}

impl BucketStats {
    /// Corrupted rows over total rows
    pub fn rate(&self) -> f64 {
        if self.rows == 0 {
            0.0
        } else {
            self.corrupted as f64 / self.rows as f64
        }
    }
}

/// Corruption summary of a table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityReport {
    /// Totals keyed by declared count
    pub buckets: BTreeMap<i64, BucketStats>,
    pub total_rows: usize,
    pub corrupted_rows: usize,
    /// Mean declared count over rows with a usable count
    pub mean_declared_count: Option<f64>,
}

impl QualityReport {
    pub fn from_records(records: &[EventRecord]) -> Self {
        let mut report = Self::default();
        let mut declared_sum = 0i64;
        let mut declared_rows = 0usize;

        for record in records {
            let bucket = report.buckets.entry(record.declared_count).or_default();
            bucket.rows += 1;
            report.total_rows += 1;
            if record.is_corrupted() {
                bucket.corrupted += 1;
                report.corrupted_rows += 1;
            }
            if record.declared_count >= 0 {
                declared_sum += record.declared_count;
                declared_rows += 1;
            }
        }

        if declared_rows > 0 {
            report.mean_declared_count = Some(declared_sum as f64 / declared_rows as f64);
        }
        report
    }

    /// Corruption rate per declared count
    pub fn corruption_rates(&self) -> BTreeMap<i64, f64> {
        self.buckets
            .iter()
            .map(|(&declared, stats)| (declared, stats.rate()))
            .collect()
    }

    pub fn corruption_rate(&self, declared_count: i64) -> Option<f64> {
        self.buckets.get(&declared_count).map(BucketStats::rate)
    }

    /// Corrupted rows over all rows
    pub fn overall_rate(&self) -> f64 {
        if self.total_rows == 0 {
            0.0
        } else {
            self.corrupted_rows as f64 / self.total_rows as f64
        }
    }
}

/// Fraction of corrupted rows for each declared count
pub fn quality_report(records: &[EventRecord]) -> BTreeMap<i64, f64> {
    QualityReport::from_records(records).corruption_rates()
}

/// Rows per (declared count, declared count - groups found)
pub fn loss_distribution(records: &[EventRecord]) -> BTreeMap<(i64, i64), usize> {
    let mut distribution = BTreeMap::new();
    for record in records {
        *distribution
            .entry((record.declared_count, record.count_loss()))
            .or_insert(0) += 1;
    }
    distribution
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(declared: i64, found: u32, quality: u32) -> EventRecord {
        EventRecord {
            timestamp: 200101120000.0,
            declared_count: declared,
            tdc: 1,
            adc: 2,
            subfield_count: found,
            quality_flag: quality,
        }
    }

    #[test]
    fn test_clean_table_has_zero_rates() {
        let records = vec![row(0, 0, 0), row(1, 1, 0), row(2, 2, 0), row(2, 2, 0)];
        let rates = quality_report(&records);
        assert_eq!(rates.len(), 3);
        assert!(rates.values().all(|&rate| rate == 0.0));
    }

    #[test]
    fn test_rates_per_bucket() {
        let records = vec![row(1, 1, 0), row(1, 1, 1), row(3, 2, 1), row(3, 2, 1), row(0, 0, 0)];
        let report = QualityReport::from_records(&records);

        assert_eq!(report.corruption_rate(0), Some(0.0));
        assert_eq!(report.corruption_rate(1), Some(0.5));
        assert_eq!(report.corruption_rate(3), Some(1.0));
        assert_eq!(report.corruption_rate(7), None);
        assert_eq!(report.corrupted_rows, 3);
        assert_eq!(report.overall_rate(), 0.6);
        assert_eq!(report.mean_declared_count, Some(1.6));
    }

    #[test]
    fn test_sentinel_rows_excluded_from_mean() {
        let records = vec![EventRecord::unusable(), row(4, 4, 0)];
        let report = QualityReport::from_records(&records);
        assert_eq!(report.buckets[&-3].corrupted, 1);
        assert_eq!(report.mean_declared_count, Some(4.0));
        assert_eq!(QualityReport::from_records(&[]).mean_declared_count, None);
    }

    #[test]
    fn test_loss_distribution() {
        let records = vec![row(3, 2, 1), row(3, 2, 1), row(3, 3, 0), row(1, 1, 0)];
        let distribution = loss_distribution(&records);
        assert_eq!(distribution[&(3, 1)], 2);
        assert_eq!(distribution[&(3, 0)], 1);
        assert_eq!(distribution[&(1, 0)], 1);
        assert_eq!(distribution.len(), 3);
    }
}
