//! Counts-only frame decoding
//!
//! Reduced-fidelity decoding for files recorded with TDC and ADC disabled:
//! only the timestamp and the declared count are read. Rows have the same
//! shape as full decoding, with `TDC`/`ADC` set to 0.

use super::frame::DecodedLine;
use super::tokenizer::{tokenize, MarkerIndex};
use crate::timestamp::{parse_frame_time, FRAME_TIME_WIDTH};
use crate::types::{Anomaly, EventRecord};

/// Decode the timestamp and count of one frame
pub fn decode_counts(line: &str) -> DecodedLine {
    let line = line.trim();
    if line.is_empty() {
        return DecodedLine::default();
    }

    let markers = MarkerIndex::from_tokens(&tokenize(line));
    let dollar = match markers.count {
        Some(offset) if offset > 1 => offset,
        _ => return DecodedLine::unusable(),
    };
    let Ok(declared) = line[dollar + 1..].trim().parse::<i64>() else {
        return DecodedLine::unusable();
    };

    let from = markers.time.map_or(0, |offset| offset + 1);
    let data_start = markers.frame_start().map_or(dollar, |(_, offset)| offset);
    let to = (from + FRAME_TIME_WIDTH).min(data_start);
    let text = line.get(from..to).unwrap_or("");

    let mut anomalies = Vec::new();
    let timestamp = match parse_frame_time(text) {
        Some(timestamp) => timestamp,
        None if markers.time.is_none() && text.is_empty() => 0.0,
        None => {
            anomalies.push(Anomaly::TimestampUnparsable(text.to_string()));
            0.0
        }
    };

    let row = EventRecord {
        timestamp,
        declared_count: declared,
        tdc: 0,
        adc: 0,
        subfield_count: 0,
        quality_flag: 0,
    };
    DecodedLine::from_parts(vec![row], anomalies)
}
