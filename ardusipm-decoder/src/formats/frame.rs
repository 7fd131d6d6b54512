//! Frame decoder
//!
//! Second pass of frame decoding: groups the tokens of one frame into events.
//!
//! ## Frame layout
//! `u<YYMMDDHHMMSS.ffffff>t<tdc>v<adc>t<tdc>v<adc>...$<cps>`
//!
//! - TDC-led payloads (`t` opens each group) are the common case
//! - ADC-only payloads (`v` opens each group, no `t`) come from firmware running
//!   without the TDC
//! - A frame with no payload carries the count only
//!
//! Decoding never fails. Every problem becomes an [`Anomaly`]; the number of
//! anomalies is the quality flag stored on every row of the frame.

use super::tokenizer::{tokenize, tokens_between, Marker, MarkerIndex, Token};
use crate::config::DecoderConfig;
use crate::timestamp::parse_frame_time;
use crate::types::{sentinel, Anomaly, EventRecord, Subfield};

/// Rows and anomalies produced by one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedLine {
    pub events: Vec<EventRecord>,
    pub anomalies: Vec<Anomaly>,
}

impl DecodedLine {
    /// Anomalies detected on the frame (0 = decoded as expected)
    pub fn quality(&self) -> u32 {
        self.anomalies.len() as u32
    }

    /// True for a blank frame, which produces no rows
    pub fn is_blank(&self) -> bool {
        self.events.is_empty() && self.anomalies.is_empty()
    }

    /// The single sentinel row of a frame with no usable count region
    pub(crate) fn unusable() -> Self {
        Self {
            events: vec![EventRecord::unusable()],
            anomalies: vec![Anomaly::UnusableLine],
        }
    }

    /// Stamp the frame quality on every row
    pub(crate) fn from_parts(mut events: Vec<EventRecord>, anomalies: Vec<Anomaly>) -> Self {
        let quality = anomalies.len() as u32;
        for event in &mut events {
            event.quality_flag = quality;
        }
        Self { events, anomalies }
    }
}

/// Which marker opens each group of the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    TdcLed,
    AdcOnly,
}

impl Layout {
    fn opener(self) -> Marker {
        match self {
            Layout::TdcLed => Marker::Tdc,
            Layout::AdcOnly => Marker::Adc,
        }
    }

    fn max_halves(self) -> usize {
        match self {
            Layout::TdcLed => 2,
            Layout::AdcOnly => 1,
        }
    }
}

/// Field texts of one payload group, split at `v` for TDC-led payloads
#[derive(Debug, Clone, PartialEq, Eq)]
struct Group<'a> {
    halves: Vec<&'a str>,
    stray_marker: bool,
}

impl<'a> Group<'a> {
    fn open() -> Self {
        Self {
            halves: vec![""],
            stray_marker: false,
        }
    }
}

/// Decoded values of one group, threaded from the TDC half to the ADC half
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GroupState {
    tdc: i64,
    adc: i64,
    decode_failed: bool,
}

impl GroupState {
    fn new() -> Self {
        Self {
            tdc: sentinel::NOT_PRESENT,
            adc: sentinel::NOT_PRESENT,
            decode_failed: false,
        }
    }

    fn is_empty(&self) -> bool {
        self.tdc == sentinel::NOT_PRESENT && self.adc == sentinel::NOT_PRESENT
    }
}

fn group_tokens<'a>(tokens: &[Token<'a>], layout: Layout) -> Vec<Group<'a>> {
    let mut groups = Vec::new();
    let mut current: Option<Group<'a>> = None;

    for token in tokens {
        match *token {
            Token::Marker { marker, .. } if marker == layout.opener() => {
                groups.extend(current.take());
                current = Some(Group::open());
            }
            Token::Marker { marker, .. } => {
                let group = current.get_or_insert_with(Group::open);
                if layout == Layout::TdcLed && marker == Marker::Adc {
                    group.halves.push("");
                } else {
                    group.stray_marker = true;
                }
            }
            Token::Field { text, .. } => {
                let group = current.get_or_insert_with(Group::open);
                if let Some(last) = group.halves.last_mut() {
                    *last = text;
                }
            }
        }
    }

    groups.extend(current);
    groups
}

/// Parse a hexadecimal wire value (digits only, no sign or prefix)
fn decode_hex(text: &str) -> Option<i64> {
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    i64::from_str_radix(text, 16).ok()
}

/// ADC above the byte range whose third hex digit is 1
fn is_length_corrupted(text: &str, value: i64) -> bool {
    value > 255 && text.chars().nth(2).and_then(|c| c.to_digit(16)) == Some(1)
}

/// Decoder for single frames
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    config: DecoderConfig,
}

impl FrameDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode one raw frame into its event rows
    ///
    /// Blank lines yield no rows. A frame without a usable `$` region yields
    /// one sentinel row. Otherwise every payload group yields exactly one row,
    /// and a count-only frame yields one row with both sub-fields absent.
    pub fn decode(&self, line: &str) -> DecodedLine {
        let line = line.trim();
        if line.is_empty() {
            return DecodedLine::default();
        }

        let tokens = tokenize(line);
        let markers = MarkerIndex::from_tokens(&tokens);
        if self.config.trace_frames {
            log::trace!("Frame {:?}: markers {:?}", line, markers);
        }

        let dollar = match markers.count {
            Some(offset) if offset > 1 => offset,
            _ => {
                log::debug!("Unusable frame (no count region): {:?}", line);
                return DecodedLine::unusable();
            }
        };
        let declared = match line[dollar + 1..].trim().parse::<i64>() {
            Ok(count) => count,
            Err(_) => {
                log::debug!("Unusable frame (bad count): {:?}", line);
                return DecodedLine::unusable();
            }
        };
        let Some((first, data_start)) = markers.frame_start() else {
            return DecodedLine::unusable();
        };

        let mut anomalies = Vec::new();
        let timestamp = self.decode_timestamp(line, &markers, data_start, &mut anomalies);

        if first == Marker::Time || Self::is_interleaved(&markers) {
            anomalies.push(Anomaly::InterleavedMarkers);
            let row = EventRecord {
                timestamp,
                declared_count: declared,
                tdc: sentinel::NOT_PRESENT,
                adc: sentinel::CORRUPTED,
                subfield_count: 0,
                quality_flag: 0,
            };
            return self.finish(line, vec![row], anomalies);
        }

        let end = self.payload_end(line, data_start, dollar);
        let events = match first {
            Marker::Tdc => self.decode_payload(&tokens, data_start, end, Layout::TdcLed, timestamp, declared, &mut anomalies),
            Marker::Adc => self.decode_payload(&tokens, data_start, end, Layout::AdcOnly, timestamp, declared, &mut anomalies),
            _ => vec![EventRecord {
                timestamp,
                declared_count: declared,
                tdc: sentinel::NOT_PRESENT,
                adc: sentinel::NOT_PRESENT,
                subfield_count: 0,
                quality_flag: 0,
            }],
        };

        let found = events.first().map_or(0, |event| event.subfield_count);
        if i64::from(found) != declared {
            anomalies.push(Anomaly::CountMismatch { declared, found });
        }

        self.finish(line, events, anomalies)
    }

    /// `v` before the first `t` when that `t` is not where the data starts
    fn is_interleaved(markers: &MarkerIndex) -> bool {
        matches!((markers.tdc, markers.adc), (Some(tdc), Some(adc)) if tdc > 0 && adc < tdc)
    }

    /// Where the payload ends: at `$`, or before the extra character that
    /// firmware older than 2.6 writes ahead of it
    fn payload_end(&self, line: &str, data_start: usize, dollar: usize) -> usize {
        if !self.config.legacy_payload {
            return dollar;
        }
        line[..dollar]
            .char_indices()
            .next_back()
            .map_or(dollar, |(offset, _)| offset)
            .max(data_start + 1)
    }

    fn decode_timestamp(
        &self,
        line: &str,
        markers: &MarkerIndex,
        data_start: usize,
        anomalies: &mut Vec<Anomaly>,
    ) -> f64 {
        let from = markers.time.map_or(0, |offset| offset + 1);
        let text = line.get(from..data_start).unwrap_or("");

        // untimed raw frame
        if markers.time.is_none() && text.trim().is_empty() {
            return 0.0;
        }

        match parse_frame_time(text) {
            Some(timestamp) => timestamp,
            None => {
                anomalies.push(Anomaly::TimestampUnparsable(text.to_string()));
                0.0
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn decode_payload(
        &self,
        tokens: &[Token<'_>],
        data_start: usize,
        end: usize,
        layout: Layout,
        timestamp: f64,
        declared: i64,
        anomalies: &mut Vec<Anomaly>,
    ) -> Vec<EventRecord> {
        let groups = group_tokens(&tokens_between(tokens, data_start, end), layout);
        let found = groups.len() as u32;

        groups
            .iter()
            .enumerate()
            .map(|(index, group)| {
                let state = self.decode_group(index, group, layout, anomalies);
                EventRecord {
                    timestamp: if state.decode_failed { 0.0 } else { timestamp },
                    declared_count: declared,
                    tdc: state.tdc,
                    adc: state.adc,
                    subfield_count: found,
                    quality_flag: 0,
                }
            })
            .collect()
    }

    fn decode_group(
        &self,
        index: usize,
        group: &Group<'_>,
        layout: Layout,
        anomalies: &mut Vec<Anomaly>,
    ) -> GroupState {
        let (tdc_text, adc_text) = match layout {
            Layout::TdcLed => (group.halves.first().copied(), group.halves.get(1).copied()),
            Layout::AdcOnly => (None, group.halves.first().copied()),
        };

        let state = GroupState::new();
        let state = self.decode_tdc(state, tdc_text, index, anomalies);
        let state = self.decode_adc(state, adc_text, index, anomalies);

        if group.stray_marker || group.halves.len() > layout.max_halves() {
            anomalies.push(Anomaly::MalformedGroup { group: index });
            return GroupState {
                adc: sentinel::CORRUPTED,
                ..state
            };
        }
        if state.is_empty() {
            anomalies.push(Anomaly::MalformedGroup { group: index });
        }
        state
    }

    fn decode_tdc(
        &self,
        state: GroupState,
        text: Option<&str>,
        group: usize,
        anomalies: &mut Vec<Anomaly>,
    ) -> GroupState {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return state;
        };
        match decode_hex(text) {
            Some(tdc) => GroupState { tdc, ..state },
            None => {
                anomalies.push(Anomaly::SubfieldDecodeFailure {
                    group,
                    field: Subfield::Tdc,
                    text: text.to_string(),
                });
                GroupState {
                    tdc: sentinel::CORRUPTED,
                    decode_failed: true,
                    ..state
                }
            }
        }
    }

    fn decode_adc(
        &self,
        state: GroupState,
        text: Option<&str>,
        group: usize,
        anomalies: &mut Vec<Anomaly>,
    ) -> GroupState {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return state;
        };
        match decode_hex(text) {
            Some(value) if self.config.flag_adc_overflow && is_length_corrupted(text, value) => {
                log::warn!("ADC {:?} of group #{} has the corrupted-length signature", text, group);
                anomalies.push(Anomaly::KnownCorruptionPattern { group, value });
                GroupState {
                    adc: sentinel::ADC_LENGTH_CORRUPTED,
                    ..state
                }
            }
            Some(adc) => GroupState { adc, ..state },
            None => {
                anomalies.push(Anomaly::SubfieldDecodeFailure {
                    group,
                    field: Subfield::Adc,
                    text: text.to_string(),
                });
                GroupState {
                    adc: sentinel::CORRUPTED,
                    decode_failed: true,
                    ..state
                }
            }
        }
    }

    fn finish(&self, line: &str, events: Vec<EventRecord>, anomalies: Vec<Anomaly>) -> DecodedLine {
        for anomaly in &anomalies {
            log::debug!("Frame {:?}: {}", line, anomaly);
        }
        let decoded = DecodedLine::from_parts(events, anomalies);
        if self.config.trace_frames {
            log::trace!("Frame {:?}: {:?}", line, decoded.events);
        }
        decoded
    }
}
