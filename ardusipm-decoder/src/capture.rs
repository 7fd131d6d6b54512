//! Frame capture
//!
//! Producer side of the frame file format: each serial line from the detector
//! is prefixed with `u` and the local time, and a run is saved as one line of
//! comma-terminated frames.

use crate::timestamp::format_frame_time;
use crate::types::Result;
use chrono::NaiveDateTime;
use std::io::Write;

/// Prefix a raw serial line with its acquisition time
pub fn stamp_frame(time: &NaiveDateTime, raw: &str) -> String {
    format!("u{}{}", format_frame_time(time), raw.trim_end())
}

/// Name of the frame file of a run started at `start`
pub fn capture_file_name(start: &NaiveDateTime, tag: &str) -> String {
    format!("{}_{}.csv", start.format("%y%m%d%H%M%S"), tag)
}

/// Write frames the way the acquisition program saved them
///
/// Returns the number of frames written.
pub fn save_frames<'a, W, I>(writer: &mut W, frames: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a str>,
{
    let mut written = 0;
    for frame in frames {
        writer.write_all(frame.as_bytes())?;
        writer.write_all(b",")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{split_frames, Decoder};
    use crate::ParseMode;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_micro_opt(12, 0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_stamp_frame() {
        assert_eq!(stamp_frame(&start(), "t0av14$1\r\n"), "u200101120000.000000t0av14$1");
    }

    #[test]
    fn test_capture_file_name() {
        assert_eq!(capture_file_name(&start(), "bg"), "200101120000_bg.csv");
    }

    #[test]
    fn test_saved_frames_decode() {
        let frames = vec![
            stamp_frame(&start(), "t0av14$1"),
            stamp_frame(&(start() + chrono::Duration::seconds(2)), "$0"),
        ];
        let mut buffer = Vec::new();
        let written = save_frames(&mut buffer, frames.iter().map(String::as_str)).unwrap();
        assert_eq!(written, 2);

        let content = String::from_utf8(buffer).unwrap();
        assert!(content.ends_with("$0,"));

        let table = Decoder::new().parse_frames("run.csv", split_frames(&content), ParseMode::Full);
        assert_eq!(table.len(), 2);
        assert_eq!(table.corrupted_frames, 0);
        assert_eq!(table.duration.seconds(), 2.0);
    }
}
