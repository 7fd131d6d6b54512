//! Standalone ArduSiPM frame file decoder
//!
//! This tool decodes one frame file and prints its rows, the anomalies of
//! every corrupted frame and a per-CPS quality summary.
//!
//! Usage:
//!   decode_frames <run.csv> [--limit <count>] [--legacy] [--verbose]
//!
//! Example:
//!   decode_frames 200101120000_bg.csv --limit 20

use ardusipm_decoder::decoder::split_frames;
use ardusipm_decoder::{Decoder, DecoderConfig, EventRecord, ParseMode, QualityReport};
use std::env;
use std::fs;
use std::path::PathBuf;

fn print_row(row: &EventRecord) {
    println!(
        "  {:>19.6} CPS={:<3} TDC={:<6} ADC={:<6} nData={:<3} QF={}",
        row.timestamp, row.declared_count, row.tdc, row.adc, row.subfield_count, row.quality_flag
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <run.csv> [--limit <count>] [--legacy] [--verbose]", args[0]);
        eprintln!("\nExample:");
        eprintln!("  {} 200101120000_bg.csv --limit 20", args[0]);
        std::process::exit(1);
    }

    let frame_file = PathBuf::from(&args[1]);
    let mut limit: Option<usize> = None;
    let mut legacy = false;
    let mut verbose = false;

    // Parse arguments
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" => {
                i += 1;
                if i < args.len() {
                    limit = Some(args[i].parse()?);
                }
            }
            "--legacy" => {
                legacy = true;
            }
            "--verbose" | "-v" => {
                verbose = true;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    println!("=== ArduSiPM Frame Decoder ===");
    println!("Frame file: {:?}", frame_file);
    println!("Legacy payload: {}", legacy);
    println!();

    let decoder = Decoder::with_config(DecoderConfig::new().with_legacy_payload(legacy));
    let content = fs::read_to_string(&frame_file)?;

    let mut shown = 0;
    for frame in split_frames(&content) {
        if limit.is_some_and(|n| shown >= n) {
            break;
        }
        let decoded = decoder.decode_line(frame, ParseMode::Full);
        if decoded.is_blank() {
            continue;
        }
        shown += 1;

        if verbose || decoded.quality() > 0 {
            println!("{}", frame.trim());
            for row in &decoded.events {
                print_row(row);
            }
            for anomaly in &decoded.anomalies {
                println!("    ! {}", anomaly);
            }
        }
    }

    let table = decoder.parse_file(&frame_file, ParseMode::Full)?;
    let report = QualityReport::from_records(&table.records);

    println!("\n=== DECODING SUMMARY ===");
    println!("Frames decoded: {}", table.frames);
    println!("Corrupted frames: {}", table.corrupted_frames);
    println!("Rows: {}", table.len());
    println!("Acquisition time: {}", table.duration);
    if let Some(mean) = report.mean_declared_count {
        println!("Mean CPS: {:.2}", mean);
    }

    println!("\nCorruption by CPS:");
    for (cps, stats) in &report.buckets {
        println!("  CPS {:>3}: {:>6} rows, {:>5.1}% corrupted", cps, stats.rows, stats.rate() * 100.0);
    }

    Ok(())
}
