//! Table export
//!
//! Reads and writes decoded rows in the comma-separated layout the analysis
//! tools load: `UNIXTIME,CPS,TDC,ADC,nData,QF`.

use crate::types::{EventRecord, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Column names of the table layout, in order
pub const TABLE_COLUMNS: [&str; 6] = ["UNIXTIME", "CPS", "TDC", "ADC", "nData", "QF"];

/// Serialize rows with a header line
pub fn write_records(wtr: &mut csv::Writer<impl Write>, records: &[EventRecord]) -> Result<()> {
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Deserialize rows from a table with a header line
pub fn read_records(rdr: &mut csv::Reader<impl Read>) -> Result<Vec<EventRecord>> {
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        records.push(result?);
    }
    Ok(records)
}

/// Write rows to a table file, replacing it
pub fn write_table_file(path: &Path, records: &[EventRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(File::create(path)?);
    write_records(&mut wtr, records)?;
    log::info!("Wrote {} rows to {:?}", records.len(), path);
    Ok(())
}

/// Read every row of a table file
pub fn read_table_file(path: &Path) -> Result<Vec<EventRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(File::open(path)?);
    read_records(&mut rdr)
}
