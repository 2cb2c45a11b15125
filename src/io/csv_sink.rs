//! Append-only CSV log of cycle records.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use super::{PersistenceSink, last_energy_of};
use crate::cycle::types::CycleRecord;
use crate::error::SinkError;
use crate::site::TenantLocation;

/// Column header for the record log.
pub const HEADER: &str = "tenant,location,timestamp,temperature,humidity,co2,o2,voc,\
                          renewable_energy,avg_power,soil_moisture,power_factor,\
                          cumulative_energy";

/// Persistence sink backed by one CSV file.
///
/// Each cycle appends its rows; the header is written once when the file
/// is created. Writes are serialized so overlapping fire-and-forget flushes
/// never interleave rows.
pub struct CsvSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceSink for CsvSink {
    fn write_cycle(&self, records: &[CycleRecord]) -> Result<(), SinkError> {
        if records.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock();

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let is_new = file.metadata()?.len() == 0;
        write_records(records, BufWriter::new(file), is_new)?;

        debug!(path = %self.path.display(), rows = records.len(), "appended cycle records");
        Ok(())
    }

    fn last_energy(&self) -> Result<HashMap<TenantLocation, f64>, SinkError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };
        let records = read_records(file)?;
        Ok(last_energy_of(&records))
    }
}

/// Writes records as CSV, with the header row when `with_header` is set.
///
/// # Errors
///
/// Returns a `SinkError` if serialization or writing fails.
pub fn write_records(
    records: &[CycleRecord],
    writer: impl Write,
    with_header: bool,
) -> Result<(), SinkError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    if with_header {
        wtr.write_record(HEADER.split(',').map(str::trim))?;
    }
    for record in records {
        wtr.serialize(record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Parses every record from a CSV log.
///
/// # Errors
///
/// Returns `SinkError::Corrupt` with the offending line when a row does
/// not parse.
pub fn read_records(reader: impl Read) -> Result<Vec<CycleRecord>, SinkError> {
    let mut rdr = csv::ReaderBuilder::new().from_reader(reader);
    let mut out = Vec::new();
    for row in rdr.deserialize::<CycleRecord>() {
        let record = row.map_err(|e| SinkError::Corrupt {
            line: e.position().map_or(0, csv::Position::line),
            message: e.to_string(),
        })?;
        out.push(record);
    }
    Ok(out)
}
