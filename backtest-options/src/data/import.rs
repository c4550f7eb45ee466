//! LiveVol archive import.
//!
//! LiveVol end-of-day option files ship as zip archives holding one CSV per
//! day, 26 columns wide. Import copies the columns the backtester uses into
//! the normalized layout read by [`super::loader`]:
//!
//! | Normalized            | LiveVol column |
//! |-----------------------|----------------|
//! | underlying_symbol     | 0              |
//! | quote_date            | 1              |
//! | expiration .. ask     | 3 .. 14        |
//! | underlying bid / ask  | 15, 16         |
//! | vwap, open_interest   | 23, 24         |
//! | delivery_code         | 25             |
//!
//! Rows too short to carry a delivery code are skipped. Fields are copied
//! verbatim; validation happens when the normalized file is loaded.

use std::fs::{self, File};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use zip::ZipArchive;

use super::loader::NORMALIZED_COLUMNS;

/// LiveVol column feeding each normalized column, in normalized order.
const LIVEVOL_COLUMNS: [usize; 19] = [
    0,  // underlying_symbol
    1,  // quote_date
    3,  // expiration
    4,  // strike
    5,  // option_type
    6,  // open
    7,  // high
    8,  // low
    9,  // close
    10, // trade_volume
    11, // bid_size_1545
    12, // bid_1545
    13, // ask_size_1545
    14, // ask_1545
    15, // underlying_bid_1545
    16, // underlying_ask_1545
    23, // vwap
    24, // open_interest
    25, // delivery_code
];

const COL_DELIVERY_CODE: usize = 25;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("No zip archives found in {0}")]
    NoArchives(String),

    #[error("Error reading archive entry {name}: {source}")]
    Entry {
        name: String,
        #[source]
        source: csv::Error,
    },

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Row counts for one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub rows_written: usize,
    pub rows_skipped: usize,
}

impl ImportStats {
    fn add(&mut self, other: ImportStats) {
        self.rows_written += other.rows_written;
        self.rows_skipped += other.rows_skipped;
    }
}

/// Writes LiveVol archives out as one normalized CSV stream.
pub struct LiveVolImporter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> LiveVolImporter<W> {
    /// Start a normalized stream; the header row is written immediately.
    pub fn new(output: W) -> Result<Self, ImportError> {
        let mut writer = csv::Writer::from_writer(output);
        writer.write_record(NORMALIZED_COLUMNS)?;
        Ok(Self { writer })
    }

    /// Import every CSV entry of one zip archive.
    pub fn import_archive<R: Read + Seek>(&mut self, archive: R) -> Result<ImportStats, ImportError> {
        let mut archive = ZipArchive::new(archive)?;
        let mut stats = ImportStats::default();

        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();

            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .from_reader(entry);

            let mut entry_stats = ImportStats::default();
            for row in reader.records() {
                let row = row.map_err(|source| ImportError::Entry {
                    name: name.clone(),
                    source,
                })?;
                if row.len() <= COL_DELIVERY_CODE {
                    entry_stats.rows_skipped += 1;
                    continue;
                }
                self.writer
                    .write_record(LIVEVOL_COLUMNS.iter().map(|&col| &row[col]))?;
                entry_stats.rows_written += 1;
            }

            debug!(
                "{}: {} rows written, {} skipped",
                name, entry_stats.rows_written, entry_stats.rows_skipped
            );
            stats.add(entry_stats);
        }

        Ok(stats)
    }

    /// Import every `*.zip` archive in a folder, in file-name order.
    pub fn import_folder(&mut self, dir: &Path) -> Result<ImportStats, ImportError> {
        if !dir.is_dir() {
            return Err(ImportError::DirectoryNotFound(dir.display().to_string()));
        }

        let mut archives: Vec<PathBuf> = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()?;
        archives.retain(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "zip"));
        archives.sort();

        if archives.is_empty() {
            return Err(ImportError::NoArchives(dir.display().to_string()));
        }

        info!("Importing {} archives from {}", archives.len(), dir.display());
        let mut stats = ImportStats::default();
        for path in &archives {
            let archive_stats = self.import_archive(File::open(path)?)?;
            info!(
                "  {}: {} rows ({} skipped)",
                path.display(),
                archive_stats.rows_written,
                archive_stats.rows_skipped
            );
            stats.add(archive_stats);
        }
        Ok(stats)
    }

    /// Flush and return the underlying output.
    pub fn finish(self) -> Result<W, ImportError> {
        self.writer
            .into_inner()
            .map_err(|e| ImportError::Io(e.into_error()))
    }
}
