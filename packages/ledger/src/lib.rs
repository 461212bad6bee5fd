#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Append-only CSV scan ledger.
//!
//! The ledger is both the scan output and the resume state: every row is
//! one scanned point, and on startup the whole file is read back to rebuild
//! the set of [`PointKey`]s that must not be scanned again.
//!
//! Layout: `Lat, Lon, Date, <count columns...>, Image_File`. Files written
//! by older tools with a different header are accepted. Reading locates
//! latitude and longitude by header name and falls back to the first two
//! columns. Appending writes each row in the existing header's column order
//! and requires both coordinate columns to be named.

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{Read as _, Seek as _, SeekFrom, Write as _};
use std::path::Path;

use thiserror::Error;
use vendor_map_geography_models::PointKey;
use vendor_map_scan_models::ScanRecord;

/// Latitude column header.
pub const LAT_COLUMN: &str = "Lat";
/// Longitude column header.
pub const LON_COLUMN: &str = "Lon";
/// Capture date column header.
pub const DATE_COLUMN: &str = "Date";
/// Image path column header.
pub const IMAGE_COLUMN: &str = "Image_File";

/// Errors from ledger operations. All of them are fatal to a scan.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An existing header has no recognizable coordinate columns, so rows
    /// appended to it could not be read back.
    #[error("Ledger header {header:?} has no named latitude and longitude columns")]
    HeaderMismatch {
        /// The existing header.
        header: Vec<String>,
    },

    /// A record does not match the ledger's count columns.
    #[error("Record has {actual} counts but the ledger has {expected} count columns")]
    ColumnMismatch {
        /// Count columns in the ledger.
        expected: usize,
        /// Counts in the record.
        actual: usize,
    },
}

/// Builds the header row for the given count columns.
#[must_use]
pub fn header(count_columns: &[String]) -> Vec<String> {
    let mut header = Vec::with_capacity(count_columns.len() + 4);
    header.push(LAT_COLUMN.to_string());
    header.push(LON_COLUMN.to_string());
    header.push(DATE_COLUMN.to_string());
    header.extend(count_columns.iter().cloned());
    header.push(IMAGE_COLUMN.to_string());
    header
}

const LAT_NAMES: &[&str] = &["lat", "latitude"];
const LON_NAMES: &[&str] = &["lon", "lng", "longitude"];
const DATE_NAMES: &[&str] = &["date", "capture_date"];
const IMAGE_NAMES: &[&str] = &["image_file", "image", "filename"];

/// What goes in one column of an appended row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Lat,
    Lon,
    Date,
    Count(usize),
    Image,
    Blank,
}

/// Maps an existing header onto record fields by column name.
fn layout_for(header: &[String], count_columns: &[String]) -> Result<Vec<Slot>, LedgerError> {
    let slots: Vec<Slot> = header
        .iter()
        .map(|name| {
            let is = |names: &[&str]| names.iter().any(|n| name.eq_ignore_ascii_case(n));
            if is(LAT_NAMES) {
                Slot::Lat
            } else if is(LON_NAMES) {
                Slot::Lon
            } else if is(DATE_NAMES) {
                Slot::Date
            } else if is(IMAGE_NAMES) {
                Slot::Image
            } else {
                count_columns
                    .iter()
                    .position(|c| name.eq_ignore_ascii_case(c))
                    .map_or(Slot::Blank, Slot::Count)
            }
        })
        .collect();

    if !slots.contains(&Slot::Lat) || !slots.contains(&Slot::Lon) {
        return Err(LedgerError::HeaderMismatch {
            header: header.to_vec(),
        });
    }
    Ok(slots)
}

/// An open ledger: the resume set plus an append handle.
pub struct Ledger {
    writer: csv::Writer<File>,
    keys: BTreeSet<PointKey>,
    count_columns: usize,
    layout: Vec<Slot>,
}

impl Ledger {
    /// Opens (or creates) the ledger at `path`.
    ///
    /// Reads every existing row into the resume set, writes the header only
    /// if the file is empty, and positions the writer at the end of the
    /// file. Rows appended to a file with a different header follow that
    /// header's column order; its columns with no counterpart stay empty.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the file or its parent directory cannot
    /// be created, read, or opened for appending, or
    /// [`LedgerError::HeaderMismatch`] if an existing header does not name
    /// both coordinate columns.
    pub fn open(path: &Path, count_columns: &[String]) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let existing = if path.exists() {
            read_rows(path)?
        } else {
            LedgerContents::default()
        };

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let is_empty = file.metadata()?.len() == 0;

        let ours = header(count_columns);
        let layout = match &existing.header {
            Some(theirs) if !is_empty && *theirs != ours => {
                let layout = layout_for(theirs, count_columns)?;
                log::warn!(
                    "Ledger {} has header {:?}, appending rows in that column order",
                    path.display(),
                    theirs
                );
                layout
            }
            _ => layout_for(&ours, count_columns)?,
        };

        if !is_empty && !ends_with_newline(path)? {
            log::warn!(
                "Ledger {} ends with a partial line, terminating it",
                path.display()
            );
            file.write_all(b"\n")?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if is_empty {
            writer.write_record(&ours)?;
            writer.flush()?;
            writer.get_ref().sync_data()?;
        }

        let keys: BTreeSet<PointKey> = existing.rows.iter().map(LedgerRow::key).collect();
        log::info!(
            "Ledger {}: {} point(s) already scanned",
            path.display(),
            keys.len()
        );

        Ok(Self {
            writer,
            keys,
            count_columns: count_columns.len(),
            layout,
        })
    }

    /// Whether a point is already in the ledger.
    #[must_use]
    pub fn contains(&self, key: &PointKey) -> bool {
        self.keys.contains(key)
    }

    /// Number of distinct points in the ledger.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.keys.len() as u64
    }

    /// Whether the ledger has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Appends one record and makes it durable before returning.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the record does not fit the ledger's
    /// columns or cannot be written, flushed, and synced.
    pub fn append(&mut self, record: &ScanRecord) -> Result<(), LedgerError> {
        let counts = record.counts.as_slice();
        if counts.len() != self.count_columns {
            return Err(LedgerError::ColumnMismatch {
                expected: self.count_columns,
                actual: counts.len(),
            });
        }

        let row: Vec<String> = self
            .layout
            .iter()
            .map(|slot| match slot {
                Slot::Lat => record.point.lat.to_string(),
                Slot::Lon => record.point.lon.to_string(),
                Slot::Date => record.capture_date.clone(),
                Slot::Count(i) => counts[*i].to_string(),
                Slot::Image => record.image_file.display().to_string(),
                Slot::Blank => String::new(),
            })
            .collect();

        self.writer.write_record(&row)?;
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;

        self.keys.insert(record.point.key());
        Ok(())
    }
}

/// One row read back from a ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
    /// Capture date, empty if the ledger has no date column.
    pub date: String,
    /// `(column, count)` for every numeric column other than lat/lon.
    pub counts: Vec<(String, u64)>,
    /// Image path, empty if the ledger has no image column.
    pub image_file: String,
}

impl LedgerRow {
    /// Resume identity of this row.
    #[must_use]
    pub fn key(&self) -> PointKey {
        PointKey::from_coords(self.lat, self.lon)
    }

    /// Sum of all count columns.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|(_, c)| c).sum()
    }
}

/// Parsed ledger contents.
#[derive(Debug, Clone, Default)]
pub struct LedgerContents {
    /// Header row, if the file had one.
    pub header: Option<Vec<String>>,
    /// Rows whose coordinates parsed.
    pub rows: Vec<LedgerRow>,
}

/// Reads a ledger file.
///
/// Rows that are malformed or whose coordinates do not parse are logged
/// and skipped.
///
/// # Errors
///
/// Returns [`LedgerError`] if the file cannot be opened or the header row
/// cannot be read.
pub fn read_rows(path: &Path) -> Result<LedgerContents, LedgerError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let header: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if header.is_empty() {
        return Ok(LedgerContents::default());
    }

    let lat_idx = find_column(&header, LAT_NAMES).unwrap_or(0);
    let lon_idx = find_column(&header, LON_NAMES).unwrap_or(1);
    let date_idx = find_column(&header, DATE_NAMES);
    let image_idx = find_column(&header, IMAGE_NAMES);

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Skipping malformed ledger row {}: {e}", line + 2);
                continue;
            }
        };

        let coords = (
            record.get(lat_idx).and_then(|v| v.trim().parse::<f64>().ok()),
            record.get(lon_idx).and_then(|v| v.trim().parse::<f64>().ok()),
        );
        let (Some(lat), Some(lon)) = coords else {
            log::warn!("Skipping ledger row {} without coordinates", line + 2);
            continue;
        };

        let field = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        let reserved = [Some(lat_idx), Some(lon_idx), date_idx, image_idx];
        let counts = header
            .iter()
            .enumerate()
            .filter(|(i, _)| !reserved.contains(&Some(*i)))
            .filter_map(|(i, name)| {
                record
                    .get(i)
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(|c| (name.clone(), c))
            })
            .collect();

        rows.push(LedgerRow {
            lat,
            lon,
            date: field(date_idx),
            counts,
            image_file: field(image_idx),
        });
    }

    Ok(LedgerContents {
        header: Some(header),
        rows,
    })
}

/// Aggregate view of a ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSummary {
    /// Rows with parseable coordinates.
    pub rows: u64,
    /// Distinct point keys.
    pub distinct_points: u64,
    /// Rows with at least one positive count.
    pub hits: u64,
    /// Total per count column, in header order.
    pub column_totals: Vec<(String, u64)>,
    /// Most recent capture date (lexicographic on `YYYY-MM`).
    pub latest_capture: Option<String>,
}

/// Summarizes a ledger without opening it for writing.
///
/// A missing file summarizes as empty.
///
/// # Errors
///
/// Returns [`LedgerError`] if the file exists but cannot be read.
pub fn summarize(path: &Path) -> Result<LedgerSummary, LedgerError> {
    if !path.exists() {
        return Ok(LedgerSummary::default());
    }

    let contents = read_rows(path)?;
    let mut summary = LedgerSummary::default();
    let mut keys = BTreeSet::new();

    for row in &contents.rows {
        summary.rows += 1;
        keys.insert(row.key());
        if row.total() > 0 {
            summary.hits += 1;
        }
        for (column, count) in &row.counts {
            match summary.column_totals.iter_mut().find(|(c, _)| c == column) {
                Some((_, total)) => *total += count,
                None => summary.column_totals.push((column.clone(), *count)),
            }
        }
        if !row.date.is_empty()
            && summary
                .latest_capture
                .as_ref()
                .is_none_or(|latest| row.date > *latest)
        {
            summary.latest_capture = Some(row.date.clone());
        }
    }

    summary.distinct_points = keys.len() as u64;
    Ok(summary)
}

fn find_column(header: &[String], names: &[&str]) -> Option<usize> {
    header
        .iter()
        .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
}

fn ends_with_newline(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use vendor_map_geography_models::GeoPoint;
    use vendor_map_scan_models::CategoryCounts;

    fn columns() -> Vec<String> {
        vec!["Vendor_Count".to_string(), "Stall_Count".to_string()]
    }

    fn record(lat: f64, lon: f64, counts: Vec<u32>) -> ScanRecord {
        ScanRecord {
            point: GeoPoint::new(lat, lon),
            capture_date: "2024-05".to_string(),
            counts: CategoryCounts(counts),
            image_file: PathBuf::from(format!("images/scan_{lat:.5}_{lon:.5}_2024-05.jpg")),
        }
    }

    fn fresh_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("vendor_map_ledger_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        dir.join("nested").join("ledger.csv")
    }

    #[test]
    fn new_ledger_writes_header_once() {
        let path = fresh_path("header");
        {
            let ledger = Ledger::open(&path, &columns()).unwrap();
            assert!(ledger.is_empty());
        }
        Ledger::open(&path, &columns()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Lat,Lon,Date,Vendor_Count,Stall_Count,Image_File\n");
    }

    #[test]
    fn appended_records_survive_reopen() {
        let path = fresh_path("reopen");
        {
            let mut ledger = Ledger::open(&path, &columns()).unwrap();
            ledger.append(&record(-23.5505, -46.6333, vec![1, 0])).unwrap();
            ledger.append(&record(-23.5545, -46.6333, vec![0, 0])).unwrap();
            assert_eq!(ledger.len(), 2);
        }

        let ledger = Ledger::open(&path, &columns()).unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains(&PointKey::from_coords(-23.5505, -46.6333)));
        assert!(!ledger.contains(&PointKey::from_coords(-23.5585, -46.6333)));
    }

    #[test]
    fn keys_match_at_four_decimals() {
        let path = fresh_path("precision");
        let mut ledger = Ledger::open(&path, &columns()).unwrap();
        ledger
            .append(&record(-23.550_000_000_1, -46.633_000_000_2, vec![0, 0]))
            .unwrap();
        assert!(ledger.contains(&PointKey::from_coords(-23.55, -46.633)));
    }

    #[test]
    fn rejects_wrong_count_width() {
        let path = fresh_path("width");
        let mut ledger = Ledger::open(&path, &columns()).unwrap();
        let err = ledger.append(&record(-23.5, -46.6, vec![1])).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::ColumnMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert!(ledger.is_empty());
    }

    #[test]
    fn reads_foreign_layout_and_skips_bad_rows() {
        let path = fresh_path("foreign");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "Latitude,Longitude,Date,Structure_Count,Image_File\n\
             -23.5,-46.6,2023-01,3,a.jpg\n\
             not-a-number,-46.6,2023-01,0,b.jpg\n\
             -23.504,-46.6,2022-11,0,c.jpg",
        )
        .unwrap();

        let mut ledger = Ledger::open(&path, &["Structure_Count".to_string()]).unwrap();
        assert_eq!(ledger.len(), 2);

        // Partial last line was terminated before appending.
        ledger.append(&record(-23.508, -46.6, vec![1])).unwrap();
        drop(ledger);

        let contents = read_rows(&path).unwrap();
        assert_eq!(contents.rows.len(), 3);
        assert_eq!(contents.rows[0].counts, vec![("Structure_Count".to_string(), 3)]);
        assert_eq!(contents.rows[2].date, "2024-05");
    }

    #[test]
    fn appends_in_the_order_of_a_reordered_header() {
        let path = fresh_path("reordered");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "Date,Lat,Lon,Structure_Count,Notes,Image_File\n\
             2023-01,-23.5,-46.6,3,checked,a.jpg\n",
        )
        .unwrap();

        let columns = vec!["Structure_Count".to_string()];
        {
            let mut ledger = Ledger::open(&path, &columns).unwrap();
            ledger.append(&record(-23.6, -46.7, vec![1])).unwrap();
        }

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with(
            "2024-05,-23.6,-46.7,1,,images/scan_-23.60000_-46.70000_2024-05.jpg\n"
        ));

        let reopened = Ledger::open(&path, &columns).unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.contains(&PointKey::from_coords(-23.6, -46.7)));

        let rows = read_rows(&path).unwrap().rows;
        assert!((rows[1].lat - -23.6).abs() < f64::EPSILON);
        assert_eq!(rows[1].counts, vec![("Structure_Count".to_string(), 1)]);
    }

    #[test]
    fn refuses_to_append_without_named_coordinates() {
        let path = fresh_path("unnamed");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "y,x,Date,Structure_Count,Image_File\n").unwrap();

        let err = Ledger::open(&path, &["Structure_Count".to_string()])
            .err()
            .unwrap();
        assert!(matches!(err, LedgerError::HeaderMismatch { .. }));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "y,x,Date,Structure_Count,Image_File\n"
        );
    }

    #[test]
    fn summarizes_hits_and_totals() {
        let path = fresh_path("summary");
        {
            let mut ledger = Ledger::open(&path, &columns()).unwrap();
            ledger.append(&record(-23.50, -46.60, vec![2, 1])).unwrap();
            ledger.append(&record(-23.51, -46.60, vec![0, 0])).unwrap();
            ledger.append(&record(-23.52, -46.60, vec![0, 3])).unwrap();
        }

        let summary = summarize(&path).unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.distinct_points, 3);
        assert_eq!(summary.hits, 2);
        assert_eq!(
            summary.column_totals,
            vec![
                ("Vendor_Count".to_string(), 2),
                ("Stall_Count".to_string(), 4)
            ]
        );
        assert_eq!(summary.latest_capture.as_deref(), Some("2024-05"));
    }

    #[test]
    fn missing_ledger_summarizes_empty() {
        let path = fresh_path("missing");
        assert_eq!(summarize(&path).unwrap(), LedgerSummary::default());
    }
}
