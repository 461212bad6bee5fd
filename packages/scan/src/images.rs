//! Deterministic image storage.
//!
//! Image paths depend only on the scan prefix, the coordinates and the
//! capture date, so a point re-attempted after an interrupted run finds the
//! image it already paid for. Writes go through a `.part` file and a rename,
//! so a file at the final path is always complete.

use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use vendor_map_geography_models::GeoPoint;

/// Path of the image for a point captured on `date` (`YYYY-MM`).
#[must_use]
pub fn image_path(dir: &Path, prefix: &str, point: GeoPoint, date: &str) -> PathBuf {
    dir.join(format!(
        "{prefix}_{:.5}_{:.5}_{date}.jpg",
        point.lat, point.lon
    ))
}

/// Reads a previously saved image, if one exists and is non-empty.
///
/// # Errors
///
/// Returns an I/O error if the file exists but cannot be read.
pub fn read_existing(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(None),
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Durably writes an image to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an I/O error if any step of the write fails.
pub fn save_image(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    {
        let mut file = File::create(&part)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&part, path)
}

/// Copies a hit image into the training folder as
/// `TRAIN_{lat:.5}_{lon:.5}.jpg`.
///
/// # Errors
///
/// Returns an I/O error if the folder cannot be created or the copy fails.
pub fn harvest(training_dir: &Path, point: GeoPoint, image: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(training_dir)?;
    let target = training_dir.join(format!("TRAIN_{:.5}_{:.5}.jpg", point.lat, point.lon));
    std::fs::copy(image, &target)?;
    Ok(target)
}
