//! Exposure discovery over `specprod_dir/exposures/<night>/<exposure>/`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

use crate::data::loader::{frame_file_name, FileType};
use crate::data::model::Band;

/// Highest spectrograph number probed.
pub const MAX_SPECTROGRAPH: u8 = 9;

/// Width exposure ids are zero-padded to.
pub const EXPOSURE_ID_WIDTH: usize = 8;

/// An exposure with at least one spectrograph whose b, r and z frames exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposureRecord {
    pub exposure: String,
    pub night: String,
    /// Ascending spectrograph numbers.
    pub spectrographs: Vec<u8>,
}

impl ExposureRecord {
    pub fn dir(&self, specprod_dir: &Path) -> PathBuf {
        specprod_dir
            .join("exposures")
            .join(&self.night)
            .join(&self.exposure)
    }
}

/// Left-pad an exposure id with zeros.
pub fn pad_exposure(exposure: &str) -> String {
    format!("{exposure:0>width$}", width = EXPOSURE_ID_WIDTH)
}

/// Sorted names of the sub-directories of `dir`.
fn sub_dirs(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Scan the exposure tree and list every exposure with complete spectrographs.
///
/// With `subset`, only those exposures (zero-padded) are considered.
pub fn exposure_db(
    specprod_dir: &Path,
    filetype: FileType,
    subset: Option<&[String]>,
) -> Result<Vec<ExposureRecord>> {
    let wanted: Option<BTreeSet<String>> =
        subset.map(|ids| ids.iter().map(|id| pad_exposure(id)).collect());

    let exposures_dir = specprod_dir.join("exposures");
    let mut records = Vec::new();

    for night in sub_dirs(&exposures_dir)? {
        let night_dir = exposures_dir.join(&night);
        for exposure in sub_dirs(&night_dir)? {
            if let Some(wanted) = &wanted {
                if !wanted.contains(&exposure) {
                    continue;
                }
            }
            let expo_dir = night_dir.join(&exposure);
            let files: BTreeSet<String> = fs::read_dir(&expo_dir)
                .with_context(|| format!("listing {}", expo_dir.display()))?
                .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
                .collect::<std::io::Result<_>>()
                .with_context(|| format!("listing {}", expo_dir.display()))?;

            let spectrographs: Vec<u8> = (0..=MAX_SPECTROGRAPH)
                .filter(|&n| {
                    Band::ALL
                        .iter()
                        .all(|&band| files.contains(&frame_file_name(filetype, band, n, &exposure)))
                })
                .collect();

            debug!("{night}/{exposure}: complete spectrographs {spectrographs:?}");
            if !spectrographs.is_empty() {
                records.push(ExposureRecord {
                    exposure,
                    night: night.clone(),
                    spectrographs,
                });
            }
        }
    }

    Ok(records)
}

/// Requested exposures absent from `found`, as written in the request.
/// Each missing entry is listed once.
pub fn missing_exposures(requested: &[String], found: &[ExposureRecord]) -> Vec<String> {
    let found: BTreeSet<&str> = found.iter().map(|r| r.exposure.as_str()).collect();
    let mut seen = BTreeSet::new();
    requested
        .iter()
        .filter(|id| !found.contains(pad_exposure(id).as_str()))
        .filter(|id| seen.insert(pad_exposure(id)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), b"").unwrap();
    }

    fn add_spectrograph(root: &Path, night: &str, expo: &str, n: u8, bands: &[Band]) {
        let dir = root.join("exposures").join(night).join(expo);
        for &band in bands {
            touch(&dir, &frame_file_name(FileType::Cframe, band, n, expo));
        }
    }

    fn tree() -> TempDir {
        let root = TempDir::new().unwrap();
        let p = root.path();
        add_spectrograph(p, "20200315", "00055654", 0, &Band::ALL);
        add_spectrograph(p, "20200315", "00055654", 3, &Band::ALL);
        // z missing for spectrograph 5
        add_spectrograph(p, "20200315", "00055654", 5, &[Band::B, Band::R]);
        add_spectrograph(p, "20200316", "00055700", 9, &Band::ALL);
        // only incomplete spectrographs
        add_spectrograph(p, "20200316", "00055701", 1, &[Band::R]);
        // sframe files do not count for cframe
        touch(
            &p.join("exposures/20200316/00055702"),
            &frame_file_name(FileType::Sframe, Band::B, 2, "00055702"),
        );
        // stray file at night level
        touch(&p.join("exposures/20200316"), "README");
        root
    }

    #[test]
    fn lists_only_complete_spectrographs() {
        let root = tree();
        let records = exposure_db(root.path(), FileType::Cframe, None).unwrap();
        assert_eq!(
            records,
            vec![
                ExposureRecord {
                    exposure: "00055654".into(),
                    night: "20200315".into(),
                    spectrographs: vec![0, 3],
                },
                ExposureRecord {
                    exposure: "00055700".into(),
                    night: "20200316".into(),
                    spectrographs: vec![9],
                },
            ]
        );
    }

    #[test]
    fn filetype_selects_file_prefix() {
        let root = tree();
        let dir = root.path().join("exposures/20200316/00055702");
        for band in [Band::R, Band::Z] {
            touch(&dir, &frame_file_name(FileType::Sframe, band, 2, "00055702"));
        }
        let records = exposure_db(root.path(), FileType::Sframe, None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].exposure, "00055702");
        assert_eq!(records[0].spectrographs, vec![2]);
    }

    #[test]
    fn subset_is_zero_padded() {
        let root = tree();
        let subset = vec!["55700".to_string()];
        let records = exposure_db(root.path(), FileType::Cframe, Some(subset.as_slice())).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].exposure, "00055700");
        assert!(missing_exposures(&subset, &records).is_empty());
    }

    #[test]
    fn missing_exposures_reported_once() {
        let root = tree();
        let subset: Vec<String> = ["55654", "123", "00000123", "55701"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let records = exposure_db(root.path(), FileType::Cframe, Some(subset.as_slice())).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(missing_exposures(&subset, &records), vec!["123", "55701"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let root = TempDir::new().unwrap();
        assert!(exposure_db(root.path(), FileType::Cframe, None).is_err());
    }

    #[test]
    fn pads_to_eight_digits() {
        assert_eq!(pad_exposure("42"), "00000042");
        assert_eq!(pad_exposure("00055654"), "00055654");
        assert_eq!(pad_exposure("123456789"), "123456789");
    }
}
