use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;

use super::fits::read_frame;
use super::model::{Band, Frame};

// ---------------------------------------------------------------------------
// Frame file naming
// ---------------------------------------------------------------------------

/// Category of calibrated frame files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FileType {
    /// Sky-subtracted frames
    Sframe,
    /// Flux-calibrated frames
    Cframe,
}

impl FileType {
    pub fn prefix(self) -> &'static str {
        match self {
            FileType::Sframe => "sframe",
            FileType::Cframe => "cframe",
        }
    }
}

/// File name of one band frame: `<filetype>-<band><spectrograph>-<exposure>.fits`.
pub fn frame_file_name(filetype: FileType, band: Band, spectrograph: u8, exposure: &str) -> String {
    format!("{}-{band}{spectrograph}-{exposure}.fits", filetype.prefix())
}

// ---------------------------------------------------------------------------
// Frame reader seam
// ---------------------------------------------------------------------------

/// Source of band frames, keyed by file path.
pub trait FrameReader {
    fn read_frame(&self, path: &Path, band: Band) -> Result<Frame>;
}

/// Reads frames from FITS files on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FitsFrameReader;

impl FrameReader for FitsFrameReader {
    fn read_frame(&self, path: &Path, band: Band) -> Result<Frame> {
        Ok(read_frame(path, band)?)
    }
}

/// Read the b, r and z frames of one spectrograph from `exposure_dir`.
pub fn read_band_frames<R: FrameReader + ?Sized>(
    reader: &R,
    exposure_dir: &Path,
    filetype: FileType,
    spectrograph: u8,
    exposure: &str,
) -> Result<Vec<Frame>> {
    Band::ALL
        .iter()
        .map(|&band| {
            let path: PathBuf =
                exposure_dir.join(frame_file_name(filetype, band, spectrograph, exposure));
            reader
                .read_frame(&path, band)
                .with_context(|| format!("reading frame {}", path.display()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Exposure list file
// ---------------------------------------------------------------------------

/// Exposure list layout: one exposure per line, blank lines ignored. `#`
/// starts a comment running to the end of the line, wherever it appears.
/// Only the first whitespace-separated token of a line is used, so extra
/// columns are allowed.
pub fn load_exposure_list(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .delimiter(b' ')
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening exposure list {}", path.display()))?;

    let mut exposures = Vec::new();
    for (line_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("exposure list line {}", line_no + 1))?;
        let token = record
            .iter()
            .flat_map(str::split_whitespace)
            .next()
            .and_then(|t| t.split('#').next())
            .filter(|t| !t.is_empty());
        if let Some(token) = token {
            exposures.push(token.to_string());
        }
    }
    Ok(exposures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Write;
    use tempfile::NamedTempFile;

    use crate::data::model::tests::frame;

    #[test]
    fn frame_file_names_follow_convention() {
        assert_eq!(
            frame_file_name(FileType::Cframe, Band::Z, 7, "00012345"),
            "cframe-z7-00012345.fits"
        );
        assert_eq!(
            frame_file_name(FileType::Sframe, Band::B, 0, "00000042"),
            "sframe-b0-00000042.fits"
        );
    }

    struct RecordingReader {
        paths: RefCell<Vec<PathBuf>>,
    }

    impl FrameReader for RecordingReader {
        fn read_frame(&self, path: &Path, band: Band) -> Result<Frame> {
            self.paths.borrow_mut().push(path.to_path_buf());
            Ok(frame(band, &[1, 2], 3))
        }
    }

    #[test]
    fn reads_three_bands_in_order() {
        let reader = RecordingReader {
            paths: RefCell::new(Vec::new()),
        };
        let dir = Path::new("/data/exposures/20200315/00055654");
        let frames = read_band_frames(&reader, dir, FileType::Cframe, 4, "00055654").unwrap();

        let bands: Vec<Band> = frames.iter().map(|f| f.band).collect();
        assert_eq!(bands, Band::ALL.to_vec());
        assert_eq!(
            reader.paths.borrow().as_slice(),
            &[
                dir.join("cframe-b4-00055654.fits"),
                dir.join("cframe-r4-00055654.fits"),
                dir.join("cframe-z4-00055654.fits"),
            ]
        );
    }

    #[test]
    fn exposure_list_skips_comments_and_blanks() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# exposures for tonight").unwrap();
        writeln!(file, "55654").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  00055655   extra").unwrap();
        writeln!(file, "55656\tnote").unwrap();

        let exposures = load_exposure_list(file.path()).unwrap();
        assert_eq!(exposures, vec!["55654", "00055655", "55656"]);
    }

    #[test]
    fn exposure_list_cuts_inline_and_indented_comments() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "55654 # first of the night").unwrap();
        writeln!(file, "   # indented note").unwrap();
        writeln!(file, "55655#tail").unwrap();
        writeln!(file, "#55656").unwrap();

        let exposures = load_exposure_list(file.path()).unwrap();
        assert_eq!(exposures, vec!["55654", "55655"]);
    }
}
