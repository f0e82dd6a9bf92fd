use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Band – one spectrograph arm
// ---------------------------------------------------------------------------

/// A wavelength range captured by a dedicated detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    B,
    R,
    Z,
}

impl Band {
    /// All bands, in wavelength order.
    pub const ALL: [Band; 3] = [Band::B, Band::R, Band::Z];

    pub fn as_char(self) -> char {
        match self {
            Band::B => 'b',
            Band::R => 'r',
            Band::Z => 'z',
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

// ---------------------------------------------------------------------------
// Fibermap – per-spectrum target information
// ---------------------------------------------------------------------------

/// One row of the FIBERMAP table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FibermapEntry {
    pub fiber: i32,
    pub target_id: i64,
    /// Target bitmask columns found in the file: column_name → bits.
    pub targets: BTreeMap<String, i64>,
}

// ---------------------------------------------------------------------------
// Frame – one band of one spectrograph/exposure
// ---------------------------------------------------------------------------

/// Calibrated spectral data of one band. Rows of `flux`, `ivar` and `mask`
/// are spectra; each row has `wave.len()` pixels.
#[derive(Debug, Clone)]
pub struct Frame {
    pub band: Band,
    pub wave: Vec<f64>,
    pub flux: Vec<Vec<f64>>,
    pub ivar: Vec<Vec<f64>>,
    pub mask: Vec<Vec<i32>>,
    pub fibermap: Vec<FibermapEntry>,
}

impl Frame {
    /// Number of spectra (rows) in the frame.
    pub fn num_spectra(&self) -> usize {
        self.flux.len()
    }
}

// ---------------------------------------------------------------------------
// Spectra – merged b/r/z view of one spectrograph/exposure
// ---------------------------------------------------------------------------

/// Pixel data of one band inside a [`Spectra`] collection.
#[derive(Debug, Clone)]
pub struct BandData {
    pub band: Band,
    pub wave: Vec<f64>,
    pub flux: Vec<Vec<f64>>,
    pub ivar: Vec<Vec<f64>>,
    pub mask: Vec<Vec<i32>>,
}

impl BandData {
    fn select(&self, indices: &[usize]) -> Self {
        BandData {
            band: self.band,
            wave: self.wave.clone(),
            flux: indices.iter().map(|&i| self.flux[i].clone()).collect(),
            ivar: indices.iter().map(|&i| self.ivar[i].clone()).collect(),
            mask: indices.iter().map(|&i| self.mask[i].clone()).collect(),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum MergeError {
    #[error("no frames to merge")]
    NoFrames,
    #[error("band {0} appears more than once")]
    DuplicateBand(Band),
    #[error("band {band} has {found} spectra, expected {expected}")]
    SpectraCount {
        band: Band,
        expected: usize,
        found: usize,
    },
    #[error("band {band} has {found} pixels per spectrum, expected {expected}")]
    PixelCount {
        band: Band,
        expected: usize,
        found: usize,
    },
    #[error("band {0} fiber list differs from band {1}")]
    FiberMismatch(Band, Band),
}

/// Spectra of one spectrograph/exposure, one [`BandData`] per band and a
/// single fibermap shared by all bands.
#[derive(Debug, Clone)]
pub struct Spectra {
    pub bands: Vec<BandData>,
    pub fibermap: Vec<FibermapEntry>,
}

impl Spectra {
    /// Merge per-band frames into one collection.
    ///
    /// All frames must describe the same fibers in the same order; bands
    /// are stored in wavelength order regardless of input order.
    pub fn from_frames(mut frames: Vec<Frame>) -> Result<Self, MergeError> {
        if frames.is_empty() {
            return Err(MergeError::NoFrames);
        }
        frames.sort_by_key(|f| f.band);
        for pair in frames.windows(2) {
            if pair[0].band == pair[1].band {
                return Err(MergeError::DuplicateBand(pair[1].band));
            }
        }

        let reference_band = frames[0].band;
        let nspec = frames[0].num_spectra();
        let reference_fibers: Vec<i32> = frames[0].fibermap.iter().map(|e| e.fiber).collect();

        for frame in &frames {
            if frame.num_spectra() != nspec || frame.fibermap.len() != nspec {
                return Err(MergeError::SpectraCount {
                    band: frame.band,
                    expected: nspec,
                    found: frame.num_spectra().max(frame.fibermap.len()),
                });
            }
            if frame.ivar.len() != nspec || frame.mask.len() != nspec {
                return Err(MergeError::SpectraCount {
                    band: frame.band,
                    expected: nspec,
                    found: frame.ivar.len().min(frame.mask.len()),
                });
            }
            let npix = frame.wave.len();
            let mut row_lengths = frame
                .flux
                .iter()
                .chain(&frame.ivar)
                .map(Vec::len)
                .chain(frame.mask.iter().map(Vec::len));
            if let Some(found) = row_lengths.find(|&len| len != npix) {
                return Err(MergeError::PixelCount {
                    band: frame.band,
                    expected: npix,
                    found,
                });
            }
            let fibers_match = frame
                .fibermap
                .iter()
                .zip(&reference_fibers)
                .all(|(e, &fiber)| e.fiber == fiber);
            if !fibers_match {
                return Err(MergeError::FiberMismatch(frame.band, reference_band));
            }
        }

        let fibermap = frames[0].fibermap.clone();
        let bands = frames
            .into_iter()
            .map(|f| BandData {
                band: f.band,
                wave: f.wave,
                flux: f.flux,
                ivar: f.ivar,
                mask: f.mask,
            })
            .collect();

        Ok(Spectra { bands, fibermap })
    }

    /// Number of spectra.
    pub fn num_spectra(&self) -> usize {
        self.fibermap.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.fibermap.is_empty()
    }

    /// Sub-collection holding the given spectra, in the given order.
    /// Every index must be below [`Spectra::num_spectra`].
    pub fn select(&self, indices: &[usize]) -> Spectra {
        Spectra {
            bands: self.bands.iter().map(|b| b.select(indices)).collect(),
            fibermap: indices.iter().map(|&i| self.fibermap[i].clone()).collect(),
        }
    }

    /// Indices that sort the spectra by ascending fiber id (stable).
    pub fn fiber_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.num_spectra()).collect();
        order.sort_by_key(|&i| self.fibermap[i].fiber);
        order
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Frame with constant flux per spectrum, fibers as given.
    pub(crate) fn frame(band: Band, fibers: &[i32], npix: usize) -> Frame {
        let wave_start = match band {
            Band::B => 3600.0,
            Band::R => 5700.0,
            Band::Z => 7500.0,
        };
        Frame {
            band,
            wave: (0..npix).map(|i| wave_start + i as f64).collect(),
            flux: fibers.iter().map(|&f| vec![f as f64; npix]).collect(),
            ivar: fibers.iter().map(|_| vec![1.0; npix]).collect(),
            mask: fibers.iter().map(|_| vec![0; npix]).collect(),
            fibermap: fibers
                .iter()
                .map(|&fiber| FibermapEntry {
                    fiber,
                    target_id: 1000 + fiber as i64,
                    targets: BTreeMap::from([("CMX_TARGET".to_string(), fiber as i64 % 4)]),
                })
                .collect(),
        }
    }

    pub(crate) fn frames(fibers: &[i32]) -> Vec<Frame> {
        Band::ALL.iter().map(|&b| frame(b, fibers, 4)).collect()
    }

    #[test]
    fn merges_bands_in_wavelength_order() {
        let fibers = [3, 1, 2];
        let input = vec![
            frame(Band::Z, &fibers, 4),
            frame(Band::B, &fibers, 4),
            frame(Band::R, &fibers, 5),
        ];
        let spectra = Spectra::from_frames(input).unwrap();
        let bands: Vec<Band> = spectra.bands.iter().map(|b| b.band).collect();
        assert_eq!(bands, Band::ALL.to_vec());
        assert_eq!(spectra.num_spectra(), 3);
        assert_eq!(spectra.bands[1].wave.len(), 5);
    }

    #[test]
    fn rejects_inconsistent_frames() {
        let err = Spectra::from_frames(vec![]).unwrap_err();
        assert_eq!(err, MergeError::NoFrames);

        let err = Spectra::from_frames(vec![
            frame(Band::B, &[1, 2], 4),
            frame(Band::B, &[1, 2], 4),
        ])
        .unwrap_err();
        assert_eq!(err, MergeError::DuplicateBand(Band::B));

        let err = Spectra::from_frames(vec![
            frame(Band::B, &[1, 2], 4),
            frame(Band::R, &[1, 2, 3], 4),
        ])
        .unwrap_err();
        assert!(matches!(err, MergeError::SpectraCount { band: Band::R, .. }));

        let err = Spectra::from_frames(vec![
            frame(Band::B, &[1, 2], 4),
            frame(Band::Z, &[2, 1], 4),
        ])
        .unwrap_err();
        assert_eq!(err, MergeError::FiberMismatch(Band::Z, Band::B));
    }

    #[test]
    fn rejects_short_pixel_rows() {
        let mut short = frame(Band::R, &[1, 2], 4);
        short.mask[1].pop();
        let err = Spectra::from_frames(vec![frame(Band::B, &[1, 2], 4), short]).unwrap_err();
        assert_eq!(
            err,
            MergeError::PixelCount {
                band: Band::R,
                expected: 4,
                found: 3
            }
        );
    }

    #[test]
    fn select_keeps_requested_order() {
        let spectra = Spectra::from_frames(frames(&[10, 11, 12, 13])).unwrap();
        let sub = spectra.select(&[3, 0]);
        assert_eq!(sub.num_spectra(), 2);
        assert_eq!(sub.fibermap[0].fiber, 13);
        assert_eq!(sub.fibermap[1].fiber, 10);
        for band in &sub.bands {
            assert_eq!(band.flux[0][0], 13.0);
            assert_eq!(band.flux.len(), 2);
            assert_eq!(band.mask.len(), 2);
        }
    }

    #[test]
    fn fiber_order_sorts_ascending() {
        let spectra = Spectra::from_frames(frames(&[7, 2, 9, 0])).unwrap();
        assert_eq!(spectra.fiber_order(), vec![3, 1, 0, 2]);
    }
}
