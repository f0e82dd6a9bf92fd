//! FITS access for calibrated frame files.
//!
//! A frame file holds four image HDUs (`FLUX`, `IVAR`, `MASK` with shape
//! `[nspec, nwave]`, and the 1-D `WAVELENGTH` grid) plus the `FIBERMAP`
//! binary table with one row per spectrum.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::images::{ImageDescription, ImageType};
use fitsio::tables::{ColumnDataType, ColumnDescription};
use fitsio::FitsFile;
use log::debug;
use thiserror::Error;

use super::filter::TargetMaskType;
use super::model::{Band, FibermapEntry, Frame};

/// Errors that can occur while reading or writing a frame file
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("{path}: FITS I/O error: {source}")]
    FitsIo {
        path: PathBuf,
        #[source]
        source: fitsio::errors::Error,
    },
    #[error("{path}: HDU {hdu} is not a {expected}")]
    WrongHduKind {
        path: PathBuf,
        hdu: &'static str,
        expected: &'static str,
    },
    #[error("{path}: HDU {hdu} has {len} values, not a multiple of {nwave} wavelengths")]
    BadShape {
        path: PathBuf,
        hdu: &'static str,
        len: usize,
        nwave: usize,
    },
    #[error("{path}: FIBERMAP has {rows} rows but FLUX has {nspec} spectra")]
    FibermapLength {
        path: PathBuf,
        rows: usize,
        nspec: usize,
    },
}

const FIBERMAP: &str = "FIBERMAP";

/// Read one band frame from `path`.
pub fn read_frame(path: &Path, band: Band) -> Result<Frame, FrameError> {
    let mut fptr = FitsFile::open(path).map_err(|source| FrameError::FitsIo {
        path: path.to_path_buf(),
        source,
    })?;

    let wave: Vec<f64> = read_image_hdu(&mut fptr, path, "WAVELENGTH")?;
    let nwave = wave.len();

    let flux: Vec<f64> = read_image_hdu(&mut fptr, path, "FLUX")?;
    let ivar: Vec<f64> = read_image_hdu(&mut fptr, path, "IVAR")?;
    let mask: Vec<i32> = read_image_hdu(&mut fptr, path, "MASK")?;

    let flux = split_rows(flux, nwave, path, "FLUX")?;
    let ivar = split_rows(ivar, nwave, path, "IVAR")?;
    let mask = split_rows(mask, nwave, path, "MASK")?;

    let fibermap = read_fibermap(&mut fptr, path)?;
    if fibermap.len() != flux.len() {
        return Err(FrameError::FibermapLength {
            path: path.to_path_buf(),
            rows: fibermap.len(),
            nspec: flux.len(),
        });
    }

    debug!(
        "Read {} spectra x {} pixels from {}",
        flux.len(),
        nwave,
        path.display()
    );

    Ok(Frame {
        band,
        wave,
        flux,
        ivar,
        mask,
        fibermap,
    })
}

fn read_image_hdu<T>(fptr: &mut FitsFile, path: &Path, name: &'static str) -> Result<Vec<T>, FrameError>
where
    Vec<T>: fitsio::images::ReadImage,
{
    let hdu = fptr.hdu(name).map_err(|source| FrameError::FitsIo {
        path: path.to_path_buf(),
        source,
    })?;
    if !matches!(hdu.info, HduInfo::ImageInfo { .. }) {
        return Err(FrameError::WrongHduKind {
            path: path.to_path_buf(),
            hdu: name,
            expected: "image",
        });
    }
    hdu.read_image(fptr).map_err(|source| FrameError::FitsIo {
        path: path.to_path_buf(),
        source,
    })
}

fn split_rows<T: Clone>(
    flat: Vec<T>,
    nwave: usize,
    path: &Path,
    hdu: &'static str,
) -> Result<Vec<Vec<T>>, FrameError> {
    if nwave == 0 || flat.len() % nwave != 0 {
        return Err(FrameError::BadShape {
            path: path.to_path_buf(),
            hdu,
            len: flat.len(),
            nwave,
        });
    }
    Ok(flat.chunks(nwave).map(<[T]>::to_vec).collect())
}

fn read_fibermap(fptr: &mut FitsFile, path: &Path) -> Result<Vec<FibermapEntry>, FrameError> {
    let io = |source| FrameError::FitsIo {
        path: path.to_path_buf(),
        source,
    };
    let hdu: FitsHdu = fptr.hdu(FIBERMAP).map_err(io)?;
    let columns: Vec<String> = match &hdu.info {
        HduInfo::TableInfo {
            column_descriptions,
            ..
        } => column_descriptions.iter().map(|c| c.name.clone()).collect(),
        _ => {
            return Err(FrameError::WrongHduKind {
                path: path.to_path_buf(),
                hdu: FIBERMAP,
                expected: "binary table",
            })
        }
    };

    let fibers: Vec<i32> = hdu.read_col(fptr, "FIBER").map_err(io)?;
    let target_ids: Vec<i64> = hdu.read_col(fptr, "TARGETID").map_err(io)?;

    // Target bitmask columns are optional; commissioning frames lack DESI_TARGET.
    let mut target_columns: Vec<(&'static str, Vec<i64>)> = Vec::new();
    for mask_type in TargetMaskType::ALL {
        let name = mask_type.column();
        if columns.iter().any(|c| c == name) {
            target_columns.push((name, hdu.read_col(fptr, name).map_err(io)?));
        }
    }

    Ok(fibers
        .iter()
        .zip(&target_ids)
        .enumerate()
        .map(|(row, (&fiber, &target_id))| FibermapEntry {
            fiber,
            target_id,
            targets: target_columns
                .iter()
                .filter_map(|(name, values)| values.get(row).map(|&v| (name.to_string(), v)))
                .collect::<BTreeMap<_, _>>(),
        })
        .collect())
}

/// Write `frame` to `path` in the layout [`read_frame`] expects,
/// replacing any existing file.
pub fn write_frame(frame: &Frame, path: &Path) -> Result<(), FrameError> {
    let io = |source| FrameError::FitsIo {
        path: path.to_path_buf(),
        source,
    };
    let nspec = frame.num_spectra();
    let nwave = frame.wave.len();
    let mut fptr = FitsFile::create(path).overwrite().open().map_err(io)?;

    let flux: Vec<f32> = frame.flux.iter().flatten().map(|&v| v as f32).collect();
    let ivar: Vec<f32> = frame.ivar.iter().flatten().map(|&v| v as f32).collect();
    let mask: Vec<i32> = frame.mask.iter().flatten().copied().collect();

    let spectra_shape = [nspec, nwave];
    let float_image = ImageDescription {
        data_type: ImageType::Float,
        dimensions: &spectra_shape,
    };
    let hdu = fptr.create_image("FLUX".to_string(), &float_image).map_err(io)?;
    hdu.write_image(&mut fptr, &flux).map_err(io)?;
    let hdu = fptr.create_image("IVAR".to_string(), &float_image).map_err(io)?;
    hdu.write_image(&mut fptr, &ivar).map_err(io)?;

    let mask_image = ImageDescription {
        data_type: ImageType::Long,
        dimensions: &spectra_shape,
    };
    let hdu = fptr.create_image("MASK".to_string(), &mask_image).map_err(io)?;
    hdu.write_image(&mut fptr, &mask).map_err(io)?;

    let wave_shape = [nwave];
    let wave_image = ImageDescription {
        data_type: ImageType::Double,
        dimensions: &wave_shape,
    };
    let hdu = fptr.create_image("WAVELENGTH".to_string(), &wave_image).map_err(io)?;
    hdu.write_image(&mut fptr, &frame.wave).map_err(io)?;

    let target_names: Vec<&'static str> = TargetMaskType::ALL
        .iter()
        .map(|t| t.column())
        .filter(|name| frame.fibermap.iter().all(|e| e.targets.contains_key(*name)))
        .collect();

    let mut columns = vec![
        ColumnDescription::new("FIBER")
            .with_type(ColumnDataType::Int)
            .create()
            .map_err(io)?,
        ColumnDescription::new("TARGETID")
            .with_type(ColumnDataType::Long)
            .create()
            .map_err(io)?,
    ];
    for name in &target_names {
        columns.push(
            ColumnDescription::new(*name)
                .with_type(ColumnDataType::Long)
                .create()
                .map_err(io)?,
        );
    }
    let hdu = fptr.create_table(FIBERMAP.to_string(), &columns).map_err(io)?;

    let fibers: Vec<i32> = frame.fibermap.iter().map(|e| e.fiber).collect();
    let target_ids: Vec<i64> = frame.fibermap.iter().map(|e| e.target_id).collect();
    hdu.write_col(&mut fptr, "FIBER", &fibers).map_err(io)?;
    hdu.write_col(&mut fptr, "TARGETID", &target_ids).map_err(io)?;
    for name in target_names {
        let values: Vec<i64> = frame
            .fibermap
            .iter()
            .map(|e| e.targets.get(name).copied().unwrap_or(0))
            .collect();
        hdu.write_col(&mut fptr, name, &values).map_err(io)?;
    }

    debug!("Wrote {nspec} spectra x {nwave} pixels to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::frame;
    use tempfile::TempDir;

    #[test]
    fn frame_survives_write_and_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cframe-r3-00001234.fits");
        let mut original = frame(Band::R, &[5, 3, 4], 6);
        original.mask[1][2] = 8;
        original.ivar[2][0] = 0.0;

        write_frame(&original, &path).unwrap();
        let read = read_frame(&path, Band::R).unwrap();

        assert_eq!(read.band, Band::R);
        assert_eq!(read.wave, original.wave);
        assert_eq!(read.flux, original.flux);
        assert_eq!(read.ivar, original.ivar);
        assert_eq!(read.mask, original.mask);
        assert_eq!(read.fibermap, original.fibermap);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cframe-b0-00000001.fits");
        let err = read_frame(&path, Band::B).unwrap_err();
        assert!(err.to_string().contains("cframe-b0-00000001.fits"));
    }

    #[test]
    fn split_rows_rejects_ragged_data() {
        let path = Path::new("x.fits");
        let rows = split_rows(vec![1, 2, 3, 4, 5, 6], 3, path, "FLUX").unwrap();
        assert_eq!(rows, vec![vec![1, 2, 3], vec![4, 5, 6]]);
        assert!(matches!(
            split_rows(vec![1, 2, 3, 4], 3, path, "FLUX"),
            Err(FrameError::BadShape { len: 4, nwave: 3, .. })
        ));
    }
}
