/// Rendering layer: spectra pages → static HTML.
///
/// Architecture:
/// ```text
///   Spectra (one page)
///        │
///        ▼
///   ┌──────────┐
///   │   plot    │  one plotly figure per spectrum (b/r/z traces)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │   page    │  assemble figures + metadata → <title>.html
///   └──────────┘
/// ```

pub mod page;
pub mod plot;

use std::path::Path;

use anyhow::Result;

use crate::data::filter::TargetMaskType;
use crate::data::model::Spectra;

/// Knobs forwarded to the page writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Draw the 1/sqrt(ivar) noise trace under each band.
    pub with_noise: bool,
    /// Draw a camera-coadded trace. Frames are never coadded, so this stays off.
    pub with_coaddcam: bool,
    pub is_coadded: bool,
    /// Also write a page of small static thumbnails.
    pub with_thumb_only_page: bool,
    /// Bit naming used in figure titles.
    pub mask_type: TargetMaskType,
}

impl RenderOptions {
    /// Options for single-exposure frame pages.
    pub fn frames(mask_type: TargetMaskType) -> Self {
        RenderOptions {
            with_noise: true,
            with_coaddcam: false,
            is_coadded: false,
            with_thumb_only_page: true,
            mask_type,
        }
    }
}

/// Writes one HTML page for a set of spectra.
pub trait PageWriter {
    fn write_page(
        &self,
        spectra: &Spectra,
        html_dir: &Path,
        title: &str,
        options: &RenderOptions,
    ) -> Result<()>;
}
