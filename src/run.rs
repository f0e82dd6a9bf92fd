//! Batch driver: discovery → frames → mask → pages, with early stop.

use std::fs;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::config::RunConfig;
use crate::data::filter::select_by_mask;
use crate::data::loader::{read_band_frames, FrameReader};
use crate::data::model::Spectra;
use crate::discovery::{exposure_db, missing_exposures, ExposureRecord};
use crate::pages::{page_dir, page_title, paginate};
use crate::render::{PageWriter, RenderOptions};

// ---------------------------------------------------------------------------
// Batch driver
// ---------------------------------------------------------------------------

/// Totals of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub exposures_processed: usize,
    pub spectra_done: usize,
    pub pages_written: usize,
}

/// Turns discovered exposures into HTML pages.
pub struct PageBuilder<'a, R: ?Sized, W: ?Sized> {
    config: &'a RunConfig,
    reader: &'a R,
    writer: &'a W,
    options: RenderOptions,
}

impl<'a, R, W> PageBuilder<'a, R, W>
where
    R: FrameReader + ?Sized,
    W: PageWriter + ?Sized,
{
    pub fn new(config: &'a RunConfig, reader: &'a R, writer: &'a W) -> Self {
        PageBuilder {
            config,
            reader,
            writer,
            options: RenderOptions::frames(config.mask_type),
        }
    }

    /// Discover exposures and process them all.
    pub fn run(&self) -> Result<RunSummary> {
        let subset = self.config.selection.subset();
        let exposures = exposure_db(&self.config.specprod_dir, self.config.filetype, subset)
            .with_context(|| {
                format!(
                    "scanning exposures under {}",
                    self.config.specprod_dir.display()
                )
            })?;

        if let Some(requested) = subset {
            for missing in missing_exposures(requested, &exposures) {
                info!("Missing exposure, cannot be processed : {missing}");
            }
        }
        info!("{} exposures to be processed", exposures.len());

        self.process(&exposures)
    }

    /// Process `exposures` in order, stopping at an exposure boundary once
    /// `nmax_spectra` spectra are done.
    pub fn process(&self, exposures: &[ExposureRecord]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for record in exposures {
            info!("Working on exposure {}", record.exposure);
            for &spectrograph in &record.spectrographs {
                let (nspec, npages) = self.process_spectrograph(record, spectrograph)?;
                summary.spectra_done += nspec;
                summary.pages_written += npages;
            }
            summary.exposures_processed += 1;

            if let Some(nmax) = self.config.nmax_spectra {
                if summary.spectra_done >= nmax {
                    info!(
                        "{} spectra done : no other exposure will be processed",
                        summary.spectra_done
                    );
                    break;
                }
            }
        }

        Ok(summary)
    }

    /// Returns (spectra processed, pages written) for one spectrograph.
    fn process_spectrograph(&self, record: &ExposureRecord, spectrograph: u8) -> Result<(usize, usize)> {
        let exposure_dir = record.dir(&self.config.specprod_dir);
        let frames = read_band_frames(
            self.reader,
            &exposure_dir,
            self.config.filetype,
            spectrograph,
            &record.exposure,
        )?;
        let spectra = Spectra::from_frames(frames).with_context(|| {
            format!(
                "merging frames of exposure {} spectrograph {spectrograph}",
                record.exposure
            )
        })?;

        let spectra = match &self.config.mask {
            Some(mask) => match select_by_mask(&spectra, mask) {
                Some(selected) => selected,
                None => {
                    warn!(
                        "Spectrograph number {spectrograph} : no {} target, skipped",
                        mask.name
                    );
                    return Ok((0, 0));
                }
            },
            None => spectra,
        };

        let nspec = spectra.num_spectra();
        info!("Spectrograph number {spectrograph} : {nspec} spectra");

        let mask_name = self.config.mask_name();
        let html_dir = page_dir(&self.config.webdir, &record.exposure, mask_name);
        let pages = paginate(&spectra.fiber_order(), self.config.nspec_per_page);
        if !pages.is_empty() {
            fs::create_dir_all(&html_dir)
                .with_context(|| format!("creating {}", html_dir.display()))?;
        }

        for page in &pages {
            info!(" * Page {} / {}", page.number, pages.len());
            let title = page_title(&record.exposure, spectrograph, page.number, mask_name);
            let page_spectra = spectra.select(&page.indices);
            self.writer
                .write_page(&page_spectra, &html_dir, &title, &self.options)
                .with_context(|| format!("writing page {title}"))?;
        }

        Ok((nspec, pages.len()))
    }
}
