//! Command line and validated run settings.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use thiserror::Error;

use crate::data::filter::{FilterError, TargetMask, TargetMaskType};
use crate::data::loader::{load_exposure_list, FileType};

/// Command line of the page builder.
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Create exposure-based static html pages from calibrated frames"
)]
pub struct Args {
    /// Location of directory tree (data in specprod_dir/exposures/)
    #[arg(long = "specprod_dir")]
    pub specprod_dir: PathBuf,

    /// Name of single exposure to be processed
    #[arg(long, conflicts_with = "exposure_list")]
    pub exposure: Option<String>,

    /// ASCII file providing list of exposures
    #[arg(long = "exposure_list")]
    pub exposure_list: Option<PathBuf>,

    /// Number of spectra in each html page
    #[arg(long, default_value_t = 50)]
    pub nspecperfile: usize,

    /// Base directory for webpages
    #[arg(long)]
    pub webdir: PathBuf,

    /// Stop the production of HTML pages once a given number of spectra are done
    #[arg(long = "nmax_spectra")]
    pub nmax_spectra: Option<usize>,

    /// File category
    #[arg(long, value_enum, default_value_t = FileType::Cframe)]
    pub filetype: FileType,

    /// Select only objects with a given target mask bit
    #[arg(long)]
    pub mask: Option<String>,

    /// Target bitmask column the mask bit belongs to
    #[arg(long = "mask_type", value_enum, default_value_t = TargetMaskType::CmxTarget)]
    pub mask_type: TargetMaskType,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("--nspecperfile must be at least 1")]
    ZeroPageSize,
    #[error(transparent)]
    Mask(#[from] FilterError),
}

/// Which exposures to consider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExposureSelection {
    All,
    /// Explicit ids, as written by the user (padding happens at discovery).
    Only(Vec<String>),
}

impl ExposureSelection {
    pub fn subset(&self) -> Option<&[String]> {
        match self {
            ExposureSelection::All => None,
            ExposureSelection::Only(ids) => Some(ids.as_slice()),
        }
    }
}

/// Validated run settings.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub specprod_dir: PathBuf,
    pub webdir: PathBuf,
    pub selection: ExposureSelection,
    pub filetype: FileType,
    pub nspec_per_page: NonZeroUsize,
    pub nmax_spectra: Option<usize>,
    pub mask: Option<TargetMask>,
    pub mask_type: TargetMaskType,
}

impl RunConfig {
    /// Validate `args`, reading the exposure list file if one is given.
    pub fn from_args(args: Args) -> Result<Self> {
        let nspec_per_page =
            NonZeroUsize::new(args.nspecperfile).ok_or(ConfigError::ZeroPageSize)?;

        let mask = args
            .mask
            .as_deref()
            .map(|name| TargetMask::parse(args.mask_type, name))
            .transpose()
            .map_err(ConfigError::from)?;

        let selection = match (args.exposure, args.exposure_list) {
            (Some(exposure), None) => ExposureSelection::Only(vec![exposure]),
            (None, Some(list)) => ExposureSelection::Only(
                load_exposure_list(&list)
                    .with_context(|| format!("loading exposure list {}", list.display()))?,
            ),
            (None, None) => ExposureSelection::All,
            // clap rejects this combination
            (Some(_), Some(_)) => anyhow::bail!("--exposure and --exposure_list are exclusive"),
        };

        Ok(RunConfig {
            specprod_dir: args.specprod_dir,
            webdir: args.webdir,
            selection,
            filetype: args.filetype,
            nspec_per_page,
            nmax_spectra: args.nmax_spectra,
            mask,
            mask_type: args.mask_type,
        })
    }

    /// Mask name used in output titles and directories.
    pub fn mask_name(&self) -> Option<&str> {
        self.mask.as_ref().map(|m| m.name.as_str())
    }
}
