//! Static HTML spectra pages from per-band calibrated frame files.
//!
//! The batch job scans `specprod_dir/exposures/<night>/<exposure>/`, merges
//! the b/r/z frames of every complete spectrograph, optionally keeps only
//! one target class, and writes fiber-sorted pages of plots.

pub mod color;
pub mod config;
pub mod data;
pub mod discovery;
pub mod pages;
pub mod render;
pub mod run;
