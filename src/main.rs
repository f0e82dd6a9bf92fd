use anyhow::Result;
use clap::Parser;
use log::info;

use specview_frames::config::{Args, RunConfig};
use specview_frames::data::loader::FitsFrameReader;
use specview_frames::render::page::PlotlyPageWriter;
use specview_frames::run::PageBuilder;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = RunConfig::from_args(Args::parse())?;
    let reader = FitsFrameReader;
    let writer = PlotlyPageWriter::new();

    let summary = PageBuilder::new(&config, &reader, &writer).run()?;
    info!(
        "Done: {} exposures, {} spectra, {} pages",
        summary.exposures_processed, summary.spectra_done, summary.pages_written
    );
    Ok(())
}
