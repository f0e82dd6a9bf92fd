//! Write a small synthetic `specprod_dir` tree of frame files.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use specview_frames::data::fits::write_frame;
use specview_frames::data::filter::TargetMaskType;
use specview_frames::data::loader::{frame_file_name, FileType};
use specview_frames::data::model::{Band, FibermapEntry, Frame};
use specview_frames::discovery::pad_exposure;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate synthetic calibrated frames")]
struct Args {
    /// Output production directory
    #[arg(long, default_value = "sample_specprod")]
    out: PathBuf,

    /// Night directory name
    #[arg(long, default_value = "20200315")]
    night: String,

    /// First exposure id
    #[arg(long, default_value_t = 55654)]
    first_exposure: u32,

    /// Number of exposures
    #[arg(long, default_value_t = 2)]
    exposures: u32,

    /// Number of spectrographs per exposure (0..n)
    #[arg(long, default_value_t = 2)]
    spectrographs: u8,

    /// Spectra per spectrograph
    #[arg(long, default_value_t = 120)]
    nspec: usize,

    /// File category written
    #[arg(long, value_enum, default_value_t = FileType::Cframe)]
    filetype: FileType,
}

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Wavelength grid of a band, in Angstrom.
fn band_grid(band: Band) -> Vec<f64> {
    let (start, stop) = match band {
        Band::B => (3600.0, 5800.0),
        Band::R => (5760.0, 7620.0),
        Band::Z => (7520.0, 9824.0),
    };
    let step = 2.0;
    let n = ((stop - start) / step) as usize;
    (0..n).map(|i| start + i as f64 * step).collect()
}

/// One target per fiber: id, bits and a redshifted emission line.
struct Target {
    fiber: i32,
    target_id: i64,
    cmx_target: i64,
    desi_target: i64,
    continuum: f64,
    line_center: f64,
}

fn targets(spectrograph: u8, exposure: u32, nspec: usize, rng: &mut SimpleRng) -> Vec<Target> {
    // a few plausible classes: (cmx bits, desi bits)
    let classes: [(i64, i64); 4] = [
        (1 << 0, 1 << 33),   // STD_GAIA / STD_FAINT
        (1 << 10, 1 << 0),   // SV0_LRG / LRG
        (1 << 11, 1 << 1),   // SV0_ELG / ELG
        (1 << 12, 1 << 2),   // SV0_QSO / QSO
    ];
    (0..nspec)
        .map(|i| {
            let fiber = spectrograph as i32 * 500 + i as i32;
            let (cmx_target, desi_target) = classes[(rng.next_u64() % classes.len() as u64) as usize];
            Target {
                fiber,
                target_id: exposure as i64 * 10_000 + fiber as i64,
                cmx_target,
                desi_target,
                continuum: 1.0 + 4.0 * rng.next_f64(),
                line_center: 3727.0 * (1.0 + 1.4 * rng.next_f64()),
            }
        })
        .collect()
}

fn band_frame(band: Band, targets: &[Target], rng: &mut SimpleRng) -> Frame {
    let wave = band_grid(band);
    let noise_sigma = 0.5;
    let mut flux = Vec::with_capacity(targets.len());
    let mut ivar = Vec::with_capacity(targets.len());
    let mut mask = Vec::with_capacity(targets.len());

    for target in targets {
        flux.push(
            wave.iter()
                .map(|&w| {
                    target.continuum
                        + gaussian(w, target.line_center, 4.0, 20.0)
                        + rng.gauss(0.0, noise_sigma)
                })
                .collect(),
        );
        ivar.push(vec![1.0 / (noise_sigma * noise_sigma); wave.len()]);
        // a handful of flagged pixels
        mask.push(
            (0..wave.len())
                .map(|_| if rng.next_f64() < 0.002 { 1 } else { 0 })
                .collect(),
        );
    }

    let fibermap = targets
        .iter()
        .map(|t| FibermapEntry {
            fiber: t.fiber,
            target_id: t.target_id,
            targets: BTreeMap::from([
                (TargetMaskType::CmxTarget.column().to_string(), t.cmx_target),
                (TargetMaskType::DesiTarget.column().to_string(), t.desi_target),
            ]),
        })
        .collect();

    Frame {
        band,
        wave,
        flux,
        ivar,
        mask,
        fibermap,
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let mut rng = SimpleRng::new(42);

    for exposure_num in args.first_exposure..args.first_exposure + args.exposures {
        let exposure = pad_exposure(&exposure_num.to_string());
        let dir = args.out.join("exposures").join(&args.night).join(&exposure);
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

        for spectrograph in 0..args.spectrographs {
            let fiber_targets = targets(spectrograph, exposure_num, args.nspec, &mut rng);
            for band in Band::ALL {
                let frame = band_frame(band, &fiber_targets, &mut rng);
                let path = dir.join(frame_file_name(args.filetype, band, spectrograph, &exposure));
                write_frame(&frame, &path)?;
            }
        }
        info!("Wrote exposure {exposure} to {}", dir.display());
    }

    info!(
        "Wrote {} exposures x {} spectrographs x {} spectra under {}",
        args.exposures,
        args.spectrographs,
        args.nspec,
        args.out.display()
    );
    Ok(())
}
