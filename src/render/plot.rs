use plotly::common::{Line, Mode, Title};
use plotly::layout::Axis;
use plotly::{Configuration, Layout, Plot, Scatter};

use crate::color::BandColors;
use crate::data::model::{BandData, FibermapEntry, Spectra};

use super::RenderOptions;

const FULL_HEIGHT: usize = 380;
const THUMB_HEIGHT: usize = 180;
const THUMB_WIDTH: usize = 320;

// ---------------------------------------------------------------------------
// Per-spectrum figure
// ---------------------------------------------------------------------------

/// Title line of a spectrum figure: fiber, target id and the target bits set.
pub fn spectrum_label(entry: &FibermapEntry, options: &RenderOptions) -> String {
    let mut label = format!("Fiber {}  TARGETID {}", entry.fiber, entry.target_id);
    let names = entry
        .targets
        .get(options.mask_type.column())
        .map(|&bits| options.mask_type.names_set(bits))
        .unwrap_or_default();
    if !names.is_empty() {
        label.push_str("  ");
        label.push_str(&names.join(" "));
    }
    label
}

/// Noise level per pixel; `None` where the pixel carries no information.
pub fn noise(band: &BandData, index: usize) -> Vec<Option<f64>> {
    band.ivar[index]
        .iter()
        .zip(&band.mask[index])
        .map(|(&ivar, &mask)| {
            if ivar > 0.0 && mask == 0 {
                Some(1.0 / ivar.sqrt())
            } else {
                None
            }
        })
        .collect()
}

/// Build the figure of spectrum `index`. Thumbnails are small, static and
/// drop the noise traces and legend.
pub fn spectrum_plot(
    spectra: &Spectra,
    index: usize,
    options: &RenderOptions,
    colors: &BandColors,
    thumbnail: bool,
) -> Plot {
    let mut plot = Plot::new();

    for band in &spectra.bands {
        let trace = Scatter::new(band.wave.clone(), band.flux[index].clone())
            .mode(Mode::Lines)
            .name(band.band.to_string())
            .line(Line::new().color(colors.color_for(band.band).to_string()).width(1.0));
        plot.add_trace(trace);

        if options.with_noise && !thumbnail {
            let trace = Scatter::new(band.wave.clone(), noise(band, index))
                .mode(Mode::Lines)
                .name(format!("{} noise", band.band))
                .line(Line::new().color(colors.noise().to_string()).width(0.5));
            plot.add_trace(trace);
        }
    }

    let entry = &spectra.fibermap[index];
    let mut layout = Layout::new()
        .title(Title::with_text(spectrum_label(entry, options)))
        .x_axis(Axis::new().title(Title::with_text("Wavelength [Å]")))
        .y_axis(Axis::new().title(Title::with_text("Flux")));

    if thumbnail {
        layout = layout
            .height(THUMB_HEIGHT)
            .width(THUMB_WIDTH)
            .show_legend(false);
        plot.set_configuration(Configuration::new().static_plot(true));
    } else {
        layout = layout.height(FULL_HEIGHT);
    }
    plot.set_layout(layout);
    plot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::TargetMaskType;
    use crate::data::model::tests::frames;
    use crate::data::model::Band;

    #[test]
    fn noise_has_gaps_for_bad_pixels() {
        let mut spectra = Spectra::from_frames(frames(&[1])).unwrap();
        let band = &mut spectra.bands[0];
        band.ivar[0] = vec![4.0, 0.0, 1.0, 4.0];
        band.mask[0] = vec![0, 0, 2, 0];
        assert_eq!(noise(band, 0), vec![Some(0.5), None, None, Some(0.5)]);
    }

    #[test]
    fn label_names_target_bits() {
        let spectra = Spectra::from_frames(frames(&[3])).unwrap();
        let options = RenderOptions::frames(TargetMaskType::CmxTarget);
        // CMX_TARGET = 3 → bits 0 and 1
        assert_eq!(
            spectrum_label(&spectra.fibermap[0], &options),
            "Fiber 3  TARGETID 1003  STD_GAIA SV0_STD_FAINT"
        );
        let options = RenderOptions::frames(TargetMaskType::DesiTarget);
        assert_eq!(spectrum_label(&spectra.fibermap[0], &options), "Fiber 3  TARGETID 1003");
    }

    #[test]
    fn figure_carries_band_and_noise_traces() {
        let spectra = Spectra::from_frames(frames(&[1, 2])).unwrap();
        let options = RenderOptions::frames(TargetMaskType::CmxTarget);
        let colors = BandColors::default();

        let html = spectrum_plot(&spectra, 1, &options, &colors, false).to_inline_html(Some("fig"));
        for band in Band::ALL {
            assert!(html.contains(&format!("\"{band} noise\"")), "missing {band} noise");
        }
        assert!(html.contains("Fiber 2"));

        let thumb = spectrum_plot(&spectra, 1, &options, &colors, true).to_inline_html(Some("t"));
        assert!(!thumb.contains("noise"));
    }
}
