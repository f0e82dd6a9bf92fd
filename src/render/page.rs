use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;

use crate::color::BandColors;
use crate::data::model::{FibermapEntry, Spectra};

use super::plot::spectrum_plot;
use super::{PageWriter, RenderOptions};

const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.12.1.min.js";

/// Prefix of the thumbnail-only companion page.
pub const THUMB_PREFIX: &str = "thumbs_specviewer_";

/// Machine-readable description embedded in every page.
#[derive(Serialize)]
struct PageMeta<'a> {
    title: &'a str,
    mask_type: &'a str,
    with_noise: bool,
    with_coaddcam: bool,
    is_coadded: bool,
    spectra: &'a [FibermapEntry],
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn page_header(out: &mut String, title: &str) {
    let title = escape_html(title);
    let _ = write!(
        out,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <script src="{PLOTLY_JS}"></script>
    <style>
        body {{ font-family: Helvetica, Arial, sans-serif; margin: 1rem 2rem; }}
        .thumbs {{ display: flex; flex-wrap: wrap; gap: 0.5rem; }}
    </style>
</head>
<body>
<h1>{title}</h1>
"#
    );
}

// ---------------------------------------------------------------------------
// Plotly page writer
// ---------------------------------------------------------------------------

/// Writes `<title>.html` (and optionally `thumbs_specviewer_<title>.html`)
/// with plotly figures.
#[derive(Debug, Clone, Default)]
pub struct PlotlyPageWriter {
    colors: BandColors,
}

impl PlotlyPageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full page: metadata block plus one interactive figure per spectrum.
    pub fn render_page(&self, spectra: &Spectra, title: &str, options: &RenderOptions) -> Result<String> {
        let meta = PageMeta {
            title,
            mask_type: options.mask_type.column(),
            with_noise: options.with_noise,
            with_coaddcam: options.with_coaddcam,
            is_coadded: options.is_coadded,
            spectra: &spectra.fibermap,
        };
        let meta_json = serde_json::to_string(&meta)
            .context("serializing page metadata")?
            .replace("</", "<\\/");

        let mut out = String::new();
        page_header(&mut out, title);
        if options.with_thumb_only_page {
            let _ = writeln!(
                out,
                r#"<p><a href="{THUMB_PREFIX}{}.html">Thumbnails</a></p>"#,
                escape_html(title)
            );
        }
        let _ = writeln!(
            out,
            r#"<script type="application/json" id="page-meta">{meta_json}</script>"#
        );
        for index in 0..spectra.num_spectra() {
            let plot = spectrum_plot(spectra, index, options, &self.colors, false);
            out.push_str(&plot.to_inline_html(Some(format!("spectrum-{index}").as_str())));
            out.push('\n');
        }
        out.push_str("</body>\n</html>\n");
        Ok(out)
    }

    /// Thumbnail page: small static figures linking back to the full page.
    pub fn render_thumbs(&self, spectra: &Spectra, title: &str, options: &RenderOptions) -> String {
        let mut out = String::new();
        page_header(&mut out, title);
        let _ = writeln!(
            out,
            r#"<p><a href="{}.html">Full page</a></p>"#,
            escape_html(title)
        );
        out.push_str("<div class=\"thumbs\">\n");
        for index in 0..spectra.num_spectra() {
            let plot = spectrum_plot(spectra, index, options, &self.colors, true);
            out.push_str(&plot.to_inline_html(Some(format!("thumb-{index}").as_str())));
            out.push('\n');
        }
        out.push_str("</div>\n</body>\n</html>\n");
        out
    }
}

impl PageWriter for PlotlyPageWriter {
    fn write_page(
        &self,
        spectra: &Spectra,
        html_dir: &Path,
        title: &str,
        options: &RenderOptions,
    ) -> Result<()> {
        let path = html_dir.join(format!("{title}.html"));
        let html = self.render_page(spectra, title, options)?;
        fs::write(&path, html).with_context(|| format!("writing {}", path.display()))?;
        debug!("Wrote {}", path.display());

        if options.with_thumb_only_page {
            let path = html_dir.join(format!("{THUMB_PREFIX}{title}.html"));
            fs::write(&path, self.render_thumbs(spectra, title, options))
                .with_context(|| format!("writing {}", path.display()))?;
            debug!("Wrote {}", path.display());
        }
        Ok(())
    }
}
