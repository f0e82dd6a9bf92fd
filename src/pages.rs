//! Pagination, page titles and output directories.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// One HTML page worth of spectra.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    /// Indices into the spectra collection, in display order.
    pub indices: Vec<usize>,
}

/// Split `order` into consecutive pages of at most `per_page` entries.
pub fn paginate(order: &[usize], per_page: NonZeroUsize) -> Vec<Page> {
    order
        .chunks(per_page.get())
        .enumerate()
        .map(|(i, chunk)| Page {
            number: i + 1,
            indices: chunk.to_vec(),
        })
        .collect()
}

/// Title (and file stem) of a page: `[<mask>_]expo<exposure>_spectro<n>_<page>`.
pub fn page_title(exposure: &str, spectrograph: u8, page: usize, mask: Option<&str>) -> String {
    let title = format!("expo{exposure}_spectro{spectrograph}_{page}");
    match mask {
        Some(mask) => format!("{mask}_{title}"),
        None => title,
    }
}

/// Output directory for an exposure's pages.
pub fn page_dir(webdir: &Path, exposure: &str, mask: Option<&str>) -> PathBuf {
    match mask {
        Some(mask) => webdir.join(mask).join(exposure),
        None => webdir.join("exposures").join(exposure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: usize) -> NonZeroUsize {
        NonZeroUsize::new(v).unwrap()
    }

    #[test]
    fn page_count_is_ceiling() {
        for (total, per_page, expected) in [(0, 50, 0), (1, 50, 1), (50, 50, 1), (51, 50, 2), (7, 1, 7)] {
            let order: Vec<usize> = (0..total).collect();
            assert_eq!(paginate(&order, n(per_page)).len(), expected, "{total}/{per_page}");
        }
    }

    #[test]
    fn pages_concatenate_to_order() {
        let order = vec![4, 0, 3, 1, 2, 6, 5];
        let pages = paginate(&order, n(3));
        let joined: Vec<usize> = pages.iter().flat_map(|p| p.indices.clone()).collect();
        assert_eq!(joined, order);
        let numbers: Vec<usize> = pages.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn hundred_twenty_spectra_in_pages_of_fifty() {
        let order: Vec<usize> = (0..120).collect();
        let pages = paginate(&order, n(50));
        let sizes: Vec<usize> = pages.iter().map(|p| p.indices.len()).collect();
        assert_eq!(sizes, vec![50, 50, 20]);
        let titles: Vec<String> = pages
            .iter()
            .map(|p| page_title("00055654", 0, p.number, None))
            .collect();
        assert_eq!(
            titles,
            vec![
                "expo00055654_spectro0_1",
                "expo00055654_spectro0_2",
                "expo00055654_spectro0_3"
            ]
        );
    }

    #[test]
    fn mask_changes_title_and_dir() {
        assert_eq!(
            page_title("00055654", 7, 2, Some("SV0_QSO")),
            "SV0_QSO_expo00055654_spectro7_2"
        );
        let web = Path::new("/www");
        assert_eq!(
            page_dir(web, "00055654", None),
            PathBuf::from("/www/exposures/00055654")
        );
        assert_eq!(
            page_dir(web, "00055654", Some("SV0_QSO")),
            PathBuf::from("/www/SV0_QSO/00055654")
        );
    }
}
