use std::fmt;

use clap::ValueEnum;
use log::info;
use thiserror::Error;

use super::model::{FibermapEntry, Spectra};

// ---------------------------------------------------------------------------
// Target bitmask definitions
// ---------------------------------------------------------------------------

/// Which fibermap column, and which bit naming, a mask refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum TargetMaskType {
    /// Commissioning target bits
    #[value(name = "CMX_TARGET")]
    CmxTarget,
    /// Main survey target bits
    #[value(name = "DESI_TARGET")]
    DesiTarget,
}

const CMX_TARGET_BITS: &[(&str, u32)] = &[
    ("STD_GAIA", 0),
    ("SV0_STD_FAINT", 1),
    ("SV0_STD_BRIGHT", 2),
    ("STD_TEST", 3),
    ("STD_CALSPEC", 4),
    ("STD_DITHER", 5),
    ("SV0_MWS_CLUSTER", 6),
    ("SV0_MWS_CLUSTER_VERYBRIGHT", 7),
    ("SV0_BGS", 8),
    ("SV0_MWS", 9),
    ("SV0_LRG", 10),
    ("SV0_ELG", 11),
    ("SV0_QSO", 12),
    ("SV0_WD", 13),
    ("BACKUP_BRIGHT", 14),
    ("BACKUP_FAINT", 15),
    ("SKY", 32),
    ("STD_FAINT", 33),
    ("STD_BRIGHT", 35),
    ("BAD_SKY", 36),
];

const DESI_TARGET_BITS: &[(&str, u32)] = &[
    ("LRG", 0),
    ("ELG", 1),
    ("QSO", 2),
    ("LRG_NORTH", 8),
    ("ELG_NORTH", 9),
    ("QSO_NORTH", 10),
    ("LRG_SOUTH", 16),
    ("ELG_SOUTH", 17),
    ("QSO_SOUTH", 18),
    ("SKY", 32),
    ("STD_FAINT", 33),
    ("STD_WD", 34),
    ("STD_BRIGHT", 35),
    ("BAD_SKY", 36),
    ("SUPP_SKY", 37),
    ("NO_TARGET", 49),
    ("BRIGHT_OBJECT", 50),
    ("IN_BRIGHT_OBJECT", 51),
    ("NEAR_BRIGHT_OBJECT", 52),
    ("BGS_ANY", 60),
    ("MWS_ANY", 61),
    ("SCND_ANY", 62),
];

impl TargetMaskType {
    pub const ALL: [TargetMaskType; 2] = [TargetMaskType::CmxTarget, TargetMaskType::DesiTarget];

    /// Name of the FIBERMAP column holding the bits.
    pub fn column(self) -> &'static str {
        match self {
            TargetMaskType::CmxTarget => "CMX_TARGET",
            TargetMaskType::DesiTarget => "DESI_TARGET",
        }
    }

    fn bits(self) -> &'static [(&'static str, u32)] {
        match self {
            TargetMaskType::CmxTarget => CMX_TARGET_BITS,
            TargetMaskType::DesiTarget => DESI_TARGET_BITS,
        }
    }

    /// Names of every known bit set in `value`, in bit order.
    pub fn names_set(self, value: i64) -> Vec<&'static str> {
        self.bits()
            .iter()
            .filter(|(_, bit)| value & (1i64 << bit) != 0)
            .map(|(name, _)| *name)
            .collect()
    }
}

impl fmt::Display for TargetMaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("unknown {mask_type} mask '{name}'")]
    UnknownMask {
        mask_type: TargetMaskType,
        name: String,
    },
}

/// A single named target bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMask {
    pub mask_type: TargetMaskType,
    pub name: String,
    pub bit: u32,
}

impl TargetMask {
    /// Resolve a bit name within the given mask type.
    pub fn parse(mask_type: TargetMaskType, name: &str) -> Result<Self, FilterError> {
        mask_type
            .bits()
            .iter()
            .find(|(bit_name, _)| *bit_name == name)
            .map(|&(bit_name, bit)| TargetMask {
                mask_type,
                name: bit_name.to_string(),
                bit,
            })
            .ok_or_else(|| FilterError::UnknownMask {
                mask_type,
                name: name.to_string(),
            })
    }

    /// Whether this spectrum's target column has the bit set.
    /// A fibermap without the column never matches.
    pub fn matches(&self, entry: &FibermapEntry) -> bool {
        entry
            .targets
            .get(self.mask_type.column())
            .is_some_and(|value| value & (1i64 << self.bit) != 0)
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Indices of spectra whose target bits match `mask`.
pub fn mask_indices(spectra: &Spectra, mask: &TargetMask) -> Vec<usize> {
    spectra
        .fibermap
        .iter()
        .enumerate()
        .filter(|(_, entry)| mask.matches(entry))
        .map(|(i, _)| i)
        .collect()
}

/// Keep only the spectra matching `mask`. `None` when nothing matches.
pub fn select_by_mask(spectra: &Spectra, mask: &TargetMask) -> Option<Spectra> {
    let indices = mask_indices(spectra, mask);
    info!(
        "Target selection {}: {} spectra selected out of {}",
        mask.name,
        indices.len(),
        spectra.num_spectra()
    );
    let selected = spectra.select(&indices);
    (!selected.is_empty()).then_some(selected)
}
