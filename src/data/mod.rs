/// Data layer: core types, frame I/O, and target selection.
///
/// Architecture:
/// ```text
///  <filetype>-<band><n>-<exposure>.fits  (b, r, z)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  FrameReader → Frame per band (fits)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model    │  Frame × 3 → Spectra (shared fibermap)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  target mask bit → selected Spectra or None
///   └──────────┘
/// ```

pub mod fits;
pub mod filter;
pub mod loader;
pub mod model;
