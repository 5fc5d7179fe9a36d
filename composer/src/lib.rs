//! Synthetic object-detection datasets from labeled bitmaps.
//!
//! Scaled copies of source objects are scattered over a noisy, grid-split
//! canvas; every accepted placement is tracked with its class and box and
//! written out as `images/NNNNNNNN.png` + `labels/NNNNNNNN.txt` pairs.

pub mod canvas;
pub mod compose;
pub mod config;
pub mod error;
pub mod export;
pub mod geom;
pub mod placer;
pub mod progress;
pub mod region;
pub mod source;
pub mod visualize;

pub use compose::{Composition, compose};
pub use config::{ComposeConfig, ConfigForm};
pub use error::{ComposeError, Result};
pub use export::{ExportEvent, ExportOptions, ExportSummary, ExportWorker, export};
pub use geom::{BBox, BoxFormat, Grid};
pub use placer::PlacedObject;
pub use progress::Progress;
pub use source::{SourceObject, SourceSet};
pub use visualize::{ClassPalette, label_lines, overlay_boxes};
