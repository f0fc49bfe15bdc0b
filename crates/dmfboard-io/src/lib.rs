//! # dmfboard I/O
//!
//! Everything that crosses the file boundary: board configuration,
//! peripheral template files, net tables from the PCB tool, the
//! `electrode_board_layout.json` board definition and the fabrication
//! outline export. JSON output goes through a compact formatter that keeps
//! coordinate pairs on one line.

pub mod compact;
pub mod error;
pub mod fabrication;
pub mod layout;
pub mod pins;
pub mod project;
pub mod template;

pub use compact::{to_compact_json, CompactFormatter, CompactRule, ShortLeafLists};
pub use error::IoError;
pub use fabrication::{fabrication_document, FootprintWriter, JsonFootprintWriter};
pub use layout::{build_layout, grid_pins_from_electrodes, LayoutDocument, LayoutIssue};
pub use pins::{JsonNetTable, NetSource, PinError, PinTable};
pub use project::{BoardConfig, BuiltBoard};
pub use template::{load_peripheral, parse_peripheral, resolve_template};
