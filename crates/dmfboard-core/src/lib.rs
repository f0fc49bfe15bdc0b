//! # dmfboard Core
//!
//! Electrode board model for digital-microfluidics devices: geometric
//! primitives, square grids filled from ASCII floor-plans, placed peripheral
//! templates, the crenellation engine that interlocks adjacent electrodes,
//! and reduction of a board to a flat, board-frame electrode list.

pub mod board;
pub mod construct;
pub mod crenellation;
pub mod electrode;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod peripheral;
pub mod spatial;

pub use board::{reduce_board_to_electrodes, BoardDesign, BoardElectrode, ElectrodeOwner};
pub use construct::Constructor;
pub use crenellation::{
    crenellate_electrodes, crenellate_grid, find_interfaces, CrenellationOutcome,
    CrenellationParams, CrenellationSummary, Interface,
};
pub use electrode::{Electrode, Placement, Refdes};
pub use error::{ConstructionError, CrenellationError, GeometryError};
pub use geometry::{BBox, Point, Polygon};
pub use grid::{Grid, GridPos};
pub use peripheral::{Peripheral, PeripheralElectrode, PeripheralTemplate, TemplateElectrode};
