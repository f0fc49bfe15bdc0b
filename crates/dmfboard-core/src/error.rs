use thiserror::Error;

use crate::electrode::Refdes;

/// Errors raised by polygon validation and offsetting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("polygon has {count} points, at least 3 are required")]
    TooFewPoints { count: usize },

    #[error("degenerate polygon: {0}")]
    Degenerate(String),

    #[error("polygon is self-intersecting")]
    SelfIntersecting,
}

/// Errors raised while building grids and placing peripherals.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructionError {
    #[error("grid pitch must be positive and finite, got {0}")]
    InvalidPitch(f64),

    #[error("grid size {width}x{height} must be non-zero")]
    EmptyGrid { width: u32, height: u32 },

    #[error("floor-plan row {row} has {columns} columns but the grid is {width} wide")]
    FloorplanTooWide { row: usize, columns: usize, width: u32 },

    #[error("floor-plan has {rows} rows but the grid is {height} high")]
    FloorplanTooTall { rows: usize, height: u32 },

    #[error("invalid floor-plan character {ch:?} at row {row}, column {col}")]
    InvalidCharacter { row: usize, col: usize, ch: char },

    #[error("cell ({col}, {row}) lies outside the {width}x{height} grid")]
    CellOutOfBounds {
        col: u32,
        row: u32,
        width: u32,
        height: u32,
    },

    #[error("cell ({col}, {row}) already holds an electrode")]
    CellOccupied { col: u32, row: u32 },

    #[error("peripheral template '{0}' has no electrodes")]
    EmptyTemplate(String),

    #[error("peripheral template '{template}' defines electrode '{id}' twice")]
    DuplicateElectrodeId { template: String, id: String },

    #[error("electrode '{id}' in '{template}' is invalid: {source}")]
    InvalidElectrode {
        template: String,
        id: String,
        #[source]
        source: GeometryError,
    },
}

/// Errors raised by the crenellation engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CrenellationError {
    #[error("invalid crenellation parameters: {0}")]
    InvalidParams(String),

    #[error("electrodes {a} and {b} do not share a boundary")]
    NoSharedEdge { a: Refdes, b: Refdes },

    #[error("crenellating {refdes} would produce invalid geometry: {source}")]
    InvalidGeometry {
        refdes: Refdes,
        #[source]
        source: GeometryError,
    },

    #[error("no electrode at {0}")]
    MissingElectrode(String),
}
