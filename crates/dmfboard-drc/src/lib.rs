//! # dmfboard DRC
//!
//! Fabrication rule checks over a flattened electrode board. Every electrode
//! polygon must be a valid pour, and the clearance outlines of neighbouring
//! electrodes must keep the copper-to-copper clearance. Neighbour pairs are
//! pruned with the core R-tree index.

pub mod check;
pub mod violation;

pub use check::{DrcChecker, DrcReport, DISTANCE_TOLERANCE};
pub use violation::{DrcViolation, Severity, ViolationType};
