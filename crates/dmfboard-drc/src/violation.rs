use dmfboard_core::Refdes;
use serde::{Deserialize, Serialize};

/// Type of DRC violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    TooFewPoints,
    SelfIntersecting,
    Degenerate,
    /// The polygon cannot be inset by half the clearance.
    OutlineCollapsed,
    MinSpacing,
}

/// Severity level of a DRC violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single DRC violation with location and description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrcViolation {
    pub violation_type: ViolationType,
    pub severity: Severity,
    pub message: String,
    /// Electrodes involved; one for shape rules, two for spacing.
    pub refdes: Vec<Refdes>,
    /// Measured distance for spacing violations.
    pub distance: Option<f64>,
    pub clearance: f64,
    /// Bounding box of the violation region: [min_x, min_y, max_x, max_y]
    pub bbox: [f64; 4],
}

impl DrcViolation {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
