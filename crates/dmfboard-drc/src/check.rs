use dmfboard_core::geometry::{clearance_outline, polygon_distance, BBox, Polygon};
use dmfboard_core::spatial::SpatialIndex;
use dmfboard_core::{BoardElectrode, GeometryError, Refdes};
use serde::Serialize;

use crate::violation::{DrcViolation, Severity, ViolationType};

/// Slack allowed on measured spacing before it counts as a violation.
pub const DISTANCE_TOLERANCE: f64 = 1e-9;

/// Checks a flattened board against a copper-to-copper clearance.
#[derive(Debug, Clone, Copy)]
pub struct DrcChecker {
    clearance: f64,
    spacing_severity: Severity,
}

/// Result of a DRC run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DrcReport {
    pub violations: Vec<DrcViolation>,
    pub checked_electrodes: usize,
    pub checked_pairs: usize,
}

impl DrcReport {
    /// True when no violation has error severity.
    pub fn is_clean(&self) -> bool {
        !self.violations.iter().any(DrcViolation::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.violations.iter().filter(|v| v.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Warning)
            .count()
    }
}

fn bbox_array(bbox: Option<BBox>) -> [f64; 4] {
    bbox.map_or([0.0; 4], |b| [b.min.x, b.min.y, b.max.x, b.max.y])
}

impl DrcChecker {
    pub fn new(clearance: f64) -> Self {
        Self {
            clearance,
            spacing_severity: Severity::Error,
        }
    }

    /// Report spacing violations at `severity` instead of as errors.
    pub fn with_spacing_severity(mut self, severity: Severity) -> Self {
        self.spacing_severity = severity;
        self
    }

    pub fn clearance(&self) -> f64 {
        self.clearance
    }

    fn shape_violation(&self, refdes: Refdes, polygon: &Polygon, err: &GeometryError) -> DrcViolation {
        let violation_type = match err {
            GeometryError::TooFewPoints { .. } => ViolationType::TooFewPoints,
            GeometryError::SelfIntersecting => ViolationType::SelfIntersecting,
            GeometryError::Degenerate(_) => ViolationType::Degenerate,
        };
        DrcViolation {
            violation_type,
            severity: Severity::Error,
            message: format!("{refdes}: {err}"),
            refdes: vec![refdes],
            distance: None,
            clearance: self.clearance,
            bbox: bbox_array(polygon.bbox()),
        }
    }

    /// Validate every electrode and the spacing of every neighbouring pair.
    pub fn check(&self, electrodes: &[BoardElectrode]) -> DrcReport {
        let mut report = DrcReport {
            checked_electrodes: electrodes.len(),
            ..DrcReport::default()
        };

        let mut outlines: Vec<Option<Polygon>> = Vec::with_capacity(electrodes.len());
        for item in electrodes {
            let refdes = item.refdes();
            if let Err(err) = item.points.validate() {
                report
                    .violations
                    .push(self.shape_violation(refdes, &item.points, &err));
                outlines.push(None);
                continue;
            }
            let outline = clearance_outline(&item.points, self.clearance)
                .and_then(|outline| outline.validate().map(|()| outline));
            match outline {
                Ok(outline) => outlines.push(Some(outline)),
                Err(err) => {
                    report.violations.push(DrcViolation {
                        violation_type: ViolationType::OutlineCollapsed,
                        severity: Severity::Error,
                        message: format!(
                            "{refdes}: cannot inset by {:.4}: {err}",
                            self.clearance / 2.0
                        ),
                        refdes: vec![refdes],
                        distance: None,
                        clearance: self.clearance,
                        bbox: bbox_array(item.points.bbox()),
                    });
                    outlines.push(None);
                }
            }
        }

        let index = SpatialIndex::from_electrodes(electrodes);
        for (i, item) in electrodes.iter().enumerate() {
            let (Some(outline_a), Some(bbox)) = (&outlines[i], item.points.bbox()) else {
                continue;
            };
            for j in index.neighbours(&bbox, self.clearance) {
                if j <= i {
                    continue;
                }
                let Some(outline_b) = &outlines[j] else {
                    continue;
                };
                report.checked_pairs += 1;
                let distance = polygon_distance(outline_a, outline_b);
                if distance < self.clearance - DISTANCE_TOLERANCE {
                    let (a, b) = (item.refdes(), electrodes[j].refdes());
                    let region = match (outline_a.bbox(), outline_b.bbox()) {
                        (Some(ba), Some(bb)) => Some(ba.union(&bb)),
                        _ => None,
                    };
                    report.violations.push(DrcViolation {
                        violation_type: ViolationType::MinSpacing,
                        severity: self.spacing_severity,
                        message: format!(
                            "{a} / {b}: spacing {distance:.4} below clearance {:.4}",
                            self.clearance
                        ),
                        refdes: vec![a, b],
                        distance: Some(distance),
                        clearance: self.clearance,
                        bbox: bbox_array(region),
                    });
                }
            }
        }

        log::info!(
            "DRC checked {} electrodes and {} pairs: {} errors, {} warnings",
            report.checked_electrodes,
            report.checked_pairs,
            report.error_count(),
            report.warning_count()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmfboard_core::geometry::Point;
    use dmfboard_core::{
        crenellate_grid, reduce_board_to_electrodes, BoardDesign, Constructor, CrenellationParams,
        Electrode, ElectrodeOwner, Grid, GridPos, Placement,
    };

    fn loose(refdes: u32, polygon: Polygon) -> BoardElectrode {
        BoardElectrode {
            owner: ElectrodeOwner::Grid {
                grid: 0,
                pos: GridPos::new(refdes, 0),
            },
            placement: Placement::default(),
            electrode: Electrode::new(Refdes(refdes), Point::new(0.0, 0.0), polygon.clone()),
            points: polygon,
        }
    }

    fn crenellated_board() -> BoardDesign {
        let mut grid = Grid::new(Point::new(0.0, 0.0), (3, 2), 2.5).unwrap();
        Constructor::new().fill_ascii(&mut grid, "XXX\nXX\n").unwrap();
        let params = CrenellationParams::new(5, 30.0, 0.375).unwrap();
        crenellate_grid(&mut grid, &params).unwrap();
        let mut board = BoardDesign::new();
        board.add_grid(grid);
        board
    }

    #[test]
    fn test_crenellated_grid_is_clean() {
        let flat = reduce_board_to_electrodes(&crenellated_board());
        let report = DrcChecker::new(0.11).check(&flat);
        assert!(report.is_clean(), "{:?}", report.violations);
        assert_eq!(report.checked_electrodes, 5);
        // All pairs but (0,0)-(2,0) and (2,0)-(0,1) touch at an edge or corner
        assert_eq!(report.checked_pairs, 8);
    }

    #[test]
    fn test_overlapping_electrodes() {
        let flat = vec![
            loose(1, Polygon::rect(0.0, 0.0, 2.0, 2.0)),
            loose(2, Polygon::rect(1.0, 0.0, 3.0, 2.0)),
        ];
        let report = DrcChecker::new(0.1).check(&flat);
        assert_eq!(report.violations.len(), 1);
        let v = &report.violations[0];
        assert_eq!(v.violation_type, ViolationType::MinSpacing);
        assert_eq!(v.refdes, vec![Refdes(1), Refdes(2)]);
        assert_eq!(v.distance, Some(0.0));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_spacing_exactly_at_clearance_passes() {
        // Abutting squares inset by half the clearance are exactly clearance apart
        let flat = vec![
            loose(1, Polygon::rect(0.0, 0.0, 1.0, 1.0)),
            loose(2, Polygon::rect(1.0, 0.0, 2.0, 1.0)),
        ];
        assert!(DrcChecker::new(0.2).check(&flat).violations.is_empty());
    }

    #[test]
    fn test_spacing_severity_override() {
        let flat = vec![
            loose(1, Polygon::rect(0.0, 0.0, 2.0, 2.0)),
            loose(2, Polygon::rect(1.0, 0.0, 3.0, 2.0)),
        ];
        let report = DrcChecker::new(0.1)
            .with_spacing_severity(Severity::Warning)
            .check(&flat);
        assert!(report.is_clean());
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_shape_violations() {
        let bowtie = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(2.0, 0.0),
            Point::new(0.0, 1.0),
        ]);
        let line = Polygon::new(vec![Point::new(5.0, 0.0), Point::new(6.0, 0.0)]);
        let flat = vec![loose(1, bowtie), loose(2, line)];
        let report = DrcChecker::new(0.1).check(&flat);
        let kinds: Vec<ViolationType> = report.violations.iter().map(|v| v.violation_type).collect();
        assert_eq!(
            kinds,
            vec![ViolationType::SelfIntersecting, ViolationType::TooFewPoints]
        );
        assert_eq!(report.checked_pairs, 0);
    }

    #[test]
    fn test_thin_electrode_outline_collapses() {
        let flat = vec![loose(1, Polygon::rect(0.0, 0.0, 0.1, 3.0))];
        let report = DrcChecker::new(0.11).check(&flat);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(
            report.violations[0].violation_type,
            ViolationType::OutlineCollapsed
        );
    }

    #[test]
    fn test_thin_fingers_fail_outline_check() {
        let mut grid = Grid::new(Point::new(0.0, 0.0), (3, 3), 2.5).unwrap();
        Constructor::new().fill_ascii(&mut grid, "XXX\nXXX\nXXX").unwrap();
        let params = CrenellationParams::new(20, 30.0, 0.375).unwrap();
        crenellate_grid(&mut grid, &params).unwrap();
        let mut board = BoardDesign::new();
        board.add_grid(grid);
        let flat = reduce_board_to_electrodes(&board);
        let report = DrcChecker::new(0.11).check(&flat);
        assert!(!report.is_clean());
        assert!(report
            .violations
            .iter()
            .any(|v| v.violation_type == ViolationType::OutlineCollapsed));
    }

    #[test]
    fn test_report_serializes() {
        let flat = vec![
            loose(1, Polygon::rect(0.0, 0.0, 2.0, 2.0)),
            loose(2, Polygon::rect(1.0, 0.0, 3.0, 2.0)),
        ];
        let report = DrcChecker::new(0.1).check(&flat);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["violations"][0]["violation_type"], "MinSpacing");
        assert_eq!(json["violations"][0]["refdes"][1], 2);
    }
}
