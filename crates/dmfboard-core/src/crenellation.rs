//! Interlocking finger patterns along the shared boundary of two electrodes.
//!
//! Adjacent electrodes are modelled as a zero-gap tiling: they share their
//! boundary exactly, and fabrication later insets every electrode by half
//! the clearance (see [`crate::geometry::clearance_outline`]). Crenellation
//! replaces a shared straight edge with a trapezoidal wave that both
//! electrodes adopt verbatim, so their fingers interlock and the inset
//! outlines keep a uniform gap.

use std::fmt;

use crate::board::{reduce_board_to_electrodes, BoardDesign, ElectrodeOwner};
use crate::electrode::{Electrode, Placement};
use crate::error::CrenellationError;
use crate::geometry::{Point, Polygon};
use crate::grid::{Grid, GridPos};
use crate::spatial::SpatialIndex;

/// Distance under which two boundary points or lines are considered equal.
pub const EDGE_TOLERANCE: f64 = 1e-7;

/// Shape of the crenellation applied to every shared edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrenellationParams {
    num_digits: u32,
    theta_deg: f64,
    margin: f64,
}

impl CrenellationParams {
    /// `num_digits` teeth per edge, flank angle `theta_deg` measured from the
    /// edge normal, and `margin` of straight edge kept at each corner.
    ///
    /// Tooth depth is capped at `margin / 2`, so a zero margin is accepted
    /// but leaves every edge straight with [`StraightReason::NoToothDepth`].
    pub fn new(num_digits: u32, theta_deg: f64, margin: f64) -> Result<Self, CrenellationError> {
        if num_digits == 0 {
            return Err(CrenellationError::InvalidParams(
                "num_digits must be at least 1".into(),
            ));
        }
        if !(theta_deg > 0.0 && theta_deg < 90.0) {
            return Err(CrenellationError::InvalidParams(format!(
                "theta must lie strictly between 0 and 90 degrees, got {theta_deg}"
            )));
        }
        if !(margin.is_finite() && margin >= 0.0) {
            return Err(CrenellationError::InvalidParams(format!(
                "margin must be a non-negative length, got {margin}"
            )));
        }
        Ok(Self {
            num_digits,
            theta_deg,
            margin,
        })
    }

    pub fn num_digits(&self) -> u32 {
        self.num_digits
    }

    pub fn theta_deg(&self) -> f64 {
        self.theta_deg
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Tooth dimensions for a shared edge of `length`.
    ///
    /// Depth is `width / (4 tan theta)`, which keeps the plateau at least
    /// half the tooth width, capped at `margin / 2` so fingers stay clear of
    /// the crenellations on perpendicular edges.
    pub fn profile(&self, length: f64) -> Result<ToothProfile, StraightReason> {
        let usable = length - 2.0 * self.margin;
        if usable <= EDGE_TOLERANCE {
            return Err(StraightReason::BoundaryTooShort {
                length,
                margin: self.margin,
            });
        }
        let width = usable / self.num_digits as f64;
        let tan = self.theta_deg.to_radians().tan();
        let depth = (width / (4.0 * tan)).min(self.margin / 2.0);
        if depth <= EDGE_TOLERANCE {
            return Err(StraightReason::NoToothDepth {
                margin: self.margin,
            });
        }
        Ok(ToothProfile {
            width,
            depth,
            run: depth * tan,
        })
    }

    /// Whether fingers on an edge of `length` survive the clearance inset
    /// applied at fabrication.
    pub fn supports_clearance(&self, length: f64, clearance: f64) -> bool {
        let Ok(profile) = self.profile(length) else {
            return false;
        };
        let inset = clearance / 2.0;
        let theta = self.theta_deg.to_radians();
        let remaining = profile.width
            - 2.0 * (profile.depth - inset) * theta.tan()
            - 2.0 * inset / theta.cos();
        profile.depth > inset && remaining > 0.0
    }
}

/// Dimensions of one tooth, in board units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToothProfile {
    /// Tooth pitch along the edge.
    pub width: f64,
    /// How far a finger rises above (or sinks below) the straight edge.
    pub depth: f64,
    /// Along-edge run of each flank from the edge line to the plateau.
    pub run: f64,
}

impl ToothProfile {
    pub fn plateau(&self) -> f64 {
        self.width - 2.0 * self.run
    }
}

/// Why an edge was left straight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StraightReason {
    BoundaryTooShort { length: f64, margin: f64 },
    NoToothDepth { margin: f64 },
}

impl fmt::Display for StraightReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StraightReason::BoundaryTooShort { length, margin } => {
                write!(f, "boundary {length:.4} is not longer than two margins of {margin:.4}")
            }
            StraightReason::NoToothDepth { margin } => {
                write!(f, "margin {margin:.4} leaves no room for tooth depth")
            }
        }
    }
}

/// What happened to a shared edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrenellationOutcome {
    Crenellated { teeth: u32 },
    LeftStraight(StraightReason),
}

/// An electrode together with its owner's board placement.
#[derive(Debug, Clone, Copy)]
pub struct PlacedElectrode<'a> {
    pub electrode: &'a Electrode,
    pub placement: Placement,
}

impl<'a> PlacedElectrode<'a> {
    pub fn new(electrode: &'a Electrode, placement: Placement) -> Self {
        Self {
            electrode,
            placement,
        }
    }
}

/// New local polygons for a pair of electrodes, not yet committed.
#[derive(Debug, Clone, PartialEq)]
pub enum CrenellationPlan {
    Straight(StraightReason),
    Replace { teeth: u32, a: Polygon, b: Polygon },
}

impl CrenellationPlan {
    pub fn outcome(&self) -> CrenellationOutcome {
        match self {
            CrenellationPlan::Straight(reason) => CrenellationOutcome::LeftStraight(*reason),
            CrenellationPlan::Replace { teeth, .. } => {
                CrenellationOutcome::Crenellated { teeth: *teeth }
            }
        }
    }
}

/// The longest boundary segment two board-frame polygons share.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharedEdge {
    /// Index of the matched edge in the first polygon.
    pub a_edge: usize,
    /// Index of the matched edge in the second polygon.
    pub b_edge: usize,
    /// Overlap endpoints, ordered along the first polygon's edge.
    pub start: Point,
    pub end: Point,
}

impl SharedEdge {
    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }
}

fn outward_normal(dir: Point, polygon: &Polygon) -> Point {
    Point::new(dir.y, -dir.x) * polygon.signed_area().signum()
}

/// Find the colinear, overlapping, facing edge pair with the longest overlap.
pub fn find_shared_edge(a: &Polygon, b: &Polygon) -> Option<SharedEdge> {
    let mut best: Option<(f64, SharedEdge)> = None;
    for (i, (a0, a1)) in a.edges().enumerate() {
        let Some(da) = (a1 - a0).normalized() else {
            continue;
        };
        let la = a0.distance_to(&a1);
        let na = outward_normal(da, a);
        for (j, (b0, b1)) in b.edges().enumerate() {
            let Some(db) = (b1 - b0).normalized() else {
                continue;
            };
            if da.cross(db).abs() > EDGE_TOLERANCE
                || da.cross(b0 - a0).abs() > EDGE_TOLERANCE
                || da.cross(b1 - a0).abs() > EDGE_TOLERANCE
            {
                continue;
            }
            // Facing edges have opposite outward normals.
            if na.dot(outward_normal(db, b)) >= 0.0 {
                continue;
            }
            let (t0, t1) = (da.dot(b0 - a0), da.dot(b1 - a0));
            let lo = t0.min(t1).max(0.0);
            let hi = t0.max(t1).min(la);
            let overlap = hi - lo;
            if overlap > EDGE_TOLERANCE && best.map_or(true, |(o, _)| overlap > o + EDGE_TOLERANCE)
            {
                best = Some((
                    overlap,
                    SharedEdge {
                        a_edge: i,
                        b_edge: j,
                        start: a0 + da * lo,
                        end: a0 + da * hi,
                    },
                ));
            }
        }
    }
    best.map(|(_, edge)| edge)
}

/// Wave vertices in the edge frame: `u` along the edge, `v` out of the
/// first electrode.
fn wave_points(length: f64, margin: f64, teeth: u32, profile: &ToothProfile) -> Vec<(f64, f64)> {
    let mut points = Vec::with_capacity(2 * teeth as usize + 2);
    points.push((margin, 0.0));
    for k in 0..teeth {
        let start = margin + k as f64 * profile.width;
        let v = if k % 2 == 0 {
            profile.depth
        } else {
            -profile.depth
        };
        points.push((start + profile.run, v));
        points.push((start + profile.width - profile.run, v));
    }
    points.push((length - margin, 0.0));
    points
}

/// Build the edge replacement for `edge` of `polygon`, walking from
/// `first` to `last` with `wave` in between, in board coordinates.
fn edge_insert(global: &Polygon, edge: usize, first: Point, last: Point, wave: &[Point]) -> Vec<Point> {
    let n = global.len();
    let (e0, e1) = (global.points[edge], global.points[(edge + 1) % n]);
    let mut insert = Vec::with_capacity(wave.len() + 2);
    if first.distance_to(&e0) > EDGE_TOLERANCE {
        insert.push(first);
    }
    insert.extend_from_slice(wave);
    if last.distance_to(&e1) > EDGE_TOLERANCE {
        insert.push(last);
    }
    insert
}

fn splice(polygon: &Polygon, edge: usize, insert: impl IntoIterator<Item = Point>) -> Polygon {
    let mut points = polygon.points[..=edge].to_vec();
    points.extend(insert);
    points.extend_from_slice(&polygon.points[edge + 1..]);
    Polygon::new(points)
}

/// Compute the crenellated polygons for two adjacent electrodes without
/// modifying either.
pub fn plan_crenellation(
    a: PlacedElectrode<'_>,
    b: PlacedElectrode<'_>,
    params: &CrenellationParams,
) -> Result<CrenellationPlan, CrenellationError> {
    let ga = a.electrode.global_polygon(&a.placement);
    let gb = b.electrode.global_polygon(&b.placement);
    let shared = find_shared_edge(&ga, &gb).ok_or(CrenellationError::NoSharedEdge {
        a: a.electrode.refdes,
        b: b.electrode.refdes,
    })?;

    let length = shared.length();
    let profile = match params.profile(length) {
        Ok(profile) => profile,
        Err(reason) => return Ok(CrenellationPlan::Straight(reason)),
    };

    let dir = (shared.end - shared.start) * (1.0 / length);
    let out = outward_normal(dir, &ga);
    let wave: Vec<Point> = wave_points(length, params.margin, params.num_digits, &profile)
        .into_iter()
        .map(|(u, v)| shared.start + dir * u + out * v)
        .collect();

    let a_insert = edge_insert(&ga, shared.a_edge, shared.start, shared.end, &wave);

    // The second polygon may run either way along the shared line.
    let nb = gb.len();
    let b_dir = gb.points[(shared.b_edge + 1) % nb] - gb.points[shared.b_edge];
    let b_insert = if b_dir.dot(dir) < 0.0 {
        let reversed: Vec<Point> = wave.iter().rev().copied().collect();
        edge_insert(&gb, shared.b_edge, shared.end, shared.start, &reversed)
    } else {
        edge_insert(&gb, shared.b_edge, shared.start, shared.end, &wave)
    };

    let new_a = splice(
        &a.electrode.polygon,
        shared.a_edge,
        a_insert.iter().map(|p| a.electrode.to_local(&a.placement, p)),
    );
    let new_b = splice(
        &b.electrode.polygon,
        shared.b_edge,
        b_insert.iter().map(|p| b.electrode.to_local(&b.placement, p)),
    );

    new_a
        .validate()
        .map_err(|source| CrenellationError::InvalidGeometry {
            refdes: a.electrode.refdes,
            source,
        })?;
    new_b
        .validate()
        .map_err(|source| CrenellationError::InvalidGeometry {
            refdes: b.electrode.refdes,
            source,
        })?;

    Ok(CrenellationPlan::Replace {
        teeth: params.num_digits,
        a: new_a,
        b: new_b,
    })
}

/// Crenellate the shared boundary of an explicit electrode pair, each given
/// with its owner's placement. On error neither electrode is modified.
pub fn crenellate_electrodes(
    a: &mut Electrode,
    placement_a: &Placement,
    b: &mut Electrode,
    placement_b: &Placement,
    params: &CrenellationParams,
) -> Result<CrenellationOutcome, CrenellationError> {
    let plan = plan_crenellation(
        PlacedElectrode::new(a, *placement_a),
        PlacedElectrode::new(b, *placement_b),
        params,
    )?;
    let outcome = plan.outcome();
    match plan {
        CrenellationPlan::Replace {
            a: poly_a,
            b: poly_b,
            ..
        } => {
            log::debug!("crenellated {} / {}", a.refdes, b.refdes);
            a.polygon = poly_a;
            b.polygon = poly_b;
        }
        CrenellationPlan::Straight(reason) => {
            log::warn!("{} / {}: edge left straight, {}", a.refdes, b.refdes, reason);
        }
    }
    Ok(outcome)
}

/// Counts reported by [`crenellate_grid`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrenellationSummary {
    pub crenellated: usize,
    pub left_straight: usize,
}

/// Crenellate every boundary between horizontally or vertically adjacent
/// occupied cells of `grid`.
pub fn crenellate_grid(
    grid: &mut Grid,
    params: &CrenellationParams,
) -> Result<CrenellationSummary, CrenellationError> {
    let mut summary = CrenellationSummary::default();
    for (first, second) in grid.adjacent_pairs() {
        let plan = match (grid.electrode(first), grid.electrode(second)) {
            (Some(a), Some(b)) => plan_crenellation(
                PlacedElectrode::new(a, grid.cell_placement(first)),
                PlacedElectrode::new(b, grid.cell_placement(second)),
                params,
            ),
            _ => continue,
        };
        match plan {
            Ok(CrenellationPlan::Replace { a, b, .. }) => {
                if let Some(e) = grid.electrode_mut(first) {
                    e.polygon = a;
                }
                if let Some(e) = grid.electrode_mut(second) {
                    e.polygon = b;
                }
                summary.crenellated += 1;
            }
            Ok(CrenellationPlan::Straight(reason)) => {
                log::debug!("cells {first} / {second} left straight: {reason}");
                summary.left_straight += 1;
            }
            Err(err @ CrenellationError::NoSharedEdge { .. }) => {
                log::warn!("cells {first} / {second} skipped: {err}");
                summary.left_straight += 1;
            }
            Err(err) => return Err(err),
        }
    }
    if summary.left_straight > 0 {
        log::warn!(
            "{} grid edges left straight, {} crenellated",
            summary.left_straight,
            summary.crenellated
        );
    } else {
        log::info!("crenellated {} grid edges", summary.crenellated);
    }
    Ok(summary)
}

/// A grid cell facing a peripheral electrode across a shared boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub grid: usize,
    pub pos: GridPos,
    pub peripheral: usize,
    pub electrode: String,
}

impl Interface {
    /// Boundary this interface would crenellate on `board`, if both
    /// electrodes exist and meet along an edge.
    pub fn shared_edge(&self, board: &BoardDesign) -> Option<SharedEdge> {
        let grid = board.grids.get(self.grid)?;
        let cell = grid.electrode(self.pos)?;
        let peripheral = board.peripherals.get(self.peripheral)?;
        let target = peripheral.electrode(&self.electrode)?;
        find_shared_edge(
            &cell.global_polygon(&grid.cell_placement(self.pos)),
            &target.global_polygon(&peripheral.placement),
        )
    }
}

/// Discover every grid cell that shares a boundary with a peripheral
/// electrode. Ordered by peripheral, then template electrode, then grid.
pub fn find_interfaces(board: &BoardDesign) -> Vec<Interface> {
    let flat = reduce_board_to_electrodes(board);
    let index = SpatialIndex::from_electrodes(&flat);
    let mut interfaces = Vec::new();
    for item in &flat {
        let ElectrodeOwner::Peripheral { peripheral, id } = &item.owner else {
            continue;
        };
        let Some(bbox) = item.points.bbox() else {
            continue;
        };
        for hit in index.neighbours(&bbox, EDGE_TOLERANCE) {
            let other = &flat[hit];
            if let ElectrodeOwner::Grid { grid, pos } = other.owner {
                if find_shared_edge(&other.points, &item.points).is_some() {
                    interfaces.push(Interface {
                        grid,
                        pos,
                        peripheral: *peripheral,
                        electrode: id.clone(),
                    });
                }
            }
        }
    }
    interfaces
}
