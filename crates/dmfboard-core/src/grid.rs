use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::electrode::{Electrode, Placement};
use crate::error::ConstructionError;
use crate::geometry::Point;

/// Lattice address of a grid cell. Orders row-major (row, then column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub col: u32,
    pub row: u32,
}

impl GridPos {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    pub fn right(&self) -> GridPos {
        GridPos::new(self.col + 1, self.row)
    }

    pub fn below(&self) -> GridPos {
        GridPos::new(self.col, self.row + 1)
    }
}

impl Ord for GridPos {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.row, self.col).cmp(&(other.row, other.col))
    }
}

impl PartialOrd for GridPos {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// A rectangular lattice of optional electrodes at a fixed pitch.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Board position of the corner of cell (0, 0).
    pub origin: Point,
    width: u32,
    height: u32,
    pitch: f64,
    electrodes: BTreeMap<GridPos, Electrode>,
}

impl Grid {
    pub fn new(origin: Point, size: (u32, u32), pitch: f64) -> Result<Self, ConstructionError> {
        if !(pitch.is_finite() && pitch > 0.0) {
            return Err(ConstructionError::InvalidPitch(pitch));
        }
        let (width, height) = size;
        if width == 0 || height == 0 {
            return Err(ConstructionError::EmptyGrid { width, height });
        }
        Ok(Self {
            origin,
            width,
            height,
            pitch,
            electrodes: BTreeMap::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        pos.col < self.width && pos.row < self.height
    }

    /// Placement of a cell's frame: grid origin plus `(col, row) * pitch`.
    pub fn cell_placement(&self, pos: GridPos) -> Placement {
        Placement::translate(
            self.origin.x + pos.col as f64 * self.pitch,
            self.origin.y + pos.row as f64 * self.pitch,
        )
    }

    pub fn insert(&mut self, pos: GridPos, electrode: Electrode) -> Result<(), ConstructionError> {
        if !self.contains(pos) {
            return Err(ConstructionError::CellOutOfBounds {
                col: pos.col,
                row: pos.row,
                width: self.width,
                height: self.height,
            });
        }
        if self.electrodes.contains_key(&pos) {
            return Err(ConstructionError::CellOccupied {
                col: pos.col,
                row: pos.row,
            });
        }
        self.electrodes.insert(pos, electrode);
        Ok(())
    }

    pub fn electrode(&self, pos: GridPos) -> Option<&Electrode> {
        self.electrodes.get(&pos)
    }

    pub fn electrode_mut(&mut self, pos: GridPos) -> Option<&mut Electrode> {
        self.electrodes.get_mut(&pos)
    }

    pub fn is_occupied(&self, pos: GridPos) -> bool {
        self.electrodes.contains_key(&pos)
    }

    /// Occupied cells in row-major order.
    pub fn electrodes(&self) -> impl Iterator<Item = (GridPos, &Electrode)> {
        self.electrodes.iter().map(|(pos, e)| (*pos, e))
    }

    pub fn positions(&self) -> Vec<GridPos> {
        self.electrodes.keys().copied().collect()
    }

    pub fn electrode_count(&self) -> usize {
        self.electrodes.len()
    }

    /// Pairs of occupied cells sharing a cell boundary: right neighbour
    /// first, then the one below, in row-major order.
    pub fn adjacent_pairs(&self) -> Vec<(GridPos, GridPos)> {
        let mut pairs = Vec::new();
        for pos in self.electrodes.keys() {
            for neighbour in [pos.right(), pos.below()] {
                if self.electrodes.contains_key(&neighbour) {
                    pairs.push((*pos, neighbour));
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::electrode::Refdes;
    use crate::geometry::Polygon;

    fn square(n: u32) -> Electrode {
        Electrode::new(Refdes(n), Point::new(0.0, 0.0), Polygon::rect(0.0, 0.0, 1.0, 1.0))
    }

    #[test]
    fn test_grid_rejects_bad_pitch() {
        assert_eq!(
            Grid::new(Point::new(0.0, 0.0), (2, 2), 0.0),
            Err(ConstructionError::InvalidPitch(0.0))
        );
        assert!(Grid::new(Point::new(0.0, 0.0), (0, 2), 1.0).is_err());
    }

    #[test]
    fn test_insert_bounds_and_occupancy() {
        let mut grid = Grid::new(Point::new(0.0, 0.0), (2, 2), 1.0).unwrap();
        grid.insert(GridPos::new(1, 1), square(1)).unwrap();
        assert!(matches!(
            grid.insert(GridPos::new(2, 0), square(2)),
            Err(ConstructionError::CellOutOfBounds { col: 2, row: 0, .. })
        ));
        assert_eq!(
            grid.insert(GridPos::new(1, 1), square(3)),
            Err(ConstructionError::CellOccupied { col: 1, row: 1 })
        );
        assert_eq!(grid.electrode_count(), 1);
    }

    #[test]
    fn test_row_major_iteration() {
        let mut grid = Grid::new(Point::new(0.0, 0.0), (3, 3), 1.0).unwrap();
        grid.insert(GridPos::new(0, 2), square(1)).unwrap();
        grid.insert(GridPos::new(2, 0), square(2)).unwrap();
        grid.insert(GridPos::new(1, 0), square(3)).unwrap();
        let order: Vec<GridPos> = grid.electrodes().map(|(p, _)| p).collect();
        assert_eq!(
            order,
            vec![GridPos::new(1, 0), GridPos::new(2, 0), GridPos::new(0, 2)]
        );
    }

    #[test]
    fn test_adjacent_pairs() {
        let mut grid = Grid::new(Point::new(0.0, 0.0), (2, 2), 1.0).unwrap();
        grid.insert(GridPos::new(0, 0), square(1)).unwrap();
        grid.insert(GridPos::new(0, 1), square(2)).unwrap();
        grid.insert(GridPos::new(1, 1), square(3)).unwrap();
        assert_eq!(
            grid.adjacent_pairs(),
            vec![
                (GridPos::new(0, 0), GridPos::new(0, 1)),
                (GridPos::new(0, 1), GridPos::new(1, 1)),
            ]
        );
    }

    #[test]
    fn test_cell_placement() {
        let grid = Grid::new(Point::new(10.0, 5.0), (4, 4), 2.5).unwrap();
        let placement = grid.cell_placement(GridPos::new(2, 3));
        assert!((placement.origin.x - 15.0).abs() < 1e-12);
        assert!((placement.origin.y - 12.5).abs() < 1e-12);
        assert_eq!(placement.rotation, 0.0);
    }
}
