use crate::crenellation::{crenellate_electrodes, CrenellationOutcome, CrenellationParams};
use crate::electrode::{Electrode, Placement, Refdes};
use crate::error::CrenellationError;
use crate::geometry::Polygon;
use crate::grid::{Grid, GridPos};
use crate::peripheral::Peripheral;

/// A complete electrode board: grids plus placed peripherals.
///
/// Insertion order of both collections is meaningful and preserved; later
/// stages correlate peripherals with physical interface edges by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardDesign {
    pub grids: Vec<Grid>,
    pub peripherals: Vec<Peripheral>,
}

impl BoardDesign {
    pub fn new() -> Self {
        Self::default()
    }

    /// Independent deep copy. Mutating the snapshot never touches `self`.
    pub fn snapshot(&self) -> BoardDesign {
        self.clone()
    }

    pub fn add_grid(&mut self, grid: Grid) -> usize {
        self.grids.push(grid);
        self.grids.len() - 1
    }

    /// One more than the largest instance id on the board.
    pub fn next_peripheral_id(&self) -> u32 {
        self.peripherals
            .iter()
            .map(|p| p.id + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn peripheral_by_id(&self, id: u32) -> Option<&Peripheral> {
        self.peripherals.iter().find(|p| p.id == id)
    }

    pub fn electrode_count(&self) -> usize {
        self.grids.iter().map(Grid::electrode_count).sum::<usize>()
            + self
                .peripherals
                .iter()
                .map(Peripheral::electrode_count)
                .sum::<usize>()
    }

    /// Crenellate the boundary between a grid cell and a peripheral electrode.
    pub fn crenellate_grid_peripheral(
        &mut self,
        grid_index: usize,
        pos: GridPos,
        peripheral_index: usize,
        electrode_id: &str,
        params: &CrenellationParams,
    ) -> Result<CrenellationOutcome, CrenellationError> {
        let grid = self
            .grids
            .get_mut(grid_index)
            .ok_or_else(|| CrenellationError::MissingElectrode(format!("grid {grid_index}")))?;
        let grid_placement = grid.cell_placement(pos);
        let cell = grid.electrode_mut(pos).ok_or_else(|| {
            CrenellationError::MissingElectrode(format!("grid {grid_index} cell {pos}"))
        })?;

        let peripheral = self.peripherals.get_mut(peripheral_index).ok_or_else(|| {
            CrenellationError::MissingElectrode(format!("peripheral {peripheral_index}"))
        })?;
        let peripheral_placement = peripheral.placement;
        let target = peripheral.electrode_mut(electrode_id).ok_or_else(|| {
            CrenellationError::MissingElectrode(format!(
                "peripheral {peripheral_index} electrode '{electrode_id}'"
            ))
        })?;

        crenellate_electrodes(cell, &grid_placement, target, &peripheral_placement, params)
    }
}

/// Which part of the board an electrode belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElectrodeOwner {
    Grid { grid: usize, pos: GridPos },
    Peripheral { peripheral: usize, id: String },
}

/// An electrode flattened out of a board, with its board-frame polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardElectrode {
    pub owner: ElectrodeOwner,
    pub placement: Placement,
    pub electrode: Electrode,
    /// Polygon in board coordinates.
    pub points: Polygon,
}

impl BoardElectrode {
    pub fn refdes(&self) -> Refdes {
        self.electrode.refdes
    }
}

/// Flatten a board into grids (insertion order, cells row-major) followed
/// by peripherals (insertion order, template electrode order).
pub fn reduce_board_to_electrodes(board: &BoardDesign) -> Vec<BoardElectrode> {
    let mut out = Vec::with_capacity(board.electrode_count());
    for (grid_index, grid) in board.grids.iter().enumerate() {
        for (pos, electrode) in grid.electrodes() {
            let placement = grid.cell_placement(pos);
            out.push(BoardElectrode {
                owner: ElectrodeOwner::Grid {
                    grid: grid_index,
                    pos,
                },
                placement,
                points: electrode.global_polygon(&placement),
                electrode: electrode.clone(),
            });
        }
    }
    for (peripheral_index, peripheral) in board.peripherals.iter().enumerate() {
        for pe in peripheral.electrodes() {
            out.push(BoardElectrode {
                owner: ElectrodeOwner::Peripheral {
                    peripheral: peripheral_index,
                    id: pe.id.clone(),
                },
                placement: peripheral.placement,
                points: pe.electrode.global_polygon(&peripheral.placement),
                electrode: pe.electrode.clone(),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construct::Constructor;
    use crate::geometry::Point;
    use crate::peripheral::{PeripheralTemplate, TemplateElectrode};
    use std::f64::consts::FRAC_PI_2;

    fn template() -> PeripheralTemplate {
        PeripheralTemplate {
            class: "reservoir".into(),
            kind: "single".into(),
            electrodes: vec![
                TemplateElectrode {
                    id: "A".into(),
                    origin: Point::new(0.0, 0.0),
                    polygon: Polygon::rect(-0.5, 0.0, 0.5, 1.0),
                },
                TemplateElectrode {
                    id: "B".into(),
                    origin: Point::new(0.0, 1.0),
                    polygon: Polygon::rect(-1.0, 0.0, 1.0, 2.0),
                },
            ],
        }
    }

    fn sample_board() -> BoardDesign {
        let mut board = BoardDesign::new();
        let mut grid = Grid::new(Point::new(2.0, 3.0), (3, 2), 1.0).unwrap();
        let mut construct = Constructor::new();
        construct.fill_ascii(&mut grid, "XX \n XX\n").unwrap();
        board.add_grid(grid);
        construct
            .add_peripheral(
                &mut board,
                &template(),
                Placement::new(Point::new(3.5, 5.0), FRAC_PI_2),
            )
            .unwrap();
        board
    }

    #[test]
    fn test_reduce_order_and_owners() {
        let board = sample_board();
        let flat = reduce_board_to_electrodes(&board);
        assert_eq!(flat.len(), 6);
        let refdes: Vec<u32> = flat.iter().map(|e| e.refdes().0).collect();
        assert_eq!(refdes, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(
            flat[2].owner,
            ElectrodeOwner::Grid {
                grid: 0,
                pos: GridPos::new(1, 1)
            }
        );
        assert_eq!(
            flat[5].owner,
            ElectrodeOwner::Peripheral {
                peripheral: 0,
                id: "B".into()
            }
        );
    }

    #[test]
    fn test_reduce_grid_points_are_translated() {
        let board = sample_board();
        let flat = reduce_board_to_electrodes(&board);
        let grid = &board.grids[0];
        for item in flat.iter().take(4) {
            let ElectrodeOwner::Grid { pos, .. } = item.owner else {
                panic!("expected grid electrode");
            };
            let dx = grid.origin.x + pos.col as f64 * grid.pitch();
            let dy = grid.origin.y + pos.row as f64 * grid.pitch();
            for (g, l) in item.points.points.iter().zip(&item.electrode.polygon.points) {
                assert!((g.x - (l.x + dx)).abs() < 1e-12);
                assert!((g.y - (l.y + dy)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_reduce_peripheral_points_are_rotated_then_translated() {
        let board = sample_board();
        let flat = reduce_board_to_electrodes(&board);
        let peripheral = &board.peripherals[0];
        let b = &flat[5];
        for (g, l) in b.points.points.iter().zip(&b.electrode.polygon.points) {
            let local = *l + b.electrode.origin;
            let expected = local.rotate(peripheral.placement.rotation) + peripheral.placement.origin;
            assert!(g.distance_to(&expected) < 1e-12);
        }
        // (-1, 0) + (0, 1) rotated by 90° lands at (-1, -1) from the origin
        assert!((b.points.points[0].x - 2.5).abs() < 1e-12);
        assert!((b.points.points[0].y - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_reduce_does_not_mutate() {
        let board = sample_board();
        let before = board.clone();
        let _ = reduce_board_to_electrodes(&board);
        assert_eq!(board, before);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let board = sample_board();
        let mut copy = board.snapshot();
        let params = CrenellationParams::new(3, 30.0, 0.15).unwrap();
        crate::crenellation::crenellate_grid(&mut copy.grids[0], &params).unwrap();
        assert_ne!(copy.grids[0], board.grids[0]);

        let pristine = sample_board();
        assert_eq!(board, pristine);
    }

    #[test]
    fn test_next_peripheral_id() {
        let mut board = sample_board();
        assert_eq!(board.next_peripheral_id(), 1);
        board.peripherals[0].id = 7;
        assert_eq!(board.next_peripheral_id(), 8);
        assert!(board.peripheral_by_id(7).is_some());
    }
}
