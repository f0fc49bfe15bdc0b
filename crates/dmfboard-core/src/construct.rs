use crate::board::BoardDesign;
use crate::electrode::{Electrode, Placement, Refdes};
use crate::error::ConstructionError;
use crate::geometry::{Point, Polygon};
use crate::grid::{Grid, GridPos};
use crate::peripheral::{Peripheral, PeripheralElectrode, PeripheralTemplate};

/// Default floor-plan character marking an occupied cell.
pub const FILL_CHAR: char = 'X';

/// Builds electrode geometry and hands out reference designators.
///
/// A single `Constructor` should build a whole board so that refdes stay
/// unique across grids and peripherals.
#[derive(Debug, Clone)]
pub struct Constructor {
    next_refdes: u32,
    fill: char,
}

impl Default for Constructor {
    fn default() -> Self {
        Self {
            next_refdes: 1,
            fill: FILL_CHAR,
        }
    }
}

impl Constructor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fill_char(mut self, fill: char) -> Self {
        self.fill = fill;
        self
    }

    /// The refdes the next electrode will receive.
    pub fn next_refdes(&self) -> Refdes {
        Refdes(self.next_refdes)
    }

    fn take_refdes(&mut self) -> Refdes {
        let refdes = Refdes(self.next_refdes);
        self.next_refdes += 1;
        refdes
    }

    /// Fill `grid` from an ASCII floor-plan, one character per column and
    /// one line per row. Returns the number of electrodes created.
    ///
    /// Trailing whitespace and blank trailing lines are ignored; any other
    /// overflow, or a character that is neither the fill character nor a
    /// space, is an error and leaves the grid unchanged.
    pub fn fill_ascii(&mut self, grid: &mut Grid, text: &str) -> Result<usize, ConstructionError> {
        let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
        let rows = lines
            .iter()
            .rposition(|line| !line.is_empty())
            .map_or(0, |last| last + 1);
        if rows > grid.height() as usize {
            return Err(ConstructionError::FloorplanTooTall {
                rows,
                height: grid.height(),
            });
        }

        let mut cells = Vec::new();
        for (row, line) in lines.iter().take(rows).enumerate() {
            let columns = line.chars().count();
            if columns > grid.width() as usize {
                return Err(ConstructionError::FloorplanTooWide {
                    row,
                    columns,
                    width: grid.width(),
                });
            }
            for (col, ch) in line.chars().enumerate() {
                let pos = GridPos::new(col as u32, row as u32);
                if ch == self.fill {
                    if grid.is_occupied(pos) {
                        return Err(ConstructionError::CellOccupied {
                            col: pos.col,
                            row: pos.row,
                        });
                    }
                    cells.push(pos);
                } else if ch != ' ' {
                    return Err(ConstructionError::InvalidCharacter { row, col, ch });
                }
            }
        }

        let pitch = grid.pitch();
        for pos in &cells {
            let electrode = Electrode::new(
                self.take_refdes(),
                Point::new(0.0, 0.0),
                Polygon::rect(0.0, 0.0, pitch, pitch),
            );
            grid.insert(*pos, electrode)?;
        }
        log::debug!(
            "filled {} of {}x{} cells from floor-plan",
            cells.len(),
            grid.width(),
            grid.height()
        );
        Ok(cells.len())
    }

    /// Place a copy of `template` on the board. Returns the index of the new
    /// peripheral in `board.peripherals`.
    pub fn add_peripheral(
        &mut self,
        board: &mut BoardDesign,
        template: &PeripheralTemplate,
        placement: Placement,
    ) -> Result<usize, ConstructionError> {
        template.validate()?;
        let electrodes = template
            .electrodes
            .iter()
            .map(|e| PeripheralElectrode {
                id: e.id.clone(),
                electrode: Electrode::new(self.take_refdes(), e.origin, e.polygon.clone()),
            })
            .collect();
        let id = board.next_peripheral_id();
        log::info!(
            "placed {} #{} at ({:.3}, {:.3}) rotated {:.1} deg",
            template.name(),
            id,
            placement.origin.x,
            placement.origin.y,
            placement.rotation_deg()
        );
        board.peripherals.push(Peripheral::new(
            &template.class,
            &template.kind,
            id,
            placement,
            electrodes,
        ));
        Ok(board.peripherals.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripheral::TemplateElectrode;

    fn grid(w: u32, h: u32, pitch: f64) -> Grid {
        Grid::new(Point::new(0.0, 0.0), (w, h), pitch).unwrap()
    }

    #[test]
    fn test_fill_ascii_positions() {
        let mut g = grid(2, 2, 2.5);
        let mut construct = Constructor::new();
        let count = construct.fill_ascii(&mut g, "X \nXX\n").unwrap();
        assert_eq!(count, 3);
        assert!(g.is_occupied(GridPos::new(0, 0)));
        assert!(!g.is_occupied(GridPos::new(1, 0)));
        assert!(g.is_occupied(GridPos::new(0, 1)));
        assert!(g.is_occupied(GridPos::new(1, 1)));

        let refdes: Vec<u32> = g.electrodes().map(|(_, e)| e.refdes.0).collect();
        assert_eq!(refdes, vec![1, 2, 3]);

        let e = g.electrode(GridPos::new(1, 1)).unwrap();
        assert_eq!(e.polygon, Polygon::rect(0.0, 0.0, 2.5, 2.5));
        assert!(e.polygon.is_ccw());
    }

    #[test]
    fn test_fill_ascii_short_rows_and_trailing_space() {
        let mut g = grid(4, 3, 1.0);
        let mut construct = Constructor::new();
        assert_eq!(construct.fill_ascii(&mut g, " X   \nX\n\n\n").unwrap(), 2);
        assert!(g.is_occupied(GridPos::new(1, 0)));
        assert!(g.is_occupied(GridPos::new(0, 1)));
    }

    #[test]
    fn test_fill_ascii_too_wide() {
        let mut g = grid(2, 2, 1.0);
        let err = Constructor::new().fill_ascii(&mut g, "XX\nXXX\n").unwrap_err();
        assert_eq!(
            err,
            ConstructionError::FloorplanTooWide {
                row: 1,
                columns: 3,
                width: 2
            }
        );
        assert_eq!(g.electrode_count(), 0);
    }

    #[test]
    fn test_fill_ascii_too_tall() {
        let mut g = grid(2, 1, 1.0);
        let err = Constructor::new().fill_ascii(&mut g, "X\nX\n").unwrap_err();
        assert_eq!(err, ConstructionError::FloorplanTooTall { rows: 2, height: 1 });
    }

    #[test]
    fn test_fill_ascii_invalid_character() {
        let mut g = grid(3, 3, 1.0);
        let err = Constructor::new().fill_ascii(&mut g, "X.X\n").unwrap_err();
        assert_eq!(
            err,
            ConstructionError::InvalidCharacter {
                row: 0,
                col: 1,
                ch: '.'
            }
        );
        assert_eq!(g.electrode_count(), 0);
    }

    #[test]
    fn test_custom_fill_char() {
        let mut g = grid(2, 1, 1.0);
        let mut construct = Constructor::new().with_fill_char('#');
        assert_eq!(construct.fill_ascii(&mut g, "# ").unwrap(), 1);
        assert!(construct.fill_ascii(&mut g, " X").is_err());
    }

    #[test]
    fn test_add_peripheral_assigns_ids_and_refdes() {
        let template = PeripheralTemplate {
            class: "reservoir".into(),
            kind: "single".into(),
            electrodes: vec![TemplateElectrode {
                id: "A".into(),
                origin: Point::new(0.0, 0.0),
                polygon: Polygon::rect(0.0, 0.0, 1.0, 1.0),
            }],
        };
        let mut board = BoardDesign::new();
        let mut g = grid(2, 1, 1.0);
        let mut construct = Constructor::new();
        construct.fill_ascii(&mut g, "XX").unwrap();
        board.add_grid(g);

        let first = construct
            .add_peripheral(&mut board, &template, Placement::translate(0.0, 1.0))
            .unwrap();
        let second = construct
            .add_peripheral(&mut board, &template, Placement::translate(1.0, 1.0))
            .unwrap();
        assert_eq!((first, second), (0, 1));
        assert_eq!(board.peripherals[0].id, 0);
        assert_eq!(board.peripherals[1].id, 1);
        assert_eq!(board.peripherals[0].electrode("A").unwrap().refdes, Refdes(3));
        assert_eq!(board.peripherals[1].electrode("A").unwrap().refdes, Refdes(4));
        assert_eq!(construct.next_refdes(), Refdes(5));
    }
}
