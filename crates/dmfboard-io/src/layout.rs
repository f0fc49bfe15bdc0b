use std::fmt;

use dmfboard_core::{
    BoardDesign, BoardElectrode, ElectrodeOwner, Grid, Peripheral, Point, Polygon, Refdes,
};
use serde::Serialize;

use crate::pins::PinTable;

/// Pin matrix indexed `[row][col]`; `None` for empty cells.
pub type PinMatrix = Vec<Vec<Option<u32>>>;

/// Root of `electrode_board_layout.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutDocument {
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub grids: Vec<GridLayout>,
    pub peripherals: Vec<PeripheralLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridLayout {
    pub origin: Point,
    pub pitch: f64,
    pub pins: PinMatrix,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeripheralLayout {
    pub class: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: u32,
    pub origin: Point,
    /// Degrees.
    pub rotation: f64,
    pub electrodes: Vec<PeripheralElectrodeLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeripheralElectrodeLayout {
    pub id: String,
    pub pin: Option<u32>,
    pub polygon: Polygon,
    pub origin: Point,
}

/// An electrode written without a pin because the table has none for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutIssue {
    pub refdes: Refdes,
    pub location: String,
}

impl fmt::Display for LayoutIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no pin for {} at {}", self.refdes, self.location)
    }
}

fn grid_layout(
    index: usize,
    grid: &Grid,
    pins: &PinTable,
    issues: &mut Vec<LayoutIssue>,
) -> GridLayout {
    let mut matrix = vec![vec![None; grid.width() as usize]; grid.height() as usize];
    for (pos, electrode) in grid.electrodes() {
        let pin = pins.pin(electrode.refdes);
        if pin.is_none() {
            issues.push(LayoutIssue {
                refdes: electrode.refdes,
                location: format!("grid {index} cell {pos}"),
            });
        }
        matrix[pos.row as usize][pos.col as usize] = pin;
    }
    GridLayout {
        origin: grid.origin,
        pitch: grid.pitch(),
        pins: matrix,
    }
}

fn peripheral_layout(
    peripheral: &Peripheral,
    pins: &PinTable,
    issues: &mut Vec<LayoutIssue>,
) -> PeripheralLayout {
    let electrodes = peripheral
        .electrodes()
        .iter()
        .map(|pe| {
            let pin = pins.pin(pe.electrode.refdes);
            if pin.is_none() {
                issues.push(LayoutIssue {
                    refdes: pe.electrode.refdes,
                    location: format!(
                        "{}/{} #{} electrode {}",
                        peripheral.class, peripheral.kind, peripheral.id, pe.id
                    ),
                });
            }
            PeripheralElectrodeLayout {
                id: pe.id.clone(),
                pin,
                polygon: pe.electrode.polygon.clone(),
                origin: pe.electrode.origin,
            }
        })
        .collect();
    PeripheralLayout {
        class: peripheral.class.clone(),
        kind: peripheral.kind.clone(),
        id: peripheral.id,
        origin: peripheral.global_origin(),
        rotation: peripheral.placement.rotation_deg(),
        electrodes,
    }
}

/// Describe `board` for the instrument: grid pin matrices and peripherals
/// with their local polygons. Pass the uncrenellated board.
pub fn build_layout(board: &BoardDesign, pins: &PinTable) -> (LayoutDocument, Vec<LayoutIssue>) {
    let mut issues = Vec::new();
    let grids = board
        .grids
        .iter()
        .enumerate()
        .map(|(i, g)| grid_layout(i, g, pins, &mut issues))
        .collect();
    let peripherals = board
        .peripherals
        .iter()
        .map(|p| peripheral_layout(p, pins, &mut issues))
        .collect();
    for issue in &issues {
        log::warn!("{issue}");
    }
    (
        LayoutDocument {
            layout: Layout { grids, peripherals },
        },
        issues,
    )
}

/// Rebuild a grid's pin matrix from a flattened electrode list.
pub fn grid_pins_from_electrodes(
    grid_index: usize,
    width: u32,
    height: u32,
    electrodes: &[BoardElectrode],
    pins: &PinTable,
) -> PinMatrix {
    let mut matrix = vec![vec![None; width as usize]; height as usize];
    for e in electrodes {
        if let ElectrodeOwner::Grid { grid, pos } = e.owner {
            if grid == grid_index && pos.col < width && pos.row < height {
                matrix[pos.row as usize][pos.col as usize] = pins.pin(e.refdes());
            }
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compact::to_compact_json;
    use crate::project::BoardConfig;
    use dmfboard_core::{reduce_board_to_electrodes, GridPos};

    #[test]
    fn test_pin_matrix_matches_flattened_board() {
        let built = BoardConfig::default().build().unwrap();
        let flat = reduce_board_to_electrodes(&built.board);
        let pins = PinTable::sequential(&flat);
        let (doc, issues) = build_layout(&built.board, &pins);
        assert!(issues.is_empty());

        let grid = &built.board.grids[0];
        let matrix = &doc.layout.grids[0].pins;
        assert_eq!(matrix.len(), 18);
        assert!(matrix.iter().all(|row| row.len() == 21));
        assert_eq!(
            *matrix,
            grid_pins_from_electrodes(0, grid.width(), grid.height(), &flat, &pins)
        );

        for (row, cells) in matrix.iter().enumerate() {
            for (col, pin) in cells.iter().enumerate() {
                let cell = grid.electrode(GridPos::new(col as u32, row as u32));
                assert_eq!(pin.is_some(), cell.is_some());
                if let (Some(pin), Some(e)) = (pin, cell) {
                    assert_eq!(*pin, e.refdes.0 - 1);
                }
            }
        }
    }

    #[test]
    fn test_peripheral_entries() {
        let built = BoardConfig::default().build().unwrap();
        let pins = PinTable::sequential(&reduce_board_to_electrodes(&built.board));
        let (doc, _) = build_layout(&built.board, &pins);
        let reservoirs = &doc.layout.peripherals;
        assert_eq!(reservoirs.len(), 3);
        let ids: Vec<u32> = reservoirs.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        let first = &reservoirs[0];
        assert_eq!(first.kind, "four_tier");
        assert!((first.origin.x - 25.0).abs() < 1e-12);
        assert_eq!(first.rotation, 0.0);
        assert_eq!(first.electrodes[0].pin, Some(106));
        assert_eq!(first.electrodes[3].polygon, Polygon::rect(-4.5, 0.0, 4.5, 4.0));
    }

    #[test]
    fn test_missing_pins_reported() {
        let built = BoardConfig::default().build().unwrap();
        let mut pins = PinTable::new();
        pins.insert(Refdes(1), 0);
        let (doc, issues) = build_layout(&built.board, &pins);
        assert_eq!(issues.len(), 117);
        assert_eq!(issues[0].refdes, Refdes(2));
        assert_eq!(doc.layout.grids[0].pins[0][1], Some(0));
        assert_eq!(doc.layout.grids[0].pins[0][4], None);
        assert_eq!(doc.layout.peripherals[2].electrodes[3].pin, None);
    }

    #[test]
    fn test_layout_json_shape() {
        let built = BoardConfig::default().build().unwrap();
        let pins = PinTable::sequential(&reduce_board_to_electrodes(&built.board));
        let (doc, _) = build_layout(&built.board, &pins);
        let text = to_compact_json(&doc).unwrap();
        assert!(text.starts_with("{\n \"layout\": {\n  \"grids\": [\n"));
        assert!(text.contains("\"origin\": [11.25, 8.5]"));
        assert!(text.contains("\"type\": \"four_tier\""));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value["layout"]["grids"][0]["pins"][0][0].is_null());
        assert_eq!(value["layout"]["grids"][0]["pins"][0][1], 0);
    }
}
