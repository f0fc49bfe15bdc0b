use std::path::{Path, PathBuf};

use dmfboard_core::{
    find_interfaces, BoardDesign, Constructor, CrenellationParams, Grid, GridPos, Interface,
    Placement, Point,
};
use serde::{Deserialize, Serialize};

use crate::error::{read_file, IoError, Result};
use crate::template::resolve_template;

const REFERENCE_PITCH: f64 = 2.5;
const REFERENCE_GRID_WIDTH: u32 = 21;
const REFERENCE_GRID_HEIGHT: u32 = 18;
const GLASS_WIDTH: f64 = 75.0;
const GLASS_HEIGHT: f64 = 50.0;
const RESERVOIR_HEIGHT: f64 = 12.5;
/// Amount of reservoir overhanging the glass plate edge.
const RESERVOIR_OVERHANG: f64 = 1.0;
const RESERVOIR_COLUMNS: [u32; 3] = [5, 10, 15];
const RESERVOIR_ROW: u32 = 11;

const REFERENCE_FLOORPLAN: &str = " X  X  X  X  X  X  X
 X  X  X  X  X  X  X
 XXXXXXXXXXXXXXXXXXX
 X  X  X  X  X  X  X
 X  X  X  X  X  X  X
          X
          X
 X  X  X  X  X  X  X
 X  X  X  X  X  X  X
XXXXXXXXXXXXXXXXXXXXX
X    X    X    X    X
X    X    X    X    X
X                   X
X                   X
X                   X
X                   X
X                   X
X                   X
";

/// A complete board description, loaded from JSON. Missing fields take the
/// values of the reference 21x18 board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub name: String,
    pub grid: GridConfig,
    pub crenellation: CrenellationConfig,
    /// Copper-to-copper clearance applied at fabrication.
    pub clearance: f64,
    /// Offset of the board frame within the PCB.
    pub board_origin: Point,
    pub peripherals: Vec<PeripheralConfig>,
    /// Discover grid/peripheral interfaces from geometry instead of listing
    /// them per peripheral.
    pub auto_interfaces: bool,
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub origin: Point,
    pub width: u32,
    pub height: u32,
    pub pitch: f64,
    pub floorplan: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrenellationConfig {
    pub num_digits: u32,
    pub theta_deg: f64,
    /// Straight margin at each corner, as a fraction of the grid pitch.
    pub margin_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeripheralConfig {
    /// Built-in template name or a path relative to the config file.
    pub template: String,
    pub origin: Point,
    #[serde(default)]
    pub rotation_deg: f64,
    #[serde(default)]
    pub interface: Option<InterfaceConfig>,
}

/// The grid cell whose boundary with a peripheral electrode is crenellated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    #[serde(default)]
    pub grid: usize,
    pub col: u32,
    pub row: u32,
    pub electrode: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        let width = REFERENCE_GRID_WIDTH;
        Self {
            origin: Point::new(
                GLASS_WIDTH / 2.0 - width as f64 * REFERENCE_PITCH / 2.0,
                GLASS_HEIGHT - RESERVOIR_HEIGHT - (RESERVOIR_ROW + 1) as f64 * REFERENCE_PITCH
                    + RESERVOIR_OVERHANG,
            ),
            width,
            height: REFERENCE_GRID_HEIGHT,
            pitch: REFERENCE_PITCH,
            floorplan: REFERENCE_FLOORPLAN.to_string(),
        }
    }
}

impl Default for CrenellationConfig {
    fn default() -> Self {
        Self {
            num_digits: 5,
            theta_deg: 30.0,
            margin_fraction: 0.15,
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        let grid = GridConfig::default();
        // Each reservoir starts at the far edge of its interface row, centred on the column.
        let peripherals = RESERVOIR_COLUMNS
            .iter()
            .map(|&col| PeripheralConfig {
                template: "four_tier_reservoir".to_string(),
                origin: Point::new(
                    grid.origin.x + (col as f64 + 0.5) * grid.pitch,
                    grid.origin.y + (RESERVOIR_ROW + 1) as f64 * grid.pitch,
                ),
                rotation_deg: 0.0,
                interface: Some(InterfaceConfig {
                    grid: 0,
                    col,
                    row: RESERVOIR_ROW,
                    electrode: "A".to_string(),
                }),
            })
            .collect();
        Self {
            name: "electrode_board".to_string(),
            grid,
            crenellation: CrenellationConfig::default(),
            clearance: 0.11,
            board_origin: Point::new(162.5, 62.25),
            peripherals,
            auto_interfaces: false,
            base_dir: None,
        }
    }
}

/// The uncrenellated board built from a config, with the interfaces to
/// crenellate.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltBoard {
    pub board: BoardDesign,
    pub interfaces: Vec<Interface>,
}

impl BoardConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: BoardConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. Template paths resolve against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_json(&read_file(path)?)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        log::info!("loaded board config '{}' from {}", config.name, path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        crate::compact::to_compact_json(self).map_err(IoError::from)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.clearance.is_finite() && self.clearance >= 0.0) {
            return Err(IoError::Config(format!(
                "clearance must be a non-negative length, got {}",
                self.clearance
            )));
        }
        if !(0.0..0.5).contains(&self.crenellation.margin_fraction) {
            return Err(IoError::Config(format!(
                "margin_fraction must lie in [0, 0.5), got {}",
                self.crenellation.margin_fraction
            )));
        }
        Ok(())
    }

    pub fn margin(&self) -> f64 {
        self.crenellation.margin_fraction * self.grid.pitch
    }

    pub fn crenellation_params(&self) -> Result<CrenellationParams> {
        Ok(CrenellationParams::new(
            self.crenellation.num_digits,
            self.crenellation.theta_deg,
            self.margin(),
        )?)
    }

    /// Build the logical board: fill the grid, then place peripherals in
    /// config order so refdes follow the same order.
    pub fn build(&self) -> Result<BuiltBoard> {
        let mut board = BoardDesign::new();
        let mut construct = Constructor::new();

        let mut grid = Grid::new(
            self.grid.origin,
            (self.grid.width, self.grid.height),
            self.grid.pitch,
        )?;
        construct.fill_ascii(&mut grid, &self.grid.floorplan)?;
        board.add_grid(grid);

        let mut interfaces = Vec::new();
        for entry in &self.peripherals {
            let template = resolve_template(&entry.template, self.base_dir.as_deref())?;
            let placement = Placement::new(entry.origin, entry.rotation_deg.to_radians());
            let index = construct.add_peripheral(&mut board, &template, placement)?;
            if let Some(iface) = &entry.interface {
                interfaces.push(Interface {
                    grid: iface.grid,
                    pos: GridPos::new(iface.col, iface.row),
                    peripheral: index,
                    electrode: iface.electrode.clone(),
                });
            }
        }

        if self.auto_interfaces {
            interfaces = find_interfaces(&board);
            log::info!("discovered {} grid/peripheral interfaces", interfaces.len());
        }
        log::info!(
            "built board '{}' with {} electrodes",
            self.name,
            board.electrode_count()
        );
        Ok(BuiltBoard { board, interfaces })
    }
}
