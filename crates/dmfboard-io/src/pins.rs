use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use dmfboard_core::{BoardElectrode, Refdes};
use regex::Regex;
use thiserror::Error;

use crate::error::{read_file, Result};

/// Anything that can report the net connected to each electrode, keyed by
/// refdes text (`"E12"`). The PCB tool's netlist sits behind this trait.
pub trait NetSource {
    fn electrode_nets(&self) -> Result<BTreeMap<String, String>>;
}

impl NetSource for BTreeMap<String, String> {
    fn electrode_nets(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.clone())
    }
}

/// A JSON object file mapping refdes to net name.
#[derive(Debug, Clone)]
pub struct JsonNetTable {
    path: PathBuf,
}

impl JsonNetTable {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl NetSource for JsonNetTable {
    fn electrode_nets(&self) -> Result<BTreeMap<String, String>> {
        Ok(serde_json::from_str(&read_file(&self.path)?)?)
    }
}

/// A net table entry that could not be turned into a pin.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PinError {
    #[error("Failed to match pin number from net '{net}' of {refdes}")]
    NoPinNumber { refdes: String, net: String },

    #[error("'{0}' is not an electrode refdes")]
    InvalidRefdes(String),
}

static PIN_NET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/P(\d+)").expect("pin net regex"));

/// Pin number from a net name: the digits right after a leading `/P`.
pub fn parse_pin(net: &str) -> Option<u32> {
    PIN_NET.captures(net)?.get(1)?.as_str().parse().ok()
}

/// Electrode refdes to control pin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinTable {
    pins: BTreeMap<Refdes, u32>,
}

impl PinTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a refdes → net map. Entries that fail to parse are
    /// returned alongside the table instead of aborting it.
    pub fn from_nets(nets: &BTreeMap<String, String>) -> (PinTable, Vec<PinError>) {
        let mut table = PinTable::new();
        let mut errors = Vec::new();
        for (name, net) in nets {
            let Ok(refdes) = name.parse::<Refdes>() else {
                errors.push(PinError::InvalidRefdes(name.clone()));
                continue;
            };
            match parse_pin(net) {
                Some(pin) => table.insert(refdes, pin),
                None => {
                    log::warn!("Failed to match pin number from net '{net}'");
                    errors.push(PinError::NoPinNumber {
                        refdes: name.clone(),
                        net: net.clone(),
                    });
                }
            }
        }
        (table, errors)
    }

    /// Refdes `E{n}` on pin `n - 1`, for boards without a netlist yet.
    pub fn sequential(electrodes: &[BoardElectrode]) -> PinTable {
        let mut table = PinTable::new();
        for e in electrodes {
            let refdes = e.refdes();
            table.insert(refdes, refdes.0.saturating_sub(1));
        }
        table
    }

    pub fn insert(&mut self, refdes: Refdes, pin: u32) {
        self.pins.insert(refdes, pin);
    }

    pub fn pin(&self, refdes: Refdes) -> Option<u32> {
        self.pins.get(&refdes).copied()
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}
