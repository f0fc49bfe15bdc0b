use std::io::Write;

use dmfboard_core::geometry::clearance_outline;
use dmfboard_core::{reduce_board_to_electrodes, BoardDesign, Point, Polygon};
use serde::Serialize;

use crate::compact::to_compact_json;
use crate::error::{IoError, Result};

/// Writes the copper of a finished board for the PCB tool.
pub trait FootprintWriter {
    /// Write every electrode of `board`, inset by half of `clearance` and
    /// shifted by `board_origin`. Returns the number of footprints written.
    fn write_board(&mut self, board: &BoardDesign, board_origin: Point, clearance: f64)
        -> Result<usize>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Footprint {
    pub refdes: String,
    pub outline: Polygon,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FabricationDocument {
    pub board_origin: Point,
    pub clearance: f64,
    pub footprints: Vec<Footprint>,
}

/// Build the footprint list without writing it anywhere.
pub fn fabrication_document(
    board: &BoardDesign,
    board_origin: Point,
    clearance: f64,
) -> Result<FabricationDocument> {
    let footprints = reduce_board_to_electrodes(board)
        .into_iter()
        .map(|e| {
            let refdes = e.refdes();
            let outline = clearance_outline(&e.points, clearance)
                .and_then(|outline| outline.validate().map(|()| outline))
                .map_err(|source| IoError::Fabrication { refdes, source })?;
            Ok(Footprint {
                refdes: refdes.to_string(),
                outline: outline.translate(board_origin.x, board_origin.y),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(FabricationDocument {
        board_origin,
        clearance,
        footprints,
    })
}

/// Footprint writer producing one compact JSON document.
pub struct JsonFootprintWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonFootprintWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FootprintWriter for JsonFootprintWriter<W> {
    fn write_board(
        &mut self,
        board: &BoardDesign,
        board_origin: Point,
        clearance: f64,
    ) -> Result<usize> {
        let doc = fabrication_document(board, board_origin, clearance)?;
        self.writer.write_all(to_compact_json(&doc)?.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        log::info!("wrote {} footprints", doc.footprints.len());
        Ok(doc.footprints.len())
    }
}
