use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use dmfboard_core::{
    crenellate_grid, reduce_board_to_electrodes, BoardDesign, CrenellationOutcome,
    CrenellationParams, CrenellationSummary, Interface,
};
use dmfboard_drc::{DrcChecker, DrcReport, Severity};
use dmfboard_io::{
    build_layout, to_compact_json, BoardConfig, FootprintWriter, JsonFootprintWriter,
    JsonNetTable, LayoutIssue, NetSource, PinError, PinTable,
};

pub const FABRICATION_FILE: &str = "fabrication.json";
pub const LAYOUT_FILE: &str = "electrode_board_layout.json";

/// Settings that come from the command line rather than the board config.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub output_dir: PathBuf,
    /// JSON net table; sequential pins are assigned when absent.
    pub nets: Option<PathBuf>,
    /// Downgrade clearance violations to warnings.
    pub allow_spacing: bool,
}

impl PipelineOptions {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            nets: None,
            allow_spacing: false,
        }
    }
}

/// What a pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub electrode_count: usize,
    /// Crenellated edge kinds whose fingers do not survive the clearance inset.
    pub thin_finger_edges: usize,
    pub grid_edges: CrenellationSummary,
    pub interfaces: Vec<CrenellationOutcome>,
    pub drc: DrcReport,
    pub pin_errors: Vec<PinError>,
    pub layout_issues: Vec<LayoutIssue>,
    pub fabrication_path: PathBuf,
    pub layout_path: PathBuf,
}

/// Warn about every edge whose fingers would not survive the clearance
/// inset: the pitch of each grid, and each interface boundary. Returns how
/// many were found.
pub fn check_finger_clearance(
    board: &BoardDesign,
    interfaces: &[Interface],
    params: &CrenellationParams,
    clearance: f64,
) -> usize {
    let mut count = 0;
    for (i, grid) in board.grids.iter().enumerate() {
        if !params.supports_clearance(grid.pitch(), clearance) {
            log::warn!(
                "fingers on grid {i} edges of {:.3} do not survive a {clearance:.3} clearance",
                grid.pitch()
            );
            count += 1;
        }
    }
    for iface in interfaces {
        let Some(edge) = iface.shared_edge(board) else {
            continue;
        };
        if !params.supports_clearance(edge.length(), clearance) {
            log::warn!(
                "fingers on the {:.3} boundary of grid {} cell {} and peripheral {} electrode {} do not survive a {clearance:.3} clearance",
                edge.length(),
                iface.grid,
                iface.pos,
                iface.peripheral,
                iface.electrode
            );
            count += 1;
        }
    }
    count
}

// ── Pipeline ─────────────────────────────────────────────────────────

/// Build the board described by `config`, crenellate a copy of it, check
/// it, and write the fabrication outlines and the board layout file.
pub fn run(config: &BoardConfig, options: &PipelineOptions) -> Result<PipelineReport> {
    let built = config.build().context("Failed to build board")?;
    let params = config
        .crenellation_params()
        .context("Invalid crenellation parameters")?;
    let thin_finger_edges =
        check_finger_clearance(&built.board, &built.interfaces, &params, config.clearance);

    // The layout file describes the uncrenellated board.
    let mut crenellated = built.board.snapshot();
    let mut grid_edges = CrenellationSummary::default();
    for (i, grid) in crenellated.grids.iter_mut().enumerate() {
        let summary = crenellate_grid(grid, &params)
            .with_context(|| format!("Failed to crenellate grid {i}"))?;
        grid_edges.crenellated += summary.crenellated;
        grid_edges.left_straight += summary.left_straight;
    }

    let mut interfaces = Vec::with_capacity(built.interfaces.len());
    for iface in &built.interfaces {
        let outcome = crenellated
            .crenellate_grid_peripheral(
                iface.grid,
                iface.pos,
                iface.peripheral,
                &iface.electrode,
                &params,
            )
            .with_context(|| {
                format!(
                    "Failed to crenellate grid {} cell {} with peripheral {} electrode {}",
                    iface.grid, iface.pos, iface.peripheral, iface.electrode
                )
            })?;
        interfaces.push(outcome);
    }
    log::info!(
        "crenellated {} grid edges and {} interfaces",
        grid_edges.crenellated,
        interfaces
            .iter()
            .filter(|o| matches!(o, CrenellationOutcome::Crenellated { .. }))
            .count()
    );

    let electrodes = reduce_board_to_electrodes(&crenellated);
    let mut checker = DrcChecker::new(config.clearance);
    if options.allow_spacing {
        checker = checker.with_spacing_severity(Severity::Warning);
    }
    let drc = checker.check(&electrodes);
    for v in &drc.violations {
        if v.is_error() {
            log::error!("DRC: {}", v.message);
        } else {
            log::warn!("DRC: {}", v.message);
        }
    }
    if !drc.is_clean() {
        bail!("DRC failed with {} errors", drc.error_count());
    }

    fs::create_dir_all(&options.output_dir).with_context(|| {
        format!("Failed to create output directory {:?}", options.output_dir)
    })?;

    let fabrication_path = options.output_dir.join(FABRICATION_FILE);
    let file = File::create(&fabrication_path)
        .with_context(|| format!("Failed to create {fabrication_path:?}"))?;
    JsonFootprintWriter::new(BufWriter::new(file))
        .write_board(&crenellated, config.board_origin, config.clearance)
        .with_context(|| format!("Failed to write {fabrication_path:?}"))?;

    let (pins, pin_errors) = match &options.nets {
        Some(path) => {
            let nets = JsonNetTable::new(path)
                .electrode_nets()
                .with_context(|| format!("Failed to read net table {path:?}"))?;
            PinTable::from_nets(&nets)
        }
        None => (PinTable::sequential(&electrodes), Vec::new()),
    };
    for err in &pin_errors {
        log::warn!("{err}");
    }

    let (layout, layout_issues) = build_layout(&built.board, &pins);
    let layout_path = options.output_dir.join(LAYOUT_FILE);
    let text = to_compact_json(&layout).context("Failed to encode layout")?;
    fs::write(&layout_path, text).with_context(|| format!("Failed to write {layout_path:?}"))?;
    log::info!("Wrote layout JSON to {layout_path:?}");

    Ok(PipelineReport {
        electrode_count: electrodes.len(),
        thin_finger_edges,
        grid_edges,
        interfaces,
        drc,
        pin_errors,
        layout_issues,
        fabrication_path,
        layout_path,
    })
}
