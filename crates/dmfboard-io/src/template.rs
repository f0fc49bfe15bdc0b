use std::path::Path;

use dmfboard_core::PeripheralTemplate;

use crate::error::{read_file, IoError, Result};

/// Templates compiled into the binary, by name.
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[(
    "four_tier_reservoir",
    include_str!("../templates/four_tier_reservoir.json"),
)];

/// Parse and validate a peripheral template from JSON text.
pub fn parse_peripheral(json: &str) -> Result<PeripheralTemplate> {
    let template: PeripheralTemplate = serde_json::from_str(json)?;
    template.validate()?;
    Ok(template)
}

/// Load and validate a peripheral template file.
pub fn load_peripheral(path: &Path) -> Result<PeripheralTemplate> {
    let template = parse_peripheral(&read_file(path)?)?;
    log::debug!(
        "loaded template {} with {} electrodes from {}",
        template.name(),
        template.electrodes.len(),
        path.display()
    );
    Ok(template)
}

pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_TEMPLATES.iter().map(|(name, _)| *name)
}

pub fn builtin(name: &str) -> Option<Result<PeripheralTemplate>> {
    BUILTIN_TEMPLATES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, json)| parse_peripheral(json))
}

/// Resolve a template reference: a built-in name, otherwise a path
/// relative to `base_dir`.
pub fn resolve_template(reference: &str, base_dir: Option<&Path>) -> Result<PeripheralTemplate> {
    if let Some(found) = builtin(reference) {
        return found;
    }
    let path = match base_dir {
        Some(dir) => dir.join(reference),
        None => Path::new(reference).to_path_buf(),
    };
    if !path.is_file() {
        return Err(IoError::UnknownTemplate(reference.to_string()));
    }
    load_peripheral(&path)
}
