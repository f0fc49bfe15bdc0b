//! JSON output that keeps short coordinate lists readable.
//!
//! `serde_json`'s pretty printer puts every number of a polygon on its own
//! line. [`CompactFormatter`] renders the document tree itself and asks a
//! [`CompactRule`] which arrays may stay on a single line:
//!
//! ```text
//! {
//!  "origin": [11.25, 8.5],
//!  "polygon": [
//!   [0.0, 0.0],
//!   [2.5, 0.0]
//!  ]
//! }
//! ```

use serde::Serialize;
use serde_json::Value;

/// Decides whether an array is written on one line.
pub trait CompactRule {
    /// `rendered` holds each item already formatted on one line.
    fn single_line(&self, items: &[Value], rendered: &[String]) -> bool;
}

/// Arrays of at most `max_items` scalars whose joined text fits in
/// `max_width` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortLeafLists {
    pub max_items: usize,
    pub max_width: usize,
}

impl Default for ShortLeafLists {
    fn default() -> Self {
        Self {
            max_items: 2,
            max_width: 60,
        }
    }
}

impl CompactRule for ShortLeafLists {
    fn single_line(&self, items: &[Value], rendered: &[String]) -> bool {
        if items.len() > self.max_items {
            return false;
        }
        if items.iter().any(|v| v.is_array() || v.is_object()) {
            return false;
        }
        let width: usize = rendered.iter().map(String::len).sum::<usize>()
            + 2 * rendered.len().saturating_sub(1);
        width <= self.max_width
    }
}

/// Multi-line JSON writer with one space of indent per level.
#[derive(Debug, Clone, Default)]
pub struct CompactFormatter<R: CompactRule = ShortLeafLists> {
    rule: R,
}

impl<R: CompactRule> CompactFormatter<R> {
    pub fn new(rule: R) -> Self {
        Self { rule }
    }

    pub fn format(&self, value: &Value) -> String {
        let mut out = String::new();
        self.write_value(&mut out, value, 0);
        out
    }

    fn write_value(&self, out: &mut String, value: &Value, level: usize) {
        match value {
            Value::Array(items) => {
                let scalars = items.iter().all(|v| !v.is_array() && !v.is_object());
                let rendered: Vec<String> = if scalars {
                    items.iter().map(Value::to_string).collect()
                } else {
                    Vec::new()
                };
                if scalars && self.rule.single_line(items, &rendered) {
                    out.push('[');
                    out.push_str(&rendered.join(", "));
                    out.push(']');
                    return;
                }
                out.push_str("[\n");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(",\n");
                    }
                    indent(out, level + 1);
                    self.write_value(out, item, level + 1);
                }
                out.push('\n');
                indent(out, level);
                out.push(']');
            }
            Value::Object(map) if map.is_empty() => out.push_str("{}"),
            Value::Object(map) => {
                out.push_str("{\n");
                for (i, (key, item)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push_str(",\n");
                    }
                    indent(out, level + 1);
                    out.push_str(&Value::String(key.clone()).to_string());
                    out.push_str(": ");
                    self.write_value(out, item, level + 1);
                }
                out.push('\n');
                indent(out, level);
                out.push('}');
            }
            scalar => out.push_str(&scalar.to_string()),
        }
    }
}

fn indent(out: &mut String, level: usize) {
    out.extend(std::iter::repeat(' ').take(level));
}

/// Serialize `value` with the default [`ShortLeafLists`] rule.
pub fn to_compact_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    Ok(CompactFormatter::<ShortLeafLists>::default().format(&serde_json::to_value(value)?))
}
