//! Translation of JSON block diagrams into programs.
//!
//! Diagrams come from a graphical editor and have this shape:
//!
//! ```json
//! {
//!   "diag": {
//!     "layers": [
//!       { "type": "diagram-nodes", "models": { "<id>": {
//!           "id": "a-1", "name": "const",
//!           "parameters": { "value": 1 }, "states": {},
//!           "ports": [ { "id": "p-1", "name": "Out_0" } ] } } },
//!       { "type": "diagram-links", "models": { "<id>": {
//!           "sourcePort": "p-1", "targetPort": "p-2" } } }
//!     ]
//!   },
//!   "calc": { "dt": 0.01, "t": 10 }
//! }
//! ```
//!
//! Every node becomes one block assignment, every port a named port
//! reference, every link a pipe. The program ends with one `calc` and one
//! `print` per display node.

use std::collections::BTreeMap;

use log::debug;
use serde::Deserialize;

use crate::error::{EngineError, Result};

/// Node names shown as displays; they become unit gains that get printed.
pub const DISPLAY_NODES: [&str; 3] = ["disp", "probe", "scope"];

/// A complete diagram document.
#[derive(Debug, Clone, Deserialize)]
pub struct Diagram {
    #[serde(alias = "ser")]
    pub diag: LayerSet,
    pub calc: CalcSettings,
}

/// The editor's layer list.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerSet {
    pub layers: Vec<Layer>,
}

/// One editor layer. Layers of other types are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Layer {
    #[serde(rename = "diagram-nodes")]
    Nodes {
        #[serde(default)]
        models: BTreeMap<String, NodeModel>,
    },
    #[serde(rename = "diagram-links")]
    Links {
        #[serde(default)]
        models: BTreeMap<String, LinkModel>,
    },
    #[serde(other)]
    Other,
}

/// A block on the canvas.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeModel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, Number>,
    #[serde(default)]
    pub states: BTreeMap<String, Number>,
    #[serde(default)]
    pub ports: Vec<PortModel>,
}

/// A port of a block, named like `In_0` or `Out_1`.
#[derive(Debug, Clone, Deserialize)]
pub struct PortModel {
    pub id: String,
    pub name: String,
}

/// A wire between two ports.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkModel {
    #[serde(rename = "sourcePort")]
    pub source_port: String,
    #[serde(rename = "targetPort")]
    pub target_port: String,
}

/// Simulation settings of a diagram.
#[derive(Debug, Clone, Deserialize)]
pub struct CalcSettings {
    pub dt: Number,
    pub t: Number,
}

/// A number the editor may have stored as text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Float(f64),
    Text(String),
}

impl Number {
    /// Numeric value.
    pub fn value(&self) -> Result<f64> {
        match self {
            Number::Float(v) => Ok(*v),
            Number::Text(text) => text.trim().parse().map_err(|_| {
                EngineError::invalid_diagram(format!("'{}' is not a number", text))
            }),
        }
    }
}

/// Parse diagram JSON and translate it into program source.
pub fn translate(json: &str) -> Result<String> {
    let diagram: Diagram = serde_json::from_str(json)?;
    diagram.to_source()
}

impl Diagram {
    /// Translate into program source.
    pub fn to_source(&self) -> Result<String> {
        let mut code = String::new();
        let mut displays = Vec::new();

        for layer in &self.diag.layers {
            let Layer::Nodes { models } = layer else {
                continue;
            };
            for node in models.values() {
                let block = format!("block_{}", identifier(&node.id)?);
                let display = DISPLAY_NODES.contains(&node.name.as_str());
                let (kind, params, states) = if display {
                    ("num", vec![1.0], Vec::new())
                } else {
                    let kind = block_kind(&node.name)?;
                    (kind, numbers(&node.parameters)?, numbers(&node.states)?)
                };
                writeln_code(
                    &mut code,
                    format_args!(
                        "{} = {}({}, {})",
                        block,
                        kind,
                        literal_list(&params)?,
                        literal_list(&states)?
                    ),
                );
                if display {
                    displays.push(block.clone());
                }

                for port in &node.ports {
                    let (dir, index) = port_ref(&port.name)?;
                    writeln_code(
                        &mut code,
                        format_args!(
                            "port_{} = {}.{}[{}]",
                            identifier(&port.id)?,
                            block,
                            dir,
                            index
                        ),
                    );
                }
            }
        }

        for layer in &self.diag.layers {
            let Layer::Links { models } = layer else {
                continue;
            };
            for link in models.values() {
                writeln_code(
                    &mut code,
                    format_args!(
                        "port_{} @ port_{}",
                        identifier(&link.source_port)?,
                        identifier(&link.target_port)?
                    ),
                );
            }
        }

        writeln_code(
            &mut code,
            format_args!(
                "calc({}, {})",
                literal(self.calc.dt.value()?)?,
                literal(self.calc.t.value()?)?
            ),
        );
        for display in &displays {
            writeln_code(&mut code, format_args!("print({})", display));
        }

        debug!(
            "translated diagram into {} line(s) with {} display(s)",
            code.lines().count(),
            displays.len()
        );
        Ok(code)
    }
}

fn writeln_code(code: &mut String, line: std::fmt::Arguments<'_>) {
    code.push_str(&line.to_string());
    code.push('\n');
}

/// Block kind for an editor node name.
fn block_kind(name: &str) -> Result<&'static str> {
    match name {
        "const" | "gain" | "num" => Ok("num"),
        "add" => Ok("add"),
        "integ" => Ok("integ"),
        "div" => Ok("div"),
        "mult" => Ok("mult"),
        "time" => Ok("time"),
        other => Err(EngineError::invalid_diagram(format!(
            "unknown block '{}'",
            other
        ))),
    }
}

/// An editor id as an identifier fragment: dashes are dropped.
fn identifier(id: &str) -> Result<String> {
    let cleaned: String = id.chars().filter(|&c| c != '-').collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(EngineError::invalid_diagram(format!(
            "'{}' cannot be used as an id",
            id
        )));
    }
    Ok(cleaned)
}

/// `In_0` becomes `("in", 0)`.
fn port_ref(name: &str) -> Result<(&'static str, usize)> {
    let invalid = || EngineError::invalid_diagram(format!("bad port name '{}'", name));
    let (dir, index) = name.split_once('_').ok_or_else(invalid)?;
    let dir = match dir.to_ascii_lowercase().as_str() {
        "in" => "in",
        "out" => "out",
        _ => return Err(invalid()),
    };
    let index = index.parse().map_err(|_| invalid())?;
    Ok((dir, index))
}

fn numbers(values: &BTreeMap<String, Number>) -> Result<Vec<f64>> {
    values.values().map(Number::value).collect()
}

/// A number as program source. Literals have no exponent form, and negative
/// values use unary minus.
fn literal(value: f64) -> Result<String> {
    if !value.is_finite() {
        return Err(EngineError::invalid_diagram(format!(
            "{} cannot be written in a program",
            value
        )));
    }
    Ok(format!("{}", value))
}

fn literal_list(values: &[f64]) -> Result<String> {
    let items = values
        .iter()
        .map(|&v| literal(v))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("[{}]", items.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEEDBACK: &str = r#"{
        "diag": { "layers": [
            { "type": "diagram-nodes", "models": {
                "n1": { "id": "c-1", "name": "const", "parameters": { "value": "1" },
                        "states": {}, "ports": [ { "id": "p-1", "name": "Out_0" } ] },
                "n2": { "id": "i-1", "name": "integ", "parameters": {}, "states": { "x0": 0 },
                        "ports": [ { "id": "p-2", "name": "In_0" }, { "id": "p-3", "name": "Out_0" } ] },
                "n3": { "id": "d-1", "name": "disp",
                        "ports": [ { "id": "p-4", "name": "In_0" } ] }
            } },
            { "type": "diagram-links", "models": {
                "l1": { "sourcePort": "p-1", "targetPort": "p-2" },
                "l2": { "sourcePort": "p-3", "targetPort": "p-4" }
            } },
            { "type": "diagram-labels" }
        ] },
        "calc": { "dt": 0.5, "t": "2" }
    }"#;

    #[test]
    fn test_translate_feedback_diagram() {
        let code = translate(FEEDBACK).unwrap();
        let expected = "\
block_c1 = num([1], [])
port_p1 = block_c1.out[0]
block_i1 = integ([], [0])
port_p2 = block_i1.in[0]
port_p3 = block_i1.out[0]
block_d1 = num([1], [])
port_p4 = block_d1.in[0]
port_p1 @ port_p2
port_p3 @ port_p4
calc(0.5, 2)
print(block_d1)
";
        assert_eq!(code, expected);
    }

    #[test]
    fn test_ser_alias_is_accepted() {
        let json = r#"{ "ser": { "layers": [] }, "calc": { "dt": 1, "t": 1 } }"#;
        assert_eq!(translate(json).unwrap(), "calc(1, 1)\n");
    }

    #[test]
    fn test_unknown_block_is_rejected() {
        let json = r#"{ "diag": { "layers": [ { "type": "diagram-nodes", "models": {
            "n": { "id": "x", "name": "laser" } } } ] }, "calc": { "dt": 1, "t": 1 } }"#;
        assert!(matches!(
            translate(json),
            Err(EngineError::InvalidDiagram { .. })
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(translate("{"), Err(EngineError::Json(_))));
    }

    #[test]
    fn test_port_names() {
        assert_eq!(port_ref("In_0").unwrap(), ("in", 0));
        assert_eq!(port_ref("Out_12").unwrap(), ("out", 12));
        assert!(port_ref("Side_0").is_err());
        assert!(port_ref("In").is_err());
    }

    #[test]
    fn test_negative_parameters() {
        assert_eq!(literal_list(&[-1.5, 0.0001]).unwrap(), "[-1.5, 0.0001]");
        assert!(literal(f64::NAN).is_err());
    }
}
