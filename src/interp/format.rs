//! Text rendering of values and numbers.

use crate::dsl::PortDir;
use crate::error::Result;
use crate::graph::Sim;

use super::value::Value;

/// Round `value` to `precision` decimal places.
pub fn round_to(value: f64, precision: Option<u32>) -> f64 {
    let Some(digits) = precision else {
        return value;
    };
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(digits as i32);
    let scaled = value * scale;
    if !scaled.is_finite() || scaled.abs() >= 1e17 {
        // no fractional digits left to round
        return value;
    }
    scaled.round() / scale
}

/// Format a number in its shortest exact form.
///
/// Integral values keep a trailing `.0`. Magnitudes below `1e-4` or from
/// `1e16` up use scientific notation with a signed two-digit exponent.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if (-4..16).contains(&exponent) {
        let plain = format!("{}", value);
        if plain.contains('.') {
            plain
        } else {
            format!("{}.0", plain)
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

/// Render a value the way `print` shows it.
pub fn render(value: &Value, sim: &Sim, precision: Option<u32>) -> Result<String> {
    let number = |v: f64| format_number(round_to(v, precision));
    Ok(match value {
        Value::Unit => "none".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Block(_) | Value::Port { .. } => number(value.number(sim)?),
        Value::Ports(block, dir) => {
            let count = match dir {
                PortDir::In => sim.block(*block).inputs.len(),
                PortDir::Out => sim.block(*block).outputs.len(),
            };
            let items = (0..count)
                .map(|slot| {
                    let port = Value::Port {
                        block: *block,
                        dir: *dir,
                        slot,
                    };
                    Ok(number(port.number(sim)?))
                })
                .collect::<Result<Vec<_>>>()?;
            format!("[{}]", items.join(", "))
        }
        Value::Array(items) => {
            let items = items
                .iter()
                .map(|item| render(item, sim, precision))
                .collect::<Result<Vec<_>>>()?;
            format!("[{}]", items.join(", "))
        }
        Value::Fun(fun) => fun.to_string(),
    })
}
