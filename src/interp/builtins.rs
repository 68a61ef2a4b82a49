//! Built-in routines: `print`, `calc`, `plot` and `debug`.

use log::info;

use super::format::{format_number, render, round_to};
use super::interpreter::Interpreter;
use super::value::Value;
use crate::error::{EngineError, Result};
use crate::solver;

/// Plot area width in characters.
pub const PLOT_WIDTH: usize = 60;

/// Plot area height in lines.
pub const PLOT_HEIGHT: usize = 15;

/// A built-in routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routine {
    /// Write the arguments on one line
    Print,
    /// Simulate the graph: `calc(dt, tmax)`
    Calc,
    /// Chart one signal's history against another's: `plot(x, y)`
    Plot,
    /// Dump the block list
    Debug,
}

impl Routine {
    /// Resolve a routine name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "print" => Some(Routine::Print),
            "calc" => Some(Routine::Calc),
            "plot" => Some(Routine::Plot),
            "debug" => Some(Routine::Debug),
            _ => None,
        }
    }

    /// Name used in programs.
    pub fn name(self) -> &'static str {
        match self {
            Routine::Print => "print",
            Routine::Calc => "calc",
            Routine::Plot => "plot",
            Routine::Debug => "debug",
        }
    }

    fn expect_args(self, args: &[Value], expected: usize) -> Result<()> {
        if args.len() != expected {
            return Err(EngineError::ArgumentCount {
                name: self.name().to_string(),
                expected,
                actual: args.len(),
            });
        }
        Ok(())
    }
}

impl Interpreter<'_> {
    /// Run a built-in routine. Routines produce no value.
    pub(crate) fn call_routine(&mut self, routine: Routine, args: &[Value]) -> Result<Value> {
        match routine {
            Routine::Print => {
                let precision = self.host.config.precision;
                let parts = args
                    .iter()
                    .map(|arg| render(arg, &self.sim, precision))
                    .collect::<Result<Vec<_>>>()?;
                writeln!(self.host.out, "{}", parts.join(" "))?;
            }
            Routine::Calc => {
                routine.expect_args(args, 2)?;
                let dt = args[0].number(&self.sim)?;
                let tmax = args[1].number(&self.sim)?;
                let stats = solver::run(&mut self.sim, dt, tmax, &mut self.host)?;
                info!("calc({}, {}) ran {} step(s)", dt, tmax, stats.steps);
            }
            Routine::Plot => {
                routine.expect_args(args, 2)?;
                let xs = self.sim.signal(args[0].signal(&self.sim)?).history();
                let ys = self.sim.signal(args[1].signal(&self.sim)?).history();
                let chart = render_plot(xs, ys, self.host.config.precision);
                write!(self.host.out, "{}", chart)?;
            }
            Routine::Debug => {
                writeln!(self.host.out, "{}", self.sim)?;
            }
        }
        Ok(Value::Unit)
    }
}

/// Render an ASCII scatter chart of `ys` against `xs`.
pub fn render_plot(xs: &[f64], ys: &[f64], precision: Option<u32>) -> String {
    let points: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| (x, y))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if points.is_empty() {
        return "(nothing to plot)\n".to_string();
    }

    let (x_min, x_max) = bounds(points.iter().map(|p| p.0));
    let (y_min, y_max) = bounds(points.iter().map(|p| p.1));

    let mut grid = vec![vec![' '; PLOT_WIDTH]; PLOT_HEIGHT];
    for &(x, y) in &points {
        let col = scale(x, x_min, x_max, PLOT_WIDTH - 1);
        let row = PLOT_HEIGHT - 1 - scale(y, y_min, y_max, PLOT_HEIGHT - 1);
        grid[row][col] = '*';
    }

    let label = |v: f64| format_number(round_to(v, precision));
    let top = label(y_max);
    let bottom = label(y_min);
    let margin = top.len().max(bottom.len());

    let mut chart = String::new();
    for (i, row) in grid.iter().enumerate() {
        let tick = match i {
            0 => top.as_str(),
            i if i == PLOT_HEIGHT - 1 => bottom.as_str(),
            _ => "",
        };
        let line: String = row.iter().collect();
        chart.push_str(&format!("{:>margin$} |{}\n", tick, line.trim_end(), margin = margin));
    }
    chart.push_str(&format!("{:>margin$} +{}\n", "", "-".repeat(PLOT_WIDTH), margin = margin));

    let left = label(x_min);
    let right = label(x_max);
    let gap = (PLOT_WIDTH + 1).saturating_sub(left.len() + right.len()).max(1);
    chart.push_str(&format!(
        "{:>margin$}  {}{}{}\n",
        "",
        left,
        " ".repeat(gap),
        right,
        margin = margin
    ));
    chart
}

/// Smallest and largest value, widened when they coincide.
fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if lo == hi {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo, hi)
    }
}

/// Position of `v` on an axis of `cells + 1` cells.
fn scale(v: f64, lo: f64, hi: f64, cells: usize) -> usize {
    let t = (v - lo) / (hi - lo);
    ((t * cells as f64).round() as usize).min(cells)
}
