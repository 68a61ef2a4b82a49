//! Readiness-driven scheduling of one simulation run.

use log::{info, trace, warn};

use crate::error::{EngineError, Result};
use crate::graph::{BlockId, Host, Sim};

use super::{MAX_STEPS, STEP_EPSILON};

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Number of simulated time points
    pub steps: usize,
    /// Steps that ended with blocks that could not be computed
    pub deadlocked_steps: usize,
}

/// Simulate `sim` from `t = 0` to `tmax` (inclusive) with step `dt`.
///
/// Every step clears all ready flags, then computes blocks as soon as they
/// are sources or all of their inputs are ready. A step in which a pass makes
/// no progress is reported through [`Host::diagnostic`]; the waiting blocks
/// keep their previous outputs and the run continues.
pub fn run(sim: &mut Sim, dt: f64, tmax: f64, host: &mut dyn Host) -> Result<RunStats> {
    if !(dt.is_finite() && dt > 0.0) {
        return Err(EngineError::invalid_param(format!(
            "time step must be a positive number, got {}",
            dt
        )));
    }
    if !(tmax.is_finite() && tmax >= 0.0) {
        return Err(EngineError::invalid_param(format!(
            "end time must be a non-negative number, got {}",
            tmax
        )));
    }

    let intervals = (tmax / dt + STEP_EPSILON).floor();
    let steps = Some(intervals)
        .filter(|&n| n < MAX_STEPS as f64)
        .and_then(|n| (n as usize).checked_add(1))
        .ok_or_else(|| {
            EngineError::invalid_param(format!(
                "calc({}, {}) needs more than {} steps",
                dt, tmax, MAX_STEPS
            ))
        })?;
    info!(
        "simulating {} block(s) for {} step(s) with dt={}",
        sim.len(),
        steps,
        dt
    );

    sim.reset_for_run();
    let mut stats = RunStats::default();
    for k in 0..steps {
        let t = k as f64 * dt;
        if !step(sim, t, dt, host)? {
            stats.deadlocked_steps += 1;
        }
        sim.push_time(t);
        stats.steps += 1;
    }

    info!(
        "simulation finished: {} step(s), {} deadlocked",
        stats.steps, stats.deadlocked_steps
    );
    Ok(stats)
}

/// Compute every block once for time `t`. Returns `false` on deadlock.
pub fn step(sim: &mut Sim, t: f64, dt: f64, host: &mut dyn Host) -> Result<bool> {
    sim.clear_ready();

    let mut pending: Vec<BlockId> = sim.block_ids().collect();
    let mut pass = 0;
    while !pending.is_empty() {
        pass += 1;
        let mut waiting = Vec::new();
        let mut progressed = false;
        for id in pending {
            if sim.is_ready(id) {
                sim.compute(id, t, dt, host)?;
                progressed = true;
            } else {
                waiting.push(id);
            }
        }
        trace!("t={}: pass {} left {} block(s) waiting", t, pass, waiting.len());

        if !progressed && !waiting.is_empty() {
            let message = deadlock_message(sim, t, &waiting);
            warn!("{}", message);
            host.diagnostic(&message)?;
            return Ok(false);
        }
        pending = waiting;
    }
    Ok(true)
}

fn deadlock_message(sim: &Sim, t: f64, waiting: &[BlockId]) -> String {
    let names: Vec<String> = waiting
        .iter()
        .map(|&id| format!("{}{}", sim.block(id).kind, id))
        .collect();
    format!(
        "deadlock at t={}: {} block(s) waiting: {}",
        t,
        waiting.len(),
        names.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{NoCalls, Recording};
    use crate::graph::{BlockKind, Param};
    use approx::assert_relative_eq;

    #[test]
    fn test_first_order_feedback_loop() {
        // y' = 1 - y
        let mut sim = Sim::new();
        let host = &mut NoCalls;
        let x = sim
            .create(BlockKind::Num, Some(vec![Param::Number(1.0)]), None, host)
            .unwrap();
        let y = sim.create(BlockKind::Integ, None, None, host).unwrap();
        let neg = sim
            .create(BlockKind::Num, Some(vec![Param::Number(-1.0)]), None, host)
            .unwrap();
        sim.connect(sim.output(y, 0).unwrap(), neg, 0, host).unwrap();
        let e = sim.create(BlockKind::Add, None, None, host).unwrap();
        sim.connect(sim.output(x, 0).unwrap(), e, 0, host).unwrap();
        sim.connect(sim.output(neg, 0).unwrap(), e, 1, host).unwrap();
        sim.connect(sim.output(e, 0).unwrap(), y, 0, host).unwrap();

        let stats = run(&mut sim, 0.001, 10.0, host).unwrap();
        assert_eq!(stats.steps, 10_001);
        assert_eq!(stats.deadlocked_steps, 0);
        assert_eq!(sim.time_history().len(), 10_001);
        assert_relative_eq!(
            sim.value(sim.output(y, 0).unwrap()),
            0.99995,
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_time_block_follows_steps() {
        let mut sim = Sim::new();
        let t = sim.create(BlockKind::Time, None, None, &mut NoCalls).unwrap();
        run(&mut sim, 0.25, 1.0, &mut NoCalls).unwrap();
        let history = sim.signal(sim.output(t, 0).unwrap()).history();
        assert_eq!(history, &[0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(sim.time_history(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_algebraic_loop_is_reported_not_raised() {
        let mut sim = Sim::new();
        let mut host = Recording::default();
        let a = sim.create(BlockKind::Add, None, None, &mut host).unwrap();
        sim.connect(sim.output(a, 0).unwrap(), a, 0, &mut host).unwrap();

        let stats = run(&mut sim, 1.0, 1.0, &mut host).unwrap();
        assert_eq!(stats.steps, 2);
        assert_eq!(stats.deadlocked_steps, 2);
        assert_eq!(host.diagnostics.len(), 2);
        assert_eq!(
            host.diagnostics[0],
            "deadlock at t=0: 1 block(s) waiting: add#0"
        );
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let mut sim = Sim::new();
        let host = &mut NoCalls;
        let one = sim
            .create(BlockKind::Num, Some(vec![Param::Number(1.0)]), None, host)
            .unwrap();
        let y = sim.create(BlockKind::Integ, None, None, host).unwrap();
        sim.connect(sim.output(one, 0).unwrap(), y, 0, host).unwrap();

        run(&mut sim, 0.1, 1.0, host).unwrap();
        let first = sim.value(sim.output(y, 0).unwrap());
        let first_history = sim.signal(sim.output(y, 0).unwrap()).history().to_vec();
        run(&mut sim, 0.1, 1.0, host).unwrap();
        assert_eq!(sim.value(sim.output(y, 0).unwrap()), first);
        assert_eq!(sim.signal(sim.output(y, 0).unwrap()).history(), &first_history[..]);
    }

    #[test]
    fn test_invalid_step_is_rejected() {
        let mut sim = Sim::new();
        assert!(matches!(
            run(&mut sim, 0.0, 1.0, &mut NoCalls),
            Err(EngineError::InvalidSimulationParam { .. })
        ));
        assert!(matches!(
            run(&mut sim, 0.1, f64::NAN, &mut NoCalls),
            Err(EngineError::InvalidSimulationParam { .. })
        ));
    }

    #[test]
    fn test_step_count_is_bounded() {
        let mut sim = Sim::new();
        let t = sim.create(BlockKind::Time, None, None, &mut NoCalls).unwrap();
        assert!(matches!(
            run(&mut sim, 1e-30, 1e9, &mut NoCalls),
            Err(EngineError::InvalidSimulationParam { .. })
        ));
        assert!(matches!(
            run(&mut sim, 1.0, MAX_STEPS as f64, &mut NoCalls),
            Err(EngineError::InvalidSimulationParam { .. })
        ));
        assert!(sim.time_history().is_empty());
        assert!(sim.signal(sim.output(t, 0).unwrap()).history().is_empty());

        let stats = run(&mut sim, 0.5, 2.0, &mut NoCalls).unwrap();
        assert_eq!(stats.steps, 5);
    }
}
