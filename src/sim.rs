//! Closed-loop voltage control of a plant behind a grid reactance.
//!
//! A generator at bus 1 exports constant active power into a grid
//! represented by a voltage source (the slack bus) behind `sys_xe`. A PI
//! controller compares the measured terminal voltage against a reference
//! and commands reactive power, which the plant delivers through a first
//! order lag. Every tick runs one power flow, warm started from the last
//! converged voltages.

use std::collections::VecDeque;

use log::{debug, warn};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::bus::BusSystem;
use crate::cmplx;
use crate::dense::Mat;
use crate::error::{PowerFlowError, Result};
use crate::pf::solve;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimParams {
    /// Time step (s).
    pub dt: f64,
    /// Grid reactance seen from the plant terminal (p.u.).
    pub sys_xe: f64,
    /// Plant reactive power time constant (s).
    pub tq_plant: f64,
    /// Voltage controller proportional gain.
    pub kp: f64,
    /// Voltage controller integral gain.
    pub ki: f64,
    /// Peak grid voltage noise (p.u.).
    pub noise: f64,
    pub v_init: f64,
    pub p_init: f64,
    pub q_init: f64,
    /// Length of the retained history (s).
    pub window: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            dt: 0.05,
            sys_xe: 0.05,
            tq_plant: 0.25,
            kp: 10.0,
            ki: 50.0,
            noise: 0.002,
            v_init: 1.0,
            p_init: 0.8,
            q_init: 0.0,
            window: 10.0,
        }
    }
}

impl SimParams {
    fn validate(&self) -> Result<()> {
        let positive = [
            ("dt", self.dt),
            ("tq_plant", self.tq_plant),
            ("window", self.window),
            ("v_init", self.v_init),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(PowerFlowError::InvalidParameter { name, value });
            }
        }
        if !(self.sys_xe.is_finite() && self.sys_xe != 0.0) {
            return Err(PowerFlowError::InvalidParameter {
                name: "sys_xe",
                value: self.sys_xe,
            });
        }
        if !(self.noise.is_finite() && self.noise >= 0.0) {
            return Err(PowerFlowError::InvalidParameter {
                name: "noise",
                value: self.noise,
            });
        }
        Ok(())
    }

    /// Grid source voltage that puts the plant terminal at `v_init` while
    /// exporting `p_init + j q_init`.
    pub fn grid_voltage(&self) -> f64 {
        let i = cmplx!(self.p_init, self.q_init).conj() / self.v_init;
        (cmplx!(self.v_init) - i * cmplx!(0.0, self.sys_xe)).norm()
    }
}

/// PI controller with trapezoidal integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PiController {
    kp: f64,
    ki: f64,
    integ: f64,
}

impl PiController {
    pub fn new(kp: f64, ki: f64, init: f64) -> Self {
        Self { kp, ki, integ: init }
    }

    pub fn step(&mut self, error: f64, dt: f64) -> f64 {
        let dstate = error * self.ki;
        self.integ += dstate * dt;
        error * self.kp + self.integ + dt * dstate / 2.0
    }

    pub fn reset(&mut self, init: f64) {
        self.integ = init;
    }
}

/// First order lag `1 / (1 + s tau)` with trapezoidal integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirstOrderLag {
    tau: f64,
    store: f64,
}

impl FirstOrderLag {
    pub fn new(tau: f64) -> Self {
        Self { tau, store: 0.0 }
    }

    /// Advances the lag towards `input` given its previous output `last`.
    pub fn step(&mut self, input: f64, last: f64, dt: f64) -> f64 {
        let dstate = (input - last) / self.tau;
        self.store += dstate * dt;
        self.store + dt * dstate / 2.0
    }

    pub fn reset(&mut self) {
        self.store = 0.0;
    }
}

/// One tick of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub time: f64,
    pub v_ref: f64,
    /// Plant terminal voltage magnitude (p.u.).
    pub v: f64,
    /// Reactive power commanded by the controller (p.u.).
    pub q_ref: f64,
    /// Reactive power delivered by the plant (p.u.).
    pub q: f64,
    pub converged: bool,
    /// Power flow iterations used by the tick.
    pub iterations: usize,
}

pub struct Simulation {
    params: SimParams,
    sys: BusSystem,
    v_sys: f64,

    controller: PiController,
    plant: FirstOrderLag,
    v_last: f64,
    q_last: f64,
    v_warm: Option<Vec<Complex64>>,

    ticks: usize,
    history: VecDeque<Sample>,
    capacity: usize,
    rng: StdRng,
}

impl Simulation {
    /// Creates a simulation. A `seed` makes the grid voltage noise
    /// reproducible.
    pub fn new(params: SimParams, seed: Option<u64>) -> Result<Self> {
        params.validate()?;

        let y = cmplx!(1.0) / cmplx!(0.0, params.sys_xe);
        let v_sys = params.grid_voltage();
        let sys = BusSystem::builder()
            .y_bus(Mat::from_rows(vec![vec![y, -y], vec![-y, y]])?)
            .vreg(vec![Some(v_sys), None])
            .sgen(vec![cmplx!(), cmplx!(params.p_init, params.q_init)])
            .build()?;

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let capacity = ((params.window / params.dt).round() as usize).max(2);

        let mut sim = Self {
            params,
            sys,
            v_sys,
            controller: PiController::new(params.kp, params.ki, params.q_init),
            plant: FirstOrderLag::new(params.tq_plant),
            v_last: params.v_init,
            q_last: params.q_init,
            v_warm: None,
            ticks: 0,
            history: VecDeque::with_capacity(capacity + 1),
            capacity,
            rng,
        };
        sim.seed_history();
        Ok(sim)
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Grid source voltage without noise (p.u.).
    pub fn grid_voltage(&self) -> f64 {
        self.v_sys
    }

    /// Simulation time of the last tick (s).
    pub fn time(&self) -> f64 {
        self.ticks as f64 * self.params.dt
    }

    pub fn history(&self) -> &VecDeque<Sample> {
        &self.history
    }

    /// Advances the simulation by one time step.
    ///
    /// A tick whose power flow fails is retried once from a flat start.
    /// If that fails too, the previous terminal voltage is held and the
    /// sample is marked as not converged.
    pub fn step(&mut self, v_ref: f64) -> Result<Sample> {
        let dt = self.params.dt;
        self.ticks += 1;

        let q_ref = self.controller.step(v_ref - self.v_last, dt);
        let q = self.plant.step(q_ref, self.q_last, dt);
        self.q_last = q;

        let noise = (self.rng.gen::<f64>() - 0.5) * 2.0 * self.params.noise;
        self.sys.set_slack_voltage(self.v_sys + noise);
        self.sys.set_sgen(1, cmplx!(self.params.p_init, q))?;

        let mut sol = solve(&self.sys, self.v_warm.as_deref())?;
        let mut iterations = sol.iterations;
        if !sol.solved() && self.v_warm.is_some() {
            warn!(
                "t = {:.3} s: power flow failed from previous solution ({:?}), retrying from flat start",
                self.time(),
                sol.status
            );
            sol = solve(&self.sys, None)?;
            iterations += sol.iterations;
        }

        let converged = sol.solved();
        if converged {
            self.v_last = sol.vm(1);
            self.v_warm = Some(sol.v);
        } else {
            warn!(
                "t = {:.3} s: power flow failed ({:?}), holding V = {:.6}",
                self.time(),
                sol.status,
                self.v_last
            );
        }

        let sample = Sample {
            time: self.time(),
            v_ref,
            v: self.v_last,
            q_ref,
            q,
            converged,
            iterations,
        };
        debug!(
            "t = {:.3} s: Vref = {:.5}, V = {:.5}, Qcmd = {:.5}, Q = {:.5}",
            sample.time, v_ref, sample.v, q_ref, q
        );
        self.push(sample);

        Ok(sample)
    }

    /// Returns the controller, plant and history to their initial state.
    /// The noise generator is not reseeded.
    pub fn reset(&mut self) {
        self.controller.reset(self.params.q_init);
        self.plant.reset();
        self.v_last = self.params.v_init;
        self.q_last = self.params.q_init;
        self.v_warm = None;
        self.ticks = 0;
        self.seed_history();
    }

    /// Two samples before `t = 0` holding the initial operating point.
    fn seed_history(&mut self) {
        let dt = self.params.dt;
        self.history.clear();
        for time in [-2.0 * dt, -dt] {
            self.history.push_back(Sample {
                time,
                v_ref: self.params.v_init,
                v: self.params.v_init,
                q_ref: self.params.q_init,
                q: self.params.q_init,
                converged: true,
                iterations: 0,
            });
        }
    }

    fn push(&mut self, sample: Sample) {
        self.history.push_back(sample);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
        let oldest = sample.time - self.params.window;
        while self.history.len() > 2 && self.history.front().map_or(false, |s| s.time < oldest) {
            self.history.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn quiet() -> SimParams {
        SimParams {
            noise: 0.0,
            ..SimParams::default()
        }
    }

    #[test]
    fn starts_in_steady_state() -> anyhow::Result<()> {
        let mut sim = Simulation::new(quiet(), Some(7))?;
        assert_abs_diff_eq!(sim.grid_voltage(), 1.0007996802557444, epsilon = 1e-12);

        let sample = sim.step(1.0)?;
        assert!(sample.converged);
        assert_abs_diff_eq!(sample.time, 0.05, epsilon = 1e-12);
        assert_abs_diff_eq!(sample.v, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(sample.q, 0.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn tracks_voltage_step() -> anyhow::Result<()> {
        let mut sim = Simulation::new(quiet(), Some(7))?;
        sim.step(1.0)?;

        let mut last = None;
        for _ in 0..200 {
            last = Some(sim.step(1.02)?);
        }
        let last = last.ok_or_else(|| anyhow::anyhow!("no samples"))?;
        assert!(last.converged);
        assert_abs_diff_eq!(last.v, 1.02, epsilon = 1e-6);
        // reactive power needed to lift the terminal by 0.02 p.u.
        assert_abs_diff_eq!(last.q, 0.4073663, epsilon = 1e-5);
        assert_abs_diff_eq!(last.q_ref, last.q, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn warm_start_shortens_ticks() -> anyhow::Result<()> {
        let mut sim = Simulation::new(quiet(), Some(7))?;
        let first = sim.step(1.0)?;
        let second = sim.step(1.0)?;
        assert!(second.iterations < first.iterations);
        Ok(())
    }

    #[test]
    fn failed_warm_start_retries_from_flat_start() -> anyhow::Result<()> {
        let mut fresh = Simulation::new(quiet(), Some(7))?;
        let expected = fresh.step(1.0)?;

        let mut sim = Simulation::new(quiet(), Some(7))?;
        sim.v_warm = Some(vec![cmplx!(1.0), cmplx!(f64::NAN)]);
        let sample = sim.step(1.0)?;

        // the warm start fails before its first update
        assert!(sample.converged);
        assert_eq!(sample.iterations, expected.iterations);
        assert_abs_diff_eq!(sample.v, expected.v, epsilon = 1e-12);
        assert!(sim
            .v_warm
            .as_ref()
            .map_or(false, |v| v.iter().all(|v| v.norm().is_finite())));
        Ok(())
    }

    #[test]
    fn failed_tick_holds_last_voltage() -> anyhow::Result<()> {
        let mut sim = Simulation::new(quiet(), Some(7))?;
        let good = sim.step(1.0)?;
        let warm = sim.v_warm.clone();

        // more than the grid reactance can carry
        sim.params.p_init = 30.0;
        let held = sim.step(1.0)?;

        assert!(!held.converged);
        assert_eq!(held.v, good.v);
        assert!(held.iterations > good.iterations);
        assert_eq!(sim.v_warm, warm);
        assert_eq!(sim.history().back(), Some(&held));

        // recovers once the export is feasible again
        sim.params.p_init = 0.8;
        let next = sim.step(1.0)?;
        assert!(next.converged);
        assert_abs_diff_eq!(next.v, 1.0, epsilon = 1e-3);
        Ok(())
    }

    #[test]
    fn history_is_bounded() -> anyhow::Result<()> {
        let params = SimParams {
            window: 1.0,
            ..SimParams::default()
        };
        let mut sim = Simulation::new(params, Some(3))?;
        assert_eq!(sim.history().len(), 2);

        for _ in 0..50 {
            sim.step(1.0)?;
        }
        let history = sim.history();
        assert_eq!(history.len(), 20);
        assert_abs_diff_eq!(history[19].time, 2.5, epsilon = 1e-9);
        assert!(history.iter().all(|s| s.time >= 1.5 - 1e-9));
        Ok(())
    }

    #[test]
    fn seeded_runs_repeat() -> anyhow::Result<()> {
        let mut a = Simulation::new(SimParams::default(), Some(42))?;
        let mut b = Simulation::new(SimParams::default(), Some(42))?;
        for _ in 0..20 {
            assert_eq!(a.step(1.01)?, b.step(1.01)?);
        }
        Ok(())
    }

    #[test]
    fn reset_restores_initial_state() -> anyhow::Result<()> {
        let mut sim = Simulation::new(quiet(), Some(1))?;
        let first = sim.step(1.0)?;
        for _ in 0..10 {
            sim.step(1.03)?;
        }
        sim.reset();
        assert_eq!(sim.time(), 0.0);
        assert_eq!(sim.history().len(), 2);

        let again = sim.step(1.0)?;
        assert_abs_diff_eq!(again.v, first.v, epsilon = 1e-9);
        assert_eq!(again.q, first.q);
        Ok(())
    }

    #[test]
    fn invalid_params_rejected() {
        let params = SimParams {
            tq_plant: 0.0,
            ..SimParams::default()
        };
        assert!(matches!(
            Simulation::new(params, None),
            Err(PowerFlowError::InvalidParameter { name: "tq_plant", .. })
        ));
    }

    #[test]
    fn pi_and_lag_integrate_trapezoidally() {
        let mut pi = PiController::new(10.0, 50.0, 0.0);
        // 0.01 * 10 + 0.01 * 50 * 0.05 + 0.05 * 0.5 / 2
        assert_abs_diff_eq!(pi.step(0.01, 0.05), 0.1375, epsilon = 1e-12);

        let mut lag = FirstOrderLag::new(0.25);
        // dstate = 4, store = 0.2, out = 0.2 + 0.1
        assert_abs_diff_eq!(lag.step(1.0, 0.0, 0.05), 0.3, epsilon = 1e-12);
    }
}
