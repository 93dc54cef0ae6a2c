//! The time-window coupling scheme state machine (§4.6).
//!
//! A [`CouplingScheme`] owns the [`CouplingDataRegistry`] for the fields it
//! exchanges and drives them across one [`DistributedCommunication`] link.
//! States: `UNINITIALIZED -> INITIALIZED -> ADVANCING -> (ROLLBACK |
//! COMMIT) -> ADVANCING | FINALIZED`. The scheme never talks to a solver
//! directly — `api::CouplingInterface` is the thin wrapper that does, using
//! [`CouplingScheme::is_action_required`] / [`CouplingScheme::mark_action_fulfilled`]
//! to hand the solver-state checkpoint/restore obligation back to the caller.

pub mod convergence;

pub use convergence::ConvergenceMeasure;

use crate::coupling_data::{CouplingData, CouplingDataRegistry};
use crate::error::{Result, UsageError};
use crate::m2n::DistributedCommunication;
use crate::mesh::{DataId, MeshId};
use convergence::MeasureState;
use std::collections::HashSet;
use tracing::{info, info_span, warn};

/// Solver must snapshot its own state before the next iteration's exchange
/// may overwrite this scheme's committed values (§6, §9 action-tag surface).
pub const ACTION_WRITE_ITERATION_CHECKPOINT: &str = "write-iteration-checkpoint";
/// Solver must restore its previously-snapshotted state before recomputing
/// this window's step (required after a rollback).
pub const ACTION_READ_ITERATION_CHECKPOINT: &str = "read-iteration-checkpoint";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    First,
    Second,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SchemeKind {
    SerialExplicit,
    ParallelExplicit,
    SerialImplicit,
    ParallelImplicit,
}

impl SchemeKind {
    fn is_implicit(self) -> bool {
        matches!(self, SchemeKind::SerialImplicit | SchemeKind::ParallelImplicit)
    }

    fn is_serial(self) -> bool {
        matches!(self, SchemeKind::SerialExplicit | SchemeKind::SerialImplicit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Initialized,
    Advancing,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Send,
    Receive,
}

/// One configured data exchange, oriented to this participant's own role
/// (§4.6): `Send` for data this participant provides, `Receive` for data it
/// reads back.
#[derive(Debug, Clone)]
pub struct ExchangeSpec {
    pub mesh_id: MeshId,
    pub data_id: DataId,
    pub direction: Direction,
}

/// Drives one coupled pair's time-window protocol over `M` (§4.6).
pub struct CouplingScheme<M: DistributedCommunication> {
    role: Role,
    kind: SchemeKind,
    state: State,
    t: f64,
    t_end: Option<f64>,
    window: u64,
    max_windows: u64,
    iteration: u32,
    max_iterations: Option<u32>,
    dt: f64,
    sub_step_elapsed: f64,
    exchanges: Vec<ExchangeSpec>,
    measures: Vec<ConvergenceMeasure>,
    measure_states: Vec<MeasureState>,
    data: CouplingDataRegistry,
    m2n: M,
    required_actions: HashSet<&'static str>,
}

impl<M: DistributedCommunication> CouplingScheme<M> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        role: Role,
        kind: SchemeKind,
        dt: f64,
        max_windows: u64,
        t_end: Option<f64>,
        max_iterations: Option<u32>,
        exchanges: Vec<ExchangeSpec>,
        measures: Vec<ConvergenceMeasure>,
        m2n: M,
    ) -> Self {
        let measure_states = measures.iter().map(|_| MeasureState::default()).collect();
        Self {
            role,
            kind,
            state: State::Uninitialized,
            t: 0.0,
            t_end,
            window: 0,
            max_windows,
            iteration: 1,
            max_iterations,
            dt,
            sub_step_elapsed: 0.0,
            exchanges,
            measures,
            measure_states,
            data: CouplingDataRegistry::new(),
            m2n,
            required_actions: HashSet::new(),
        }
    }

    /// Registers a field for exchange (§4.5, called during configuration,
    /// before [`Self::initialize`]).
    pub fn register_data(&mut self, data: CouplingData) {
        self.data.register(data);
    }

    pub fn data_registry(&self) -> &CouplingDataRegistry {
        &self.data
    }

    pub fn data_registry_mut(&mut self) -> &mut CouplingDataRegistry {
        &mut self.data
    }

    pub fn window(&self) -> u64 {
        self.window
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn is_coupling_ongoing(&self) -> bool {
        self.state != State::Finalized
    }

    /// True once the accumulated sub-step time equals the configured window
    /// size, i.e. the scheme is about to actually exchange on the next
    /// `advance()` call (§4.6).
    pub fn is_time_window_complete(&self) -> bool {
        self.sub_step_elapsed >= self.dt - 1e-9
    }

    pub fn is_action_required(&self, tag: &str) -> bool {
        self.required_actions.contains(tag)
    }

    pub fn mark_action_fulfilled(&mut self, tag: &str) -> Result<()> {
        if self.required_actions.remove(tag) {
            Ok(())
        } else {
            Err(UsageError::UnrequiredAction(tag.to_string()).into())
        }
    }

    /// Exchanges fields flagged `initialize = true`, then transitions to
    /// `INITIALIZED`. Returns the maximum `dt` the solver may take before the
    /// next `advance()` call (§6).
    pub fn initialize(&mut self) -> Result<f64> {
        if self.state != State::Uninitialized {
            return Err(UsageError::AlreadyInitialized.into());
        }
        let span = info_span!("initialize");
        let _enter = span.enter();

        let initial: Vec<(MeshId, DataId, Direction)> = self
            .exchanges
            .iter()
            .filter(|ex| self.data.get(ex.mesh_id, ex.data_id).map(|d| d.initialize).unwrap_or(false))
            .map(|ex| (ex.mesh_id, ex.data_id, ex.direction))
            .collect();

        for (mesh_id, data_id, direction) in initial {
            let field = self.data.require_mut(mesh_id, data_id)?;
            let dim = field.dimension;
            let constraint = field.constraint;
            match direction {
                Direction::Send => self.m2n.send(field.new_values(), dim, constraint)?,
                Direction::Receive => self.m2n.receive(field.new_values_mut(), dim, constraint)?,
            }
            // Promote the initial exchange into `values` now, so the first
            // real window's convergence check compares against this seeded
            // steady state rather than an unwritten zero (§4.6 initialize()).
            self.data.require_mut(mesh_id, data_id)?.swap();
        }

        self.window = 0;
        self.iteration = 1;
        self.sub_step_elapsed = 0.0;
        self.state = State::Initialized;
        if self.kind.is_implicit() {
            self.data.store_all();
            self.required_actions.insert(ACTION_WRITE_ITERATION_CHECKPOINT);
        }
        info!(window = self.window, "coupling scheme initialized");
        Ok(self.dt)
    }

    /// Called once the solver's internal step over `computed_dt` completes.
    /// Only actually exchanges once `is_time_window_complete()` would return
    /// true for the accumulated sub-steps; until then the solver's writes
    /// keep accumulating in `new_values` untouched (§4.6 sub-cycling).
    /// Returns the maximum `dt` for the next call.
    pub fn advance(&mut self, computed_dt: f64) -> Result<f64> {
        match self.state {
            State::Uninitialized | State::Finalized => return Err(UsageError::NotInitialized.into()),
            State::Initialized | State::Advancing => {}
        }

        self.sub_step_elapsed += computed_dt;
        if self.sub_step_elapsed < self.dt - 1e-9 {
            return Ok(self.dt - self.sub_step_elapsed);
        }

        self.state = State::Advancing;
        let span = info_span!("advance", window = self.window, iteration = self.iteration);
        let _enter = span.enter();

        let converged = self.exchange_round()?;
        self.sub_step_elapsed = 0.0;

        if self.kind.is_implicit() {
            let exhausted = self.max_iterations.map_or(false, |max| self.iteration >= max);
            if converged || exhausted {
                if !converged {
                    warn!(
                        window = self.window,
                        iteration = self.iteration,
                        "implicit window did not converge within max_iterations; committing anyway"
                    );
                }
                self.commit();
            } else {
                self.rollback();
                self.state = State::Initialized;
                return Ok(self.dt);
            }
        } else {
            self.commit();
        }

        let window_limit_reached = self.window >= self.max_windows;
        let time_limit_reached = matches!(self.t_end, Some(end) if self.t >= end - 1e-9);
        self.state = if window_limit_reached || time_limit_reached {
            info!(window = self.window, t = self.t, "coupling finalized");
            State::Finalized
        } else {
            State::Initialized
        };
        Ok(self.dt)
    }

    pub fn finalize(&mut self) {
        self.state = State::Finalized;
        info!(window = self.window, "coupling scheme finalized");
    }

    fn exchange_round(&mut self) -> Result<bool> {
        match (self.kind.is_serial(), self.role) {
            (true, Role::First) => {
                self.send_all()?;
                self.receive_all()?;
            }
            (true, Role::Second) => {
                self.receive_all()?;
                self.send_all()?;
            }
            (false, _) => {
                self.send_all()?;
                self.receive_all()?;
            }
        }

        if !self.kind.is_implicit() {
            return Ok(true);
        }

        match self.role {
            Role::Second => {
                let satisfied = self.evaluate_convergence();
                self.m2n.send_bool(satisfied)?;
                Ok(satisfied)
            }
            Role::First => Ok(self.m2n.receive_bool()?),
        }
    }

    fn send_all(&mut self) -> Result<()> {
        for ex in &self.exchanges {
            if ex.direction != Direction::Send {
                continue;
            }
            let field = self.data.require(ex.mesh_id, ex.data_id)?;
            self.m2n.send(field.new_values(), field.dimension, field.constraint)?;
        }
        Ok(())
    }

    fn receive_all(&mut self) -> Result<()> {
        for ex in &self.exchanges {
            if ex.direction != Direction::Receive {
                continue;
            }
            let field = self.data.require_mut(ex.mesh_id, ex.data_id)?;
            let (dim, constraint) = (field.dimension, field.constraint);
            self.m2n.receive(field.new_values_mut(), dim, constraint)?;
        }
        Ok(())
    }

    /// Evaluates every configured measure against the data it names and
    /// combines them by conjunction (§4.6). Only the second participant
    /// calls this — the first trusts the broadcast verdict, so both sides
    /// can never disagree due to floating-point drift.
    fn evaluate_convergence(&mut self) -> bool {
        let mut all_satisfied = true;
        for (measure, state) in self.measures.iter().zip(self.measure_states.iter_mut()) {
            let field = match (measure.mesh_id(), measure.data_id()) {
                (Some(mesh_id), Some(data_id)) => self.data.get(mesh_id, data_id),
                _ => None,
            };
            all_satisfied &= measure.is_satisfied(field, self.iteration, state);
        }
        all_satisfied
    }

    fn commit(&mut self) {
        self.data.swap_all();
        self.window += 1;
        self.iteration = 1;
        self.t += self.dt;
        for state in &mut self.measure_states {
            ConvergenceMeasure::reset(state);
        }
        if self.kind.is_implicit() {
            self.data.store_all();
            self.required_actions.insert(ACTION_WRITE_ITERATION_CHECKPOINT);
        }
        info!(window = self.window, t = self.t, "window committed");
    }

    fn rollback(&mut self) {
        self.data.restore_all();
        for data in self.data.iter_mut() {
            data.reset_new_values();
        }
        self.iteration += 1;
        self.required_actions.insert(ACTION_READ_ITERATION_CHECKPOINT);
        warn!(window = self.window, iteration = self.iteration, "iteration rolled back");
    }
}
