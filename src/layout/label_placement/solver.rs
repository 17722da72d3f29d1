// Iterative relaxation: Initialized -> Iterating -> (Converged | IterationLimitReached).

use super::forces::{ForceField, explosion_offsets};
use super::geometry::{BBox, Point, clamp_center_to_area};
use serde::Serialize;

/// Step gain kept after a label reverses direction.
const REVERSAL_DECAY: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    Initialized,
    Iterating,
    Converged,
    IterationLimitReached,
}

impl SolverState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SolverState::Converged | SolverState::IterationLimitReached
        )
    }
}

/// How a relaxation run ended. Hitting the limit is a best-effort result, not
/// an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    Converged,
    IterationLimitReached,
}

#[derive(Debug, Clone)]
pub(super) struct Relaxation {
    pub centers: Vec<Point>,
    pub iterations: usize,
    pub status: SolverStatus,
    pub last_displacement: f32,
}

pub(super) struct Solver<'a> {
    field: ForceField<'a>,
    area: Option<BBox>,
    centers: Vec<Point>,
    /// Per-label step gain in (0, 1], never raised again.
    gain: Vec<f32>,
    previous: Vec<Point>,
    state: SolverState,
    iterations: usize,
    last_displacement: f32,
}

impl<'a> Solver<'a> {
    pub fn new(field: ForceField<'a>, centers: Vec<Point>, area: Option<BBox>) -> Self {
        let count = centers.len();
        Self {
            field,
            area,
            centers,
            gain: vec![1.0; count],
            previous: vec![Point::default(); count],
            state: SolverState::Initialized,
            iterations: 0,
            last_displacement: 0.0,
        }
    }

    /// Advance by one transition and return the new state.
    pub fn step(&mut self) -> SolverState {
        self.state = match self.state {
            SolverState::Initialized => self.initialize(),
            SolverState::Iterating => self.iterate(),
            terminal => terminal,
        };
        self.state
    }

    pub fn run(mut self) -> Relaxation {
        while !self.step().is_terminal() {}
        let status = match self.state {
            SolverState::Converged => SolverStatus::Converged,
            _ => SolverStatus::IterationLimitReached,
        };
        Relaxation {
            centers: self.centers,
            iterations: self.iterations,
            status,
            last_displacement: self.last_displacement,
        }
    }

    fn initialize(&mut self) -> SolverState {
        if self.centers.is_empty() {
            return SolverState::Converged;
        }
        let offsets = explosion_offsets(&self.field, &self.centers);
        for idx in 0..self.centers.len() {
            let moved = self.centers[idx] + offsets[idx];
            self.centers[idx] = self.clamp(idx, moved);
        }
        SolverState::Iterating
    }

    fn iterate(&mut self) -> SolverState {
        let cfg = self.field.config;
        if self.iterations >= cfg.iter_lim {
            return SolverState::IterationLimitReached;
        }
        let forces = self.field.accumulate(&self.centers);
        let mut total = 0.0f32;
        for (idx, force) in forces.into_iter().enumerate() {
            let delta = self.damped_step(idx, force);
            let before = self.centers[idx];
            let after = self.clamp(idx, before + delta);
            total += after.distance(before);
            self.centers[idx] = after;
        }
        self.iterations += 1;
        self.last_displacement = total;
        if total < cfg.tolerance {
            SolverState::Converged
        } else {
            SolverState::Iterating
        }
    }

    /// Damped and capped step for label `idx`. Every direction reversal cuts
    /// the label's gain for the rest of the run.
    fn damped_step(&mut self, idx: usize, force: Point) -> Point {
        let cfg = self.field.config;
        let mut delta = limit_step(force * (cfg.damping * self.gain[idx]), cfg.max_step);
        if delta.dot(self.previous[idx]) < 0.0 {
            self.gain[idx] *= REVERSAL_DECAY;
            delta = delta * REVERSAL_DECAY;
        }
        self.previous[idx] = delta;
        delta
    }

    fn clamp(&self, idx: usize, center: Point) -> Point {
        match &self.area {
            Some(area) => {
                let (w, h) = self.field.sizes[idx];
                clamp_center_to_area(center, w, h, area)
            }
            None => center,
        }
    }
}

/// Drop non-finite steps and cap the step length.
fn limit_step(delta: Point, max_step: f32) -> Point {
    if !delta.is_finite() {
        return Point::default();
    }
    let len = delta.length();
    if max_step > 0.0 && len > max_step {
        delta * (max_step / len)
    } else {
        delta
    }
}
