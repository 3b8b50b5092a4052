//! Sequential step execution.
//!
//! A build is a list of [`Step`]s run in order against one [`StateBag`].
//! Cancellation is cooperative: the [`Runner`] checks the flag before each
//! step starts and never interrupts a step that is already running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::state::StateBag;

/// What the runner should do after a step returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// Proceed to the next step.
    Continue,
    /// Stop the build. Remaining steps are not started.
    Halt,
}

/// A single unit of work in a build.
pub trait Step {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Execute the step.
    fn run(&mut self, ctx: &RunContext, state: &mut StateBag) -> StepAction;

    /// Release anything acquired in [`Step::run`]. Called once for every
    /// step that was started, in reverse order, after the build stops.
    fn cleanup(&mut self, _state: &mut StateBag) {}
}

/// Cancellation handle shared between a runner and whoever drives it.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    cancelled: Arc<AtomicBool>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that no further steps are started.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// How a run of the step list ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every step returned [`StepAction::Continue`].
    Completed,
    /// A step returned [`StepAction::Halt`].
    Halted,
    /// Cancellation was observed before a step started.
    Cancelled,
}

/// Runs steps in order until one halts or the context is cancelled.
#[derive(Default)]
pub struct Runner {
    steps: Vec<Box<dyn Step>>,
}

impl Runner {
    pub fn new(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    /// Append a step.
    pub fn push(&mut self, step: Box<dyn Step>) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run all steps, then clean up the started ones in reverse order.
    pub fn run(&mut self, ctx: &RunContext, state: &mut StateBag) -> RunOutcome {
        let mut outcome = RunOutcome::Completed;
        let mut started = 0;

        for step in self.steps.iter_mut() {
            if ctx.is_cancelled() {
                warn!(step = step.name(), "build cancelled, not starting step");
                outcome = RunOutcome::Cancelled;
                break;
            }

            debug!(step = step.name(), "running step");
            started += 1;
            if step.run(ctx, state) == StepAction::Halt {
                info!(step = step.name(), "step halted the build");
                outcome = RunOutcome::Halted;
                break;
            }
        }

        for step in self.steps[..started].iter_mut().rev() {
            debug!(step = step.name(), "cleaning up step");
            step.cleanup(state);
        }

        outcome
    }
}
