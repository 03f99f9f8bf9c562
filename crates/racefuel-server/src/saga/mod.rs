//! Minimal saga runner
//!
//! A saga is an ordered list of [`SagaStep`]s sharing a mutable context.
//! When step *n* fails, the runner awaits `compensate` for steps
//! *n-1 .. 0* in reverse order and returns step *n*'s error. A failing
//! compensation is logged as an integrity violation and never replaces the
//! original error.

use async_trait::async_trait;
use std::fmt::Display;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

/// One forward action and its undo
#[async_trait]
pub trait SagaStep<C, E>: Send + Sync
where
    C: Send + Sync,
    E: Send,
{
    fn name(&self) -> &'static str;

    async fn execute(&self, ctx: &mut C) -> Result<(), E>;

    /// Undo a successful `execute`; best-effort
    async fn compensate(&self, _ctx: &C) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct Saga<C, E> {
    name: &'static str,
    steps: Vec<Box<dyn SagaStep<C, E>>>,
}

impl<C, E> Saga<C, E>
where
    C: Send + Sync + 'static,
    E: Send + Display + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: impl SagaStep<C, E> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Execute every step in order, compensating on the first failure
    pub async fn run(&self, ctx: &mut C) -> Result<(), E> {
        for (index, step) in self.steps.iter().enumerate() {
            debug!(saga = self.name, step = step.name(), "Executing saga step");

            if let Err(err) = step.execute(ctx).await {
                warn!(
                    saga = self.name,
                    step = step.name(),
                    error = %err,
                    "Saga step failed, compensating completed steps"
                );
                self.compensate(index, ctx).await;
                return Err(err);
            }
        }

        info!(saga = self.name, steps = self.steps.len(), "Saga completed");
        Ok(())
    }

    /// Run on a dedicated task so a dropped request future cannot stop
    /// compensation halfway. Returns the context on success.
    pub async fn run_detached(self, mut ctx: C) -> Result<Result<C, E>, JoinError> {
        tokio::spawn(async move { self.run(&mut ctx).await.map(|()| ctx) }).await
    }

    async fn compensate(&self, failed_index: usize, ctx: &C) {
        for step in self.steps[..failed_index].iter().rev() {
            match step.compensate(ctx).await {
                Ok(()) => debug!(saga = self.name, step = step.name(), "Compensated saga step"),
                Err(err) => error!(
                    saga = self.name,
                    step = step.name(),
                    integrity_violation = true,
                    error = %err,
                    "Compensation failed; resource left behind"
                ),
            }
        }
    }
}
