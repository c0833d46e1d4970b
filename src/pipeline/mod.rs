//! Sequencing of pipeline phases.
//!
//! Every phase implements [`CommandHandler`]. A [`Pipeline`] first initializes
//! all of its handlers, in order, and only then executes them, in order. The
//! first failure of either step stops the pipeline; handlers that already
//! executed are not undone.

mod context;

pub use context::RunContext;

use async_trait::async_trait;
use tokio::time::Duration;

use crate::error::{ReleaseError, Result};

/// A pipeline phase with a two-step lifecycle
#[async_trait]
pub trait CommandHandler: Send {
    /// Phase name used in logs
    fn name(&self) -> &str;

    /// Cheap, local checks. No side effects beyond reading configuration.
    fn init(&mut self) -> Result<()>;

    /// Do the work
    async fn exec(&mut self, ctx: &RunContext, args: &[String]) -> Result<()>;
}

/// Lifecycle state of one handler inside a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    /// Not initialized yet
    Created,
    /// `init` succeeded
    Initialized,
    /// `init` failed
    FailedInit,
    /// `exec` succeeded
    Succeeded,
    /// `exec` failed
    Failed,
}

/// Ordered list of handlers run as one unit
#[derive(Default)]
pub struct Pipeline {
    handlers: Vec<Box<dyn CommandHandler>>,
    states: Vec<HandlerState>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("handlers", &self.names())
            .field("states", &self.states)
            .finish()
    }
}

impl Pipeline {
    /// Empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler
    pub fn push(&mut self, handler: Box<dyn CommandHandler>) {
        self.handlers.push(handler);
        self.states.push(HandlerState::Created);
    }

    /// Builder-style [`Self::push`]
    pub fn with(mut self, handler: impl CommandHandler + 'static) -> Self {
        self.push(Box::new(handler));
        self
    }

    /// Handler names, in run order
    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Lifecycle state of every handler, in run order
    pub fn states(&self) -> &[HandlerState] {
        &self.states
    }

    /// Initialize every handler, then execute every handler.
    ///
    /// Returns the first error unchanged. No handler executes unless all of
    /// them initialized.
    pub async fn run(&mut self, ctx: &RunContext, args: &[String]) -> Result<()> {
        for (handler, state) in self.handlers.iter_mut().zip(self.states.iter_mut()) {
            log::debug!("initializing {}", handler.name());
            if let Err(e) = handler.init() {
                *state = HandlerState::FailedInit;
                return Err(e);
            }
            *state = HandlerState::Initialized;
        }

        for (handler, state) in self.handlers.iter_mut().zip(self.states.iter_mut()) {
            if ctx.is_cancelled() {
                return Err(ReleaseError::Cancelled);
            }
            log::info!("running {}", handler.name());
            if let Err(e) = handler.exec(ctx, args).await {
                *state = HandlerState::Failed;
                return Err(e);
            }
            *state = HandlerState::Succeeded;
        }

        Ok(())
    }

    /// [`Self::run`] bounded by `timeout`.
    ///
    /// When the deadline elapses the context is cancelled and
    /// [`ReleaseError::Timeout`] is returned.
    pub async fn run_with_timeout(
        &mut self,
        ctx: &RunContext,
        args: &[String],
        timeout: Duration,
    ) -> Result<()> {
        match tokio::time::timeout(timeout, self.run(ctx, args)).await {
            Ok(result) => result,
            Err(_) => {
                ctx.cancel();
                Err(ReleaseError::Timeout { timeout })
            }
        }
    }
}
