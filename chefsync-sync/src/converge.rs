//! The why-run gate every mutating step passes through.
//!
//! Planning code is shared between real and why-run runs; they diverge only
//! inside [`Converge::converge_by`].

use std::sync::Arc;

use chefsync_core::Reporter;

use crate::error::SyncError;

pub struct Converge {
    why_run: bool,
    reporter: Arc<dyn Reporter>,
}

impl Converge {
    pub fn new(why_run: bool, reporter: Arc<dyn Reporter>) -> Self {
        Self { why_run, reporter }
    }

    pub fn why_run(&self) -> bool {
        self.why_run
    }

    pub fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }

    /// Run `action`, or in why-run mode report `Would <description>` and skip it.
    ///
    /// # Errors
    ///
    /// A failing action is wrapped in [`SyncError::Action`] naming `description`.
    pub fn converge_by<F>(&self, description: &str, action: F) -> Result<(), SyncError>
    where
        F: FnOnce() -> Result<(), SyncError>,
    {
        if self.why_run {
            self.reporter.info(&format!("Would {description}"));
            return Ok(());
        }
        action().map_err(|source| SyncError::Action {
            action: description.to_string(),
            source: Box::new(source),
        })?;
        tracing::debug!("done: {description}");
        Ok(())
    }
}
