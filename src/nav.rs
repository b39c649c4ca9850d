//! Navigation seam used for login redirects and data refreshes.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session synchronizer fires navigation side effects and never waits on
//! them. A UI shell owns the real router and drains [`NavCommand`]s from a
//! [`ChannelRouter`].

use tokio::sync::mpsc;

/// Fire-and-forget router capability.
pub trait Router: Send + Sync {
    /// Navigate to `path`.
    fn push(&self, path: &str);

    /// Re-fetch server-rendered data for the current route without navigating.
    fn refresh(&self);
}

/// A navigation request forwarded to the UI shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavCommand {
    Push(String),
    Refresh,
}

/// Router that forwards every request over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelRouter {
    tx: mpsc::UnboundedSender<NavCommand>,
}

impl ChannelRouter {
    /// Create a router plus the receiving end the UI shell drains.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NavCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, command: NavCommand) {
        if self.tx.send(command).is_err() {
            tracing::debug!("navigation receiver dropped; command discarded");
        }
    }
}

impl Router for ChannelRouter {
    fn push(&self, path: &str) {
        tracing::debug!(%path, "navigate");
        self.forward(NavCommand::Push(path.to_string()));
    }

    fn refresh(&self) {
        tracing::debug!("refresh");
        self.forward(NavCommand::Refresh);
    }
}

#[cfg(test)]
#[path = "nav_test.rs"]
mod tests;
