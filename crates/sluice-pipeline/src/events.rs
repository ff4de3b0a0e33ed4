//! Build events published by pipelines.
//!
//! The dev server subscribes to these to decide what to reload.

use std::path::PathBuf;

use sluice_config::BuildTarget;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

/// Outcome of a pipeline task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    /// A pipeline wrote its output
    Completed {
        task: String,
        category: String,
        target: BuildTarget,
        /// Destination directory
        dest: PathBuf,
        /// Logical paths written, relative to `dest`
        paths: Vec<String>,
    },

    /// A pipeline failed; nothing was written
    Failed { task: String, message: String },
}

/// Broadcast channel for [`BuildEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BuildEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BuildEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Events with no subscriber are dropped.
    pub fn publish(&self, event: BuildEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
