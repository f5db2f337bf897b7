//! View-scoped background work.
//!
//! External calls (mnemonic, pronunciation) and feedback timers belong to the
//! view that started them. When the learner leaves that view the scope is
//! reset: running tasks are aborted and the generation counter moves on, so
//! any result still tagged with an older generation is dropped by the caller.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Default)]
pub struct ViewTasks {
    generation: u64,
    handles: Vec<JoinHandle<()>>,
}

impl ViewTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Number of tasks still running in this view.
    pub fn pending(&mut self) -> usize {
        self.handles.retain(|h| !h.is_finished());
        self.handles.len()
    }

    pub fn spawn<F>(&mut self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handles.retain(|h| !h.is_finished());
        self.handles.push(tokio::spawn(fut));
    }

    /// Abort everything in flight and start a new generation.
    pub fn reset(&mut self) -> usize {
        let aborted = self.pending();
        for h in self.handles.drain(..) {
            h.abort();
        }
        self.generation += 1;
        if aborted > 0 {
            debug!(target: "hanzi_hero", aborted, generation = self.generation, "View tasks cancelled");
        }
        aborted
    }
}

impl Drop for ViewTasks {
    fn drop(&mut self) {
        for h in self.handles.drain(..) {
            h.abort();
        }
    }
}
