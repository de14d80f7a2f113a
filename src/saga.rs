use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};

type Compensation = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Ordered list of undo steps for a multi-step mutation. Each completed step
/// registers how to undo itself; on the first failure `compensate` unwinds
/// them newest first.
#[derive(Default)]
pub struct Saga {
    steps: Vec<(&'static str, Compensation)>,
}

impl Saga {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_failure<F>(&mut self, name: &'static str, undo: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.steps.push((name, Box::pin(undo)));
    }

    /// Number of registered undo steps.
    pub fn pending(&self) -> usize {
        self.steps.len()
    }

    /// The mutation succeeded; drop all undo steps.
    pub fn commit(self) {
        debug!(steps = self.pending(), "saga committed");
    }

    /// Runs undo steps in reverse order. Failures are logged only.
    pub async fn compensate(self) {
        for (name, undo) in self.steps.into_iter().rev() {
            match undo.await {
                Ok(()) => debug!(step = name, "compensated"),
                Err(e) => warn!(step = name, error = %e, "compensation failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder(
        log: &Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
        fail: bool,
    ) -> impl Future<Output = anyhow::Result<()>> + Send + 'static {
        let log = log.clone();
        async move {
            log.lock().unwrap().push(name);
            if fail {
                anyhow::bail!("{name} failed");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn compensates_in_reverse_order_and_continues_past_failures() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut saga = Saga::new();
        saga.on_failure("first", recorder(&log, "first", false));
        saga.on_failure("second", recorder(&log, "second", true));
        saga.on_failure("third", recorder(&log, "third", false));
        assert_eq!(saga.pending(), 3);

        saga.compensate().await;
        assert_eq!(*log.lock().unwrap(), vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn commit_skips_compensation() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut saga = Saga::new();
        saga.on_failure("undo", recorder(&log, "undo", false));
        saga.commit();
        assert!(log.lock().unwrap().is_empty());
    }
}
