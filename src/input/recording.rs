use crate::error::InjectorError;
use crate::input::intent::{InputInjector, MovementIntent};
use std::sync::{Arc, Mutex};

/// In-memory injector (for testing and embedding)
///
/// Clones share the same history, so a test can hand one clone to the
/// director and inspect the other.
#[derive(Clone)]
pub struct RecordingInjector {
    inner: Arc<Mutex<Recorded>>,
}

struct Recorded {
    intents: Vec<MovementIntent>,
    max_intents: usize,
    reject_recenters: bool,
}

impl RecordingInjector {
    pub fn new(max_intents: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Recorded {
                intents: Vec::with_capacity(max_intents.min(1000)),
                max_intents,
                reject_recenters: false,
            })),
        }
    }

    /// Make every subsequent `Recenter` fail, as a window that cannot be
    /// focused would.
    pub fn reject_recenters(&self, reject: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.reject_recenters = reject;
        }
    }

    pub fn intents(&self) -> Vec<MovementIntent> {
        self.inner
            .lock()
            .map(|inner| inner.intents.clone())
            .unwrap_or_default()
    }

    /// Returns and forgets everything recorded so far.
    pub fn take(&self) -> Vec<MovementIntent> {
        self.inner
            .lock()
            .map(|mut inner| std::mem::take(&mut inner.intents))
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.intents.clear();
        }
    }
}

impl Default for RecordingInjector {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl InputInjector for RecordingInjector {
    fn dispatch(&mut self, intent: MovementIntent) -> Result<(), InjectorError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| InjectorError::Rejected("recording lock poisoned".to_string()))?;
        if inner.reject_recenters && matches!(intent, MovementIntent::Recenter { .. }) {
            return Err(InjectorError::Rejected("recenter refused".to_string()));
        }
        inner.intents.push(intent);
        if inner.intents.len() > inner.max_intents {
            inner.intents.remove(0);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "RecordingInjector"
    }
}
