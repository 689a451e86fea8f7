use std::sync::{Arc, Mutex};

use crate::types::ViewportSize;

/// Records the rendered size of the floor-plan image on every layout pass
/// (initial mount, rotation, resize). Stays all-zero until the first pass
/// completes, which dependents treat as "not ready".
#[derive(Clone, Default)]
pub struct ViewportLayoutTracker {
    size: Arc<Mutex<ViewportSize>>,
}

impl ViewportLayoutTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report_layout(&self, width: f64, height: f64) {
        *self.size.lock().unwrap() = ViewportSize { width, height };
    }

    pub fn latest(&self) -> ViewportSize {
        *self.size.lock().unwrap()
    }

    pub fn is_ready(&self) -> bool {
        self.latest().is_ready()
    }
}
