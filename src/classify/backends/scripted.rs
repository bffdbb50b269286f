use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use crate::classify::backend::ClassifierBackend;
use crate::classify::prediction::Prediction;

/// Scripted backend for tests. Returns a fixed sequence of predictions in
/// call order; once the script is exhausted it returns empty predictions.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Prediction>>,
    fail_always: bool,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Prediction>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fail_always: false,
        }
    }

    /// A backend whose every call fails, for slot-release tests.
    pub fn failing() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fail_always: true,
        }
    }

    /// Append a prediction to the remaining script.
    pub fn push(&self, prediction: Prediction) {
        crate::lock_unpoisoned(&self.script).push_back(prediction);
    }

    /// Predictions left in the script.
    pub fn remaining(&self) -> usize {
        crate::lock_unpoisoned(&self.script).len()
    }
}

impl ClassifierBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn classify(&self, _pixels: &[u8], _width: u32, _height: u32) -> Result<Prediction> {
        if self.fail_always {
            return Err(anyhow!("scripted failure"));
        }
        Ok(crate::lock_unpoisoned(&self.script)
            .pop_front()
            .unwrap_or_default())
    }
}
