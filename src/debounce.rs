//! Decision debouncing: noisy per-frame labels into stable conditions.
//!
//! A classifier flickers. One frame sees the pan, the next sees a wok,
//! the one after that sees the pan again. The debouncer turns that
//! flicker into a stable decision by requiring the same derived condition
//! on threshold+1 consecutive results before announcing it.
//!
//! Counter rule: a matching result increments the run counter; a
//! differing result replaces the candidate and resets the counter to 1,
//! so the differing frame itself counts as the first of its own run.
//! With threshold T the announcement therefore lands on the (T+1)-th
//! consecutive result.
//!
//! Results are observed in arrival order. Two overlapping
//! classifications may complete out of capture order; the debouncer does
//! not care, because only the stabilized condition drives the UI.

use serde::Deserialize;

use crate::classify::Prediction;

/// A condition the cooking guide reacts to.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Nothing recognized in the guide box.
    #[default]
    None,
    FryingPan,
    BellPepper,
    Cucumber,
}

/// Ordered exact-match table from model class names to conditions.
///
/// Lookup scans the ranked prediction entries in order and takes the
/// first label present in the table. First match wins, not the
/// highest-confidence qualifying label; the table order only breaks ties
/// if a backend ever returned duplicate labels.
#[derive(Clone, Debug)]
pub struct LabelTable {
    entries: Vec<(String, Condition)>,
}

impl LabelTable {
    pub fn new(entries: Vec<(String, Condition)>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Derive the condition for one prediction, scanning the top
    /// `scan_depth` entries. Empty or unrecognized lists derive
    /// [`Condition::None`]; never an error.
    pub fn derive(&self, prediction: &Prediction, scan_depth: usize) -> Condition {
        for scored in prediction.top(scan_depth) {
            for (label, condition) in &self.entries {
                if scored.label == *label {
                    return *condition;
                }
            }
        }
        Condition::None
    }
}

/// How a stable condition is announced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireMode {
    /// Announce once per stable period. Used by the pan alignment screen,
    /// where the announcement places an object and must not repeat.
    SingleShot,
    /// Announce on every qualifying result. Used by the ingredient guide
    /// screen, where re-confirming only re-toggles overlay visibility.
    Continuous,
}

/// Debouncer tuning.
#[derive(Clone, Copy, Debug)]
pub struct DebouncePolicy {
    /// Run length must exceed this before a condition is stable.
    pub threshold: u32,
    /// How many ranked entries to scan per prediction.
    pub scan_depth: usize,
    pub fire: FireMode,
}

/// What one observation produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebounceEvent {
    /// The candidate condition has held long enough.
    Stable(Condition),
    /// The previously stable condition no longer holds. Emitted
    /// immediately on the first differing result, not debounced: the
    /// guide box must reappear without lag.
    Lost,
}

/// Run-length debouncer over derived conditions.
pub struct Debouncer {
    table: LabelTable,
    policy: DebouncePolicy,
    candidate: Condition,
    count: u32,
    stable: Option<Condition>,
    fired: bool,
}

impl Debouncer {
    pub fn new(table: LabelTable, policy: DebouncePolicy) -> Self {
        Self {
            table,
            policy,
            candidate: Condition::None,
            count: 0,
            stable: None,
            fired: false,
        }
    }

    /// Forget all run state. Called when a screen session restarts.
    pub fn reset(&mut self) {
        self.candidate = Condition::None;
        self.count = 0;
        self.stable = None;
        self.fired = false;
    }

    /// The condition currently announced as stable, if any.
    pub fn stable(&self) -> Option<Condition> {
        self.stable
    }

    /// Feed one classification result; returns the events it produced.
    pub fn observe(&mut self, prediction: &Prediction) -> Vec<DebounceEvent> {
        let derived = self.table.derive(prediction, self.policy.scan_depth);

        if derived == self.candidate {
            self.count = self.count.saturating_add(1);
        } else {
            self.candidate = derived;
            self.count = 1;
        }

        let mut events = Vec::new();

        if let Some(stable) = self.stable {
            if self.candidate != stable {
                self.stable = None;
                self.fired = false;
                events.push(DebounceEvent::Lost);
            }
        }

        if self.candidate != Condition::None && self.count > self.policy.threshold {
            match self.policy.fire {
                FireMode::SingleShot => {
                    if !self.fired {
                        self.fired = true;
                        self.stable = Some(self.candidate);
                        events.push(DebounceEvent::Stable(self.candidate));
                    }
                }
                FireMode::Continuous => {
                    self.stable = Some(self.candidate);
                    events.push(DebounceEvent::Stable(self.candidate));
                }
            }
        }

        events
    }
}
