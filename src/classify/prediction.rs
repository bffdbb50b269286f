//! Ranked classifier output.

/// One (label, confidence) pair from a classifier.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelScore {
    /// Model class name, e.g. "frying pan, frypan, skillet".
    pub label: String,
    /// Confidence in 0.0..=1.0.
    pub confidence: f32,
}

/// A ranked prediction list for one frame.
///
/// Backends produce the list already sorted by descending confidence; the
/// pipeline takes the top entries as-is and never re-sorts. An empty list
/// is a valid prediction meaning "nothing recognized", not an error.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Prediction {
    pub labels: Vec<LabelScore>,
}

impl Prediction {
    pub fn new(labels: Vec<LabelScore>) -> Self {
        Self { labels }
    }

    /// Build a prediction from (label, confidence) pairs, mostly for tests
    /// and scripted backends.
    pub fn from_pairs(pairs: &[(&str, f32)]) -> Self {
        Self {
            labels: pairs
                .iter()
                .map(|(label, confidence)| LabelScore {
                    label: (*label).to_string(),
                    confidence: *confidence,
                })
                .collect(),
        }
    }

    /// The top `k` entries in ranked order (fewer if the list is shorter).
    pub fn top(&self, k: usize) -> &[LabelScore] {
        &self.labels[..k.min(self.labels.len())]
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_clamps_to_list_length() {
        let pred = Prediction::from_pairs(&[("wok", 0.6), ("ladle", 0.2)]);
        assert_eq!(pred.top(5).len(), 2);
        assert_eq!(pred.top(1).len(), 1);
        assert_eq!(pred.top(1)[0].label, "wok");
    }

    #[test]
    fn empty_prediction_is_valid() {
        let pred = Prediction::default();
        assert!(pred.is_empty());
        assert!(pred.top(5).is_empty());
    }
}
