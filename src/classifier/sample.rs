//! Training samples and duplicate-input conflict resolution.

use std::collections::HashMap;

/// One labeled feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    /// Input feature vector.
    pub input: Vec<f64>,
    /// Desired confidence output.
    pub target: f64,
}

impl TrainingSample {
    /// Create a new labeled sample.
    pub fn new(input: Vec<f64>, target: f64) -> Self {
        TrainingSample { input, target }
    }
}

/// Collapse samples that share an identical feature vector.
///
/// When duplicates disagree on the target, the surviving sample carries
/// the maximum of the targets. This biases toward not losing a positive
/// example to noisy negatives: sample construction routinely produces
/// the same vector once as a positive and once as a cross-intent
/// negative, and the positive must win.
pub fn resolve_conflicts(samples: Vec<TrainingSample>) -> Vec<TrainingSample> {
    let mut seen: HashMap<Vec<u64>, usize, ahash::RandomState> = HashMap::default();
    let mut resolved: Vec<TrainingSample> = Vec::with_capacity(samples.len());

    for sample in samples {
        // Key on the exact bit pattern; vectors are built from the same
        // arithmetic on both sides, so equal means bit-equal here.
        let key: Vec<u64> = sample.input.iter().map(|x| x.to_bits()).collect();
        match seen.get(&key) {
            Some(&index) => {
                if sample.target > resolved[index].target {
                    resolved[index].target = sample.target;
                }
            }
            None => {
                seen.insert(key, resolved.len());
                resolved.push(sample);
            }
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_conflicts_keeps_max_target() {
        let samples = vec![
            TrainingSample::new(vec![0.0, 1.0], 0.0),
            TrainingSample::new(vec![1.0, 1.0], 0.5),
            TrainingSample::new(vec![0.0, 1.0], 0.7),
        ];
        let resolved = resolve_conflicts(samples);
        assert_eq!(resolved.len(), 2);

        let conflicted = resolved
            .iter()
            .find(|s| s.input == vec![0.0, 1.0])
            .expect("sample for [0,1] must survive");
        assert_eq!(conflicted.target, 0.7);

        let untouched = resolved
            .iter()
            .find(|s| s.input == vec![1.0, 1.0])
            .expect("sample for [1,1] must survive");
        assert_eq!(untouched.target, 0.5);
    }

    #[test]
    fn test_resolve_conflicts_no_duplicates() {
        let samples = vec![
            TrainingSample::new(vec![0.0], 0.1),
            TrainingSample::new(vec![1.0], 0.9),
        ];
        assert_eq!(resolve_conflicts(samples.clone()), samples);
    }

    #[test]
    fn test_resolve_conflicts_positive_first() {
        // Order must not matter for which target survives.
        let samples = vec![
            TrainingSample::new(vec![0.5, 0.5], 1.0),
            TrainingSample::new(vec![0.5, 0.5], 0.0),
        ];
        let resolved = resolve_conflicts(samples);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].target, 1.0);
    }
}
