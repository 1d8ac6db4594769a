//! A small feed-forward network backend for the [`Predictor`] contract.
//!
//! Fully connected, sigmoid activations throughout, one scalar output.
//! Trained with plain per-sample gradient descent for a capped number of
//! epochs with an early-stop criterion on a bounded error metric. The
//! networks involved are tiny (tens of inputs, one or two hidden layers),
//! so there is no batching or vectorization: a straightforward loop is
//! fast enough to train an intent in well under a second.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::classifier::Predictor;
use crate::classifier::sample::TrainingSample;
use crate::error::{ParlanceError, Result};

/// Default cap on training epochs.
pub const DEFAULT_MAX_EPOCHS: usize = 10_000;

/// Gradient descent step size.
const LEARNING_RATE: f64 = 0.7;

/// Early-stop criterion evaluated once per epoch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum StopCondition {
    /// Stop once mean squared error over the epoch falls below the bound.
    MeanSquaredError(f64),
    /// Stop once no sample misses its target by more than the tolerance.
    BitFail(f64),
}

/// Training schedule for a [`FeedForwardNetwork`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrainParams {
    /// Hard cap on epochs.
    pub max_epochs: usize,
    /// Early-stop criterion.
    pub stop: StopCondition,
}

impl TrainParams {
    /// Schedule stopping on mean squared error.
    pub fn mean_squared_error(desired: f64) -> Self {
        TrainParams {
            max_epochs: DEFAULT_MAX_EPOCHS,
            stop: StopCondition::MeanSquaredError(desired),
        }
    }

    /// Schedule stopping once every sample is within `tolerance`.
    pub fn bit_fail(tolerance: f64) -> Self {
        TrainParams {
            max_epochs: DEFAULT_MAX_EPOCHS,
            stop: StopCondition::BitFail(tolerance),
        }
    }
}

/// One fully connected layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Layer {
    /// Row-major weights: `weights[out][in]`.
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
}

impl Layer {
    fn random(inputs: usize, outputs: usize, rng: &mut StdRng) -> Self {
        let weights = (0..outputs)
            .map(|_| (0..inputs).map(|_| rng.random_range(-0.5..0.5)).collect())
            .collect();
        let biases = (0..outputs).map(|_| rng.random_range(-0.5..0.5)).collect();
        Layer { weights, biases }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// A small sigmoid feed-forward network with one scalar output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedForwardNetwork {
    layers: Vec<Layer>,
    params: TrainParams,
}

impl FeedForwardNetwork {
    /// Create an untrained network with the given layer sizes, e.g.
    /// `[input_dim, hidden, 1]`. Weight initialization is seeded from the
    /// layer layout so repeated runs start from the same point.
    pub fn new(layer_sizes: &[usize], params: TrainParams) -> Self {
        let seed = layer_sizes
            .iter()
            .fold(0x70a3_d70a_u64, |acc, &s| acc.rotate_left(7) ^ s as u64);
        let mut rng = StdRng::seed_from_u64(seed);

        let layers = layer_sizes
            .windows(2)
            .map(|pair| Layer::random(pair[0], pair[1], &mut rng))
            .collect();

        FeedForwardNetwork { layers, params }
    }

    /// Forward pass returning the activations of every layer, input first.
    fn forward(&self, input: &[f64]) -> Vec<Vec<f64>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.to_vec());

        for layer in &self.layers {
            let prev = activations.last().map(Vec::as_slice).unwrap_or(input);
            let mut out = Vec::with_capacity(layer.biases.len());
            for (row, bias) in layer.weights.iter().zip(&layer.biases) {
                let sum: f64 = row.iter().zip(prev).map(|(w, a)| w * a).sum();
                out.push(sigmoid(sum + bias));
            }
            activations.push(out);
        }

        activations
    }

    /// One gradient-descent step for a single sample. Returns the output
    /// error before the update.
    fn step(&mut self, sample: &TrainingSample) -> f64 {
        let activations = self.forward(&sample.input);
        let output = activations.last().and_then(|a| a.first()).copied().unwrap_or(0.0);
        let error = output - sample.target;

        // Output layer delta, then propagate backward through the hidden
        // layers using the sigmoid derivative a * (1 - a).
        let mut deltas: Vec<Vec<f64>> = vec![Vec::new(); self.layers.len()];
        deltas[self.layers.len() - 1] = vec![error * output * (1.0 - output)];

        for l in (0..self.layers.len().saturating_sub(1)).rev() {
            let next_layer = &self.layers[l + 1];
            let next_deltas = deltas[l + 1].clone();
            let acts = &activations[l + 1];
            let mut layer_deltas = Vec::with_capacity(acts.len());
            for j in 0..acts.len() {
                let propagated: f64 = next_layer
                    .weights
                    .iter()
                    .zip(&next_deltas)
                    .map(|(row, d)| row[j] * d)
                    .sum();
                layer_deltas.push(propagated * acts[j] * (1.0 - acts[j]));
            }
            deltas[l] = layer_deltas;
        }

        for (l, layer) in self.layers.iter_mut().enumerate() {
            let prev = &activations[l];
            for (k, delta) in deltas[l].iter().enumerate() {
                for (w, a) in layer.weights[k].iter_mut().zip(prev) {
                    *w -= LEARNING_RATE * delta * a;
                }
                layer.biases[k] -= LEARNING_RATE * delta;
            }
        }

        error
    }
}

impl Predictor for FeedForwardNetwork {
    fn train(&mut self, samples: &[TrainingSample]) -> Result<()> {
        if samples.is_empty() {
            return Err(ParlanceError::training("no training samples"));
        }

        for _ in 0..self.params.max_epochs {
            let mut squared_error = 0.0;
            let mut bit_fails = 0usize;

            for sample in samples {
                let error = self.step(sample);
                squared_error += error * error;
                if let StopCondition::BitFail(tolerance) = self.params.stop {
                    if error.abs() > tolerance {
                        bit_fails += 1;
                    }
                }
            }

            let stop = match self.params.stop {
                StopCondition::MeanSquaredError(desired) => {
                    squared_error / samples.len() as f64 <= desired
                }
                StopCondition::BitFail(_) => bit_fails == 0,
            };
            if stop {
                break;
            }
        }

        Ok(())
    }

    fn predict(&self, input: &[f64]) -> f64 {
        self.forward(input)
            .last()
            .and_then(|a| a.first())
            .copied()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learns_linearly_separable_data() {
        let samples = vec![
            TrainingSample::new(vec![1.0, 0.0, 0.0], 1.0),
            TrainingSample::new(vec![0.9, 0.1, 0.0], 1.0),
            TrainingSample::new(vec![0.0, 0.0, 1.0], 0.0),
            TrainingSample::new(vec![0.0, 0.1, 0.9], 0.0),
        ];

        let mut net = FeedForwardNetwork::new(&[3, 2, 1], TrainParams::bit_fail(0.1));
        net.train(&samples).unwrap();

        let positive = net.predict(&[1.0, 0.0, 0.0]);
        let negative = net.predict(&[0.0, 0.0, 1.0]);
        assert!(positive > 0.8, "positive scored {positive}");
        assert!(negative < 0.2, "negative scored {negative}");
    }

    #[test]
    fn test_intermediate_targets() {
        let samples = vec![
            TrainingSample::new(vec![1.0, 0.0], 1.0),
            TrainingSample::new(vec![0.0, 1.0], 0.0),
            TrainingSample::new(vec![1.0, 1.0], 0.6),
        ];

        let mut net =
            FeedForwardNetwork::new(&[2, 4, 1], TrainParams::mean_squared_error(0.001));
        net.train(&samples).unwrap();

        let mid = net.predict(&[1.0, 1.0]);
        assert!((0.3..0.9).contains(&mid), "lenient sample scored {mid}");
        assert!(net.predict(&[1.0, 0.0]) > mid);
        assert!(net.predict(&[0.0, 1.0]) < mid);
    }

    #[test]
    fn test_empty_samples_is_error() {
        let mut net = FeedForwardNetwork::new(&[2, 1], TrainParams::bit_fail(0.1));
        assert!(net.train(&[]).is_err());
    }

    #[test]
    fn test_serialization_round_trip() {
        let samples = vec![
            TrainingSample::new(vec![1.0, 0.0], 1.0),
            TrainingSample::new(vec![0.0, 1.0], 0.0),
        ];
        let mut net = FeedForwardNetwork::new(&[2, 2, 1], TrainParams::bit_fail(0.1));
        net.train(&samples).unwrap();

        let bytes = bincode::serialize(&net).unwrap();
        let reloaded: FeedForwardNetwork = bincode::deserialize(&bytes).unwrap();
        assert_eq!(net.predict(&[1.0, 0.0]), reloaded.predict(&[1.0, 0.0]));
    }
}
