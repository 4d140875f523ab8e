// TrainConfig — Hyperparameters of the training loop
//
//   epochs         passes over the whole dataset
//   apply_every    parameters update on every global sample index i with
//                  (i + 1) % apply_every == 0; epochs j with
//                  j % apply_every == 0 are reported
//   learning_rate  step size of gradient descent
//
// Builder style:
//   let config = TrainConfig::default()
//       .with_epochs(500)
//       .with_apply_every(4)
//       .with_learning_rate(0.1);

use wren_core::{Error, Result};

/// Hyperparameters for [`Network::train`](crate::Network::train).
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// Number of passes over the dataset (default: 1).
    pub epochs: usize,
    /// Gradient application cadence in samples (default: 1).
    pub apply_every: usize,
    /// Gradient descent step size (default: 0.01).
    pub learning_rate: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 1,
            apply_every: 1,
            learning_rate: 0.01,
        }
    }
}

impl TrainConfig {
    /// Set the number of epochs.
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set the gradient application cadence.
    pub fn with_apply_every(mut self, apply_every: usize) -> Self {
        self.apply_every = apply_every;
        self
    }

    /// Set the learning rate.
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Reject values the training loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::config("epochs must be positive"));
        }
        validate_step(self.apply_every, self.learning_rate)
    }
}

pub(crate) fn validate_step(apply_every: usize, learning_rate: f64) -> Result<()> {
    if apply_every == 0 {
        return Err(Error::config("apply_every must be positive"));
    }
    if !(learning_rate.is_finite() && learning_rate > 0.0) {
        return Err(Error::config(format!(
            "learning rate must be positive and finite, got {learning_rate}"
        )));
    }
    Ok(())
}
