// Network — Layers plus a loss, and the loop that trains them
//
// TRAINING, PER SAMPLE:
//
//   1. forward the sample through every layer (recording traces)
//   2. dLoss/dPrediction from the loss function
//   3. backward through the layers in reverse order
//
// TWO GATES:
//
//   Let n be the number of samples, j the epoch and i the sample index
//   within the epoch. The global sample index is g = i + n·j.
//
//   apply gate:  parameters update during the backward of sample g when
//                (g + 1) % apply_every == 0. Gradients keep accumulating
//                in between, across epoch boundaries when n is not a
//                multiple of apply_every.
//   report gate: epoch j is reported (logged and kept in the TrainReport)
//                when j % apply_every == 0.
//
//   The two gates use the same cadence on different counters. This is the
//   established schedule; it is kept as-is.
//
// Evaluation (test/infer) goes through Layer::infer and never touches
// traces or gradients, so it only needs &self.

use std::fmt;
use std::ops::ControlFlow;

use tracing::{info, trace};
use wren_core::{Element, Error, Matrix, Result};

use crate::config::{validate_step, TrainConfig};
use crate::layer::Layer;
use crate::loss::Loss;

/// Log for a single reported epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochLog {
    /// Epoch number (0-indexed).
    pub epoch: usize,
    /// Average loss over this epoch's samples.
    pub loss: f64,
}

/// Outcome of [`Network::train`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    /// Logs of the epochs that passed the report gate.
    pub epochs: Vec<EpochLog>,
    /// Average loss of the last epoch that ran.
    pub final_loss: f64,
    /// Number of samples processed.
    pub samples_seen: usize,
}

impl fmt::Display for TrainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Training complete — {} samples", self.samples_seen)?;
        for log in &self.epochs {
            writeln!(f, "  epoch {}: loss = {:.6}", log.epoch, log.loss)?;
        }
        write!(f, "  final loss: {:.6}", self.final_loss)
    }
}

/// An ordered chain of layers and the loss used to train it.
pub struct Network<T: Element> {
    layers: Vec<Layer<T>>,
    loss: Box<dyn Loss<T>>,
}

impl<T: Element> Network<T> {
    /// Build a network. Adjacent layers must agree on width wherever both
    /// widths can be known up front.
    pub fn new(layers: Vec<Layer<T>>, loss: impl Loss<T> + 'static) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::config("network needs at least one layer"));
        }
        for (i, pair) in layers.windows(2).enumerate() {
            if let Some(width) = pair[0].output_width() {
                if width != pair[1].input_width() {
                    return Err(Error::config(format!(
                        "layer {i} outputs width {width} but layer {} expects {}",
                        i + 1,
                        pair[1].input_width()
                    )));
                }
            }
        }
        Ok(Network {
            layers,
            loss: Box::new(loss),
        })
    }

    /// The layers, in forward order.
    pub fn layers(&self) -> &[Layer<T>] {
        &self.layers
    }

    /// Mutable access to the layers, in forward order.
    pub fn layers_mut(&mut self) -> &mut [Layer<T>] {
        &mut self.layers
    }

    /// Total number of scalar parameters.
    pub fn num_parameters(&self) -> usize {
        self.layers.iter().map(Layer::num_parameters).sum()
    }

    /// Forward-propagate one input, no gradient bookkeeping.
    pub fn infer(&self, input: &Matrix<T>) -> Result<Matrix<T>> {
        let mut out = input.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            check_handoff(i, layer, &out)?;
            out = layer.infer(&out)?;
        }
        Ok(out)
    }

    /// Average loss over a dataset. Parameters are left untouched.
    pub fn test(&self, inputs: &[Matrix<T>], targets: &[Matrix<T>]) -> Result<f64> {
        check_dataset(inputs, targets)?;
        let mut total = 0.0;
        for (input, target) in inputs.iter().zip(targets) {
            let prediction = self.infer(input)?;
            total += self.loss.calculate_loss(&prediction, target)?;
        }
        Ok(total / inputs.len() as f64)
    }

    /// Train for `config.epochs` passes over the dataset.
    pub fn train(
        &mut self,
        inputs: &[Matrix<T>],
        targets: &[Matrix<T>],
        config: &TrainConfig,
    ) -> Result<TrainReport> {
        self.train_with(inputs, targets, config, |_| ControlFlow::Continue(()))
    }

    /// Like [`train`](Self::train), calling `on_epoch` after every epoch.
    ///
    /// Returning `ControlFlow::Break` from the callback stops training after
    /// that epoch; the report covers what ran.
    pub fn train_with<F>(
        &mut self,
        inputs: &[Matrix<T>],
        targets: &[Matrix<T>],
        config: &TrainConfig,
        mut on_epoch: F,
    ) -> Result<TrainReport>
    where
        F: FnMut(&EpochLog) -> ControlFlow<()>,
    {
        check_dataset(inputs, targets)?;
        config.validate()?;
        info!(
            epochs = config.epochs,
            samples = inputs.len(),
            parameters = self.num_parameters(),
            apply_every = config.apply_every,
            learning_rate = config.learning_rate,
            "starting training"
        );

        let mut report = TrainReport {
            epochs: Vec::new(),
            final_loss: 0.0,
            samples_seen: 0,
        };
        for epoch in 0..config.epochs {
            let loss = self.train_epoch(
                epoch,
                inputs,
                targets,
                config.apply_every,
                config.learning_rate,
            )?;
            report.samples_seen += inputs.len();
            report.final_loss = loss;

            let log = EpochLog { epoch, loss };
            if epoch % config.apply_every == 0 {
                info!(epoch, loss, "epoch complete");
                report.epochs.push(log);
            }
            if on_epoch(&log).is_break() {
                info!(epoch, "training stopped by callback");
                break;
            }
        }

        info!(
            final_loss = report.final_loss,
            samples_seen = report.samples_seen,
            "training complete"
        );
        Ok(report)
    }

    /// Run one epoch and return its average loss.
    ///
    /// `epoch` positions the epoch on the global sample counter that drives
    /// the apply gate.
    pub fn train_epoch(
        &mut self,
        epoch: usize,
        inputs: &[Matrix<T>],
        targets: &[Matrix<T>],
        apply_every: usize,
        learning_rate: f64,
    ) -> Result<f64> {
        check_dataset(inputs, targets)?;
        let n = inputs.len();
        let mut total = 0.0;
        for (i, (input, target)) in inputs.iter().zip(targets).enumerate() {
            total += self.train_sample(i + n * epoch, input, target, apply_every, learning_rate)?;
        }
        Ok(total / n as f64)
    }

    /// Train on a single sample at global index `global_index` and return
    /// its loss. Parameters update when `(global_index + 1) % apply_every == 0`.
    ///
    /// A failure partway through backward leaves updates already applied by
    /// later layers in place.
    pub fn train_sample(
        &mut self,
        global_index: usize,
        input: &Matrix<T>,
        target: &Matrix<T>,
        apply_every: usize,
        learning_rate: f64,
    ) -> Result<f64> {
        validate_step(apply_every, learning_rate)?;
        let prediction = self.forward(input)?;
        let loss = self.loss.calculate_loss(&prediction, target)?;
        let grad = self.loss.calculate_loss_gradient(&prediction, target)?;
        let apply_now = (global_index + 1) % apply_every == 0;
        self.backward(&grad, apply_now, learning_rate)?;
        trace!(sample = global_index, loss, apply_now, "sample trained");
        Ok(loss)
    }

    fn forward(&mut self, input: &Matrix<T>) -> Result<Matrix<T>> {
        let mut out = input.clone();
        for (i, layer) in self.layers.iter_mut().enumerate() {
            check_handoff(i, layer, &out)?;
            out = layer.forward(&out)?;
        }
        Ok(out)
    }

    fn backward(&mut self, grad: &Matrix<T>, train: bool, learning_rate: f64) -> Result<Matrix<T>> {
        let mut d = grad.clone();
        for layer in self.layers.iter_mut().rev() {
            d = layer.backward(&d, train, learning_rate)?;
        }
        Ok(d)
    }
}

impl<T: Element> fmt::Debug for Network<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("layers", &self.layers)
            .finish_non_exhaustive()
    }
}

// A width mismatch at layer 0 is the caller's input and surfaces as a shape
// error from the layer. Further in, it is a wiring mistake the constructor
// could not see (a layer with closure ops has no static output width).
fn check_handoff<T: Element>(index: usize, layer: &Layer<T>, out: &Matrix<T>) -> Result<()> {
    if index > 0 && out.columns() != layer.input_width() {
        return Err(Error::config(format!(
            "layer {} produced width {} but layer {index} expects {}",
            index - 1,
            out.columns(),
            layer.input_width()
        )));
    }
    Ok(())
}

fn check_dataset<T: Element>(inputs: &[Matrix<T>], targets: &[Matrix<T>]) -> Result<()> {
    if inputs.len() != targets.len() {
        return Err(Error::BatchSizeMismatch {
            inputs: inputs.len(),
            targets: targets.len(),
        });
    }
    if inputs.is_empty() {
        return Err(Error::config("dataset is empty"));
    }
    Ok(())
}
