//! Training metrics.

use std::collections::VecDeque;

use super::loss::psnr;

/// Metrics of a single optimization step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrainMetrics {
    /// Step counter, starting at 1.
    pub step: usize,
    /// Reconstruction loss (MSE).
    pub loss: f32,
    /// Signals in the batch.
    pub batch_size: usize,
}

impl TrainMetrics {
    /// Create new metrics.
    pub fn new(step: usize, loss: f32, batch_size: usize) -> Self {
        Self {
            step,
            loss,
            batch_size,
        }
    }

    /// PSNR of the loss, assuming signals in `[0, 1]`.
    pub fn psnr(&self) -> f32 {
        psnr(self.loss)
    }

    /// Log the metrics at info level.
    pub fn log(&self, prefix: &str) {
        log::info!(
            "{} step={} mse={:.6} psnr={:.2}dB batch={}",
            prefix,
            self.step,
            self.loss,
            self.psnr(),
            self.batch_size,
        );
    }
}

/// Running average of losses over a fixed window.
#[derive(Debug, Clone)]
pub struct MetricsTracker {
    window_size: usize,
    losses: VecDeque<f32>,
    total_steps: usize,
}

impl MetricsTracker {
    /// Create a tracker averaging over the last `window_size` steps.
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window_size,
            losses: VecDeque::with_capacity(window_size),
            total_steps: 0,
        }
    }

    /// Record a step.
    pub fn add(&mut self, metrics: &TrainMetrics) {
        if self.losses.len() == self.window_size {
            self.losses.pop_front();
        }
        self.losses.push_back(metrics.loss);
        self.total_steps += 1;
    }

    /// Mean loss over the window, 0 when empty.
    pub fn average_loss(&self) -> f32 {
        if self.losses.is_empty() {
            0.0
        } else {
            self.losses.iter().sum::<f32>() / self.losses.len() as f32
        }
    }

    /// Steps recorded so far.
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }
}
