// RGB → CMYK Example — Training a small sigmoid network from scratch
//
// Converting a colour from RGB to CMYK is a smooth, bounded mapping from
// [0,1]³ to [0,1]⁴, which makes it a good fit for sigmoid outputs:
//
//   K = 1 − max(R, G, B)
//   C = (1 − R − K) / (1 − K)      (0 when K = 1)
//   M = (1 − G − K) / (1 − K)
//   Y = (1 − B − K) / (1 − K)
//
// Architecture: Input(3) → Dense(3→8, sigmoid) → Dense(8→4, sigmoid)
//
// This example demonstrates:
//   1. Building layers from Weights → Bias → Sigmoid operations
//   2. Network::train with a TrainConfig (epochs, apply cadence, rate)
//   3. Progress reporting through tracing (RUST_LOG=info, or debug/trace)
//   4. Evaluating with Network::test and Network::infer

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wren::prelude::*;

fn rgb_to_cmyk(r: f64, g: f64, b: f64) -> [f64; 4] {
    let k = 1.0 - r.max(g).max(b);
    if k >= 1.0 {
        return [0.0, 0.0, 0.0, 1.0];
    }
    [
        (1.0 - r - k) / (1.0 - k),
        (1.0 - g - k) / (1.0 - k),
        (1.0 - b - k) / (1.0 - k),
        k,
    ]
}

fn dataset<R: Rng>(n: usize, rng: &mut R) -> (Vec<Matrix<f64>>, Vec<Matrix<f64>>) {
    (0..n)
        .map(|_| {
            let (r, g, b) = (rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>());
            (
                Matrix::from_array([[r, g, b]]),
                Matrix::from_array([rgb_to_cmyk(r, g, b)]),
            )
        })
        .unzip()
}

fn main() -> wren::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Wren — RGB → CMYK Example ===");
    println!();

    let mut rng = StdRng::seed_from_u64(2024);

    // 1. Training and evaluation data
    let (train_x, train_y) = dataset(64, &mut rng);
    let (test_x, test_y) = dataset(16, &mut rng);
    println!("Training samples: {}", train_x.len());
    println!("Test samples:     {}", test_x.len());
    println!();

    // 2. The network
    let mut net = Network::new(
        vec![Layer::dense(3, 8, &mut rng)?, Layer::dense(8, 4, &mut rng)?],
        MeanSquaredError,
    )?;
    println!("Network: Dense(3→8) → Dense(8→4), sigmoid activations");
    println!("  Total parameters: {}", net.num_parameters());
    println!();

    // 3. Training
    let config = TrainConfig::default()
        .with_epochs(2000)
        .with_apply_every(4)
        .with_learning_rate(0.5);
    let before = net.test(&test_x, &test_y)?;
    info!(loss = before, "test loss before training");

    let report = net.train(&train_x, &train_y, &config)?;
    for log in report.epochs.iter().filter(|l| l.epoch % 200 == 0) {
        println!("  Epoch {:>4} | Loss: {:.6}", log.epoch, log.loss);
    }
    println!("{:-<50}", "");
    println!("  Final training loss: {:.6}", report.final_loss);

    let after = net.test(&test_x, &test_y)?;
    println!("  Test loss: {before:.6} → {after:.6}");
    println!();

    // 4. A few predictions
    println!("Predictions after training:");
    for (r, g, b) in [(1.0, 0.0, 0.0), (0.0, 0.5, 1.0), (0.9, 0.9, 0.2)] {
        let y = net.infer(&Matrix::from_array([[r, g, b]]))?;
        let p = y.data();
        let t = rgb_to_cmyk(r, g, b);
        println!(
            "  ({r:.1},{g:.1},{b:.1}) → C {:.3} M {:.3} Y {:.3} K {:.3}   target: {:.3} {:.3} {:.3} {:.3}",
            p[0], p[1], p[2], p[3], t[0], t[1], t[2], t[3]
        );
    }

    println!();
    println!("=== Done! ===");
    Ok(())
}
