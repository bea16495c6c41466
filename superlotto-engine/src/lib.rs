pub mod analysis;
pub mod backtest;
pub mod config;
pub mod error;
pub mod learning;
pub mod predictors;
pub mod prize;
pub mod sampler;
pub mod scorer;
pub mod service;
pub mod verify;

pub use error::{EngineError, EngineResult};
pub use service::Engine;

/// Historique synthétique, `draws[0]` = tirage le plus récent.
#[cfg(test)]
pub(crate) fn make_test_draws(n: usize) -> Vec<superlotto_db::models::Draw> {
    use superlotto_db::models::{Combination, Draw};

    (0..n)
        .map(|i| {
            let front: Vec<u8> = (0..5).map(|k| ((3 * i + 11 * k) % 35 + 1) as u8).collect();
            let back: Vec<u8> = (0..2).map(|k| ((5 * i + 6 * k) % 12 + 1) as u8).collect();
            Draw::new(
                format!("{}", 26000 + n - i),
                format!("2026-01-{:02}", (i % 28) + 1),
                Combination::from_slices(&front, &back).unwrap(),
            )
        })
        .collect()
}
