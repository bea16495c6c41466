use rand::rngs::StdRng;

use superlotto_db::models::{Combination, Draw, Method, Zone};

use super::Predictor;
use crate::sampler::{assemble, fill_zone, top_k};

const HISTORY: usize = 200;
const HISTORICAL_WEIGHT: f64 = 0.7;
const THEORETICAL_WEIGHT: f64 = 0.3;

/// Postérieur = mode d'une Beta (vraisemblance) × prior mixte historique/théorique.
pub struct BayesianPredictor;

impl BayesianPredictor {
    pub fn new() -> Self {
        Self
    }

    /// Probabilité a posteriori normalisée de chaque numéro, indexée par `numéro - 1`.
    pub fn posterior(history: &[Draw], zone: Zone) -> Vec<f64> {
        let draws = &history[..HISTORY.min(history.len())];
        if draws.is_empty() {
            return vec![1.0 / zone.size() as f64; zone.size()];
        }

        let mut counts = vec![0usize; zone.size()];
        for draw in draws {
            for &n in draw.zone(zone) {
                counts[(n - 1) as usize] += 1;
            }
        }

        let pick = zone.pick_count() as f64;
        let total_numbers = pick * draws.len() as f64;
        let theoretical = 1.0 / zone.size() as f64;

        let unnormalized: Vec<f64> = counts
            .iter()
            .map(|&count| {
                let count = count as f64;
                let alpha = count + 1.0;
                let beta = total_numbers - count + (pick - 1.0);
                let likelihood = if alpha > 1.0 && beta > 1.0 {
                    ((alpha - 1.0) / (alpha + beta - 2.0)).clamp(0.0, 1.0)
                } else if alpha > 1.0 {
                    1.0
                } else {
                    0.5
                };
                let prior = HISTORICAL_WEIGHT * count / draws.len() as f64 + THEORETICAL_WEIGHT * theoretical;
                likelihood * prior
            })
            .collect();

        let total: f64 = unnormalized.iter().sum();
        if total <= 0.0 {
            return vec![theoretical; zone.size()];
        }
        unnormalized.iter().map(|p| p / total).collect()
    }

    fn predict_zone(history: &[Draw], zone: Zone, rng: &mut StdRng) -> Vec<u8> {
        let posterior = Self::posterior(history, zone);
        let selected = top_k(&posterior, zone.pick_count())
            .into_iter()
            .map(|i| (i + 1) as u8)
            .collect();
        fill_zone(selected, zone, rng)
    }
}

impl Default for BayesianPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for BayesianPredictor {
    fn method(&self) -> Method {
        Method::Bayesian
    }

    fn predict(&self, history: &[Draw], rng: &mut StdRng) -> Combination {
        let front = Self::predict_zone(history, Zone::Front, rng);
        let back = Self::predict_zone(history, Zone::Back, rng);
        assemble(&front, &back)
    }
}
