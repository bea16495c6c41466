use std::collections::BTreeMap;

use rand::rngs::StdRng;

use superlotto_db::models::{Combination, Draw, Method, Zone};

use super::balanced::BalancedPredictor;
use super::bayesian::BayesianPredictor;
use super::gradient_boost::GradientBoostPredictor;
use super::hot::HotPredictor;
use super::markov::MarkovPredictor;
use super::missing::MissingPredictor;
use super::monte_carlo::MonteCarloPredictor;
use super::{frequency_analyzer, missing_analyzer, Predictor};
use crate::config::EngineConfig;
use crate::sampler::{assemble, top_k};

/// Membres de l'ensemble et leur poids par défaut.
pub const DEFAULT_WEIGHTS: [(Method, f64); 7] = [
    (Method::Hot, 0.15),
    (Method::Missing, 0.15),
    (Method::Balanced, 0.15),
    (Method::GradientBoost, 0.20),
    (Method::Bayesian, 0.10),
    (Method::Markov, 0.125),
    (Method::MonteCarlo, 0.125),
];

/// Vote pondéré : chaque membre prédit une fois, ses numéros reçoivent une masse égale,
/// les masses sont sommées selon le poids du membre.
pub struct EnsemblePredictor {
    members: Vec<Box<dyn Predictor>>,
    weights: Vec<f64>,
}

impl EnsemblePredictor {
    pub fn new(config: &EngineConfig) -> Self {
        let members: Vec<Box<dyn Predictor>> = vec![
            Box::new(HotPredictor::new(frequency_analyzer(config))),
            Box::new(MissingPredictor::new(missing_analyzer(config))),
            Box::new(BalancedPredictor::new(frequency_analyzer(config))),
            Box::new(GradientBoostPredictor::new()),
            Box::new(BayesianPredictor::new()),
            Box::new(MarkovPredictor::new()),
            Box::new(MonteCarloPredictor::new(config.monte_carlo.clone())),
        ];
        let weights = DEFAULT_WEIGHTS.iter().map(|&(_, w)| w).collect();
        Self { members, weights }
    }

    /// Ajuste les poids selon la précision observée : w_i ∝ précision_i × défaut_i.
    /// Retombe sur les poids par défaut si aucune précision n'est positive.
    pub fn with_accuracies(mut self, accuracies: &BTreeMap<Method, f64>) -> Self {
        let raw: Vec<f64> = DEFAULT_WEIGHTS
            .iter()
            .map(|(m, w)| accuracies.get(m).copied().unwrap_or(0.0).max(0.0) * w)
            .collect();
        let total: f64 = raw.iter().sum();
        self.weights = if total > 0.0 {
            raw.iter().map(|w| w / total).collect()
        } else {
            DEFAULT_WEIGHTS.iter().map(|&(_, w)| w).collect()
        };
        self
    }

    pub fn weights(&self) -> Vec<(Method, f64)> {
        self.members.iter().map(|m| m.method()).zip(self.weights.iter().copied()).collect()
    }

    /// Masse combinée de chaque numéro de la zone, indexée par `numéro - 1`.
    fn fuse(predictions: &[Combination], weights: &[f64], zone: Zone) -> Vec<f64> {
        let mut fused = vec![0.0; zone.size()];
        for (combination, &weight) in predictions.iter().zip(weights) {
            let numbers = zone.numbers_from(combination);
            let mass = 1.0 / numbers.len() as f64;
            for &n in numbers {
                fused[(n - 1) as usize] += mass * weight;
            }
        }
        fused
    }
}

impl Predictor for EnsemblePredictor {
    fn method(&self) -> Method {
        Method::Ensemble
    }

    fn predict(&self, history: &[Draw], rng: &mut StdRng) -> Combination {
        let predictions: Vec<Combination> = self.members.iter().map(|m| m.predict(history, rng)).collect();
        let select = |zone: Zone| -> Vec<u8> {
            let fused = Self::fuse(&predictions, &self.weights, zone);
            top_k(&fused, zone.pick_count()).into_iter().map(|i| (i + 1) as u8).collect()
        };
        assemble(&select(Zone::Front), &select(Zone::Back))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let sum: f64 = DEFAULT_WEIGHTS.iter().map(|&(_, w)| w).sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_with_accuracies_rescales() {
        let mut accuracies = BTreeMap::new();
        accuracies.insert(Method::Hot, 0.5);
        accuracies.insert(Method::Markov, 0.5);
        let ensemble = EnsemblePredictor::new(&EngineConfig::default()).with_accuracies(&accuracies);
        let weights: BTreeMap<Method, f64> = ensemble.weights().into_iter().collect();

        // 0.5×0.15 et 0.5×0.125, renormalisés
        assert!((weights[&Method::Hot] - 0.15 / 0.275).abs() < 1e-12);
        assert!((weights[&Method::Markov] - 0.125 / 0.275).abs() < 1e-12);
        assert_eq!(weights[&Method::Bayesian], 0.0);
    }

    #[test]
    fn test_with_zero_accuracies_keeps_defaults() {
        let ensemble = EnsemblePredictor::new(&EngineConfig::default()).with_accuracies(&BTreeMap::new());
        for ((_, w), (_, d)) in ensemble.weights().iter().zip(DEFAULT_WEIGHTS) {
            assert_eq!(*w, d);
        }
    }

    #[test]
    fn test_fuse_consensus_wins() {
        let a = Combination::new([1, 2, 3, 4, 5], [1, 2]).unwrap();
        let b = Combination::new([1, 2, 3, 4, 6], [1, 3]).unwrap();
        let c = Combination::new([1, 2, 3, 7, 8], [1, 4]).unwrap();
        let fused = EnsemblePredictor::fuse(&[a, b, c], &[0.4, 0.3, 0.3], Zone::Front);
        assert!((fused[0] - 0.2).abs() < 1e-12);
        assert_eq!(top_k(&fused, 5), vec![0, 1, 2, 3, 4]);
    }
}
