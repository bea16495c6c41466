pub mod adaptive;
pub mod balanced;
pub mod bayesian;
pub mod ensemble;
pub mod gradient_boost;
pub mod hot;
pub mod markov;
pub mod missing;
pub mod ml;
pub mod monte_carlo;

use std::collections::HashSet;

use rand::rngs::StdRng;

use superlotto_db::models::{Combination, Draw, Method};

use crate::analysis::frequency::FrequencyAnalyzer;
use crate::analysis::missing::MissingAnalyzer;
use crate::config::EngineConfig;
use crate::learning::MethodWeights;
use crate::sampler::random_combination;

/// Une stratégie de prédiction. `history[0]` = tirage le plus récent ; toute décision
/// aléatoire passe par le générateur fourni.
pub trait Predictor: Send + Sync {
    fn method(&self) -> Method;

    fn code(&self) -> &'static str {
        self.method().code()
    }

    fn name(&self) -> &'static str {
        self.method().default_label()
    }

    fn predict(&self, history: &[Draw], rng: &mut StdRng) -> Combination;

    /// Exactement `count` grilles distinctes : au plus `10 × count` appels à `predict`,
    /// puis complément par des grilles uniformes.
    fn predict_multiple(&self, history: &[Draw], count: usize, rng: &mut StdRng) -> Vec<Combination> {
        let mut seen: HashSet<Combination> = HashSet::with_capacity(count);
        let mut results = Vec::with_capacity(count);

        let mut attempts = 0;
        while results.len() < count && attempts < count * 10 {
            let combination = self.predict(history, rng);
            if seen.insert(combination) {
                results.push(combination);
            }
            attempts += 1;
        }

        while results.len() < count {
            let combination = random_combination(rng);
            if seen.insert(combination) {
                results.push(combination);
            }
        }

        results
    }
}

pub fn frequency_analyzer(config: &EngineConfig) -> FrequencyAnalyzer {
    FrequencyAnalyzer::new(config.analysis.hot_cold_period)
}

pub fn missing_analyzer(config: &EngineConfig) -> MissingAnalyzer {
    MissingAnalyzer::new(config.analysis.missing_period)
}

/// Instancie la stratégie associée à une méthode.
pub fn build_predictor(method: Method, config: &EngineConfig, weights: &MethodWeights) -> Box<dyn Predictor> {
    match method {
        Method::Hot => Box::new(hot::HotPredictor::new(frequency_analyzer(config))),
        Method::Missing => Box::new(missing::MissingPredictor::new(missing_analyzer(config))),
        Method::Balanced => Box::new(balanced::BalancedPredictor::new(frequency_analyzer(config))),
        Method::Ml => Box::new(ml::MlPredictor::new()),
        Method::Adaptive => Box::new(adaptive::AdaptivePredictor::new(
            frequency_analyzer(config),
            missing_analyzer(config),
            weights.clone(),
            config.learning.initial_weight,
        )),
        Method::Bayesian => Box::new(bayesian::BayesianPredictor::new()),
        Method::Markov => Box::new(markov::MarkovPredictor::new()),
        Method::MonteCarlo => Box::new(monte_carlo::MonteCarloPredictor::new(config.monte_carlo.clone())),
        Method::GradientBoost => Box::new(gradient_boost::GradientBoostPredictor::new()),
        Method::Ensemble => Box::new(ensemble::EnsemblePredictor::new(config).with_accuracies(weights.hit_rates())),
    }
}

pub fn all_predictors(config: &EngineConfig, weights: &MethodWeights) -> Vec<Box<dyn Predictor>> {
    Method::ALL
        .iter()
        .map(|&m| build_predictor(m, config, weights))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_test_draws;
    use rand::SeedableRng;
    use superlotto_db::models::Zone;

    fn is_valid(c: &Combination) -> bool {
        let zone_ok = |zone: Zone| {
            let numbers = zone.numbers_from(c);
            numbers.len() == zone.pick_count()
                && numbers.windows(2).all(|w| w[0] < w[1])
                && numbers.iter().all(|&n| n >= 1 && n as usize <= zone.size())
        };
        zone_ok(Zone::Front) && zone_ok(Zone::Back)
    }

    fn fast_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.monte_carlo.direct_samples = 2_000;
        config.monte_carlo.mcmc_samples = 1_000;
        config.monte_carlo.importance_samples = 1_000;
        config
    }

    #[test]
    fn test_registry_covers_all_methods() {
        let predictors = all_predictors(&fast_config(), &MethodWeights::uniform());
        assert_eq!(predictors.len(), Method::ALL.len());
        for (p, m) in predictors.iter().zip(Method::ALL) {
            assert_eq!(p.method(), m);
            assert_eq!(p.code(), m.code());
        }
    }

    #[test]
    fn test_predict_multiple_exact_valid_distinct() {
        let config = fast_config();
        let weights = MethodWeights::uniform();
        for history_len in [0usize, 5, 60, 200] {
            let history = make_test_draws(history_len);
            for predictor in all_predictors(&config, &weights) {
                let mut rng = StdRng::seed_from_u64(42);
                for count in [1usize, 5, 12] {
                    let combos = predictor.predict_multiple(&history, count, &mut rng);
                    assert_eq!(combos.len(), count, "{} : {} grilles", predictor.code(), combos.len());
                    assert!(combos.iter().all(is_valid), "{} : grille invalide", predictor.code());
                    let distinct: HashSet<_> = combos.iter().collect();
                    assert_eq!(distinct.len(), count, "{} : doublons", predictor.code());
                }
            }
        }
    }

    #[test]
    fn test_seeded_predictions_reproducible() {
        let config = fast_config();
        let weights = MethodWeights::uniform();
        let history = make_test_draws(120);
        for predictor in all_predictors(&config, &weights) {
            let a = predictor.predict(&history, &mut StdRng::seed_from_u64(7));
            let b = predictor.predict(&history, &mut StdRng::seed_from_u64(7));
            assert_eq!(a, b, "{} non reproductible", predictor.code());
        }
    }
}
