use rand::rngs::StdRng;
use rand::Rng;

use superlotto_db::models::{Combination, Draw, Method, Zone};

use super::Predictor;
use crate::analysis::frequency::FrequencyAnalyzer;
use crate::analysis::missing::MissingAnalyzer;
use crate::analysis::number_scores;
use crate::learning::MethodWeights;
use crate::sampler::{assemble, roulette_select};

/// Combine les heuristiques de base selon les poids appris par méthode.
pub struct AdaptivePredictor {
    frequency: FrequencyAnalyzer,
    missing: MissingAnalyzer,
    weights: MethodWeights,
    initial_weight: f64,
}

impl AdaptivePredictor {
    pub fn new(
        frequency: FrequencyAnalyzer,
        missing: MissingAnalyzer,
        weights: MethodWeights,
        initial_weight: f64,
    ) -> Self {
        Self { frequency, missing, weights, initial_weight }
    }

    fn weight(&self, method: Method) -> f64 {
        self.weights.get(method).unwrap_or(self.initial_weight)
    }

    /// Score brut de chaque numéro de la zone, indexé par `numéro - 1`.
    pub fn scores(&self, history: &[Draw], zone: Zone, rng: &mut StdRng) -> Vec<f64> {
        let mut scores = vec![0.0; zone.size()];
        let depth = zone.pick_count() * 2;

        let mut add_ranked = |ranked: Vec<u8>, weight: f64| {
            let len = ranked.len();
            for (i, n) in ranked.into_iter().enumerate() {
                scores[(n - 1) as usize] += (len - i) as f64 * 10.0 * weight;
            }
        };
        add_ranked(self.frequency.hot_ranked(history, zone, depth), self.weight(Method::Hot));
        add_ranked(self.missing.high_missing_ranked(history, zone, depth), self.weight(Method::Missing));
        add_ranked(self.missing.due_ranked(history, zone, depth), self.weight(Method::Balanced));

        let composite = number_scores(history, zone, &self.frequency, &self.missing);
        let w_adaptive = self.weight(Method::Adaptive);
        let w_ml = self.weight(Method::Ml);
        for (score, c) in scores.iter_mut().zip(composite) {
            *score += c * w_adaptive / 10.0;
            *score += rng.random::<f64>() * 5.0 * w_ml;
        }
        scores
    }

    fn predict_zone(&self, history: &[Draw], zone: Zone, rng: &mut StdRng) -> Vec<u8> {
        let scores = self.scores(history, zone, rng);
        let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
        let shifted: Vec<(u8, f64)> = zone.numbers().zip(scores.iter().map(|s| s - min + 1.0)).collect();
        roulette_select(&shifted, zone, rng)
    }
}

impl Predictor for AdaptivePredictor {
    fn method(&self) -> Method {
        Method::Adaptive
    }

    fn predict(&self, history: &[Draw], rng: &mut StdRng) -> Combination {
        let front = self.predict_zone(history, Zone::Front, rng);
        let back = self.predict_zone(history, Zone::Back, rng);
        assemble(&front, &back)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_test_draws;
    use rand::SeedableRng;

    fn predictor(weights: MethodWeights) -> AdaptivePredictor {
        AdaptivePredictor::new(FrequencyAnalyzer::new(30), MissingAnalyzer::new(500), weights, 0.2)
    }

    #[test]
    fn test_missing_rows_use_initial_weight() {
        let p = predictor(MethodWeights::default());
        assert_eq!(p.weight(Method::Hot), 0.2);
    }

    #[test]
    fn test_hot_weight_favors_hot_numbers() {
        let draws = make_test_draws(90);
        let mut weights = MethodWeights::default();
        for m in Method::ALL {
            weights.set(m, 0.0);
        }
        weights.set(Method::Hot, 1.0);
        let p = predictor(weights);

        let mut rng = StdRng::seed_from_u64(12);
        let scores = p.scores(&draws, Zone::Front, &mut rng);
        let hottest = FrequencyAnalyzer::new(30).hot_ranked(&draws, Zone::Front, 1)[0];
        let best = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(scores[(hottest - 1) as usize], best);
    }
}
