use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;

use superlotto_db::models::{Combination, Draw, Method, PrizeTier};

use crate::config::EngineConfig;
use crate::learning::MethodWeights;
use crate::predictors::build_predictor;
use crate::verify::tier_index;

const MAX_DETAILS: usize = 50;

/// Méthodes rejouées quand l'appelant n'en précise aucune.
pub const DEFAULT_METHODS: [Method; 8] = [
    Method::Hot,
    Method::Missing,
    Method::Balanced,
    Method::Ml,
    Method::Bayesian,
    Method::Markov,
    Method::MonteCarlo,
    Method::Ensemble,
];

#[derive(Debug, Clone, Serialize)]
pub struct WinningDetail {
    pub issue: String,
    pub predicted: Combination,
    pub actual: Combination,
    pub front_hits: u8,
    pub back_hits: u8,
    pub tier: PrizeTier,
    pub payout: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub method: Method,
    pub total_issues: usize,
    pub total_predictions: usize,
    pub avg_front_hit: f64,
    pub avg_back_hit: f64,
    pub front_hit_rate: f64,
    pub back_hit_rate: f64,
    /// Tier1 en tête.
    pub tier_counts: [u32; 7],
    pub total_prize_count: u32,
    pub prize_rate: f64,
    pub high_prize_count: u32,
    pub total_cost: u64,
    pub total_payout: u64,
    pub profit_loss: i64,
    pub roi: f64,
    pub best_issue: Option<String>,
    pub best_tier: PrizeTier,
    pub details: Vec<WinningDetail>,
}

impl BacktestResult {
    /// Appréciation courte du résultat.
    pub fn evaluation(&self) -> String {
        let mut text = if self.roi > 0.0 {
            format!("Gain de {:.1}%, très bon résultat. ", self.roi)
        } else if self.roi > -30.0 {
            format!("Perte de {:.1}%, résultat correct. ", self.roi.abs())
        } else {
            format!("Perte de {:.1}%, résultat médiocre. ", self.roi.abs())
        };

        text.push_str(&format!("Taux de gain {:.1}%, ", self.prize_rate));
        text.push_str(if self.prize_rate > 10.0 {
            "fréquence élevée. "
        } else if self.prize_rate > 5.0 {
            "fréquence moyenne. "
        } else {
            "fréquence faible. "
        });

        if self.high_prize_count > 0 {
            text.push_str(&format!("{} gros lots (rang 3 ou mieux). ", self.high_prize_count));
        } else {
            text.push_str("Aucun gros lot. ");
        }

        text.push_str(&format!("{} grilles testées.", self.total_predictions));
        if self.roi < -50.0 && self.high_prize_count == 0 {
            text.push_str(" Méthode à remplacer.");
        } else if self.roi > 0.0 || self.high_prize_count > 0 {
            text.push_str(" Méthode à conserver.");
        }
        text
    }
}

/// Rejoue des méthodes sur les tirages récents et mesure gains et rentabilité.
pub struct Backtester<'a> {
    config: &'a EngineConfig,
    weights: MethodWeights,
}

impl<'a> Backtester<'a> {
    pub fn new(config: &'a EngineConfig, weights: MethodWeights) -> Self {
        Self { config, weights }
    }

    pub fn run(
        &self,
        history: &[Draw],
        methods: &[Method],
        issue_count: usize,
        per_issue: usize,
        seed: u64,
    ) -> Vec<BacktestResult> {
        self.run_with_progress(history, methods, issue_count, per_issue, seed, |_| {})
    }

    /// `history[0]` = tirage le plus récent. Les méthodes tournent en parallèle,
    /// chacune avec son propre générateur dérivé de `seed`. Résultats triés par ROI décroissant.
    pub fn run_with_progress<F>(
        &self,
        history: &[Draw],
        methods: &[Method],
        issue_count: usize,
        per_issue: usize,
        seed: u64,
        on_done: F,
    ) -> Vec<BacktestResult>
    where
        F: Fn(&BacktestResult) + Sync,
    {
        let targets = &history[..issue_count.min(history.len())];
        if targets.is_empty() || per_issue == 0 {
            log::warn!("Aucun tirage à rejouer");
            return Vec::new();
        }
        log::info!(
            "Backtest : {} méthodes, {} tirages, {} grilles par tirage",
            methods.len(),
            targets.len(),
            per_issue
        );

        let mut results: Vec<BacktestResult> = methods
            .par_iter()
            .enumerate()
            .map(|(i, &method)| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                let result = self.run_method(method, history, targets, per_issue, &mut rng);
                log::info!(
                    "{} : taux de gain {:.2}%, ROI {:.2}%",
                    method,
                    result.prize_rate,
                    result.roi
                );
                on_done(&result);
                result
            })
            .collect();

        results.sort_by(|a, b| b.roi.partial_cmp(&a.roi).unwrap_or(std::cmp::Ordering::Equal));
        results
    }

    fn run_method(
        &self,
        method: Method,
        history: &[Draw],
        targets: &[Draw],
        per_issue: usize,
        rng: &mut StdRng,
    ) -> BacktestResult {
        let prizes = &self.config.prizes;
        let predictor = build_predictor(method, self.config, &self.weights);

        let mut total_predictions = 0usize;
        let mut front_hits_sum = 0u64;
        let mut back_hits_sum = 0u64;
        let mut tier_counts = [0u32; 7];
        let mut total_payout = 0u64;
        let mut best_tier = PrizeTier::NoPrize;
        let mut best_issue = None;
        let mut details = Vec::new();

        // du plus ancien au plus récent
        for draw in targets.iter().rev() {
            let actual = *draw.numbers();
            for predicted in predictor.predict_multiple(history, per_issue, rng) {
                let v = prizes.evaluate(&predicted, &actual);
                total_predictions += 1;
                front_hits_sum += v.front_hits as u64;
                back_hits_sum += v.back_hits as u64;

                let payout = prizes.payout(v.tier);
                total_payout += payout;
                if let Some(idx) = tier_index(v.tier) {
                    tier_counts[idx] += 1;
                    details.push(WinningDetail {
                        issue: draw.issue().to_string(),
                        predicted,
                        actual,
                        front_hits: v.front_hits,
                        back_hits: v.back_hits,
                        tier: v.tier,
                        payout,
                    });
                }
                if v.tier.rank() > best_tier.rank() {
                    best_tier = v.tier;
                    best_issue = Some(draw.issue().to_string());
                }
            }
        }

        details.sort_by(|a, b| b.tier.rank().cmp(&a.tier.rank()));
        details.truncate(MAX_DETAILS);

        let n = total_predictions.max(1) as f64;
        let avg_front_hit = front_hits_sum as f64 / n;
        let avg_back_hit = back_hits_sum as f64 / n;
        let total_prize_count: u32 = tier_counts.iter().sum();
        let high_prize_count: u32 = tier_counts[..3].iter().sum();
        let total_cost = total_predictions as u64 * prizes.cost_per_combination;
        let profit_loss = total_payout as i64 - total_cost as i64;
        let roi = if total_cost > 0 { profit_loss as f64 * 100.0 / total_cost as f64 } else { 0.0 };

        BacktestResult {
            method,
            total_issues: targets.len(),
            total_predictions,
            avg_front_hit,
            avg_back_hit,
            front_hit_rate: avg_front_hit * 100.0 / 5.0,
            back_hit_rate: avg_back_hit * 100.0 / 2.0,
            tier_counts,
            total_prize_count,
            prize_rate: total_prize_count as f64 * 100.0 / n,
            high_prize_count,
            total_cost,
            total_payout,
            profit_loss,
            roi,
            best_issue,
            best_tier,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_test_draws;

    fn fast_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.monte_carlo.direct_samples = 500;
        config.monte_carlo.mcmc_samples = 500;
        config.monte_carlo.importance_samples = 500;
        config
    }

    #[test]
    fn test_backtest_accounting() {
        let config = fast_config();
        let draws = make_test_draws(80);
        let backtester = Backtester::new(&config, MethodWeights::uniform());
        let results = backtester.run(&draws, &[Method::Hot, Method::Markov], 10, 3, 42);

        assert_eq!(results.len(), 2);
        for r in &results {
            assert_eq!(r.total_issues, 10);
            assert_eq!(r.total_predictions, 30);
            assert_eq!(r.total_cost, 60);
            assert_eq!(r.profit_loss, r.total_payout as i64 - 60);
            assert!(r.details.len() <= MAX_DETAILS);
            assert_eq!(r.details.len() as u32, r.total_prize_count.min(MAX_DETAILS as u32));
            let expected_roi = r.profit_loss as f64 * 100.0 / 60.0;
            assert!((r.roi - expected_roi).abs() < 1e-9);
        }
        assert!(results[0].roi >= results[1].roi, "tri par ROI décroissant");
    }

    #[test]
    fn test_backtest_reproducible() {
        let config = fast_config();
        let draws = make_test_draws(60);
        let backtester = Backtester::new(&config, MethodWeights::uniform());
        let a = backtester.run(&draws, &[Method::Ml, Method::Balanced], 5, 2, 7);
        let b = backtester.run(&draws, &[Method::Ml, Method::Balanced], 5, 2, 7);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.method, y.method);
            assert_eq!(x.total_payout, y.total_payout);
            assert_eq!(x.tier_counts, y.tier_counts);
        }
    }

    #[test]
    fn test_backtest_empty_history() {
        let config = fast_config();
        let backtester = Backtester::new(&config, MethodWeights::uniform());
        assert!(backtester.run(&[], &DEFAULT_METHODS, 10, 5, 1).is_empty());
    }

    #[test]
    fn test_evaluation_mentions_roi() {
        let config = fast_config();
        let draws = make_test_draws(30);
        let backtester = Backtester::new(&config, MethodWeights::uniform());
        let results = backtester.run(&draws, &[Method::Hot], 5, 1, 3);
        let text = results[0].evaluation();
        assert!(text.contains("grilles testées"));
    }
}
