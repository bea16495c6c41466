use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;

use superlotto_db::models::{Combination, Draw, Method, Zone};

use super::Predictor;
use crate::config::MonteCarloConfig;
use crate::sampler::{assemble, random_combination, random_zone, top_k};

const MIN_DRAWS: usize = 10;
/// Probabilité cible d'un numéro jamais sorti dans la fenêtre (Metropolis-Hastings).
const UNSEEN_TARGET: f64 = 0.01;

/// Trois estimateurs par simulation (rééchantillonnage direct, Metropolis-Hastings,
/// échantillonnage d'importance) dont les comptages sont additionnés.
pub struct MonteCarloPredictor {
    config: MonteCarloConfig,
}

impl MonteCarloPredictor {
    pub fn new(config: MonteCarloConfig) -> Self {
        Self { config }
    }

    /// Fréquence empirique de chaque numéro parmi toutes les boules de la zone ;
    /// `None` pour un numéro jamais sorti.
    fn target_distribution(draws: &[Draw], zone: Zone) -> Vec<Option<f64>> {
        let mut counts = vec![0usize; zone.size()];
        for draw in draws {
            for &n in draw.zone(zone) {
                counts[(n - 1) as usize] += 1;
            }
        }
        let total: usize = counts.iter().sum();
        counts
            .into_iter()
            .map(|c| if c > 0 { Some(c as f64 / total as f64) } else { None })
            .collect()
    }

    fn direct_sampling(&self, draws: &[Draw], zone: Zone, rng: &mut StdRng) -> Vec<u64> {
        let mut tally = vec![0u64; zone.size()];
        for _ in 0..self.config.direct_samples {
            if let Some(draw) = draws.choose(rng) {
                for &n in draw.zone(zone) {
                    tally[(n - 1) as usize] += 1;
                }
            }
        }
        tally
    }

    fn metropolis_hastings(&self, target: &[Option<f64>], zone: Zone, rng: &mut StdRng) -> Vec<u64> {
        let probability = |state: &[u8]| -> f64 {
            state
                .iter()
                .map(|&n| target[(n - 1) as usize].unwrap_or(UNSEEN_TARGET))
                .product()
        };

        let mut tally = vec![0u64; zone.size()];
        let mut current = random_zone(zone, rng);
        let mut current_p = probability(&current);

        for _ in 0..self.config.mcmc_samples {
            let mut proposal = current.clone();
            let changes = rng.random_range(0..3);
            for _ in 0..changes {
                let idx = rng.random_range(0..proposal.len());
                let free: Vec<u8> = zone.numbers().filter(|n| !proposal.contains(n)).collect();
                if let Some(&n) = free.choose(rng) {
                    proposal[idx] = n;
                }
            }

            let proposal_p = probability(&proposal);
            if rng.random::<f64>() < proposal_p / current_p {
                current = proposal;
                current_p = proposal_p;
            }

            for &n in &current {
                tally[(n - 1) as usize] += 1;
            }
        }
        tally
    }

    fn importance_sampling(&self, target: &[Option<f64>], zone: Zone, rng: &mut StdRng) -> Vec<u64> {
        let uniform = 1.0 / zone.size() as f64;
        let exponent = 1.0 / zone.pick_count() as f64;

        let mut tally = vec![0u64; zone.size()];
        for _ in 0..self.config.importance_samples {
            let sample = random_zone(zone, rng);
            let weight: f64 = sample
                .iter()
                .map(|&n| target[(n - 1) as usize].unwrap_or(uniform) / uniform)
                .product();
            // TODO: la normalisation par racine pick-ième reste empirique, à comparer à un
            // estimateur auto-normalisé sur un historique réel.
            let weighted = (weight.powf(exponent) * 1000.0) as u64;
            for &n in &sample {
                tally[(n - 1) as usize] += weighted;
            }
        }
        tally
    }

    /// Somme des trois comptages de la zone, indexée par `numéro - 1`.
    pub fn tally(&self, history: &[Draw], zone: Zone, rng: &mut StdRng) -> Vec<u64> {
        let draws = &history[..self.config.history.min(history.len())];
        let target = Self::target_distribution(draws, zone);

        let direct = self.direct_sampling(draws, zone, rng);
        let mcmc = self.metropolis_hastings(&target, zone, rng);
        let importance = self.importance_sampling(&target, zone, rng);

        direct
            .iter()
            .zip(&mcmc)
            .zip(&importance)
            .map(|((a, b), c)| a + b + c)
            .collect()
    }

    fn predict_zone(&self, history: &[Draw], zone: Zone, rng: &mut StdRng) -> Vec<u8> {
        let tally: Vec<f64> = self.tally(history, zone, rng).into_iter().map(|t| t as f64).collect();
        top_k(&tally, zone.pick_count()).into_iter().map(|i| (i + 1) as u8).collect()
    }
}

impl Predictor for MonteCarloPredictor {
    fn method(&self) -> Method {
        Method::MonteCarlo
    }

    fn predict(&self, history: &[Draw], rng: &mut StdRng) -> Combination {
        if history.len() < MIN_DRAWS {
            return random_combination(rng);
        }
        let front = self.predict_zone(history, Zone::Front, rng);
        let back = self.predict_zone(history, Zone::Back, rng);
        assemble(&front, &back)
    }
}
