use rand::rngs::StdRng;
use rand::Rng;

use superlotto_db::models::{Combination, Draw, Method, Zone};

use super::Predictor;
use crate::sampler::{assemble, random_combination, top_k};

const HISTORY: usize = 300;
const MIN_DRAWS: usize = 50;
const FREQ_PERIOD: usize = 30;
const TREND_PERIOD: usize = 5;
const RELATION_PERIOD: usize = 50;

/// Poids des sept apprenants : fréquence, retard, tendance, périodicité, voisinage,
/// position, fréquence longue.
pub const LEARNER_WEIGHTS: [f64; 7] = [0.20, 0.20, 0.15, 0.10, 0.15, 0.10, 0.10];

/// Somme pondérée de sept scores élémentaires par numéro.
pub struct GradientBoostPredictor;

fn share_containing(draws: &[Draw], zone: Zone, n: u8) -> f64 {
    if draws.is_empty() {
        return 0.0;
    }
    draws.iter().filter(|d| d.zone(zone).contains(&n)).count() as f64 / draws.len() as f64
}

impl GradientBoostPredictor {
    pub fn new() -> Self {
        Self
    }

    fn missing_score(draws: &[Draw], zone: Zone, n: u8) -> f64 {
        let gap = draws
            .iter()
            .position(|d| d.zone(zone).contains(&n))
            .unwrap_or(draws.len()) as f64;
        let avg = draws.len() as f64 / zone.pick_count() as f64;
        if gap >= avg * 0.8 && gap <= avg * 1.5 {
            1.0
        } else if gap > avg * 1.5 {
            0.7
        } else {
            0.3
        }
    }

    fn relation_score(draws: &[Draw], zone: Zone, n: u8) -> f64 {
        let window = &draws[..RELATION_PERIOD.min(draws.len())];
        if window.is_empty() {
            return 0.5;
        }
        let near = window
            .iter()
            .flat_map(|d| d.zone(zone).iter())
            .filter(|&&b| (b as i16 - n as i16).abs() <= 3)
            .count();
        (near as f64 / window.len() as f64 * 2.0).min(1.0)
    }

    fn position_score(zone: Zone, n: u8) -> f64 {
        let max = zone.size() as u8;
        if n == 1 || n == max {
            0.3
        } else if n == 2 || n == max - 1 {
            0.5
        } else {
            0.8
        }
    }

    /// Score total de chaque numéro de la zone, indexé par `numéro - 1`.
    pub fn scores(history: &[Draw], zone: Zone, rng: &mut StdRng) -> Vec<f64> {
        let draws = &history[..HISTORY.min(history.len())];
        let recent = &draws[..FREQ_PERIOD.min(draws.len())];
        let trend = &draws[..TREND_PERIOD.min(draws.len())];

        zone.numbers()
            .map(|n| {
                let periodic = if draws.is_empty() { 0.5 } else { rng.random::<f64>() * 0.3 + 0.35 };
                let learners = [
                    share_containing(recent, zone, n),
                    Self::missing_score(draws, zone, n),
                    share_containing(trend, zone, n),
                    periodic,
                    Self::relation_score(draws, zone, n),
                    Self::position_score(zone, n),
                    share_containing(draws, zone, n),
                ];
                learners.iter().zip(LEARNER_WEIGHTS).map(|(s, w)| s * w).sum::<f64>()
            })
            .collect()
    }
}

impl Default for GradientBoostPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for GradientBoostPredictor {
    fn method(&self) -> Method {
        Method::GradientBoost
    }

    fn predict(&self, history: &[Draw], rng: &mut StdRng) -> Combination {
        if history.len() < MIN_DRAWS {
            return random_combination(rng);
        }
        let pick = |zone: Zone, rng: &mut StdRng| -> Vec<u8> {
            let scores = Self::scores(history, zone, rng);
            top_k(&scores, zone.pick_count()).into_iter().map(|i| (i + 1) as u8).collect()
        };
        let front = pick(Zone::Front, rng);
        let back = pick(Zone::Back, rng);
        assemble(&front, &back)
    }
}
