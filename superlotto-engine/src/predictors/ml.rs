use rand::rngs::StdRng;
use rand::Rng;

use superlotto_db::models::{Combination, Draw, Method, Zone};

use super::Predictor;
use crate::sampler::{assemble, roulette_select};

const HISTORY: usize = 100;
const FREQ_PERIOD: usize = 30;
const TREND_PERIOD: usize = 5;
const BASE_SCORE: f64 = 50.0;

/// Score heuristique par numéro (fréquence, retard, tendance, voisinage du dernier tirage),
/// puis sélection par roulette.
pub struct MlPredictor;

impl MlPredictor {
    pub fn new() -> Self {
        Self
    }

    /// Scores `(numéro, score)` de la zone ; le bruit est tiré dans `rng`.
    pub fn scores(history: &[Draw], zone: Zone, rng: &mut StdRng) -> Vec<(u8, f64)> {
        let draws = &history[..HISTORY.min(history.len())];
        if draws.is_empty() {
            return zone.numbers().map(|n| (n, BASE_SCORE)).collect();
        }

        let freq_period = FREQ_PERIOD.min(draws.len());
        let trend_period = TREND_PERIOD.min(draws.len());
        let avg_miss = FREQ_PERIOD as f64 / zone.pick_count() as f64;
        let latest = draws[0].zone(zone);

        zone.numbers()
            .map(|n| {
                let freq = draws[..freq_period].iter().filter(|d| d.zone(zone).contains(&n)).count();
                let miss = draws
                    .iter()
                    .position(|d| d.zone(zone).contains(&n))
                    .unwrap_or(draws.len()) as f64;
                let trend = draws[..trend_period].iter().filter(|d| d.zone(zone).contains(&n)).count() as f64
                    / trend_period as f64;

                let mut score = BASE_SCORE + freq as f64 * 3.0;
                if miss >= avg_miss * 0.8 && miss <= avg_miss * 1.5 {
                    score += 20.0;
                } else if miss > avg_miss * 1.5 {
                    score += 15.0;
                }
                score += trend * 15.0;
                if latest.iter().any(|&b| (b as i16 - n as i16).abs() <= 3) {
                    score += 10.0;
                }
                score += rng.random::<f64>() * 10.0;

                (n, score.max(1.0))
            })
            .collect()
    }
}

impl Default for MlPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for MlPredictor {
    fn method(&self) -> Method {
        Method::Ml
    }

    fn predict(&self, history: &[Draw], rng: &mut StdRng) -> Combination {
        let front_scores = Self::scores(history, Zone::Front, rng);
        let back_scores = Self::scores(history, Zone::Back, rng);
        let front = roulette_select(&front_scores, Zone::Front, rng);
        let back = roulette_select(&back_scores, Zone::Back, rng);
        assemble(&front, &back)
    }
}
