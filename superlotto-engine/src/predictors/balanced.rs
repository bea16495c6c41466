use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use superlotto_db::models::{Combination, Draw, Method, Zone};

use super::Predictor;
use crate::analysis::frequency::FrequencyAnalyzer;
use crate::sampler::{assemble, fill_zone};

/// Mélange chauds, tièdes et froids : 3 + 1 + 1 en zone avant, 1 + 1 en zone arrière.
pub struct BalancedPredictor {
    frequency: FrequencyAnalyzer,
}

impl BalancedPredictor {
    pub const FRONT_POOL: usize = 12;
    pub const BACK_POOL: usize = 4;

    pub fn new(frequency: FrequencyAnalyzer) -> Self {
        Self { frequency }
    }
}

/// Ajoute jusqu'à `take` numéros du vivier mélangé, sans doublon.
fn take_from(selected: &mut Vec<u8>, pool: &[u8], take: usize, rng: &mut StdRng) {
    let mut shuffled = pool.to_vec();
    shuffled.shuffle(rng);
    let target = selected.len() + take;
    for n in shuffled {
        if selected.len() >= target {
            break;
        }
        if !selected.contains(&n) {
            selected.push(n);
        }
    }
}

impl Predictor for BalancedPredictor {
    fn method(&self) -> Method {
        Method::Balanced
    }

    fn predict(&self, history: &[Draw], rng: &mut StdRng) -> Combination {
        let hot_front = self.frequency.hot(history, Zone::Front, Self::FRONT_POOL);
        let cold_front = self.frequency.cold(history, Zone::Front, Self::FRONT_POOL);
        let warm_front: Vec<u8> = Zone::Front
            .numbers()
            .filter(|n| !hot_front.contains(n) && !cold_front.contains(n))
            .collect();

        let mut front = Vec::with_capacity(Zone::Front.pick_count());
        take_from(&mut front, &hot_front, 3, rng);
        take_from(&mut front, &warm_front, 1, rng);
        take_from(&mut front, &cold_front, 1, rng);
        let front = fill_zone(front, Zone::Front, rng);

        let hot_back = self.frequency.hot(history, Zone::Back, Self::BACK_POOL);
        let cold_back = self.frequency.cold(history, Zone::Back, Self::BACK_POOL);
        let mut back = Vec::with_capacity(Zone::Back.pick_count());
        take_from(&mut back, &hot_back, 1, rng);
        take_from(&mut back, &cold_back, 1, rng);
        let back = fill_zone(back, Zone::Back, rng);

        assemble(&front, &back)
    }
}
