use rand::rngs::StdRng;

use superlotto_db::models::{Combination, Draw, Method, Zone};

use super::Predictor;
use crate::analysis::frequency::FrequencyAnalyzer;
use crate::sampler::{assemble, pick_from_pool};

/// Tire au hasard parmi les numéros les plus fréquents de la fenêtre.
pub struct HotPredictor {
    frequency: FrequencyAnalyzer,
}

impl HotPredictor {
    pub const FRONT_POOL: usize = 15;
    pub const BACK_POOL: usize = 6;

    pub fn new(frequency: FrequencyAnalyzer) -> Self {
        Self { frequency }
    }
}

impl Predictor for HotPredictor {
    fn method(&self) -> Method {
        Method::Hot
    }

    fn predict(&self, history: &[Draw], rng: &mut StdRng) -> Combination {
        let front_pool = self.frequency.hot(history, Zone::Front, Self::FRONT_POOL);
        let back_pool = self.frequency.hot(history, Zone::Back, Self::BACK_POOL);
        let front = pick_from_pool(&front_pool, Zone::Front, rng);
        let back = pick_from_pool(&back_pool, Zone::Back, rng);
        assemble(&front, &back)
    }
}
