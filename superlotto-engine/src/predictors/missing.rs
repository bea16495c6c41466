use rand::rngs::StdRng;

use superlotto_db::models::{Combination, Draw, Method, Zone};

use super::Predictor;
use crate::analysis::missing::MissingAnalyzer;
use crate::sampler::{assemble, pick_from_pool};

/// Tire parmi les numéros « dus » ; complète au hasard si trop peu sont en retard.
pub struct MissingPredictor {
    missing: MissingAnalyzer,
}

impl MissingPredictor {
    pub const FRONT_POOL: usize = 15;
    pub const BACK_POOL: usize = 6;

    pub fn new(missing: MissingAnalyzer) -> Self {
        Self { missing }
    }
}

impl Predictor for MissingPredictor {
    fn method(&self) -> Method {
        Method::Missing
    }

    fn predict(&self, history: &[Draw], rng: &mut StdRng) -> Combination {
        let front_pool = self.missing.due_numbers(history, Zone::Front, Self::FRONT_POOL);
        let back_pool = self.missing.due_numbers(history, Zone::Back, Self::BACK_POOL);
        let front = pick_from_pool(&front_pool, Zone::Front, rng);
        let back = pick_from_pool(&back_pool, Zone::Back, rng);
        assemble(&front, &back)
    }
}
