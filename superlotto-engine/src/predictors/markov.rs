use rand::rngs::StdRng;

use superlotto_db::models::{Combination, Draw, Method, Zone};

use super::Predictor;
use crate::sampler::{assemble, top_k};

const HISTORY: usize = 500;
const MIN_DRAWS: usize = 10;
const MAX_ITERATIONS: usize = 1000;
const TOLERANCE: f64 = 1e-10;

/// Chaîne de Markov sur les numéros : transitions d'un tirage au suivant,
/// sélection par la distribution stationnaire.
pub struct MarkovPredictor;

impl MarkovPredictor {
    pub fn new() -> Self {
        Self
    }

    fn predict_zone(history: &[Draw], zone: Zone) -> Vec<u8> {
        let matrix = transition_matrix(history, zone);
        let pi = stationary_distribution(&matrix);
        top_k(&pi, zone.pick_count()).into_iter().map(|i| (i + 1) as u8).collect()
    }
}

impl Default for MarkovPredictor {
    fn default() -> Self {
        Self::new()
    }
}

/// Matrice de transition stochastique `m[x][y]` (indices = numéro - 1) : fréquence à laquelle
/// `y` sort au tirage suivant un tirage contenant `x`. Une ligne sans observation est uniforme.
pub fn transition_matrix(history: &[Draw], zone: Zone) -> Vec<Vec<f64>> {
    let size = zone.size();
    let draws = &history[..HISTORY.min(history.len())];
    let mut matrix = vec![vec![0.0; size]; size];

    // draws[i + 1] précède draws[i]
    for pair in draws.windows(2) {
        let (newer, older) = (&pair[0], &pair[1]);
        for &from in older.zone(zone) {
            for &to in newer.zone(zone) {
                matrix[(from - 1) as usize][(to - 1) as usize] += 1.0;
            }
        }
    }

    for row in matrix.iter_mut() {
        let sum: f64 = row.iter().sum();
        if sum == 0.0 {
            row.iter_mut().for_each(|p| *p = 1.0 / size as f64);
        } else {
            row.iter_mut().for_each(|p| *p /= sum);
        }
    }
    matrix
}

/// Itération de puissance `π ← π·P` depuis la loi uniforme, jusqu'à convergence en norme L1.
pub fn stationary_distribution(matrix: &[Vec<f64>]) -> Vec<f64> {
    let size = matrix.len();
    if size == 0 {
        return Vec::new();
    }
    let mut pi = vec![1.0 / size as f64; size];

    for _ in 0..MAX_ITERATIONS {
        let mut next = vec![0.0; size];
        for (i, row) in matrix.iter().enumerate() {
            for (j, &p) in row.iter().enumerate() {
                next[j] += pi[i] * p;
            }
        }
        let sum: f64 = next.iter().sum();
        if sum <= 0.0 {
            break;
        }
        next.iter_mut().for_each(|p| *p /= sum);

        let diff: f64 = pi.iter().zip(&next).map(|(a, b)| (a - b).abs()).sum();
        pi = next;
        if diff < TOLERANCE {
            break;
        }
    }
    pi
}

impl Predictor for MarkovPredictor {
    fn method(&self) -> Method {
        Method::Markov
    }

    fn predict(&self, history: &[Draw], _rng: &mut StdRng) -> Combination {
        if history.len() < MIN_DRAWS {
            return Combination::LOWEST;
        }
        let front = Self::predict_zone(history, Zone::Front);
        let back = Self::predict_zone(history, Zone::Back);
        assemble(&front, &back)
    }
}
