use superlotto_db::models::{Combination, Draw, Zone};

const HISTORY: usize = 100;
const SUM_BUCKET: u32 = 20;

/// Profil des tirages récents auquel les grilles candidates sont comparées.
#[derive(Debug, Clone)]
struct HistoryPattern {
    front_freq: Vec<u32>,
    back_freq: Vec<u32>,
    common_sum_bucket: u32,
}

impl HistoryPattern {
    fn from_draws(draws: &[Draw]) -> Self {
        let mut front_freq = vec![0u32; Zone::Front.size()];
        let mut back_freq = vec![0u32; Zone::Back.size()];
        let mut sum_buckets = [0u32; 10];

        for draw in draws {
            for &n in draw.zone(Zone::Front) {
                front_freq[(n - 1) as usize] += 1;
            }
            for &n in draw.zone(Zone::Back) {
                back_freq[(n - 1) as usize] += 1;
            }
            let bucket = (draw.stats().front_sum / SUM_BUCKET) as usize;
            sum_buckets[bucket.min(sum_buckets.len() - 1)] += 1;
        }

        // premier maximum : le plus petit intervalle à égalité
        let common_sum_bucket = sum_buckets
            .iter()
            .enumerate()
            .fold((4usize, 0u32), |best, (i, &c)| if c > best.1 { (i, c) } else { best })
            .0 as u32;

        Self { front_freq, back_freq, common_sum_bucket }
    }
}

/// Choisit, parmi plusieurs grilles, celle qui ressemble le plus aux tirages récents.
pub struct PredictionScorer;

impl PredictionScorer {
    /// Indice de la meilleure grille (la première en cas d'égalité), `None` si la liste est vide.
    pub fn select_best(candidates: &[Combination], history: &[Draw]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        let draws = &history[..HISTORY.min(history.len())];
        if candidates.len() == 1 || draws.is_empty() {
            return Some(0);
        }

        let pattern = HistoryPattern::from_draws(draws);
        let mut best = (0usize, f64::NEG_INFINITY);
        for (i, candidate) in candidates.iter().enumerate() {
            let score = Self::score(candidate, &pattern, &draws[0]);
            log::debug!("Grille {} ({}) : score {:.2}", i + 1, candidate, score);
            if score > best.1 {
                best = (i, score);
            }
        }
        log::info!("Grille {} retenue, score {:.2}", best.0 + 1, best.1);
        Some(best.0)
    }

    fn score(candidate: &Combination, pattern: &HistoryPattern, latest: &Draw) -> f64 {
        Self::hot_score(candidate, pattern) * 0.30
            + Self::sum_score(candidate, pattern) * 0.20
            + Self::odd_even_score(candidate) * 0.20
            + Self::spread_score(candidate) * 0.15
            + Self::overlap_score(candidate, latest) * 0.15
    }

    fn hot_score(candidate: &Combination, pattern: &HistoryPattern) -> f64 {
        let zone_score = |numbers: &[u8], freq: &[u32]| -> f64 {
            let total: u32 = numbers.iter().map(|&n| freq[(n - 1) as usize]).sum();
            let max = freq.iter().copied().max().unwrap_or(0).max(1) * numbers.len() as u32;
            total as f64 / max as f64 * 100.0
        };
        zone_score(candidate.front(), &pattern.front_freq) * 0.7 + zone_score(candidate.back(), &pattern.back_freq) * 0.3
    }

    fn sum_score(candidate: &Combination, pattern: &HistoryPattern) -> f64 {
        let sum: u32 = candidate.front().iter().map(|&n| n as u32).sum();
        let distance = (sum / SUM_BUCKET).abs_diff(pattern.common_sum_bucket) as f64;
        (100.0 - distance * 20.0).max(0.0)
    }

    fn odd_even_score(candidate: &Combination) -> f64 {
        match candidate.front().iter().filter(|&&n| n % 2 == 1).count() {
            2 | 3 => 100.0,
            1 | 4 => 60.0,
            _ => 20.0,
        }
    }

    /// 20 points par bande de 7 numéros couverte.
    fn spread_score(candidate: &Combination) -> f64 {
        let mut covered = [false; 5];
        for &n in candidate.front() {
            covered[((n - 1) / 7).min(4) as usize] = true;
        }
        covered.iter().filter(|&&c| c).count() as f64 * 20.0
    }

    fn overlap_score(candidate: &Combination, latest: &Draw) -> f64 {
        let (front, back) = candidate.hits_against(latest.numbers());
        let front_part = match front {
            1 | 2 => 60.0,
            0 => 40.0,
            _ => 20.0,
        };
        let back_part = if back == 1 { 40.0 } else { 20.0 };
        front_part + back_part
    }
}
