use serde::Serialize;

use superlotto_db::models::{Draw, Zone};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberFrequency {
    pub number: u8,
    pub count: u32,
    /// count / nombre de tirages de la fenêtre.
    pub percentage: f64,
}

/// Fréquence de chaque numéro de la zone sur les `window` tirages les plus récents
/// (tous si `None`), triée par numéro.
pub fn frequency(draws: &[Draw], zone: Zone, window: Option<usize>) -> Vec<NumberFrequency> {
    let n = window.unwrap_or(draws.len()).min(draws.len());
    let recent = &draws[..n];

    let mut counts = vec![0u32; zone.size()];
    for draw in recent {
        for &number in draw.zone(zone) {
            counts[(number - 1) as usize] += 1;
        }
    }

    zone.numbers()
        .zip(counts)
        .map(|(number, count)| NumberFrequency {
            number,
            count,
            percentage: if n > 0 { count as f64 / n as f64 } else { 0.0 },
        })
        .collect()
}

/// Numéros chauds et froids sur une fenêtre fixe, indépendante de celle de l'appelant.
#[derive(Debug, Clone)]
pub struct FrequencyAnalyzer {
    period: usize,
}

impl FrequencyAnalyzer {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn frequency(&self, draws: &[Draw], zone: Zone) -> Vec<NumberFrequency> {
        frequency(draws, zone, Some(self.period))
    }

    /// Classement complet : fréquence décroissante, puis numéro croissant.
    fn ranking(&self, draws: &[Draw], zone: Zone) -> Vec<u8> {
        let mut freqs = self.frequency(draws, zone);
        freqs.sort_by(|a, b| b.count.cmp(&a.count));
        freqs.into_iter().map(|f| f.number).collect()
    }

    /// Les `n` plus fréquents, dans l'ordre du classement.
    pub fn hot_ranked(&self, draws: &[Draw], zone: Zone, n: usize) -> Vec<u8> {
        let mut ranking = self.ranking(draws, zone);
        ranking.truncate(n);
        ranking
    }

    /// Les `n` moins fréquents, du plus froid au moins froid.
    /// Pris à l'autre extrémité du même classement : disjoint de `hot` tant que 2n ≤ taille.
    pub fn cold_ranked(&self, draws: &[Draw], zone: Zone, n: usize) -> Vec<u8> {
        self.ranking(draws, zone).into_iter().rev().take(n).collect()
    }

    pub fn hot(&self, draws: &[Draw], zone: Zone, n: usize) -> Vec<u8> {
        let mut numbers = self.hot_ranked(draws, zone, n);
        numbers.sort_unstable();
        numbers
    }

    pub fn cold(&self, draws: &[Draw], zone: Zone, n: usize) -> Vec<u8> {
        let mut numbers = self.cold_ranked(draws, zone, n);
        numbers.sort_unstable();
        numbers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_test_draws;

    #[test]
    fn test_frequency_conservation() {
        let draws = make_test_draws(120);
        for zone in Zone::ALL {
            for window in [1usize, 10, 30, 120] {
                let total: u32 = frequency(&draws, zone, Some(window)).iter().map(|f| f.count).sum();
                assert_eq!(
                    total as usize,
                    window * zone.pick_count(),
                    "zone {:?}, fenêtre {}", zone, window
                );
            }
        }
    }

    #[test]
    fn test_frequency_window_larger_than_history() {
        let draws = make_test_draws(10);
        let freqs = frequency(&draws, Zone::Front, Some(500));
        let total: u32 = freqs.iter().map(|f| f.count).sum();
        assert_eq!(total, 50);
        assert_eq!(freqs.len(), 35);
    }

    #[test]
    fn test_percentage_not_divided_by_zone() {
        let draws = make_test_draws(20);
        for f in frequency(&draws, Zone::Back, None) {
            assert!((f.percentage - f.count as f64 / 20.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_empty_history() {
        let freqs = frequency(&[], Zone::Front, None);
        assert!(freqs.iter().all(|f| f.count == 0 && f.percentage == 0.0));
    }

    #[test]
    fn test_hot_cold_disjoint() {
        let analyzer = FrequencyAnalyzer::new(30);
        for draws in [make_test_draws(0), make_test_draws(5), make_test_draws(100)] {
            for zone in Zone::ALL {
                for n in 1..=zone.size() / 2 {
                    let hot = analyzer.hot(&draws, zone, n);
                    let cold = analyzer.cold(&draws, zone, n);
                    assert_eq!(hot.len(), n);
                    assert!(hot.iter().all(|h| !cold.contains(h)), "{:?} / {:?}", hot, cold);
                }
            }
        }
    }

    #[test]
    fn test_hot_sorted_ascending() {
        let analyzer = FrequencyAnalyzer::new(30);
        let draws = make_test_draws(60);
        let hot = analyzer.hot(&draws, Zone::Front, 15);
        assert!(hot.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_hot_ranked_order() {
        let analyzer = FrequencyAnalyzer::new(30);
        let draws = make_test_draws(60);
        let freqs = analyzer.frequency(&draws, Zone::Front);
        let ranked = analyzer.hot_ranked(&draws, Zone::Front, 10);
        let count = |n: u8| freqs[(n - 1) as usize].count;
        assert!(ranked.windows(2).all(|w| count(w[0]) >= count(w[1])));
    }
}
