use serde::Serialize;

use superlotto_db::models::{Draw, Zone};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberGap {
    pub number: u8,
    /// Tirages écoulés depuis la dernière sortie (0 = sorti au dernier tirage).
    pub current_gap: usize,
    pub avg_gap: f64,
    pub max_gap: usize,
}

#[derive(Debug, Clone)]
pub struct MissingAnalyzer {
    period: usize,
}

impl MissingAnalyzer {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Retards de chaque numéro sur la fenêtre, `draws[0]` = tirage le plus récent.
    pub fn gaps(&self, draws: &[Draw], zone: Zone) -> Vec<NumberGap> {
        let window = &draws[..self.period.min(draws.len())];

        zone.numbers()
            .map(|number| {
                let mut current_gap = window.len();
                let mut last_seen: Option<usize> = None;
                let mut intervals: Vec<usize> = Vec::new();

                for (i, draw) in window.iter().enumerate() {
                    if !draw.zone(zone).contains(&number) {
                        continue;
                    }
                    match last_seen {
                        None => current_gap = i,
                        Some(last) => intervals.push(i - last - 1),
                    }
                    last_seen = Some(i);
                }

                let avg_gap = if intervals.is_empty() {
                    0.0
                } else {
                    intervals.iter().sum::<usize>() as f64 / intervals.len() as f64
                };
                let max_gap = intervals.iter().copied().max().unwrap_or(0).max(current_gap);

                NumberGap { number, current_gap, avg_gap, max_gap }
            })
            .collect()
    }

    /// Numéros « dus » dans l'ordre du classement : retard ≥ 0,8 × moyenne, le plus proche
    /// de la moyenne en premier. Un numéro sorti au dernier tirage n'est jamais dû.
    pub fn due_ranked(&self, draws: &[Draw], zone: Zone, n: usize) -> Vec<u8> {
        let mut due: Vec<NumberGap> = self
            .gaps(draws, zone)
            .into_iter()
            .filter(|g| g.current_gap > 0 && g.current_gap as f64 >= g.avg_gap * 0.8)
            .collect();
        due.sort_by(|a, b| {
            let da = (a.current_gap as f64 - a.avg_gap).abs();
            let db = (b.current_gap as f64 - b.avg_gap).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });
        due.into_iter().take(n).map(|g| g.number).collect()
    }

    pub fn due_numbers(&self, draws: &[Draw], zone: Zone, n: usize) -> Vec<u8> {
        let mut numbers = self.due_ranked(draws, zone, n);
        numbers.sort_unstable();
        numbers
    }

    /// Plus gros retards en premier.
    pub fn high_missing_ranked(&self, draws: &[Draw], zone: Zone, n: usize) -> Vec<u8> {
        let mut gaps = self.gaps(draws, zone);
        gaps.sort_by(|a, b| b.current_gap.cmp(&a.current_gap));
        gaps.into_iter().take(n).map(|g| g.number).collect()
    }

    pub fn high_missing_numbers(&self, draws: &[Draw], zone: Zone, n: usize) -> Vec<u8> {
        let mut numbers = self.high_missing_ranked(draws, zone, n);
        numbers.sort_unstable();
        numbers
    }
}
