use serde::Serialize;

use superlotto_db::models::{Draw, Zone};

/// Un tirage de la série de tendance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub issue: String,
    pub date: String,
    pub front: [u8; 5],
    pub back: [u8; 2],
    pub front_sum: u32,
    pub back_sum: u32,
    pub front_odd: u8,
    pub front_consecutive: u8,
}

/// Les `limit` tirages les plus récents, réordonnés du plus ancien au plus récent.
fn oldest_first(draws: &[Draw], limit: usize) -> impl Iterator<Item = &Draw> {
    draws[..limit.min(draws.len())].iter().rev()
}

pub fn trend_data(draws: &[Draw], limit: usize) -> Vec<TrendPoint> {
    oldest_first(draws, limit)
        .map(|d| {
            let stats = d.stats();
            TrendPoint {
                issue: d.issue().to_string(),
                date: d.date().to_string(),
                front: *d.numbers().front(),
                back: *d.numbers().back(),
                front_sum: stats.front_sum,
                back_sum: stats.back_sum,
                front_odd: stats.front_odd,
                front_consecutive: stats.front_consecutive,
            }
        })
        .collect()
}

/// Présence du numéro à chaque tirage, du plus ancien au plus récent.
pub fn number_trend(draws: &[Draw], zone: Zone, number: u8, limit: usize) -> Vec<bool> {
    oldest_first(draws, limit)
        .map(|d| d.zone(zone).contains(&number))
        .collect()
}

pub fn sum_trend(draws: &[Draw], zone: Zone, limit: usize) -> Vec<u32> {
    oldest_first(draws, limit)
        .map(|d| match zone {
            Zone::Front => d.stats().front_sum,
            Zone::Back => d.stats().back_sum,
        })
        .collect()
}
