use std::collections::BTreeMap;

use serde::Serialize;

use superlotto_db::models::{Combination, Draw};

pub const SUM_RANGES: [&str; 5] = ["15-60", "61-90", "91-120", "121-150", "151+"];
pub const BANDS: [&str; 5] = ["1-7", "8-14", "15-21", "22-28", "29-35"];

/// Nombre de tirages par répartition impairs:pairs de la zone avant, de 0:5 à 5:0.
pub fn odd_even_distribution(draws: &[Draw]) -> Vec<(String, u32)> {
    let mut counts = [0u32; 6];
    for draw in draws {
        counts[draw.stats().front_odd as usize] += 1;
    }
    counts
        .iter()
        .enumerate()
        .map(|(odd, &c)| (format!("{}:{}", odd, 5 - odd), c))
        .collect()
}

fn sum_range_index(sum: u32) -> usize {
    match sum {
        0..=60 => 0,
        61..=90 => 1,
        91..=120 => 2,
        121..=150 => 3,
        _ => 4,
    }
}

/// Répartition des sommes de la zone avant par tranche.
pub fn sum_distribution(draws: &[Draw]) -> Vec<(&'static str, u32)> {
    let mut counts = [0u32; 5];
    for draw in draws {
        counts[sum_range_index(draw.stats().front_sum)] += 1;
    }
    SUM_RANGES.iter().copied().zip(counts).collect()
}

/// Nombre de tirages par nombre de paires consécutives en zone avant (0 à 4).
pub fn consecutive_distribution(draws: &[Draw]) -> Vec<(u8, u32)> {
    let mut counts = [0u32; 5];
    for draw in draws {
        counts[(draw.stats().front_consecutive as usize).min(4)] += 1;
    }
    (0u8..).zip(counts).collect()
}

/// Pour chaque bande de 7 numéros : combien de tirages y placent 0, 1, … 5 numéros.
pub fn band_distribution(draws: &[Draw]) -> Vec<(&'static str, [u32; 6])> {
    let mut table = [[0u32; 6]; 5];
    for draw in draws {
        let mut per_band = [0usize; 5];
        for &n in draw.numbers().front() {
            per_band[((n - 1) / 7).min(4) as usize] += 1;
        }
        for (band, &count) in per_band.iter().enumerate() {
            table[band][count] += 1;
        }
    }
    BANDS.iter().copied().zip(table).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepeatedCombination {
    pub numbers: Combination,
    pub issues: Vec<String>,
    pub dates: Vec<String>,
}

/// Combinaisons identiques sorties au moins deux fois, les plus fréquentes d'abord.
pub fn repeated_combinations(draws: &[Draw]) -> Vec<RepeatedCombination> {
    let mut groups: BTreeMap<Combination, Vec<&Draw>> = BTreeMap::new();
    for draw in draws {
        groups.entry(*draw.numbers()).or_default().push(draw);
    }

    let mut repeated: Vec<RepeatedCombination> = groups
        .into_iter()
        .filter(|(_, group)| group.len() >= 2)
        .map(|(numbers, group)| RepeatedCombination {
            numbers,
            issues: group.iter().map(|d| d.issue().to_string()).collect(),
            dates: group.iter().map(|d| d.date().to_string()).collect(),
        })
        .collect();
    repeated.sort_by(|a, b| b.issues.len().cmp(&a.issues.len()));
    repeated
}
