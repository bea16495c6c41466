pub mod association;
pub mod frequency;
pub mod missing;
pub mod statistics;
pub mod trend;

use superlotto_db::models::{Draw, Zone};

use self::frequency::FrequencyAnalyzer;
use self::missing::MissingAnalyzer;

/// Score composite 0-100 par numéro : moitié fréquence normalisée, moitié proximité
/// du retard courant à son retard moyen. Indexé par `numéro - 1`.
pub fn number_scores(
    draws: &[Draw],
    zone: Zone,
    frequency: &FrequencyAnalyzer,
    missing: &MissingAnalyzer,
) -> Vec<f64> {
    let freqs = frequency.frequency(draws, zone);
    let gaps = missing.gaps(draws, zone);

    // en pourcentage, pour garder l'échelle du lissage +0.001
    let pct: Vec<f64> = freqs.iter().map(|f| f.percentage * 100.0).collect();
    let max = pct.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = pct.iter().cloned().fold(f64::INFINITY, f64::min);

    pct.iter()
        .zip(gaps.iter())
        .map(|(&p, gap)| {
            let freq_score = (p - min) / (max - min + 0.001) * 100.0;
            let miss_score = if gap.avg_gap > 0.0 {
                let ratio = gap.current_gap as f64 / gap.avg_gap;
                if (0.8..=1.5).contains(&ratio) {
                    100.0 - (ratio - 1.0).abs() * 50.0
                } else if ratio > 1.5 {
                    80.0
                } else {
                    0.0
                }
            } else {
                0.0
            };
            freq_score * 0.5 + miss_score * 0.5
        })
        .collect()
}
