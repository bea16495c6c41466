use chrono::Datelike;
use rand::distr::weighted::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use superlotto_db::models::{Combination, Zone};

/// Génère un seed déterministe basé sur la date du jour (YYYYMMDD).
pub fn date_seed() -> u64 {
    let today = chrono::Local::now().date_naive();
    let y = today.year() as u64;
    let m = today.month() as u64;
    let d = today.day() as u64;
    y * 10_000 + m * 100 + d
}

/// Complète `selected` avec des numéros uniformes distincts, puis trie.
pub fn fill_zone(mut selected: Vec<u8>, zone: Zone, rng: &mut StdRng) -> Vec<u8> {
    selected.truncate(zone.pick_count());
    if selected.len() < zone.pick_count() {
        let mut remaining: Vec<u8> = zone.numbers().filter(|n| !selected.contains(n)).collect();
        remaining.shuffle(rng);
        let missing = zone.pick_count() - selected.len();
        selected.extend(remaining.into_iter().take(missing));
    }
    selected.sort_unstable();
    selected
}

pub fn random_zone(zone: Zone, rng: &mut StdRng) -> Vec<u8> {
    fill_zone(Vec::new(), zone, rng)
}

/// Assemble deux zones déjà complètes en une grille.
pub fn assemble(front: &[u8], back: &[u8]) -> Combination {
    match Combination::from_slices(front, back) {
        Ok(c) => c,
        Err(e) => {
            log::debug!("Grille invalide {:?} + {:?} : {}", front, back, e);
            Combination::LOWEST
        }
    }
}

pub fn random_combination(rng: &mut StdRng) -> Combination {
    let front = random_zone(Zone::Front, rng);
    let back = random_zone(Zone::Back, rng);
    assemble(&front, &back)
}

/// Mélange le vivier et en prend `pick_count` numéros, complétés au hasard si le vivier est trop petit.
pub fn pick_from_pool(pool: &[u8], zone: Zone, rng: &mut StdRng) -> Vec<u8> {
    let mut shuffled = pool.to_vec();
    shuffled.shuffle(rng);
    shuffled.truncate(zone.pick_count());
    fill_zone(shuffled, zone, rng)
}

/// Roulette sans remise : au plus `50 × pick_count` tirages, puis complément uniforme.
pub fn roulette_select(scores: &[(u8, f64)], zone: Zone, rng: &mut StdRng) -> Vec<u8> {
    let count = zone.pick_count();
    let weights: Vec<f64> = scores.iter().map(|&(_, s)| s.max(0.0)).collect();
    let mut selected = Vec::with_capacity(count);

    if let Ok(dist) = WeightedIndex::new(&weights) {
        let mut attempts = 0;
        while selected.len() < count && attempts < count * 50 {
            let (number, _) = scores[dist.sample(rng)];
            if !selected.contains(&number) {
                selected.push(number);
            }
            attempts += 1;
        }
    }

    fill_zone(selected, zone, rng)
}

/// Indices des `k` plus grandes valeurs ; à égalité, l'ordre d'origine est conservé.
pub fn top_k(values: &[f64], k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(std::cmp::Ordering::Equal));
    indices.truncate(k);
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn is_valid(numbers: &[u8], zone: Zone) -> bool {
        numbers.len() == zone.pick_count()
            && numbers.windows(2).all(|w| w[0] < w[1])
            && numbers.iter().all(|&n| n >= 1 && n as usize <= zone.size())
    }

    #[test]
    fn test_date_seed_format() {
        let seed = date_seed();
        assert_eq!(seed.to_string().len(), 8, "seed devrait avoir 8 chiffres: {seed}");
    }

    #[test]
    fn test_fill_zone_pads_and_sorts() {
        let mut rng = StdRng::seed_from_u64(42);
        let filled = fill_zone(vec![30, 3], Zone::Front, &mut rng);
        assert!(is_valid(&filled, Zone::Front), "{filled:?}");
        assert!(filled.contains(&30) && filled.contains(&3));
    }

    #[test]
    fn test_pick_from_small_pool() {
        let mut rng = StdRng::seed_from_u64(7);
        let picked = pick_from_pool(&[4], Zone::Back, &mut rng);
        assert!(is_valid(&picked, Zone::Back));
        assert!(picked.contains(&4));
    }

    #[test]
    fn test_pick_from_pool_stays_in_pool() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = [1, 5, 9, 13, 17, 21, 25];
        for _ in 0..20 {
            let picked = pick_from_pool(&pool, Zone::Front, &mut rng);
            assert!(picked.iter().all(|n| pool.contains(n)), "{picked:?}");
        }
    }

    #[test]
    fn test_roulette_prefers_heavy_numbers() {
        let mut rng = StdRng::seed_from_u64(1);
        let scores: Vec<(u8, f64)> = (1..=12u8)
            .map(|n| (n, if n == 3 || n == 8 { 1000.0 } else { 0.001 }))
            .collect();
        let picked = roulette_select(&scores, Zone::Back, &mut rng);
        assert_eq!(picked, vec![3, 8]);
    }

    #[test]
    fn test_roulette_all_zero_falls_back() {
        let mut rng = StdRng::seed_from_u64(1);
        let scores: Vec<(u8, f64)> = (1..=35u8).map(|n| (n, 0.0)).collect();
        let picked = roulette_select(&scores, Zone::Front, &mut rng);
        assert!(is_valid(&picked, Zone::Front));
    }

    #[test]
    fn test_top_k_stable() {
        let values = [0.5, 0.9, 0.5, 0.1, 0.9];
        assert_eq!(top_k(&values, 3), vec![1, 4, 0]);
    }

    #[test]
    fn test_random_combination_seeded() {
        let a = random_combination(&mut StdRng::seed_from_u64(99));
        let b = random_combination(&mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }
}
