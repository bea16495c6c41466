use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Zone {
    Front,
    Back,
}

impl Zone {
    pub const ALL: [Zone; 2] = [Zone::Front, Zone::Back];

    pub fn size(&self) -> usize {
        match self {
            Zone::Front => 35,
            Zone::Back => 12,
        }
    }

    pub fn pick_count(&self) -> usize {
        match self {
            Zone::Front => 5,
            Zone::Back => 2,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Zone::Front => "FRONT",
            Zone::Back => "BACK",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Zone::Front => "Zone avant",
            Zone::Back => "Zone arrière",
        }
    }

    /// Tous les numéros de la zone, dans l'ordre croissant.
    pub fn numbers(&self) -> std::ops::RangeInclusive<u8> {
        1..=self.size() as u8
    }

    pub fn numbers_from<'a>(&self, combination: &'a Combination) -> &'a [u8] {
        match self {
            Zone::Front => &combination.front,
            Zone::Back => &combination.back,
        }
    }
}

/// Une grille : 5 numéros avant et 2 numéros arrière, triés et distincts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Combination {
    front: [u8; 5],
    back: [u8; 2],
}

impl Combination {
    /// Plus petite grille valide.
    pub const LOWEST: Combination = Combination {
        front: [1, 2, 3, 4, 5],
        back: [1, 2],
    };

    pub fn new(mut front: [u8; 5], mut back: [u8; 2]) -> Result<Self> {
        validate_numbers(&front, &back)?;
        front.sort_unstable();
        back.sort_unstable();
        Ok(Self { front, back })
    }

    pub fn from_slices(front: &[u8], back: &[u8]) -> Result<Self> {
        if front.len() != 5 {
            bail!("La zone avant doit contenir 5 numéros (reçu {})", front.len());
        }
        if back.len() != 2 {
            bail!("La zone arrière doit contenir 2 numéros (reçu {})", back.len());
        }
        let mut f = [0u8; 5];
        f.copy_from_slice(front);
        let mut b = [0u8; 2];
        b.copy_from_slice(back);
        Self::new(f, b)
    }

    pub fn front(&self) -> &[u8; 5] {
        &self.front
    }

    pub fn back(&self) -> &[u8; 2] {
        &self.back
    }

    /// Nombre de numéros communs (avant, arrière) avec une autre grille.
    pub fn hits_against(&self, other: &Combination) -> (u8, u8) {
        let front = self.front.iter().filter(|n| other.front.contains(n)).count() as u8;
        let back = self.back.iter().filter(|n| other.back.contains(n)).count() as u8;
        (front, back)
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let front = self
            .front
            .iter()
            .map(|n| format!("{:02}", n))
            .collect::<Vec<_>>()
            .join(" ");
        let back = self
            .back
            .iter()
            .map(|n| format!("{:02}", n))
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "{} + {}", front, back)
    }
}

pub fn validate_numbers(front: &[u8; 5], back: &[u8; 2]) -> Result<()> {
    for &n in front {
        if !(1..=35).contains(&n) {
            bail!("Numéro avant {} hors limites (1-35)", n);
        }
    }
    for &n in back {
        if !(1..=12).contains(&n) {
            bail!("Numéro arrière {} hors limites (1-12)", n);
        }
    }
    for i in 0..front.len() {
        for j in (i + 1)..front.len() {
            if front[i] == front[j] {
                bail!("Numéro avant en double : {}", front[i]);
            }
        }
    }
    if back[0] == back[1] {
        bail!("Numéro arrière en double : {}", back[0]);
    }
    Ok(())
}

/// Caractéristiques dérivées d'un tirage, calculées une seule fois à la création.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrawStats {
    pub front_sum: u32,
    pub back_sum: u32,
    pub front_odd: u8,
    pub back_odd: u8,
    pub front_consecutive: u8,
    pub back_consecutive: u8,
    pub ac_value: u8,
}

impl DrawStats {
    fn compute(numbers: &Combination) -> Self {
        let front = numbers.front();
        let back = numbers.back();

        let mut diffs: Vec<u8> = Vec::with_capacity(10);
        for i in 0..front.len() {
            for j in (i + 1)..front.len() {
                let d = front[i].abs_diff(front[j]);
                if !diffs.contains(&d) {
                    diffs.push(d);
                }
            }
        }

        Self {
            front_sum: front.iter().map(|&n| n as u32).sum(),
            back_sum: back.iter().map(|&n| n as u32).sum(),
            front_odd: front.iter().filter(|&&n| n % 2 == 1).count() as u8,
            back_odd: back.iter().filter(|&&n| n % 2 == 1).count() as u8,
            front_consecutive: consecutive_pairs(front),
            back_consecutive: consecutive_pairs(back),
            ac_value: (diffs.len() as u8).saturating_sub(4),
        }
    }
}

fn consecutive_pairs(sorted: &[u8]) -> u8 {
    sorted.windows(2).filter(|w| w[1] == w[0] + 1).count() as u8
}

/// Tirage officiel. Immuable : les champs dérivés ne peuvent pas diverger des numéros.
#[derive(Debug, Clone, PartialEq)]
pub struct Draw {
    issue: String,
    date: String,
    numbers: Combination,
    stats: DrawStats,
}

impl Draw {
    pub fn new(issue: impl Into<String>, date: impl Into<String>, numbers: Combination) -> Self {
        let stats = DrawStats::compute(&numbers);
        Self {
            issue: issue.into(),
            date: date.into(),
            numbers,
            stats,
        }
    }

    pub fn issue(&self) -> &str {
        &self.issue
    }

    /// Date au format AAAA-MM-JJ.
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn numbers(&self) -> &Combination {
        &self.numbers
    }

    pub fn zone(&self, zone: Zone) -> &[u8] {
        zone.numbers_from(&self.numbers)
    }

    pub fn stats(&self) -> &DrawStats {
        &self.stats
    }

    /// Valeur numérique du numéro de tirage, utilisée pour l'ordre chronologique.
    pub fn issue_number(&self) -> u64 {
        self.issue.trim().parse().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Method {
    Hot,
    Missing,
    Balanced,
    Ml,
    Adaptive,
    Bayesian,
    Markov,
    #[serde(rename = "MONTECARLO")]
    MonteCarlo,
    GradientBoost,
    Ensemble,
}

impl Method {
    pub const ALL: [Method; 10] = [
        Method::Hot,
        Method::Missing,
        Method::Balanced,
        Method::Ml,
        Method::Adaptive,
        Method::Bayesian,
        Method::Markov,
        Method::MonteCarlo,
        Method::GradientBoost,
        Method::Ensemble,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Method::Hot => "HOT",
            Method::Missing => "MISSING",
            Method::Balanced => "BALANCED",
            Method::Ml => "ML",
            Method::Adaptive => "ADAPTIVE",
            Method::Bayesian => "BAYESIAN",
            Method::Markov => "MARKOV",
            Method::MonteCarlo => "MONTECARLO",
            Method::GradientBoost => "GRADIENT_BOOST",
            Method::Ensemble => "ENSEMBLE",
        }
    }

    pub fn default_label(&self) -> &'static str {
        match self {
            Method::Hot => "Numéros chauds",
            Method::Missing => "Numéros en retard",
            Method::Balanced => "Équilibré",
            Method::Ml => "Score multi-critères",
            Method::Adaptive => "Adaptatif",
            Method::Bayesian => "Bayésien",
            Method::Markov => "Chaîne de Markov",
            Method::MonteCarlo => "Monte Carlo",
            Method::GradientBoost => "Gradient boosting",
            Method::Ensemble => "Ensemble",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Method::Hot => "Tirage parmi les numéros les plus fréquents de la période récente",
            Method::Missing => "Tirage parmi les numéros dont le retard approche la moyenne",
            Method::Balanced => "Mélange de numéros chauds, tièdes et froids",
            Method::Ml => "Score par fréquence, retard, tendance et voisinage",
            Method::Adaptive => "Fusion pondérée par les performances observées",
            Method::Bayesian => "Probabilité a posteriori d'un modèle Beta",
            Method::Markov => "Distribution stationnaire des transitions entre tirages",
            Method::MonteCarlo => "Rééchantillonnage, MCMC et échantillonnage d'importance",
            Method::GradientBoost => "Somme pondérée de sept critères par numéro",
            Method::Ensemble => "Vote pondéré de sept méthodes",
        }
    }

    /// Insensible à la casse.
    pub fn from_code(code: &str) -> Option<Method> {
        let code = code.trim();
        Method::ALL
            .iter()
            .copied()
            .find(|m| m.code().eq_ignore_ascii_case(code))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrizeTier {
    Tier1,
    Tier2,
    Tier3,
    Tier4,
    Tier5,
    Tier6,
    Tier7,
    NoPrize,
}

impl PrizeTier {
    pub const ALL: [PrizeTier; 8] = [
        PrizeTier::Tier1,
        PrizeTier::Tier2,
        PrizeTier::Tier3,
        PrizeTier::Tier4,
        PrizeTier::Tier5,
        PrizeTier::Tier6,
        PrizeTier::Tier7,
        PrizeTier::NoPrize,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            PrizeTier::Tier1 => "TIER1",
            PrizeTier::Tier2 => "TIER2",
            PrizeTier::Tier3 => "TIER3",
            PrizeTier::Tier4 => "TIER4",
            PrizeTier::Tier5 => "TIER5",
            PrizeTier::Tier6 => "TIER6",
            PrizeTier::Tier7 => "TIER7",
            PrizeTier::NoPrize => "NONE",
        }
    }

    pub fn from_code(code: &str) -> Option<PrizeTier> {
        PrizeTier::ALL.iter().copied().find(|t| t.code() == code)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PrizeTier::Tier1 => "1er rang",
            PrizeTier::Tier2 => "2e rang",
            PrizeTier::Tier3 => "3e rang",
            PrizeTier::Tier4 => "4e rang",
            PrizeTier::Tier5 => "5e rang",
            PrizeTier::Tier6 => "6e rang",
            PrizeTier::Tier7 => "7e rang",
            PrizeTier::NoPrize => "Non gagnant",
        }
    }

    /// 7 pour le premier rang, 0 sans gain : plus grand = meilleur.
    pub fn rank(&self) -> u8 {
        match self {
            PrizeTier::Tier1 => 7,
            PrizeTier::Tier2 => 6,
            PrizeTier::Tier3 => 5,
            PrizeTier::Tier4 => 4,
            PrizeTier::Tier5 => 3,
            PrizeTier::Tier6 => 2,
            PrizeTier::Tier7 => 1,
            PrizeTier::NoPrize => 0,
        }
    }

    pub fn is_prize(&self) -> bool {
        *self != PrizeTier::NoPrize
    }

    /// Rangs 1 à 3.
    pub fn is_high(&self) -> bool {
        self.rank() >= 5
    }
}

impl fmt::Display for PrizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub front_hits: u8,
    pub back_hits: u8,
    pub tier: PrizeTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionCandidate {
    pub id: Option<i64>,
    pub target_issue: String,
    pub method: Method,
    pub numbers: Combination,
    pub score: Option<f64>,
    /// `None` tant que le tirage cible n'a pas été vérifié.
    pub verification: Option<Verification>,
}

impl PredictionCandidate {
    pub fn new(target_issue: impl Into<String>, method: Method, numbers: Combination) -> Self {
        Self {
            id: None,
            target_issue: target_issue.into(),
            method,
            numbers,
            score: None,
            verification: None,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verification.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodWeight {
    pub method: Method,
    pub weight: f64,
    /// Taux de réussite lissé (EMA).
    pub hit_rate: f64,
    pub total_predictions: u32,
    pub total_hits: u32,
}

impl MethodWeight {
    pub fn new(method: Method, weight: f64) -> Self {
        Self {
            method,
            weight,
            hit_rate: 0.0,
            total_predictions: 0,
            total_hits: 0,
        }
    }

    pub fn actual_hit_rate(&self) -> f64 {
        if self.total_predictions == 0 {
            0.0
        } else {
            self.total_hits as f64 / self.total_predictions as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_numbers_ok() {
        assert!(validate_numbers(&[1, 2, 3, 4, 5], &[1, 2]).is_ok());
        assert!(validate_numbers(&[35, 34, 33, 32, 31], &[11, 12]).is_ok());
    }

    #[test]
    fn test_validate_numbers_out_of_range() {
        assert!(validate_numbers(&[0, 2, 3, 4, 5], &[1, 2]).is_err());
        assert!(validate_numbers(&[1, 2, 3, 4, 36], &[1, 2]).is_err());
        assert!(validate_numbers(&[1, 2, 3, 4, 5], &[0, 2]).is_err());
        assert!(validate_numbers(&[1, 2, 3, 4, 5], &[1, 13]).is_err());
    }

    #[test]
    fn test_validate_numbers_duplicates() {
        assert!(validate_numbers(&[1, 1, 3, 4, 5], &[1, 2]).is_err());
        assert!(validate_numbers(&[1, 2, 3, 4, 5], &[3, 3]).is_err());
    }

    #[test]
    fn test_combination_sorted() {
        let c = Combination::new([30, 2, 17, 9, 5], [11, 3]).unwrap();
        assert_eq!(c.front(), &[2, 5, 9, 17, 30]);
        assert_eq!(c.back(), &[3, 11]);
        assert_eq!(c.to_string(), "02 05 09 17 30 + 03 11");
    }

    #[test]
    fn test_combination_from_slices_wrong_len() {
        assert!(Combination::from_slices(&[1, 2, 3, 4], &[1, 2]).is_err());
        assert!(Combination::from_slices(&[1, 2, 3, 4, 5], &[1]).is_err());
        assert!(Combination::from_slices(&[1, 2, 3, 4, 5], &[1, 2]).is_ok());
    }

    #[test]
    fn test_hits_against() {
        let a = Combination::new([1, 2, 3, 4, 5], [1, 2]).unwrap();
        let b = Combination::new([1, 2, 3, 10, 11], [2, 9]).unwrap();
        assert_eq!(a.hits_against(&b), (3, 1));
        assert_eq!(a.hits_against(&a), (5, 2));
    }

    #[test]
    fn test_draw_stats() {
        let c = Combination::new([1, 2, 3, 10, 20], [5, 6]).unwrap();
        let draw = Draw::new("26001", "2026-01-03", c);
        let s = draw.stats();
        assert_eq!(s.front_sum, 36);
        assert_eq!(s.back_sum, 11);
        assert_eq!(s.front_odd, 2);
        assert_eq!(s.back_odd, 1);
        assert_eq!(s.front_consecutive, 2);
        assert_eq!(s.back_consecutive, 1);
        // diffs : 1,2,9,19,1,8,18,7,17,10 -> 9 distinctes
        assert_eq!(s.ac_value, 5);
    }

    #[test]
    fn test_ac_value_arithmetic_progression() {
        let c = Combination::new([1, 2, 3, 4, 5], [1, 2]).unwrap();
        let draw = Draw::new("1", "2026-01-01", c);
        assert_eq!(draw.stats().ac_value, 0);
    }

    #[test]
    fn test_zone_numbers_from() {
        let c = Combination::new([1, 2, 3, 4, 5], [6, 7]).unwrap();
        assert_eq!(Zone::Front.numbers_from(&c), &[1, 2, 3, 4, 5]);
        assert_eq!(Zone::Back.numbers_from(&c), &[6, 7]);
        assert_eq!(Zone::Front.numbers().count(), 35);
        assert_eq!(Zone::Back.numbers().count(), 12);
    }

    #[test]
    fn test_method_from_code() {
        assert_eq!(Method::from_code("hot"), Some(Method::Hot));
        assert_eq!(Method::from_code("GRADIENT_BOOST"), Some(Method::GradientBoost));
        assert_eq!(Method::from_code("montecarlo"), Some(Method::MonteCarlo));
        assert_eq!(Method::from_code("LSTM"), None);
        for m in Method::ALL {
            assert_eq!(Method::from_code(m.code()), Some(m));
        }
    }

    #[test]
    fn test_prize_tier_codes() {
        for t in PrizeTier::ALL {
            assert_eq!(PrizeTier::from_code(t.code()), Some(t));
        }
        assert!(PrizeTier::Tier3.is_high());
        assert!(!PrizeTier::Tier4.is_high());
        assert!(!PrizeTier::NoPrize.is_prize());
        assert!(PrizeTier::Tier1.rank() > PrizeTier::Tier7.rank());
    }

    #[test]
    fn test_actual_hit_rate() {
        let mut w = MethodWeight::new(Method::Hot, 0.1);
        assert_eq!(w.actual_hit_rate(), 0.0);
        w.total_predictions = 4;
        w.total_hits = 1;
        assert!((w.actual_hit_rate() - 0.25).abs() < 1e-12);
    }
}
