use std::collections::BTreeMap;

use serde::Serialize;

use superlotto_db::models::{Combination, Method, PredictionCandidate, PrizeTier, Verification};
use superlotto_db::repository::{DrawRepository, PredictionStore, WeightStore};

use crate::error::{EngineError, EngineResult};
use crate::learning::WeightLearner;
use crate::prize::PrizeTable;

/// Résultat de la vérification d'un tirage.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub issue: String,
    /// `None` quand aucune prédiction n'attendait ce tirage.
    pub actual: Option<Combination>,
    pub results: Vec<PredictionCandidate>,
}

impl VerificationReport {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn winners(&self) -> impl Iterator<Item = &PredictionCandidate> {
        self.results
            .iter()
            .filter(|c| c.verification.map(|v| v.tier.is_prize()).unwrap_or(false))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Composite,
    Hit,
    Prize,
    High,
}

impl SortKey {
    /// Clé inconnue : tri composite.
    pub fn from_code(code: &str) -> SortKey {
        match code.to_lowercase().as_str() {
            "hit" => SortKey::Hit,
            "prize" => SortKey::Prize,
            "high" => SortKey::High,
            _ => SortKey::Composite,
        }
    }
}

/// Statistiques de précision d'une méthode sur l'ensemble de ses prédictions vérifiées.
#[derive(Debug, Clone, Serialize)]
pub struct AccuracyStats {
    pub method: Method,
    pub total_predictions: usize,
    pub front_avg_hit: f64,
    pub back_avg_hit: f64,
    /// Comptage par rang, Tier1 en tête.
    pub tier_counts: [u32; 7],
    pub total_prize_count: u32,
    /// En pourcentage.
    pub prize_rate: f64,
    pub front_hit_rate: f64,
    pub back_hit_rate: f64,
    pub high_prize_count: u32,
    pub composite_score: f64,
    pub rank: usize,
}

impl AccuracyStats {
    pub fn from_predictions(method: Method, verified: &[PredictionCandidate]) -> Self {
        let outcomes: Vec<_> = verified.iter().filter_map(|c| c.verification).collect();
        let n = outcomes.len();
        let avg = |f: fn(&Verification) -> u8| -> f64 {
            if n == 0 {
                0.0
            } else {
                outcomes.iter().map(|v| f(v) as f64).sum::<f64>() / n as f64
            }
        };
        let front_avg_hit = avg(|v| v.front_hits);
        let back_avg_hit = avg(|v| v.back_hits);

        let mut tier_counts = [0u32; 7];
        for v in &outcomes {
            if let Some(i) = tier_index(v.tier) {
                tier_counts[i] += 1;
            }
        }
        let total_prize_count: u32 = tier_counts.iter().sum();
        let high_prize_count: u32 = tier_counts[..3].iter().sum();

        let prize_rate = if n > 0 { total_prize_count as f64 * 100.0 / n as f64 } else { 0.0 };
        let front_hit_rate = front_avg_hit * 100.0 / 5.0;
        let back_hit_rate = back_avg_hit * 100.0 / 2.0;
        let sample_weight = (n as f64 / 100.0).min(1.0);
        let composite_score = front_hit_rate * 0.25
            + back_hit_rate * 0.15
            + prize_rate * 0.30
            + high_prize_count as f64 * 2.0
            + sample_weight * 10.0;

        Self {
            method,
            total_predictions: n,
            front_avg_hit,
            back_avg_hit,
            tier_counts,
            total_prize_count,
            prize_rate,
            front_hit_rate,
            back_hit_rate,
            high_prize_count,
            composite_score,
            rank: 0,
        }
    }

    fn sort_value(&self, key: SortKey) -> f64 {
        match key {
            SortKey::Composite => self.composite_score,
            SortKey::Hit => self.front_avg_hit + self.back_avg_hit,
            SortKey::Prize => self.prize_rate,
            SortKey::High => self.high_prize_count as f64,
        }
    }
}

/// Sélection des prédictions à relire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryFilter {
    /// Les dernières enregistrées, toutes méthodes et tous tirages.
    Recent,
    Issue(String),
    /// Prédictions vérifiées d'une méthode, les plus récentes d'abord.
    Method(Method),
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub prediction: PredictionCandidate,
    pub actual: Option<Combination>,
}

pub struct Verifier<'a, S: ?Sized> {
    store: &'a S,
    prizes: &'a PrizeTable,
    learner: &'a WeightLearner,
}

impl<'a, S> Verifier<'a, S>
where
    S: DrawRepository + PredictionStore + WeightStore + ?Sized,
{
    pub fn new(store: &'a S, prizes: &'a PrizeTable, learner: &'a WeightLearner) -> Self {
        Self { store, prizes, learner }
    }

    /// Compare les prédictions en attente au tirage réel, les marque vérifiées,
    /// puis alimente l'apprentissage des poids.
    pub fn verify(&self, issue: &str) -> EngineResult<VerificationReport> {
        let draw = self
            .store
            .fetch_draw_by_issue(issue)?
            .ok_or_else(|| EngineError::DrawNotResolved { issue: issue.to_string() })?;

        let pending = self.store.load_unverified_predictions(issue)?;
        if pending.is_empty() {
            log::info!("Aucune prédiction en attente pour le tirage {}", issue);
            return Ok(VerificationReport { issue: issue.to_string(), actual: None, results: Vec::new() });
        }

        let actual = *draw.numbers();
        let mut results = pending;
        for candidate in results.iter_mut() {
            candidate.verification = Some(self.prizes.evaluate(&candidate.numbers, &actual));
        }
        self.store.mark_verified_all(&results)?;

        if let Err(e) = self.learner.adjust_batch(self.store, &results) {
            log::error!("Échec de la mise à jour des poids : {:#}", e);
        } else {
            log::info!("Tirage {} vérifié : {} prédictions, poids mis à jour", issue, results.len());
        }

        Ok(VerificationReport { issue: issue.to_string(), actual: Some(actual), results })
    }

    /// Prédictions enregistrées accompagnées du tirage réel quand il est publié.
    pub fn history(&self, filter: &HistoryFilter, limit: usize) -> EngineResult<Vec<HistoryEntry>> {
        let predictions = match filter {
            HistoryFilter::Recent => self.store.load_recent_predictions(limit)?,
            HistoryFilter::Issue(issue) => {
                let mut all = self.store.load_predictions_by_issue(issue)?;
                all.truncate(limit);
                all
            }
            HistoryFilter::Method(method) => {
                let mut verified = self.store.load_verified_predictions(Some(*method))?;
                verified.reverse();
                verified.truncate(limit);
                verified
            }
        };

        let mut draws: BTreeMap<String, Option<Combination>> = BTreeMap::new();
        let mut entries = Vec::with_capacity(predictions.len());
        for prediction in predictions {
            let actual = match draws.get(&prediction.target_issue) {
                Some(actual) => *actual,
                None => {
                    let actual = self
                        .store
                        .fetch_draw_by_issue(&prediction.target_issue)?
                        .map(|d| *d.numbers());
                    draws.insert(prediction.target_issue.clone(), actual);
                    actual
                }
            };
            entries.push(HistoryEntry { prediction, actual });
        }
        Ok(entries)
    }

    /// Tirages publiés pour lesquels des prédictions attendent encore, le plus récent d'abord.
    pub fn resolvable_issues(&self) -> EngineResult<Vec<String>> {
        let mut issues = Vec::new();
        for issue in self.store.unverified_issues()? {
            if self.store.fetch_draw_by_issue(&issue)?.is_some() {
                issues.push(issue);
            }
        }
        issues.sort_by(|a, b| b.cmp(a));
        issues.dedup();
        Ok(issues)
    }

    /// Classement des méthodes ayant au moins une prédiction vérifiée.
    pub fn accuracy_rankings(&self, sort_by: SortKey, ascending: bool) -> EngineResult<Vec<AccuracyStats>> {
        let mut by_method: BTreeMap<Method, Vec<PredictionCandidate>> = BTreeMap::new();
        for candidate in self.store.load_verified_predictions(None)? {
            by_method.entry(candidate.method).or_default().push(candidate);
        }

        let mut stats: Vec<AccuracyStats> = by_method
            .iter()
            .map(|(&method, verified)| AccuracyStats::from_predictions(method, verified))
            .collect();

        stats.sort_by(|a, b| {
            let ord = b
                .sort_value(sort_by)
                .partial_cmp(&a.sort_value(sort_by))
                .unwrap_or(std::cmp::Ordering::Equal);
            if ascending {
                ord.reverse()
            } else {
                ord
            }
        });
        for (i, s) in stats.iter_mut().enumerate() {
            s.rank = i + 1;
        }
        Ok(stats)
    }
}

/// Rang d'un compteur dans `AccuracyStats::tier_counts`.
pub fn tier_index(tier: PrizeTier) -> Option<usize> {
    tier.is_prize().then(|| (7 - tier.rank()) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LearningConfig;
    use superlotto_db::memory::MemoryStore;
    use superlotto_db::models::Draw;

    fn setup() -> (MemoryStore, WeightLearner, PrizeTable) {
        let store = MemoryStore::new();
        store
            .insert_draw(Draw::new("26010", "2026-02-01", Combination::new([2, 5, 9, 17, 30], [3, 11]).unwrap()))
            .unwrap();
        let learner = WeightLearner::new(LearningConfig::default());
        learner.bootstrap(&store).unwrap();
        (store, learner, PrizeTable::default())
    }

    #[test]
    fn test_verify_tier1() {
        let (store, learner, prizes) = setup();
        let exact = Combination::new([2, 5, 9, 17, 30], [3, 11]).unwrap();
        store.save_prediction(&PredictionCandidate::new("26010", Method::Hot, exact)).unwrap();

        let verifier = Verifier::new(&store, &prizes, &learner);
        let report = verifier.verify("26010").unwrap();
        assert_eq!(report.results.len(), 1);
        let v = report.results[0].verification.unwrap();
        assert_eq!(v, Verification { front_hits: 5, back_hits: 2, tier: PrizeTier::Tier1 });

        let rows = store.load_method_weights().unwrap();
        let hot = rows.iter().find(|r| r.method == Method::Hot).unwrap();
        assert_eq!(hot.total_hits, 1);
        assert_eq!(hot.total_predictions, 1);
        assert!(store.load_unverified_predictions("26010").unwrap().is_empty());
    }

    #[test]
    fn test_verify_unknown_draw() {
        let (store, learner, prizes) = setup();
        let err = Verifier::new(&store, &prizes, &learner).verify("29999").unwrap_err();
        assert!(matches!(err, EngineError::DrawNotResolved { .. }));
    }

    #[test]
    fn test_verify_nothing_pending() {
        let (store, learner, prizes) = setup();
        let report = Verifier::new(&store, &prizes, &learner).verify("26010").unwrap();
        assert!(report.is_empty());
        assert!(report.actual.is_none());
    }

    #[test]
    fn test_verify_twice_is_idempotent() {
        let (store, learner, prizes) = setup();
        store
            .save_prediction(&PredictionCandidate::new("26010", Method::Ml, Combination::LOWEST))
            .unwrap();
        let verifier = Verifier::new(&store, &prizes, &learner);
        assert_eq!(verifier.verify("26010").unwrap().results.len(), 1);
        assert!(verifier.verify("26010").unwrap().is_empty());
    }

    #[test]
    fn test_rankings_composite() {
        let (store, learner, prizes) = setup();
        let good = Combination::new([2, 5, 9, 17, 31], [3, 12]).unwrap();
        store.save_prediction(&PredictionCandidate::new("26010", Method::Markov, good)).unwrap();
        store
            .save_prediction(&PredictionCandidate::new("26010", Method::Hot, Combination::LOWEST))
            .unwrap();
        let verifier = Verifier::new(&store, &prizes, &learner);
        verifier.verify("26010").unwrap();

        let rankings = verifier.accuracy_rankings(SortKey::Composite, false).unwrap();
        assert_eq!(rankings.len(), 2);
        assert_eq!(rankings[0].method, Method::Markov);
        assert_eq!(rankings[0].rank, 1);
        assert_eq!(rankings[1].rank, 2);
        // 4+1 = Tier4
        assert_eq!(rankings[0].tier_counts[tier_index(PrizeTier::Tier4).unwrap()], 1);
        assert!((rankings[0].front_hit_rate - 80.0).abs() < 1e-9);
        assert!((rankings[0].prize_rate - 100.0).abs() < 1e-9);

        let ascending = verifier.accuracy_rankings(SortKey::Composite, true).unwrap();
        assert_eq!(ascending[0].method, Method::Hot);
    }

    #[test]
    fn test_resolvable_issues_need_a_draw() {
        let (store, learner, prizes) = setup();
        store
            .save_prediction(&PredictionCandidate::new("26010", Method::Hot, Combination::LOWEST))
            .unwrap();
        store
            .save_prediction(&PredictionCandidate::new("26011", Method::Hot, Combination::LOWEST))
            .unwrap();
        let issues = Verifier::new(&store, &prizes, &learner).resolvable_issues().unwrap();
        assert_eq!(issues, vec!["26010".to_string()]);
    }

    /// Magasin dont l'écriture groupée échoue sur la deuxième prédiction.
    struct FailingBatchStore(MemoryStore);

    impl DrawRepository for FailingBatchStore {
        fn fetch_recent_draws(&self, limit: usize) -> anyhow::Result<Vec<Draw>> {
            self.0.fetch_recent_draws(limit)
        }
        fn fetch_draw_by_issue(&self, issue: &str) -> anyhow::Result<Option<Draw>> {
            self.0.fetch_draw_by_issue(issue)
        }
        fn fetch_all_draws(&self) -> anyhow::Result<Vec<Draw>> {
            self.0.fetch_all_draws()
        }
    }

    impl WeightStore for FailingBatchStore {
        fn load_method_weights(&self) -> anyhow::Result<Vec<superlotto_db::models::MethodWeight>> {
            self.0.load_method_weights()
        }
        fn save_method_weights(&self, rows: &[superlotto_db::models::MethodWeight]) -> anyhow::Result<()> {
            self.0.save_method_weights(rows)
        }
    }

    impl PredictionStore for FailingBatchStore {
        fn load_unverified_predictions(&self, issue: &str) -> anyhow::Result<Vec<PredictionCandidate>> {
            self.0.load_unverified_predictions(issue)
        }
        fn save_prediction(&self, candidate: &PredictionCandidate) -> anyhow::Result<i64> {
            self.0.save_prediction(candidate)
        }
        fn mark_verified(&self, candidate: &PredictionCandidate) -> anyhow::Result<()> {
            self.0.mark_verified(candidate)
        }
        fn mark_verified_all(&self, candidates: &[PredictionCandidate]) -> anyhow::Result<()> {
            let mut batch = candidates.to_vec();
            if let Some(second) = batch.get_mut(1) {
                second.id = Some(-1);
            }
            self.0.mark_verified_all(&batch)
        }
        fn load_predictions_by_issue(&self, issue: &str) -> anyhow::Result<Vec<PredictionCandidate>> {
            self.0.load_predictions_by_issue(issue)
        }
        fn load_recent_predictions(&self, limit: usize) -> anyhow::Result<Vec<PredictionCandidate>> {
            self.0.load_recent_predictions(limit)
        }
        fn load_verified_predictions(&self, method: Option<Method>) -> anyhow::Result<Vec<PredictionCandidate>> {
            self.0.load_verified_predictions(method)
        }
        fn unverified_issues(&self) -> anyhow::Result<Vec<String>> {
            self.0.unverified_issues()
        }
    }

    #[test]
    fn test_failed_write_leaves_nothing_verified() {
        let (inner, learner, prizes) = setup();
        let exact = Combination::new([2, 5, 9, 17, 30], [3, 11]).unwrap();
        inner.save_prediction(&PredictionCandidate::new("26010", Method::Hot, exact)).unwrap();
        inner.save_prediction(&PredictionCandidate::new("26010", Method::Ml, exact)).unwrap();
        let store = FailingBatchStore(inner);

        assert!(Verifier::new(&store, &prizes, &learner).verify("26010").is_err());
        assert_eq!(store.load_unverified_predictions("26010").unwrap().len(), 2, "aucune ligne marquée");
        let rows = store.load_method_weights().unwrap();
        assert!(rows.iter().all(|r| r.total_predictions == 0), "poids inchangés");

        let report = Verifier::new(&store.0, &prizes, &learner).verify("26010").unwrap();
        assert_eq!(report.results.len(), 2, "les deux prédictions restent vérifiables");
    }

    #[test]
    fn test_history_attaches_actual_draw() {
        let (store, learner, prizes) = setup();
        store
            .save_prediction(&PredictionCandidate::new("26010", Method::Hot, Combination::LOWEST))
            .unwrap();
        store
            .save_prediction(&PredictionCandidate::new("26011", Method::Hot, Combination::LOWEST))
            .unwrap();
        let verifier = Verifier::new(&store, &prizes, &learner);

        let recent = verifier.history(&HistoryFilter::Recent, 10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].prediction.target_issue, "26011");
        assert!(recent[0].actual.is_none(), "tirage 26011 pas encore publié");
        assert!(recent[1].actual.is_some());

        assert!(verifier.history(&HistoryFilter::Method(Method::Hot), 10).unwrap().is_empty());
        verifier.verify("26010").unwrap();
        let verified = verifier.history(&HistoryFilter::Method(Method::Hot), 10).unwrap();
        assert_eq!(verified.len(), 1);
        assert!(verified[0].prediction.is_verified());

        let by_issue = verifier.history(&HistoryFilter::Issue("26011".into()), 10).unwrap();
        assert_eq!(by_issue.len(), 1);
    }

    #[test]
    fn test_sort_key_codes() {
        assert_eq!(SortKey::from_code("PRIZE"), SortKey::Prize);
        assert_eq!(SortKey::from_code("whatever"), SortKey::Composite);
    }
}
