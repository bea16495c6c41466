use rand::rngs::StdRng;
use rand::SeedableRng;

use superlotto_db::models::{Draw, Method, MethodWeight, PredictionCandidate, Zone};
use superlotto_db::repository::{DrawRepository, PredictionStore, WeightStore};

use crate::analysis::association::{AssociationMiner, AssociationNetwork, AssociationRule};
use crate::analysis::frequency::{frequency, NumberFrequency};
use crate::analysis::missing::{MissingAnalyzer, NumberGap};
use crate::analysis::trend::{number_trend, sum_trend, trend_data, TrendPoint};
use crate::backtest::{BacktestResult, Backtester};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::learning::{MethodWeights, WeightLearner};
use crate::predictors::build_predictor;
use crate::scorer::PredictionScorer;
use crate::verify::{AccuracyStats, HistoryEntry, HistoryFilter, SortKey, VerificationReport, Verifier};

/// Méthodes « en ligne », utilisées quand aucune méthode n'est précisée.
pub const ONLINE_METHODS: [Method; 5] = [
    Method::Hot,
    Method::Missing,
    Method::Balanced,
    Method::Ml,
    Method::Adaptive,
];

/// Plafond du nombre de grilles demandées en une fois (par méthode ou par tirage rejoué).
pub const MAX_GRIDS: usize = 1_000;

const FIRST_ISSUE: &str = "26001";
const MIN_SNAPSHOT: usize = 500;

/// Point d'entrée unique : prédiction, vérification, apprentissage, analyses.
pub struct Engine<'a, S: ?Sized> {
    store: &'a S,
    config: EngineConfig,
    learner: WeightLearner,
}

impl<'a, S> Engine<'a, S>
where
    S: DrawRepository + PredictionStore + WeightStore + ?Sized,
{
    /// Valide la configuration et crée les lignes de poids manquantes.
    pub fn new(store: &'a S, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let learner = WeightLearner::new(config.learning.clone());
        learner.bootstrap(store)?;
        Ok(Self { store, config, learner })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn snapshot_depth(&self) -> usize {
        [
            MIN_SNAPSHOT,
            self.config.analysis.hot_cold_period,
            self.config.analysis.missing_period,
            self.config.analysis.association_period,
            self.config.monte_carlo.history,
        ]
        .into_iter()
        .max()
        .unwrap_or(MIN_SNAPSHOT)
    }

    /// Instantané de l'historique, le plus récent en premier.
    pub fn history(&self) -> EngineResult<Vec<Draw>> {
        Ok(self.store.fetch_recent_draws(self.snapshot_depth())?)
    }

    /// Numéro du prochain tirage : dernier + 1.
    pub fn next_issue(&self) -> EngineResult<String> {
        let latest = self.store.fetch_recent_draws(1)?;
        Ok(match latest.first() {
            Some(draw) if draw.issue_number() > 0 => (draw.issue_number() + 1).to_string(),
            _ => FIRST_ISSUE.to_string(),
        })
    }

    fn check_count(count: usize) -> EngineResult<()> {
        if count == 0 || count > MAX_GRIDS {
            return Err(EngineError::InvalidCount { count, max: MAX_GRIDS });
        }
        Ok(())
    }

    fn target(&self, target_issue: Option<&str>) -> EngineResult<String> {
        match target_issue {
            Some(issue) if !issue.trim().is_empty() => Ok(issue.trim().to_string()),
            _ => self.next_issue(),
        }
    }

    /// Génère et enregistre `count` grilles par méthode (les méthodes en ligne si `None`).
    pub fn generate(
        &self,
        method: Option<Method>,
        count: usize,
        target_issue: Option<&str>,
        seed: u64,
    ) -> EngineResult<Vec<PredictionCandidate>> {
        Self::check_count(count)?;
        let target = self.target(target_issue)?;
        let history = self.history()?;
        let weights = self.method_weights()?;
        let methods: Vec<Method> = match method {
            Some(m) => vec![m],
            None => ONLINE_METHODS.to_vec(),
        };

        let mut rng = StdRng::seed_from_u64(seed);
        let mut saved = Vec::with_capacity(methods.len() * count);
        for m in methods {
            let predictor = build_predictor(m, &self.config, &weights);
            for numbers in predictor.predict_multiple(&history, count, &mut rng) {
                saved.push(self.persist(PredictionCandidate::new(target.clone(), m, numbers))?);
            }
        }
        log::info!("{} grilles enregistrées pour le tirage {}", saved.len(), target);
        Ok(saved)
    }

    /// Pour chaque méthode en ligne, génère `candidate_count` grilles et n'enregistre que la meilleure.
    pub fn generate_best(
        &self,
        candidate_count: usize,
        target_issue: Option<&str>,
        seed: u64,
    ) -> EngineResult<Vec<PredictionCandidate>> {
        Self::check_count(candidate_count)?;
        let target = self.target(target_issue)?;
        let history = self.history()?;
        let weights = self.method_weights()?;

        let mut rng = StdRng::seed_from_u64(seed);
        let mut saved = Vec::with_capacity(ONLINE_METHODS.len());
        for m in ONLINE_METHODS {
            let predictor = build_predictor(m, &self.config, &weights);
            let candidates = predictor.predict_multiple(&history, candidate_count, &mut rng);
            let Some(best) = PredictionScorer::select_best(&candidates, &history) else {
                continue;
            };
            saved.push(self.persist(PredictionCandidate::new(target.clone(), m, candidates[best]))?);
        }
        Ok(saved)
    }

    fn persist(&self, mut candidate: PredictionCandidate) -> EngineResult<PredictionCandidate> {
        candidate.id = Some(self.store.save_prediction(&candidate)?);
        Ok(candidate)
    }

    fn verifier(&self) -> Verifier<'_, S> {
        Verifier::new(self.store, &self.config.prizes, &self.learner)
    }

    pub fn verify(&self, issue: &str) -> EngineResult<VerificationReport> {
        self.verifier().verify(issue)
    }

    /// Vérifie tous les tirages publiés qui ont encore des prédictions en attente.
    pub fn verify_pending(&self) -> EngineResult<Vec<VerificationReport>> {
        let verifier = self.verifier();
        verifier
            .resolvable_issues()?
            .iter()
            .map(|issue| verifier.verify(issue))
            .collect()
    }

    /// Prédictions enregistrées et tirage réel correspondant, voir [`HistoryFilter`].
    pub fn prediction_history(&self, filter: &HistoryFilter, limit: usize) -> EngineResult<Vec<HistoryEntry>> {
        self.verifier().history(filter, limit)
    }

    pub fn accuracy_rankings(&self, sort_by: SortKey, ascending: bool) -> EngineResult<Vec<AccuracyStats>> {
        self.verifier().accuracy_rankings(sort_by, ascending)
    }

    pub fn backtest(
        &self,
        methods: &[Method],
        issue_count: usize,
        per_issue: usize,
        seed: u64,
        on_done: impl Fn(&BacktestResult) + Sync,
    ) -> EngineResult<Vec<BacktestResult>> {
        Self::check_count(per_issue)?;
        let history = self.history()?;
        let backtester = Backtester::new(&self.config, self.method_weights()?);
        Ok(backtester.run_with_progress(&history, methods, issue_count, per_issue, seed, on_done))
    }

    fn miner(&self) -> AssociationMiner {
        let a = &self.config.analysis;
        AssociationMiner::new(a.association_period, a.min_support, a.min_confidence)
    }

    /// Règles fortes de la zone ; `sequential` pour les règles d'un tirage au suivant.
    pub fn association_rules(&self, zone: Zone, sequential: bool) -> EngineResult<Vec<AssociationRule>> {
        let history = self.history()?;
        let miner = self.miner();
        Ok(if sequential { miner.mine_sequential(&history, zone) } else { miner.mine(&history, zone) })
    }

    pub fn association_network(&self, zone: Zone, top_n: usize) -> EngineResult<AssociationNetwork> {
        Ok(self.miner().network(&self.history()?, zone, top_n))
    }

    pub fn related_numbers(&self, zone: Zone, number: u8, top_n: usize) -> EngineResult<Vec<u8>> {
        Ok(self.miner().related_numbers(&self.history()?, number, zone, top_n))
    }

    /// Fréquences sur les `period` derniers tirages (tout l'instantané si `None`).
    pub fn frequency_table(&self, zone: Zone, period: Option<usize>) -> EngineResult<Vec<NumberFrequency>> {
        Ok(frequency(&self.history()?, zone, period))
    }

    pub fn missing_table(&self, zone: Zone) -> EngineResult<Vec<NumberGap>> {
        let analyzer = MissingAnalyzer::new(self.config.analysis.missing_period);
        Ok(analyzer.gaps(&self.history()?, zone))
    }

    /// Série des `limit` derniers tirages (défaut : `trend_limit`), du plus ancien au plus récent.
    pub fn trend(&self, limit: Option<usize>) -> EngineResult<Vec<TrendPoint>> {
        Ok(trend_data(&self.history()?, self.trend_limit(limit)))
    }

    pub fn number_trend(&self, zone: Zone, number: u8, limit: Option<usize>) -> EngineResult<Vec<bool>> {
        Ok(number_trend(&self.history()?, zone, number, self.trend_limit(limit)))
    }

    pub fn sum_trend(&self, zone: Zone, limit: Option<usize>) -> EngineResult<Vec<u32>> {
        Ok(sum_trend(&self.history()?, zone, self.trend_limit(limit)))
    }

    fn trend_limit(&self, limit: Option<usize>) -> usize {
        limit.unwrap_or(self.config.analysis.trend_limit)
    }

    pub fn method_weights(&self) -> EngineResult<MethodWeights> {
        Ok(self.learner.current_weights(self.store)?)
    }

    pub fn method_weight_rows(&self) -> EngineResult<Vec<MethodWeight>> {
        let mut rows = self.store.load_method_weights()?;
        rows.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
        Ok(rows)
    }

    pub fn reset_weights(&self) -> EngineResult<()> {
        self.learner.reset(self.store)?;
        log::info!("Poids des méthodes réinitialisés");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::frequency::FrequencyAnalyzer;
    use crate::make_test_draws;
    use superlotto_db::memory::MemoryStore;
    use superlotto_db::models::{Combination, PrizeTier};

    fn fast_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.monte_carlo.direct_samples = 500;
        config.monte_carlo.mcmc_samples = 500;
        config.monte_carlo.importance_samples = 500;
        config
    }

    #[test]
    fn test_next_issue() {
        let empty = MemoryStore::new();
        let engine = Engine::new(&empty, fast_config()).unwrap();
        assert_eq!(engine.next_issue().unwrap(), "26001");

        let store = MemoryStore::with_draws(make_test_draws(10));
        let engine = Engine::new(&store, fast_config()).unwrap();
        assert_eq!(engine.next_issue().unwrap(), "26011");
    }

    #[test]
    fn test_generate_online_methods() {
        let store = MemoryStore::with_draws(make_test_draws(60));
        let engine = Engine::new(&store, fast_config()).unwrap();
        let saved = engine.generate(None, 3, None, 20260101).unwrap();

        assert_eq!(saved.len(), ONLINE_METHODS.len() * 3);
        assert!(saved.iter().all(|c| c.id.is_some() && c.target_issue == "26061"));
        assert_eq!(store.load_unverified_predictions("26061").unwrap().len(), 15);
    }

    #[test]
    fn test_generate_best_one_per_method() {
        let store = MemoryStore::with_draws(make_test_draws(60));
        let engine = Engine::new(&store, fast_config()).unwrap();
        let saved = engine.generate_best(5, Some("30000"), 1).unwrap();
        assert_eq!(saved.len(), ONLINE_METHODS.len());
        let methods: Vec<Method> = saved.iter().map(|c| c.method).collect();
        assert_eq!(methods, ONLINE_METHODS.to_vec());
    }

    #[test]
    fn test_seven_in_every_draw() {
        let draws: Vec<Draw> = (0..40)
            .map(|i| {
                let others = [(i % 5) as u8 + 1, (i % 5) as u8 + 10, (i % 5) as u8 + 20, (i % 5) as u8 + 30];
                let front = [7, others[0], others[1], others[2], others[3]];
                Draw::new(format!("{}", 26100 - i), "2026-01-01", Combination::new(front, [1, 2]).unwrap())
            })
            .collect();
        let store = MemoryStore::with_draws(draws);
        let engine = Engine::new(&store, fast_config()).unwrap();
        let history = engine.history().unwrap();

        let hot = FrequencyAnalyzer::new(30).hot(&history, Zone::Front, 1);
        assert_eq!(hot, vec![7]);
        let due = MissingAnalyzer::new(500).due_numbers(&history, Zone::Front, 35);
        assert!(!due.contains(&7), "7 ne peut pas être en retard");
    }

    #[test]
    fn test_predict_then_verify_tier1() {
        let store = MemoryStore::with_draws(make_test_draws(30));
        let engine = Engine::new(&store, fast_config()).unwrap();
        let exact = Combination::new([1, 2, 3, 4, 5], [1, 2]).unwrap();
        store
            .save_prediction(&PredictionCandidate::new("26031", Method::Balanced, exact))
            .unwrap();
        store
            .insert_draw(Draw::new("26031", "2026-03-01", exact))
            .unwrap();

        let reports = engine.verify_pending().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].results[0].verification.unwrap().tier, PrizeTier::Tier1);

        let rows = engine.method_weight_rows().unwrap();
        let balanced = rows.iter().find(|r| r.method == Method::Balanced).unwrap();
        assert_eq!(balanced.total_hits, 1);
        assert_eq!(rows[0].method, Method::Balanced, "méthode gagnante en tête");

        engine.reset_weights().unwrap();
        let weights = engine.method_weights().unwrap();
        assert!(weights.iter().all(|(_, w)| (w - 0.1).abs() < 1e-12));
    }

    #[test]
    fn test_grid_count_bounds() {
        let store = MemoryStore::with_draws(make_test_draws(20));
        let engine = Engine::new(&store, fast_config()).unwrap();
        assert!(matches!(
            engine.generate(Some(Method::Hot), MAX_GRIDS + 1, None, 1),
            Err(EngineError::InvalidCount { .. })
        ));
        assert!(matches!(engine.generate_best(0, None, 1), Err(EngineError::InvalidCount { .. })));
        assert!(matches!(
            engine.backtest(&[Method::Hot], 5, MAX_GRIDS + 1, 1, |_| {}),
            Err(EngineError::InvalidCount { .. })
        ));
        assert!(store.predictions().unwrap().is_empty(), "rien n'est enregistré");
    }

    #[test]
    fn test_trend_default_limit() {
        let store = MemoryStore::with_draws(make_test_draws(50));
        let engine = Engine::new(&store, fast_config()).unwrap();
        let trend = engine.trend(None).unwrap();
        assert_eq!(trend.len(), 30);
        assert_eq!(trend.last().unwrap().issue, "26050");
        assert_eq!(engine.sum_trend(Zone::Back, Some(5)).unwrap().len(), 5);
        assert_eq!(engine.number_trend(Zone::Front, 1, Some(12)).unwrap().len(), 12);
    }

    #[test]
    fn test_prediction_history_after_verify() {
        let store = MemoryStore::with_draws(make_test_draws(30));
        let engine = Engine::new(&store, fast_config()).unwrap();
        engine.generate(Some(Method::Hot), 2, Some("26030"), 3).unwrap();
        engine.verify("26030").unwrap();

        let history = engine.prediction_history(&HistoryFilter::Method(Method::Hot), 10).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|e| e.prediction.is_verified() && e.actual.is_some()));
        assert!(engine.prediction_history(&HistoryFilter::Issue("26031".into()), 10).unwrap().is_empty());
    }

    #[test]
    fn test_tables_cover_zone() {
        let store = MemoryStore::with_draws(make_test_draws(50));
        let engine = Engine::new(&store, fast_config()).unwrap();
        assert_eq!(engine.frequency_table(Zone::Front, Some(10)).unwrap().len(), 35);
        assert_eq!(engine.missing_table(Zone::Back).unwrap().len(), 12);
    }
}
