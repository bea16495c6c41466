use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};

use crate::models::{Draw, Method, MethodWeight, PredictionCandidate};
use crate::repository::{DrawRepository, PredictionStore, WeightStore};

/// Stockage en mémoire, pour les tests et les simulations.
#[derive(Default)]
pub struct MemoryStore {
    draws: Mutex<Vec<Draw>>,
    predictions: Mutex<Vec<PredictionCandidate>>,
    weights: Mutex<Vec<MethodWeight>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| anyhow!("Verrou du stockage mémoire empoisonné"))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `draws` dans n'importe quel ordre.
    pub fn with_draws(draws: Vec<Draw>) -> Self {
        let store = Self::new();
        if let Ok(mut guard) = store.draws.lock() {
            *guard = draws;
        }
        store
    }

    pub fn insert_draw(&self, draw: Draw) -> Result<bool> {
        let mut draws = lock(&self.draws)?;
        if draws.iter().any(|d| d.issue() == draw.issue()) {
            return Ok(false);
        }
        draws.push(draw);
        Ok(true)
    }

    pub fn predictions(&self) -> Result<Vec<PredictionCandidate>> {
        Ok(lock(&self.predictions)?.clone())
    }
}

impl DrawRepository for MemoryStore {
    fn fetch_recent_draws(&self, limit: usize) -> Result<Vec<Draw>> {
        let mut draws = lock(&self.draws)?.clone();
        draws.sort_by(|a, b| b.issue_number().cmp(&a.issue_number()));
        draws.truncate(limit);
        Ok(draws)
    }

    fn fetch_draw_by_issue(&self, issue: &str) -> Result<Option<Draw>> {
        Ok(lock(&self.draws)?.iter().find(|d| d.issue() == issue).cloned())
    }

    fn fetch_all_draws(&self) -> Result<Vec<Draw>> {
        Ok(lock(&self.draws)?.clone())
    }
}

impl WeightStore for MemoryStore {
    fn load_method_weights(&self) -> Result<Vec<MethodWeight>> {
        Ok(lock(&self.weights)?.clone())
    }

    fn save_method_weights(&self, rows: &[MethodWeight]) -> Result<()> {
        let mut weights = lock(&self.weights)?;
        for row in rows {
            match weights.iter_mut().find(|w| w.method == row.method) {
                Some(existing) => *existing = row.clone(),
                None => weights.push(row.clone()),
            }
        }
        Ok(())
    }
}

impl PredictionStore for MemoryStore {
    fn load_unverified_predictions(&self, issue: &str) -> Result<Vec<PredictionCandidate>> {
        Ok(lock(&self.predictions)?
            .iter()
            .filter(|p| p.target_issue == issue && !p.is_verified())
            .cloned()
            .collect())
    }

    fn save_prediction(&self, candidate: &PredictionCandidate) -> Result<i64> {
        let mut predictions = lock(&self.predictions)?;
        let id = predictions.len() as i64 + 1;
        let mut stored = candidate.clone();
        stored.id = Some(id);
        predictions.push(stored);
        Ok(id)
    }

    fn mark_verified(&self, candidate: &PredictionCandidate) -> Result<()> {
        let Some(id) = candidate.id else {
            bail!("Prédiction sans identifiant : impossible de la marquer vérifiée");
        };
        let mut predictions = lock(&self.predictions)?;
        match predictions.iter_mut().find(|p| p.id == Some(id)) {
            Some(stored) => {
                stored.verification = candidate.verification;
                Ok(())
            }
            None => bail!("Prédiction {} introuvable", id),
        }
    }

    fn mark_verified_all(&self, candidates: &[PredictionCandidate]) -> Result<()> {
        let mut predictions = lock(&self.predictions)?;
        let mut positions = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let Some(id) = candidate.id else {
                bail!("Prédiction sans identifiant : impossible de la marquer vérifiée");
            };
            if candidate.verification.is_none() {
                bail!("Prédiction {} sans résultat de vérification", id);
            }
            match predictions.iter().position(|p| p.id == Some(id)) {
                Some(i) => positions.push(i),
                None => bail!("Prédiction {} introuvable", id),
            }
        }
        for (i, candidate) in positions.into_iter().zip(candidates) {
            predictions[i].verification = candidate.verification;
        }
        Ok(())
    }

    fn load_predictions_by_issue(&self, issue: &str) -> Result<Vec<PredictionCandidate>> {
        Ok(lock(&self.predictions)?
            .iter()
            .filter(|p| p.target_issue == issue)
            .cloned()
            .collect())
    }

    fn load_recent_predictions(&self, limit: usize) -> Result<Vec<PredictionCandidate>> {
        Ok(lock(&self.predictions)?.iter().rev().take(limit).cloned().collect())
    }

    fn load_verified_predictions(&self, method: Option<Method>) -> Result<Vec<PredictionCandidate>> {
        Ok(lock(&self.predictions)?
            .iter()
            .filter(|p| p.is_verified() && method.map_or(true, |m| p.method == m))
            .cloned()
            .collect())
    }

    fn unverified_issues(&self) -> Result<Vec<String>> {
        let predictions = lock(&self.predictions)?;
        let mut issues: Vec<String> = predictions
            .iter()
            .filter(|p| !p.is_verified())
            .map(|p| p.target_issue.clone())
            .collect();
        issues.sort_by(|a, b| {
            let key = |i: &String| i.parse::<u64>().unwrap_or(0);
            key(a).cmp(&key(b)).then_with(|| a.cmp(b))
        });
        issues.dedup();
        Ok(issues)
    }
}
