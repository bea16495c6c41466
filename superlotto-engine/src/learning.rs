use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use superlotto_db::models::{Method, MethodWeight, PredictionCandidate};
use superlotto_db::repository::WeightStore;

use crate::config::LearningConfig;

/// Instantané des poids et taux de réussite lissés, par méthode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodWeights {
    weights: BTreeMap<Method, f64>,
    hit_rates: BTreeMap<Method, f64>,
}

impl MethodWeights {
    pub fn uniform() -> Self {
        let w = 1.0 / Method::ALL.len() as f64;
        let mut weights = Self::default();
        for m in Method::ALL {
            weights.set(m, w);
        }
        weights
    }

    pub fn from_rows(rows: &[MethodWeight]) -> Self {
        Self {
            weights: rows.iter().map(|r| (r.method, r.weight)).collect(),
            hit_rates: rows.iter().map(|r| (r.method, r.hit_rate)).collect(),
        }
    }

    pub fn get(&self, method: Method) -> Option<f64> {
        self.weights.get(&method).copied()
    }

    pub fn set(&mut self, method: Method, weight: f64) {
        self.weights.insert(method, weight);
    }

    pub fn hit_rates(&self) -> &BTreeMap<Method, f64> {
        &self.hit_rates
    }

    pub fn iter(&self) -> impl Iterator<Item = (Method, f64)> + '_ {
        self.weights.iter().map(|(&m, &w)| (m, w))
    }
}

/// Apprentissage en ligne des poids : EMA du taux de réussite, puis normalisation.
/// Un seul écrivain à la fois par magasin.
pub struct WeightLearner {
    config: LearningConfig,
    guard: Mutex<()>,
}

fn uniform_weight(n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        1.0 / n as f64
    }
}

/// Poids = taux / somme des taux, ou uniforme si tous les taux sont nuls.
fn recalculate(rows: &mut [MethodWeight]) {
    let total: f64 = rows.iter().map(|r| r.hit_rate).sum();
    let fallback = uniform_weight(rows.len());
    for row in rows.iter_mut() {
        row.weight = if total > 0.0 { row.hit_rate / total } else { fallback };
    }
}

impl WeightLearner {
    pub fn new(config: LearningConfig) -> Self {
        Self { config, guard: Mutex::new(()) }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.guard.lock().map_err(|_| anyhow!("verrou de l'apprentissage empoisonné"))
    }

    pub fn is_hit(&self, front_hits: u8, back_hits: u8) -> bool {
        front_hits >= self.config.front_hit_threshold || back_hits >= self.config.back_hit_threshold
    }

    /// Intègre un lot de prédictions vérifiées puis renormalise, en une seule écriture.
    pub fn adjust_batch<S: WeightStore + ?Sized>(&self, store: &S, verified: &[PredictionCandidate]) -> Result<()> {
        let _guard = self.lock()?;
        let mut rows = store.load_method_weights()?;
        let alpha = self.config.ema_alpha;

        for candidate in verified {
            let Some(v) = candidate.verification else {
                continue;
            };
            let Some(row) = rows.iter_mut().find(|r| r.method == candidate.method) else {
                log::warn!("Aucune ligne de poids pour {}, prédiction ignorée", candidate.method);
                continue;
            };

            let hit = self.is_hit(v.front_hits, v.back_hits);
            row.total_predictions += 1;
            if hit {
                row.total_hits += 1;
            }
            let observed = if hit { 1.0 } else { 0.0 };
            let previous = row.hit_rate;
            row.hit_rate = alpha * observed + (1.0 - alpha) * previous;
            log::debug!("{} : taux {:.4} -> {:.4} (touché : {})", row.method, previous, row.hit_rate, hit);
        }

        recalculate(&mut rows);
        store.save_method_weights(&rows)?;
        log::info!("Poids recalculés pour {} méthodes", rows.len());
        Ok(())
    }

    pub fn recalculate_all<S: WeightStore + ?Sized>(&self, store: &S) -> Result<()> {
        let _guard = self.lock()?;
        let mut rows = store.load_method_weights()?;
        recalculate(&mut rows);
        store.save_method_weights(&rows)
    }

    /// Crée les lignes manquantes ; les poids sont ensuite renormalisés.
    pub fn bootstrap<S: WeightStore + ?Sized>(&self, store: &S) -> Result<()> {
        let _guard = self.lock()?;
        let mut rows = store.load_method_weights()?;
        let missing: Vec<Method> = Method::ALL
            .iter()
            .copied()
            .filter(|m| !rows.iter().any(|r| r.method == *m))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        for m in &missing {
            rows.push(MethodWeight::new(*m, 0.0));
        }
        recalculate(&mut rows);
        store.save_method_weights(&rows)?;
        log::info!("{} lignes de poids initialisées", missing.len());
        Ok(())
    }

    /// Remet compteurs et taux à zéro, poids uniformes.
    pub fn reset<S: WeightStore + ?Sized>(&self, store: &S) -> Result<()> {
        let _guard = self.lock()?;
        let mut rows: Vec<MethodWeight> = store
            .load_method_weights()?
            .into_iter()
            .map(|r| MethodWeight::new(r.method, 0.0))
            .collect();
        recalculate(&mut rows);
        store.save_method_weights(&rows)
    }

    pub fn current_weights<S: WeightStore + ?Sized>(&self, store: &S) -> Result<MethodWeights> {
        Ok(MethodWeights::from_rows(&store.load_method_weights()?))
    }
}
