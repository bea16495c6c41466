use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use superlotto_db::models::Method;

use crate::error::EngineError;
use crate::prize::PrizeTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Fenêtre des numéros chauds/froids.
    pub hot_cold_period: usize,
    /// Fenêtre de l'analyse des retards.
    pub missing_period: usize,
    pub association_period: usize,
    /// Nombre de tirages affichés par défaut dans les tendances.
    pub trend_limit: usize,
    pub min_support: f64,
    pub min_confidence: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            hot_cold_period: 30,
            missing_period: 500,
            association_period: 200,
            trend_limit: 30,
            min_support: 0.02,
            min_confidence: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub ema_alpha: f64,
    pub front_hit_threshold: u8,
    pub back_hit_threshold: u8,
    /// Poids utilisé par le prédicteur adaptatif quand une méthode n'a pas de ligne.
    pub initial_weight: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            ema_alpha: 0.1,
            front_hit_threshold: 3,
            back_hit_threshold: 1,
            initial_weight: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub history: usize,
    pub direct_samples: usize,
    pub mcmc_samples: usize,
    pub importance_samples: usize,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            history: 300,
            direct_samples: 50_000,
            mcmc_samples: 10_000,
            importance_samples: 20_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub analysis: AnalysisConfig,
    pub learning: LearningConfig,
    pub monte_carlo: MonteCarloConfig,
    pub prizes: PrizeTable,
    /// Libellés personnalisés, indexés par code de méthode.
    pub method_labels: BTreeMap<String, String>,
}

impl EngineConfig {
    pub fn label(&self, method: Method) -> String {
        self.method_labels
            .get(method.code())
            .cloned()
            .unwrap_or_else(|| method.default_label().to_string())
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let a = &self.analysis;
        if a.hot_cold_period == 0 || a.missing_period == 0 || a.association_period == 0 || a.trend_limit == 0 {
            return Err(EngineError::Config("les fenêtres d'analyse doivent être > 0".into()));
        }
        if !(0.0..=1.0).contains(&a.min_support) || !(0.0..=1.0).contains(&a.min_confidence) {
            return Err(EngineError::Config("support et confiance doivent être dans [0, 1]".into()));
        }
        let alpha = self.learning.ema_alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(EngineError::Config(format!("ema_alpha = {} hors de ]0, 1]", alpha)));
        }
        if self.prizes.cost_per_combination == 0 {
            return Err(EngineError::Config("le coût d'une grille doit être > 0".into()));
        }
        for code in self.method_labels.keys() {
            if Method::from_code(code).is_none() {
                return Err(EngineError::Config(format!("libellé pour une méthode inconnue : {}", code)));
            }
        }
        Ok(())
    }
}

pub fn save_config(config: &EngineConfig, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)
        .with_context(|| format!("Impossible d'écrire la configuration {:?}", path))?;
    Ok(())
}

/// Charge la configuration ; les clés absentes prennent leur valeur par défaut.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire la configuration {:?}", path))?;
    let config: EngineConfig = serde_json::from_str(&json)
        .with_context(|| format!("Configuration {:?} illisible", path))?;
    config.validate()?;
    Ok(config)
}
