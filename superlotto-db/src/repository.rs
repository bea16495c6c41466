use anyhow::Result;

use crate::models::{Draw, Method, MethodWeight, PredictionCandidate};

/// Accès en lecture à l'historique des tirages.
pub trait DrawRepository {
    /// Les `limit` tirages les plus récents, le plus récent en premier.
    fn fetch_recent_draws(&self, limit: usize) -> Result<Vec<Draw>>;

    fn fetch_draw_by_issue(&self, issue: &str) -> Result<Option<Draw>>;

    /// Tous les tirages, sans ordre garanti.
    fn fetch_all_draws(&self) -> Result<Vec<Draw>>;
}

pub trait WeightStore {
    fn load_method_weights(&self) -> Result<Vec<MethodWeight>>;

    /// Écrit toutes les lignes en une seule opération atomique.
    fn save_method_weights(&self, rows: &[MethodWeight]) -> Result<()>;
}

pub trait PredictionStore {
    fn load_unverified_predictions(&self, issue: &str) -> Result<Vec<PredictionCandidate>>;

    /// Retourne l'identifiant attribué.
    fn save_prediction(&self, candidate: &PredictionCandidate) -> Result<i64>;

    fn mark_verified(&self, candidate: &PredictionCandidate) -> Result<()>;

    /// Tout ou rien : si une ligne échoue, aucune n'est marquée.
    fn mark_verified_all(&self, candidates: &[PredictionCandidate]) -> Result<()>;

    /// Toutes les prédictions d'un tirage, vérifiées ou non, dans l'ordre d'enregistrement.
    fn load_predictions_by_issue(&self, issue: &str) -> Result<Vec<PredictionCandidate>>;

    /// Les `limit` dernières prédictions enregistrées, la plus récente en premier.
    fn load_recent_predictions(&self, limit: usize) -> Result<Vec<PredictionCandidate>>;

    /// Prédictions vérifiées, toutes méthodes confondues si `method` vaut `None`.
    fn load_verified_predictions(&self, method: Option<Method>) -> Result<Vec<PredictionCandidate>>;

    /// Tirages cibles ayant encore des prédictions non vérifiées.
    fn unverified_issues(&self) -> Result<Vec<String>>;
}
