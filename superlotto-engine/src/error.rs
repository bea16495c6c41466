use superlotto_db::models::Method;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Méthode inconnue '{code}' (méthodes valides : {valid})")]
    UnknownMethod { code: String, valid: String },

    #[error("Tirage {issue} introuvable : pas encore vérifiable")]
    DrawNotResolved { issue: String },

    #[error("Nombre de grilles invalide : {count} (attendu entre 1 et {max})")]
    InvalidCount { count: usize, max: usize },

    #[error("Configuration invalide : {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

pub fn parse_method(code: &str) -> EngineResult<Method> {
    Method::from_code(code).ok_or_else(|| EngineError::UnknownMethod {
        code: code.to_string(),
        valid: Method::ALL
            .iter()
            .map(|m| m.code())
            .collect::<Vec<_>>()
            .join(", "),
    })
}
