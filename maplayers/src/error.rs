//! Types d'erreurs pour le crate maplayers

use thiserror::Error;

/// Erreurs pouvant survenir lors de la construction d'une couche
///
/// Aucune de ces erreurs ne remonte jusqu'à l'appelant de la fabrique :
/// elles sont journalisées par la couche qui les rencontre.
#[derive(Debug, Error)]
pub enum MapLayerError {
    /// Identifiant de format non supporté
    #[error("Unknown data format: {0}")]
    UnknownFormat(String),

    /// Échec de la récupération du payload
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Payload JSON illisible
    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload JSON valide mais pas du GeoJSON
    #[error("Invalid GeoJSON payload: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Payload structurellement inattendu pour le format
    #[error("Invalid payload for {format}: {reason}")]
    InvalidPayload { format: String, reason: String },

    /// URL de service OGC inexploitable
    #[error("Invalid service URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl MapLayerError {
    /// Crée une erreur de payload avec contexte
    pub fn invalid_payload(format: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            format: format.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur d'URL avec contexte
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// Erreur de récupération, clonable pour être mémorisée par `LazyFetch`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FetchError {
    message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
