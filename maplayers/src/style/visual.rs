//! Style utilisateur d'une couche (couleurs, opacités, marqueur, clustering)

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::settings::PaletteEntry;

/// Réglages visuels choisis par l'utilisateur
///
/// Chaque champ optionnel non renseigné laisse la main au style déclaré
/// dans le payload, puis aux valeurs par défaut.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Style {
    /// Couleur principale (hex)
    pub color1: String,
    /// Couleur secondaire (hex)
    pub color2: String,
    /// Opacité de la couleur principale (0..1)
    pub opacity1: f64,
    /// Opacité de la couleur secondaire (0..1)
    pub opacity2: f64,
    /// Épaisseur du trait des lignes et polygones
    pub weight: f64,
    /// Taille des marqueurs sur la carte
    pub marker_size: Option<u32>,
    /// Glyphe imposé à la place de celui du payload
    pub marker_value: Option<String>,
    /// Clustering voulu (`None`: pas encore choisi)
    pub clustering: Option<bool>,
    /// Premier glyphe déclaré par le payload, cible d'une réinitialisation
    pub origin_marker_value: Option<String>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color1: "#1f77b4".to_string(),
            color2: "#ffffff".to_string(),
            opacity1: 1.0,
            opacity2: 0.5,
            weight: 2.0,
            marker_size: None,
            marker_value: None,
            clustering: None,
            origin_marker_value: None,
        }
    }
}

impl Style {
    /// Style par défaut coloré avec une entrée de palette
    pub fn from_palette(entry: &PaletteEntry) -> Self {
        Self {
            color1: entry.color1.clone(),
            color2: entry.color2.clone(),
            ..Self::default()
        }
    }

    /// Opacités bornées à `[0, 1]`
    pub fn opacity1(&self) -> f64 {
        clamp_opacity(self.opacity1)
    }

    pub fn opacity2(&self) -> f64 {
        clamp_opacity(self.opacity2)
    }
}

fn clamp_opacity(value: f64) -> f64 {
    if value.is_nan() {
        1.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Style partagé entre la couche et l'interface qui l'édite
#[derive(Debug, Clone, Default)]
pub struct StyleHandle(Arc<RwLock<Style>>);

impl StyleHandle {
    pub fn new(style: Style) -> Self {
        Self(Arc::new(RwLock::new(style)))
    }

    /// Copie instantanée du style courant
    pub fn snapshot(&self) -> Style {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Modifie le style ; l'appelant doit ensuite rafraîchir la couche
    pub fn update(&self, f: impl FnOnce(&mut Style)) {
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }

    /// Initialise la préférence de clustering si l'utilisateur n'en a pas
    ///
    /// Retourne `true` si la valeur a été posée.
    pub fn seed_clustering(&self, clustering: bool) -> bool {
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        if guard.clustering.is_some() {
            return false;
        }
        guard.clustering = Some(clustering);
        true
    }

    /// Mémorise le premier glyphe déclaré par le payload
    pub fn remember_origin_marker_value(&self, value: &str) {
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        if guard.origin_marker_value.is_none() {
            guard.origin_marker_value = Some(value.to_string());
        }
    }

    /// Revient au glyphe d'origine du payload
    pub fn reset_marker_value(&self) {
        self.update(|style| style.marker_value = None);
    }

    /// Vrai si les deux handles désignent le même style
    pub fn same_as(&self, other: &StyleHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Style> for StyleHandle {
    fn from(style: Style) -> Self {
        Self::new(style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_clustering_only_once() {
        let handle = StyleHandle::default();
        assert!(handle.seed_clustering(true));
        assert!(!handle.seed_clustering(false));
        assert_eq!(handle.snapshot().clustering, Some(true));
    }

    #[test]
    fn test_seed_clustering_respects_user_choice() {
        let handle = StyleHandle::new(Style {
            clustering: Some(false),
            ..Style::default()
        });
        assert!(!handle.seed_clustering(true));
        assert_eq!(handle.snapshot().clustering, Some(false));
    }

    #[test]
    fn test_origin_marker_value_kept_first() {
        let handle = StyleHandle::default();
        handle.remember_origin_marker_value("fas fa-star");
        handle.remember_origin_marker_value("fas fa-bolt");
        assert_eq!(
            handle.snapshot().origin_marker_value.as_deref(),
            Some("fas fa-star")
        );
    }

    #[test]
    fn test_opacity_clamped() {
        let style = Style {
            opacity1: 3.0,
            opacity2: f64::NAN,
            ..Style::default()
        };
        assert_eq!(style.opacity1(), 1.0);
        assert_eq!(style.opacity2(), 1.0);
    }
}
