//! Réglages communs à toutes les couches d'une session

use serde::{Deserialize, Serialize};

/// Taille maximale d'un marqueur ou d'un glyphe de légende (pixels)
pub const MAX_MARKER_SIZE: u32 = 512;

/// Couple de couleurs proposé par défaut à une nouvelle couche
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PaletteEntry {
    pub color1: String,
    pub color2: String,
}

impl PaletteEntry {
    pub fn new(color1: impl Into<String>, color2: impl Into<String>) -> Self {
        Self {
            color1: color1.into(),
            color2: color2.into(),
        }
    }
}

/// Réglages d'affichage
///
/// Tous les champs ont une valeur par défaut : un objet JSON vide est une
/// configuration valide.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LayerSettings {
    /// Niveau de zoom à partir duquel le clustering est désactivé
    pub disable_clustering_at_zoom: u8,

    /// Rayon maximal d'un cluster (pixels)
    pub max_cluster_radius: u32,

    /// Taille fixe des glyphes de légende (pixels)
    pub legend_preview_size: u32,

    /// Taille des marqueurs quand l'utilisateur n'en a pas choisi (pixels)
    pub default_marker_size: u32,

    /// z-index du pane des marqueurs
    pub marker_pane_z_index: u32,

    /// z-index du pane des images géoréférencées
    pub overlay_pane_z_index: u32,

    /// Palette de l'allocateur de styles
    pub palette: Vec<PaletteEntry>,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            disable_clustering_at_zoom: 15,
            max_cluster_radius: 80,
            legend_preview_size: 20,
            default_marker_size: 30,
            marker_pane_z_index: 600,
            overlay_pane_z_index: 400,
            palette: default_palette(),
        }
    }
}

impl LayerSettings {
    /// Taille d'un marqueur sur la carte, bornée à `MAX_MARKER_SIZE`
    ///
    /// `chosen` est la taille choisie par l'utilisateur ; zéro ou absente,
    /// la taille par défaut s'applique.
    pub fn marker_size(&self, chosen: Option<u32>) -> u32 {
        chosen
            .filter(|s| *s > 0)
            .unwrap_or(self.default_marker_size)
            .clamp(1, MAX_MARKER_SIZE)
    }

    /// Taille des glyphes de légende, bornée à `MAX_MARKER_SIZE`
    pub fn legend_size(&self) -> u32 {
        self.legend_preview_size.clamp(1, MAX_MARKER_SIZE)
    }
}

fn default_palette() -> Vec<PaletteEntry> {
    vec![
        PaletteEntry::new("#1f77b4", "#ffffff"),
        PaletteEntry::new("#d62728", "#ffffff"),
        PaletteEntry::new("#2ca02c", "#ffffff"),
        PaletteEntry::new("#ff7f0e", "#000000"),
        PaletteEntry::new("#9467bd", "#ffffff"),
        PaletteEntry::new("#8c564b", "#ffffff"),
        PaletteEntry::new("#17becf", "#000000"),
        PaletteEntry::new("#bcbd22", "#000000"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let settings: LayerSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, LayerSettings::default());
    }

    #[test]
    fn test_partial_override() {
        let settings: LayerSettings =
            serde_json::from_str(r#"{"disable_clustering_at_zoom": 12}"#).unwrap();
        assert_eq!(settings.disable_clustering_at_zoom, 12);
        assert_eq!(settings.legend_preview_size, 20);
        assert!(!settings.palette.is_empty());
    }

    #[test]
    fn test_marker_size_clamped() {
        let settings = LayerSettings {
            default_marker_size: 0,
            legend_preview_size: u32::MAX,
            ..LayerSettings::default()
        };
        assert_eq!(settings.marker_size(Some(48)), 48);
        assert_eq!(settings.marker_size(Some(u32::MAX)), MAX_MARKER_SIZE);
        assert_eq!(settings.marker_size(Some(0)), 1);
        assert_eq!(settings.legend_size(), MAX_MARKER_SIZE);
        assert_eq!(LayerSettings::default().marker_size(None), 30);
    }
}
