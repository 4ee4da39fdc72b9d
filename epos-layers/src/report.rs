//! Rapports JSON produits par la CLI
//!
//! Ce module convertit les couches construites en structures sérialisables,
//! affichées sur la sortie standard.

use std::collections::BTreeMap;

use maplayers::layer::PlacedLayer;
use maplayers::{DataFormat, DisplayProperty, FeatureDisplayItem, LayerKind, LayerStatus, LegendItem, MapLayer};
use serde::Serialize;

use crate::source::LoadedLayers;

/// Emprise `[ouest, sud, est, nord]`
pub type BoundsArray = [f64; 4];

/// Résumé d'une couche
#[derive(Debug, Clone, Serialize)]
pub struct LayerSummary {
    /// Identifiant de la couche
    pub id: String,
    /// Nom affiché
    pub name: String,
    /// Nature de la couche
    pub kind: LayerKind,
    /// État après l'ajout
    pub status: LayerStatus,
    /// Nombre d'entrées de légende
    pub legend_items: usize,
    /// Nombre de lignes de table
    pub table_rows: usize,
    /// Emprise des données (optionnelle)
    pub bounds: Option<BoundsArray>,
}

impl LayerSummary {
    pub fn of(layer: &dyn MapLayer) -> Self {
        Self {
            id: layer.id().to_string(),
            name: layer.name().to_string(),
            kind: layer.kind(),
            status: layer.status(),
            legend_items: layer.legend().len(),
            table_rows: layer.table_rows().len(),
            bounds: layer.bounds().map(|r| [r.min().x, r.min().y, r.max().x, r.max().y]),
        }
    }
}

/// Rapport de la commande `render`
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    /// Format résolu
    pub format: DataFormat,
    /// Couches créées par la fabrique
    pub layers: Vec<LayerSummary>,
    /// Panes créés, avec leur z-index
    pub panes: BTreeMap<String, u32>,
    /// Rendus posés sur la carte
    pub rendered: Vec<PlacedLayer>,
}

impl RenderReport {
    pub fn from_loaded(loaded: &LoadedLayers) -> Self {
        Self {
            format: loaded.format,
            layers: loaded.layers.iter().map(|l| LayerSummary::of(l.as_ref())).collect(),
            panes: loaded.surface.panes(),
            rendered: loaded.surface.layers(),
        }
    }
}

/// Légende d'une couche
#[derive(Debug, Clone, Serialize)]
pub struct LegendReport {
    pub layer_id: String,
    pub items: Vec<LegendItem>,
}

impl LegendReport {
    /// Une entrée par couche ayant une légende
    pub fn collect(loaded: &LoadedLayers) -> Vec<Self> {
        loaded
            .layers
            .iter()
            .map(|layer| Self {
                layer_id: layer.id().to_string(),
                items: layer.legend(),
            })
            .filter(|report| !report.items.is_empty())
            .collect()
    }
}

/// Contenu de popup d'une feature
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupReport {
    pub property_id: String,
    pub label: Option<String>,
    pub properties: Vec<DisplayProperty>,
    pub html: String,
}

impl PopupReport {
    pub fn of(item: &FeatureDisplayItem) -> Self {
        Self {
            property_id: item.property_id().to_string(),
            label: item.label().map(str::to_string),
            properties: item.properties().to_vec(),
            html: item.popup_content(),
        }
    }

    /// Popups de toutes les couches qui connaissent `property_id`
    pub fn collect(loaded: &LoadedLayers, property_id: &str) -> Vec<Self> {
        loaded
            .layers
            .iter()
            .filter_map(|layer| layer.feature_display_items(property_id))
            .flatten()
            .map(|item| Self::of(&item))
            .collect()
    }
}
