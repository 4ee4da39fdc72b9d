//! Interface avec le widget cartographique

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::layer::coverage::CoverageRendering;
use crate::layer::geojson::VectorRendering;
use crate::layer::overlay::OverlayRendering;
use crate::layer::tiles::TileRendering;

/// Carte sur laquelle les couches posent leur rendu
pub trait MapSurface: Send + Sync {
    /// Crée le pane s'il n'existe pas encore
    fn ensure_pane(&self, name: &str, z_index: u32);

    /// Ajoute (ou remplace) le rendu identifié par `layer.layer_id()`
    fn add_layer(&self, pane: &str, layer: RenderedLayer);

    fn remove_layer(&self, layer_id: &str);
}

/// Rendu d'une couche, prêt pour le widget
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RenderedLayer {
    Vector(VectorRendering),
    ImageOverlays(OverlayRendering),
    Coverage(CoverageRendering),
    Tiles(TileRendering),
}

impl RenderedLayer {
    pub fn layer_id(&self) -> &str {
        match self {
            Self::Vector(r) => &r.layer_id,
            Self::ImageOverlays(r) => &r.layer_id,
            Self::Coverage(r) => &r.layer_id,
            Self::Tiles(r) => &r.layer_id,
        }
    }
}

/// Rendu posé dans un pane
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedLayer {
    pub pane: String,
    pub layer: RenderedLayer,
}

/// Carte en mémoire : enregistre panes et rendus
///
/// Sert aux tests et à la CLI, qui exporte le résultat en JSON.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    panes: Mutex<BTreeMap<String, u32>>,
    layers: Mutex<Vec<PlacedLayer>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn panes(&self) -> BTreeMap<String, u32> {
        self.panes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Rendus dans l'ordre d'ajout
    pub fn layers(&self) -> Vec<PlacedLayer> {
        self.layers.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn layer(&self, layer_id: &str) -> Option<RenderedLayer> {
        self.layers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.layer.layer_id() == layer_id)
            .map(|p| p.layer.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.layers.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}

impl MapSurface for RecordingSurface {
    fn ensure_pane(&self, name: &str, z_index: u32) {
        self.panes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_insert(z_index);
    }

    fn add_layer(&self, pane: &str, layer: RenderedLayer) {
        let mut layers = self.layers.lock().unwrap_or_else(PoisonError::into_inner);
        layers.retain(|p| p.layer.layer_id() != layer.layer_id());
        layers.push(PlacedLayer {
            pane: pane.to_string(),
            layer,
        });
    }

    fn remove_layer(&self, layer_id: &str) {
        self.layers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|p| p.layer.layer_id() != layer_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::tiles::{TileRendering, TileSource};

    fn tiles(id: &str) -> RenderedLayer {
        RenderedLayer::Tiles(TileRendering {
            layer_id: id.to_string(),
            source: TileSource::Wmts {
                url_template: "https://x/{z}/{x}/{y}.png".to_string(),
                layer: None,
                tile_matrix_set: None,
                format: None,
            },
            opacity: 1.0,
        })
    }

    #[test]
    fn test_add_replaces_same_id() {
        let surface = RecordingSurface::new();
        surface.ensure_pane("p", 400);
        surface.ensure_pane("p", 999);
        surface.add_layer("p", tiles("a"));
        surface.add_layer("p", tiles("a"));
        surface.add_layer("p", tiles("b"));

        assert_eq!(surface.panes().get("p"), Some(&400));
        assert_eq!(surface.layers().len(), 2);

        surface.remove_layer("a");
        assert!(surface.layer("a").is_none());
        assert!(surface.layer("b").is_some());
    }
}
