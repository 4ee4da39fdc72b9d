//! Couche vectorielle GeoJSON annotée `@epos`

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use geo::Rect;
use geojson::{Feature, Geometry};
use serde::Serialize;
use serde_json::Map;

use crate::convention::{self, DATA_KEYS, MAP_KEYS};
use crate::fetch::FetchFn;
use crate::layer::overlay::is_overlay_payload;
use crate::layer::surface::{MapSurface, RenderedLayer};
use crate::layer::{bounds_of, decode_features, DecodedFeatures, LayerCore, MapContext, MapLayer};
use crate::marker::cluster::ClusteringAdapter;
use crate::marker::icon::{MarkerFactory, PathStyle, RenderableMarker};
use crate::marker::legend::{LegendItem, LegendSynthesizer};
use crate::properties::display::DisplayProperty;
use crate::properties::extract::{extract, label_for};
use crate::properties::popup::FeatureDisplayItem;
use crate::settings::LayerSettings;
use crate::style::resolver::{assign, resolve, StyleAssignment, StyleResolution, StyleTable};
use crate::style::visual::StyleHandle;
use crate::types::{GeometryKind, LayerKind, LayerStatus, StyleId};

/// Contenu construit une fois à partir du payload
#[derive(Debug)]
pub struct VectorContent {
    features: Vec<Feature>,
    resolution: StyleResolution,
    assignment: StyleAssignment,
    items: Vec<Arc<FeatureDisplayItem>>,
    /// Index de feature de chaque élément
    item_features: Vec<usize>,
    by_property_id: HashMap<String, usize>,
    table_rows: Vec<Vec<DisplayProperty>>,
    overlay_mode: bool,
    bounds: Option<Rect<f64>>,
}

impl VectorContent {
    /// Résout les styles puis extrait propriétés de carte et de table
    pub fn build(layer_id: &str, decoded: DecodedFeatures, style: &StyleHandle, with_table: bool) -> Self {
        let resolution = resolve(decoded.style_payload(), 0, style);
        let DecodedFeatures {
            features, positions, ..
        } = decoded;
        let assignment = assign(&features, &resolution);
        let overlay_mode = is_overlay_payload(&features);
        let empty = Map::new();

        let mut items = Vec::new();
        let mut item_features = Vec::new();
        let mut by_property_id = HashMap::new();
        let mut table_rows = Vec::new();

        for (index, (feature, &position)) in features.iter().zip(&positions).enumerate() {
            let property_id = convention::property_id(layer_id, position);
            let properties = feature.properties.as_ref().unwrap_or(&empty);

            if with_table {
                let mut row = extract(properties, DATA_KEYS);
                if !row.iter().any(DisplayProperty::is_identity) {
                    row.push(DisplayProperty::identity(&property_id));
                }
                table_rows.push(row);
            }

            // Les images géoréférencées portent leurs propres éléments affichables
            if overlay_mode {
                continue;
            }

            by_property_id.insert(property_id.clone(), items.len());
            item_features.push(index);
            items.push(Arc::new(FeatureDisplayItem::new(
                property_id,
                feature.clone(),
                label_for(properties),
                extract(properties, MAP_KEYS),
            )));
        }

        let bounds = if overlay_mode {
            None
        } else {
            bounds_of(features.iter().filter_map(|f| f.geometry.as_ref()).map(|g| &g.value))
        };

        Self {
            features,
            resolution,
            assignment,
            items,
            item_features,
            by_property_id,
            table_rows,
            overlay_mode,
            bounds,
        }
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn style_table(&self) -> &StyleTable {
        &self.resolution.table
    }

    pub fn assignment(&self) -> &StyleAssignment {
        &self.assignment
    }

    pub fn overlay_mode(&self) -> bool {
        self.overlay_mode
    }

    pub fn items(&self) -> &[Arc<FeatureDisplayItem>] {
        &self.items
    }

    pub fn item(&self, property_id: &str) -> Option<Arc<FeatureDisplayItem>> {
        self.by_property_id
            .get(property_id)
            .map(|&i| Arc::clone(&self.items[i]))
    }

    pub fn table_rows(&self) -> &[Vec<DisplayProperty>] {
        &self.table_rows
    }

    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.bounds
    }

    /// Rendu avec le style courant
    pub fn render(&self, layer_id: &str, style: &StyleHandle, settings: &LayerSettings) -> VectorRendering {
        let factory = MarkerFactory::new(&self.resolution.table, settings);
        let mut features = Vec::with_capacity(self.items.len());

        for (item, &index) in self.items.iter().zip(&self.item_features) {
            let Some(geometry) = item.feature().geometry.clone() else {
                continue;
            };
            let style_id = self.assignment.style_id(index);

            let (marker, path) = match GeometryKind::of(&geometry.value) {
                GeometryKind::Point => (Some(factory.build(style_id, style, false)), None),
                _ => (None, Some(PathStyle::from_style(&style.snapshot()))),
            };

            features.push(RenderedFeature {
                property_id: item.property_id().to_string(),
                geometry,
                style_id,
                marker,
                path,
                tooltip: item.label().map(str::to_string),
            });
        }

        let current = style.snapshot();
        let clustering = if features.iter().any(|f| f.marker.is_some()) {
            ClusteringAdapter::enable(current.clustering.unwrap_or(false), &current, settings)
        } else {
            None
        };

        VectorRendering {
            layer_id: layer_id.to_string(),
            features,
            clustering,
        }
    }

    /// Légende : vide en mode image, la couche d'images s'en charge
    pub fn legend(&self, layer_name: &str, style: &StyleHandle, settings: &LayerSettings) -> Vec<LegendItem> {
        if self.overlay_mode {
            return Vec::new();
        }
        LegendSynthesizer::new(
            MarkerFactory::new(&self.resolution.table, settings),
            self.assignment.untyped_kind(),
            layer_name,
            settings.legend_size(),
        )
        .build(style)
    }
}

/// Feature posée sur la carte
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedFeature {
    pub property_id: String,
    pub geometry: Geometry,
    pub style_id: Option<StyleId>,
    /// Points uniquement
    pub marker: Option<RenderableMarker>,
    /// Lignes et polygones
    pub path: Option<PathStyle>,
    pub tooltip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorRendering {
    pub layer_id: String,
    pub features: Vec<RenderedFeature>,
    pub clustering: Option<ClusteringAdapter>,
}

impl VectorRendering {
    pub fn marker_count(&self) -> usize {
        self.features.iter().filter(|f| f.marker.is_some()).count()
    }
}

/// Couche vectorielle
pub struct GeoJsonLayer {
    core: LayerCore,
    with_table: bool,
    content: RwLock<Option<Arc<VectorContent>>>,
}

impl GeoJsonLayer {
    /// `with_table` : la couche fournit des lignes de table (`@epos_data_keys`)
    pub fn new(
        ctx: MapContext,
        id: impl Into<String>,
        name: impl Into<String>,
        style: StyleHandle,
        fetch: FetchFn,
        with_table: bool,
    ) -> Self {
        Self {
            core: LayerCore::new(ctx, id, name, style, fetch),
            with_table,
            content: RwLock::new(None),
        }
    }

    /// Contenu, s'il a déjà été chargé
    pub fn content(&self) -> Option<Arc<VectorContent>> {
        self.content.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    async fn load(&self) -> Option<Arc<VectorContent>> {
        self.core
            .load(&self.content, |body| {
                let decoded = decode_features(&body)?;
                Ok(VectorContent::build(
                    &self.core.id,
                    decoded,
                    &self.core.style,
                    self.with_table,
                ))
            })
            .await
    }
}

#[async_trait]
impl MapLayer for GeoJsonLayer {
    fn id(&self) -> &str {
        &self.core.id
    }

    fn name(&self) -> &str {
        &self.core.name
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Vector
    }

    fn status(&self) -> LayerStatus {
        self.core.status()
    }

    fn style(&self) -> &StyleHandle {
        &self.core.style
    }

    async fn add_to(&self, surface: &dyn MapSurface) {
        let ticket = self.core.begin_add();
        let Some(content) = self.load().await else {
            return;
        };
        let rendering = content.render(&self.core.id, &self.core.style, self.core.settings());
        self.core.place(
            ticket,
            surface,
            self.core.settings().marker_pane_z_index,
            RenderedLayer::Vector(rendering),
        );
    }

    fn reset_failure(&self) -> bool {
        self.core.reset_failure()
    }

    fn remove_from(&self, surface: &dyn MapSurface) {
        self.core.remove(surface, &self.core.id);
    }

    fn legend(&self) -> Vec<LegendItem> {
        self.content()
            .map(|c| c.legend(&self.core.name, &self.core.style, self.core.settings()))
            .unwrap_or_default()
    }

    fn feature_display_items(&self, property_id: &str) -> Option<Vec<Arc<FeatureDisplayItem>>> {
        self.content()?.item(property_id).map(|item| vec![item])
    }

    fn table_rows(&self) -> Vec<Vec<DisplayProperty>> {
        self.content()
            .map(|c| c.table_rows().to_vec())
            .unwrap_or_default()
    }

    fn bounds(&self) -> Option<Rect<f64>> {
        self.content()?.bounds()
    }
}
