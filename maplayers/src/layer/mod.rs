//! Couches cartographiques produites par les fabriques
//!
//! Une couche est créée sans données ; le payload n'est récupéré qu'au
//! premier ajout à une carte (`add_to`), puis mémorisé. Si la couche est
//! retirée pendant la récupération, la suite du chargement ne touche pas
//! à la carte.

pub mod coverage;
pub mod geojson;
pub mod overlay;
pub mod surface;
pub mod tiles;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use ::geojson::{Feature, GeoJson, JsonObject};
use geo::{BoundingRect, MultiPoint, Rect};
use tracing::{debug, warn};

use crate::convention::STYLE;
use crate::error::MapLayerError;
use crate::fetch::{FetchFn, LazyFetch};
use crate::marker::legend::LegendItem;
use crate::properties::display::{DisplayProperty, DownloadLink};
use crate::properties::popup::FeatureDisplayItem;
use crate::settings::LayerSettings;
use crate::style::allocator::StyleAllocator;
use crate::style::visual::StyleHandle;
use crate::types::{LayerKind, LayerStatus};

pub use self::coverage::CoverageLayer;
pub use self::geojson::GeoJsonLayer;
pub use self::overlay::ImageOverlayLayer;
pub use self::surface::{MapSurface, PlacedLayer, RecordingSurface, RenderedLayer};
pub use self::tiles::TileLayer;

/// Couche ajoutable à une carte
#[async_trait]
pub trait MapLayer: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn kind(&self) -> LayerKind;

    fn status(&self) -> LayerStatus;

    fn style(&self) -> &StyleHandle;

    /// Récupère le payload si besoin, puis pose la couche sur la carte
    ///
    /// Les échecs sont journalisés et laissent la couche vide.
    async fn add_to(&self, surface: &dyn MapSurface);

    fn remove_from(&self, surface: &dyn MapSurface);

    /// Ré-ajout complet, après un changement de style
    async fn refresh(&self, surface: &dyn MapSurface) {
        self.remove_from(surface);
        self.add_to(surface).await;
    }

    /// Oublie un échec de chargement ; `false` si la couche n'était pas en échec
    fn reset_failure(&self) -> bool;

    /// Nouvel essai après un échec : la récupération est relancée
    async fn retry(&self, surface: &dyn MapSurface) -> bool {
        if !self.reset_failure() {
            return false;
        }
        self.refresh(surface).await;
        true
    }

    fn legend(&self) -> Vec<LegendItem>;

    /// Éléments affichables correspondant à un `propertyId`
    fn feature_display_items(&self, property_id: &str) -> Option<Vec<Arc<FeatureDisplayItem>>>;

    /// Lignes de table (une par feature)
    fn table_rows(&self) -> Vec<Vec<DisplayProperty>> {
        Vec::new()
    }

    /// Emprise des données chargées
    fn bounds(&self) -> Option<Rect<f64>> {
        None
    }
}

/// Gestionnaire de téléchargement authentifié fourni par l'application
pub trait DownloadHandler: Send + Sync {
    fn download(&self, link: &DownloadLink);
}

/// Contexte partagé par les couches d'une carte (une session)
#[derive(Clone)]
pub struct MapContext {
    settings: Arc<LayerSettings>,
    styles: Arc<StyleAllocator>,
    download_handler: Option<Arc<dyn DownloadHandler>>,
}

impl Default for MapContext {
    fn default() -> Self {
        Self::new(LayerSettings::default())
    }
}

impl MapContext {
    pub fn new(settings: LayerSettings) -> Self {
        let styles = StyleAllocator::from_settings(&settings);
        Self {
            settings: Arc::new(settings),
            styles: Arc::new(styles),
            download_handler: None,
        }
    }

    pub fn with_download_handler(mut self, handler: Arc<dyn DownloadHandler>) -> Self {
        self.download_handler = Some(handler);
        self
    }

    pub fn settings(&self) -> &LayerSettings {
        &self.settings
    }

    pub fn styles(&self) -> &StyleAllocator {
        &self.styles
    }

    /// Style d'une couche : alloué pour la session si elle est stylable,
    /// style par défaut non partagé sinon
    pub fn style_for(&self, layer_id: &str, stylable: bool) -> StyleHandle {
        if stylable {
            self.styles.style_for_layer(layer_id)
        } else {
            StyleHandle::default()
        }
    }

    /// Transmet un téléchargement authentifié ; `false` sans gestionnaire
    pub fn request_download(&self, link: &DownloadLink) -> bool {
        match &self.download_handler {
            Some(handler) => {
                handler.download(link);
                true
            }
            None => {
                warn!(href = %link.href, "No download handler registered");
                false
            }
        }
    }
}

impl fmt::Debug for MapContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapContext")
            .field("settings", &self.settings)
            .field("download_handler", &self.download_handler.is_some())
            .finish()
    }
}

/// Identité, récupération et cycle de vie communs à toutes les couches
pub(crate) struct LayerCore {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) style: StyleHandle,
    pub(crate) ctx: MapContext,
    fetch: LazyFetch,
    attached: AtomicBool,
    generation: AtomicU64,
    status: Mutex<LayerStatus>,
}

impl LayerCore {
    pub(crate) fn new(
        ctx: MapContext,
        id: impl Into<String>,
        name: impl Into<String>,
        style: StyleHandle,
        fetch: FetchFn,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            style,
            ctx,
            fetch: LazyFetch::new(fetch),
            attached: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            status: Mutex::new(LayerStatus::Idle),
        }
    }

    pub(crate) fn settings(&self) -> &LayerSettings {
        self.ctx.settings()
    }

    /// Marque la couche attachée ; le ticket identifie cet ajout
    pub(crate) fn begin_add(&self) -> u64 {
        self.attached.store(true, Ordering::SeqCst);
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if self.status() != LayerStatus::Ready {
            self.set_status(LayerStatus::Loading);
        }
        ticket
    }

    /// Vrai si l'ajout `ticket` est toujours d'actualité
    pub(crate) fn is_current(&self, ticket: u64) -> bool {
        self.attached.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == ticket
    }

    pub(crate) fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn status(&self) -> LayerStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_status(&self, status: LayerStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// Contenu mémorisé, construit au premier appel depuis le payload
    pub(crate) async fn load<T, F>(&self, cache: &RwLock<Option<Arc<T>>>, build: F) -> Option<Arc<T>>
    where
        T: Send + Sync,
        F: FnOnce(Bytes) -> Result<T, MapLayerError> + Send,
    {
        let cached = cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if cached.is_some() {
            return cached;
        }

        let built = self
            .fetch
            .get()
            .await
            .map_err(MapLayerError::from)
            .and_then(build);
        match built {
            Ok(content) => {
                let content = Arc::new(content);
                *cache.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&content));
                Some(content)
            }
            Err(e) => {
                warn!(layer_id = %self.id, error = %e, "Layer left empty");
                self.set_status(LayerStatus::Failed);
                None
            }
        }
    }

    /// Remet une couche en échec à l'état initial, récupération comprise
    pub(crate) fn reset_failure(&self) -> bool {
        if self.status() != LayerStatus::Failed {
            return false;
        }
        debug!(layer_id = %self.id, "Forgetting failed load");
        self.fetch.reset();
        self.set_status(LayerStatus::Idle);
        true
    }

    /// Pose un rendu si l'ajout est toujours d'actualité
    pub(crate) fn place(&self, ticket: u64, surface: &dyn MapSurface, z_index: u32, layer: RenderedLayer) {
        if !self.is_current(ticket) {
            debug!(layer_id = %self.id, "Layer removed before its data arrived");
            return;
        }
        // Un pane par rendu
        let pane = format!("pane-{}", layer.layer_id());
        surface.ensure_pane(&pane, z_index);
        surface.add_layer(&pane, layer);
        self.set_status(LayerStatus::Ready);
    }

    pub(crate) fn remove(&self, surface: &dyn MapSurface, rendered_id: &str) {
        self.detach();
        surface.remove_layer(rendered_id);
        if self.status() == LayerStatus::Loading {
            self.set_status(LayerStatus::Idle);
        }
    }
}

/// Features lues dans un payload GeoJSON
#[derive(Debug, Clone, Default)]
pub struct DecodedFeatures {
    pub features: Vec<Feature>,
    /// Position de chaque feature dans le payload, base des `propertyId`
    pub positions: Vec<usize>,
    /// Membres étrangers de la collection (où se trouve `@epos_style`)
    pub foreign_members: Option<JsonObject>,
}

impl DecodedFeatures {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Position d'origine de la feature `index`
    pub fn position(&self, index: usize) -> usize {
        self.positions.get(index).copied().unwrap_or(index)
    }

    /// Bloc `@epos_style` de la collection
    pub fn style_payload(&self) -> Option<&JsonObject> {
        self.foreign_members.as_ref()?.get(STYLE)?.as_object()
    }
}

impl From<Vec<Feature>> for DecodedFeatures {
    fn from(features: Vec<Feature>) -> Self {
        Self {
            positions: (0..features.len()).collect(),
            features,
            foreign_members: None,
        }
    }
}

/// Lit un payload GeoJSON : FeatureCollection, Feature seule ou géométrie nue
///
/// Dans une collection, chaque feature est lue séparément : une feature
/// illisible est écartée sans toucher aux autres, et une clé `geometry`
/// absente vaut `null`.
pub fn decode_features(body: &[u8]) -> Result<DecodedFeatures, MapLayerError> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    match value.get("type").and_then(serde_json::Value::as_str) {
        Some("FeatureCollection") => decode_collection(value),
        Some("Feature") => Ok(DecodedFeatures::from(vec![decode_feature(value)?])),
        _ => match GeoJson::from_json_value(value)? {
            GeoJson::FeatureCollection(collection) => Ok(DecodedFeatures {
                foreign_members: collection.foreign_members,
                ..DecodedFeatures::from(collection.features)
            }),
            GeoJson::Feature(feature) => Ok(DecodedFeatures::from(vec![feature])),
            GeoJson::Geometry(geometry) => Ok(DecodedFeatures::from(vec![Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: None,
                foreign_members: None,
            }])),
        },
    }
}

fn decode_collection(value: serde_json::Value) -> Result<DecodedFeatures, MapLayerError> {
    let serde_json::Value::Object(mut members) = value else {
        return Err(MapLayerError::invalid_payload("geojson", "collection is not an object"));
    };
    let features = match members.remove("features") {
        Some(serde_json::Value::Array(features)) => features,
        _ => {
            return Err(MapLayerError::invalid_payload(
                "geojson",
                "FeatureCollection without a features array",
            ))
        }
    };
    members.remove("type");
    members.remove("bbox");

    let mut decoded = DecodedFeatures {
        features: Vec::with_capacity(features.len()),
        positions: Vec::with_capacity(features.len()),
        foreign_members: (!members.is_empty()).then_some(members),
    };
    for (position, feature) in features.into_iter().enumerate() {
        match decode_feature(feature) {
            Ok(feature) => {
                decoded.features.push(feature);
                decoded.positions.push(position);
            }
            Err(e) => debug!(position, error = %e, "Malformed feature dropped"),
        }
    }
    Ok(decoded)
}

fn decode_feature(mut value: serde_json::Value) -> Result<Feature, MapLayerError> {
    if let serde_json::Value::Object(members) = &mut value {
        members
            .entry("geometry")
            .or_insert(serde_json::Value::Null);
    }
    Ok(Feature::from_json_value(value)?)
}

/// Emprise d'un ensemble de géométries GeoJSON
pub(crate) fn bounds_of<'a>(values: impl Iterator<Item = &'a ::geojson::Value>) -> Option<Rect<f64>> {
    let mut positions = Vec::new();
    for value in values {
        collect_positions(value, &mut positions);
    }
    MultiPoint::from(positions).bounding_rect()
}

fn collect_positions(value: &::geojson::Value, out: &mut Vec<(f64, f64)>) {
    use ::geojson::Value;

    let mut push = |position: &Vec<f64>| {
        if let [x, y, ..] = position.as_slice() {
            out.push((*x, *y));
        }
    };
    match value {
        Value::Point(p) => push(p),
        Value::MultiPoint(points) | Value::LineString(points) => points.iter().for_each(push),
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            lines.iter().flatten().for_each(push)
        }
        Value::MultiPolygon(polygons) => polygons.iter().flatten().flatten().for_each(push),
        Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                collect_positions(&geometry.value, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_collection_with_style() {
        let body = br#"{"type":"FeatureCollection","features":[],"@epos_style":{"a":{}}}"#;
        let decoded = decode_features(body).unwrap();
        assert!(decoded.is_empty());
        assert!(decoded.style_payload().unwrap().contains_key("a"));
    }

    #[test]
    fn test_decode_single_feature_and_geometry() {
        let body = br#"{"type":"Feature","properties":{"a":1},"geometry":{"type":"Point","coordinates":[1,2]}}"#;
        assert_eq!(decode_features(body).unwrap().len(), 1);

        let body = br#"{"type":"Feature","properties":{"a":1}}"#;
        assert!(decode_features(body).unwrap().features[0].geometry.is_none());

        let body = br#"{"type":"Point","coordinates":[1,2]}"#;
        let decoded = decode_features(body).unwrap();
        assert!(decoded.features[0].geometry.is_some());
        assert_eq!(decoded.positions, vec![0]);
    }

    #[test]
    fn test_decode_missing_geometry_key() {
        let body = br#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"name":"A"},"geometry":{"type":"Point","coordinates":[1,2]}},
            {"type":"Feature","properties":{"name":"B"}}
        ]}"#;
        let decoded = decode_features(body).unwrap();
        assert_eq!(decoded.len(), 2);
        assert!(decoded.features[1].geometry.is_none());
        assert_eq!(decoded.positions, vec![0, 1]);
    }

    #[test]
    fn test_decode_drops_malformed_feature_alone() {
        let body = br#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"name":"bad"},"geometry":{"type":"Point","coordinates":"oops"}},
            {"type":"Feature","properties":{"name":"A"},"geometry":{"type":"Point","coordinates":[1,2]}},
            42
        ]}"#;
        let decoded = decode_features(body).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded.positions, vec![1]);
        assert_eq!(decoded.position(0), 1);
        assert!(decoded.foreign_members.is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_features(b"not json"), Err(MapLayerError::Json(_))));
        assert!(matches!(
            decode_features(br#"{"type":"Nope"}"#),
            Err(MapLayerError::GeoJson(_))
        ));
        assert!(matches!(
            decode_features(br#"{"type":"FeatureCollection"}"#),
            Err(MapLayerError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_bounds_of() {
        let values = [
            ::geojson::Value::Point(vec![1.0, 2.0]),
            ::geojson::Value::LineString(vec![vec![-3.0, 0.0], vec![5.0, 10.0]]),
        ];
        let rect = bounds_of(values.iter()).unwrap();
        assert_eq!(rect.min().x, -3.0);
        assert_eq!(rect.max().y, 10.0);
        assert!(bounds_of(std::iter::empty()).is_none());
    }

    #[test]
    fn test_style_for_stylable_layer_is_shared() {
        let ctx = MapContext::default();
        assert!(ctx.style_for("a", true).same_as(&ctx.style_for("a", true)));
        assert!(!ctx.style_for("a", false).same_as(&ctx.style_for("a", false)));
    }

    #[test]
    fn test_request_download_without_handler() {
        let ctx = MapContext::default();
        let link = DownloadLink {
            href: "https://x/f".to_string(),
            label: "f".to_string(),
            filename: "f".to_string(),
        };
        assert!(!ctx.request_download(&link));
    }
}
