//! Images géoréférencées (`@epos_image_overlay`)
//!
//! Une collection dont toutes les features portent l'indication est rendue
//! comme un ensemble d'images. Les candidates invalides (image absente,
//! emprise incomplète) sont ignorées individuellement.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use geo::{coord, Rect};
use geojson::Feature;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::convention::{self, IMAGE_OVERLAY, MAP_KEYS};
use crate::fetch::FetchFn;
use crate::layer::surface::{MapSurface, RenderedLayer};
use crate::layer::{decode_features, DecodedFeatures, LayerCore, MapContext, MapLayer};
use crate::marker::legend::{LegendGlyph, LegendItem};
use crate::properties::extract::{extract, label_for};
use crate::properties::popup::FeatureDisplayItem;
use crate::style::visual::StyleHandle;
use crate::types::{LayerKind, LayerStatus};

/// Suffixe de l'identifiant de rendu de la couche d'images
pub const OVERLAY_LAYER_SUFFIX: &str = "-overlay";

/// Image géoréférencée
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageOverlayData {
    pub href_image: String,
    /// `[sud, ouest, nord, est]`
    pub bbox: [f64; 4],
    pub href_legend: Option<String>,
    pub properties: Map<String, Value>,
}

impl ImageOverlayData {
    /// Lit l'indication d'une feature ; `None` si elle est invalide
    pub fn from_feature(feature: &Feature) -> Option<Self> {
        let properties = feature.properties.as_ref()?;
        let hint = properties.get(IMAGE_OVERLAY)?.as_object()?;

        let href_image = convention::non_blank_str(hint, "href")?.to_string();

        let bbox = hint.get("bbox")?.as_array()?;
        let numbers: Vec<f64> = bbox.iter().filter_map(Value::as_f64).collect();
        let [south, west, north, east] = numbers.as_slice() else {
            return None;
        };
        if numbers.len() != bbox.len() {
            return None;
        }

        let href_legend = hint
            .get("legend")
            .and_then(Value::as_object)
            .and_then(|legend| convention::non_blank_str(legend, "href"))
            .map(str::to_string);

        Some(Self {
            href_image,
            bbox: [*south, *west, *north, *east],
            href_legend,
            properties: properties.clone(),
        })
    }

    pub fn bounds(&self) -> Rect<f64> {
        let [south, west, north, east] = self.bbox;
        Rect::new(coord! { x: west, y: south }, coord! { x: east, y: north })
    }
}

/// Vrai si la collection est non vide et que chaque feature porte l'indication
pub fn is_overlay_payload(features: &[Feature]) -> bool {
    !features.is_empty()
        && features.iter().all(|f| {
            f.properties
                .as_ref()
                .and_then(|p| p.get(IMAGE_OVERLAY))
                .is_some_and(Value::is_object)
        })
}

/// Images valides, avec l'index de leur feature
pub fn extract_overlays(features: &[Feature]) -> Vec<(usize, ImageOverlayData)> {
    features
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| match ImageOverlayData::from_feature(feature) {
            Some(data) => Some((index, data)),
            None => {
                debug!(index, "Image overlay candidate dropped");
                None
            }
        })
        .collect()
}

/// Image posée sur la carte
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedOverlay {
    pub property_id: String,
    pub href: String,
    /// `[[sud, ouest], [nord, est]]`
    pub bounds: [[f64; 2]; 2],
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayRendering {
    pub layer_id: String,
    pub overlays: Vec<RenderedOverlay>,
}

#[derive(Debug)]
pub struct OverlayContent {
    overlays: Vec<(String, ImageOverlayData)>,
    items: HashMap<String, Arc<FeatureDisplayItem>>,
    legend: Vec<LegendItem>,
}

impl OverlayContent {
    /// `feature_key` : identifiant de la couche source, base des `propertyId`
    pub fn build(feature_key: &str, layer_name: &str, decoded: &DecodedFeatures) -> Self {
        let features = decoded.features.as_slice();
        let mut overlays = Vec::new();
        let mut items = HashMap::new();
        let mut legend = Vec::new();

        if is_overlay_payload(features) {
            for (index, data) in extract_overlays(features) {
                let property_id = convention::property_id(feature_key, decoded.position(index));
                let label = label_for(&data.properties);

                if let Some(href) = &data.href_legend {
                    legend.push(LegendItem {
                        label: label.clone().unwrap_or_else(|| layer_name.to_string()),
                        glyph: LegendGlyph::Image { href: href.clone() },
                    });
                }

                items.insert(
                    property_id.clone(),
                    Arc::new(FeatureDisplayItem::new(
                        property_id.clone(),
                        features[index].clone(),
                        label,
                        extract(&data.properties, MAP_KEYS),
                    )),
                );
                overlays.push((property_id, data));
            }
        }

        Self {
            overlays,
            items,
            legend,
        }
    }

    pub fn overlays(&self) -> impl Iterator<Item = &ImageOverlayData> {
        self.overlays.iter().map(|(_, data)| data)
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn render(&self, layer_id: &str, opacity: f64) -> OverlayRendering {
        OverlayRendering {
            layer_id: layer_id.to_string(),
            overlays: self
                .overlays
                .iter()
                .map(|(property_id, data)| {
                    let [south, west, north, east] = data.bbox;
                    RenderedOverlay {
                        property_id: property_id.clone(),
                        href: data.href_image.clone(),
                        bounds: [[south, west], [north, east]],
                        opacity,
                    }
                })
                .collect(),
        }
    }
}

/// Couche d'images géoréférencées
pub struct ImageOverlayLayer {
    core: LayerCore,
    feature_key: String,
    content: RwLock<Option<Arc<OverlayContent>>>,
}

impl ImageOverlayLayer {
    /// L'identifiant de rendu est `id` suffixé ; les `propertyId` gardent `id`
    pub fn new(
        ctx: MapContext,
        id: impl Into<String>,
        name: impl Into<String>,
        style: StyleHandle,
        fetch: FetchFn,
    ) -> Self {
        let feature_key = id.into();
        Self {
            core: LayerCore::new(
                ctx,
                format!("{feature_key}{OVERLAY_LAYER_SUFFIX}"),
                name,
                style,
                fetch,
            ),
            feature_key,
            content: RwLock::new(None),
        }
    }

    pub fn content(&self) -> Option<Arc<OverlayContent>> {
        self.content.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl MapLayer for ImageOverlayLayer {
    fn id(&self) -> &str {
        &self.core.id
    }

    fn name(&self) -> &str {
        &self.core.name
    }

    fn kind(&self) -> LayerKind {
        LayerKind::ImageOverlay
    }

    fn status(&self) -> LayerStatus {
        self.core.status()
    }

    fn style(&self) -> &StyleHandle {
        &self.core.style
    }

    async fn add_to(&self, surface: &dyn MapSurface) {
        let ticket = self.core.begin_add();
        let content = self
            .core
            .load(&self.content, |body| {
                let decoded = decode_features(&body)?;
                Ok(OverlayContent::build(&self.feature_key, &self.core.name, &decoded))
            })
            .await;
        let Some(content) = content else {
            return;
        };
        if content.is_empty() {
            // Payload vectoriel : rien à poser
            if self.core.is_current(ticket) {
                self.core.set_status(LayerStatus::Ready);
            }
            return;
        }
        let opacity = self.core.style.snapshot().opacity1();
        self.core.place(
            ticket,
            surface,
            self.core.settings().overlay_pane_z_index,
            RenderedLayer::ImageOverlays(content.render(&self.core.id, opacity)),
        );
    }

    fn reset_failure(&self) -> bool {
        self.core.reset_failure()
    }

    fn remove_from(&self, surface: &dyn MapSurface) {
        self.core.remove(surface, &self.core.id);
    }

    fn legend(&self) -> Vec<LegendItem> {
        self.content().map(|c| c.legend.clone()).unwrap_or_default()
    }

    fn feature_display_items(&self, property_id: &str) -> Option<Vec<Arc<FeatureDisplayItem>>> {
        self.content()?
            .items
            .get(property_id)
            .map(|item| vec![Arc::clone(item)])
    }

    fn bounds(&self) -> Option<Rect<f64>> {
        let content = self.content()?;
        let mut overlays = content.overlays();
        let first = overlays.next()?.bounds();
        Some(overlays.fold(first, |acc, data| {
            let other = data.bounds();
            Rect::new(
                coord! { x: acc.min().x.min(other.min().x), y: acc.min().y.min(other.min().y) },
                coord! { x: acc.max().x.max(other.max().x), y: acc.max().y.max(other.max().y) },
            )
        }))
    }
}
