//! Couches tuilées WMS et WMTS
//!
//! Le payload récupéré est une URL de service (GetMap, GetCapabilities,
//! gabarit REST ou requête KVP GetTile) ; elle est décomposée pour décrire
//! la source de tuiles.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::Serialize;
use url::form_urlencoded::byte_serialize;
use url::Url;

use crate::error::MapLayerError;
use crate::factory::LayerRequest;
use crate::fetch::FetchFn;
use crate::layer::surface::{MapSurface, RenderedLayer};
use crate::layer::{LayerCore, MapContext, MapLayer};
use crate::marker::legend::{LegendGlyph, LegendItem};
use crate::properties::popup::FeatureDisplayItem;
use crate::style::visual::StyleHandle;
use crate::types::{parameter_value, LayerKind, LayerStatus};

/// Paramètres WMS surchargeables par les valeurs de paramètres
pub const WMS_OVERRIDABLE: [&str; 5] = ["layers", "styles", "format", "transparent", "version"];

/// Paramètres propres à une requête WMS, retirés de l'URL de base
const WMS_REQUEST_KEYS: [&str; 13] = [
    "service", "request", "version", "layers", "styles", "format", "transparent", "crs", "srs",
    "bbox", "width", "height", "exceptions",
];

const WMTS_REQUEST_KEYS: [&str; 10] = [
    "service", "request", "version", "layer", "style", "tilematrixset", "format", "tilematrix",
    "tilerow", "tilecol",
];

const DEFAULT_FORMAT: &str = "image/png";
const DEFAULT_WMS_VERSION: &str = "1.3.0";
const DEFAULT_TILE_MATRIX_SET: &str = "GoogleMapsCompatible";

/// Protocole d'une couche tuilée
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileProtocol {
    Wms,
    Wmts,
}

/// Source de tuiles transmise au widget
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TileSource {
    #[serde(rename_all = "camelCase")]
    Wms {
        base_url: String,
        layers: String,
        styles: String,
        format: String,
        transparent: bool,
        version: String,
    },
    /// Gabarit `{z}/{x}/{y}`
    #[serde(rename_all = "camelCase")]
    Wmts {
        url_template: String,
        layer: Option<String>,
        tile_matrix_set: Option<String>,
        format: Option<String>,
    },
}

impl TileSource {
    /// URL GetLegendGraphic de la première couche WMS
    pub fn legend_url(&self) -> Option<String> {
        let Self::Wms {
            base_url,
            layers,
            styles,
            version,
            ..
        } = self
        else {
            return None;
        };
        let layer = layers.split(',').map(str::trim).find(|l| !l.is_empty())?;

        let mut url = Url::parse(base_url).ok()?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("SERVICE", "WMS")
                .append_pair("REQUEST", "GetLegendGraphic")
                .append_pair("VERSION", version)
                .append_pair("FORMAT", DEFAULT_FORMAT)
                .append_pair("LAYER", layer);
            if let Some(style) = styles.split(',').next().filter(|s| !s.trim().is_empty()) {
                query.append_pair("STYLE", style.trim());
            }
        }
        Some(url.to_string())
    }
}

/// Paramètres de requête, clés en minuscules
fn query_map(url: &Url) -> HashMap<String, String> {
    url.query_pairs()
        .map(|(k, v)| (k.to_lowercase(), v.into_owned()))
        .collect()
}

/// URL sans les paramètres de requête listés
fn strip_query(url: &Url, request_keys: &[&str]) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !request_keys.contains(&k.to_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);
    if !kept.is_empty() {
        base.query_pairs_mut().extend_pairs(kept);
    }
    base
}

fn parse_url(raw: &str) -> Result<Url, MapLayerError> {
    Url::parse(raw.trim()).map_err(|e| MapLayerError::invalid_url(raw.trim(), e.to_string()))
}

/// Décrit une source WMS ; `overrides` remplace les valeurs de l'URL
pub fn parse_wms(raw: &str, overrides: &[(String, String)]) -> Result<TileSource, MapLayerError> {
    let url = parse_url(raw)?;
    let mut query = query_map(&url);
    for (name, value) in overrides {
        query.insert(name.to_lowercase(), value.clone());
    }

    let layers = query
        .get("layers")
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .ok_or_else(|| MapLayerError::invalid_url(raw.trim(), "missing WMS layers"))?
        .to_string();

    let transparent = query
        .get("transparent")
        .map_or(true, |t| !t.trim().eq_ignore_ascii_case("false"));

    Ok(TileSource::Wms {
        base_url: strip_query(&url, &WMS_REQUEST_KEYS).to_string(),
        layers,
        styles: query.get("styles").cloned().unwrap_or_default(),
        format: query
            .get("format")
            .filter(|f| !f.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
        transparent,
        version: query
            .get("version")
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_WMS_VERSION.to_string()),
    })
}

/// Décrit une source WMTS, gabarit REST ou requête KVP
pub fn parse_wmts(raw: &str) -> Result<TileSource, MapLayerError> {
    let trimmed = raw.trim();
    if trimmed.contains("{TileMatrix}") || trimmed.contains("{z}") {
        // Valide le schéma et l'hôte, les accolades restent littérales
        parse_url(&trimmed.replace(['{', '}'], ""))?;
        return Ok(TileSource::Wmts {
            url_template: trimmed
                .replace("{TileMatrix}", "{z}")
                .replace("{TileRow}", "{y}")
                .replace("{TileCol}", "{x}"),
            layer: None,
            tile_matrix_set: None,
            format: None,
        });
    }

    let url = parse_url(trimmed)?;
    let query = query_map(&url);
    let layer = query
        .get("layer")
        .filter(|l| !l.trim().is_empty())
        .cloned()
        .ok_or_else(|| MapLayerError::invalid_url(trimmed, "missing WMTS layer"))?;
    let tile_matrix_set = query
        .get("tilematrixset")
        .cloned()
        .unwrap_or_else(|| DEFAULT_TILE_MATRIX_SET.to_string());
    let format = query
        .get("format")
        .cloned()
        .unwrap_or_else(|| DEFAULT_FORMAT.to_string());
    let style = query.get("style").cloned().unwrap_or_else(|| "default".to_string());

    let base = strip_query(&url, &WMTS_REQUEST_KEYS).to_string();
    let separator = if base.contains('?') { '&' } else { '?' };
    let encode = |value: &str| byte_serialize(value.as_bytes()).collect::<String>();
    let url_template = format!(
        "{base}{separator}SERVICE=WMTS&REQUEST=GetTile&VERSION=1.0.0&LAYER={}&STYLE={}&TILEMATRIXSET={}&FORMAT={}&TILEMATRIX={{z}}&TILEROW={{y}}&TILECOL={{x}}",
        encode(&layer),
        encode(&style),
        encode(&tile_matrix_set),
        encode(&format),
    );

    Ok(TileSource::Wmts {
        url_template,
        layer: Some(layer),
        tile_matrix_set: Some(tile_matrix_set),
        format: Some(format),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileRendering {
    pub layer_id: String,
    pub source: TileSource,
    pub opacity: f64,
}

/// Couche tuilée
pub struct TileLayer {
    core: LayerCore,
    protocol: TileProtocol,
    overrides: Vec<(String, String)>,
    source: RwLock<Option<Arc<TileSource>>>,
}

impl TileLayer {
    /// Couche tuilée pour une demande ; les surcharges WMS viennent de ses paramètres
    pub fn new(ctx: &MapContext, request: &LayerRequest, fetch: FetchFn, protocol: TileProtocol) -> Self {
        let overrides = match protocol {
            TileProtocol::Wms => WMS_OVERRIDABLE
                .iter()
                .filter_map(|name| {
                    parameter_value(&request.parameter_defs, &request.parameter_values, name)
                        .map(|value| (name.to_string(), value.to_string()))
                })
                .collect(),
            TileProtocol::Wmts => Vec::new(),
        };
        let style = ctx.style_for(&request.id, request.stylable);
        Self {
            core: LayerCore::new(ctx.clone(), &request.id, &request.name, style, fetch),
            protocol,
            overrides,
            source: RwLock::new(None),
        }
    }

    pub fn protocol(&self) -> TileProtocol {
        self.protocol
    }

    pub fn source(&self) -> Option<Arc<TileSource>> {
        self.source.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl MapLayer for TileLayer {
    fn id(&self) -> &str {
        &self.core.id
    }

    fn name(&self) -> &str {
        &self.core.name
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Tiles
    }

    fn status(&self) -> LayerStatus {
        self.core.status()
    }

    fn style(&self) -> &StyleHandle {
        &self.core.style
    }

    async fn add_to(&self, surface: &dyn MapSurface) {
        let ticket = self.core.begin_add();
        let source = self
            .core
            .load(&self.source, |body| {
                let raw = std::str::from_utf8(&body)
                    .map_err(|e| MapLayerError::invalid_payload("tiles", e.to_string()))?;
                match self.protocol {
                    TileProtocol::Wms => parse_wms(raw, &self.overrides),
                    TileProtocol::Wmts => parse_wmts(raw),
                }
            })
            .await;
        let Some(source) = source else {
            return;
        };
        let rendering = TileRendering {
            layer_id: self.core.id.clone(),
            source: source.as_ref().clone(),
            opacity: self.core.style.snapshot().opacity1(),
        };
        self.core.place(
            ticket,
            surface,
            self.core.settings().overlay_pane_z_index,
            RenderedLayer::Tiles(rendering),
        );
    }

    fn reset_failure(&self) -> bool {
        self.core.reset_failure()
    }

    fn remove_from(&self, surface: &dyn MapSurface) {
        self.core.remove(surface, &self.core.id);
    }

    fn legend(&self) -> Vec<LegendItem> {
        self.source()
            .and_then(|s| s.legend_url())
            .map(|href| {
                vec![LegendItem {
                    label: self.core.name.clone(),
                    glyph: LegendGlyph::Image { href },
                }]
            })
            .unwrap_or_default()
    }

    fn feature_display_items(&self, _property_id: &str) -> Option<Vec<Arc<FeatureDisplayItem>>> {
        None
    }
}
