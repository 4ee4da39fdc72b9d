//! Couche CovJSON
//!
//! Domaines pris en charge : `Point`, `PointSeries` et `Grid`. Un seul
//! paramètre est rendu (celui nommé par la valeur de paramètre
//! `parameter`, sinon le premier déclaré). Les points deviennent des
//! cercles colorés, les grilles des cellules rectangulaires ; la couleur
//! suit un dégradé color1 → color2 entre le minimum et le maximum.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use geo::{BoundingRect, MultiPoint, Rect};
use geojson::{Feature, Geometry};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::convention;
use crate::error::MapLayerError;
use crate::fetch::FetchFn;
use crate::layer::surface::{MapSurface, RenderedLayer};
use crate::layer::{LayerCore, MapContext, MapLayer};
use crate::marker::color::Rgb;
use crate::marker::icon::CircleMarker;
use crate::marker::legend::{swatch, LegendItem};
use crate::properties::extract::extract;
use crate::properties::popup::FeatureDisplayItem;
use crate::style::visual::{Style, StyleHandle};
use crate::types::{parameter_value, LayerKind, LayerStatus, ParameterDefinition, ParameterValue};

/// Nom de la valeur de paramètre désignant le paramètre à rendre
pub const PARAMETER_SELECTOR: &str = "parameter";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CovJson {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    domain: Option<Domain>,
    #[serde(default)]
    domain_type: Option<String>,
    #[serde(default)]
    parameters: Option<Map<String, Value>>,
    #[serde(default)]
    ranges: Option<Map<String, Value>>,
    #[serde(default)]
    coverages: Vec<CovJson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Domain {
    #[serde(default)]
    domain_type: Option<String>,
    #[serde(default)]
    axes: HashMap<String, Axis>,
}

#[derive(Debug, Deserialize)]
struct Axis {
    #[serde(default)]
    values: Vec<Value>,
    start: Option<f64>,
    stop: Option<f64>,
    num: Option<usize>,
}

impl Axis {
    /// Première valeur numérique, sans déplier l'axe
    fn first(&self) -> Option<f64> {
        if !self.values.is_empty() {
            return self.values.iter().find_map(Value::as_f64);
        }
        match (self.start, self.stop, self.num) {
            (Some(start), _, Some(1)) => Some(start),
            (Some(start), Some(_), Some(num)) if num > 1 => Some(start),
            _ => None,
        }
    }

    /// Valeurs numériques de l'axe (axes réguliers dépliés)
    ///
    /// `None` si l'axe annonce plus de `limit` valeurs.
    fn numbers(&self, limit: usize) -> Option<Vec<f64>> {
        if self.len() > limit {
            return None;
        }
        if !self.values.is_empty() {
            return Some(self.values.iter().filter_map(Value::as_f64).collect());
        }
        Some(match (self.start, self.stop, self.num) {
            (Some(start), _, Some(1)) => vec![start],
            (Some(start), Some(stop), Some(num)) if num > 1 => {
                let step = (stop - start) / (num - 1) as f64;
                (0..num).map(|i| start + step * i as f64).collect()
            }
            _ => Vec::new(),
        })
    }

    fn len(&self) -> usize {
        if self.values.is_empty() {
            self.num.unwrap_or(0)
        } else {
            self.values.len()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NdArray {
    #[serde(default)]
    values: Vec<Option<f64>>,
    #[serde(default)]
    axis_names: Vec<String>,
    #[serde(default)]
    shape: Vec<usize>,
}

/// Paramètre rendu
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterInfo {
    pub key: String,
    pub label: String,
    pub unit: Option<String>,
}

impl ParameterInfo {
    fn parse(key: &str, value: &Value) -> Self {
        let label = value
            .pointer("/observedProperty/label")
            .and_then(i18n)
            .or_else(|| value.get("description").and_then(i18n))
            .unwrap_or_else(|| key.to_string());
        let unit = value.get("unit").and_then(|unit| {
            unit.get("symbol")
                .and_then(|s| s.as_str().or_else(|| s.get("value").and_then(Value::as_str)))
                .map(str::to_string)
                .or_else(|| unit.get("label").and_then(i18n))
        });
        Self {
            key: key.to_string(),
            label,
            unit,
        }
    }

    fn with_value(&self, value: f64) -> String {
        match &self.unit {
            Some(unit) => format!("{} {unit}", format_value(value)),
            None => format_value(value),
        }
    }
}

/// Chaîne simple ou objet de traductions (`en` en priorité)
fn i18n(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(translations) => translations
            .get("en")
            .or_else(|| translations.values().next())
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Point ou série temporelle en un lieu
#[derive(Debug, Clone, PartialEq)]
pub struct CoveragePoint {
    pub property_id: String,
    /// `[x, y]` (longitude, latitude)
    pub position: [f64; 2],
    /// Dernière valeur non nulle
    pub value: Option<f64>,
    pub samples: usize,
}

/// Cellule de grille
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    /// `[[sud, ouest], [nord, est]]`
    pub bounds: [[f64; 2]; 2],
    pub value: f64,
}

#[derive(Debug)]
pub struct CoverageContent {
    parameter: Option<ParameterInfo>,
    points: Vec<CoveragePoint>,
    cells: Vec<GridCell>,
    range: Option<(f64, f64)>,
    items: HashMap<String, Arc<FeatureDisplayItem>>,
}

impl CoverageContent {
    /// Lit un document `Coverage` ou `CoverageCollection`
    pub fn parse(feature_key: &str, body: &[u8], selected: Option<&str>) -> Result<Self, MapLayerError> {
        let document: CovJson = serde_json::from_slice(body)?;
        let coverages: Vec<&CovJson> = match document.kind.as_str() {
            "Coverage" => vec![&document],
            "CoverageCollection" => document.coverages.iter().collect(),
            other => {
                return Err(MapLayerError::invalid_payload(
                    "covjson",
                    format!("unsupported document type {other}"),
                ))
            }
        };

        let parameters = document
            .parameters
            .as_ref()
            .or_else(|| coverages.iter().find_map(|c| c.parameters.as_ref()));
        let parameter = parameters.and_then(|params| {
            let key = selected
                .filter(|s| params.contains_key(*s))
                .or_else(|| params.keys().next().map(String::as_str))?;
            params.get(key).map(|value| ParameterInfo::parse(key, value))
        });

        let mut content = Self {
            parameter,
            points: Vec::new(),
            cells: Vec::new(),
            range: None,
            items: HashMap::new(),
        };
        let Some(key) = content.parameter.as_ref().map(|p| p.key.clone()) else {
            return Ok(content);
        };

        for coverage in coverages {
            let domain_type = coverage
                .domain
                .as_ref()
                .and_then(|d| d.domain_type.as_deref())
                .or(coverage.domain_type.as_deref())
                .or(document.domain_type.as_deref());
            let (Some(domain), Some(range)) = (
                coverage.domain.as_ref(),
                coverage
                    .ranges
                    .as_ref()
                    .and_then(|r| r.get(&key))
                    .and_then(|r| serde_json::from_value::<NdArray>(r.clone()).ok()),
            ) else {
                debug!(parameter = %key, "Coverage without domain or range dropped");
                continue;
            };

            match domain_type {
                Some("Point") | Some("PointSeries") => content.push_point(feature_key, domain, &range),
                Some("Grid") => content.push_grid(domain, &range),
                other => debug!(domain_type = ?other, "Unsupported coverage domain dropped"),
            }
        }

        content.range = value_range(
            content
                .points
                .iter()
                .filter_map(|p| p.value)
                .chain(content.cells.iter().map(|c| c.value)),
        );
        Ok(content)
    }

    fn push_point(&mut self, feature_key: &str, domain: &Domain, range: &NdArray) {
        let x = domain.axes.get("x").and_then(Axis::first);
        let y = domain.axes.get("y").and_then(Axis::first);
        let (Some(x), Some(y)) = (x, y) else {
            debug!("Point coverage without x/y dropped");
            return;
        };

        let samples = range.values.iter().flatten().count();
        let value = range.values.iter().rev().find_map(|v| *v);
        let property_id = convention::property_id(feature_key, self.points.len());

        if let Some(parameter) = &self.parameter {
            let mut properties = Map::new();
            properties.insert(
                parameter.label.clone(),
                value.map_or(Value::Null, |v| Value::String(parameter.with_value(v))),
            );
            if samples > 1 {
                properties.insert("samples".to_string(), Value::from(samples));
            }
            let feature = Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::Point(vec![x, y]))),
                id: None,
                properties: Some(properties.clone()),
                foreign_members: None,
            };
            self.items.insert(
                property_id.clone(),
                Arc::new(FeatureDisplayItem::new(
                    property_id.clone(),
                    feature,
                    Some(parameter.label.clone()),
                    extract(&properties, convention::MAP_KEYS),
                )),
            );
        }

        self.points.push(CoveragePoint {
            property_id,
            position: [x, y],
            value,
            samples,
        });
    }

    fn push_grid(&mut self, domain: &Domain, range: &NdArray) {
        let (Some(x_axis), Some(y_axis)) = (domain.axes.get("x"), domain.axes.get("y")) else {
            debug!("Grid coverage without x/y axes dropped");
            return;
        };
        let Some(index) = GridIndex::new(range, &domain.axes) else {
            debug!("Grid coverage with inconsistent shape dropped");
            return;
        };
        let (Some(xs), Some(ys)) = (x_axis.numbers(index.x_len), y_axis.numbers(index.y_len)) else {
            debug!("Grid axes longer than the range dropped");
            return;
        };

        let x_edges = edges(&xs);
        let y_edges = edges(&ys);
        for (iy, y_pair) in y_edges.windows(2).enumerate() {
            for (ix, x_pair) in x_edges.windows(2).enumerate() {
                let Some(Some(value)) = range.values.get(index.offset(ix, iy)) else {
                    continue;
                };
                let (south, north) = (y_pair[0].min(y_pair[1]), y_pair[0].max(y_pair[1]));
                let (west, east) = (x_pair[0].min(x_pair[1]), x_pair[0].max(x_pair[1]));
                self.cells.push(GridCell {
                    bounds: [[south, west], [north, east]],
                    value: *value,
                });
            }
        }
    }

    pub fn parameter(&self) -> Option<&ParameterInfo> {
        self.parameter.as_ref()
    }

    pub fn points(&self) -> &[CoveragePoint] {
        &self.points
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// `(minimum, maximum)` des valeurs rendues
    pub fn range(&self) -> Option<(f64, f64)> {
        self.range
    }

    pub fn bounds(&self) -> Option<Rect<f64>> {
        let mut positions: Vec<(f64, f64)> = self.points.iter().map(|p| (p.position[0], p.position[1])).collect();
        for cell in &self.cells {
            let [[south, west], [north, east]] = cell.bounds;
            positions.push((west, south));
            positions.push((east, north));
        }
        MultiPoint::from(positions).bounding_rect()
    }

    pub fn render(&self, layer_id: &str, style: &Style) -> CoverageRendering {
        let ramp = ColorRamp::new(style, self.range);
        CoverageRendering {
            layer_id: layer_id.to_string(),
            parameter: self.parameter.clone(),
            points: self
                .points
                .iter()
                .map(|point| {
                    let mut marker = CircleMarker::from_style(style);
                    if let Some(value) = point.value {
                        marker.fill_color = ramp.color(value).to_hex();
                    }
                    RenderedCoveragePoint {
                        property_id: point.property_id.clone(),
                        position: point.position,
                        marker,
                    }
                })
                .collect(),
            cells: self
                .cells
                .iter()
                .map(|cell| RenderedCell {
                    bounds: cell.bounds,
                    color: ramp.color(cell.value).to_hex(),
                    opacity: style.opacity1(),
                })
                .collect(),
        }
    }

    /// Deux entrées : minimum (color1) et maximum (color2)
    pub fn legend(&self, style: &Style) -> Vec<LegendItem> {
        let (Some(parameter), Some((min, max))) = (&self.parameter, self.range) else {
            return Vec::new();
        };
        let ramp = ColorRamp::new(style, self.range);
        vec![
            swatch(format!("{} min: {}", parameter.label, parameter.with_value(min)), ramp.from),
            swatch(format!("{} max: {}", parameter.label, parameter.with_value(max)), ramp.to),
        ]
    }
}

fn value_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((min, max)) => Some((min.min(v), max.max(v))),
        })
}

/// Bords des cellules à partir de leurs centres
fn edges(centers: &[f64]) -> Vec<f64> {
    match centers {
        [] => Vec::new(),
        [single] => vec![*single, *single],
        _ => {
            let n = centers.len();
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(centers[0] - (centers[1] - centers[0]) / 2.0);
            for pair in centers.windows(2) {
                edges.push((pair[0] + pair[1]) / 2.0);
            }
            edges.push(centers[n - 1] + (centers[n - 1] - centers[n - 2]) / 2.0);
            edges
        }
    }
}

/// Position d'une cellule `(x, y)` dans le tableau de valeurs (ordre ligne)
struct GridIndex {
    stride_x: usize,
    stride_y: usize,
    x_len: usize,
    y_len: usize,
}

impl GridIndex {
    /// `None` si la forme ne correspond pas aux valeurs (ou déborde)
    fn new(range: &NdArray, axes: &HashMap<String, Axis>) -> Option<Self> {
        let names: Vec<&str> = if range.axis_names.is_empty() {
            vec!["y", "x"]
        } else {
            range.axis_names.iter().map(String::as_str).collect()
        };
        let shape: Vec<usize> = if range.shape.is_empty() {
            names
                .iter()
                .map(|name| axes.get(*name).map_or(1, Axis::len))
                .collect()
        } else {
            range.shape.clone()
        };
        if shape.len() != names.len() || checked_product(&shape)? != range.values.len() {
            return None;
        }

        let position = |axis: &str| names.iter().position(|n| *n == axis);
        let (x, y) = (position("x")?, position("y")?);
        Some(Self {
            stride_x: checked_product(&shape[x + 1..])?,
            stride_y: checked_product(&shape[y + 1..])?,
            x_len: shape[x],
            y_len: shape[y],
        })
    }

    fn offset(&self, ix: usize, iy: usize) -> usize {
        iy * self.stride_y + ix * self.stride_x
    }
}

fn checked_product(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
}

/// Dégradé linéaire entre color1 et color2
struct ColorRamp {
    from: Rgb,
    to: Rgb,
    range: Option<(f64, f64)>,
}

impl ColorRamp {
    fn new(style: &Style, range: Option<(f64, f64)>) -> Self {
        Self {
            from: Rgb::parse_or(&style.color1, Rgb::BLACK),
            to: Rgb::parse_or(&style.color2, Rgb::WHITE),
            range,
        }
    }

    fn color(&self, value: f64) -> Rgb {
        let t = match self.range {
            Some((min, max)) if max > min => ((value - min) / (max - min)).clamp(0.0, 1.0),
            _ => 0.0,
        };
        self.from.lerp(self.to, t)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedCoveragePoint {
    pub property_id: String,
    pub position: [f64; 2],
    pub marker: CircleMarker,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedCell {
    pub bounds: [[f64; 2]; 2],
    pub color: String,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageRendering {
    pub layer_id: String,
    pub parameter: Option<ParameterInfo>,
    pub points: Vec<RenderedCoveragePoint>,
    pub cells: Vec<RenderedCell>,
}

/// Couche de couverture
pub struct CoverageLayer {
    core: LayerCore,
    selected_parameter: Option<String>,
    content: RwLock<Option<Arc<CoverageContent>>>,
}

impl CoverageLayer {
    pub fn new(
        ctx: MapContext,
        id: impl Into<String>,
        name: impl Into<String>,
        style: StyleHandle,
        fetch: FetchFn,
        parameter_defs: &[ParameterDefinition],
        parameter_values: &[ParameterValue],
    ) -> Self {
        let selected_parameter =
            parameter_value(parameter_defs, parameter_values, PARAMETER_SELECTOR).map(str::to_string);
        Self {
            core: LayerCore::new(ctx, id, name, style, fetch),
            selected_parameter,
            content: RwLock::new(None),
        }
    }

    pub fn content(&self) -> Option<Arc<CoverageContent>> {
        self.content.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl MapLayer for CoverageLayer {
    fn id(&self) -> &str {
        &self.core.id
    }

    fn name(&self) -> &str {
        &self.core.name
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Coverage
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
                CoverageContent::parse(&self.core.id, &body, self.selected_parameter.as_deref())
            })
            .await;
        let Some(content) = content else {
            return;
        };
        let rendering = content.render(&self.core.id, &self.core.style.snapshot());
        self.core.place(
            ticket,
            surface,
            self.core.settings().overlay_pane_z_index,
            RenderedLayer::Coverage(rendering),
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
            .map(|c| c.legend(&self.core.style.snapshot()))
            .unwrap_or_default()
    }

    fn feature_display_items(&self, property_id: &str) -> Option<Vec<Arc<FeatureDisplayItem>>> {
        self.content()?
            .items
            .get(property_id)
            .map(|item| vec![Arc::clone(item)])
    }

    fn bounds(&self) -> Option<Rect<f64>> {
        self.content()?.bounds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn grid() -> serde_json::Value {
        json!({
            "type": "Coverage",
            "domain": {
                "type": "Domain",
                "domainType": "Grid",
                "axes": {
                    "x": {"start": 0.0, "stop": 2.0, "num": 3},
                    "y": {"values": [10.0, 11.0]},
                    "t": {"values": ["2020-01-01T00:00:00Z"]}
                }
            },
            "parameters": {
                "TEMP": {"type": "Parameter",
                         "observedProperty": {"label": {"en": "Temperature"}},
                         "unit": {"symbol": "K"}}
            },
            "ranges": {
                "TEMP": {"type": "NdArray", "axisNames": ["t", "y", "x"], "shape": [1, 2, 3],
                         "values": [1.0, 2.0, 3.0, 4.0, null, 6.0]}
            }
        })
    }

    #[test]
    fn test_grid_cells_and_range() {
        let content = CoverageContent::parse("cov", grid().to_string().as_bytes(), None).unwrap();
        let parameter = content.parameter().unwrap();
        assert_eq!(parameter.label, "Temperature");
        assert_eq!(parameter.unit.as_deref(), Some("K"));

        // 6 cellules moins la valeur nulle
        assert_eq!(content.cells().len(), 5);
        assert_eq!(content.range(), Some((1.0, 6.0)));
        assert_eq!(content.cells()[0].bounds, [[9.5, -0.5], [10.5, 0.5]]);
        assert_eq!(content.cells()[3].value, 4.0);
        assert_eq!(content.cells()[4].value, 6.0);
    }

    #[test]
    fn test_grid_colors_follow_ramp() {
        let content = CoverageContent::parse("cov", grid().to_string().as_bytes(), None).unwrap();
        let style = Style {
            color1: "#000000".to_string(),
            color2: "#ffffff".to_string(),
            ..Style::default()
        };
        let rendering = content.render("cov", &style);
        assert_eq!(rendering.cells[0].color, "#000000");
        assert_eq!(rendering.cells[4].color, "#ffffff");

        let legend = content.legend(&style);
        assert_eq!(legend.len(), 2);
        assert_eq!(legend[0].label, "Temperature min: 1 K");
        assert_eq!(legend[1].label, "Temperature max: 6 K");
    }

    #[test]
    fn test_point_series_collection() {
        let body = json!({
            "type": "CoverageCollection",
            "domainType": "PointSeries",
            "parameters": {
                "SO2": {"observedProperty": {"label": "Sulfur dioxide"}},
                "PM10": {"observedProperty": {"label": "PM10"}, "unit": {"label": {"en": "ug/m3"}}}
            },
            "coverages": [
                {"type": "Coverage",
                 "domain": {"axes": {"x": {"values": [2.3]}, "y": {"values": [48.8]},
                                     "t": {"values": ["a", "b", "c"]}}},
                 "ranges": {"PM10": {"values": [12.0, 15.5, null]}}},
                {"type": "Coverage",
                 "domain": {"axes": {"x": {"values": [4.8]}}},
                 "ranges": {"PM10": {"values": [1.0]}}}
            ]
        });
        let content = CoverageContent::parse("aq", body.to_string().as_bytes(), Some("PM10")).unwrap();

        // Le second point n'a pas de latitude
        assert_eq!(content.points().len(), 1);
        let point = &content.points()[0];
        assert_eq!(point.position, [2.3, 48.8]);
        assert_eq!(point.value, Some(15.5));
        assert_eq!(point.samples, 2);

        let item = &content.items["aq#0#"];
        assert_eq!(item.label(), Some("PM10"));
        assert_eq!(item.properties()[0].display_value(), "15.50 ug/m3");
    }

    #[test]
    fn test_rejects_unknown_document() {
        let err = CoverageContent::parse("x", br#"{"type": "Domain"}"#, None).unwrap_err();
        assert!(matches!(err, MapLayerError::InvalidPayload { .. }));
    }

    #[test]
    fn test_edges() {
        assert_eq!(edges(&[0.0, 1.0, 2.0]), vec![-0.5, 0.5, 1.5, 2.5]);
        assert_eq!(edges(&[5.0]), vec![5.0, 5.0]);
        assert!(edges(&[]).is_empty());
    }

    #[test]
    fn test_oversized_axes_not_expanded() {
        let point = json!({
            "type": "Coverage",
            "domain": {"domainType": "Point", "axes": {
                "x": {"start": 0.0, "stop": 1.0, "num": 4611686018427387904u64},
                "y": {"values": [1.0]}
            }},
            "parameters": {"P": {"observedProperty": {"label": "P"}}},
            "ranges": {"P": {"values": [3.0]}}
        });
        let content = CoverageContent::parse("p", point.to_string().as_bytes(), None).unwrap();
        assert_eq!(content.points()[0].position, [0.0, 1.0]);

        // Forme déduite des axes : le produit déborde
        let grid = json!({
            "type": "Coverage",
            "domain": {"domainType": "Grid", "axes": {
                "x": {"start": 0.0, "stop": 1.0, "num": 4611686018427387904u64},
                "y": {"start": 0.0, "stop": 1.0, "num": 4611686018427387904u64}
            }},
            "parameters": {"P": {}},
            "ranges": {"P": {"values": [1.0, 2.0]}}
        });
        let content = CoverageContent::parse("g", grid.to_string().as_bytes(), None).unwrap();
        assert!(content.cells().is_empty());

        // Forme explicite cohérente, mais axe x plus long que la forme
        let grid = json!({
            "type": "Coverage",
            "domain": {"domainType": "Grid", "axes": {
                "x": {"start": 0.0, "stop": 1.0, "num": 9223372036854775807u64},
                "y": {"values": [0.0]}
            }},
            "parameters": {"P": {}},
            "ranges": {"P": {"axisNames": ["y", "x"], "shape": [1, 2], "values": [1.0, 2.0]}}
        });
        let content = CoverageContent::parse("g", grid.to_string().as_bytes(), None).unwrap();
        assert!(content.cells().is_empty());
        assert_eq!(content.range(), None);
    }
}
