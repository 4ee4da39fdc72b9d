//! Types partagés par les couches et les fabriques

use serde::{Deserialize, Serialize};

/// Identifiant synthétique d'un style dans la `StyleTable`
pub type StyleId = u32;

/// Famille de géométrie, utilisée pour les features sans type déclaré
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
}

impl GeometryKind {
    /// Classe une géométrie GeoJSON
    ///
    /// `MultiPoint` est traité comme un point ; tout ce qui n'est ni point
    /// ni ligne est considéré surfacique.
    pub fn of(value: &geojson::Value) -> Self {
        match value {
            geojson::Value::Point(_) | geojson::Value::MultiPoint(_) => Self::Point,
            geojson::Value::LineString(_) | geojson::Value::MultiLineString(_) => Self::Line,
            _ => Self::Polygon,
        }
    }

    /// Rang de priorité quand plusieurs familles non typées coexistent
    pub(crate) fn precedence(self) -> u8 {
        match self {
            Self::Point => 2,
            Self::Line => 1,
            Self::Polygon => 0,
        }
    }
}

/// Nature d'une couche produite par une fabrique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LayerKind {
    Vector,
    ImageOverlay,
    Coverage,
    Tiles,
}

/// Cycle de vie du chargement d'une couche
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LayerStatus {
    /// Jamais ajoutée à une carte
    #[default]
    Idle,
    /// Récupération du payload en cours
    Loading,
    /// Contenu construit
    Ready,
    /// Récupération ou décodage échoué, couche vide
    Failed,
}

/// Définition d'un paramètre du service source
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub default_value: Option<String>,
}

/// Valeur choisie pour un paramètre
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParameterValue {
    pub name: String,
    pub value: String,
}

impl ParameterValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Résout la valeur d'un paramètre (valeur choisie, sinon défaut déclaré)
///
/// La comparaison des noms ignore la casse.
pub fn parameter_value<'a>(
    definitions: &'a [ParameterDefinition],
    values: &'a [ParameterValue],
    name: &str,
) -> Option<&'a str> {
    values
        .iter()
        .find(|v| v.name.eq_ignore_ascii_case(name))
        .map(|v| v.value.as_str())
        .or_else(|| {
            definitions
                .iter()
                .find(|d| d.name.eq_ignore_ascii_case(name))
                .and_then(|d| d.default_value.as_deref())
        })
        .filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn geometry(value: serde_json::Value) -> geojson::Value {
        serde_json::from_value::<geojson::Geometry>(value)
            .unwrap()
            .value
    }

    #[test]
    fn test_geometry_kind() {
        let point = geometry(json!({"type": "Point", "coordinates": [1.0, 2.0]}));
        let line = geometry(json!({"type": "MultiLineString", "coordinates": [[[0.0, 0.0], [1.0, 1.0]]]}));
        let polygon = geometry(
            json!({"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]}),
        );

        assert_eq!(GeometryKind::of(&point), GeometryKind::Point);
        assert_eq!(GeometryKind::of(&line), GeometryKind::Line);
        assert_eq!(GeometryKind::of(&polygon), GeometryKind::Polygon);
    }

    #[test]
    fn test_parameter_value_prefers_explicit_value() {
        let defs = vec![ParameterDefinition {
            name: "layers".to_string(),
            label: "Layers".to_string(),
            default_value: Some("default_layer".to_string()),
        }];
        let values = vec![ParameterValue::new("LAYERS", "chosen")];

        assert_eq!(parameter_value(&defs, &values, "layers"), Some("chosen"));
        assert_eq!(parameter_value(&defs, &[], "layers"), Some("default_layer"));
        assert_eq!(parameter_value(&defs, &[], "styles"), None);
    }
}
