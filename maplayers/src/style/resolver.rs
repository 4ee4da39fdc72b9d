//! Résolution des styles d'un payload
//!
//! Deux passes : construction de la `StyleTable` à partir de `@epos_style`,
//! puis attribution d'un identifiant de style à chaque feature typée. Les
//! features sans type connu n'ont pas d'identifiant ; leur famille de
//! géométrie sert uniquement à la légende par défaut.

use std::collections::{BTreeMap, HashMap};

use geojson::Feature;
use serde_json::{Map, Value};
use tracing::debug;

use crate::convention;
use crate::style::spec::{MarkerSpec, StyleSpec};
use crate::style::visual::StyleHandle;
use crate::types::{GeometryKind, StyleId};

/// Styles indexés par identifiant synthétique, ordre croissant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleTable {
    entries: BTreeMap<StyleId, StyleSpec>,
}

impl StyleTable {
    pub fn get(&self, id: StyleId) -> Option<&StyleSpec> {
        self.entries.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StyleId, &StyleSpec)> {
        self.entries.iter().map(|(id, spec)| (*id, spec))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Marqueur du style `id`, s'il existe
    pub fn marker(&self, id: StyleId) -> Option<&MarkerSpec> {
        self.get(id).and_then(|s| s.marker.as_ref())
    }

    /// Premier marqueur déclaré (ordre des identifiants)
    pub fn first_marker(&self) -> Option<&MarkerSpec> {
        self.entries.values().find_map(|s| s.marker.as_ref())
    }
}

/// Résultat de la première passe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleResolution {
    pub table: StyleTable,
    pub ids_by_type: HashMap<String, StyleId>,
}

impl StyleResolution {
    pub fn style_id(&self, feature_type: &str) -> Option<StyleId> {
        self.ids_by_type.get(feature_type).copied()
    }
}

/// Construit la table des styles déclarés, dans l'ordre du payload
///
/// Si l'utilisateur n'a pas encore choisi de clustering, la préférence est
/// initialisée avec celle du premier marqueur lu.
pub fn resolve(
    style_payload: Option<&Map<String, Value>>,
    start_id: StyleId,
    style: &StyleHandle,
) -> StyleResolution {
    let mut resolution = StyleResolution::default();
    let Some(payload) = style_payload else {
        return resolution;
    };

    let mut next_id = start_id;
    for (type_key, value) in payload {
        let type_key = type_key.trim();
        if type_key.is_empty() || resolution.ids_by_type.contains_key(type_key) {
            continue;
        }
        let spec = StyleSpec::parse(type_key, value);
        resolution.ids_by_type.insert(type_key.to_string(), next_id);
        resolution.table.entries.insert(next_id, spec);
        next_id += 1;
    }

    if let Some(marker) = resolution.table.first_marker() {
        if style.seed_clustering(marker.clustering) {
            debug!(clustering = marker.clustering, "Clustering preference seeded from payload");
        }
    }

    resolution
}

/// Résultat de la seconde passe, table annexe `index de feature -> style`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleAssignment {
    by_feature: BTreeMap<usize, StyleId>,
    untyped: Option<GeometryKind>,
}

impl StyleAssignment {
    pub fn style_id(&self, feature_index: usize) -> Option<StyleId> {
        self.by_feature.get(&feature_index).copied()
    }

    /// Famille des géométries non typées (pour la légende par défaut)
    pub fn untyped_kind(&self) -> Option<GeometryKind> {
        self.untyped
    }

    pub fn styled_count(&self) -> usize {
        self.by_feature.len()
    }

    fn record_untyped(&mut self, kind: GeometryKind) {
        match self.untyped {
            Some(current) if current.precedence() >= kind.precedence() => {}
            _ => self.untyped = Some(kind),
        }
    }
}

/// Attribue un style à chaque feature, sans modifier le payload
pub fn assign(features: &[Feature], resolution: &StyleResolution) -> StyleAssignment {
    let mut assignment = StyleAssignment::default();

    for (index, feature) in features.iter().enumerate() {
        let typed = convention::feature_type(feature.properties.as_ref())
            .and_then(|t| resolution.style_id(t));

        match typed {
            Some(id) => {
                assignment.by_feature.insert(index, id);
            }
            None => {
                if let Some(geometry) = &feature.geometry {
                    assignment.record_untyped(GeometryKind::of(&geometry.value));
                }
            }
        }
    }

    assignment
}
