//! Convention d'annotation des payloads EPOS
//!
//! Les clés réservées commencent toutes par `@epos` et ne sont jamais
//! affichées telles quelles dans les popups ou les tables.

use serde_json::{Map, Value};

/// Préfixe des attributs réservés
pub const RESERVED_PREFIX: &str = "@epos";

/// Liste ordonnée des propriétés à afficher sur la carte
pub const MAP_KEYS: &str = "@epos_map_keys";

/// Liste ordonnée des propriétés à afficher dans la table
pub const DATA_KEYS: &str = "@epos_data_keys";

/// Objet de style indexé par type de feature (membre du FeatureCollection)
pub const STYLE: &str = "@epos_style";

/// Type sémantique d'une feature, clé de recherche dans `@epos_style`
pub const TYPE: &str = "@epos_type";

/// Nom de la propriété servant de libellé au survol
pub const LABEL_KEY: &str = "@epos_label_key";

/// Description d'une image géoréférencée
pub const IMAGE_OVERLAY: &str = "@epos_image_overlay";

/// Propriété synthétique d'identité, ajoutée à l'exécution uniquement
pub const PROPERTY_ID: &str = "propertyId";

/// Lien titré `{ "@title": ..., "@href": ... }`
pub const LINK_TITLE: &str = "@title";
pub const LINK_HREF: &str = "@href";

/// Construit l'identifiant stable d'une feature: `{layerId}#{index}#`
pub fn property_id(layer_id: &str, index: usize) -> String {
    format!("{layer_id}#{index}#")
}

/// Indique si une clé appartient à la convention réservée
pub fn is_reserved(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

/// Lit une chaîne non vide dans un objet JSON
pub(crate) fn non_blank_str<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Type déclaré d'une feature (`@epos_type`)
pub fn feature_type(properties: Option<&Map<String, Value>>) -> Option<&str> {
    properties.and_then(|p| non_blank_str(p, TYPE))
}
