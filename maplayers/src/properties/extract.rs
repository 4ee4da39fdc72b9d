//! Extraction des propriétés affichables d'un objet JSON arbitraire
//!
//! Deux chemins :
//! 1. les clés listées par l'indice (`@epos_map_keys` ou `@epos_data_keys`),
//!    dans l'ordre déclaré ;
//! 2. à défaut, toutes les clés non réservées de l'objet.
//!
//! Chaque valeur est ensuite classée : primitive, tableau de primitives,
//! tableau de liens, lien titré (`@title`/`@href`) ou objet quelconque.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::convention::{self, LABEL_KEY, LINK_HREF, LINK_TITLE};
use crate::properties::display::{DisplayProperty, DownloadLink, PropertyKind, PropertyValue};

const URL_PATTERN: &str = r"(?i)^https?://[^\s<>]+$";

/// Extrait les propriétés d'une feature
pub fn extract(properties: &Map<String, Value>, hint_key: &str) -> Vec<DisplayProperty> {
    let mut result = Vec::new();

    if let Some(keys) = hinted_keys(properties, hint_key) {
        for key in keys {
            if let Some(value) = properties.get(key) {
                result.extend(classify(key, value));
            }
        }
    }

    if result.is_empty() {
        for (key, value) in properties {
            if convention::is_reserved(key) {
                continue;
            }
            result.extend(classify(key, value));
        }
    }

    result
}

/// Clés listées par l'indice, si c'est un tableau non vide de chaînes
pub fn hinted_keys<'a>(properties: &'a Map<String, Value>, hint_key: &str) -> Option<Vec<&'a str>> {
    let keys: Vec<&str> = properties
        .get(hint_key)?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .collect();

    if keys.is_empty() {
        None
    } else {
        Some(keys)
    }
}

/// Libellé de survol désigné par `@epos_label_key`
pub fn label_for(properties: &Map<String, Value>) -> Option<String> {
    let key = convention::non_blank_str(properties, LABEL_KEY)?;
    match properties.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(plain_text(other)),
    }
}

/// Classe une valeur ; `null` ne produit rien
fn classify(name: &str, value: &Value) -> Vec<DisplayProperty> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) if is_link_array(items) => items
            .iter()
            .filter_map(Value::as_object)
            .map(|link| link_property(name, link))
            .collect(),
        Value::Array(items) => {
            let values = items
                .iter()
                .filter(|v| !v.is_null())
                .map(scalar_value)
                .collect();
            vec![DisplayProperty::new(name, values)]
        }
        Value::Object(object) => match titled_link(object) {
            Some(link) => vec![DisplayProperty::new(name, vec![link])],
            None => vec![DisplayProperty::new(name, vec![scalar_value(value)])],
        },
        _ => vec![DisplayProperty::new(name, vec![scalar_value(value)])],
    }
}

/// Valeur élémentaire ; les URL absolues deviennent des liens
fn scalar_value(value: &Value) -> PropertyValue {
    match value {
        Value::Bool(b) => PropertyValue::Bool(*b),
        Value::Number(n) => PropertyValue::Number(n.clone()),
        Value::String(s) if looks_like_url(s) => PropertyValue::link(s.trim(), s.trim()),
        Value::String(s) => PropertyValue::text(s.as_str()),
        Value::Object(object) => {
            titled_link(object).unwrap_or_else(|| PropertyValue::text(plain_text(value)))
        }
        other => PropertyValue::text(plain_text(other)),
    }
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Vrai pour une URL HTTP(S) absolue, sans espace
pub fn looks_like_url(s: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(URL_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s.trim()))
}

fn is_link_array(items: &[Value]) -> bool {
    !items.is_empty()
        && items.iter().all(|item| {
            item.as_object()
                .is_some_and(|o| convention::non_blank_str(o, "href").is_some())
        })
}

fn titled_link(object: &Map<String, Value>) -> Option<PropertyValue> {
    let href = convention::non_blank_str(object, LINK_HREF)?;
    let title = convention::non_blank_str(object, LINK_TITLE).unwrap_or(href);
    Some(PropertyValue::link(href, title))
}

/// Un lien `{href, label, type, authenticatedDownload}` donne une propriété
fn link_property(name: &str, link: &Map<String, Value>) -> DisplayProperty {
    let href = convention::non_blank_str(link, "href").unwrap_or_default();
    let label = convention::non_blank_str(link, "label").unwrap_or(href);
    let media_type = convention::non_blank_str(link, "type").unwrap_or_default();
    let authenticated = link
        .get("authenticatedDownload")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let kind = if authenticated {
        PropertyKind::AuthenticatedDownload(DownloadLink {
            href: href.to_string(),
            label: label.to_string(),
            filename: download_filename(href, label),
        })
    } else if media_type.to_ascii_lowercase().starts_with("image/") {
        PropertyKind::Image {
            href: href.to_string(),
        }
    } else {
        PropertyKind::Simple
    };

    DisplayProperty::with_kind(name, vec![PropertyValue::link(href, label)], kind)
}

/// Nom de fichier proposé : libellé s'il a une extension, sinon dernier segment de l'URL
fn download_filename(href: &str, label: &str) -> String {
    let label = label.trim();
    if !label.contains('/') && label.rsplit_once('.').is_some_and(|(stem, ext)| !stem.is_empty() && !ext.is_empty()) {
        return label.to_string();
    }

    url::Url::parse(href)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| "download".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convention::{DATA_KEYS, MAP_KEYS};
    use serde_json::json;

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_hinted_keys_in_declared_order() {
        let p = props(json!({
            "@epos_map_keys": ["z", "a", "missing", "nothing"],
            "a": 1, "z": "last", "other": true, "nothing": null
        }));
        let result = extract(&p, MAP_KEYS);
        let names: Vec<_> = result.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["z", "a"]);
    }

    #[test]
    fn test_fallback_skips_reserved_and_null() {
        let p = props(json!({
            "@epos_type": "episode",
            "@epos_map_keys": [],
            "name": "Station A",
            "elevation": 212.5,
            "active": true,
            "comment": null
        }));
        let result = extract(&p, MAP_KEYS);
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|d| !d.name().starts_with('@')));
    }

    #[test]
    fn test_hint_without_values_falls_back() {
        let p = props(json!({"@epos_data_keys": ["missing"], "name": "X"}));
        let result = extract(&p, DATA_KEYS);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name(), "name");
    }

    #[test]
    fn test_primitive_array() {
        let p = props(json!({"channels": ["HHZ", "HHN", null, 3]}));
        let result = extract(&p, MAP_KEYS);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].values().len(), 3);
        assert!(!result[0].is_single_valued());
    }

    #[test]
    fn test_link_array_expands() {
        let p = props(json!({"links": [
            {"href": "https://data.epos.eu/file.mseed", "label": "waveform.mseed", "authenticatedDownload": true},
            {"href": "https://data.epos.eu/quicklook.png", "label": "Quicklook", "type": "image/png"},
            {"href": "https://data.epos.eu/doc", "label": "Documentation"}
        ]}));
        let result = extract(&p, MAP_KEYS);
        assert_eq!(result.len(), 3);

        match result[0].kind() {
            PropertyKind::AuthenticatedDownload(link) => {
                assert_eq!(link.filename, "waveform.mseed");
                assert_eq!(link.href, "https://data.epos.eu/file.mseed");
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert!(matches!(result[1].kind(), PropertyKind::Image { .. }));
        assert_eq!(result[2].kind(), &PropertyKind::Simple);
    }

    #[test]
    fn test_download_filename_from_url() {
        assert_eq!(
            download_filename("https://x.org/path/data.csv?token=1", "Download"),
            "data.csv"
        );
        assert_eq!(download_filename("not a url", "Get it"), "download");
    }

    #[test]
    fn test_titled_link_collapses() {
        let p = props(json!({"doi": {"@title": "DOI", "@href": "https://doi.org/10.1/x"}}));
        let result = extract(&p, MAP_KEYS);
        assert_eq!(result.len(), 1);
        assert_eq!(
            result[0].values()[0],
            PropertyValue::link("https://doi.org/10.1/x", "DOI")
        );
    }

    #[test]
    fn test_url_auto_linkified() {
        let p = props(json!({"site": "https://www.epos-eu.org", "note": "see https://x.org"}));
        let result = extract(&p, MAP_KEYS);
        assert!(matches!(result[0].values()[0], PropertyValue::Link { .. }));
        assert!(matches!(result[1].values()[0], PropertyValue::Text(_)));
    }

    #[test]
    fn test_nested_object_as_json_text() {
        let p = props(json!({"meta": {"a": 1}}));
        let result = extract(&p, MAP_KEYS);
        assert_eq!(result[0].values()[0], PropertyValue::text(r#"{"a":1}"#));
    }

    #[test]
    fn test_label_for() {
        let p = props(json!({"@epos_label_key": "name", "name": "Station A"}));
        assert_eq!(label_for(&p).as_deref(), Some("Station A"));

        let p = props(json!({"@epos_label_key": "code", "code": 42}));
        assert_eq!(label_for(&p).as_deref(), Some("42"));

        let p = props(json!({"name": "Station A"}));
        assert_eq!(label_for(&p), None);
    }
}
