//! Propriété affichable dans une popup ou une ligne de table

use std::fmt;

use serde::Serialize;

use crate::convention::PROPERTY_ID;
use crate::properties::html::escape_html;

/// Valeur élémentaire d'une propriété
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Link { href: String, label: String },
}

impl PropertyValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn link(href: impl Into<String>, label: impl Into<String>) -> Self {
        Self::Link {
            href: href.into(),
            label: label.into(),
        }
    }

    /// Rendu HTML (les liens deviennent des ancres)
    pub fn to_html(&self) -> String {
        match self {
            Self::Link { href, label } => format!(
                r#"<a href="{}" target="_blank" rel="noopener">{}</a>"#,
                escape_html(href),
                escape_html(label)
            ),
            other => escape_html(&other.to_string()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Link { label, .. } => f.write_str(label),
        }
    }
}

/// Lien de téléchargement authentifié, traité par l'application
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadLink {
    pub href: String,
    pub label: String,
    pub filename: String,
}

/// Nature d'une propriété
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PropertyKind {
    Simple,
    AuthenticatedDownload(DownloadLink),
    Image { href: String },
}

/// Propriété nommée, éventuellement multi-valuée
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayProperty {
    name: String,
    values: Vec<PropertyValue>,
    kind: PropertyKind,
    single_valued: bool,
    concatenated_search_text: String,
    is_identity: bool,
}

impl DisplayProperty {
    pub fn new(name: &str, values: Vec<PropertyValue>) -> Self {
        Self::with_kind(name, values, PropertyKind::Simple)
    }

    pub fn with_kind(name: &str, values: Vec<PropertyValue>, kind: PropertyKind) -> Self {
        let name = name.trim().to_string();
        let concatenated_search_text = search_text(&name, &values);
        Self {
            is_identity: name == PROPERTY_ID,
            single_valued: values.len() == 1,
            name,
            values,
            kind,
            concatenated_search_text,
        }
    }

    /// Propriété synthétique `propertyId`
    pub fn identity(property_id: &str) -> Self {
        Self::new(PROPERTY_ID, vec![PropertyValue::text(property_id)])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[PropertyValue] {
        &self.values
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    pub fn is_single_valued(&self) -> bool {
        self.single_valued
    }

    pub fn is_identity(&self) -> bool {
        self.is_identity
    }

    /// Texte en minuscules utilisé par la recherche de la table
    pub fn search_text(&self) -> &str {
        &self.concatenated_search_text
    }

    pub fn matches(&self, query: &str) -> bool {
        self.concatenated_search_text
            .contains(&query.trim().to_lowercase())
    }

    /// Valeurs jointes, forme texte
    pub fn display_value(&self) -> String {
        self.values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn search_text(name: &str, values: &[PropertyValue]) -> String {
    let mut text = name.to_lowercase();
    for value in values {
        text.push(' ');
        match value {
            PropertyValue::Link { href, label } => {
                text.push_str(&label.to_lowercase());
                if href != label {
                    text.push(' ');
                    text.push_str(&href.to_lowercase());
                }
            }
            other => text.push_str(&other.to_string().to_lowercase()),
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_valued_invariant() {
        let one = DisplayProperty::new("name", vec![PropertyValue::text("A")]);
        assert!(one.is_single_valued());

        let many = DisplayProperty::new(
            "channels",
            vec![PropertyValue::text("HHZ"), PropertyValue::text("HHN")],
        );
        assert!(!many.is_single_valued());

        let none = DisplayProperty::new("empty", Vec::new());
        assert!(!none.is_single_valued());
    }

    #[test]
    fn test_name_trimmed_and_identity() {
        let prop = DisplayProperty::new("  propertyId ", vec![PropertyValue::text("l#0#")]);
        assert_eq!(prop.name(), "propertyId");
        assert!(prop.is_identity());
        assert!(DisplayProperty::identity("l#1#").is_identity());
        assert!(!DisplayProperty::new("name", vec![]).is_identity());
    }

    #[test]
    fn test_search_text() {
        let prop = DisplayProperty::new(
            "Station",
            vec![
                PropertyValue::text("Grenoble"),
                PropertyValue::link("https://epos.eu/s/1", "Details"),
            ],
        );
        assert!(prop.matches("grenoble"));
        assert!(prop.matches("DETAILS"));
        assert!(prop.matches("epos.eu"));
        assert!(!prop.matches("paris"));
    }

    #[test]
    fn test_link_html_escaped() {
        let value = PropertyValue::link("https://x/?a=1&b=2", "<b>x</b>");
        let html = value.to_html();
        assert!(html.contains("a=1&amp;b=2"));
        assert!(html.contains("&lt;b&gt;x&lt;/b&gt;"));
    }
}
