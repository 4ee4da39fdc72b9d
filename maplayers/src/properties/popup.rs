//! Élément affichable d'une feature : données de popup et de table

use geojson::Feature;

use crate::properties::display::{DisplayProperty, DownloadLink, PropertyKind};
use crate::properties::html::escape_html;

/// Feature rendue, avec ses propriétés extraites
///
/// Immuable ; partagé en lecture (`Arc`) avec les renderers de popup et de table.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDisplayItem {
    property_id: String,
    feature: Feature,
    label: Option<String>,
    properties: Vec<DisplayProperty>,
}

impl FeatureDisplayItem {
    pub fn new(
        property_id: String,
        feature: Feature,
        label: Option<String>,
        mut properties: Vec<DisplayProperty>,
    ) -> Self {
        if !properties.iter().any(DisplayProperty::is_identity) {
            properties.push(DisplayProperty::identity(&property_id));
        }
        Self {
            property_id,
            feature,
            label,
            properties,
        }
    }

    pub fn property_id(&self) -> &str {
        &self.property_id
    }

    pub fn feature(&self) -> &Feature {
        &self.feature
    }

    /// Libellé de survol (`@epos_label_key`)
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn properties(&self) -> &[DisplayProperty] {
        &self.properties
    }

    /// Liens nécessitant un téléchargement authentifié
    pub fn authenticated_downloads(&self) -> Vec<&DownloadLink> {
        self.properties
            .iter()
            .filter_map(|p| match p.kind() {
                PropertyKind::AuthenticatedDownload(link) => Some(link),
                _ => None,
            })
            .collect()
    }

    /// Contenu HTML de la popup
    ///
    /// La propriété d'identité n'est pas affichée.
    pub fn popup_content(&self) -> String {
        let mut html = String::from(r#"<div class="epos-popup">"#);
        if let Some(label) = &self.label {
            html.push_str(&format!("<h4>{}</h4>", escape_html(label)));
        }
        html.push_str("<table>");
        for property in self.properties.iter().filter(|p| !p.is_identity()) {
            html.push_str(&format!(
                "<tr><th>{}</th><td>{}</td></tr>",
                escape_html(property.name()),
                render_value(property)
            ));
        }
        html.push_str("</table></div>");
        html
    }
}

fn render_value(property: &DisplayProperty) -> String {
    match property.kind() {
        PropertyKind::Image { href } => format!(
            r#"<img class="epos-popup-image" src="{}" alt="{}">"#,
            escape_html(href),
            escape_html(property.name())
        ),
        PropertyKind::AuthenticatedDownload(link) => format!(
            r#"<a class="epos-auth-download" data-href="{}" data-filename="{}">{}</a>"#,
            escape_html(&link.href),
            escape_html(&link.filename),
            escape_html(&link.label)
        ),
        PropertyKind::Simple => property
            .values()
            .iter()
            .map(|v| v.to_html())
            .collect::<Vec<_>>()
            .join("<br>"),
    }
}
