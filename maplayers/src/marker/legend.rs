//! Construction des légendes

use serde::Serialize;

use crate::marker::color::Rgb;
use crate::marker::icon::{MarkerFactory, RenderableMarker};
use crate::properties::html::escape_html;
use crate::style::visual::{Style, StyleHandle};
use crate::types::GeometryKind;

/// Libellé de l'entrée par défaut quand des styles typés existent
pub const OTHER_LABEL: &str = "Other";

/// Entrée de légende
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendItem {
    pub label: String,
    pub glyph: LegendGlyph,
}

/// Glyphe d'une entrée de légende
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LegendGlyph {
    Marker(RenderableMarker),
    Html { html: String },
    Image { href: String },
}

/// Légende d'une couche vectorielle
pub struct LegendSynthesizer<'a> {
    factory: MarkerFactory<'a>,
    untyped: Option<GeometryKind>,
    layer_name: &'a str,
    preview_size: u32,
}

impl<'a> LegendSynthesizer<'a> {
    pub fn new(
        factory: MarkerFactory<'a>,
        untyped: Option<GeometryKind>,
        layer_name: &'a str,
        preview_size: u32,
    ) -> Self {
        Self {
            factory,
            untyped,
            layer_name,
            preview_size,
        }
    }

    /// Une entrée par style (identifiants croissants), puis l'entrée par
    /// défaut des géométries non typées
    pub fn build(&self, style: &StyleHandle) -> Vec<LegendItem> {
        let mut items: Vec<LegendItem> = self
            .factory
            .table()
            .iter()
            .map(|(id, spec)| LegendItem {
                label: spec.label.clone(),
                glyph: LegendGlyph::Marker(self.factory.build(Some(id), style, true)),
            })
            .collect();

        if let Some(kind) = self.untyped {
            let label = if items.is_empty() {
                self.layer_name.to_string()
            } else {
                OTHER_LABEL.to_string()
            };
            items.push(LegendItem {
                label,
                glyph: LegendGlyph::Html {
                    html: default_geometry_glyph(kind, &style.snapshot(), self.preview_size),
                },
            });
        }

        items
    }
}

/// Aperçu de taille fixe d'une géométrie non typée
///
/// Cercle bordé pour un point, carré tourné pour un polygone, segment
/// tourné pour une ligne.
pub fn default_geometry_glyph(kind: GeometryKind, style: &Style, size: u32) -> String {
    let color1 = Rgb::parse_or(&style.color1, Rgb::BLACK);
    let color2 = Rgb::parse_or(&style.color2, Rgb::WHITE);
    match kind {
        GeometryKind::Point => {
            let diameter = size * 3 / 5;
            format!(
                r#"<div class="epos-legend-point" style="width:{diameter}px;height:{diameter}px;border-radius:50%;background-color:{};border:1px solid {};"></div>"#,
                color1.rgba(style.opacity1()),
                color2.to_hex()
            )
        }
        GeometryKind::Polygon => {
            let side = size * 3 / 5;
            format!(
                r#"<div class="epos-legend-polygon" style="width:{side}px;height:{side}px;transform:rotate(45deg);background-color:{};border:{}px solid {};"></div>"#,
                color2.rgba(style.opacity2()),
                legend_weight(style),
                color1.to_hex()
            )
        }
        GeometryKind::Line => format!(
            r#"<div class="epos-legend-line" style="width:{size}px;height:0;transform:rotate(-45deg);border-top:{}px solid {};"></div>"#,
            legend_weight(style),
            color1.rgba(style.opacity1())
        ),
    }
}

fn legend_weight(style: &Style) -> u32 {
    (style.weight.round() as u32).clamp(1, 4)
}

/// Entrée de légende textuelle colorée (dégradés de couverture)
pub fn swatch(label: impl Into<String>, color: Rgb) -> LegendItem {
    LegendItem {
        label: label.into(),
        glyph: LegendGlyph::Html {
            html: format!(
                r#"<div class="epos-legend-swatch" style="width:16px;height:16px;background-color:{};"></div>"#,
                escape_html(&color.to_hex())
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LayerSettings;
    use crate::style::resolver::{resolve, StyleTable};
    use serde_json::json;

    #[test]
    fn test_empty_legend() {
        let table = StyleTable::default();
        let settings = LayerSettings::default();
        let synth = LegendSynthesizer::new(MarkerFactory::new(&table, &settings), None, "Layer", 20);
        assert!(synth.build(&StyleHandle::default()).is_empty());
    }

    #[test]
    fn test_typed_entries_then_other() {
        let style = StyleHandle::default();
        let table = resolve(
            json!({
                "episode": {"marker": {"pin": false, "fontawesome_class": "fa fa-star"}},
                "station": {"label": "Stations", "marker": {"character": "S"}}
            })
            .as_object(),
            0,
            &style,
        )
        .table;
        let settings = LayerSettings::default();
        let synth = LegendSynthesizer::new(
            MarkerFactory::new(&table, &settings),
            Some(GeometryKind::Polygon),
            "Layer",
            20,
        );

        let items = synth.build(&style);
        let labels: Vec<_> = items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["episode", "Stations", OTHER_LABEL]);

        match &items[0].glyph {
            LegendGlyph::Marker(RenderableMarker::Icon(icon)) => assert_eq!(icon.size, [20, 20]),
            other => panic!("unexpected glyph {other:?}"),
        }
        match &items[2].glyph {
            LegendGlyph::Html { html } => assert!(html.contains("rotate(45deg)")),
            other => panic!("unexpected glyph {other:?}"),
        }
    }

    #[test]
    fn test_untyped_only_uses_layer_name() {
        let table = StyleTable::default();
        let settings = LayerSettings::default();
        let synth = LegendSynthesizer::new(
            MarkerFactory::new(&table, &settings),
            Some(GeometryKind::Point),
            "Seismic stations",
            20,
        );
        let items = synth.build(&StyleHandle::default());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label, "Seismic stations");
    }

    #[test]
    fn test_line_glyph() {
        let html = default_geometry_glyph(GeometryKind::Line, &Style::default(), 20);
        assert!(html.contains("rotate(-45deg)"));
        assert!(html.contains("border-top:2px"));
    }
}
