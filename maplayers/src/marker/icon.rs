//! Fabrique de marqueurs et de glyphes de légende
//!
//! Un style résolu (épingle ou glyphe libre ; police, caractère ou image)
//! combiné au style utilisateur donne un marqueur rendu sous forme d'icône
//! HTML. Sans marqueur déclaré, repli sur un simple cercle.

use serde::Serialize;

use crate::marker::color::Rgb;
use crate::properties::html::escape_html;
use crate::settings::LayerSettings;
use crate::style::resolver::StyleTable;
use crate::style::spec::{Anchor, MarkerKind, MarkerSpec, DEFAULT_GLYPH};
use crate::style::visual::{Style, StyleHandle};
use crate::types::StyleId;

/// Rayon du cercle de repli (pixels)
pub const CIRCLE_RADIUS: f64 = 8.0;

/// Silhouette d'épingle, viewBox 0 0 24 32
const PIN_PATH: &str = "M12 0C5.4 0 0 5.4 0 12c0 9 12 20 12 20s12-11 12-20C24 5.4 18.6 0 12 0z";

/// Marqueur prêt à être posé par le widget cartographique
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RenderableMarker {
    Circle(CircleMarker),
    Icon(DivIcon),
}

/// Cercle de repli, non configurable hors couleurs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleMarker {
    pub radius: f64,
    pub weight: f64,
    pub color: String,
    pub fill_color: String,
    pub opacity: f64,
    pub fill_opacity: f64,
}

impl CircleMarker {
    pub fn from_style(style: &Style) -> Self {
        Self {
            radius: CIRCLE_RADIUS,
            weight: 1.0,
            color: style.color2.clone(),
            fill_color: style.color1.clone(),
            opacity: style.opacity1(),
            fill_opacity: style.opacity1(),
        }
    }
}

/// Icône HTML ancrée
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DivIcon {
    pub html: String,
    pub class_name: String,
    pub size: [u32; 2],
    pub anchor: [i32; 2],
    pub popup_anchor: [i32; 2],
}

/// Style de trait des lignes et polygones
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStyle {
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
    pub fill_color: String,
    pub fill_opacity: f64,
}

impl PathStyle {
    pub fn from_style(style: &Style) -> Self {
        Self {
            color: style.color1.clone(),
            weight: if style.weight > 0.0 { style.weight } else { 1.0 },
            opacity: style.opacity1(),
            fill_color: style.color2.clone(),
            fill_opacity: style.opacity2(),
        }
    }
}

/// Fabrique liée à la table de styles d'une couche
#[derive(Debug, Clone, Copy)]
pub struct MarkerFactory<'a> {
    table: &'a StyleTable,
    settings: &'a LayerSettings,
}

impl<'a> MarkerFactory<'a> {
    pub fn new(table: &'a StyleTable, settings: &'a LayerSettings) -> Self {
        Self { table, settings }
    }

    pub fn table(&self) -> &'a StyleTable {
        self.table
    }

    /// Construit le marqueur du style `style_id`
    ///
    /// En mode légende, la taille est fixe quelle que soit celle choisie
    /// pour la carte.
    pub fn build(
        &self,
        style_id: Option<StyleId>,
        style: &StyleHandle,
        legend_mode: bool,
    ) -> RenderableMarker {
        let Some(spec) = style_id.and_then(|id| self.table.marker(id)) else {
            return RenderableMarker::Circle(CircleMarker::from_style(&style.snapshot()));
        };

        style.remember_origin_marker_value(&spec.value);
        let current = style.snapshot();

        let value = current
            .marker_value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(if spec.value.trim().is_empty() {
                DEFAULT_GLYPH
            } else {
                spec.value.as_str()
            });

        let size = if legend_mode {
            self.settings.legend_size()
        } else {
            self.settings.marker_size(current.marker_size)
        };

        RenderableMarker::Icon(icon(spec, value, size, &current))
    }
}

/// Icône d'un marqueur déclaré
fn icon(spec: &MarkerSpec, value: &str, size: u32, style: &Style) -> DivIcon {
    let color1 = Rgb::parse_or(&style.color1, Rgb::BLACK).to_hex();
    let color2 = Rgb::parse_or(&style.color2, Rgb::WHITE).to_hex();

    let (html, class_name) = if spec.pin {
        let inner_size = size * 2 / 5;
        let inner = match spec.kind {
            MarkerKind::FontGlyph => format!(
                r#"<i class="{}" style="color:{color2};font-size:{inner_size}px;"></i>"#,
                escape_html(value)
            ),
            MarkerKind::Character => format!(
                r#"<span style="color:{color2};font-size:{inner_size}px;font-weight:bold;">{}</span>"#,
                escape_html(first_char(value))
            ),
            MarkerKind::Image => format!(
                r#"<img src="{}" style="width:{inner_size}px;height:{inner_size}px;">"#,
                escape_html(value)
            ),
        };
        let html = format!(
            r#"<div class="epos-pin" style="position:relative;width:{size}px;height:{size}px;"><svg viewBox="0 0 24 32" width="{size}" height="{size}"><path d="{PIN_PATH}" fill="{color1}" fill-opacity="{}" stroke="{color2}" stroke-width="1"/></svg><div class="epos-pin-content" style="position:absolute;top:20%;left:0;width:100%;text-align:center;">{inner}</div></div>"#,
            style.opacity1()
        );
        (html, "epos-marker epos-marker-pin")
    } else {
        let html = match spec.kind {
            MarkerKind::FontGlyph => format!(
                r#"<i class="{}" style="color:{color1};opacity:{};font-size:{size}px;"></i>"#,
                escape_html(value),
                style.opacity1()
            ),
            MarkerKind::Character => format!(
                r#"<span style="color:{color1};opacity:{};font-size:{size}px;font-weight:bold;">{}</span>"#,
                style.opacity1(),
                escape_html(first_char(value))
            ),
            MarkerKind::Image => format!(
                r#"<img src="{}" style="width:{size}px;height:{size}px;opacity:{};">"#,
                escape_html(value),
                style.opacity1()
            ),
        };
        (html, "epos-marker epos-marker-free")
    };

    let anchor = spec.anchor.offset(size, size);
    DivIcon {
        html,
        class_name: class_name.to_string(),
        size: [size, size],
        anchor,
        popup_anchor: popup_anchor(spec.anchor, anchor, size),
    }
}

/// Popup ouverte au-dessus de l'icône, relativement au point d'ancrage
fn popup_anchor(anchor: Anchor, offset: [i32; 2], size: u32) -> [i32; 2] {
    let half = size as i32 / 2;
    match anchor {
        Anchor::N | Anchor::NE | Anchor::NW => [half - offset[0], 0],
        _ => [half - offset[0], -offset[1]],
    }
}

fn first_char(value: &str) -> &str {
    value
        .char_indices()
        .nth(1)
        .map_or(value, |(end, _)| &value[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MAX_MARKER_SIZE;
    use crate::style::resolver::resolve;
    use serde_json::json;

    fn table(payload: serde_json::Value) -> StyleTable {
        resolve(payload.as_object(), 0, &StyleHandle::default()).table
    }

    #[test]
    fn test_circle_fallback_without_style() {
        let table = StyleTable::default();
        let settings = LayerSettings::default();
        let factory = MarkerFactory::new(&table, &settings);

        match factory.build(None, &StyleHandle::default(), false) {
            RenderableMarker::Circle(circle) => {
                assert_eq!(circle.radius, CIRCLE_RADIUS);
                assert_eq!(circle.weight, 1.0);
            }
            other => panic!("expected circle, got {other:?}"),
        }
    }

    #[test]
    fn test_circle_fallback_for_style_without_marker() {
        let table = table(json!({"station": {"label": "Stations"}}));
        let settings = LayerSettings::default();
        let factory = MarkerFactory::new(&table, &settings);
        assert!(matches!(
            factory.build(Some(0), &StyleHandle::default(), false),
            RenderableMarker::Circle(_)
        ));
    }

    #[test]
    fn test_pinned_glyph_icon() {
        let table = table(json!({"a": {"marker": {"fontawesome_class": "fa fa-star"}}}));
        let settings = LayerSettings::default();
        let style = StyleHandle::new(Style {
            color1: "#ff0000".to_string(),
            color2: "#00ff00".to_string(),
            ..Style::default()
        });

        let RenderableMarker::Icon(icon) = MarkerFactory::new(&table, &settings).build(Some(0), &style, false) else {
            panic!("expected icon");
        };
        assert!(icon.html.contains("epos-pin"));
        assert!(icon.html.contains(r##"fill="#ff0000""##));
        assert!(icon.html.contains(r#"class="fa fa-star" style="color:#00ff00"#));
        assert_eq!(icon.size, [30, 30]);
        assert_eq!(icon.anchor, [15, 30]);
        assert_eq!(style.snapshot().origin_marker_value.as_deref(), Some("fa fa-star"));
    }

    #[test]
    fn test_user_override_and_legend_size() {
        let table = table(json!({"a": {"marker": {"pin": false, "fontawesome_class": "fa fa-star"}}}));
        let settings = LayerSettings::default();
        let style = StyleHandle::new(Style {
            marker_value: Some("fa fa-bolt".to_string()),
            marker_size: Some(48),
            ..Style::default()
        });
        let factory = MarkerFactory::new(&table, &settings);

        let RenderableMarker::Icon(on_map) = factory.build(Some(0), &style, false) else {
            panic!("expected icon");
        };
        assert!(on_map.html.contains("fa fa-bolt"));
        assert!(!on_map.html.contains("epos-pin"));
        assert_eq!(on_map.size, [48, 48]);
        assert_eq!(on_map.anchor, [24, 24]);

        let RenderableMarker::Icon(legend) = factory.build(Some(0), &style, true) else {
            panic!("expected icon");
        };
        assert_eq!(legend.size, [20, 20]);
        // Le glyphe d'origine reste celui du payload
        assert_eq!(style.snapshot().origin_marker_value.as_deref(), Some("fa fa-star"));
    }

    #[test]
    fn test_reset_marker_value_restores_origin() {
        let table = table(json!({"a": {"marker": {"pin": false, "fontawesome_class": "fa fa-star"}}}));
        let settings = LayerSettings::default();
        let style = StyleHandle::default();
        let factory = MarkerFactory::new(&table, &settings);
        factory.build(Some(0), &style, false);

        style.update(|s| s.marker_value = Some("fa fa-bolt".to_string()));
        let RenderableMarker::Icon(overridden) = factory.build(Some(0), &style, false) else {
            panic!("expected icon");
        };
        assert!(overridden.html.contains("fa fa-bolt"));

        style.reset_marker_value();
        let current = style.snapshot();
        assert!(current.marker_value.is_none());
        let RenderableMarker::Icon(restored) = factory.build(Some(0), &style, false) else {
            panic!("expected icon");
        };
        assert!(restored.html.contains(current.origin_marker_value.as_deref().unwrap()));
        assert!(!restored.html.contains("fa fa-bolt"));
    }

    #[test]
    fn test_absurd_marker_size_clamped() {
        let table = table(json!({"a": {"marker": {"fontawesome_class": "fa fa-star"}}}));
        let settings = LayerSettings::default();
        let style = StyleHandle::new(Style {
            marker_size: Some(u32::MAX),
            ..Style::default()
        });

        let RenderableMarker::Icon(icon) = MarkerFactory::new(&table, &settings).build(Some(0), &style, false) else {
            panic!("expected icon");
        };
        assert_eq!(icon.size, [MAX_MARKER_SIZE, MAX_MARKER_SIZE]);
        assert_eq!(icon.anchor, [256, 512]);
    }

    #[test]
    fn test_character_and_image_kinds() {
        let table = table(json!({
            "c": {"marker": {"character": "Quake"}},
            "i": {"marker": {"pin": false, "href": "https://x/icon.png"}}
        }));
        let settings = LayerSettings::default();
        let factory = MarkerFactory::new(&table, &settings);
        let style = StyleHandle::default();

        let RenderableMarker::Icon(character) = factory.build(Some(0), &style, false) else {
            panic!("expected icon");
        };
        assert!(character.html.contains(">Q</span>"));

        let RenderableMarker::Icon(image) = factory.build(Some(1), &style, false) else {
            panic!("expected icon");
        };
        assert!(image.html.contains(r#"<img src="https://x/icon.png""#));
    }

    #[test]
    fn test_path_style() {
        let path = PathStyle::from_style(&Style {
            weight: 0.0,
            ..Style::default()
        });
        assert_eq!(path.weight, 1.0);
    }
}
