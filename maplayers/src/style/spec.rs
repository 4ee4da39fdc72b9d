//! Lecture des entrées de `@epos_style`
//!
//! Format d'une entrée :
//!
//! ```json
//! { "label": "Episode",
//!   "marker": { "pin": false, "clustering": true, "anchor": "C",
//!               "fontawesome_class": "fa fa-star" } }
//! ```
//!
//! Le glyphe peut aussi être donné par `character` ou `href` (image).

use serde::Serialize;
use serde_json::{Map, Value};

use crate::convention::non_blank_str;

/// Glyphe utilisé quand le payload n'en déclare aucun
pub const DEFAULT_GLYPH: &str = "fas fa-circle";

/// Point d'ancrage d'un marqueur sur sa coordonnée
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Anchor {
    C,
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl Anchor {
    /// Ancrage par défaut : pointe de l'épingle, sinon centre
    pub fn default_for(pin: bool) -> Self {
        if pin {
            Self::S
        } else {
            Self::C
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "C" | "CENTER" => Some(Self::C),
            "N" => Some(Self::N),
            "S" => Some(Self::S),
            "E" => Some(Self::E),
            "W" => Some(Self::W),
            "NE" => Some(Self::NE),
            "NW" => Some(Self::NW),
            "SE" => Some(Self::SE),
            "SW" => Some(Self::SW),
            _ => None,
        }
    }

    /// Décalage (x, y) en pixels du point d'ancrage dans une icône `width` x `height`
    pub fn offset(self, width: u32, height: u32) -> [i32; 2] {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        match self {
            Self::C => [w / 2, h / 2],
            Self::N => [w / 2, 0],
            Self::S => [w / 2, h],
            Self::E => [w, h / 2],
            Self::W => [0, h / 2],
            Self::NE => [w, 0],
            Self::NW => [0, 0],
            Self::SE => [w, h],
            Self::SW => [0, h],
        }
    }
}

/// Nature du glyphe d'un marqueur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerKind {
    /// Classe d'icône de police (Font Awesome)
    FontGlyph,
    /// Caractère unique
    Character,
    /// Image (href)
    Image,
}

/// Description d'un marqueur déclarée par le payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerSpec {
    pub clustering: bool,
    pub pin: bool,
    pub anchor: Anchor,
    pub kind: MarkerKind,
    pub value: String,
}

impl Default for MarkerSpec {
    fn default() -> Self {
        Self {
            clustering: false,
            pin: true,
            anchor: Anchor::default_for(true),
            kind: MarkerKind::FontGlyph,
            value: DEFAULT_GLYPH.to_string(),
        }
    }
}

impl MarkerSpec {
    pub fn parse(object: &Map<String, Value>) -> Self {
        let pin = lenient_bool(object.get("pin")).unwrap_or(true);
        let clustering = lenient_bool(object.get("clustering")).unwrap_or(false);
        let anchor = object
            .get("anchor")
            .and_then(Value::as_str)
            .and_then(Anchor::parse)
            .unwrap_or_else(|| Anchor::default_for(pin));

        let (kind, value) = if let Some(class) = non_blank_str(object, "fontawesome_class") {
            (MarkerKind::FontGlyph, class.to_string())
        } else if let Some(character) = non_blank_str(object, "character") {
            (MarkerKind::Character, character.to_string())
        } else if let Some(href) = non_blank_str(object, "href") {
            (MarkerKind::Image, href.to_string())
        } else {
            (MarkerKind::FontGlyph, DEFAULT_GLYPH.to_string())
        };

        Self {
            clustering,
            pin,
            anchor,
            kind,
            value,
        }
    }
}

/// Style d'un type de feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleSpec {
    pub label: String,
    pub marker: Option<MarkerSpec>,
}

impl StyleSpec {
    /// Lit une entrée ; le libellé par défaut est le nom du type
    pub fn parse(type_key: &str, value: &Value) -> Self {
        let object = value.as_object();
        let label = object
            .and_then(|o| non_blank_str(o, "label"))
            .unwrap_or(type_key)
            .to_string();
        let marker = object
            .and_then(|o| o.get("marker"))
            .and_then(Value::as_object)
            .map(MarkerSpec::parse);

        Self { label, marker }
    }
}

/// Booléen JSON, ou chaîne "true"/"false"
fn lenient_bool(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_marker_defaults() {
        let spec = MarkerSpec::parse(json!({}).as_object().unwrap());
        assert_eq!(spec, MarkerSpec::default());
        assert_eq!(spec.anchor, Anchor::S);
    }

    #[test]
    fn test_unpinned_defaults_to_center() {
        let spec = MarkerSpec::parse(json!({"pin": false}).as_object().unwrap());
        assert!(!spec.pin);
        assert_eq!(spec.anchor, Anchor::C);
    }

    #[test]
    fn test_marker_kinds() {
        let glyph = MarkerSpec::parse(json!({"fontawesome_class": "fa fa-star"}).as_object().unwrap());
        assert_eq!(glyph.kind, MarkerKind::FontGlyph);
        assert_eq!(glyph.value, "fa fa-star");

        let character = MarkerSpec::parse(json!({"character": "A"}).as_object().unwrap());
        assert_eq!(character.kind, MarkerKind::Character);

        let image = MarkerSpec::parse(json!({"href": "https://x/icon.png", "anchor": "ne"}).as_object().unwrap());
        assert_eq!(image.kind, MarkerKind::Image);
        assert_eq!(image.anchor, Anchor::NE);
    }

    #[test]
    fn test_lenient_bool_strings() {
        let spec = MarkerSpec::parse(json!({"pin": "false", "clustering": "true"}).as_object().unwrap());
        assert!(!spec.pin);
        assert!(spec.clustering);
    }

    #[test]
    fn test_style_label_defaults_to_type() {
        let style = StyleSpec::parse("episode", &json!({"marker": {"pin": false}}));
        assert_eq!(style.label, "episode");
        assert!(style.marker.is_some());

        let style = StyleSpec::parse("episode", &json!({"label": "Episodes"}));
        assert_eq!(style.label, "Episodes");
        assert!(style.marker.is_none());
    }

    #[test]
    fn test_anchor_offsets() {
        assert_eq!(Anchor::S.offset(30, 30), [15, 30]);
        assert_eq!(Anchor::C.offset(30, 30), [15, 15]);
        assert_eq!(Anchor::NW.offset(30, 30), [0, 0]);
    }
}
