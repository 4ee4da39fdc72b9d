//! Propriétés affichables : extraction, modèle, popups

pub mod display;
pub mod extract;
pub mod html;
pub mod popup;

pub use display::{DisplayProperty, DownloadLink, PropertyKind, PropertyValue};
pub use extract::{extract, label_for};
pub use popup::FeatureDisplayItem;
