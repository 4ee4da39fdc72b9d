//! Marqueurs, clusters et légendes

pub mod cluster;
pub mod color;
pub mod icon;
pub mod legend;

pub use cluster::{ClusterOptions, ClusteringAdapter};
pub use color::Rgb;
pub use icon::{CircleMarker, DivIcon, MarkerFactory, PathStyle, RenderableMarker};
pub use legend::{LegendGlyph, LegendItem, LegendSynthesizer};
