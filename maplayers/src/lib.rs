//! # maplayers
//!
//! Synthèse de couches cartographiques stylées à partir des distributions
//! EPOS (GeoJSON annoté `@epos`, CovJSON, WMS, WMTS).
//!
//! ## Features
//!
//! - Dispatch par format vers des fabriques de couches
//! - Extraction des propriétés de popup et de table (`@epos_map_keys`, `@epos_data_keys`)
//! - Styles déclarés par type de feature (`@epos_style`) : marqueurs, clusters, légendes
//! - Images géoréférencées (`@epos_image_overlay`)
//! - Récupération paresseuse, une seule fois par couche
//!
//! ## Usage
//!
//! ```rust,ignore
//! use maplayers::{create_map_layers, fetch, LayerRequest, MapContext, RecordingSurface};
//!
//! let ctx = MapContext::default();
//! let request = LayerRequest::new("stations", "Seismic stations");
//! let layers = create_map_layers("application/epos.geo+json", &ctx, &request, fetch::ready(body));
//!
//! let surface = RecordingSurface::new();
//! for layer in &layers {
//!     layer.add_to(&surface).await;
//! }
//! let popup = layers[0]
//!     .feature_display_items("stations#0#")
//!     .map(|items| items[0].popup_content());
//! ```

pub mod convention;
pub mod error;
pub mod factory;
pub mod fetch;
pub mod layer;
pub mod marker;
pub mod properties;
pub mod settings;
pub mod style;
pub mod types;

pub use error::{FetchError, MapLayerError};
pub use factory::{create_map_layers, DataFormat, LayerFactory, LayerRequest};
pub use fetch::{FetchFn, LazyFetch};
pub use layer::{DownloadHandler, MapContext, MapLayer, MapSurface, RecordingSurface, RenderedLayer};
pub use marker::{LegendGlyph, LegendItem, RenderableMarker};
pub use properties::{DisplayProperty, FeatureDisplayItem};
pub use settings::{LayerSettings, PaletteEntry};
pub use style::{Style, StyleAllocator, StyleHandle};
pub use types::{LayerKind, LayerStatus, ParameterDefinition, ParameterValue};
