//! # epos-layers
//!
//! Construction et inspection des couches cartographiques EPOS depuis la
//! ligne de commande.
//!
//! ## Features
//!
//! - Rendu JSON des couches posées sur une carte d'enregistrement
//! - Légendes et popups d'une distribution
//! - Presets de réglages d'affichage (`default`, `dense`)
//!
//! ## Usage CLI
//!
//! ```bash
//! # Rendu d'un payload GeoJSON annoté
//! epos-layers render --format application/epos.geo+json --input ./stations.json
//!
//! # Popup d'une feature
//! epos-layers popup --format geojson --input ./stations.json --property-id 'layer#0#'
//!
//! # Couche WMS avec surcharge de paramètres
//! epos-layers render --format wms --input 'https://maps.example.org/wms?layers=a' --param styles=b
//! ```

pub mod config;
pub mod report;
pub mod source;

pub use config::Config;
pub use report::{LegendReport, PopupReport, RenderReport};
pub use source::{load_input, load_layers, LoadedLayers};
