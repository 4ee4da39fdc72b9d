//! Table de dispatch des formats de données
//!
//! Chaque format connu est associé à une fabrique de couches. Un identifiant
//! inconnu produit une liste vide au point d'entrée `create_map_layers` ;
//! `DataFormat::from_str` reste strict pour la validation de configuration.

pub mod composite;
pub mod formats;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::error::MapLayerError;
use crate::fetch::FetchFn;
use crate::layer::tiles::TileProtocol;
use crate::layer::{MapContext, MapLayer};
use crate::types::{ParameterDefinition, ParameterValue};

pub use self::composite::CompositeFactory;
pub use self::formats::{CoverageFactory, GeoJsonFactory, ImageOverlayFactory, TileFactory};

/// Format de distribution pris en charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DataFormat {
    GeoJson,
    EposGeoJson,
    EposMapGeoJson,
    CovJson,
    Wms,
    Wmts,
}

impl DataFormat {
    pub const ALL: [DataFormat; 6] = [
        DataFormat::GeoJson,
        DataFormat::EposGeoJson,
        DataFormat::EposMapGeoJson,
        DataFormat::CovJson,
        DataFormat::Wms,
        DataFormat::Wmts,
    ];

    /// Identifiants acceptés (MIME puis alias courts), le premier fait foi
    pub fn identifiers(self) -> &'static [&'static str] {
        match self {
            Self::GeoJson => &["application/geo+json", "application/json", "geojson"],
            Self::EposGeoJson => &["application/epos.geo+json", "epos.geojson"],
            Self::EposMapGeoJson => &["application/epos.map.geo+json", "epos.map.geojson"],
            Self::CovJson => &[
                "application/prs.coverage+json",
                "application/vnd.cov+json",
                "covjson",
            ],
            Self::Wms => &["application/vnd.ogc.wms_xml", "wms"],
            Self::Wmts => &["application/vnd.ogc.wmts_xml", "wmts"],
        }
    }

    pub fn mime_type(self) -> &'static str {
        self.identifiers()[0]
    }

    /// Le format alimente aussi la table de données
    pub fn has_table_rows(self) -> bool {
        matches!(self, Self::GeoJson | Self::EposGeoJson)
    }

    /// Fabrique associée au format
    pub fn factory(self) -> Box<dyn LayerFactory> {
        match self {
            Self::GeoJson | Self::EposGeoJson | Self::EposMapGeoJson => {
                Box::new(CompositeFactory::new(vec![
                    Box::new(GeoJsonFactory::new(self.has_table_rows())),
                    Box::new(ImageOverlayFactory),
                ]))
            }
            Self::CovJson => Box::new(CompositeFactory::new(vec![Box::new(CoverageFactory)])),
            Self::Wms => Box::new(TileFactory::new(TileProtocol::Wms)),
            Self::Wmts => Box::new(TileFactory::new(TileProtocol::Wmts)),
        }
    }
}

impl FromStr for DataFormat {
    type Err = MapLayerError;

    /// Insensible à la casse ; les paramètres MIME (`; charset=...`) sont ignorés
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.identifiers().contains(&id.as_str()))
            .ok_or_else(|| MapLayerError::UnknownFormat(s.trim().to_string()))
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Description de la couche demandée
#[derive(Debug, Clone, Default)]
pub struct LayerRequest {
    pub id: String,
    pub name: String,
    /// La couche reçoit un style de session modifiable par l'utilisateur
    pub stylable: bool,
    pub parameter_defs: Vec<ParameterDefinition>,
    pub parameter_values: Vec<ParameterValue>,
}

impl LayerRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stylable: true,
            ..Self::default()
        }
    }

    pub fn stylable(mut self, stylable: bool) -> Self {
        self.stylable = stylable;
        self
    }

    pub fn with_parameters(
        mut self,
        parameter_defs: Vec<ParameterDefinition>,
        parameter_values: Vec<ParameterValue>,
    ) -> Self {
        self.parameter_defs = parameter_defs;
        self.parameter_values = parameter_values;
        self
    }
}

/// Fabrique de couches d'un format
///
/// Les couches sont créées sans données : `fetch` n'est appelé qu'au
/// premier `MapLayer::add_to`.
pub trait LayerFactory: Send + Sync {
    fn name(&self) -> &'static str;

    fn create_map_layers(
        &self,
        ctx: &MapContext,
        request: &LayerRequest,
        fetch: FetchFn,
    ) -> Vec<Box<dyn MapLayer>>;
}

/// Point d'entrée : couches d'un identifiant de format
///
/// Un format inconnu ne produit aucune couche.
pub fn create_map_layers(
    format_id: &str,
    ctx: &MapContext,
    request: &LayerRequest,
    fetch: FetchFn,
) -> Vec<Box<dyn MapLayer>> {
    match format_id.parse::<DataFormat>() {
        Ok(format) => {
            let factory = format.factory();
            debug!(format = %format, factory = factory.name(), layer_id = %request.id, "Creating map layers");
            factory.create_map_layers(ctx, request, fetch)
        }
        Err(e) => {
            debug!(format = format_id, error = %e, "No layer factory for format");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::ready;
    use crate::types::LayerKind;

    #[test]
    fn test_parse_identifiers() {
        assert_eq!("application/geo+json".parse::<DataFormat>().unwrap(), DataFormat::GeoJson);
        assert_eq!(
            " Application/EPOS.Map.Geo+JSON ".parse::<DataFormat>().unwrap(),
            DataFormat::EposMapGeoJson
        );
        assert_eq!(
            "application/json; charset=utf-8".parse::<DataFormat>().unwrap(),
            DataFormat::GeoJson
        );
        assert_eq!("WMTS".parse::<DataFormat>().unwrap(), DataFormat::Wmts);
        assert!(matches!(
            "text/csv".parse::<DataFormat>(),
            Err(MapLayerError::UnknownFormat(id)) if id == "text/csv"
        ));
    }

    #[test]
    fn test_identifiers_are_unique() {
        let mut all: Vec<&str> = DataFormat::ALL.iter().flat_map(|f| f.identifiers()).copied().collect();
        let count = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), count);
    }

    #[test]
    fn test_dispatch() {
        let ctx = MapContext::default();
        let request = LayerRequest::new("l", "Layer");

        let kinds = |format: &str| -> Vec<LayerKind> {
            create_map_layers(format, &ctx, &request, ready("{}"))
                .iter()
                .map(|layer| layer.kind())
                .collect()
        };

        assert_eq!(kinds("geojson"), vec![LayerKind::Vector, LayerKind::ImageOverlay]);
        assert_eq!(kinds("covjson"), vec![LayerKind::Coverage]);
        assert_eq!(kinds("wms"), vec![LayerKind::Tiles]);
        assert!(kinds("application/xml").is_empty());
    }
}
