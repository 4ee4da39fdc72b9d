//! Fabriques concrètes

use crate::factory::{LayerFactory, LayerRequest};
use crate::fetch::FetchFn;
use crate::layer::tiles::TileProtocol;
use crate::layer::{CoverageLayer, GeoJsonLayer, ImageOverlayLayer, MapContext, MapLayer, TileLayer};

/// Couche vectorielle GeoJSON
pub struct GeoJsonFactory {
    with_table: bool,
}

impl GeoJsonFactory {
    pub fn new(with_table: bool) -> Self {
        Self { with_table }
    }
}

impl LayerFactory for GeoJsonFactory {
    fn name(&self) -> &'static str {
        "geojson"
    }

    fn create_map_layers(
        &self,
        ctx: &MapContext,
        request: &LayerRequest,
        fetch: FetchFn,
    ) -> Vec<Box<dyn MapLayer>> {
        vec![Box::new(GeoJsonLayer::new(
            ctx.clone(),
            request.id.clone(),
            request.name.clone(),
            ctx.style_for(&request.id, request.stylable),
            fetch,
            self.with_table,
        ))]
    }
}

/// Images géoréférencées du même payload GeoJSON
pub struct ImageOverlayFactory;

impl LayerFactory for ImageOverlayFactory {
    fn name(&self) -> &'static str {
        "image-overlay"
    }

    fn create_map_layers(
        &self,
        ctx: &MapContext,
        request: &LayerRequest,
        fetch: FetchFn,
    ) -> Vec<Box<dyn MapLayer>> {
        vec![Box::new(ImageOverlayLayer::new(
            ctx.clone(),
            request.id.clone(),
            request.name.clone(),
            ctx.style_for(&request.id, request.stylable),
            fetch,
        ))]
    }
}

/// Couverture CovJSON
pub struct CoverageFactory;

impl LayerFactory for CoverageFactory {
    fn name(&self) -> &'static str {
        "covjson"
    }

    fn create_map_layers(
        &self,
        ctx: &MapContext,
        request: &LayerRequest,
        fetch: FetchFn,
    ) -> Vec<Box<dyn MapLayer>> {
        vec![Box::new(CoverageLayer::new(
            ctx.clone(),
            request.id.clone(),
            request.name.clone(),
            ctx.style_for(&request.id, request.stylable),
            fetch,
            &request.parameter_defs,
            &request.parameter_values,
        ))]
    }
}

/// Couche tuilée ; le payload récupéré est l'URL du service
pub struct TileFactory {
    protocol: TileProtocol,
}

impl TileFactory {
    pub fn new(protocol: TileProtocol) -> Self {
        Self { protocol }
    }
}

impl LayerFactory for TileFactory {
    fn name(&self) -> &'static str {
        match self.protocol {
            TileProtocol::Wms => "wms",
            TileProtocol::Wmts => "wmts",
        }
    }

    fn create_map_layers(
        &self,
        ctx: &MapContext,
        request: &LayerRequest,
        fetch: FetchFn,
    ) -> Vec<Box<dyn MapLayer>> {
        vec![Box::new(TileLayer::new(ctx, request, fetch, self.protocol))]
    }
}
