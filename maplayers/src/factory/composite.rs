//! Fabrique composite : une récupération partagée par plusieurs fabriques

use std::sync::Arc;

use crate::factory::{LayerFactory, LayerRequest};
use crate::fetch::{FetchFn, LazyFetch};
use crate::layer::{MapContext, MapLayer};

/// Concatène les couches de ses sous-fabriques, dans l'ordre
///
/// La récupération est mémorisée une fois pour toutes les couches produites.
pub struct CompositeFactory {
    factories: Vec<Box<dyn LayerFactory>>,
}

impl CompositeFactory {
    pub fn new(factories: Vec<Box<dyn LayerFactory>>) -> Self {
        Self { factories }
    }
}

impl LayerFactory for CompositeFactory {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn create_map_layers(
        &self,
        ctx: &MapContext,
        request: &LayerRequest,
        fetch: FetchFn,
    ) -> Vec<Box<dyn MapLayer>> {
        let shared = Arc::new(LazyFetch::new(fetch));
        self.factories
            .iter()
            .flat_map(|factory| factory.create_map_layers(ctx, request, shared.as_fetch_fn()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{GeoJsonFactory, ImageOverlayFactory};
    use crate::fetch::fetch_fn;
    use crate::layer::RecordingSurface;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_single_fetch_for_all_layers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let fetch = fetch_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Ok(Bytes::from_static(
                br#"{"type":"FeatureCollection","features":[]}"#,
            )))
        });

        let composite = CompositeFactory::new(vec![
            Box::new(GeoJsonFactory::new(true)),
            Box::new(ImageOverlayFactory),
        ]);
        let layers = composite.create_map_layers(
            &MapContext::default(),
            &LayerRequest::new("l", "Layer"),
            fetch,
        );
        assert_eq!(layers.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let surface = RecordingSurface::new();
        for layer in &layers {
            layer.add_to(&surface).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
