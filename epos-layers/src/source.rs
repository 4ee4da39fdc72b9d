//! Source d'une distribution : fichier local ou URL de service

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::Bytes;
use maplayers::fetch::{self, fetch_fn};
use maplayers::{
    create_map_layers, DataFormat, FetchError, FetchFn, LayerRequest, LayerStatus, MapContext, MapLayer,
    ParameterValue, RecordingSurface,
};
use tracing::{debug, info};

use crate::config::Config;

/// Récupération depuis un fichier ; la lecture n'a lieu qu'à l'ajout de la couche
pub fn file_fetch(path: PathBuf) -> FetchFn {
    fetch_fn(move || {
        let path = path.clone();
        async move {
            debug!(path = %path.display(), "Reading payload");
            tokio::fs::read(&path)
                .await
                .map(Bytes::from)
                .map_err(|e| FetchError::new(format!("{}: {e}", path.display())))
        }
    })
}

/// Les services WMS/WMTS peuvent être donnés directement par leur URL
pub fn source_fetch(input: &str) -> FetchFn {
    if input.starts_with("http://") || input.starts_with("https://") {
        fetch::ready(input.to_string())
    } else {
        file_fetch(PathBuf::from(input))
    }
}

/// Parse `nom=valeur`
pub fn parse_param(s: &str) -> Result<ParameterValue, String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected name=value, got: {s}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Empty parameter name in: {s}"));
    }
    Ok(ParameterValue::new(name, value.trim()))
}

/// Couches construites et ajoutées à une surface d'enregistrement
pub struct LoadedLayers {
    pub format: DataFormat,
    pub layers: Vec<Box<dyn MapLayer>>,
    pub surface: RecordingSurface,
}

impl LoadedLayers {
    /// Toutes les couches ont échoué
    pub fn all_failed(&self) -> bool {
        !self.layers.is_empty() && self.layers.iter().all(|l| l.status() == LayerStatus::Failed)
    }
}

/// Construit les couches d'une distribution et les ajoute à la surface
pub async fn load_layers(
    config: &Config,
    format_id: &str,
    request: LayerRequest,
    fetch: FetchFn,
) -> Result<LoadedLayers> {
    // Validation stricte côté CLI, la bibliothèque ignorerait le format
    let format: DataFormat = format_id
        .parse()
        .context(format!("Unsupported format: {format_id}"))?;

    let ctx = MapContext::new(config.layers.clone());
    let mut defs = config.parameters.clone();
    defs.extend(request.parameter_defs.iter().cloned());
    let request = LayerRequest {
        stylable: config.stylable && request.stylable,
        parameter_defs: defs,
        ..request
    };

    let layers = create_map_layers(format.mime_type(), &ctx, &request, fetch);
    let surface = RecordingSurface::new();
    for layer in &layers {
        layer.add_to(&surface).await;
    }

    info!(
        format = %format,
        layer_id = %request.id,
        layers = layers.len(),
        rendered = surface.layers().len(),
        "Layers loaded"
    );

    Ok(LoadedLayers {
        format,
        layers,
        surface,
    })
}

/// Raccourci : charge une distribution depuis `input`
pub async fn load_input(
    config: &Config,
    format_id: &str,
    input: &Path,
    request: LayerRequest,
) -> Result<LoadedLayers> {
    let fetch = source_fetch(&input.to_string_lossy());
    let loaded = load_layers(config, format_id, request, fetch).await?;
    if loaded.all_failed() {
        anyhow::bail!("Failed to load {} as {}", input.display(), loaded.format);
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        let value = parse_param("parameter = SST").unwrap();
        assert_eq!(value.name, "parameter");
        assert_eq!(value.value, "SST");

        let value = parse_param("styles=a=b").unwrap();
        assert_eq!(value.value, "a=b");

        assert!(parse_param("layers").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[tokio::test]
    async fn test_source_fetch_url_is_payload() {
        let body = source_fetch("https://maps.example.org/wms?layers=a")().await.unwrap();
        assert_eq!(&body[..], b"https://maps.example.org/wms?layers=a");
    }

    #[tokio::test]
    async fn test_missing_file_fetch_error() {
        let err = file_fetch(PathBuf::from("/nonexistent/payload.json"))().await.unwrap_err();
        assert!(err.to_string().contains("payload.json"));
    }

    #[tokio::test]
    async fn test_unknown_format_rejected() {
        let result = load_layers(
            &Config::default(),
            "text/csv",
            LayerRequest::new("csv", "CSV"),
            fetch::ready("a,b"),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_config_disables_styling() {
        let config = Config {
            stylable: false,
            ..Config::default()
        };
        let body = r#"{"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[0,0]}}"#;
        let loaded = load_layers(&config, "geojson", LayerRequest::new("a", "A"), fetch::ready(body))
            .await
            .unwrap();
        assert!(!loaded.all_failed());
        assert_eq!(loaded.layers.len(), 2);
        assert!(!loaded.layers[0].style().same_as(loaded.layers[1].style()));
    }
}
