//! Configuration de la CLI

use std::path::Path;

use anyhow::{Context, Result};
use maplayers::{LayerSettings, ParameterDefinition};
use serde::{Deserialize, Serialize};

/// Variable d'environnement désignant la configuration (preset ou chemin)
pub const CONFIG_ENV: &str = "EPOS_LAYERS_CONFIG";

/// Presets embarqués
pub const PRESETS: [&str; 2] = ["default", "dense"];

/// Configuration principale
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Les couches reçoivent un style de session partagé
    #[serde(default = "default_stylable")]
    pub stylable: bool,

    /// Réglages d'affichage transmis à la bibliothèque
    #[serde(default)]
    pub layers: LayerSettings,

    /// Paramètres déclarés par défaut pour chaque distribution
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
}

fn default_stylable() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stylable: true,
            layers: LayerSettings::default(),
            parameters: Vec::new(),
        }
    }
}

impl Config {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "default" => Self::load_embedded(include_str!("presets/default.json")),
            "dense" => Self::load_embedded(include_str!("presets/dense.json")),
            _ => anyhow::bail!("Unknown preset: {}. Use: {}", preset, PRESETS.join(", ")),
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse embedded config")
    }

    /// Résout `--config` : nom de preset ou chemin, puis `EPOS_LAYERS_CONFIG`,
    /// puis le preset `default`
    pub fn resolve(spec: Option<&str>) -> Result<Self> {
        let spec = match spec {
            Some(spec) => spec.to_string(),
            None => std::env::var(CONFIG_ENV).unwrap_or_else(|_| "default".to_string()),
        };

        if PRESETS.contains(&spec.as_str()) {
            Self::from_preset(&spec)
        } else {
            Self::load(Path::new(&spec))
        }
    }
}
