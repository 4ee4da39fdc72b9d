//! Définition et implémentation des commandes CLI
//!
//! - `render`: couches d'une distribution, rendues en JSON
//! - `legend`: légendes des couches
//! - `popup`: contenu de popup d'une feature
//! - `formats`: formats pris en charge

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use maplayers::{DataFormat, LayerRequest, ParameterValue};
use serde::Serialize;
use tracing::info;

use epos_layers::source::{load_input, parse_param};
use epos_layers::{Config, LegendReport, LoadedLayers, PopupReport, RenderReport};

#[derive(Subcommand)]
pub enum Commands {
    /// Build the layers of a distribution and print what is drawn on the map
    Render {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the legend of each layer
    Legend {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the popup of a feature (JSON, or HTML with --html)
    Popup {
        #[command(flatten)]
        source: SourceArgs,

        /// Feature property id (ex: "layer#0#")
        #[arg(long)]
        property_id: String,

        /// Print the popup HTML only
        #[arg(long)]
        html: bool,
    },

    /// List supported formats and their identifiers
    Formats,
}

#[derive(Args)]
pub struct SourceArgs {
    /// Distribution format (MIME type or alias: geojson, covjson, wms, wmts...)
    #[arg(short, long)]
    pub format: String,

    /// Payload file, or service URL for WMS/WMTS
    #[arg(short, long)]
    pub input: PathBuf,

    /// Layer id
    #[arg(long, default_value = "layer")]
    pub id: String,

    /// Layer name (defaults to the id)
    #[arg(long)]
    pub name: Option<String>,

    /// Parameter value, repeatable (name=value)
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<ParameterValue>,

    /// Indented JSON output
    #[arg(long)]
    pub pretty: bool,
}

impl SourceArgs {
    fn request(&self) -> LayerRequest {
        let name = self.name.clone().unwrap_or_else(|| self.id.clone());
        LayerRequest::new(&self.id, name).with_parameters(Vec::new(), self.params.clone())
    }

    async fn load(&self, config: &Config) -> Result<LoadedLayers> {
        load_input(config, &self.format, &self.input, self.request()).await
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

pub async fn cmd_render(config: &Config, source: &SourceArgs) -> Result<()> {
    let loaded = source.load(config).await?;
    let report = RenderReport::from_loaded(&loaded);
    info!(
        layers = report.layers.len(),
        rendered = report.rendered.len(),
        "Render terminé"
    );
    print_json(&report, source.pretty)
}

pub async fn cmd_legend(config: &Config, source: &SourceArgs) -> Result<()> {
    let loaded = source.load(config).await?;
    print_json(&LegendReport::collect(&loaded), source.pretty)
}

pub async fn cmd_popup(config: &Config, source: &SourceArgs, property_id: &str, html: bool) -> Result<()> {
    let loaded = source.load(config).await?;
    let popups = PopupReport::collect(&loaded, property_id);
    if popups.is_empty() {
        anyhow::bail!("No feature with property id: {}", property_id);
    }

    if html {
        for popup in &popups {
            println!("{}", popup.html);
        }
        Ok(())
    } else {
        print_json(&popups, source.pretty)
    }
}

pub fn cmd_formats() {
    for format in DataFormat::ALL {
        let table = if format.has_table_rows() { "table" } else { "-" };
        println!("{:<32} {:<6} {}", format.mime_type(), table, format.identifiers()[1..].join(", "));
    }
}
