//! Regroupement des marqueurs et icônes de cluster

use serde::Serialize;

use crate::marker::color::Rgb;
use crate::marker::icon::DivIcon;
use crate::settings::LayerSettings;
use crate::style::visual::Style;

/// Options transmises au widget de clustering
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOptions {
    /// Zoom à partir duquel les features redeviennent individuelles
    pub disable_clustering_at_zoom: u8,
    pub max_cluster_radius: u32,
    pub show_coverage_on_hover: bool,
}

/// Adaptateur de clustering d'une couche vectorielle
///
/// Capture les couleurs du style au moment de l'ajout : un changement de
/// style passe par un nouvel ajout de la couche.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringAdapter {
    options: ClusterOptions,
    #[serde(skip)]
    outer: String,
    #[serde(skip)]
    inner: String,
    #[serde(skip)]
    text: String,
}

impl ClusteringAdapter {
    /// Active le clustering si demandé, sinon `None`
    pub fn enable(cluster_on: bool, style: &Style, settings: &LayerSettings) -> Option<Self> {
        if !cluster_on {
            return None;
        }
        let color1 = Rgb::parse_or(&style.color1, Rgb::BLACK);
        let color2 = Rgb::parse_or(&style.color2, Rgb::WHITE);

        Some(Self {
            options: ClusterOptions {
                disable_clustering_at_zoom: settings.disable_clustering_at_zoom,
                max_cluster_radius: settings.max_cluster_radius,
                show_coverage_on_hover: false,
            },
            outer: color1.rgba(0.6),
            inner: color1.to_hex(),
            text: color2.to_hex(),
        })
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// Icône d'un cluster de `count` features : deux anneaux et le compte
    pub fn cluster_icon(&self, count: usize) -> DivIcon {
        let (size, class) = match count {
            0..=9 => (30u32, "small"),
            10..=99 => (40, "medium"),
            _ => (50, "large"),
        };
        let inner_size = size - 10;
        let html = format!(
            r#"<div class="epos-cluster-outer" style="width:{size}px;height:{size}px;border-radius:50%;background-color:{};display:flex;align-items:center;justify-content:center;"><div class="epos-cluster-inner" style="width:{inner_size}px;height:{inner_size}px;border-radius:50%;background-color:{};color:{};display:flex;align-items:center;justify-content:center;"><span>{count}</span></div></div>"#,
            self.outer, self.inner, self.text
        );
        let half = size as i32 / 2;
        DivIcon {
            html,
            class_name: format!("epos-cluster epos-cluster-{class}"),
            size: [size, size],
            anchor: [half, half],
            popup_anchor: [0, -half],
        }
    }
}
