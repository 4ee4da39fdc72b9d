//! Allocation des styles par défaut, propre à une session
//!
//! Une même couche retrouve toujours la même entrée de palette : l'index
//! est dérivé d'un hash blake3 de son identifiant.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use blake3::Hasher;

use crate::settings::{LayerSettings, PaletteEntry};
use crate::style::visual::{Style, StyleHandle};

/// Allocateur injecté par l'application
#[derive(Debug)]
pub struct StyleAllocator {
    palette: Vec<PaletteEntry>,
    by_layer: Mutex<HashMap<String, StyleHandle>>,
}

impl StyleAllocator {
    pub fn new(palette: Vec<PaletteEntry>) -> Self {
        Self {
            palette,
            by_layer: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &LayerSettings) -> Self {
        Self::new(settings.palette.clone())
    }

    /// Style de la couche, créé au premier appel puis réutilisé
    pub fn style_for_layer(&self, layer_id: &str) -> StyleHandle {
        let mut guard = self.by_layer.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .entry(layer_id.to_string())
            .or_insert_with(|| StyleHandle::new(self.default_style(layer_id)))
            .clone()
    }

    /// Oublie le style d'une couche (la prochaine demande repart du défaut)
    pub fn release(&self, layer_id: &str) -> bool {
        let mut guard = self.by_layer.lock().unwrap_or_else(PoisonError::into_inner);
        guard.remove(layer_id).is_some()
    }

    fn default_style(&self, layer_id: &str) -> Style {
        match self.palette_index(layer_id) {
            Some(index) => Style::from_palette(&self.palette[index]),
            None => Style::default(),
        }
    }

    fn palette_index(&self, layer_id: &str) -> Option<usize> {
        if self.palette.is_empty() {
            return None;
        }
        let mut hasher = Hasher::new();
        hasher.update(layer_id.as_bytes());
        let digest = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        Some((u64::from_le_bytes(head) % self.palette.len() as u64) as usize)
    }
}

impl Default for StyleAllocator {
    fn default() -> Self {
        Self::from_settings(&LayerSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_layer_same_handle() {
        let allocator = StyleAllocator::default();
        let a = allocator.style_for_layer("seismic-events");
        let b = allocator.style_for_layer("seismic-events");
        assert!(a.same_as(&b));
    }

    #[test]
    fn test_stable_across_allocators() {
        let first = StyleAllocator::default().style_for_layer("gnss-stations");
        let second = StyleAllocator::default().style_for_layer("gnss-stations");
        assert_eq!(first.snapshot().color1, second.snapshot().color1);
    }

    #[test]
    fn test_release_resets_style() {
        let allocator = StyleAllocator::default();
        let handle = allocator.style_for_layer("layer");
        handle.update(|s| s.color1 = "#000000".to_string());

        assert!(allocator.release("layer"));
        let fresh = allocator.style_for_layer("layer");
        assert_ne!(fresh.snapshot().color1, "#000000");
    }

    #[test]
    fn test_empty_palette_falls_back_to_default() {
        let allocator = StyleAllocator::new(Vec::new());
        assert_eq!(allocator.style_for_layer("x").snapshot(), Style::default());
    }
}
