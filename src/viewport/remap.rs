//! Viewport Remapper
//!
//! @module viewport/remap

use super::Viewport;
use crate::instrument::{Augmentation, AugmentationMap, VariableLocation, VariableLocationMap};

/// Restrict augmentations and locations to `viewport`, in viewport-relative lines
///
/// Without a viewport both inputs come back unchanged.
pub fn remap_to_viewport(
    augmentations: &AugmentationMap,
    locations: &VariableLocationMap,
    viewport: Option<&Viewport>,
) -> (AugmentationMap, VariableLocationMap) {
    let Some(viewport) = viewport else {
        return (augmentations.clone(), locations.clone());
    };

    let remapped = augmentations.filter_map(|a| remap_augmentation(a, viewport));
    let remapped_locations = locations.filter_map(|l| remap_location(l, viewport));

    tracing::debug!(
        viewport = %viewport.id,
        kept = remapped.len(),
        dropped = augmentations.len() - remapped.len(),
        "Remapped to viewport"
    );

    (remapped, remapped_locations)
}

fn remap_augmentation(augmentation: &Augmentation, viewport: &Viewport) -> Option<Augmentation> {
    let line = augmentation.position.line;
    if !viewport.contains_line(line) {
        return None;
    }
    let mut remapped = augmentation.clone();
    remapped.position.line = viewport.relative_line(line);
    remapped.position.file = viewport.destination_file.clone();
    Some(remapped)
}

fn remap_location(location: &VariableLocation, viewport: &Viewport) -> Option<VariableLocation> {
    if !viewport.contains_line(location.start_line) || !viewport.contains_line(location.end_line) {
        return None;
    }
    Some(VariableLocation {
        start_line: viewport.relative_line(location.start_line),
        end_line: viewport.relative_line(location.end_line),
        ..location.clone()
    })
}
