//! Instrumentation Pipeline
//!
//! analyze → index locations → remap to viewport → generate
//!
//! Every stage takes its input by reference and returns a fresh value.
//!
//! @module instrument

pub mod analyzer;
pub mod augmentation;
pub mod generator;
pub mod locations;

pub use analyzer::{analyze, Analysis};
pub use augmentation::{Augmentation, AugmentationMap};
pub use generator::{generate, Dialect, Generator};
pub use locations::{build_index, VariableLocation, VariableLocationMap};

use crate::core::error::Result;
use crate::semantic::SemanticModel;
use crate::syntax::SyntaxTree;
use crate::text::LinePositionSpan;
use crate::viewport::{remap_to_viewport, Viewport};

/// Knobs for one instrumentation request
#[derive(Debug, Clone)]
pub struct InstrumentOptions {
    /// Only statements overlapping these lines are instrumented
    pub regions: Option<Vec<LinePositionSpan>>,
    /// Restrict to a viewport and report positions relative to it
    pub viewport: Option<Viewport>,
    /// Print the variable location dump at program start
    pub emit_locations: bool,
}

impl Default for InstrumentOptions {
    fn default() -> Self {
        Self {
            regions: None,
            viewport: None,
            emit_locations: true,
        }
    }
}

impl InstrumentOptions {
    /// Explicit regions, or the viewport's inner span when only a viewport is set
    pub fn effective_regions(&self) -> Option<Vec<LinePositionSpan>> {
        match (&self.regions, &self.viewport) {
            (Some(regions), _) => Some(regions.clone()),
            (None, Some(viewport)) => Some(vec![viewport.inner_span]),
            (None, None) => None,
        }
    }
}

/// Output of [`instrument`]
#[derive(Debug, Clone)]
pub struct Instrumentation {
    pub augmentations: AugmentationMap,
    pub locations: VariableLocationMap,
    /// The rewritten program
    pub source: String,
}

/// Run the whole pipeline over an already-parsed document
pub fn instrument<M, D>(
    tree: &SyntaxTree,
    model: &M,
    dialect: &D,
    options: &InstrumentOptions,
) -> Result<Instrumentation>
where
    M: SemanticModel + ?Sized,
    D: Dialect + ?Sized,
{
    let regions = options.effective_regions();
    let analysis = analyze(tree, model, regions.as_deref())?;
    let locations = build_index(&analysis.visible_symbols, model);

    let (augmentations, locations) =
        remap_to_viewport(&analysis.augmentations, &locations, options.viewport.as_ref());

    let source = generate(tree, dialect, &augmentations, &locations, options.emit_locations)?;

    tracing::info!(
        file = %tree.file,
        augmentations = augmentations.len(),
        variables = locations.symbol_count(),
        viewport = ?options.viewport.as_ref().map(|v| v.id.as_str()),
        "Instrumented program"
    );

    Ok(Instrumentation {
        augmentations,
        locations,
        source,
    })
}
