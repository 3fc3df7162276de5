//! Tintcut Effects - visual adjustments for stills and video
//!
//! Two interchangeable renderings of the same [`AdjustmentParameters`]:
//! a per-pixel transform for CPU frame buffers, and a declarative
//! [`FilterGraph`] consumed by filter-based surfaces and the encoder.

pub mod adjustments;
pub mod filter_graph;
pub mod pixel;

pub use adjustments::{AdjustmentField, AdjustmentParameters, AdjustmentState, FieldDescriptor};
pub use filter_graph::{FilterGraph, FilterStage};
pub use pixel::PixelAdjustments;

use tintcut_core::FrameBuffer;

/// What a surface draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Raw RGBA buffer written by the render loop.
    PixelCanvas,
    /// Element styled with a CSS-like filter value.
    FilteredSurface,
    /// Export through the external encoder.
    Encoder,
}

/// Output of an [`AdjustmentStrategy`].
#[derive(Debug, Clone, PartialEq)]
pub enum Renderable {
    /// Transformed pixels, ready to blit.
    Pixels(FrameBuffer),
    /// Untouched source plus the graph to apply while drawing.
    Filtered {
        source: FrameBuffer,
        graph: FilterGraph,
    },
}

impl Renderable {
    pub fn frame(&self) -> &FrameBuffer {
        match self {
            Self::Pixels(frame) => frame,
            Self::Filtered { source, .. } => source,
        }
    }

    pub fn into_frame(self) -> FrameBuffer {
        match self {
            Self::Pixels(frame) => frame,
            Self::Filtered { source, .. } => source,
        }
    }
}

/// Applies adjustments to a source frame.
pub trait AdjustmentStrategy: Send + Sync {
    /// Get the strategy name.
    fn name(&self) -> &str;

    /// Produce something the target surface can draw.
    fn apply(&self, source: &FrameBuffer, params: &AdjustmentParameters) -> Renderable;
}

/// Per-pixel scale, brightness, composite and greyscale.
#[derive(Debug, Default, Clone, Copy)]
pub struct PixelStrategy;

impl AdjustmentStrategy for PixelStrategy {
    fn name(&self) -> &str {
        "pixel"
    }

    fn apply(&self, source: &FrameBuffer, params: &AdjustmentParameters) -> Renderable {
        let mut frame = source.clone();
        pixel::transform(&mut frame, &PixelAdjustments::new(params));
        Renderable::Pixels(frame)
    }
}

/// Declarative stages; the surface or encoder does the pixel work.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilterGraphStrategy;

impl AdjustmentStrategy for FilterGraphStrategy {
    fn name(&self) -> &str {
        "filter-graph"
    }

    fn apply(&self, source: &FrameBuffer, params: &AdjustmentParameters) -> Renderable {
        Renderable::Filtered {
            source: source.clone(),
            graph: FilterGraph::from_params(params),
        }
    }
}

/// Pick the strategy a surface needs.
pub fn strategy_for(surface: SurfaceKind) -> &'static dyn AdjustmentStrategy {
    static PIXEL: PixelStrategy = PixelStrategy;
    static FILTER: FilterGraphStrategy = FilterGraphStrategy;
    match surface {
        SurfaceKind::PixelCanvas => &PIXEL,
        SurfaceKind::FilteredSurface | SurfaceKind::Encoder => &FILTER,
    }
}
