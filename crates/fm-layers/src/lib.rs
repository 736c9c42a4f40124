//! Layers-data preparation for flow maps.
//!
//! Turns locations, de-duplicated flows and a color scheme into packed
//! attribute buffers for two render layers: location circles and flow lines.
//! The transformation is pure and deterministic; every call allocates a fresh
//! [`LayersData`] snapshot.

pub mod attributes;
pub mod color;
pub mod error;
pub mod prepare;
pub mod scale;

pub use attributes::{Attribute, CircleAttributes, LayersData, LineAttributes};
pub use color::{ColorsRgba, DiffColorsRgba, FlowColorScale, FlowMapColors, Rgba};
pub use error::{LayersError, LayersResult};
pub use prepare::{LayersOptions, prepare_layers_data, prepare_layers_data_with};
pub use scale::PowScale;
