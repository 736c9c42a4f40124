//! Packed attribute buffers handed to the render layers.

use serde::Serialize;

use crate::error::{LayersError, LayersResult};

/// One vertex-attribute channel: `size` values per entity, packed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute<T> {
    value: Box<[T]>,
    size: usize,
}

impl<T> Attribute<T> {
    /// Wrap a buffer, checking it holds exactly `count * size` values.
    pub(crate) fn packed(
        name: &'static str,
        value: Vec<T>,
        size: usize,
        count: usize,
    ) -> LayersResult<Self> {
        let expected = count * size;
        if value.len() != expected {
            return Err(LayersError::AttributeLength {
                name,
                expected,
                actual: value.len(),
            });
        }
        Ok(Self {
            value: value.into_boxed_slice(),
            size,
        })
    }

    pub fn value(&self) -> &[T] {
        &self.value
    }

    /// Values per entity.
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Buffers for the location-circles layer, in location order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircleAttributes {
    pub(crate) length: usize,
    pub(crate) position: Attribute<f32>,
    pub(crate) color: Attribute<u8>,
    pub(crate) radius: Attribute<f32>,
}

impl CircleAttributes {
    /// Number of circles.
    pub fn length(&self) -> usize {
        self.length
    }

    /// `[lon, lat]` per circle.
    pub fn position(&self) -> &Attribute<f32> {
        &self.position
    }

    /// RGBA per circle.
    pub fn color(&self) -> &Attribute<u8> {
        &self.color
    }

    pub fn radius(&self) -> &Attribute<f32> {
        &self.radius
    }
}

/// Buffers for the flow-lines layer, ascending by magnitude so the largest
/// flows are drawn last.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineAttributes {
    pub(crate) length: usize,
    pub(crate) source_position: Attribute<f32>,
    pub(crate) target_position: Attribute<f32>,
    pub(crate) thickness: Attribute<f32>,
    pub(crate) color: Attribute<u8>,
    pub(crate) endpoint_offsets: Attribute<f32>,
}

impl LineAttributes {
    /// Number of lines.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn source_position(&self) -> &Attribute<f32> {
        &self.source_position
    }

    pub fn target_position(&self) -> &Attribute<f32> {
        &self.target_position
    }

    pub fn thickness(&self) -> &Attribute<f32> {
        &self.thickness
    }

    pub fn color(&self) -> &Attribute<u8> {
        &self.color
    }

    /// `[origin radius, dest radius]` per line, so lines stop at circle edges.
    pub fn endpoint_offsets(&self) -> &Attribute<f32> {
        &self.endpoint_offsets
    }
}

/// Immutable snapshot of both layers. Rebuilt, never patched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayersData {
    pub(crate) circle_attributes: CircleAttributes,
    pub(crate) line_attributes: LineAttributes,
}

impl LayersData {
    pub fn circle_attributes(&self) -> &CircleAttributes {
        &self.circle_attributes
    }

    pub fn line_attributes(&self) -> &LineAttributes {
        &self.line_attributes
    }
}
