//! Layers-data builder.

use fm_core::timing::Timer;
use fm_core::{FmError, LocationId, Real, ensure_finite, finite_or_zero, non_negative};
use fm_data::{FlowLocation, FlowRecord, LocationIndex, LocationTotals, calc_location_totals};
use rayon::prelude::*;

use crate::attributes::{Attribute, CircleAttributes, LayersData, LineAttributes};
use crate::color::{DEFAULT_COLOR_EXPONENT, FlowColorScale, FlowMapColors};
use crate::error::{LayersError, LayersResult};
use crate::scale::PowScale;

/// Visual ranges of the generated buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayersOptions {
    /// Radius of the location with the largest total.
    pub max_radius: Real,
    /// Thickness of the largest flow.
    pub max_thickness: Real,
    /// Exponent of the magnitude-to-color curve.
    pub color_exponent: Real,
}

impl Default for LayersOptions {
    fn default() -> Self {
        Self {
            max_radius: 15.0,
            max_thickness: 0.5,
            color_exponent: DEFAULT_COLOR_EXPONENT,
        }
    }
}

impl LayersOptions {
    /// Ranges must be finite and non-negative, the exponent positive.
    pub fn validate(&self) -> LayersResult<()> {
        let radius = ensure_finite(self.max_radius, "max_radius")?;
        let thickness = ensure_finite(self.max_thickness, "max_thickness")?;
        let exponent = ensure_finite(self.color_exponent, "color_exponent")?;
        if radius < 0.0 || thickness < 0.0 || exponent <= 0.0 {
            return Err(FmError::InvalidArg {
                what: format!("{self:?}"),
            }
            .into());
        }
        Ok(())
    }
}

/// Build circle and line buffers with the default visual ranges.
pub fn prepare_layers_data<L, F>(
    locations: &[L],
    flows: &[F],
    colors: &FlowMapColors,
) -> LayersResult<LayersData>
where
    L: FlowLocation,
    F: FlowRecord + Sync,
{
    prepare_layers_data_with(locations, flows, colors, &LayersOptions::default())
}

/// Build circle and line buffers.
///
/// `flows` must already be de-duplicated. Self-loops only size circles; every
/// other flow becomes one line, ordered by ascending magnitude (ties keep
/// input order). Fails if a flow endpoint has no location or a location has a
/// non-finite centroid.
pub fn prepare_layers_data_with<L, F>(
    locations: &[L],
    flows: &[F],
    colors: &FlowMapColors,
    options: &LayersOptions,
) -> LayersResult<LayersData>
where
    L: FlowLocation,
    F: FlowRecord + Sync,
{
    options.validate()?;
    let timer = Timer::start("prepare_layers_data");

    let totals = calc_location_totals(locations, flows);
    let index = totals.index();

    let mut lines: Vec<&F> = flows.iter().filter(|f| !f.is_internal()).collect();
    lines.par_sort_by(|a, b| {
        finite_or_zero(a.magnitude()).total_cmp(&finite_or_zero(b.magnitude()))
    });

    let max_total = totals.max_abs_totals().into_iter().fold(0.0, Real::max);
    let size_scale = PowScale::sqrt([0.0, max_total], [0.0, options.max_radius]);

    let magnitudes: Vec<Real> = lines.iter().map(|f| finite_or_zero(f.magnitude())).collect();
    let extent = extent(&magnitudes).unwrap_or((0.0, 0.0));
    // Unclamped: with all-negative diff data the domain is [0, max < 0] and
    // the largest (least negative) flow still maps to max_thickness.
    let thickness_scale = PowScale::linear([0.0, extent.1], [0.0, options.max_thickness]);
    let color_scale = FlowColorScale::new(colors, extent, options.color_exponent)?;

    let radius_of = |total: Real| non_negative(size_scale.apply(total));

    let circle_attributes = circles(locations, &totals, colors, &radius_of)?;

    let line_attrs: Vec<LineVertex> = lines
        .par_iter()
        .zip(magnitudes.par_iter())
        .map(|(flow, &magnitude)| {
            let source = centroid(index, *flow, flow.origin_id().as_str())?;
            let target = centroid(index, *flow, flow.dest_id().as_str())?;
            Ok(LineVertex {
                source,
                target,
                thickness: non_negative(thickness_scale.apply(magnitude)) as f32,
                color: color_scale.apply(magnitude).0,
                offsets: [
                    radius_of(totals.max_abs_total(flow.origin_id().as_str())) as f32,
                    radius_of(totals.max_abs_total(flow.dest_id().as_str())) as f32,
                ],
            })
        })
        .collect::<LayersResult<_>>()?;
    let line_attributes = pack_lines(&line_attrs)?;

    tracing::debug!(
        circles = circle_attributes.length,
        lines = line_attributes.length,
        internal = flows.len() - lines.len(),
        "layers data prepared"
    );
    timer.stop_and_log();

    Ok(LayersData {
        circle_attributes,
        line_attributes,
    })
}

fn circles<L: FlowLocation>(
    locations: &[L],
    totals: &LocationTotals,
    colors: &FlowMapColors,
    radius_of: impl Fn(Real) -> Real,
) -> LayersResult<CircleAttributes> {
    let n = locations.len();
    let color = colors.circle_color().0;

    let mut position = Vec::with_capacity(n * 2);
    let mut colors_buf = Vec::with_capacity(n * 4);
    let mut radius = Vec::with_capacity(n);
    for loc in locations {
        position.extend(finite_centroid(loc.id(), loc.centroid())?);
        colors_buf.extend_from_slice(&color);
        radius.push(radius_of(totals.max_abs_total(loc.id().as_str())) as f32);
    }

    Ok(CircleAttributes {
        length: n,
        position: Attribute::packed("circle position", position, 2, n)?,
        color: Attribute::packed("circle color", colors_buf, 4, n)?,
        radius: Attribute::packed("circle radius", radius, 1, n)?,
    })
}

struct LineVertex {
    source: [f32; 2],
    target: [f32; 2],
    thickness: f32,
    color: [u8; 4],
    offsets: [f32; 2],
}

fn pack_lines(vertices: &[LineVertex]) -> LayersResult<LineAttributes> {
    let n = vertices.len();
    let mut source = Vec::with_capacity(n * 2);
    let mut target = Vec::with_capacity(n * 2);
    let mut thickness = Vec::with_capacity(n);
    let mut color = Vec::with_capacity(n * 4);
    let mut offsets = Vec::with_capacity(n * 2);
    for v in vertices {
        source.extend_from_slice(&v.source);
        target.extend_from_slice(&v.target);
        thickness.push(v.thickness);
        color.extend_from_slice(&v.color);
        offsets.extend_from_slice(&v.offsets);
    }

    Ok(LineAttributes {
        length: n,
        source_position: Attribute::packed("line source position", source, 2, n)?,
        target_position: Attribute::packed("line target position", target, 2, n)?,
        thickness: Attribute::packed("line thickness", thickness, 1, n)?,
        color: Attribute::packed("line color", color, 4, n)?,
        endpoint_offsets: Attribute::packed("line endpoint offsets", offsets, 2, n)?,
    })
}

fn centroid<F: FlowRecord>(index: &LocationIndex, flow: &F, id: &str) -> LayersResult<[f32; 2]> {
    match index.get(id) {
        Some(idx) => finite_centroid(index.id(idx), index.centroid(idx)),
        None => Err(LayersError::MissingCentroid {
            origin: flow.origin_id().clone(),
            dest: flow.dest_id().clone(),
            missing: id.into(),
        }),
    }
}

fn finite_centroid(id: &LocationId, c: [Real; 2]) -> LayersResult<[f32; 2]> {
    let out = [c[0] as f32, c[1] as f32];
    if out.iter().all(|v| v.is_finite()) {
        Ok(out)
    } else {
        Err(LayersError::NonFiniteCentroid { id: id.clone() })
    }
}

fn extent(values: &[Real]) -> Option<(Real, Real)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}
