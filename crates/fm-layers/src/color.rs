//! Color schemes and the flow color scale.

use fm_core::Real;
use serde::{Deserialize, Serialize};

use crate::error::{LayersError, LayersResult};
use crate::scale::PowScale;

/// 8-bit RGBA, the layout of one color in the packed color buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if !matches!(digits.len(), 6 | 8) || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        let alpha = if digits.len() == 8 { channel(6)? } else { 255 };
        Some(Self([channel(0)?, channel(2)?, channel(4)?, alpha]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowColors {
    /// Sequential palette, low to high magnitude.
    pub scheme: Vec<Rgba>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationCircleColors {
    pub inner: Rgba,
    pub outgoing: Rgba,
    pub incoming: Rgba,
}

/// Palette for non-comparison maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorsRgba {
    pub flows: FlowColors,
    pub location_circles: LocationCircleColors,
}

/// Paired palettes for maps of signed differences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffColorsRgba {
    pub positive: ColorsRgba,
    pub negative: ColorsRgba,
}

/// The active color configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlowMapColors {
    Diff(DiffColorsRgba),
    Single(ColorsRgba),
}

impl FlowMapColors {
    pub fn is_diff(&self) -> bool {
        matches!(self, FlowMapColors::Diff(_))
    }

    /// Color used for every location circle.
    pub fn circle_color(&self) -> Rgba {
        match self {
            FlowMapColors::Single(c) => c.location_circles.incoming,
            FlowMapColors::Diff(d) => d.positive.location_circles.incoming,
        }
    }

    pub fn default_diff() -> Self {
        FlowMapColors::Diff(DiffColorsRgba {
            positive: ColorsRgba {
                flows: FlowColors {
                    scheme: hex_palette(&["#fee8c8", "#fdbb84", "#f6654e", "#d7301f", "#990000"]),
                },
                location_circles: LocationCircleColors {
                    inner: Rgba::rgb(0xf6, 0x65, 0x4e),
                    outgoing: Rgba::rgb(0xff, 0xff, 0xff),
                    incoming: Rgba::rgb(0xf6, 0x65, 0x4e),
                },
            },
            negative: ColorsRgba {
                flows: FlowColors {
                    scheme: hex_palette(&["#d0f0f7", "#7fd4e8", "#00a9cc", "#0078a8", "#004c6d"]),
                },
                location_circles: LocationCircleColors {
                    inner: Rgba::rgb(0x00, 0xa9, 0xcc),
                    outgoing: Rgba::rgb(0xff, 0xff, 0xff),
                    incoming: Rgba::rgb(0x00, 0xa9, 0xcc),
                },
            },
        })
    }
}

impl Default for FlowMapColors {
    fn default() -> Self {
        FlowMapColors::Single(ColorsRgba {
            flows: FlowColors {
                scheme: hex_palette(&[
                    "#f7feae", "#b7e6a5", "#7ccba2", "#46aea0", "#089099", "#00718b", "#045275",
                ]),
            },
            location_circles: LocationCircleColors {
                inner: Rgba::rgb(0x13, 0x7c, 0xbd),
                outgoing: Rgba::rgb(0xff, 0xff, 0xff),
                incoming: Rgba::rgb(0x13, 0x7c, 0xbd),
            },
        })
    }
}

fn hex_palette(hex: &[&str]) -> Vec<Rgba> {
    hex.iter().filter_map(|h| Rgba::from_hex(h)).collect()
}

/// Exponent of the magnitude-to-palette-position curve.
pub const DEFAULT_COLOR_EXPONENT: Real = 1.0 / 3.0;

/// One palette plus the curve that maps magnitude to a position in it.
#[derive(Debug, Clone, PartialEq)]
struct SequentialScale {
    position: PowScale,
    palette: Vec<Rgba>,
}

impl SequentialScale {
    fn new(
        palette: &[Rgba],
        domain: [Real; 2],
        exponent: Real,
        which: &'static str,
    ) -> LayersResult<Self> {
        if palette.is_empty() {
            return Err(LayersError::EmptyPalette { which });
        }
        Ok(Self {
            position: PowScale::new(exponent, domain, [0.0, 1.0]).clamped(),
            palette: palette.to_vec(),
        })
    }

    fn apply(&self, value: Real) -> Rgba {
        let t = self.position.apply(value);
        interpolate_basis(&self.palette, if t.is_finite() { t } else { 0.0 })
    }
}

/// Maps a flow magnitude to its line color.
///
/// In diff mode non-negative magnitudes use the positive palette over
/// `[0, max]` and negative magnitudes use the negative palette over `[0, min]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowColorScale {
    positive: SequentialScale,
    negative: Option<SequentialScale>,
}

impl FlowColorScale {
    /// `extent` is the (min, max) magnitude of the drawn flows, `(0, 0)` when
    /// there are none.
    pub fn new(colors: &FlowMapColors, extent: (Real, Real), exponent: Real) -> LayersResult<Self> {
        let (min, max) = extent;
        match colors {
            FlowMapColors::Single(c) => Ok(Self {
                positive: SequentialScale::new(&c.flows.scheme, [0.0, max], exponent, "flows")?,
                negative: None,
            }),
            FlowMapColors::Diff(d) => Ok(Self {
                positive: SequentialScale::new(
                    &d.positive.flows.scheme,
                    [0.0, max],
                    exponent,
                    "positive flows",
                )?,
                negative: Some(SequentialScale::new(
                    &d.negative.flows.scheme,
                    [0.0, min],
                    exponent,
                    "negative flows",
                )?),
            }),
        }
    }

    pub fn apply(&self, magnitude: Real) -> Rgba {
        match &self.negative {
            Some(negative) if magnitude < 0.0 => negative.apply(magnitude),
            _ => self.positive.apply(magnitude),
        }
    }
}

/// Uniform B-spline through the palette, `t` in [0, 1].
fn interpolate_basis(palette: &[Rgba], t: Real) -> Rgba {
    let n = palette.len() - 1;
    if n == 0 {
        return palette[0];
    }
    let t = t.clamp(0.0, 1.0);
    let i = if t >= 1.0 {
        n - 1
    } else {
        ((t * n as Real).floor() as usize).min(n - 1)
    };
    let local = (t - i as Real / n as Real) * n as Real;

    let mut out = [0u8; 4];
    for (c, slot) in out.iter_mut().enumerate() {
        let v1 = palette[i].0[c] as Real;
        let v2 = palette[i + 1].0[c] as Real;
        let v0 = if i > 0 {
            palette[i - 1].0[c] as Real
        } else {
            2.0 * v1 - v2
        };
        let v3 = if i + 2 <= n {
            palette[i + 2].0[c] as Real
        } else {
            2.0 * v2 - v1
        };
        *slot = basis(local, v0, v1, v2, v3).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

fn basis(t1: Real, v0: Real, v1: Real, v2: Real, v3: Real) -> Real {
    let t2 = t1 * t1;
    let t3 = t2 * t1;
    ((1.0 - 3.0 * t1 + 3.0 * t2 - t3) * v0
        + (4.0 - 6.0 * t2 + 3.0 * t3) * v1
        + (1.0 + 3.0 * t1 + 3.0 * t2 - 3.0 * t3) * v2
        + t3 * v3)
        / 6.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(scheme: Vec<Rgba>) -> FlowMapColors {
        FlowMapColors::Single(ColorsRgba {
            flows: FlowColors { scheme },
            location_circles: LocationCircleColors {
                inner: Rgba::rgb(1, 2, 3),
                outgoing: Rgba::rgb(4, 5, 6),
                incoming: Rgba::rgb(7, 8, 9),
            },
        })
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(Rgba::from_hex("#137CBD"), Some(Rgba::rgb(0x13, 0x7c, 0xbd)));
        assert_eq!(Rgba::from_hex("00000080"), Some(Rgba::rgba(0, 0, 0, 0x80)));
        assert_eq!(Rgba::from_hex("#12345"), None);
        assert_eq!(Rgba::from_hex("#zzzzzz"), None);
    }

    #[test]
    fn two_color_palette_hits_endpoints() {
        let black = Rgba::rgb(0, 0, 0);
        let white = Rgba::rgb(255, 255, 255);
        let scale = FlowColorScale::new(&single(vec![black, white]), (0.0, 8.0), 1.0).unwrap();
        assert_eq!(scale.apply(0.0), black);
        assert_eq!(scale.apply(8.0), white);
        assert_eq!(scale.apply(4.0), Rgba::rgb(128, 128, 128));
    }

    #[test]
    fn degenerate_domain_uses_first_color() {
        let colors = FlowMapColors::default();
        let scale = FlowColorScale::new(&colors, (0.0, 0.0), DEFAULT_COLOR_EXPONENT).unwrap();
        let first = match &colors {
            FlowMapColors::Single(c) => c.flows.scheme[0],
            FlowMapColors::Diff(_) => unreachable!(),
        };
        assert_eq!(scale.apply(0.0), first);
        assert_eq!(scale.apply(5.0), first);
        assert_eq!(scale.apply(Real::NAN), first);
    }

    #[test]
    fn diff_mode_picks_branch_by_sign() {
        let colors = FlowMapColors::default_diff();
        let scale = FlowColorScale::new(&colors, (-10.0, 10.0), DEFAULT_COLOR_EXPONENT).unwrap();
        let FlowMapColors::Diff(d) = &colors else {
            unreachable!()
        };
        assert_eq!(scale.apply(10.0), *d.positive.flows.scheme.last().unwrap());
        assert_eq!(scale.apply(-10.0), *d.negative.flows.scheme.last().unwrap());
        assert!(colors.is_diff());
        assert_eq!(colors.circle_color(), d.positive.location_circles.incoming);
    }

    #[test]
    fn empty_palette_is_rejected() {
        let err = FlowColorScale::new(&single(vec![]), (0.0, 1.0), 1.0).unwrap_err();
        assert_eq!(err, LayersError::EmptyPalette { which: "flows" });
    }

    #[test]
    fn single_color_palette() {
        let only = Rgba::rgb(9, 9, 9);
        let scale = FlowColorScale::new(&single(vec![only]), (0.0, 3.0), 1.0).unwrap();
        assert_eq!(scale.apply(2.0), only);
    }

    #[test]
    fn colors_deserialize_by_shape() {
        let single: FlowMapColors = serde_json::from_str(
            r#"{"flows": {"scheme": [[0,0,0,255],[255,255,255,255]]},
                "location_circles": {"inner": [1,1,1,255], "outgoing": [2,2,2,255], "incoming": [3,3,3,255]}}"#,
        )
        .unwrap();
        assert!(!single.is_diff());
        assert_eq!(single.circle_color(), Rgba::rgb(3, 3, 3));
    }
}
