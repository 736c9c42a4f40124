//! Initial map view fitted to a set of locations.

use fm_core::Real;
use fm_data::FlowLocation;
use serde::Serialize;

const TILE_SIZE: Real = 512.0;
const MAX_LATITUDE: Real = 85.051_128_779_806_59;
const PADDING: Real = 20.0;
pub const MAX_ZOOM: Real = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewportProps {
    pub longitude: Real,
    pub latitude: Real,
    pub zoom: Real,
    /// `[[west, south], [east, north]]` of the fitted locations.
    pub bounds: [[Real; 2]; 2],
}

/// Fit all finite centroids into a `width` x `height` pixel viewport.
///
/// Returns `None` when there is no finite centroid to fit.
pub fn viewport_for_locations<L: FlowLocation>(
    locations: &[L],
    (width, height): (u32, u32),
) -> Option<ViewportProps> {
    let mut points = locations
        .iter()
        .map(FlowLocation::centroid)
        .filter(|c| c[0].is_finite() && c[1].is_finite());
    let first = points.next()?;
    let [west, south, east, north] = points.fold(
        [first[0], first[1], first[0], first[1]],
        |[w, s, e, n], [lon, lat]| [w.min(lon), s.min(lat), e.max(lon), n.max(lat)],
    );

    let [x0, y0] = project([west, north]);
    let [x1, y1] = project([east, south]);
    let [longitude, latitude] = unproject([(x0 + x1) / 2.0, (y0 + y1) / 2.0]);

    let (width, height) = (Real::from(width), Real::from(height));
    let pad = if width > 2.0 * PADDING && height > 2.0 * PADDING {
        PADDING
    } else {
        0.0
    };
    let scale_x = (width - 2.0 * pad) / (x1 - x0);
    let scale_y = (height - 2.0 * pad) / (y1 - y0);
    let scale = scale_x.min(scale_y);
    let zoom = if scale.is_finite() && scale > 0.0 {
        scale.log2().clamp(0.0, MAX_ZOOM)
    } else {
        MAX_ZOOM
    };

    Some(ViewportProps {
        longitude,
        latitude,
        zoom,
        bounds: [[west, south], [east, north]],
    })
}

/// Web Mercator world pixels at zoom 0.
fn project([lon, lat]: [Real; 2]) -> [Real; 2] {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (lon + 180.0) / 360.0 * TILE_SIZE;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0 * TILE_SIZE;
    [x, y]
}

fn unproject([x, y]: [Real; 2]) -> [Real; 2] {
    let lon = x / TILE_SIZE * 360.0 - 180.0;
    let n = std::f64::consts::PI * (1.0 - 2.0 * y / TILE_SIZE);
    let lat = n.sinh().atan().to_degrees();
    [lon, lat]
}

#[cfg(test)]
mod tests {
    use super::*;
    use fm_core::{Tolerances, nearly_equal};
    use fm_data::Location;

    fn close(a: Real, b: Real) -> bool {
        nearly_equal(a, b, Tolerances { abs: 1e-6, rel: 1e-9 })
    }

    #[test]
    fn empty_has_no_viewport() {
        assert_eq!(viewport_for_locations::<Location>(&[], (800, 600)), None);
    }

    #[test]
    fn projection_round_trips() {
        for p in [[0.0, 0.0], [-122.4, 37.8], [151.2, -33.9]] {
            let [lon, lat] = unproject(project(p));
            assert!(close(lon, p[0]) && close(lat, p[1]));
        }
    }

    #[test]
    fn single_point_gets_max_zoom() {
        let vp = viewport_for_locations(&[Location::new("A", "A", 8.5, 47.4)], (800, 600))
            .unwrap();
        assert!(close(vp.longitude, 8.5));
        assert!(close(vp.latitude, 47.4));
        assert_eq!(vp.zoom, MAX_ZOOM);
    }

    #[test]
    fn wider_spread_means_lower_zoom() {
        let near = [
            Location::new("A", "A", 0.0, 0.0),
            Location::new("B", "B", 1.0, 1.0),
        ];
        let far = [
            Location::new("A", "A", -60.0, -30.0),
            Location::new("B", "B", 60.0, 30.0),
        ];
        let near = viewport_for_locations(&near, (800, 600)).unwrap();
        let far = viewport_for_locations(&far, (800, 600)).unwrap();
        assert!(far.zoom < near.zoom);
        assert!(close(far.longitude, 0.0));
        assert!(close(far.latitude, 0.0));
        assert_eq!(far.bounds, [[-60.0, -30.0], [60.0, 30.0]]);
    }

    #[test]
    fn whole_world_clamps_to_zero() {
        let locs = [
            Location::new("A", "A", -180.0, -85.0),
            Location::new("B", "B", 180.0, 85.0),
        ];
        let vp = viewport_for_locations(&locs, (100, 100)).unwrap();
        assert_eq!(vp.zoom, 0.0);
    }

    #[test]
    fn non_finite_centroids_are_skipped() {
        let locs = [
            Location::new("A", "A", Real::NAN, 0.0),
            Location::new("B", "B", 2.0, 3.0),
        ];
        let vp = viewport_for_locations(&locs, (800, 600)).unwrap();
        assert_eq!(vp.bounds, [[2.0, 3.0], [2.0, 3.0]]);
    }
}
