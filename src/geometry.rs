use serde::Serialize;

use crate::config::{CurveConfig, ScaleConfig};
use crate::graph::FlowRange;
use crate::record::{Coordinate, FlowRecord};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Geographic-to-screen projection supplied by the embedding map/renderer.
/// A coordinate with no resolvable screen position projects to `None` and
/// the renderer skips that element instead of aborting the draw pass.
pub trait Projection {
    fn project(&self, coord: Coordinate) -> Option<ScreenPoint>;
}

/// Cubic-Bezier control offsets for a link between two projected points.
///
/// With `dx = source.x - target.x` and `dy = source.y - target.y`, the major
/// tangent weight goes to the x axis when the target sits below the source
/// in screen space (`dy < 0`) and to the y axis otherwise. The asymmetry
/// bows reciprocal flows between the same two points to opposite sides so
/// they never overlap exactly.
pub fn link_controls(source: ScreenPoint, target: ScreenPoint, curve: &CurveConfig) -> [f64; 4] {
    let dx = source.x - target.x;
    let dy = source.y - target.y;
    if dy < 0.0 {
        [
            curve.major * dx,
            curve.minor * dy,
            curve.major * dx,
            curve.minor * dy,
        ]
    } else {
        [
            curve.minor * dx,
            curve.major * dy,
            curve.minor * dx,
            curve.major * dy,
        ]
    }
}

/// SVG path for one link: start at the source, first control point offset
/// back from the source, second offset forward from the target, end at the
/// target. Recomputed on every pan/zoom; nothing here caches by geography.
pub fn link_path(source: ScreenPoint, target: ScreenPoint, curve: &CurveConfig) -> String {
    let controls = link_controls(source, target, curve);
    format!(
        "M{:.2},{:.2}C{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}",
        source.x,
        source.y,
        source.x - controls[0],
        source.y - controls[1],
        target.x + controls[2],
        target.y + controls[3],
        target.x,
        target.y,
    )
}

fn linear(flow: f64, range: FlowRange, out_min: f64, out_max: f64) -> f64 {
    out_min + (out_max - out_min) * (flow - range.min) / range.span()
}

/// Node radius under the linear flow scale. Zero flow means "no flow", not
/// "minimal flow": it renders at radius 0 regardless of the range.
pub fn node_radius(flow: f64, range: FlowRange, scale: &ScaleConfig) -> f64 {
    if flow == 0.0 {
        return 0.0;
    }
    linear(flow, range, scale.min_radius, scale.max_radius)
}

/// Link stroke width under the linear flow scale, with the same explicit
/// zero floor as `node_radius`.
pub fn link_width(flow: f64, range: FlowRange, scale: &ScaleConfig) -> f64 {
    if flow == 0.0 {
        return 0.0;
    }
    linear(flow, range, scale.min_link_width, scale.max_link_width)
}

/// Latitude/longitude envelope of a record set, covering both endpoints of
/// every record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl GeoBounds {
    pub fn of<'a>(records: impl IntoIterator<Item = &'a FlowRecord>) -> Option<Self> {
        let mut bounds: Option<GeoBounds> = None;
        for record in records {
            for coord in [record.source_coord, record.target_coord] {
                if !coord.is_finite() {
                    continue;
                }
                bounds = Some(match bounds {
                    None => GeoBounds {
                        min_lat: coord.lat,
                        min_lng: coord.lng,
                        max_lat: coord.lat,
                        max_lng: coord.lng,
                    },
                    Some(current) => GeoBounds {
                        min_lat: current.min_lat.min(coord.lat),
                        min_lng: current.min_lng.min(coord.lng),
                        max_lat: current.max_lat.max(coord.lat),
                        max_lng: current.max_lng.max(coord.lng),
                    },
                });
            }
        }
        bounds
    }
}

/// Plate carree projection fitted to a geographic envelope. Stands in for an
/// interactive map when rendering a static overlay; embedding renderers
/// supply their own `Projection` instead.
#[derive(Debug, Clone)]
pub struct EquirectProjection {
    bounds: GeoBounds,
    width: f64,
    height: f64,
    padding: f64,
}

impl EquirectProjection {
    pub fn new(bounds: GeoBounds, width: f64, height: f64, padding: f64) -> Self {
        Self {
            bounds,
            width,
            height,
            padding,
        }
    }
}

impl Projection for EquirectProjection {
    fn project(&self, coord: Coordinate) -> Option<ScreenPoint> {
        if !coord.is_finite() {
            return None;
        }
        let span_lng = (self.bounds.max_lng - self.bounds.min_lng).max(f64::EPSILON);
        let span_lat = (self.bounds.max_lat - self.bounds.min_lat).max(f64::EPSILON);
        let inner_w = (self.width - self.padding * 2.0).max(0.0);
        let inner_h = (self.height - self.padding * 2.0).max(0.0);
        let x = self.padding + (coord.lng - self.bounds.min_lng) / span_lng * inner_w;
        let y = self.padding + (self.bounds.max_lat - coord.lat) / span_lat * inner_h;
        Some(ScreenPoint::new(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> CurveConfig {
        CurveConfig::default()
    }

    #[test]
    fn controls_weight_x_axis_when_target_is_below() {
        // dy = 0 - 5 = -5 < 0: major weight on dx.
        let source = ScreenPoint::new(0.0, 0.0);
        let target = ScreenPoint::new(10.0, 5.0);
        let controls = link_controls(source, target, &curve());
        assert_eq!(controls, [-4.0, -0.5, -4.0, -0.5]);
    }

    #[test]
    fn controls_weight_y_axis_when_target_is_above() {
        // dy = 0 - (-5) = 5 >= 0: major weight on dy.
        let source = ScreenPoint::new(0.0, 0.0);
        let target = ScreenPoint::new(10.0, -5.0);
        let controls = link_controls(source, target, &curve());
        assert_eq!(controls, [-1.0, 2.0, -1.0, 2.0]);
    }

    #[test]
    fn reciprocal_links_produce_distinct_paths() {
        let a = ScreenPoint::new(0.0, 0.0);
        let b = ScreenPoint::new(10.0, 5.0);
        let forward = link_path(a, b, &curve());
        let backward = link_path(b, a, &curve());
        assert!(forward.starts_with("M0.00,0.00C"));
        assert!(backward.starts_with("M10.00,5.00C"));
        // Same endpoints, opposite bulges.
        assert_ne!(forward, backward);
    }

    #[test]
    fn path_layout_matches_control_offsets() {
        let source = ScreenPoint::new(0.0, 0.0);
        let target = ScreenPoint::new(10.0, 5.0);
        // Controls are [-4.0, -0.5, -4.0, -0.5]:
        // c1 = source - offset, c2 = target + offset.
        let d = link_path(source, target, &curve());
        assert_eq!(d, "M0.00,0.00C4.00,0.50 6.00,4.50 10.00,5.00");
    }

    #[test]
    fn radius_scale_is_linear_over_the_range() {
        let scale = ScaleConfig::default();
        let range = FlowRange {
            min: 100.0,
            max: 200.0,
        };
        assert_eq!(node_radius(100.0, range, &scale), 10.0);
        assert_eq!(node_radius(200.0, range, &scale), 40.0);
        assert_eq!(node_radius(150.0, range, &scale), 25.0);
    }

    #[test]
    fn zero_flow_floors_to_zero_even_when_range_excludes_it() {
        let scale = ScaleConfig::default();
        let zero_min = FlowRange { min: 0.0, max: 10.0 };
        assert_eq!(link_width(0.0, zero_min, &scale), 0.0);
        assert_eq!(node_radius(0.0, zero_min, &scale), 0.0);

        // Impossible under correct construction, but must not go negative.
        let positive_min = FlowRange { min: 5.0, max: 10.0 };
        assert_eq!(link_width(0.0, positive_min, &scale), 0.0);
    }

    #[test]
    fn projection_rejects_non_finite_coordinates() {
        let bounds = GeoBounds {
            min_lat: 0.0,
            min_lng: 0.0,
            max_lat: 10.0,
            max_lng: 10.0,
        };
        let projection = EquirectProjection::new(bounds, 100.0, 100.0, 0.0);
        assert!(projection.project(Coordinate::new(f64::NAN, 5.0)).is_none());

        let point = projection
            .project(Coordinate::new(10.0, 0.0))
            .expect("north-west corner");
        assert_eq!(point, ScreenPoint::new(0.0, 0.0));
        let point = projection
            .project(Coordinate::new(0.0, 10.0))
            .expect("south-east corner");
        assert_eq!(point, ScreenPoint::new(100.0, 100.0));
    }
}
