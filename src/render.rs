use crate::config::EngineConfig;
use crate::geometry::{link_path, link_width, node_radius, Projection};
use crate::graph::{GraphResult, Node, Role};

/// Render the graph as a static SVG overlay: Bezier links with flow-scaled
/// stroke widths below, target circles, then source circles on top (the
/// draw order keeps financier circles clickable in an interactive host).
/// Elements with unprojectable coordinates are skipped, not fatal.
pub fn render_svg(
    result: &GraphResult,
    projection: &dyn Projection,
    config: &EngineConfig,
    width: f64,
    height: f64,
) -> String {
    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    if let Some(background) = &config.style.background {
        svg.push_str(&format!(
            "<rect width=\"100%\" height=\"100%\" fill=\"{background}\"/>",
        ));
    }

    svg.push_str("<g class=\"links\">");
    for link in &result.links {
        let Some(source) = projection.project(link.source_coord) else {
            continue;
        };
        let Some(target) = projection.project(link.target_coord) else {
            continue;
        };
        let d = link_path(source, target, &config.curve);
        let stroke_width = link_width(link.flow, result.ranges.link, &config.scale);
        svg.push_str(&format!(
            "<path class=\"link\" d=\"{d}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{stroke_width:.2}\" data-source=\"{}\" data-target=\"{}\"/>",
            config.style.link_color,
            escape_xml(&link.source),
            escape_xml(&link.target),
        ));
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"nodes\">");
    for node in nodes_by_role(result, Role::Target) {
        svg.push_str(&circle_svg(node, result, projection, config, &config.style.target_color));
    }
    for node in nodes_by_role(result, Role::Source) {
        svg.push_str(&circle_svg(node, result, projection, config, &config.style.source_color));
    }
    svg.push_str("</g>");

    svg.push_str("</svg>");
    svg
}

fn nodes_by_role(result: &GraphResult, role: Role) -> impl Iterator<Item = &Node> {
    result.nodes.iter().filter(move |node| node.role == role)
}

fn circle_svg(
    node: &Node,
    result: &GraphResult,
    projection: &dyn Projection,
    config: &EngineConfig,
    color: &str,
) -> String {
    let Some(center) = projection.project(node.coordinate) else {
        return String::new();
    };
    let radius = node_radius(node.flow, result.ranges.node, &config.scale);
    let class = match node.role {
        Role::Source => "source",
        Role::Target => "target",
    };
    format!(
        "<circle class=\"{class}\" cx=\"{:.2}\" cy=\"{:.2}\" r=\"{radius:.2}\" fill=\"{color}\" opacity=\"{}\" data-id=\"{}\"/>",
        center.x,
        center.y,
        config.style.circle_opacity,
        escape_xml(&node.id),
    )
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{EquirectProjection, GeoBounds, ScreenPoint};
    use crate::graph::{FlowRange, Link, ScaleRanges};
    use crate::record::Coordinate;

    struct OffMap;

    impl Projection for OffMap {
        fn project(&self, _coord: Coordinate) -> Option<ScreenPoint> {
            None
        }
    }

    fn graph() -> GraphResult {
        let flow = 120.0;
        GraphResult {
            nodes: vec![
                Node {
                    id: "China".to_string(),
                    role: Role::Source,
                    country: "China".to_string(),
                    coordinate: Coordinate::new(35.0, 103.0),
                    aggregate_outflow: Some(flow),
                    aggregate_inflow: None,
                    flow,
                },
                Node {
                    id: "Laos".to_string(),
                    role: Role::Target,
                    country: "Laos".to_string(),
                    coordinate: Coordinate::new(18.0, 105.0),
                    aggregate_outflow: None,
                    aggregate_inflow: Some(flow),
                    flow,
                },
            ],
            links: vec![Link {
                source: "China".to_string(),
                target: "Laos".to_string(),
                flow,
                recipient_country: "Laos".to_string(),
                source_coord: Coordinate::new(35.0, 103.0),
                target_coord: Coordinate::new(18.0, 105.0),
            }],
            ranges: ScaleRanges {
                node: FlowRange {
                    min: 120.0,
                    max: 121.0,
                },
                link: FlowRange {
                    min: 120.0,
                    max: 121.0,
                },
            },
        }
    }

    #[test]
    fn renders_links_and_both_circle_roles() {
        let result = graph();
        let bounds = GeoBounds {
            min_lat: 10.0,
            min_lng: 100.0,
            max_lat: 40.0,
            max_lng: 110.0,
        };
        let projection = EquirectProjection::new(bounds, 800.0, 600.0, 20.0);
        let svg = render_svg(&result, &projection, &EngineConfig::default(), 800.0, 600.0);
        assert!(svg.contains("<svg"));
        assert!(svg.contains("class=\"link\""));
        assert!(svg.contains("class=\"source\""));
        assert!(svg.contains("class=\"target\""));
        assert!(svg.contains("data-id=\"China\""));
    }

    #[test]
    fn unprojectable_elements_are_skipped_not_fatal() {
        let result = graph();
        let svg = render_svg(&result, &OffMap, &EngineConfig::default(), 800.0, 600.0);
        assert!(svg.contains("<svg"));
        assert!(!svg.contains("<circle"));
        assert!(!svg.contains("<path"));
    }

    #[test]
    fn escapes_identifiers_in_attributes() {
        let mut result = graph();
        result.nodes[0].id = "A & B \"Co\"".to_string();
        let bounds = GeoBounds {
            min_lat: 10.0,
            min_lng: 100.0,
            max_lat: 40.0,
            max_lng: 110.0,
        };
        let projection = EquirectProjection::new(bounds, 800.0, 600.0, 20.0);
        let svg = render_svg(&result, &projection, &EngineConfig::default(), 800.0, 600.0);
        assert!(svg.contains("A &amp; B &quot;Co&quot;"));
    }
}
