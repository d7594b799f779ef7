use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::filter::FilterSet;
use crate::record::{AccountingUnit, Coordinate, FlowRecord};

/// Rebuilding is infallible except for one distinguished outcome: the filter
/// selection matched nothing. Callers branch on it to show a no-data state
/// instead of drawing an empty graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RebuildError {
    #[error("no records match the current filter selection")]
    EmptySelection,
}

/// Which side of the flow a node represents. One identifier acting as both a
/// financier and a recipient yields two independent nodes, one per role;
/// they are never merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Source,
    Target,
}

/// A geo-located aggregation point.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub id: String,
    pub role: Role,
    /// Owning country, for boundary highlighting by the renderer.
    pub country: String,
    pub coordinate: Coordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate_outflow: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate_inflow: Option<f64>,
    /// Copy of whichever aggregate applies, used uniformly for range scaling.
    pub flow: f64,
}

/// A directed edge carrying the deduplicated net flow between one
/// (source, target) pair.
#[derive(Debug, Clone, Serialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub flow: f64,
    pub recipient_country: String,
    pub source_coord: Coordinate,
    pub target_coord: Coordinate,
}

/// Min/max of a flow sequence, used to drive linear radius/width scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlowRange {
    pub min: f64,
    pub max: f64,
}

impl FlowRange {
    /// Scan a flow sequence. A degenerate range (min == max) is widened by
    /// one so the downstream linear scale never divides by zero.
    pub fn of(values: impl IntoIterator<Item = f64>) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in values {
            min = min.min(value);
            max = max.max(value);
        }
        if !min.is_finite() || !max.is_finite() {
            return Self { min: 0.0, max: 1.0 };
        }
        if min == max {
            max = min + 1.0;
        }
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// The node and link ranges of one graph. Retained verbatim across a
/// drill-down rebuild when the caller asks not to rescale, so the child view
/// stays visually comparable to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleRanges {
    pub node: FlowRange,
    pub link: FlowRange,
}

/// The complete derived graph for one filter selection. Ephemeral: fully
/// rebuilt on every filter change, never patched.
#[derive(Debug, Clone, Serialize)]
pub struct GraphResult {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub ranges: ScaleRanges,
}

/// Sum the active measure over a record group.
///
/// Under capacity accounting a physical unit contributes once per
/// aggregation even when co-financing puts it on several rows; under funding
/// accounting every row counts, because funding is attributable per
/// financier while capacity is not. Assumes unit identifiers are globally
/// unique across projects.
pub fn deduplicated_flow<'a>(
    records: impl IntoIterator<Item = &'a FlowRecord>,
    unit: AccountingUnit,
) -> f64 {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut total = 0.0;
    for record in records {
        if unit == AccountingUnit::Capacity && !seen.insert(record.unit.as_str()) {
            continue;
        }
        total += record.measure(unit);
    }
    total
}

/// Derive the link set: exactly one link per observed (source, target) pair,
/// in first-encounter order, with flow deduplicated over the rows sharing
/// the pair and coordinates copied from the first contributing row.
pub fn build_links(records: &[&FlowRecord], unit: AccountingUnit) -> Vec<Link> {
    let mut links = Vec::new();
    let mut seen_sources: HashSet<&str> = HashSet::new();

    for record in records {
        if !seen_sources.insert(record.source.as_str()) {
            continue;
        }
        let source_rows: Vec<&FlowRecord> = records
            .iter()
            .copied()
            .filter(|row| row.source == record.source)
            .collect();

        let mut seen_targets: HashSet<&str> = HashSet::new();
        for row in &source_rows {
            if !seen_targets.insert(row.target.as_str()) {
                continue;
            }
            let pair_rows = source_rows
                .iter()
                .copied()
                .filter(|candidate| candidate.target == row.target);
            links.push(Link {
                source: row.source.clone(),
                target: row.target.clone(),
                flow: deduplicated_flow(pair_rows, unit),
                recipient_country: row.recipient_country.clone(),
                source_coord: row.source_coord,
                target_coord: row.target_coord,
            });
        }
    }
    links
}

/// Derive the node set from the link set: at most one node per
/// (identifier, role). Aggregates are recomputed from the full working set
/// rather than summed over links, because summing link flows would
/// double-count a unit co-financed toward the same recipient.
pub fn build_nodes(links: &[Link], records: &[&FlowRecord], unit: AccountingUnit) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut seen_sources: HashSet<&str> = HashSet::new();
    let mut seen_targets: HashSet<&str> = HashSet::new();

    for link in links {
        if seen_sources.insert(link.source.as_str()) {
            let flow = deduplicated_flow(
                records
                    .iter()
                    .copied()
                    .filter(|row| row.source == link.source),
                unit,
            );
            nodes.push(Node {
                id: link.source.clone(),
                role: Role::Source,
                country: link.source.clone(),
                coordinate: link.source_coord,
                aggregate_outflow: Some(flow),
                aggregate_inflow: None,
                flow,
            });
        }
        if seen_targets.insert(link.target.as_str()) {
            let flow = deduplicated_flow(
                records
                    .iter()
                    .copied()
                    .filter(|row| row.target == link.target),
                unit,
            );
            nodes.push(Node {
                id: link.target.clone(),
                role: Role::Target,
                country: link.recipient_country.clone(),
                coordinate: link.target_coord,
                aggregate_outflow: None,
                aggregate_inflow: Some(flow),
                flow,
            });
        }
    }
    nodes
}

/// Rebuild the whole graph for one filter selection.
///
/// Pure: the result is derived only from the arguments. When `rescale` is
/// false and a previous range pair is supplied, it is carried over unchanged
/// instead of being recomputed from the new node/link sets.
pub fn rebuild(
    records: &[FlowRecord],
    filters: &FilterSet,
    unit: AccountingUnit,
    previous: Option<ScaleRanges>,
    rescale: bool,
) -> Result<GraphResult, RebuildError> {
    let working = filters.apply(records, unit);
    if working.is_empty() {
        return Err(RebuildError::EmptySelection);
    }

    let links = build_links(&working, unit);
    let nodes = build_nodes(&links, &working, unit);

    let ranges = match previous {
        Some(kept) if !rescale => kept,
        _ => ScaleRanges {
            node: FlowRange::of(nodes.iter().map(|node| node.flow)),
            link: FlowRange::of(links.iter().map(|link| link.flow)),
        },
    };

    debug!(
        selected = working.len(),
        nodes = nodes.len(),
        links = links.len(),
        "graph rebuilt"
    );
    Ok(GraphResult {
        nodes,
        links,
        ranges,
    })
}
