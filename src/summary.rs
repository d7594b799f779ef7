use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::filter::FilterField;
use crate::graph::{Node, Role};
use crate::record::{AccountingUnit, FlowRecord};

/// One row of a ranked inflow/outflow listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFlow {
    pub id: String,
    pub flow: f64,
    pub role: Role,
}

/// Source-role nodes with a nonzero outflow, largest first.
pub fn rank_outflows(nodes: &[Node]) -> Vec<RankedFlow> {
    rank(nodes, Role::Source)
}

/// Target-role nodes with a nonzero inflow, largest first.
pub fn rank_inflows(nodes: &[Node]) -> Vec<RankedFlow> {
    rank(nodes, Role::Target)
}

fn rank(nodes: &[Node], role: Role) -> Vec<RankedFlow> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut rows: Vec<RankedFlow> = nodes
        .iter()
        .filter(|node| node.role == role && node.flow > 0.0)
        .filter(|node| seen.insert(node.id.as_str()))
        .map(|node| RankedFlow {
            id: node.id.clone(),
            flow: node.flow,
            role,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.flow
            .partial_cmp(&a.flow)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    rows
}

/// Aggregate flow attributed to one financier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancerFlow {
    pub financer: String,
    pub flow: f64,
}

/// Per-financier totals for the rows matching one drill-down value,
/// largest first.
///
/// Rows are first averaged per (financier, unit) pair so that duplicate
/// reports of the same co-funded unit collapse to a single contribution,
/// then the means are summed per financier.
pub fn financer_breakdown(
    records: &[&FlowRecord],
    field: FilterField,
    value: &str,
    unit: AccountingUnit,
) -> Vec<FinancerFlow> {
    // (financier, unit) -> (sum, count), with first-encounter key order.
    let mut group_order: Vec<(String, String)> = Vec::new();
    let mut groups: HashMap<(String, String), (f64, usize)> = HashMap::new();
    for record in records {
        if field.value_of(record) != value {
            continue;
        }
        let key = (record.financer.clone(), record.unit.clone());
        let entry = groups.entry(key.clone()).or_insert_with(|| {
            group_order.push(key);
            (0.0, 0)
        });
        entry.0 += record.measure(unit);
        entry.1 += 1;
    }

    let mut financer_order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, f64> = HashMap::new();
    for key in &group_order {
        let (sum, count) = groups[key];
        let mean = sum / count as f64;
        let total = totals.entry(key.0.clone()).or_insert_with(|| {
            financer_order.push(key.0.clone());
            0.0
        });
        *total += mean;
    }

    let mut rows: Vec<FinancerFlow> = financer_order
        .into_iter()
        .map(|financer| {
            let flow = totals[&financer];
            FinancerFlow { financer, flow }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.flow
            .partial_cmp(&a.flow)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.financer.cmp(&b.financer))
    });
    rows
}

/// One physical unit with its per-financier contributions, for the
/// project-level detail listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitDetail {
    pub unit: String,
    /// Measure of the unit itself; every row reporting the unit carries the
    /// same value, so the first one is taken.
    pub flow: f64,
    pub contributions: Vec<FinancerFlow>,
}

/// Per-unit detail rows for the working set, in first-encounter order.
/// Each unique unit lists the financiers reporting it with their row
/// measures, in row order.
pub fn unit_details(records: &[&FlowRecord], unit: AccountingUnit) -> Vec<UnitDetail> {
    let mut details: Vec<UnitDetail> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for record in records {
        let slot = *index.entry(record.unit.clone()).or_insert_with(|| {
            details.push(UnitDetail {
                unit: record.unit.clone(),
                flow: record.measure(unit),
                contributions: Vec::new(),
            });
            details.len() - 1
        });
        details[slot].contributions.push(FinancerFlow {
            financer: record.financer.clone(),
            flow: record.measure(unit),
        });
    }
    details
}

/// Share of the total measure held by one financier classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstitutionShare {
    pub financer_type: String,
    pub percent: f64,
}

/// Percentage breakdown of the working set by financier classification, in
/// first-encounter order. Percentages are of the plain per-row sum; the
/// capacity dedup rule does not apply to a share-of-total view.
pub fn institution_shares(records: &[&FlowRecord], unit: AccountingUnit) -> Vec<InstitutionShare> {
    let total: f64 = records.iter().map(|record| record.measure(unit)).sum();

    let mut order: Vec<String> = Vec::new();
    let mut sums: HashMap<String, f64> = HashMap::new();
    for record in records {
        let sum = sums.entry(record.financer_type.clone()).or_insert_with(|| {
            order.push(record.financer_type.clone());
            0.0
        });
        *sum += record.measure(unit);
    }

    order
        .into_iter()
        .map(|financer_type| {
            let percent = if total > 0.0 {
                sums[&financer_type] / total * 100.0
            } else {
                0.0
            };
            InstitutionShare {
                financer_type,
                percent,
            }
        })
        .collect()
}
