use serde::{Deserialize, Serialize};
use tracing::debug;

/// Era value under which close years become meaningful.
pub const ERA_CLOSED: &str = "closed";

/// Fallback classification for rows with a blank or "n/a" finance type.
pub const FINANCE_TYPE_UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// The measure flows are denominated in.
///
/// Capacity belongs to a physical unit and must not be double-counted when
/// several financiers report the same unit on separate rows; funding is
/// attributable per financier and sums freely. Aggregation depends on this
/// distinction, see `graph::deduplicated_flow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum AccountingUnit {
    Capacity,
    Funding,
}

/// How targets are keyed: country centroids for the global view, project
/// locations for drill-down views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum TargetView {
    Country,
    Project,
}

/// A numeric cell as it arrives from tabular data: either a number or a
/// string that may or may not parse as one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            LooseNumber::Number(value) => Some(*value),
            LooseNumber::Text(value) => value.trim().parse::<f64>().ok(),
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            LooseNumber::Number(value) => Some(*value as i32),
            LooseNumber::Text(value) => value.trim().parse::<i32>().ok(),
        }
    }
}

/// One row as parsed from the tabular source, before admission. Every field
/// is optional or defaulted so that malformed rows still deserialize; it is
/// admission that decides what enters the working universe.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub target: String,
    /// Country housing the target, even when the target is a project.
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub source_lat: Option<LooseNumber>,
    #[serde(default)]
    pub source_lng: Option<LooseNumber>,
    #[serde(default)]
    pub target_lat: Option<LooseNumber>,
    #[serde(default)]
    pub target_lng: Option<LooseNumber>,
    #[serde(default)]
    pub target_country_lat: Option<LooseNumber>,
    #[serde(default)]
    pub target_country_lng: Option<LooseNumber>,
    #[serde(default)]
    pub era: String,
    #[serde(default)]
    pub close_year: Option<LooseNumber>,
    #[serde(default)]
    pub megawatts: Option<LooseNumber>,
    #[serde(default)]
    pub dollars: Option<LooseNumber>,
    #[serde(default)]
    pub finance_type: String,
    #[serde(default)]
    pub financer_type: String,
    #[serde(default)]
    pub financer: String,
    #[serde(default)]
    pub unit: String,
}

/// An admitted, immutable flow record. Filtering selects over these; nothing
/// downstream ever mutates one.
#[derive(Debug, Clone, Serialize)]
pub struct FlowRecord {
    pub source: String,
    pub target: String,
    pub recipient_country: String,
    /// Project name, regardless of how `target` is keyed in the active view.
    pub project: String,
    pub source_coord: Coordinate,
    pub target_coord: Coordinate,
    pub recipient_country_coord: Coordinate,
    pub unit: String,
    pub financer: String,
    pub financer_type: String,
    pub finance_type: String,
    pub era: String,
    pub close_year: Option<i32>,
    pub capacity_mw: f64,
    pub funding: f64,
}

impl FlowRecord {
    /// The flow contributed by this record under the active measure.
    pub fn measure(&self, unit: AccountingUnit) -> f64 {
        match unit {
            AccountingUnit::Capacity => self.capacity_mw,
            AccountingUnit::Funding => self.funding,
        }
    }
}

fn coordinate(lat: &Option<LooseNumber>, lng: &Option<LooseNumber>) -> Option<Coordinate> {
    let lat = lat.as_ref().and_then(LooseNumber::as_f64)?;
    let lng = lng.as_ref().and_then(LooseNumber::as_f64)?;
    let coord = Coordinate::new(lat, lng);
    coord.is_finite().then_some(coord)
}

/// Admit a single row into the working universe, or reject it.
///
/// A row survives only with an era, both endpoint coordinate pairs and the
/// recipient-country centroid present and numeric, non-empty identifiers,
/// and a capacity cell that is present (zero is kept, blank is not).
/// Rejection is data-quality filtering, not an error.
pub fn admit(raw: &RawRecord) -> Option<FlowRecord> {
    if raw.era.is_empty() {
        return None;
    }
    let source_coord = coordinate(&raw.source_lat, &raw.source_lng)?;
    let target_coord = coordinate(&raw.target_lat, &raw.target_lng)?;
    let recipient_country_coord = coordinate(&raw.target_country_lat, &raw.target_country_lng)?;
    if raw.source.is_empty() || raw.target.is_empty() {
        return None;
    }
    let capacity_mw = raw.megawatts.as_ref().and_then(LooseNumber::as_f64)?;
    let funding = raw
        .dollars
        .as_ref()
        .and_then(LooseNumber::as_f64)
        .unwrap_or(0.0);
    let finance_type = match raw.finance_type.as_str() {
        "" | "n/a" => FINANCE_TYPE_UNKNOWN.to_string(),
        other => other.to_string(),
    };

    Some(FlowRecord {
        source: raw.source.clone(),
        target: raw.target.clone(),
        recipient_country: raw.country.clone(),
        project: raw.target.clone(),
        source_coord,
        target_coord,
        recipient_country_coord,
        unit: raw.unit.clone(),
        financer: raw.financer.clone(),
        financer_type: raw.financer_type.clone(),
        finance_type,
        era: raw.era.clone(),
        close_year: raw.close_year.as_ref().and_then(LooseNumber::as_i32),
        capacity_mw,
        funding,
    })
}

/// The admitted record universe, materialized once per load in both target
/// views. Rebuilds only ever borrow from here.
#[derive(Debug, Clone)]
pub struct Dataset {
    by_country: Vec<FlowRecord>,
    by_project: Vec<FlowRecord>,
    close_years: Vec<i32>,
}

impl Dataset {
    pub fn new(records: Vec<FlowRecord>) -> Self {
        let by_country = records
            .iter()
            .map(|record| {
                let mut view = record.clone();
                view.target = view.recipient_country.clone();
                view.target_coord = view.recipient_country_coord;
                view
            })
            .collect();

        let mut close_years: Vec<i32> = records
            .iter()
            .filter(|record| record.era == ERA_CLOSED)
            .filter_map(|record| record.close_year)
            .collect();
        close_years.sort_unstable();
        close_years.dedup();

        Self {
            by_country,
            by_project: records,
            close_years,
        }
    }

    pub fn from_rows(rows: &[RawRecord]) -> Self {
        let mut admitted = Vec::with_capacity(rows.len());
        let mut dropped = 0usize;
        for raw in rows {
            match admit(raw) {
                Some(record) => admitted.push(record),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            debug!(admitted = admitted.len(), dropped, "rows rejected at admission");
        }
        Self::new(admitted)
    }

    /// Records with targets keyed per the requested view.
    pub fn view(&self, view: TargetView) -> &[FlowRecord] {
        match view {
            TargetView::Country => &self.by_country,
            TargetView::Project => &self.by_project,
        }
    }

    /// Sorted unique close years across closed-era records.
    pub fn close_years(&self) -> &[i32] {
        &self.close_years
    }

    pub fn is_empty(&self) -> bool {
        self.by_project.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_project.len()
    }
}
