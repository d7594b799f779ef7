use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::record::{AccountingUnit, FlowRecord};

/// The closed set of fields a drill-down predicate may match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    Source,
    Target,
    RecipientCountry,
    Financer,
}

impl FilterField {
    pub fn value_of<'a>(&self, record: &'a FlowRecord) -> &'a str {
        match self {
            FilterField::Source => &record.source,
            FilterField::Target => &record.target,
            FilterField::RecipientCountry => &record.recipient_country,
            FilterField::Financer => &record.financer,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            FilterField::Source => "source",
            FilterField::Target => "target",
            FilterField::RecipientCountry => "country",
            FilterField::Financer => "financer",
        }
    }
}

impl FromStr for FilterField {
    type Err = UnknownFilterField;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        match key {
            "source" => Ok(FilterField::Source),
            "target" | "project" => Ok(FilterField::Target),
            "country" | "recipient_country" => Ok(FilterField::RecipientCountry),
            "financer" => Ok(FilterField::Financer),
            other => Err(UnknownFilterField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter field '{0}', expected source, target, country or financer")]
pub struct UnknownFilterField(String);

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A single field = value drill-down predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drill {
    pub field: FilterField,
    pub value: String,
}

impl Drill {
    pub fn new(field: FilterField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// Domestic flows stay within one country; international flows cross a
/// border. Judged against the recipient country, not the raw target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Scope {
    Domestic,
    International,
}

/// The user-selected predicate set. All predicates are ANDed; an empty
/// membership list means that dimension is unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    pub era: String,
    #[serde(default)]
    pub finance_types: Vec<String>,
    #[serde(default)]
    pub financer_types: Vec<String>,
    #[serde(default)]
    pub close_year: Option<i32>,
    #[serde(default)]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub drill: Option<Drill>,
}

impl FilterSet {
    pub fn for_era(era: impl Into<String>) -> Self {
        Self {
            era: era.into(),
            ..Self::default()
        }
    }

    /// Whether one record passes every active predicate.
    ///
    /// The accounting unit participates: when denominating in funding, rows
    /// with no funding amount are excluded because they contribute nothing
    /// and would still seed nodes and links.
    pub fn matches(&self, record: &FlowRecord, unit: AccountingUnit) -> bool {
        if record.era != self.era {
            return false;
        }
        if !self.finance_types.is_empty() && !self.finance_types.contains(&record.finance_type) {
            return false;
        }
        if !self.financer_types.is_empty() && !self.financer_types.contains(&record.financer_type)
        {
            return false;
        }
        if let Some(year) = self.close_year {
            if record.close_year != Some(year) {
                return false;
            }
        }
        if unit == AccountingUnit::Funding && record.funding == 0.0 {
            return false;
        }
        match self.scope {
            Some(Scope::Domestic) if record.source != record.recipient_country => return false,
            Some(Scope::International) if record.source == record.recipient_country => {
                return false;
            }
            _ => {}
        }
        if let Some(drill) = &self.drill {
            if drill.field.value_of(record) != drill.value {
                return false;
            }
        }
        true
    }

    /// Select the working set, preserving input order. An empty result is a
    /// legitimate outcome here; `graph::rebuild` turns it into the
    /// distinguished no-data signal.
    pub fn apply<'a>(
        &self,
        records: &'a [FlowRecord],
        unit: AccountingUnit,
    ) -> Vec<&'a FlowRecord> {
        records
            .iter()
            .filter(|record| self.matches(record, unit))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Coordinate;

    fn record(era: &str, finance_type: &str) -> FlowRecord {
        FlowRecord {
            source: "China".to_string(),
            target: "Laos".to_string(),
            recipient_country: "Laos".to_string(),
            project: "Nam Ou 2".to_string(),
            source_coord: Coordinate::new(35.0, 103.0),
            target_coord: Coordinate::new(18.0, 105.0),
            recipient_country_coord: Coordinate::new(18.0, 105.0),
            unit: "U1".to_string(),
            financer: "Exim Bank".to_string(),
            financer_type: "Governmental policy institution".to_string(),
            finance_type: finance_type.to_string(),
            era: era.to_string(),
            close_year: None,
            capacity_mw: 100.0,
            funding: 1_000_000.0,
        }
    }

    #[test]
    fn predicates_are_anded() {
        let records = vec![
            record("financing", "grant"),
            record("financing", "loan"),
            record("closed", "grant"),
        ];
        let filters = FilterSet {
            era: "financing".to_string(),
            finance_types: vec!["grant".to_string()],
            ..FilterSet::default()
        };
        let selected = filters.apply(&records, AccountingUnit::Capacity);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].finance_type, "grant");
    }

    #[test]
    fn empty_membership_set_is_unconstrained() {
        let records = vec![record("financing", "grant"), record("financing", "loan")];
        let filters = FilterSet::for_era("financing");
        assert_eq!(filters.apply(&records, AccountingUnit::Capacity).len(), 2);
    }

    #[test]
    fn funding_accounting_drops_zero_funding_rows() {
        let mut unfunded = record("financing", "grant");
        unfunded.funding = 0.0;
        let records = vec![record("financing", "grant"), unfunded];
        let filters = FilterSet::for_era("financing");
        assert_eq!(filters.apply(&records, AccountingUnit::Funding).len(), 1);
        // Capacity accounting keeps the unfunded row.
        assert_eq!(filters.apply(&records, AccountingUnit::Capacity).len(), 2);
    }

    #[test]
    fn scope_compares_source_to_recipient_country() {
        let mut domestic = record("financing", "grant");
        domestic.source = "Laos".to_string();
        let records = vec![record("financing", "grant"), domestic];

        let mut filters = FilterSet::for_era("financing");
        filters.scope = Some(Scope::Domestic);
        let selected = filters.apply(&records, AccountingUnit::Capacity);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].source, "Laos");

        filters.scope = Some(Scope::International);
        let selected = filters.apply(&records, AccountingUnit::Capacity);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].source, "China");
    }

    #[test]
    fn close_year_must_match_exactly() {
        let mut closed = record("closed", "grant");
        closed.close_year = Some(2019);
        let mut other = record("closed", "grant");
        other.close_year = Some(2021);
        let records = vec![closed, other];

        let mut filters = FilterSet::for_era("closed");
        filters.close_year = Some(2019);
        let selected = filters.apply(&records, AccountingUnit::Capacity);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].close_year, Some(2019));
    }

    #[test]
    fn drill_matches_one_field() {
        let mut other_financer = record("financing", "grant");
        other_financer.financer = "ICBC".to_string();
        let records = vec![record("financing", "grant"), other_financer];

        let mut filters = FilterSet::for_era("financing");
        filters.drill = Some(Drill::new(FilterField::Financer, "ICBC"));
        let selected = filters.apply(&records, AccountingUnit::Capacity);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].financer, "ICBC");
    }

    #[test]
    fn filter_field_parses_from_key() {
        assert_eq!("source".parse::<FilterField>(), Ok(FilterField::Source));
        assert_eq!(
            "country".parse::<FilterField>(),
            Ok(FilterField::RecipientCountry)
        );
        assert!("megawatts".parse::<FilterField>().is_err());
    }
}
