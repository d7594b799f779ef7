//! Deduplicating flow aggregation and spatial layout for financial-flow
//! datasets.
//!
//! The pipeline is a pure function of its inputs: raw rows are admitted into
//! an immutable record universe, a filter selection picks the working set,
//! and [`graph::rebuild`] derives a fresh node/link graph with linear scale
//! ranges. Geometry and SVG rendering sit on top through a [`Projection`]
//! seam so an embedding map can supply its own coordinate transform.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod filter;
pub mod geometry;
pub mod graph;
pub mod record;
pub mod render;
pub mod summary;

pub use config::{load_config, CurveConfig, EngineConfig, ScaleConfig, StyleConfig};
pub use filter::{Drill, FilterField, FilterSet, Scope, UnknownFilterField};
pub use geometry::{
    link_controls, link_path, link_width, node_radius, EquirectProjection, GeoBounds, Projection,
    ScreenPoint,
};
pub use graph::{
    rebuild, FlowRange, GraphResult, Link, Node, RebuildError, Role, ScaleRanges,
};
pub use record::{
    admit, AccountingUnit, Coordinate, Dataset, FlowRecord, RawRecord, TargetView,
};
pub use render::render_svg;
pub use summary::{
    financer_breakdown, institution_shares, rank_inflows, rank_outflows, unit_details,
    FinancerFlow, InstitutionShare, RankedFlow, UnitDetail,
};

#[cfg(feature = "cli")]
pub use cli::run;
