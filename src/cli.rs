use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::load_config;
use crate::filter::{Drill, FilterField, FilterSet, Scope};
use crate::geometry::{EquirectProjection, GeoBounds};
use crate::graph::rebuild;
use crate::record::{AccountingUnit, Dataset, RawRecord, TargetView};
use crate::render::render_svg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Svg,
}

#[derive(Parser, Debug)]
#[command(name = "flowmap", version, about = "Aggregate financial-flow records into a spatial graph")]
struct Cli {
    /// Input JSON file of flow records ('-' or omitted reads stdin)
    input: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// JSON config file overriding scale, curve and style defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How targets are keyed
    #[arg(long, value_enum, default_value = "country")]
    view: TargetView,

    /// Measure flows are denominated in
    #[arg(short, long, value_enum, default_value = "capacity")]
    units: AccountingUnit,

    /// Era the selection is restricted to
    #[arg(long, default_value = "financing")]
    era: String,

    /// Keep only these finance types (repeatable)
    #[arg(long = "finance-type")]
    finance_types: Vec<String>,

    /// Keep only these financier classifications (repeatable)
    #[arg(long = "financer-type")]
    financer_types: Vec<String>,

    /// Keep only closed-era records with this close year
    #[arg(long)]
    close_year: Option<i32>,

    /// Restrict to domestic or international flows
    #[arg(long, value_enum)]
    scope: Option<Scope>,

    /// Drill-down predicate, as field=value (fields: source, target,
    /// country, financer)
    #[arg(long = "filter", value_parser = parse_drill)]
    drill: Option<Drill>,

    /// Canvas width in pixels (SVG output)
    #[arg(short = 'W', long, default_value_t = 1200.0)]
    width: f64,

    /// Canvas height in pixels (SVG output)
    #[arg(short = 'H', long, default_value_t = 800.0)]
    height: f64,
}

fn parse_drill(raw: &str) -> Result<Drill, String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{raw}'"))?;
    let field: FilterField = field.trim().parse().map_err(|err| format!("{err}"))?;
    Ok(Drill::new(field, value.trim()))
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn write_output(text: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let contents = read_input(cli.input.as_deref())?;
    let rows: Vec<RawRecord> =
        serde_json::from_str(&contents).context("failed to parse input records")?;
    let dataset = Dataset::from_rows(&rows);
    anyhow::ensure!(!dataset.is_empty(), "no admissible records in input");

    let filters = FilterSet {
        era: cli.era,
        finance_types: cli.finance_types,
        financer_types: cli.financer_types,
        close_year: cli.close_year,
        scope: cli.scope,
        drill: cli.drill,
    };

    let records = dataset.view(cli.view);
    let graph = rebuild(records, &filters, cli.units, None, true)?;

    let rendered = match cli.format {
        OutputFormat::Json => serde_json::to_string_pretty(&graph)?,
        OutputFormat::Svg => {
            let bounds = GeoBounds::of(records)
                .context("no finite coordinates to fit a projection to")?;
            let projection = EquirectProjection::new(bounds, cli.width, cli.height, 20.0);
            render_svg(&graph, &projection, &config, cli.width, cli.height)
        }
    };
    write_output(&rendered, cli.output.as_deref())
}
