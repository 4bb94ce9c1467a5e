use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use calamine::{open_workbook, Reader, Xlsx};
use resvg::usvg;

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use turnout_stats::{derive_all, Aggregates, Dataset, StatsError};

pub mod charts;
pub mod config_reader;
pub mod html;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;

use crate::args::Args;
use crate::report::config_reader::*;

#[derive(Debug, Snafu)]
pub enum ReportError {
    #[snafu(display("The source file {path} does not exist"))]
    SourceMissing { path: String },
    #[snafu(display("Error opening Excel file {path}"))]
    SourceUnavailable {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvSourceUnavailable { source: csv::Error, path: String },
    #[snafu(display("Error parsing CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("The source {path} has no worksheet or no header"))]
    EmptySource { path: String },
    #[snafu(display("Unknown input type {input_type:?} (expected xlsx or csv)"))]
    UnknownInputType { input_type: String },
    #[snafu(display("The source contains no usable row"))]
    EmptyDataset {},
    #[snafu(display("Error building chart {chart}"))]
    ChartParsing { source: usvg::Error, chart: String },
    #[snafu(display("Cannot allocate the drawing surface for chart {chart}"))]
    ChartSurface { chart: String },
    #[snafu(display("Error encoding chart {chart}: {message}"))]
    ChartEncoding { chart: String, message: String },
    #[snafu(display("Error writing {path}"))]
    WritingReport {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening JSON file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Difference detected between the computed summary and the reference {path}"))]
    ReferenceMismatch { path: String },
}

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum InputType {
    Excel,
    Csv,
}

impl InputType {
    /// Uses the explicit type if provided, otherwise looks at the extension of the file.
    pub fn resolve(input_type: Option<&str>, path: &str) -> ReportResult<InputType> {
        match input_type {
            Some("xlsx") | Some("excel") => Ok(InputType::Excel),
            Some("csv") => Ok(InputType::Csv),
            Some(x) => UnknownInputTypeSnafu { input_type: x }.fail(),
            None => {
                let ext = Path::new(path)
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_lowercase());
                match ext.as_deref() {
                    Some("csv") => Ok(InputType::Csv),
                    _ => Ok(InputType::Excel),
                }
            }
        }
    }
}

/// The records read from a source.
#[derive(Debug)]
pub struct LoadedSource {
    pub dataset: Dataset,
    /// The configured columns that the source does not have, in the order of the
    /// configuration.
    pub missing_columns: Vec<String>,
}

/// Reads the records of the source, keeping only the configured columns.
pub fn read_source(
    path: &str,
    input_type: InputType,
    cols: &ColumnConfig,
) -> ReportResult<LoadedSource> {
    ensure!(Path::new(path).exists(), SourceMissingSnafu { path });
    info!("Attempting to read {:?} source {:?}", input_type, path);
    match input_type {
        InputType::Excel => io_excel::read_excel_source(path, cols),
        InputType::Csv => io_csv::read_csv_source(path, cols),
    }
}

/// The summary of all the views, in JSON.
pub fn aggregates_to_json(aggs: &Aggregates) -> JSValue {
    let county_turnout: Vec<JSValue> = aggs
        .county_turnout
        .iter()
        .map(|g| {
            json!({
                "county": g.key,
                "votesCast": g.votes_cast,
                "registered": g.registered,
                "ratio": g.ratio,
            })
        })
        .collect();
    let settlement_turnout: Vec<JSValue> = aggs
        .settlement_turnout
        .iter()
        .map(|g| {
            json!({
                "settlement": g.key.label(),
                "votesCast": g.votes_cast,
                "registered": g.registered,
                "ratio": g.ratio,
            })
        })
        .collect();
    let age_distribution: Vec<JSValue> = aggs
        .age_distribution
        .buckets
        .iter()
        .map(|b| json!({"age": b.age, "female": b.female, "male": b.male}))
        .collect();
    let top_localities: Vec<JSValue> = aggs
        .top_localities
        .iter()
        .map(|l| json!({"row": l.row, "locality": l.locality, "ratio": l.ratio}))
        .collect();
    let sex_by_county: Vec<JSValue> = aggs
        .sex_by_county
        .iter()
        .map(|c| json!({"county": c.county, "male": c.male, "female": c.female}))
        .collect();
    json!({
        "countyTurnout": county_turnout,
        "settlementTurnout": settlement_turnout,
        "sexTotals": {"male": aggs.sex_totals.male, "female": aggs.sex_totals.female},
        "ageDistribution": age_distribution,
        "topLocalities": top_localities,
        "sexByCounty": sex_by_county,
    })
}

// The configuration file first, then the command line on top.
fn build_config(args: &Args) -> ReportResult<ReportConfig> {
    let mut config = match &args.config {
        Some(p) => {
            info!("Reading configuration {:?}", p);
            read_config(p)?
        }
        None => ReportConfig::default(),
    };
    if let Some(input) = &args.input {
        config.source_path = input.clone();
    }
    if let Some(input_type) = &args.input_type {
        config.input_type = Some(input_type.clone());
    }
    if let Some(out) = &args.out {
        config.output_path = out.clone();
    }
    if let Some(top_n) = args.top_n {
        config.top_n = top_n;
    }
    Ok(config)
}

pub fn run_report(args: &Args) -> ReportResult<()> {
    let config = build_config(args)?;
    debug!("run_report: config: {:?}", config);

    let input_type = InputType::resolve(config.input_type.as_deref(), &config.source_path)?;
    let source = read_source(&config.source_path, input_type, &config.columns)?;
    if !source.missing_columns.is_empty() {
        info!(
            "{} configured columns are not in the source",
            source.missing_columns.len()
        );
    }

    let aggs = derive_all(&source.dataset, config.top_n).map_err(|e| match e {
        StatsError::EmptyDataset => ReportError::EmptyDataset {},
    })?;
    // The records are no longer needed once the views are computed.
    drop(source);

    let charts = charts::render_charts(&aggs, &config.charts)?;
    let doc = html::assemble_html(&config, &charts);
    fs::write(&config.output_path, doc).context(WritingReportSnafu {
        path: config.output_path.clone(),
    })?;
    info!("Report written to {:?}", config.output_path);
    println!("{}", config.success_message);

    let summary_js = aggregates_to_json(&aggs);
    let pretty_summary = serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {})?;
    match args.summary.as_deref() {
        None | Some("") => {}
        Some("stdout") => println!("{}", pretty_summary),
        Some(p) => {
            fs::write(p, &pretty_summary).context(WritingReportSnafu { path: p })?;
            info!("Summary written to {:?}", p);
        }
    }

    // The reference summary, if provided for comparison
    if let Some(reference_p) = &args.reference {
        let summary_ref = read_summary(reference_p)?;
        if summary_ref != summary_js {
            let pretty_summary_ref =
                serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
            warn!("Found differences with the reference summary");
            print_diff(pretty_summary_ref.as_str(), pretty_summary.as_str(), "\n");
            return ReferenceMismatchSnafu {
                path: reference_p.clone(),
            }
            .fail();
        }
        info!("The summary matches the reference {:?}", reference_p);
    }
    Ok(())
}
