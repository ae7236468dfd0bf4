use log::{debug, info, warn};

use snafu::{prelude::*, ErrorCompat, Snafu};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use survey_tabulation::codebook::Codebook;
use survey_tabulation::encoding::apply_encoding;
use survey_tabulation::*;

use clap::Parser;

use crate::args::Args;
use crate::dash::cache::LoadCache;
use crate::dash::config_reader::*;
use crate::dash::io_common::{read_codebook_entries, read_responses, Sheet};
use crate::dash::io_csv::read_csv_sheet;
use crate::dash::io_dropbox::{DropboxClient, DropboxCredentials};
use crate::dash::io_excel::read_excel_sheet;
use crate::dash::session::Session;

pub mod cache;
pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_dropbox;
pub mod io_excel;
pub mod session;

#[derive(Debug, Snafu)]
pub enum DashError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Worksheet {worksheet:?} not found in {path}"))]
    MissingWorksheet { path: String, worksheet: String },
    #[snafu(display("Excel file {path} is empty"))]
    EmptyExcel { path: String },
    #[snafu(display("Excel file {path} has several worksheets: a worksheet name is required"))]
    AmbiguousWorksheet { path: String },
    #[snafu(display("Error reading CSV file {path}"))]
    CsvParse { source: csv::Error, path: String },
    #[snafu(display("Column {column:?} not found in {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("Error opening JSON file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Unsupported file format {format:?} for {path}"))]
    UnsupportedFormat { format: String, path: String },
    #[snafu(display("Data unavailable: could not authenticate with Dropbox"))]
    DropboxAuth { source: reqwest::Error },
    #[snafu(display("Data unavailable: could not download {path}"))]
    DataUnavailable {
        source: reqwest::Error,
        path: String,
    },
    #[snafu(display("Missing Dropbox credential {name}"))]
    MissingCredential { name: String },
    #[snafu(display("Password incorrect"))]
    PasswordIncorrect {},
    #[snafu(display("Invalid datamap"))]
    Pipeline { source: PipelineError },
    #[snafu(display("Unknown data source {name:?}"))]
    UnknownDataSource { name: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type DashResult<T> = Result<T, DashError>;

const DEFAULT_DASHBOARD_NAME: &str = "Survey Dashboard";

/// Reads files from the local disk (relative to the configuration) or from Dropbox.
struct Loader<'a> {
    root: PathBuf,
    from_args: DropboxSettings,
    from_config: Option<&'a DropboxSettings>,
    client: Option<DropboxClient>,
}

impl<'a> Loader<'a> {
    // The client is only created when a file is actually requested from Dropbox.
    fn dropbox(&mut self) -> DashResult<&DropboxClient> {
        if self.client.is_none() {
            let credentials = DropboxCredentials::resolve(&self.from_args, self.from_config)?;
            self.client = Some(DropboxClient::connect(&credentials)?);
        }
        self.client
            .as_ref()
            .whatever_context("Dropbox client not initialized")
    }

    fn fetch(&mut self, provider: Provider, path: &str) -> DashResult<(String, Vec<u8>)> {
        match provider {
            Provider::Local => {
                let p: PathBuf = self.root.join(path);
                let p2 = p.as_path().display().to_string();
                info!("fetch: reading local file {:?}", p2);
                let bytes = fs::read(&p).context(OpeningFileSnafu { path: p2.clone() })?;
                Ok((p2, bytes))
            }
            Provider::Dropbox => {
                info!("fetch: downloading {:?} from Dropbox", path);
                let bytes = self.dropbox()?.download(path)?;
                Ok((path.to_string(), bytes))
            }
        }
    }

    fn read_sheet(
        &mut self,
        provider: Provider,
        path: &str,
        format: FileFormat,
        worksheet: Option<&str>,
    ) -> DashResult<Sheet> {
        match format {
            FileFormat::Csv => {
                let (full_path, bytes) = self.fetch(provider, path)?;
                read_csv_sheet(&full_path, &bytes)
            }
            FileFormat::Xlsx => {
                let (full_path, bytes) = self.fetch(provider, path)?;
                read_excel_sheet(&full_path, bytes, worksheet)
            }
            // Rejected before any download.
            FileFormat::Dta => UnsupportedFormatSnafu {
                format: "dta",
                path,
            }
            .fail(),
        }
    }

    fn load_codebook(&mut self, src: &DatamapSource) -> DashResult<Codebook> {
        let sheet = self.read_sheet(
            src.provider()?,
            &src.file_path,
            src.format()?,
            src.worksheet_name().as_deref(),
        )?;
        let entries = read_codebook_entries(&sheet)?;
        let codebook = Codebook::new(entries, src.strict_questions.unwrap_or(false))
            .context(PipelineSnafu {})?;
        info!(
            "load_codebook: {} variables, {} shared questions",
            codebook.entries().len(),
            codebook.ambiguous_questions().len()
        );
        Ok(codebook)
    }

    fn load_table(&mut self, cfs: &FileSource) -> DashResult<ResponseTable> {
        let sheet = self.read_sheet(
            cfs.provider()?,
            &cfs.file_path,
            cfs.format()?,
            cfs.excel_worksheet_name.as_deref(),
        )?;
        read_responses(&sheet, cfs)
    }
}

fn dropbox_from_args(args: &Args) -> DropboxSettings {
    DropboxSettings {
        app_key: args.dropbox_app_key.clone(),
        app_secret: args.dropbox_app_secret.clone(),
        refresh_token: args.dropbox_refresh_token.clone(),
    }
}

fn provider_from_args(args: &Args) -> String {
    if args.dropbox {
        "dropbox".to_string()
    } else {
        "local".to_string()
    }
}

fn view_from_args(args: &Args, question: &str) -> ViewConfig {
    ViewConfig {
        name: None,
        data_source: None,
        topic: args.topic.clone(),
        question: question.to_string(),
        years: args.years.clone(),
        disaggregate: args.disaggregate.clone(),
        exclude_unknown: Some(!args.include_unknown),
        weighted: Some(args.weighted),
    }
}

/// Reads the configuration file, if any, and applies the command line overrides.
///
/// Returns the configuration and the directory that local paths are relative to.
fn assemble_config(args: &Args) -> DashResult<(DashConfig, PathBuf)> {
    let (mut config, root) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root = Path::new(config_path)
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            (config, root)
        }
        None => {
            let datamap = match &args.datamap {
                Some(d) => d.clone(),
                None => whatever!("A datamap is required: use --datamap or --config"),
            };
            let config = DashConfig {
                output_settings: OutputSettings {
                    dashboard_name: DEFAULT_DASHBOARD_NAME.to_string(),
                    output_file: None,
                },
                datamap: DatamapSource {
                    provider: Some(provider_from_args(args)),
                    file_path: datamap,
                    format: None,
                    excel_worksheet_name: None,
                    strict_questions: None,
                },
                data_sources: vec![],
                dropbox: None,
                views: vec![],
            };
            (config, PathBuf::from("."))
        }
    };

    if let (Some(datamap), Some(_)) = (&args.datamap, &args.config) {
        config.datamap.file_path = datamap.clone();
    }

    if let Some(input) = &args.input {
        let mut cfs = FileSource::new(&provider_from_args(args), input);
        cfs.name = config.data_sources.first().and_then(|s| s.name.clone());
        cfs.format = args.input_type.clone();
        cfs.layout = args.layout.clone();
        cfs.excel_worksheet_name = args.excel_worksheet_name.clone();
        config.data_sources = vec![cfs];
    }

    if let Some(question) = &args.question {
        config.views = vec![view_from_args(args, question)];
    }

    ensure_whatever!(
        !config.data_sources.is_empty(),
        "No data source: use --input or the dataSources section of the configuration"
    );
    debug!("assemble_config: {:?}", config);
    Ok((config, root))
}

fn chart_kind_to_json(kind: ChartKind) -> &'static str {
    match kind {
        ChartKind::Empty => "empty",
        ChartKind::SingleYear => "singleYear",
        ChartKind::MultiYear => "multiYear",
    }
}

fn table_to_json(v: &SurveyView) -> JSValue {
    let group_label = v.table.dimension.map(|d| d.label());
    let mut rows: Vec<JSValue> = Vec::new();
    for row in v.table.rows.iter() {
        let mut m: JSMap<String, JSValue> = JSMap::new();
        if let (Some(label), Some(group)) = (group_label, &row.group) {
            m.insert(label.to_string(), json!(group));
        }
        m.insert(
            present::ANSWER_COLUMN.to_string(),
            json!(apply_encoding(&v.labels, &row.answer.to_string())),
        );
        for (year, p) in v.table.years.iter().zip(row.percentages.iter()) {
            m.insert(year.to_string(), json!(p));
        }
        rows.push(JSValue::Object(m));
    }
    json!({
        "groupLabel": group_label,
        "years": v.table.years,
        "rows": rows,
    })
}

fn results_to_json(v: &SurveyView) -> Vec<JSValue> {
    let group_label = v.table.dimension.map(|d| d.label());
    v.rows
        .iter()
        .map(|r| {
            let mut m: JSMap<String, JSValue> = JSMap::new();
            m.insert(present::YEAR_COLUMN.to_string(), json!(r.year));
            if let (Some(label), Some(group)) = (group_label, &r.group) {
                m.insert(label.to_string(), json!(group));
            }
            m.insert(present::ANSWER_COLUMN.to_string(), json!(r.answer));
            m.insert(present::PERCENTAGE_COLUMN.to_string(), json!(r.percentage));
            JSValue::Object(m)
        })
        .collect()
}

fn view_to_json(view: &ViewConfig, v: &SurveyView) -> JSValue {
    let chart = &v.chart;
    let report = &v.report;
    json!({
        "name": view.name,
        "variable": v.entry.variable,
        "topic": v.entry.topic,
        "question": v.entry.question_text,
        "encodings": v.entry.encoding,
        "labels": v.labels,
        "labelsAvailable": v.labels_available,
        "table": table_to_json(v),
        "results": results_to_json(v),
        "chart": {
            "kind": chart_kind_to_json(chart.kind),
            "x": chart.x,
            "y": chart.y,
            "color": chart.color,
            "barmode": chart.barmode,
            "facetCol": chart.facet_col,
            "title": chart.title,
            "subtitle": chart.subtitle,
            "panelTitle": chart.panel_title,
            "panelSubtitle": chart.panel_subtitle,
        },
        "filter": {
            "input": report.input,
            "unmatched": report.unmatched,
            "otherVariables": report.other_variables,
            "droppedYears": report.dropped_years,
            "droppedUnknown": report.dropped_unknown,
            "droppedMissingGroup": report.dropped_missing_group,
            "output": report.output,
        },
    })
}

fn list_selectors(codebook: &Codebook, tables: &[(String, Rc<ResponseTable>)]) {
    for topic in codebook.topics() {
        println!("{}", topic);
        for question in codebook.questions(topic) {
            println!("    {}", question);
        }
    }
    for (name, table) in tables.iter() {
        println!("{}: years {:?}", name, table.years());
    }
}

fn write_output(out: &str, content: &str) -> DashResult<()> {
    if out == "stdout" {
        println!("{}", content);
        Ok(())
    } else {
        info!("write_output: writing summary to {:?}", out);
        fs::write(out, content).context(OpeningFileSnafu { path: out })
    }
}

/// Builds every configured view and writes the summary.
pub fn run_dashboard(args: &Args) -> DashResult<()> {
    if let Some(secret) = &args.password_secret {
        let mut session = Session::new();
        let attempt = args.password.clone().unwrap_or_default();
        session.enter_password(&attempt, secret);
        debug!("run_dashboard: session {:?}", session.status());
        ensure!(session.is_authenticated(), PasswordIncorrectSnafu {});
    }

    let (config, root) = assemble_config(args)?;
    info!("run_dashboard: {:?}", config.output_settings.dashboard_name);

    let mut loader = Loader {
        root: root.clone(),
        from_args: dropbox_from_args(args),
        from_config: config.dropbox.as_ref(),
        client: None,
    };
    let mut tables: LoadCache<ResponseTable> = LoadCache::new();

    let codebook = loader.load_codebook(&config.datamap)?;

    if args.list {
        let mut loaded: Vec<(String, Rc<ResponseTable>)> = Vec::new();
        for cfs in config.data_sources.iter() {
            let key = LoadCache::<ResponseTable>::key(&cfs.cache_key_parts());
            let table = tables.get_or_try_load(&key, || loader.load_table(cfs))?;
            loaded.push((cfs.display_name(), table));
        }
        list_selectors(&codebook, &loaded);
        return Ok(());
    }

    ensure_whatever!(
        !config.views.is_empty(),
        "No view to display: use --question or the views section of the configuration"
    );

    let mut views_js: Vec<JSValue> = Vec::new();
    for view in config.views.iter() {
        let cfs = config.data_source(view.data_source.as_deref())?;
        let key = LoadCache::<ResponseTable>::key(&cfs.cache_key_parts());
        let table = tables.get_or_try_load(&key, || loader.load_table(cfs))?;
        let selection = view.selection()?;
        match tabulate(&codebook, &table, &selection) {
            Ok(v) => views_js.push(view_to_json(view, &v)),
            Err(e @ PipelineError::UnknownQuestion { .. }) => {
                warn!("run_dashboard: {}", e);
                views_js.push(json!({
                    "name": view.name,
                    "question": view.question,
                    "error": e.to_string(),
                }));
            }
            Err(e) => return Err(e).context(PipelineSnafu {}),
        }
    }
    debug!(
        "run_dashboard: table cache: {} hits, {} misses",
        tables.hits(),
        tables.misses()
    );

    let summary_js = json!({
        "config": {
            "dashboardName": config.output_settings.dashboard_name,
        },
        "views": views_js,
    });
    let pretty_js_summary =
        serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {})?;

    let out = match (&args.out, &config.output_settings.output_file) {
        (Some(out), _) => Some(out.clone()),
        (None, Some(f)) => Some(root.join(f).display().to_string()),
        (None, None) => None,
    };
    write_output(out.as_deref().unwrap_or("stdout"), &pretty_js_summary)?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_summary {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_summary.as_str(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

pub fn report_error(e: &DashError) {
    eprintln!("An error occurred: {}", e);
    let mut source = std::error::Error::source(e);
    while let Some(s) = source {
        eprintln!("  caused by: {}", s);
        source = std::error::Error::source(s);
    }
    if let Some(bt) = ErrorCompat::backtrace(e) {
        eprintln!("trace: {}", bt);
    }
}

/// Parses test arguments. The password variables of the environment only
/// apply when the test passes `--password-secret` itself.
#[cfg(test)]
fn test_args(items: &[&str]) -> Args {
    let mut args = Args::parse_from(items.iter().copied());
    if !items.contains(&"--password-secret") {
        args.password_secret = None;
        args.password = None;
    }
    args
}

#[cfg(test)]
fn run_dashboard_test(test_name: &str, config_lpath: &str, summary_lpath: &str) {
    let test_dir = option_env!("SURVEYDASH_TEST_DIR")
        .unwrap_or(concat!(env!("CARGO_MANIFEST_DIR"), "/tests"));
    info!("Running test {}", test_name);
    let config_path = format!("{}/{}/{}", test_dir, test_name, config_lpath);
    let summary_path = format!("{}/{}/{}", test_dir, test_name, summary_lpath);
    let args = test_args(&[
        "surveydash",
        "--config",
        config_path.as_str(),
        "--reference",
        summary_path.as_str(),
        "--out",
        "stdout",
    ]);
    let res = run_dashboard(&args);
    if let Err(e) = res {
        report_error(&e);
        panic!("test {} failed: {}", test_name, e);
    }
}

#[cfg(test)]
pub fn test_wrapper(test_name: &str) {
    run_dashboard_test(
        test_name,
        format!("{}_config.json", test_name).as_str(),
        format!("{}_expected_summary.json", test_name).as_str(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_survey() {
        test_wrapper("wide_survey");
    }

    #[test]
    fn aggregated_survey() {
        test_wrapper("aggregated_survey");
    }

    #[test]
    fn dta_is_rejected() {
        let args = test_args(&[
            "surveydash",
            "--datamap",
            concat!(env!("CARGO_MANIFEST_DIR"), "/tests/wide_survey/datamap.csv"),
            "--input",
            "USA_data.dta",
            "--question",
            "Do you feel safe?",
        ]);
        let res = run_dashboard(&args);
        assert!(matches!(res, Err(DashError::UnsupportedFormat { .. })));
    }

    #[test]
    fn password_is_checked_first() {
        let args = test_args(&[
            "surveydash",
            "--config",
            "does_not_exist.json",
            "--password-secret",
            "secret",
            "--password",
            "guess",
        ]);
        let res = run_dashboard(&args);
        assert!(matches!(res, Err(DashError::PasswordIncorrect {})));
    }

    #[test]
    fn excel_datamap() {
        let args = test_args(&[
            "surveydash",
            "--datamap",
            concat!(env!("CARGO_MANIFEST_DIR"), "/tests/excel/datamap.xlsx"),
            "--input",
            concat!(env!("CARGO_MANIFEST_DIR"), "/tests/wide_survey/data.csv"),
            "--question",
            "Do you feel safe?",
            "--out",
            "stdout",
        ]);
        let res = run_dashboard(&args);
        if let Err(e) = &res {
            report_error(e);
        }
        assert!(res.is_ok());
    }

    #[test]
    fn password_variables_are_ignored_by_tests() {
        std::env::set_var("SURVEYDASH_PASSWORD_SECRET", "from-the-environment");
        let args = test_args(&["surveydash", "--input", "data.csv"]);
        assert_eq!(args.password_secret, None);
        assert_eq!(args.password, None);
        let args = test_args(&[
            "surveydash",
            "--input",
            "data.csv",
            "--password-secret",
            "secret",
        ]);
        assert_eq!(args.password_secret.as_deref(), Some("secret"));
        std::env::remove_var("SURVEYDASH_PASSWORD_SECRET");
    }

    #[test]
    fn missing_datamap() {
        let args = test_args(&["surveydash", "--input", "data.csv"]);
        let res = run_dashboard(&args);
        assert!(matches!(res, Err(DashError::Whatever { .. })));
    }

    #[test]
    fn missing_local_file() {
        let args = test_args(&[
            "surveydash",
            "--datamap",
            "no_such_datamap.csv",
            "--input",
            "data.csv",
        ]);
        let res = run_dashboard(&args);
        assert!(matches!(res, Err(DashError::OpeningFile { .. })));
    }
}
