use log::debug;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fs;

use survey_tabulation::{DisaggregateMode, GroupDimension, Selection};

use crate::dash::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "dashboardName")]
    pub dashboard_name: String,
    /// Where to write the summary, relative to the configuration file.
    #[serde(rename = "outputFile")]
    pub output_file: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum FileFormat {
    Csv,
    Xlsx,
    Dta,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Layout {
    Wide,
    Long,
    Aggregated,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Provider {
    Local,
    Dropbox,
}

fn parse_provider(provider: &str) -> DashResult<Provider> {
    match provider {
        "local" | "" => Ok(Provider::Local),
        "dropbox" => Ok(Provider::Dropbox),
        x => whatever!("unknown provider {:?}", x),
    }
}

// Uses the declared format, or the extension of the file.
fn parse_format(format: &Option<String>, file_path: &str) -> DashResult<FileFormat> {
    let f = match format {
        Some(f) => f.to_lowercase(),
        None => file_path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default(),
    };
    match f.as_str() {
        "csv" => Ok(FileFormat::Csv),
        "xlsx" | "excel" => Ok(FileFormat::Xlsx),
        "dta" | "stata" => Ok(FileFormat::Dta),
        _ => UnsupportedFormatSnafu {
            format: f.clone(),
            path: file_path,
        }
        .fail(),
    }
}

/// The location of the datamap.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DatamapSource {
    pub provider: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub format: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    /// Fails the load if two variables share the same question text.
    #[serde(rename = "strictQuestions")]
    pub strict_questions: Option<bool>,
}

impl DatamapSource {
    pub const DEFAULT_WORKSHEET: &'static str = "Data Map";

    pub fn provider(&self) -> DashResult<Provider> {
        parse_provider(self.provider.as_deref().unwrap_or("local"))
    }

    pub fn format(&self) -> DashResult<FileFormat> {
        parse_format(&self.format, &self.file_path)
    }

    pub fn worksheet_name(&self) -> Option<String> {
        match (&self.excel_worksheet_name, self.format()) {
            (Some(n), _) => Some(n.clone()),
            (None, Ok(FileFormat::Xlsx)) => Some(Self::DEFAULT_WORKSHEET.to_string()),
            _ => None,
        }
    }
}

/// The location and the layout of a response file.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub name: Option<String>,
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub format: Option<String>,
    pub layout: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "yearColumn")]
    pub year_column: Option<String>,
    #[serde(rename = "variableColumn")]
    pub variable_column: Option<String>,
    #[serde(rename = "answerColumn")]
    pub answer_column: Option<String>,
    #[serde(rename = "politicalAffiliationColumn")]
    pub political_affiliation_column: Option<String>,
    #[serde(rename = "ethnicityColumn")]
    pub ethnicity_column: Option<String>,
    #[serde(rename = "weightColumn")]
    pub weight_column: Option<String>,
    #[serde(rename = "percentageColumn")]
    pub percentage_column: Option<String>,
    #[serde(rename = "sampleGroupColumn")]
    pub sample_group_column: Option<String>,
    /// The demographic dimension of the sample groups of an aggregated table.
    #[serde(rename = "sampleGroupDimension")]
    pub sample_group_dimension: Option<String>,
}

impl FileSource {
    pub fn new(provider: &str, file_path: &str) -> FileSource {
        FileSource {
            name: None,
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            format: None,
            layout: None,
            excel_worksheet_name: None,
            year_column: None,
            variable_column: None,
            answer_column: None,
            political_affiliation_column: None,
            ethnicity_column: None,
            weight_column: None,
            percentage_column: None,
            sample_group_column: None,
            sample_group_dimension: None,
        }
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.file_path.clone())
    }

    pub fn provider(&self) -> DashResult<Provider> {
        parse_provider(&self.provider)
    }

    pub fn format(&self) -> DashResult<FileFormat> {
        parse_format(&self.format, &self.file_path)
    }

    pub fn layout(&self) -> DashResult<Layout> {
        match self.layout.as_deref() {
            None | Some("wide") => Ok(Layout::Wide),
            Some("long") => Ok(Layout::Long),
            Some("aggregated") => Ok(Layout::Aggregated),
            Some(x) => whatever!("unknown layout {:?} for {}", x, self.file_path),
        }
    }

    pub fn year_column(&self) -> &str {
        self.year_column.as_deref().unwrap_or("year")
    }

    pub fn variable_column(&self) -> &str {
        self.variable_column.as_deref().unwrap_or("variable")
    }

    pub fn answer_column(&self) -> &str {
        self.answer_column.as_deref().unwrap_or("answer")
    }

    pub fn political_affiliation_column(&self) -> &str {
        self.political_affiliation_column
            .as_deref()
            .unwrap_or("political_aff")
    }

    pub fn ethnicity_column(&self) -> &str {
        self.ethnicity_column.as_deref().unwrap_or("ethnicity")
    }

    pub fn percentage_column(&self) -> &str {
        self.percentage_column.as_deref().unwrap_or("percentage")
    }

    pub fn sample_group_column(&self) -> &str {
        self.sample_group_column.as_deref().unwrap_or("sample_group")
    }

    pub fn sample_group_dimension(&self) -> DashResult<GroupDimension> {
        match self.sample_group_dimension.as_deref() {
            None => Ok(GroupDimension::PoliticalAffiliation),
            Some(x) => parse_dimension(x),
        }
    }

    /// The parameters that identify the content loaded from this source.
    pub fn cache_key_parts(&self) -> Vec<String> {
        vec![
            self.provider.clone(),
            self.file_path.clone(),
            format!("{:?}", self.format),
            format!("{:?}", self.layout),
            format!("{:?}", self.excel_worksheet_name),
            self.year_column().to_string(),
            self.variable_column().to_string(),
            self.answer_column().to_string(),
            self.political_affiliation_column().to_string(),
            self.ethnicity_column().to_string(),
            format!("{:?}", self.weight_column),
            self.percentage_column().to_string(),
            self.sample_group_column().to_string(),
            format!("{:?}", self.sample_group_dimension),
        ]
    }
}

fn parse_dimension(s: &str) -> DashResult<GroupDimension> {
    match s {
        "politicalAffiliation" | "political" | "political_aff" => {
            Ok(GroupDimension::PoliticalAffiliation)
        }
        "ethnicity" => Ok(GroupDimension::Ethnicity),
        x => whatever!("unknown demographic dimension {:?}", x),
    }
}

pub fn parse_disaggregate(s: Option<&str>) -> DashResult<DisaggregateMode> {
    match s {
        None | Some("none") | Some("") => Ok(DisaggregateMode::None),
        Some(x) => parse_dimension(x).map(DisaggregateMode::By),
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct DropboxSettings {
    #[serde(rename = "appKey")]
    pub app_key: Option<String>,
    #[serde(rename = "appSecret")]
    pub app_secret: Option<String>,
    #[serde(rename = "refreshToken")]
    pub refresh_token: Option<String>,
}

/// One question to display.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    pub name: Option<String>,
    /// The name of the data source. Defaults to the first one.
    #[serde(rename = "dataSource")]
    pub data_source: Option<String>,
    pub topic: Option<String>,
    pub question: String,
    pub years: Option<Vec<i32>>,
    pub disaggregate: Option<String>,
    #[serde(rename = "excludeUnknown")]
    pub exclude_unknown: Option<bool>,
    pub weighted: Option<bool>,
}

impl ViewConfig {
    pub fn selection(&self) -> DashResult<Selection> {
        Ok(Selection {
            topic: self.topic.clone(),
            question_text: self.question.clone(),
            years: self.years.clone().unwrap_or_default(),
            disaggregate: parse_disaggregate(self.disaggregate.as_deref())?,
            exclude_unknown: self.exclude_unknown.unwrap_or(true),
            weighted: self.weighted.unwrap_or(false),
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DashConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    pub datamap: DatamapSource,
    #[serde(rename = "dataSources")]
    pub data_sources: Vec<FileSource>,
    pub dropbox: Option<DropboxSettings>,
    #[serde(default)]
    pub views: Vec<ViewConfig>,
}

impl DashConfig {
    pub fn data_source(&self, name: Option<&str>) -> DashResult<&FileSource> {
        match name {
            None => self.data_sources.first().context(UnknownDataSourceSnafu {
                name: "<first>",
            }),
            Some(n) => self
                .data_sources
                .iter()
                .find(|s| s.name.as_deref() == Some(n))
                .context(UnknownDataSourceSnafu { name: n }),
        }
    }
}

pub fn read_config(path: &str) -> DashResult<DashConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: DashConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: &str) -> DashResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}
