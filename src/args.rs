use clap::Parser;

/// This is a dashboard program for survey questionnaires: it tabulates the answers to a question
/// by year and demographic group.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the datamap, the data sources and the views
    /// to compute. Local paths in this file are relative to its directory.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference file containing the expected summary in JSON format. If provided,
    /// surveydash will check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary will be written in JSON format to the
    /// given location. Setting this option overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) The datamap describing the survey variables (xlsx or csv). Overrides the datamap
    /// of the configuration.
    #[clap(short, long, value_parser)]
    pub datamap: Option<String>,

    /// (file path) The file containing the responses. Overrides the data sources of the configuration.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (csv, xlsx or empty) The format of the input. By default, it is deduced from the file extension.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default wide) The layout of the input: wide, long or aggregated.
    #[clap(long, value_parser)]
    pub layout: Option<String>,

    /// When using an Excel file as input, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// If passed as an argument, the datamap and the input are read from Dropbox.
    #[clap(long, takes_value = false)]
    pub dropbox: bool,

    #[clap(long, value_parser, env = "DROPBOX_APP_KEY", hide_env_values = true)]
    pub dropbox_app_key: Option<String>,

    #[clap(long, value_parser, env = "DROPBOX_APP_SECRET", hide_env_values = true)]
    pub dropbox_app_secret: Option<String>,

    #[clap(long, value_parser, env = "DROPBOX_REFRESH_TOKEN", hide_env_values = true)]
    pub dropbox_refresh_token: Option<String>,

    // The selection
    /// The topic of the question. If not specified, the question is looked up in all the topics.
    #[clap(long, value_parser)]
    pub topic: Option<String>,

    /// The exact text of the question to display.
    #[clap(short, long, value_parser)]
    pub question: Option<String>,

    /// (repeatable) The years to display. All the years are displayed if none is specified.
    #[clap(long, value_parser)]
    pub years: Option<Vec<i32>>,

    /// (none, political or ethnicity) Breaks the answers down by demographic group.
    #[clap(long, value_parser)]
    pub disaggregate: Option<String>,

    /// If passed as an argument, the "don't know" answers are kept.
    #[clap(long, takes_value = false)]
    pub include_unknown: bool,

    /// If passed as an argument, the answers are weighted by the weight column of the input.
    #[clap(long, takes_value = false)]
    pub weighted: bool,

    /// If passed as an argument, lists the topics, the questions and the years available, and exits.
    #[clap(long, takes_value = false)]
    pub list: bool,

    /// The password of the dashboard, required when a password secret is set.
    #[clap(long, value_parser, env = "SURVEYDASH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[clap(long, value_parser, env = "SURVEYDASH_PASSWORD_SECRET", hide_env_values = true)]
    pub password_secret: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
