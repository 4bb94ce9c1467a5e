use clap::Parser;

/// Builds an HTML report of the turnout of an election, from the per-locality results.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. Every setting has a default, so the
    /// file only needs to contain the settings that change (column names, chart titles, texts).
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path, default Adatbazis.xlsx) The file with one row per locality. Setting this
    /// option overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (xlsx or csv) The type of the input. By default, it is inferred from the extension of the file.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (file path, default jelentes.html) Where the HTML report is written.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the numbers behind the charts will be written
    /// in JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub summary: Option<String>,

    /// (file path) A summary produced by an earlier run. If provided, the program checks that the
    /// computed summary matches it, and fails otherwise.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (default 10) The number of localities in the ranking of the highest turnouts.
    #[clap(long, value_parser)]
    pub top_n: Option<usize>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
