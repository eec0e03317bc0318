use clap::{Parser, Subcommand};

/// This is the school survey data tool: spreadsheet templates, imports and backend payloads.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Writes the bulk-edit spreadsheet of a category, prefilled with the stored records if
    /// any are given.
    Template(JobArgs),
    /// Reads a filled spreadsheet and writes the survey documents it contains, in JSON format.
    Import(JobArgs),
    /// Reads a filled spreadsheet and writes the payloads for the backend, in JSON format.
    Payload {
        #[clap(flatten)]
        job: JobArgs,
        /// If passed as an argument, builds a batch update merged with the stored records
        /// instead of create payloads.
        #[clap(long, takes_value = false)]
        update: bool,
    },
}

#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct JobArgs {
    /// (file path, optional) A JSON job file. Values given on the command line override the
    /// values of the file. See the manual for the format.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// The category code of the schools (SD, SMP, TK, PAUD, PKBM).
    #[clap(long, value_parser)]
    pub category: Option<String>,

    /// (file path) The filled spreadsheet (.xlsx, .xls, .ods or .csv), or a JSON file of survey
    /// documents.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default: guessed from the extension) The type of the input: excel, csv or json.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (file path, optional) The records stored by the backend, as a JSON array.
    #[clap(long, value_parser)]
    pub records: Option<String>,

    /// (file path, 'stdout' or empty) Where to write the output. Templates are written in
    /// Excel format unless the path ends with .csv.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file in JSON format. If provided, sekolah will check that the
    /// output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// The sub-district label to send instead of the one typed in the sheet.
    #[clap(long, value_parser)]
    pub subdistrict: Option<String>,

    /// The village label to send instead of the one typed in the sheet.
    #[clap(long, value_parser)]
    pub village: Option<String>,

    /// (default: the first worksheet) When using an Excel file, indicates the name of the
    /// worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,
}
