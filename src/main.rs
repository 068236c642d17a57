use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use sav2xlsx::cli;
use sav2xlsx::config::{BatchConfig, ConvertConfig, DEFAULT_OUTPUT_DIR, DEFAULT_SHEET_NAME};
use sav2xlsx::logging::{init_logging, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sav2xlsx")]
#[command(about = "Convert SPSS .sav files to Excel .xlsx workbooks")]
#[command(long_about = "sav2xlsx - SPSS .sav to Excel .xlsx converter

Column headers become the variables' labels, coded values become their value
labels, and date columns are written as YYYY-MM-DD.

EXAMPLES:
  sav2xlsx survey.sav survey.xlsx           # Convert one file
  sav2xlsx survey.sav Converted/            # Write Converted/survey.xlsx
  sav2xlsx batch data/ extra.sav -o out     # Convert every .sav under data/
  sav2xlsx in.sav out.xlsx --date-column Date_Discussed_MTB

Set RUST_LOG to override the log filter (logs go to stderr).")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input .sav file
    #[arg(required = true)]
    input: Option<PathBuf>,

    /// Output .xlsx file, or an existing directory to write <stem>.xlsx into
    #[arg(required = true)]
    output: Option<PathBuf>,

    #[command(flatten)]
    options: ConvertArgs,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Convert many .sav files at once.

Directories are searched recursively for files ending in .sav (any case).
Each input is written to <OUTPUT_DIR>/<stem>.xlsx. A summary is printed at
the end; the exit code is non-zero if nothing was found or any file failed.")]
    /// Convert several files and/or directories of .sav files
    Batch {
        /// Input .sav files and/or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        #[command(flatten)]
        options: ConvertArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct ConvertArgs {
    /// Also treat this column as an SPSS date (repeatable)
    #[arg(long = "date-column", value_name = "NAME")]
    date_columns: Vec<String>,

    /// Keep coded values instead of replacing them with value labels
    #[arg(long)]
    raw_values: bool,

    /// Worksheet name
    #[arg(long, default_value = DEFAULT_SHEET_NAME)]
    sheet_name: String,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl ConvertArgs {
    fn to_config(&self) -> ConvertConfig {
        ConvertConfig::default()
            .with_date_columns(self.date_columns.iter().cloned())
            .with_value_labels(!self.raw_values)
            .with_sheet_name(self.sheet_name.clone())
    }

    fn init_logging(&self) {
        if let Err(e) = init_logging(&LogConfig::from_verbosity(self.verbose)) {
            eprintln!("{}", e.yellow());
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Batch {
            paths,
            output_dir,
            options,
        }) => {
            options.init_logging();
            let config = BatchConfig {
                output_dir,
                convert: options.to_config(),
            };
            match cli::batch(paths, &config) {
                Ok(summary) if summary.all_succeeded() => ExitCode::SUCCESS,
                Ok(_) => ExitCode::FAILURE,
                Err(e) => fail(e),
            }
        }

        None => {
            cli.options.init_logging();
            // clap enforces both positionals when no subcommand is given
            let (Some(input), Some(output)) = (cli.input, cli.output) else {
                return ExitCode::from(2);
            };
            match cli::convert(input, output, &cli.options.to_config()) {
                Ok(_) => ExitCode::SUCCESS,
                Err(e) => fail(e),
            }
        }
    }
}

fn fail(error: impl std::fmt::Display) -> ExitCode {
    eprintln!("{} {}", "❌ Error:".bold().red(), error);
    ExitCode::FAILURE
}
