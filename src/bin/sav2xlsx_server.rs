//! sav2xlsx upload server binary
//!
//! Serves a browser upload form and converts posted .sav files to .xlsx.

use clap::Parser;
use sav2xlsx::api::{run_server, ServerConfig};
use sav2xlsx::config::ConvertConfig;
use sav2xlsx::logging::{init_logging, LogConfig};

#[derive(Parser, Debug)]
#[command(name = "sav2xlsx-server")]
#[command(version)]
#[command(about = "Web upload form for converting SPSS .sav files to Excel .xlsx")]
#[command(long_about = r#"
sav2xlsx upload server

Endpoints:
  - GET  /                 - Upload form
  - POST /api/v1/convert   - Multipart upload (field "file"), returns the .xlsx
  - GET  /health           - Health check
  - GET  /version          - Server version info

Example usage:
  sav2xlsx-server                          # Start on localhost:7860
  sav2xlsx-server --host 0.0.0.0 --port 8080

  curl -F file=@survey.sav http://localhost:7860/api/v1/convert -o survey.xlsx
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "SAV2XLSX_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "7860", env = "SAV2XLSX_PORT")]
    port: u16,

    /// Maximum upload size in megabytes
    #[arg(long, default_value = "256", env = "SAV2XLSX_MAX_UPLOAD_MB")]
    max_upload_mb: usize,

    /// Also treat this column as an SPSS date (repeatable)
    #[arg(long = "date-column", value_name = "NAME")]
    date_columns: Vec<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&LogConfig::from_verbosity(args.verbose).with_target(true))
        .map_err(anyhow::Error::msg)?;

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
        convert: ConvertConfig::default().with_date_columns(args.date_columns),
    };

    run_server(config).await
}
