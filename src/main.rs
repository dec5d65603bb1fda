use std::path::Path;

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "grammar-breakdown",
    version,
    about = "Serve grammatical breakdowns of Turkish and Italian sentences"
)]
struct Cli {
    /// Address to listen on (overrides [server] addr)
    #[arg(short = 'a', long = "addr")]
    addr: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // A missing .env file is fine; the key may come from the environment.
    let _ = dotenv::dotenv();
    grammar_breakdown::logging::init(cli.verbose)?;

    let settings =
        grammar_breakdown::settings::load_settings(cli.read_settings.as_deref().map(Path::new))?;
    let addr = cli.addr.unwrap_or_else(|| settings.addr.clone());
    grammar_breakdown::server::run_server(settings, addr).await
}
