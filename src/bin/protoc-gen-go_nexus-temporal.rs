//! protoc plugin entry point.
//!
//! Invoked by protoc as `protoc --go_nexus-temporal_out=. ...`; reads a
//! `CodeGeneratorRequest` from stdin and writes the response to stdout.

use anyhow::Context;
use clap::Parser;
use nexus_temporal_codegen::{generate, read_request, write_response, LoggingConfig};

const BIN_NAME: &str = "protoc-gen-go_nexus-temporal";

#[derive(Parser, Debug)]
#[command(name = BIN_NAME, about = "Generate Temporal Nexus clients and handlers for Go", disable_version_flag = true)]
struct Cli {
    /// Print the plugin and toolchain versions, then exit
    #[arg(long)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("{BIN_NAME}: {}", env!("CARGO_PKG_VERSION"));
        println!("rustc: {}", env!("NEXUS_TEMPORAL_RUSTC_VERSION"));
        return Ok(());
    }

    LoggingConfig::from_env().init();

    let request = read_request(std::io::stdin().lock())?;
    let response = generate(&request).context("failed to generate Nexus code")?;
    write_response(std::io::stdout().lock(), &response)
}
