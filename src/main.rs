#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args,
    clippy::cast_precision_loss
)]

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use cocoons_ftp::Deployer;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Deploy the cocoons site of the current folder with FTP.
///
/// The generated site is read from the target folder declared in
/// cocoons.json, the server settings from its "ftp" section.
#[derive(Parser)]
#[command(name = "cocoons-ftp", author, version, long_about = None)]
struct Cli {}

/// Asks for the FTP password when cocoons.json does not hold one
fn ensure_password(deployer: &mut Deployer) -> Result<()> {
    if deployer.needs_password() {
        let password = rpassword::prompt_password("FTP password: ")?;
        deployer.set_password(password);
    }
    Ok(())
}

fn upload_spinner() -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {pos} files sent {msg}")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}

async fn run() -> Result<String> {
    let site_dir = std::env::current_dir()?;
    let mut deployer = Deployer::load(&site_dir)?;
    ensure_password(&mut deployer)?;

    let report = deployer.with_progress(upload_spinner()?).deploy().await?;
    tracing::info!("{}", report.summary());
    Ok(report.server_info())
}

#[tokio::main]
async fn main() -> Result<()> {
    match Cli::try_parse() {
        Ok(_) => {}
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.print()?;
            return Ok(());
        }
        Err(_) => {
            println!("{}", Cli::command().render_usage());
            return Ok(());
        }
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(server_info) => {
            println!("The site is correctly deployed with FTP in : {}", server_info);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error during the deployment with ftp : {:#}", e);
            std::process::exit(1);
        }
    }
}
