//! Command line inspection of PE32 and PE32+ images.

use std::{
    fs::File,
    io::{BufReader, Write},
};

use anyhow::{Context, Result};
use log::{debug, info};
use pe::LoadOptions;

use crate::cli::Config;

pub mod cli;
pub mod logger;
pub mod report;

fn main() -> Result<()> {
    let config = cli::get_config();
    logger::init(config.log_level).context("failed to install logger")?;

    run(&config)
}

/// Loads the image named by `config` and prints the requested report.
fn run(config: &Config) -> Result<()> {
    let path = &config.file;
    let file = File::open(path).with_context(|| format!("failed to open \"{}\"", path.display()))?;
    let mut reader = BufReader::new(file);

    let image = pe::parse_stream(&mut reader, LoadOptions::default())
        .with_context(|| format!("failed to load \"{}\"", path.display()))?;
    info!(
        "loaded {:?} image with {} sections",
        image.width(),
        image.sections().len()
    );
    debug!("running {:?}", config.action);

    let mut out = std::io::stdout().lock();
    report::write_report(&mut out, &image, config.action)?;
    out.flush().context("failed to flush standard output")
}
