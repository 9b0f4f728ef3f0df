use std::path::Path;

use anyhow::{Context, Result};
use restore_algo::build_model;
use restore_cli::SummaryFormat;
use tracing::info;

pub fn handle(dir: &Path, format: SummaryFormat) -> Result<()> {
    let inputs = super::load(dir)?;
    info!("Building model from {}", dir.display());
    let assembled = build_model(&inputs.store, inputs.incidence, &inputs.settings)
        .context("assembling model")?;
    let summary = assembled.summary();
    match format {
        SummaryFormat::Plain => print!("{summary}"),
        SummaryFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}
