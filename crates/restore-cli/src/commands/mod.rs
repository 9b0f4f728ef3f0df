pub mod build;
pub mod cluster;
pub mod solve;

use std::path::Path;

use anyhow::{Context, Result};
use restore_io::{load_model_dir, ModelInputs};

pub(crate) fn load(dir: &Path) -> Result<ModelInputs> {
    load_model_dir(dir).with_context(|| format!("loading model directory '{}'", dir.display()))
}
