//! # restore-io: Model Input Loading
//!
//! Reads a model directory into the in-memory structures model construction
//! works from:
//!
//! ```text
//! my_model/
//! ├── model.toml        → ModelSettings
//! ├── FiE.csv           → Incidence (flow into entity)
//! ├── FoE.csv           → Incidence (entity out to flow)
//! └── *.csv             → ConfigStore (one parameter table per entity group)
//! ```
//!
//! Parameter tables are read in file-name order. Defining the same cell in
//! two tables is an error rather than a silent override.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use restore_io::load_model_dir;
//!
//! fn main() -> anyhow::Result<()> {
//!     let inputs = load_model_dir("data/ch_2020".as_ref())?;
//!     println!("{} entities", inputs.store.len());
//!     println!("{} connections", inputs.incidence.len());
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use restore_core::{ConfigStore, Direction, Incidence, ModelSettings};
use tracing::{debug, info};

pub mod incidence;
pub mod settings;
pub mod tables;

pub use incidence::{build_incidence, load_incidence_file, read_incidence_table, Connection, IncidenceTable};
pub use settings::{load_settings, parse_settings};
pub use tables::{load_parameter_file, parse_cell, read_parameter_table};

pub const SETTINGS_FILE: &str = "model.toml";
pub const FIE_FILE: &str = "FiE.csv";
pub const FOE_FILE: &str = "FoE.csv";

/// Everything loaded from a model directory.
#[derive(Debug, Clone)]
pub struct ModelInputs {
    pub root: PathBuf,
    pub settings: ModelSettings,
    pub store: ConfigStore,
    pub incidence: Incidence,
}

/// Parameter table files of a model directory, sorted by name.
pub fn parameter_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing '{}'", dir.display()))? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if path.is_file() && is_csv && name != FIE_FILE && name != FOE_FILE {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn load_model_dir(dir: &Path) -> Result<ModelInputs> {
    let settings = load_settings(&dir.join(SETTINGS_FILE))?;

    let mut store = ConfigStore::new();
    let files = parameter_files(dir)?;
    for path in &files {
        let cells = load_parameter_file(path, &mut store)?;
        debug!(file = %path.display(), cells, "loaded parameter table");
    }

    let tables = [
        load_incidence_file(&dir.join(FIE_FILE), Direction::Input)?,
        load_incidence_file(&dir.join(FOE_FILE), Direction::Output)?,
    ];
    let incidence = build_incidence(&tables, &mut store);

    info!(
        dir = %dir.display(),
        tables = files.len(),
        entities = store.len(),
        flows = incidence.flows().len(),
        "loaded model inputs"
    );
    Ok(ModelInputs {
        root: dir.to_path_buf(),
        settings,
        store,
        incidence,
    })
}
