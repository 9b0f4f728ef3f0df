//! # restore-core: Energy System Model Building Blocks
//!
//! Shared domain types for building multi-period, multi-sector energy system
//! optimisation models.
//!
//! ## Design Philosophy
//!
//! An energy system is a bipartite graph of **flows** (commodity buses such
//! as electricity, heat, natural gas) and **entities** (technologies,
//! storage, trade links, demands):
//!
//! ```text
//!   trd_gas ──▶ natgas ──▶ conv_chp ──▶ elec ──▶ dem_elec
//!                                   └──▶ heat ──▶ dem_heat
//! ```
//!
//! Entities carry no attributes of their own. Everything is resolved on
//! demand from the [`ConfigStore`], which is built once and then shared
//! read-only by every part of model construction.
//!
//! ## Modules
//!
//! - [`config`] - Typed parameter tables with per-getter absent-value policies
//! - [`incidence`] - Sparse FiE / FoE / FxE relation sets
//! - [`time`] - Year × representative-day × hour index and weights
//! - [`settings`] - `model.toml` settings
//! - [`error`] - [`RestoreError`] and [`RestoreResult`]
//!
//! ## Quick Start
//!
//! ```rust
//! use restore_core::{CellKey, ConfigStore, IncidenceBuilder, TimeIndex};
//!
//! let mut store = ConfigStore::new();
//! store.insert("conv_pv", CellKey::configuration("enable_capacity"), Some(1.0))?;
//! store.insert("conv_pv", CellKey::annual("actual_capacity", 2020), Some(2.5))?;
//!
//! let incidence = IncidenceBuilder::new()
//!     .produces("elec", "conv_pv")
//!     .consumes("elec", "dem_elec")
//!     .build();
//! let time = TimeIndex::new(2020, 2030, 4, 3)?;
//!
//! assert!(store.check_cnf("conv_pv", "enable_capacity"));
//! assert_eq!(incidence.producers_of("elec").len(), 1);
//! assert_eq!(time.hours().len(), 8);
//! # Ok::<(), restore_core::RestoreError>(())
//! ```

pub mod config;
pub mod error;
pub mod ids;
pub mod incidence;
pub mod settings;
pub mod time;

pub use config::{
    AnnualTable, Cell, CellKey, ConfigStore, ConfigurationTable, ConstantTable, EntityParameters,
    FlowAnnualTable, FlowConstantTable, ValueKind,
};
pub use error::{RestoreError, RestoreResult};
pub use ids::{Day, EntityId, FlowId, Hour, Slice, Year};
pub use incidence::{Direction, FlowEntity, Incidence, IncidenceBuilder};
pub use settings::{ClusteringSettings, ModelSettings};
pub use time::{TimeIndex, DAYS_PER_YEAR, HOURS_PER_DAY, HOURS_PER_YEAR};
