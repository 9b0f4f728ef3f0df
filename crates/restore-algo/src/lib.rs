//! # restore-algo: Model Assembly for Energy System Optimisation
//!
//! Builds a multi-year, representative-day linear program from a
//! [`ConfigStore`](restore_core::ConfigStore), a [`TimeIndex`](restore_core::TimeIndex)
//! and an [`Incidence`](restore_core::Incidence), and hands it to a solver.
//!
//! ## Architecture
//!
//! ```text
//!                  ┌────────────────────── ModelAssembler ──────────────────────┐
//!                  │  sets: Ents, Caps, FiE, FoE                                │
//!                  │  vars: activity, capacity_*, flow_in, flow_out             │
//!                  │  c_io_balance: Σ flow_out == Σ flow_in   ∀ flow, slice     │
//!                  └───────┬──────────────┬───────────────┬───────────────┬─────┘
//!                          ▼              ▼               ▼               ▼
//!                   DemandSector   TechnologySector  StorageSector    TradeSector
//!                          └──────────────┴───── library ─┴───────────────┘
//!                              flow · capacity · activity · init · cost
//! ```
//!
//! - **[`model`]**: variable registry, linear expressions, named blocks
//! - **[`library`]**: reusable constraint rules returning constraint-or-skip
//! - **[`sector`]**: the [`Sector`] trait and the built-in sectors
//! - **[`assembler`]**: [`ModelAssembler`] and [`AssembledModel`]
//! - **[`pipeline`]**: settings-driven construction with demand clustering
//! - **[`solve`]**: `good_lp` / Clarabel hand-off and [`ModelSolution`]
//!
//! ## Features
//!
//! | feature           | effect                                               |
//! |-------------------|------------------------------------------------------|
//! | `solver-clarabel` | `solve::solve` via good_lp + Clarabel (default)      |
//! | `solver-highs`    | enables good_lp's HiGHS backend                      |
//! | `parallel`        | evaluates constraint rules of a block with rayon     |
//!
//! ## Example
//!
//! ```rust
//! use restore_algo::ModelAssembler;
//! use restore_core::{CellKey, ConfigStore, IncidenceBuilder, TimeIndex};
//!
//! let mut store = ConfigStore::new();
//! store.insert("dem_elec", CellKey::annual("actual_demand", 2020), Some(8760.0))?;
//! store.insert("dem_elec", CellKey::annual("cost_variable_om", 2020), Some(0.0))?;
//! store.insert("dem_elec", CellKey::constant_fxe("input_efficiency", "elec"), Some(1.0))?;
//!
//! let incidence = IncidenceBuilder::new().consumes("elec", "dem_elec").build();
//! let time = TimeIndex::new(2020, 2020, 1, 24)?;
//!
//! let assembled = ModelAssembler::new(&store, time, incidence)
//!     .with_default_sectors()
//!     .assemble()?;
//! println!("{}", assembled.summary());
//! # Ok::<(), restore_core::RestoreError>(())
//! ```

pub mod assembler;
pub mod library;
pub mod model;
pub mod pipeline;
pub mod sector;
pub mod solve;

pub use assembler::{AssembledModel, BlockSummary, ModelAssembler, ModelSummary};
pub use model::{Constraint, LinExpr, Model, Outcome, Sense, VarId};
pub use pipeline::build_model;
pub use sector::{DemandProfile, DemandSector, Sector, StorageSector, TechnologySector, TradeSector};
pub use solve::{ModelSolution, SolveOptions};

#[cfg(feature = "solver-clarabel")]
pub use solve::solve;
