//! # restore-ts: Load Profiles & Representative Days
//!
//! Turns an hourly annual load curve into a handful of weighted daily shapes
//! that reproduce a known annual total.
//!
//! ```text
//! profile library ──▶ LoadProfile (365 × 24) ──▶ resample (365 × 24/HL)
//!        │                                               │
//!   fallback chain                                   k-means
//!                                                        ▼
//!                         ClusteredDemand ◀── correct ── RepresentativeDays
//!                       (ratios, demand[d][h])            (ratios, centroids)
//! ```
//!
//! ## Modules
//!
//! - [`profile`] - Day × slot load matrix with gap filling and resampling
//! - [`library`] - Profile directory and country/year fallback chain
//! - [`kmeans`] - Seeded k-means++ / Lloyd and silhouette diagnostic
//! - [`cluster`] - Occurrence ratios and total-preserving correction
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use restore_ts::{DemandClusterer, ProfileLibrary};
//!
//! let clusterer = DemandClusterer::new(ProfileLibrary::new("data/_profiles"), 4).with_seed(0);
//! let totals = BTreeMap::from([(2020, 61_500.0), (2021, 62_000.0)]);
//! let demand = clusterer.demand_by_year("CH", &totals)?;
//! println!("ratios 2020: {:?}", demand[&2020].ratios);
//! # Ok::<(), restore_core::RestoreError>(())
//! ```

pub mod cluster;
pub mod kmeans;
pub mod library;
pub mod profile;

pub use cluster::{ClusteredDemand, DemandClusterer, RepresentativeDays};
pub use kmeans::{silhouette, KMeans, KMeansFit};
pub use library::{read_profile_csv, ProfileColumns, ProfileLibrary, ProfileSource};
pub use profile::LoadProfile;
