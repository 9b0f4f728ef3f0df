//! Representative days and total-preserving demand shapes
//!
//! Clustering compresses 365 daily load curves into `k` shapes with
//! occurrence ratios. Cluster means do not preserve the annual sum, so each
//! year's shapes are rescaled to that year's known total:
//!
//! ```text
//! clustered = Σ_d ratio[d] · 365 · Σ_h HL · centroid[d,h]
//! factor    = historical_total / clustered
//! demand    = factor · centroid
//! ```
//!
//! which keeps the clustered *shape* and the historical *total*.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use restore_core::{ModelSettings, RestoreError, RestoreResult, Year, DAYS_PER_YEAR};
use tracing::{debug, info};

use crate::kmeans::{silhouette, KMeans};
use crate::library::{ProfileLibrary, ProfileSource};
use crate::profile::LoadProfile;

/// Clustered days of one profile, before correction.
#[derive(Debug, Clone)]
pub struct RepresentativeDays {
    /// Share of the year each cluster represents; sums to 1.
    pub ratios: Vec<f64>,
    pub centroids: Vec<Vec<f64>>,
    /// Cluster index per profile day.
    pub assignments: Vec<usize>,
    /// Diagnostic only.
    pub silhouette: Option<f64>,
    pub slot_hours: usize,
}

impl RepresentativeDays {
    pub fn fit(profile: &LoadProfile, kmeans: &KMeans) -> RestoreResult<Self> {
        let fit = kmeans.fit(profile.days())?;
        let ratios = if kmeans.k == 1 {
            vec![1.0]
        } else {
            let n = profile.n_days() as f64;
            fit.cluster_sizes().iter().map(|&s| s as f64 / n).collect()
        };
        let silhouette = if kmeans.k > 1 {
            silhouette(profile.days(), &fit.assignments, kmeans.k)
        } else {
            None
        };
        debug!(k = kmeans.k, iterations = fit.iterations, inertia = fit.inertia, "clustered profile days");
        Ok(Self {
            ratios,
            centroids: fit.centroids,
            assignments: fit.assignments,
            silhouette,
            slot_hours: profile.slot_hours(),
        })
    }

    pub fn k(&self) -> usize {
        self.ratios.len()
    }

    /// Annual energy implied by the uncorrected shapes.
    pub fn clustered_total(&self) -> f64 {
        let hl = self.slot_hours as f64;
        self.ratios
            .iter()
            .zip(&self.centroids)
            .map(|(ratio, c)| ratio * DAYS_PER_YEAR * hl * c.iter().sum::<f64>())
            .sum()
    }

    /// Rescale the shapes so they reproduce `total` over a year.
    pub fn correct_to_total(&self, total: f64) -> RestoreResult<ClusteredDemand> {
        if !total.is_finite() || total < 0.0 {
            return Err(RestoreError::invalid(
                "clustering",
                "historical_total",
                format!("{total} must be a non-negative number"),
            ));
        }
        let clustered = self.clustered_total();
        if clustered == 0.0 || !clustered.is_finite() {
            return Err(RestoreError::ClusteringDegenerate(format!(
                "clustered shapes sum to {clustered}; the load profile carries no demand"
            )));
        }
        let correction = total / clustered;
        let demand = self
            .centroids
            .iter()
            .map(|c| c.iter().map(|v| v * correction).collect())
            .collect();
        Ok(ClusteredDemand {
            ratios: self.ratios.clone(),
            demand,
            correction,
            slot_hours: self.slot_hours,
        })
    }
}

/// Corrected representative-day demand for one year.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteredDemand {
    pub ratios: Vec<f64>,
    /// `demand[day][slot]`, a per-hour rate.
    pub demand: Vec<Vec<f64>>,
    pub correction: f64,
    pub slot_hours: usize,
}

impl ClusteredDemand {
    pub fn annual_total(&self) -> f64 {
        let hl = self.slot_hours as f64;
        self.ratios
            .iter()
            .zip(&self.demand)
            .map(|(ratio, d)| ratio * DAYS_PER_YEAR * hl * d.iter().sum::<f64>())
            .sum()
    }
}

/// Profile library + k-means configuration.
#[derive(Debug, Clone)]
pub struct DemandClusterer {
    library: ProfileLibrary,
    kmeans: KMeans,
    hour_slice: usize,
    profile_year: Option<Year>,
}

impl DemandClusterer {
    pub fn new(library: ProfileLibrary, k: usize) -> Self {
        Self {
            library,
            kmeans: KMeans::new(k),
            hour_slice: 1,
            profile_year: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.kmeans = self.kmeans.with_seed(seed);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.kmeans = self.kmeans.with_max_iterations(max_iterations);
        self
    }

    pub fn with_hour_slice(mut self, hour_slice: usize) -> Self {
        self.hour_slice = hour_slice;
        self
    }

    /// Use one historical year's profile for every model year.
    pub fn with_profile_year(mut self, year: Year) -> Self {
        self.profile_year = Some(year);
        self
    }

    /// `None` when no profile library is configured.
    pub fn from_settings(settings: &ModelSettings) -> Option<Self> {
        let root = settings.profiles_dir.as_ref()?;
        let mut clusterer = Self::new(ProfileLibrary::new(root), settings.representative_days)
            .with_seed(settings.clustering.seed)
            .with_max_iterations(settings.clustering.max_iterations)
            .with_hour_slice(settings.hour_slice);
        if let Some(year) = settings.clustering.historical_year {
            clusterer = clusterer.with_profile_year(year);
        }
        Some(clusterer)
    }

    pub fn k(&self) -> usize {
        self.kmeans.k
    }

    /// Cluster the profile that the fallback chain picks for (country, year).
    pub fn representative_days(
        &self,
        country: &str,
        year: Year,
    ) -> RestoreResult<(RepresentativeDays, ProfileSource)> {
        let (profile, source) = self.library.load(country, year)?;
        let days = self.cluster_profile(&profile)?;
        Ok((days, source))
    }

    /// Cluster an already loaded hourly profile.
    pub fn cluster_profile(&self, profile: &LoadProfile) -> RestoreResult<RepresentativeDays> {
        let profile = if self.hour_slice > 1 {
            profile.resample(self.hour_slice)?
        } else {
            profile.clone()
        };
        RepresentativeDays::fit(&profile, &self.kmeans)
    }

    /// Shapes corrected to each year's total. Years sharing a profile file
    /// are clustered once.
    pub fn demand_by_year(
        &self,
        country: &str,
        totals: &BTreeMap<Year, f64>,
    ) -> RestoreResult<BTreeMap<Year, ClusteredDemand>> {
        let mut cache: HashMap<PathBuf, RepresentativeDays> = HashMap::new();
        let mut out = BTreeMap::new();
        for (&year, &total) in totals {
            let profile_year = self.profile_year.unwrap_or(year);
            let source = self.library.resolve(country, profile_year)?;
            let days = match cache.get(source.path()) {
                Some(days) => days.clone(),
                None => {
                    let (days, source) = self.representative_days(country, profile_year)?;
                    info!(
                        country,
                        year = profile_year,
                        source = source.kind(),
                        k = days.k(),
                        silhouette = days.silhouette,
                        "clustered load profile"
                    );
                    cache.insert(source.path().to_path_buf(), days.clone());
                    days
                }
            };
            out.insert(year, days.correct_to_total(total)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_profile() -> LoadProfile {
        // weekdays peak at noon, weekends flat
        let rows = (0..365)
            .map(|d| {
                (0..24)
                    .map(|h| {
                        let base = if d % 7 < 5 { 10.0 } else { 6.0 };
                        let peak = if d % 7 < 5 && (9..18).contains(&h) { 5.0 } else { 0.0 };
                        Some(base + peak + (d % 3) as f64 * 0.1)
                    })
                    .collect()
            })
            .collect();
        LoadProfile::from_days(rows).unwrap()
    }

    #[test]
    fn test_ratios_sum_to_one() {
        let profile = synthetic_profile();
        for k in 1..=6 {
            let days = RepresentativeDays::fit(&profile, &KMeans::new(k)).unwrap();
            let sum: f64 = days.ratios.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "k = {k}: ratios sum to {sum}");
            assert_eq!(days.k(), k);
        }
    }

    #[test]
    fn test_single_day_ratio_is_one() {
        let days = RepresentativeDays::fit(&synthetic_profile(), &KMeans::new(1)).unwrap();
        assert_eq!(days.ratios, vec![1.0]);
        assert!(days.silhouette.is_none());
    }

    #[test]
    fn test_correction_preserves_total() {
        let days = RepresentativeDays::fit(&synthetic_profile(), &KMeans::new(4)).unwrap();
        let planted = 61_234.5;
        let demand = days.correct_to_total(planted).unwrap();
        assert!(((demand.annual_total() - planted) / planted).abs() < 1e-6);
        assert!(days.silhouette.is_some());
    }

    #[test]
    fn test_zero_profile_is_degenerate() {
        let rows = vec![vec![Some(0.0); 24]; 10];
        let profile = LoadProfile::from_days(rows).unwrap();
        let days = RepresentativeDays::fit(&profile, &KMeans::new(2)).unwrap();
        assert!(matches!(
            days.correct_to_total(100.0),
            Err(RestoreError::ClusteringDegenerate(_))
        ));
    }

    #[test]
    fn test_negative_total_rejected() {
        let days = RepresentativeDays::fit(&synthetic_profile(), &KMeans::new(2)).unwrap();
        assert!(matches!(
            days.correct_to_total(-1.0),
            Err(RestoreError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_resampled_clustering_preserves_total() {
        let clusterer = DemandClusterer::new(ProfileLibrary::new("unused"), 3).with_hour_slice(4);
        let days = clusterer.cluster_profile(&synthetic_profile()).unwrap();
        assert_eq!(days.centroids[0].len(), 6);
        let demand = days.correct_to_total(1000.0).unwrap();
        assert!((demand.annual_total() - 1000.0).abs() < 1e-6);
    }
}
