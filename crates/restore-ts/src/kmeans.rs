//! Seeded k-means over day vectors
//!
//! k-means++ initialisation followed by Lloyd iterations, all driven by a
//! `StdRng` seeded from the caller, so the same profile and seed always give
//! the same centroids in the same order.
//!
//! ```text
//! seed ─▶ k-means++ ─▶ assign ─▶ update ─▶ (empty? reseed) ─▶ converged?
//!                        ▲                                        │ no
//!                        └────────────────────────────────────────┘
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use restore_core::{RestoreError, RestoreResult};

/// k-means configuration.
#[derive(Debug, Clone, Copy)]
pub struct KMeans {
    pub k: usize,
    pub seed: u64,
    pub max_iterations: usize,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self { k, ..Default::default() }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            k: 1,
            seed: 0,
            max_iterations: 300,
        }
    }
}

/// Result of a k-means fit.
#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub centroids: Vec<Vec<f64>>,
    /// Cluster index per input point.
    pub assignments: Vec<usize>,
    pub iterations: usize,
    /// Sum of squared distances to assigned centroids.
    pub inertia: f64,
}

impl KMeansFit {
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &a in &self.assignments {
            sizes[a] += 1;
        }
        sizes
    }
}

pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (idx, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best.1 {
            best = (idx, d);
        }
    }
    best
}

impl KMeans {
    pub fn fit(&self, points: &[Vec<f64>]) -> RestoreResult<KMeansFit> {
        if self.k == 0 {
            return Err(RestoreError::invalid("clustering", "representative_days", "k must be at least 1"));
        }
        if self.max_iterations == 0 {
            return Err(RestoreError::invalid(
                "clustering",
                "max_iterations",
                "at least one iteration is needed to assign days",
            ));
        }
        if points.len() < self.k {
            return Err(RestoreError::invalid(
                "clustering",
                "representative_days",
                format!("k = {} exceeds the {} available days", self.k, points.len()),
            ));
        }
        let dim = points[0].len();
        if points.iter().any(|p| p.len() != dim) {
            return Err(RestoreError::Other("k-means points differ in length".into()));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = plus_plus_init(points, self.k, &mut rng);
        let mut assignments = vec![usize::MAX; points.len()];
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            let mut changed = false;
            let mut distances = Vec::with_capacity(points.len());
            for (i, p) in points.iter().enumerate() {
                let (c, d) = nearest(p, &centroids);
                if assignments[i] != c {
                    assignments[i] = c;
                    changed = true;
                }
                distances.push(d);
            }
            changed |= reseed_empty(&mut assignments, &distances, self.k);
            centroids = update_centroids(points, &assignments, self.k, dim);
            if !changed {
                break;
            }
        }

        let inertia = points
            .iter()
            .zip(&assignments)
            .map(|(p, &a)| squared_distance(p, &centroids[a]))
            .sum();
        Ok(KMeansFit {
            centroids,
            assignments,
            iterations,
            inertia,
        })
    }
}

fn plus_plus_init(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())].clone());
    let mut d2: Vec<f64> = points.iter().map(|p| squared_distance(p, &centroids[0])).collect();

    while centroids.len() < k {
        let total: f64 = d2.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = points.len() - 1;
            for (i, w) in d2.iter().enumerate() {
                if target < *w {
                    chosen = i;
                    break;
                }
                target -= w;
            }
            chosen
        } else {
            rng.gen_range(0..points.len())
        };
        let centroid = points[chosen].clone();
        for (d, p) in d2.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &centroid));
        }
        centroids.push(centroid);
    }
    centroids
}

/// Give every empty cluster the farthest point of a cluster that can spare one.
fn reseed_empty(assignments: &mut [usize], distances: &[f64], k: usize) -> bool {
    let mut moved = false;
    let mut sizes = vec![0usize; k];
    for &a in assignments.iter() {
        sizes[a] += 1;
    }
    for empty in 0..k {
        if sizes[empty] > 0 {
            continue;
        }
        let donor = (0..assignments.len())
            .filter(|&i| sizes[assignments[i]] > 1)
            .max_by(|&a, &b| distances[a].total_cmp(&distances[b]));
        if let Some(i) = donor {
            sizes[assignments[i]] -= 1;
            assignments[i] = empty;
            sizes[empty] = 1;
            moved = true;
        }
    }
    moved
}

fn update_centroids(points: &[Vec<f64>], assignments: &[usize], k: usize, dim: usize) -> Vec<Vec<f64>> {
    let mut sums = vec![vec![0.0; dim]; k];
    let mut counts = vec![0usize; k];
    for (p, &a) in points.iter().zip(assignments) {
        counts[a] += 1;
        for (s, v) in sums[a].iter_mut().zip(p) {
            *s += v;
        }
    }
    for (sum, &n) in sums.iter_mut().zip(&counts) {
        if n > 0 {
            sum.iter_mut().for_each(|s| *s /= n as f64);
        }
    }
    sums
}

/// Mean silhouette coefficient, or `None` with fewer than two non-empty
/// clusters or no cluster with more than one member.
pub fn silhouette(points: &[Vec<f64>], assignments: &[usize], k: usize) -> Option<f64> {
    let mut sizes = vec![0usize; k];
    for &a in assignments {
        sizes[a] += 1;
    }
    let populated = sizes.iter().filter(|&&n| n > 0).count();
    if populated < 2 || populated >= points.len() {
        return None;
    }

    let mut total = 0.0;
    for (i, p) in points.iter().enumerate() {
        let own = assignments[i];
        if sizes[own] <= 1 {
            continue; // singleton clusters score 0
        }
        let mut sum_by_cluster = vec![0.0; k];
        for (j, q) in points.iter().enumerate() {
            if i != j {
                sum_by_cluster[assignments[j]] += squared_distance(p, q).sqrt();
            }
        }
        let a = sum_by_cluster[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sum_by_cluster[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    Some(total / points.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<Vec<f64>> {
        let mut points = Vec::new();
        for i in 0..10 {
            points.push(vec![1.0 + 0.01 * i as f64, 1.0]);
            points.push(vec![10.0, 10.0 + 0.01 * i as f64]);
        }
        points
    }

    #[test]
    fn test_separates_two_blobs() {
        let fit = KMeans::new(2).fit(&two_blobs()).unwrap();
        assert_eq!(fit.cluster_sizes(), vec![10, 10]);
        for pair in fit.assignments.chunks(2) {
            assert_ne!(pair[0], pair[1]);
        }
        assert!(fit.inertia < 0.1);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let points = two_blobs();
        let a = KMeans::new(3).with_seed(42).fit(&points).unwrap();
        let b = KMeans::new(3).with_seed(42).fit(&points).unwrap();
        assert_eq!(a.assignments, b.assignments);
        assert_eq!(a.centroids, b.centroids);
    }

    #[test]
    fn test_single_cluster_is_mean() {
        let points = vec![vec![0.0, 2.0], vec![2.0, 4.0]];
        let fit = KMeans::new(1).fit(&points).unwrap();
        assert_eq!(fit.centroids, vec![vec![1.0, 3.0]]);
    }

    #[test]
    fn test_identical_points_fill_every_cluster() {
        let points = vec![vec![1.0, 1.0]; 6];
        let fit = KMeans::new(3).with_max_iterations(5).fit(&points).unwrap();
        assert!(fit.cluster_sizes().iter().all(|&n| n > 0));
        assert_eq!(fit.cluster_sizes().iter().sum::<usize>(), 6);
    }

    #[test]
    fn test_k_larger_than_points() {
        let err = KMeans::new(5).fit(&[vec![1.0]]).unwrap_err();
        assert!(matches!(err, RestoreError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let err = KMeans::new(2).with_max_iterations(0).fit(&two_blobs()).unwrap_err();
        assert!(matches!(err, RestoreError::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("max_iterations"));
    }

    #[test]
    fn test_silhouette_well_separated() {
        let points = two_blobs();
        let fit = KMeans::new(2).fit(&points).unwrap();
        let score = silhouette(&points, &fit.assignments, 2).unwrap();
        assert!(score > 0.9);
        assert_eq!(silhouette(&points, &vec![0; points.len()], 1), None);
    }
}
