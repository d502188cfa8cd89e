use log::debug;

use crate::ClusterStyle;
use crate::LayoutConfig;
use crate::LayoutError;
use crate::LtsView;
use crate::RingLayout;
use crate::lts_view::Phase;
use crate::ring::MIN_DELTA_SLOT;

/// The vertical distance between two consecutive ranks.
pub const CLUSTER_HEIGHT: f32 = 1.0;

/// The bounding cylinder of a descendant as seen by its ancestor.
#[derive(Clone, Copy, Debug)]
struct DescendantBounds {
    top_radius: f32,
    bc_radius: f32,
    bc_height: f32,
}

/// The computed size of a cluster and the positions of its descendants.
#[derive(Debug)]
struct ClusterSize {
    top_radius: f32,
    base_radius: f32,
    bc_radius: f32,
    bc_height: f32,
    descendant_positions: Vec<f32>,
}

impl LtsView {
    /// Computes, from the highest rank to the root, the radii and bounding
    /// cylinder of every cluster and the angles of its descendants on its
    /// base circle.
    pub fn position_clusters(&mut self, config: &LayoutConfig) -> Result<(), LayoutError> {
        self.require(Phase::Clustered)?;

        for rank in (0..self.clusters_in_rank.len()).rev() {
            for position in 0..self.clusters_in_rank[rank].len() {
                let cluster = &self.clusters_in_rank[rank][position];

                let descendants: Vec<DescendantBounds> = cluster
                    .descendants
                    .iter()
                    .map(|index| {
                        let descendant = self.cluster(*index);
                        DescendantBounds {
                            top_radius: descendant.top_radius,
                            bc_radius: descendant.bc_radius,
                            bc_height: descendant.bc_height,
                        }
                    })
                    .collect();

                let size = compute_size(cluster.states.len(), &descendants, config.cluster_style);

                let cluster = &mut self.clusters_in_rank[rank][position];
                cluster.top_radius = size.top_radius;
                cluster.base_radius = size.base_radius;
                cluster.bc_radius = size.bc_radius;
                cluster.bc_height = size.bc_height;

                for (descendant, angle) in cluster.descendants.clone().into_iter().zip(size.descendant_positions) {
                    self.cluster_mut(descendant).position = angle;
                }
            }
        }

        if let Some(root) = self.clusters_in_rank.first_mut().and_then(|rank| rank.first_mut()) {
            root.position = -1.0;
            debug!(
                "Root cluster has bounding cylinder radius {:.3} and height {:.3}",
                root.bc_radius, root.bc_height
            );
        }

        self.phase = Phase::Sized;
        Ok(())
    }
}

/// Computes the size of a cluster with the given number of states from the
/// bounding cylinders of its descendants.
fn compute_size(num_states: usize, descendants: &[DescendantBounds], style: ClusterStyle) -> ClusterSize {
    let top_radius = RingLayout::radius_for(num_states);

    match descendants {
        [] => ClusterSize {
            top_radius,
            base_radius: top_radius,
            bc_radius: top_radius,
            bc_height: 0.0,
            descendant_positions: Vec::new(),
        },
        [descendant] => ClusterSize {
            top_radius,
            base_radius: descendant.top_radius,
            bc_radius: top_radius.max(descendant.bc_radius),
            bc_height: CLUSTER_HEIGHT + descendant.bc_height,
            // A single descendant is centered below its ancestor.
            descendant_positions: vec![-1.0],
        },
        _ => {
            // The weights include some spacing, so even descendants without
            // extent are placed apart.
            let weights: Vec<f64> = descendants
                .iter()
                .map(|descendant| (descendant.bc_radius + 0.5 * MIN_DELTA_SLOT) as f64)
                .collect();
            let total: f64 = weights.iter().sum();

            let (descendant_positions, min_half_angle) = match style {
                ClusterStyle::Weighted => {
                    let mut start = 0.0;
                    let positions = weights
                        .iter()
                        .map(|weight| {
                            let angle = (start + 0.5 * weight) / total * 360.0;
                            start += weight;
                            angle as f32
                        })
                        .collect();

                    // The angle between two descendants is at least proportional to their combined weight.
                    let widest = widest_pair(&weights);
                    (positions, std::f64::consts::PI * widest / (2.0 * total))
                }
                ClusterStyle::Uniform => {
                    let n = weights.len() as f64;
                    let positions = (0..weights.len())
                        .map(|index| (index as f64 * 360.0 / n) as f32)
                        .collect();
                    (positions, std::f64::consts::PI / n)
                }
            };

            // The chord between any two descendant centres must be at least the
            // sum of their weights, and the widest pair is the binding one.
            let widest = widest_pair(&weights);
            let base_radius = (widest / (2.0 * min_half_angle.sin())) as f32;

            let max_bc_radius = descendants.iter().map(|d| d.bc_radius).fold(0.0, f32::max);
            let max_bc_height = descendants.iter().map(|d| d.bc_height).fold(0.0, f32::max);

            ClusterSize {
                top_radius,
                base_radius,
                bc_radius: top_radius.max(base_radius + max_bc_radius),
                bc_height: CLUSTER_HEIGHT + max_bc_height,
                descendant_positions,
            }
        }
    }
}

/// Returns the sum of the two largest weights.
fn widest_pair(weights: &[f64]) -> f64 {
    let mut first = 0.0;
    let mut second = 0.0;
    for weight in weights {
        if *weight > first {
            second = first;
            first = *weight;
        } else if *weight > second {
            second = *weight;
        }
    }

    first + second
}

#[cfg(test)]
mod tests {
    use test_log::test;
    use test_case::test_case;

    use mcrl2rust_lts::random_lts_seeded;

    use crate::ClusterIndex;
    use crate::RankStyle;
    use crate::from_polar;

    use super::*;

    fn bounds(bc_radius: f32) -> DescendantBounds {
        DescendantBounds {
            top_radius: bc_radius,
            bc_radius,
            bc_height: 0.0,
        }
    }

    #[test]
    fn test_leaf_size() {
        let size = compute_size(1, &[], ClusterStyle::Weighted);
        assert_eq!(size.top_radius, 0.0);
        assert_eq!(size.bc_height, 0.0);

        let size = compute_size(5, &[], ClusterStyle::Weighted);
        assert!(size.top_radius > 0.0);
        assert_eq!(size.base_radius, size.top_radius);
    }

    #[test]
    fn test_single_descendant_is_centered() {
        let size = compute_size(1, &[bounds(0.44)], ClusterStyle::Weighted);
        assert_eq!(size.descendant_positions, vec![-1.0]);
        assert_eq!(size.base_radius, 0.44);
        assert_eq!(size.bc_radius, 0.44);
        assert_eq!(size.bc_height, CLUSTER_HEIGHT);
    }

    #[test_case(ClusterStyle::Weighted ; "weighted")]
    #[test_case(ClusterStyle::Uniform ; "uniform")]
    fn test_descendants_do_not_overlap(style: ClusterStyle) {
        let descendants = [bounds(0.0), bounds(1.5), bounds(0.22), bounds(0.66), bounds(0.0)];
        let size = compute_size(3, &descendants, style);

        for (i, first) in descendants.iter().enumerate() {
            for (j, second) in descendants.iter().enumerate().skip(i + 1) {
                let p = from_polar(size.descendant_positions[i], size.base_radius);
                let q = from_polar(size.descendant_positions[j], size.base_radius);
                assert!(
                    p.distance(q) + 1e-4 >= first.bc_radius + second.bc_radius,
                    "Descendants {i} and {j} overlap"
                );
            }
        }

        for angle in &size.descendant_positions {
            assert!((0.0..360.0).contains(angle));
        }
    }

    #[test]
    fn test_two_descendants() {
        let size = compute_size(1, &[bounds(0.5), bounds(0.5)], ClusterStyle::Weighted);
        assert!((size.descendant_positions[0] - 90.0).abs() < 1e-3);
        assert!((size.descendant_positions[1] - 270.0).abs() < 1e-3);

        // Opposite each other, touching including the spacing.
        assert!((size.base_radius - (0.5 + 0.5 * MIN_DELTA_SLOT)).abs() < 1e-5);
    }

    #[test]
    fn test_random_bounding_cylinders() {
        for seed in 0..20 {
            for cluster_style in [ClusterStyle::Weighted, ClusterStyle::Uniform] {
                let config = LayoutConfig {
                    rank_style: RankStyle::Iterative,
                    cluster_style,
                    ..Default::default()
                };

                let mut view = LtsView::new(random_lts_seeded(seed, 80, 3, 4)).unwrap();
                view.rank_states(&config).unwrap();
                view.cluster_states(&config).unwrap();
                view.position_clusters(&config).unwrap();

                for cluster in view.clusters() {
                    assert!(cluster.bc_radius() >= cluster.top_radius());

                    for index in cluster.descendants() {
                        let descendant = view.cluster(*index);
                        let offset = if descendant.is_centered() { 0.0 } else { cluster.base_radius() };

                        assert!(descendant.bc_radius() + offset <= cluster.bc_radius() + 1e-4);
                        assert!(descendant.bc_height() + CLUSTER_HEIGHT <= cluster.bc_height() + 1e-4);
                    }
                }

                assert!(view.cluster(ClusterIndex::new(0, 0)).is_centered());
            }
        }
    }
}
