use glam::Vec2;
use glam::Vec3;

use crate::CLUSTER_HEIGHT;
use crate::LayoutError;
use crate::LtsView;
use crate::from_polar;
use crate::lts_view::Phase;

impl LtsView {
    /// Derives the absolute centre and rotation of every cluster, and the
    /// absolute position and edge control points of every state, from the
    /// relative layout. The root is centered at the origin and every rank is
    /// `CLUSTER_HEIGHT` below the previous one.
    pub fn compute_absolute_positions(&mut self) -> Result<(), LayoutError> {
        self.require(Phase::Positioned)?;
        self.update_absolute_positions();
        Ok(())
    }

    /// Recomputes the absolute geometry, the positions must be valid.
    pub(crate) fn update_absolute_positions(&mut self) {
        // Ancestors come first in the rank order.
        for rank in 0..self.clusters_in_rank.len() {
            for position in 0..self.clusters_in_rank[rank].len() {
                let cluster = &self.clusters_in_rank[rank][position];

                let (centre, rotation) = match cluster.ancestor {
                    None => (Vec3::ZERO, 0.0),
                    Some(ancestor) => {
                        let ancestor = self.cluster(ancestor);
                        if cluster.is_centered() {
                            (ancestor.position_abs, ancestor.rotation)
                        } else {
                            let rotation = ancestor.rotation + cluster.position;
                            let offset = from_polar(rotation, ancestor.base_radius);
                            (ancestor.position_abs + offset.extend(0.0), rotation)
                        }
                    }
                };

                let cluster = &mut self.clusters_in_rank[rank][position];
                cluster.position_abs = Vec3::new(centre.x, centre.y, -(rank as f32) * CLUSTER_HEIGHT);
                cluster.rotation = rotation % 360.0;
            }
        }

        let control = Vec3::new(0.0, 0.0, CLUSTER_HEIGHT / 3.0);
        for state in &mut self.states {
            let Some(index) = state.cluster else {
                continue;
            };

            let cluster = &self.clusters_in_rank[index.rank][index.position];
            let (position, outwards) = if state.is_centered() {
                (cluster.position_abs, Vec3::X)
            } else {
                let offset = from_polar(cluster.rotation + state.position_angle, state.position_radius);
                (cluster.position_abs + offset.extend(0.0), offset.normalize_or(Vec2::X).extend(0.0))
            };

            state.position_abs = position;
            state.outgoing_control = position - control;
            state.incoming_control = position + control;

            // Self loops bulge outwards from the axis of the cluster.
            state.loop_control1 = position + outwards * (CLUSTER_HEIGHT / 3.0) - control;
            state.loop_control2 = position + outwards * (CLUSTER_HEIGHT / 3.0) + control;
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use mcrl2rust_lts::random_lts_seeded;

    use crate::LayoutConfig;

    use super::*;

    #[test]
    fn test_not_positioned() {
        let mut view = LtsView::new(random_lts_seeded(1, 10, 2, 2)).unwrap();
        assert_eq!(view.compute_absolute_positions(), Err(LayoutError::NotPositioned));
    }

    #[test]
    fn test_absolute_positions() {
        for seed in 0..10 {
            let view = LtsView::with_layout(random_lts_seeded(seed, 60, 3, 3), &LayoutConfig::default()).unwrap();

            let root = view.root_cluster().unwrap();
            assert_eq!(root.position_abs(), Vec3::ZERO);

            for state in view.states() {
                let Some(index) = state.cluster() else {
                    continue;
                };

                let cluster = view.cluster(index);
                let position = state.position_abs();
                assert!(position.is_finite());
                assert_eq!(position.z, -(cluster.rank() as f32) * CLUSTER_HEIGHT);

                // The state lies on the top disk of its cluster.
                let distance = (position - cluster.position_abs()).truncate().length();
                assert!((distance - state.position_radius()).abs() < 1e-3);
                assert!(state.outgoing_control().z < position.z);
                assert!(state.incoming_control().z > position.z);
            }

            for cluster in view.clusters() {
                if let Some(ancestor) = cluster.ancestor() {
                    let ancestor = view.cluster(ancestor);
                    let distance = (cluster.position_abs() - ancestor.position_abs()).truncate().length();
                    let expected = if cluster.is_centered() { 0.0 } else { ancestor.base_radius() };
                    assert!((distance - expected).abs() < 1e-3);
                }
            }
        }
    }
}
