use glam::Vec2;
use log::debug;
use log::trace;
use log::warn;

use mcrl2rust_lts::StateIndex;

use crate::Cluster;
use crate::LayoutConfig;
use crate::LayoutError;
use crate::LtsView;
use crate::PackedRTree;
use crate::RingLayout;
use crate::Slot;
use crate::from_polar;
use crate::lts_view::Phase;

/// The position assigned to a single state, a negative angle means centered.
#[derive(Clone, Copy, Debug)]
struct Placement {
    angle: f32,
    radius: f32,
    slot: Option<Slot>,
}

impl Placement {
    fn centered(slot: Option<Slot>) -> Placement {
        Placement {
            angle: -1.0,
            radius: 0.0,
            slot,
        }
    }
}

impl LtsView {
    /// Assigns every clustered state a polar position on the top disk of its
    /// cluster. The clusters are processed from the highest rank down to the
    /// root, such that the successors of a state are positioned before it.
    ///
    /// With `multi_pass` enabled this is only the initial layout for the
    /// [crate::ForceDirected] relaxation, the slots are released since the
    /// states move freely over the disk from then on.
    pub fn position_states(&mut self, config: &LayoutConfig) -> Result<(), LayoutError> {
        self.require(Phase::Sized)?;
        let start = std::time::Instant::now();

        for state in &mut self.states {
            state.center();
            state.slot = None;
        }

        for rank in (0..self.clusters_in_rank.len()).rev() {
            for position in 0..self.clusters_in_rank[rank].len() {
                let cluster = &self.clusters_in_rank[rank][position];

                let placements = if self.is_leaf_cluster(cluster) {
                    self.leaf_placements(cluster)
                } else {
                    self.node_placements(cluster)
                };

                for (index, placement) in placements {
                    let state = &mut self.states[index];
                    state.set_polar(placement.angle, placement.radius);
                    state.slot = placement.slot;
                }
            }
        }

        if config.multi_pass {
            for state in &mut self.states {
                state.slot = None;
            }
            debug!("Initialised the states for the force directed layout");
        }

        self.phase = Phase::Positioned;
        self.update_absolute_positions();
        debug!("Time position_states: {:.3}s", start.elapsed().as_secs_f64());
        Ok(())
    }

    /// A cluster without descendants, or with a single descendant that
    /// contains a single state, has nothing to pull its states towards.
    fn is_leaf_cluster(&self, cluster: &Cluster) -> bool {
        match cluster.descendants[..] {
            [] => true,
            [descendant] => self.cluster(descendant).states.len() == 1,
            _ => false,
        }
    }

    /// Spreads the states evenly over the rings, the first state takes the centre.
    fn leaf_placements(&self, cluster: &Cluster) -> Vec<(StateIndex, Placement)> {
        let rings = RingLayout::new(cluster.top_radius);
        let mut result = Vec::with_capacity(cluster.states.len());

        let Some((first, rest)) = cluster.states.split_first() else {
            return result;
        };

        result.push((*first, Placement::centered(Some(Slot { ring: 0, slot: 0 }))));
        if rest.is_empty() {
            return result;
        }

        if rings.num_rings() == 1 {
            warn!(
                "Cluster {} has no rings for its {} states, they are all centered",
                cluster.index(),
                cluster.states.len()
            );
            result.extend(rest.iter().map(|state| (*state, Placement::centered(None))));
            return result;
        }

        let num_ring_states = ring_state_counts(&rings, rest.len());
        let mut remaining = rest.iter();

        for (ring, num_states) in num_ring_states.iter().enumerate().skip(1) {
            if *num_states == 0 {
                continue;
            }

            let radius = rings.ring_radius(ring);
            let delta_angle = 360.0 / *num_states as f32;

            // Alternate the offset to avoid radial alignment of the states.
            let offset = if ring % 2 == 1 { 0.0 } else { 0.5 * delta_angle };

            for slot in 0..*num_states {
                let Some(state) = remaining.next() else {
                    break;
                };

                result.push((
                    *state,
                    Placement {
                        angle: offset + slot as f32 * delta_angle,
                        radius,
                        slot: Some(Slot { ring, slot }),
                    },
                ));
            }
        }

        for state in remaining {
            warn!("State {} does not fit on the rings of cluster {}", state, cluster.index());
            result.push((*state, Placement::centered(None)));
        }

        result
    }

    /// Assigns every state to the free slot that is nearest to the positions of its successors.
    fn node_placements(&self, cluster: &Cluster) -> Vec<(StateIndex, Placement)> {
        let rings = RingLayout::new(cluster.top_radius);
        let mut slots = PackedRTree::new(rings.slots().map(|slot| (rings.slot_position(slot), slot)));

        let mut result = Vec::with_capacity(cluster.states.len());
        for state in &cluster.states {
            let pull = self.pull_vector(cluster, *state);

            let placement = match slots.nearest(pull) {
                Some(entry) => {
                    slots.remove(entry);
                    let slot = *slots.data(entry);
                    let radius = rings.ring_radius(slot.ring);

                    if radius < 0.5 * rings.delta_ring() {
                        Placement::centered(Some(slot))
                    } else {
                        Placement {
                            angle: rings.slot_angle(slot),
                            radius,
                            slot: Some(slot),
                        }
                    }
                }
                None => {
                    warn!("Cluster {} has no free slot left for state {}", cluster.index(), state);
                    Placement::centered(None)
                }
            };

            trace!("State {} pulled towards {} is placed at {:?}", state, pull, placement);
            result.push((*state, placement));
        }

        result
    }

    /// Returns the sum of the positions of the subordinates of the given
    /// state, relative to the axis of its cluster.
    fn pull_vector(&self, cluster: &Cluster, state: StateIndex) -> Vec2 {
        let mut sum = Vec2::ZERO;

        for subordinate in &self.states[state].subordinates {
            let subordinate = &self.states[*subordinate];
            let Some(index) = subordinate.cluster else {
                continue;
            };

            let subordinate_cluster = self.cluster(index);
            if subordinate_cluster.is_centered() {
                sum += subordinate.local_position();
            } else {
                sum += from_polar(subordinate_cluster.position, cluster.base_radius);
                if !subordinate.is_centered() {
                    sum += from_polar(
                        subordinate.position_angle + subordinate_cluster.position,
                        subordinate.position_radius,
                    );
                }
            }
        }

        sum
    }
}

/// Divides the given number of states over the rings, excluding the centre,
/// proportionally to the number of slots. The last ring takes the remainder.
fn ring_state_counts(rings: &RingLayout, num_states: usize) -> Vec<usize> {
    let num_rings = rings.num_rings();
    let total_slots: usize = (1..num_rings).map(|ring| rings.num_slots(ring)).sum();

    let mut result = vec![0; num_rings];
    let mut todo = num_states;
    for (ring, count) in result.iter_mut().enumerate().skip(1) {
        if ring == num_rings - 1 {
            *count = todo;
        } else {
            let fraction = rings.num_slots(ring) as f32 / total_slots as f32;
            *count = (num_states as f32 * fraction).round() as usize;
            todo = todo.saturating_sub(*count);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use mcrl2rust_lts::LabelledTransitionSystem;
    use mcrl2rust_lts::random_lts_seeded;

    use crate::ClusterIndex;
    use crate::ring::MIN_DELTA_RING;

    use super::*;

    fn positioned(lts: LabelledTransitionSystem) -> LtsView {
        let config = LayoutConfig::default();
        let mut view = LtsView::new(lts).unwrap();
        view.rank_states(&config).unwrap();
        view.cluster_states(&config).unwrap();
        view.position_clusters(&config).unwrap();
        view.position_states(&config).unwrap();
        view
    }

    #[test]
    fn test_ring_state_counts() {
        let rings = RingLayout::new(2.0 * MIN_DELTA_RING);
        assert_eq!(ring_state_counts(&rings, 18), vec![0, 6, 12]);
        assert_eq!(ring_state_counts(&rings, 3), vec![0, 1, 2]);
        assert_eq!(ring_state_counts(&rings, 0), vec![0, 0, 0]);
    }

    #[test]
    fn test_leaf_cluster() {
        // A single cluster with seven states in rank one.
        let triples: Vec<(usize, usize, usize)> = (1..8)
            .flat_map(|state| [(0, 0, state), (state, 0, if state == 7 { 1 } else { state + 1 })])
            .collect();
        let view = positioned(LabelledTransitionSystem::from_triples(0, None, &triples, vec!["a".into()], vec![]));

        let cluster = view.cluster(ClusterIndex::new(1, 0));
        assert_eq!(cluster.num_states(), 7);
        assert!(view.state(1).is_centered());

        // The remaining six states fill the first ring, starting at zero degrees.
        let angles: Vec<f32> = (2..8).map(|state| view.state(state).position_angle()).collect();
        for (index, angle) in angles.iter().enumerate() {
            assert!((angle - 60.0 * index as f32).abs() < 1e-3);
        }
    }

    #[test]
    fn test_node_cluster_follows_successors() {
        // States 1 and 2 share a cluster with two descendants {3} and {4}.
        let lts = LabelledTransitionSystem::from_triples(
            0,
            None,
            &[(0, 0, 1), (0, 0, 2), (1, 0, 2), (1, 0, 3), (2, 0, 4)],
            vec!["a".into()],
            vec![],
        );
        let view = positioned(lts);

        let cluster = view.cluster(ClusterIndex::new(1, 0));
        assert_eq!(cluster.states(), &[1, 2]);
        assert_eq!(cluster.descendants().len(), 2);

        // The descendants are at 90 and 270 degrees, state 1 is pulled towards the
        // centre first and state 2 ends up on the lower half of the ring.
        assert!(view.state(1).is_centered());
        let state = view.state(2);
        assert_eq!(state.slot().map(|slot| slot.ring), Some(1));
        assert!(state.position_angle() > 180.0 && state.position_angle() < 360.0);
    }

    #[test]
    fn test_positions_are_reset() {
        let lts = LabelledTransitionSystem::from_triples(0, None, &[(0, 0, 1), (0, 0, 2)], vec!["a".into()], vec![]);
        let mut view = positioned(lts);

        let first = view.clone();
        view.position_states(&LayoutConfig::default()).unwrap();
        assert!(view == first);

        view.clear_state_positions();
        assert!(view.states().iter().all(|state| state.is_centered() && state.slot().is_none()));
        assert!(view.is_positioned());

        // States 1 and 2 are in different clusters, each at the centre of its own cluster.
        assert_ne!(view.state(1).cluster(), view.state(2).cluster());
        for state in view.states() {
            let cluster = view.cluster(state.cluster().unwrap());
            assert_eq!(state.position_abs(), cluster.position_abs());
        }
    }

    #[test]
    fn test_multi_pass_releases_slots() {
        for seed in 0..5 {
            let lts = random_lts_seeded(seed, 60, 3, 3);
            let single = LtsView::with_layout(lts.clone(), &LayoutConfig::default()).unwrap();
            let multi = LtsView::with_layout(
                lts,
                &LayoutConfig {
                    multi_pass: true,
                    ..Default::default()
                },
            )
            .unwrap();

            assert!(single.states().iter().any(|state| state.slot().is_some()));
            assert!(multi.states().iter().all(|state| state.slot().is_none()));

            // The single pass still provides the initial positions.
            for (a, b) in single.states().iter().zip(multi.states()) {
                assert_eq!(a.position_angle(), b.position_angle());
                assert_eq!(a.position_radius(), b.position_radius());
                assert_eq!(a.position_abs(), b.position_abs());
            }
        }
    }
}
