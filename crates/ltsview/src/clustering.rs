use log::debug;
use log::trace;

use mcrl2rust_lts::StateIndex;

use crate::Cluster;
use crate::ClusterIndex;
use crate::ClusterInfo;
use crate::LayoutConfig;
use crate::LayoutError;
use crate::LtsView;
use crate::lts_view::Phase;

/// The groups of states that become clusters, identified by a group number.
/// Merged groups are left empty.
struct Groups {
    members: Vec<Vec<StateIndex>>,
    in_rank: Vec<Vec<usize>>,
    state_group: Vec<Option<usize>>,
}

impl Groups {
    fn add(&mut self, rank: usize, states: Vec<StateIndex>) -> usize {
        let group = self.members.len();
        for state in &states {
            self.state_group[*state] = Some(group);
        }

        self.members.push(states);
        self.in_rank[rank].push(group);
        group
    }
}

impl LtsView {
    /// Partitions the states of every rank into clusters that form a tree,
    /// where the root is the cluster of the initial state.
    ///
    /// States of the same rank that are connected by a transition end up in the
    /// same cluster. When the states of a cluster have superiors in several
    /// clusters of the previous rank, then those clusters are merged, such
    /// that every cluster has exactly one ancestor.
    pub fn cluster_states(&mut self, config: &LayoutConfig) -> Result<(), LayoutError> {
        self.require(Phase::Ranked)?;
        if self.ranked_with != config.rank_style {
            return Err(LayoutError::RankStyleMismatch {
                ranked: self.ranked_with,
                requested: config.rank_style,
            });
        }

        let start = std::time::Instant::now();
        for state in &mut self.states {
            state.cluster = None;
        }
        self.clusters_in_rank.clear();
        self.has_cluster_info = false;

        let mut groups = self.cluster_comrades();
        self.merge_superior_groups(&mut groups);
        self.build_cluster_tree(groups);

        self.phase = Phase::Clustered;
        debug!(
            "Clustered the states into {} clusters over {} ranks",
            self.num_clusters(),
            self.clusters_in_rank.len()
        );
        debug!("Time cluster_states: {:.3}s", start.elapsed().as_secs_f64());
        Ok(())
    }

    /// Computes the aggregate counts of every cluster, descendants are visited
    /// before their ancestor.
    pub fn compute_cluster_info(&mut self) -> Result<(), LayoutError> {
        self.require(Phase::Clustered)?;

        for rank in (0..self.clusters_in_rank.len()).rev() {
            for position in 0..self.clusters_in_rank[rank].len() {
                let cluster = &self.clusters_in_rank[rank][position];

                let num_deadlocks = cluster
                    .states
                    .iter()
                    .filter(|state| self.states[**state].is_deadlock())
                    .count();

                let mut info = ClusterInfo {
                    num_deadlocks,
                    num_subtree_states: cluster.states.len(),
                    num_subtree_deadlocks: num_deadlocks,
                    num_subtree_clusters: 1,
                };

                for descendant in &cluster.descendants {
                    let descendant_info = &self.cluster(*descendant).info;
                    info.num_subtree_states += descendant_info.num_subtree_states;
                    info.num_subtree_deadlocks += descendant_info.num_subtree_deadlocks;
                    info.num_subtree_clusters += descendant_info.num_subtree_clusters;
                }

                self.clusters_in_rank[rank][position].info = info;
            }
        }

        self.has_cluster_info = true;
        Ok(())
    }

    /// Returns true iff the cluster information is up to date.
    pub fn has_cluster_info(&self) -> bool {
        self.has_cluster_info
    }

    /// Groups the states of every rank into the connected components of the
    /// comrade relation.
    fn cluster_comrades(&self) -> Groups {
        let mut groups = Groups {
            members: Vec::new(),
            in_rank: vec![Vec::new(); self.states_in_rank.len()],
            state_group: vec![None; self.states.len()],
        };

        for (rank, states) in self.states_in_rank.iter().enumerate() {
            for state in states {
                if groups.state_group[*state].is_some() {
                    continue;
                }

                // Depth first search over the comrades.
                let mut component = vec![*state];
                let mut stack = vec![*state];
                let group = groups.add(rank, Vec::new());
                groups.state_group[*state] = Some(group);

                while let Some(current) = stack.pop() {
                    for comrade in &self.states[current].comrades {
                        if groups.state_group[*comrade].is_none() {
                            groups.state_group[*comrade] = Some(group);
                            component.push(*comrade);
                            stack.push(*comrade);
                        }
                    }
                }

                groups.members[group] = component;
            }
        }

        groups
    }

    /// Merges, from the highest rank upwards, the groups of the previous rank
    /// that contain superiors of the same group.
    fn merge_superior_groups(&self, groups: &mut Groups) {
        for rank in (1..groups.in_rank.len()).rev() {
            for index in 0..groups.in_rank[rank].len() {
                let group = groups.in_rank[rank][index];

                let mut merge_set: Vec<usize> = groups.members[group]
                    .iter()
                    .flat_map(|state| self.states[*state].superiors.iter())
                    .filter_map(|superior| groups.state_group[*superior])
                    .collect();
                merge_set.sort_unstable();
                merge_set.dedup();

                if merge_set.len() > 1 {
                    trace!("Merging groups {:?} in rank {}", merge_set, rank - 1);

                    let mut merged: Vec<StateIndex> = Vec::new();
                    for other in &merge_set {
                        merged.append(&mut groups.members[*other]);
                    }

                    groups.in_rank[rank - 1].retain(|other| merge_set.binary_search(other).is_err());
                    groups.add(rank - 1, merged);
                }
            }
        }
    }

    /// Creates the clusters in a deterministic order and links every cluster
    /// to its ancestor.
    fn build_cluster_tree(&mut self, groups: Groups) {
        let Groups {
            mut members, in_rank, ..
        } = groups;

        for (rank, rank_groups) in in_rank.into_iter().enumerate() {
            let mut rank_states: Vec<Vec<StateIndex>> = rank_groups
                .into_iter()
                .map(|group| std::mem::take(&mut members[group]))
                .filter(|states| !states.is_empty())
                .collect();

            for states in &mut rank_states {
                states.sort_unstable();
            }

            // Order the clusters of a rank by their smallest state.
            rank_states.sort_unstable_by_key(|states| states[0]);

            let mut clusters = Vec::with_capacity(rank_states.len());
            for (position, states) in rank_states.into_iter().enumerate() {
                let index = ClusterIndex::new(rank, position);
                for state in &states {
                    self.states[*state].cluster = Some(index);
                }

                clusters.push(Cluster::new(rank, position, states));
            }

            self.clusters_in_rank.push(clusters);
        }

        // The ancestor is the cluster of the smallest superior of the first
        // state, all superiors are in the same cluster after merging.
        for rank in 1..self.clusters_in_rank.len() {
            for position in 0..self.clusters_in_rank[rank].len() {
                let first = self.clusters_in_rank[rank][position].states[0];
                let ancestor = self.states[first]
                    .superiors
                    .first()
                    .and_then(|superior| self.states[*superior].cluster)
                    .expect("Every state in a rank above zero has a superior");

                let index = ClusterIndex::new(rank, position);
                self.clusters_in_rank[rank][position].ancestor = Some(ancestor);
                self.cluster_mut(ancestor).descendants.push(index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use mcrl2rust_lts::LabelledTransitionSystem;
    use mcrl2rust_lts::random_lts_seeded;

    use crate::RankStyle;

    use super::*;

    fn clustered(lts: LabelledTransitionSystem, config: &LayoutConfig) -> LtsView {
        let mut view = LtsView::new(lts).unwrap();
        view.rank_states(config).unwrap();
        view.cluster_states(config).unwrap();
        view.compute_cluster_info().unwrap();
        view
    }

    /// Checks the partition and tree invariants of the clustering.
    fn check_cluster_tree(view: &LtsView) {
        for rank in 0..view.num_ranks() {
            let mut clustered: Vec<StateIndex> = view
                .clusters_in_rank(rank)
                .iter()
                .flat_map(|cluster| cluster.states().iter().copied())
                .collect();
            clustered.sort_unstable();

            let mut ranked: Vec<StateIndex> = view.states_in_rank(rank).to_vec();
            ranked.sort_unstable();
            assert_eq!(clustered, ranked, "Rank {rank} is not partitioned by its clusters");
        }

        for cluster in view.clusters() {
            for state in cluster.states() {
                assert_eq!(view.state(*state).rank(), Some(cluster.rank()));
                assert_eq!(view.state(*state).cluster(), Some(cluster.index()));
            }

            match cluster.ancestor() {
                None => assert_eq!(cluster.rank(), 0),
                Some(ancestor) => {
                    let ancestor = view.cluster(ancestor);
                    assert_eq!(ancestor.rank() + 1, cluster.rank());
                    assert_eq!(
                        ancestor.descendants().iter().filter(|index| **index == cluster.index()).count(),
                        1
                    );
                }
            }
        }

        assert_eq!(view.clusters_in_rank(0).len(), 1);
    }

    #[test]
    fn test_comrades_share_a_cluster() {
        let lts = LabelledTransitionSystem::from_triples(
            0,
            None,
            &[(0, 0, 1), (0, 0, 2), (0, 0, 3), (1, 0, 2)],
            vec!["a".into()],
            vec![],
        );

        let view = clustered(lts, &LayoutConfig::default());
        check_cluster_tree(&view);

        let rank_one = view.clusters_in_rank(1);
        assert_eq!(rank_one.len(), 2);
        assert_eq!(rank_one[0].states(), &[1, 2]);
        assert_eq!(rank_one[1].states(), &[3]);
    }

    #[test]
    fn test_superior_clusters_are_merged() {
        // States 1 and 2 are in different clusters, but share the successor 3.
        let lts = LabelledTransitionSystem::from_triples(
            0,
            None,
            &[(0, 0, 1), (0, 0, 2), (0, 0, 4), (1, 0, 3), (2, 0, 3), (4, 0, 5)],
            vec!["a".into()],
            vec![],
        );

        let view = clustered(lts, &LayoutConfig::default());
        check_cluster_tree(&view);

        let rank_one = view.clusters_in_rank(1);
        assert_eq!(rank_one.len(), 2);
        assert_eq!(rank_one[0].states(), &[1, 2]);
        assert_eq!(rank_one[1].states(), &[4]);
        assert_eq!(view.cluster(ClusterIndex::new(0, 0)).descendants().len(), 2);
    }

    #[test]
    fn test_cluster_info() {
        let lts = LabelledTransitionSystem::from_triples(
            0,
            None,
            &[(0, 0, 1), (0, 0, 2), (1, 0, 3), (2, 0, 3), (3, 0, 4)],
            vec!["a".into()],
            vec![],
        );

        let view = clustered(lts, &LayoutConfig::default());
        let root = view.root_cluster().unwrap();
        assert_eq!(root.info().num_subtree_states, 5);
        assert_eq!(root.info().num_subtree_deadlocks, 1);
        assert_eq!(root.info().num_subtree_clusters, 4);
        assert!(view.clusters_in_rank(3)[0].has_deadlock());
        assert!(!root.has_deadlock());
    }

    #[test]
    fn test_style_mismatch() {
        let lts = LabelledTransitionSystem::from_triples(0, None, &[(0, 0, 1)], vec!["a".into()], vec![]);
        let mut view = LtsView::new(lts).unwrap();
        view.rank_states(&LayoutConfig::default()).unwrap();

        let cyclic = LayoutConfig {
            rank_style: RankStyle::Cyclic,
            ..Default::default()
        };
        assert!(matches!(view.cluster_states(&cyclic), Err(LayoutError::RankStyleMismatch { .. })));
        assert_eq!(view.num_clusters(), 0);
    }

    #[test]
    fn test_random_cluster_trees() {
        for seed in 0..30 {
            for style in [RankStyle::Iterative, RankStyle::Cyclic] {
                let config = LayoutConfig {
                    rank_style: style,
                    ..Default::default()
                };

                let view = clustered(random_lts_seeded(seed, 60, 3, 4), &config);
                check_cluster_tree(&view);

                let root = view.root_cluster().unwrap();
                let reachable = view.states().iter().filter(|state| state.rank().is_some()).count();
                assert_eq!(root.info().num_subtree_states, reachable);
                assert_eq!(root.info().num_subtree_clusters, view.num_clusters());
            }
        }
    }
}
