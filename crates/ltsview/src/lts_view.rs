use std::fmt;

use log::debug;

use mcrl2rust_lts::LabelledTransitionSystem;
use mcrl2rust_lts::StateIndex;

use crate::Cluster;
use crate::ClusterIndex;
use crate::LayoutConfig;
use crate::LayoutError;
use crate::RankStyle;
use crate::State;
use crate::Transition;

/// How far the layout pipeline has progressed, every operation requires the
/// previous phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Phase {
    Loaded,
    Ranked,
    Clustered,
    Sized,
    Positioned,
}

/// The visualisation of a labelled transition system, owning all states,
/// transitions and clusters. States and transitions are stored in flat
/// vectors, the clusters in a table indexed by rank and position in the rank.
#[derive(Clone, PartialEq)]
pub struct LtsView {
    pub(crate) lts: LabelledTransitionSystem,

    pub(crate) states: Vec<State>,
    pub(crate) transitions: Vec<Transition>,
    pub(crate) initial_state: StateIndex,

    pub(crate) states_in_rank: Vec<Vec<StateIndex>>,
    pub(crate) clusters_in_rank: Vec<Vec<Cluster>>,

    pub(crate) config: LayoutConfig,
    pub(crate) phase: Phase,
    pub(crate) ranked_with: RankStyle,
    pub(crate) has_cluster_info: bool,

    pub(crate) num_deadlocks: usize,
    pub(crate) zoom_level: usize,
    pub(crate) max_ranks: Option<usize>,
    pub(crate) previous_level: Option<Box<LtsView>>,
}

impl LtsView {
    /// Creates the states and transitions of the view for the given LTS. The
    /// view is not ranked, clustered or positioned.
    pub fn new(lts: LabelledTransitionSystem) -> Result<LtsView, LayoutError> {
        let initial_state = lts.initial_state_index();
        if initial_state >= lts.num_of_states() {
            return Err(LayoutError::InvalidInitialState(initial_state, lts.num_of_states()));
        }

        let mut states: Vec<State> = lts.iter_states().map(State::new).collect();
        let mut transitions: Vec<Transition> = Vec::with_capacity(lts.num_of_transitions());

        for from in lts.iter_states() {
            for (label, to) in lts.outgoing_transitions(from) {
                let index = transitions.len();
                transitions.push(Transition {
                    from,
                    to,
                    label,
                    back_pointer: false,
                });

                if from == to {
                    states[from].loops.push(index);
                } else {
                    states[from].out_transitions.push(index);
                    states[to].in_transitions.push(index);
                }
            }
        }

        let num_deadlocks = states.iter().filter(|state| state.is_deadlock()).count();
        debug!(
            "Created view with {} states, {} transitions and {} deadlocks",
            states.len(),
            transitions.len(),
            num_deadlocks
        );

        Ok(LtsView {
            lts,
            states,
            transitions,
            initial_state,
            states_in_rank: Vec::new(),
            clusters_in_rank: Vec::new(),
            config: LayoutConfig::default(),
            phase: Phase::Loaded,
            ranked_with: RankStyle::default(),
            has_cluster_info: false,
            num_deadlocks,
            zoom_level: 0,
            max_ranks: None,
            previous_level: None,
        })
    }

    /// Creates a view for the given LTS and applies the complete layout pipeline.
    pub fn with_layout(lts: LabelledTransitionSystem, config: &LayoutConfig) -> Result<LtsView, LayoutError> {
        let mut view = LtsView::new(lts)?;
        view.run_pipeline(config)?;
        Ok(view)
    }

    /// Ranks, clusters and positions the states with the given configuration.
    pub fn run_pipeline(&mut self, config: &LayoutConfig) -> Result<(), LayoutError> {
        let start = std::time::Instant::now();

        self.rank_states(config)?;
        self.cluster_states(config)?;
        self.compute_cluster_info()?;
        self.position_clusters(config)?;
        self.position_states(config)?;
        self.config = config.clone();

        if self.max_ranks.is_none() {
            self.max_ranks = Some(self.num_ranks());
        }

        debug!("Time run_pipeline: {:.3}s", start.elapsed().as_secs_f64());
        Ok(())
    }

    /// Returns the underlying labelled transition system.
    pub fn lts(&self) -> &LabelledTransitionSystem {
        &self.lts
    }

    /// Returns the configuration of the last complete pipeline run.
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn initial_state(&self) -> StateIndex {
        self.initial_state
    }

    pub fn state(&self, index: StateIndex) -> &State {
        &self.states[index]
    }

    pub fn state_mut(&mut self, index: StateIndex) -> &mut State {
        &mut self.states[index]
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn transition(&self, index: usize) -> &Transition {
        &self.transitions[index]
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Returns the name of the given label.
    pub fn label(&self, label: usize) -> &str {
        &self.lts.labels()[label]
    }

    /// Returns the cluster with the given index, panics when it does not exist.
    pub fn cluster(&self, index: ClusterIndex) -> &Cluster {
        &self.clusters_in_rank[index.rank][index.position]
    }

    pub fn cluster_mut(&mut self, index: ClusterIndex) -> &mut Cluster {
        &mut self.clusters_in_rank[index.rank][index.position]
    }

    /// Returns the cluster with the given index, if it exists.
    pub fn get_cluster(&self, index: ClusterIndex) -> Option<&Cluster> {
        self.clusters_in_rank.get(index.rank)?.get(index.position)
    }

    /// Returns the root of the cluster tree, if the states have been clustered.
    pub fn root_cluster(&self) -> Option<&Cluster> {
        self.get_cluster(ClusterIndex::new(0, 0))
    }

    pub fn clusters_in_rank(&self, rank: usize) -> &[Cluster] {
        self.clusters_in_rank.get(rank).map_or(&[], |clusters| &clusters[..])
    }

    /// Returns the states with the given rank in the order in which they were ranked.
    pub fn states_in_rank(&self, rank: usize) -> &[StateIndex] {
        self.states_in_rank.get(rank).map_or(&[], |states| &states[..])
    }

    /// Iterates over the clusters in increasing rank.
    pub fn clusters(&self) -> impl DoubleEndedIterator<Item = &Cluster> {
        self.clusters_in_rank.iter().flatten()
    }

    /// Iterates over the clusters from the highest rank down to the root.
    pub fn clusters_rev(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters_in_rank.iter().rev().flat_map(|rank| rank.iter().rev())
    }

    /// Returns the indices of all clusters in increasing rank.
    pub fn cluster_indices(&self) -> Vec<ClusterIndex> {
        self.clusters().map(Cluster::index).collect()
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_transitions(&self) -> usize {
        self.transitions.len()
    }

    pub fn num_clusters(&self) -> usize {
        self.clusters_in_rank.iter().map(Vec::len).sum()
    }

    pub fn num_ranks(&self) -> usize {
        self.clusters_in_rank.len().max(self.states_in_rank.len())
    }

    pub fn num_deadlocks(&self) -> usize {
        self.num_deadlocks
    }

    pub fn num_back_pointers(&self) -> usize {
        self.transitions.iter().filter(|transition| transition.back_pointer).count()
    }

    /// The number of ranks of the unzoomed view.
    pub fn max_ranks(&self) -> usize {
        self.max_ranks.unwrap_or_else(|| self.num_ranks())
    }

    pub fn zoom_level(&self) -> usize {
        self.zoom_level
    }

    /// Returns the view that this view was zoomed from.
    pub fn previous_level(&self) -> Option<&LtsView> {
        self.previous_level.as_deref()
    }

    /// Returns true iff the states have been positioned.
    pub fn is_positioned(&self) -> bool {
        self.phase >= Phase::Positioned
    }

    /// Returns the states of the subtree rooted in the given cluster, ignoring
    /// the severed clusters and their subtrees.
    pub fn subtree_states(&self, root: ClusterIndex, severed: &[ClusterIndex]) -> Result<Vec<StateIndex>, LayoutError> {
        if self.phase < Phase::Clustered {
            return Err(LayoutError::NotClustered);
        }

        if self.get_cluster(root).is_none() {
            return Err(LayoutError::InvalidCluster(root));
        }

        let mut result = Vec::new();
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            let cluster = self.cluster(index);
            result.extend_from_slice(&cluster.states);

            let start = stack.len();
            stack.extend(cluster.active_descendants(severed));
            stack[start..].reverse();
        }

        result.sort_unstable();
        Ok(result)
    }

    /// Moves all states back to the centre of their cluster, for example
    /// before starting a new force directed relaxation.
    pub fn clear_state_positions(&mut self) {
        for state in &mut self.states {
            state.center();
            state.slot = None;
        }

        if self.phase >= Phase::Positioned {
            self.update_absolute_positions();
        }
    }

    /// Forgets all ranking, clustering and layout information.
    pub(crate) fn clear_ranks_and_clusters(&mut self) {
        for state in &mut self.states {
            state.clear_hierarchy();
        }

        for transition in &mut self.transitions {
            transition.back_pointer = false;
        }

        self.states_in_rank.clear();
        self.clusters_in_rank.clear();
        self.has_cluster_info = false;
        self.phase = Phase::Loaded;
    }

    /// Checks that the pipeline reached at least the given phase.
    pub(crate) fn require(&self, phase: Phase) -> Result<(), LayoutError> {
        if self.phase >= phase {
            return Ok(());
        }

        Err(match phase {
            Phase::Loaded | Phase::Ranked => LayoutError::NotRanked,
            Phase::Clustered => LayoutError::NotClustered,
            Phase::Sized => LayoutError::NotSized,
            Phase::Positioned => LayoutError::NotPositioned,
        })
    }
}

impl fmt::Display for LtsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of states: {}", self.num_states())?;
        writeln!(f, "Number of transitions: {}", self.num_transitions())?;
        writeln!(f, "Number of deadlocks: {}", self.num_deadlocks())?;
        writeln!(f, "Number of back pointers: {}", self.num_back_pointers())?;
        writeln!(f, "Number of ranks: {}", self.num_ranks())?;
        write!(f, "Number of clusters: {}", self.num_clusters())
    }
}

impl fmt::Debug for LtsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self)?;
        writeln!(f, "Zoom level: {}", self.zoom_level)?;

        for cluster in self.clusters() {
            writeln!(
                f,
                "cluster {} states {:?} ancestor {:?} position {:.3} top {:.3} base {:.3}",
                cluster.index(),
                cluster.states,
                cluster.ancestor,
                cluster.position,
                cluster.top_radius,
                cluster.base_radius
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_view_transitions() {
        let lts = LabelledTransitionSystem::from_triples(
            0,
            None,
            &[(0, 0, 1), (1, 0, 1), (1, 0, 0)],
            vec!["a".into()],
            vec![],
        );

        let view = LtsView::new(lts).unwrap();
        assert_eq!(view.num_states(), 2);
        assert_eq!(view.num_transitions(), 3);
        assert_eq!(view.state(1).loops().len(), 1);
        assert_eq!(view.state(1).out_transitions().len(), 1);
        assert_eq!(view.state(0).in_transitions().len(), 1);
        assert_eq!(view.num_deadlocks(), 0);
    }

    #[test]
    fn test_subtree_states() {
        let lts = LabelledTransitionSystem::from_triples(
            0,
            None,
            &[(0, 0, 1), (0, 1, 2), (1, 0, 3), (2, 1, 3), (3, 0, 4)],
            vec!["a".into(), "b".into()],
            vec![],
        );
        let view = LtsView::with_layout(lts, &LayoutConfig::default()).unwrap();

        let root = ClusterIndex::new(0, 0);
        assert_eq!(view.subtree_states(root, &[]).unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(view.subtree_states(ClusterIndex::new(1, 0), &[]).unwrap(), vec![1, 2, 3, 4]);

        // Severing a cluster also removes its subtree.
        assert_eq!(view.subtree_states(root, &[ClusterIndex::new(2, 0)]).unwrap(), vec![0, 1, 2]);
        assert_eq!(view.subtree_states(root, &[ClusterIndex::new(3, 0)]).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(
            view.subtree_states(ClusterIndex::new(4, 0), &[]),
            Err(LayoutError::InvalidCluster(ClusterIndex::new(4, 0)))
        );
    }

    #[test]
    fn test_preconditions() {
        let lts = LabelledTransitionSystem::from_triples(0, None, &[(0, 0, 1)], vec!["a".into()], vec![]);
        let mut view = LtsView::new(lts).unwrap();
        let config = LayoutConfig::default();

        assert_eq!(view.cluster_states(&config), Err(LayoutError::NotRanked));
        assert_eq!(view.compute_cluster_info(), Err(LayoutError::NotClustered));
        assert_eq!(view.position_clusters(&config), Err(LayoutError::NotClustered));
        assert_eq!(view.position_states(&config), Err(LayoutError::NotSized));
        assert_eq!(
            view.subtree_states(ClusterIndex::new(0, 0), &[]),
            Err(LayoutError::NotClustered)
        );

        // The failed operations did not modify anything.
        assert!(view.states().iter().all(|state| state.rank().is_none()));
        assert_eq!(view.num_clusters(), 0);
    }
}
