use std::collections::VecDeque;

use log::debug;

use mcrl2rust_lts::LabelledTransitionSystem;
use mcrl2rust_lts::StateIndex;

use crate::ClusterIndex;
use crate::LayoutConfig;
use crate::LayoutError;
use crate::LtsView;
use crate::lts_view::Phase;

impl LtsView {
    /// Replaces this view by the view of the states that are reachable from
    /// the first state of `target` through the subtree rooted in `target`.
    /// The current view is kept, unchanged, as the previous level.
    pub fn zoom_into_below(&mut self, target: ClusterIndex) -> Result<(), LayoutError> {
        self.require(Phase::Clustered)?;

        let allowed = self.subtree_states(target, &[])?;
        let initial = self.cluster(target).states[0];

        let view = self.extract_view(initial, &allowed)?;
        self.push_level(view);
        Ok(())
    }

    /// Replaces this view by the view of the states in the clusters on the
    /// path from the root to `target` that are reachable from the initial state.
    pub fn zoom_into_above(&mut self, target: ClusterIndex) -> Result<(), LayoutError> {
        self.require(Phase::Clustered)?;
        if self.get_cluster(target).is_none() {
            return Err(LayoutError::InvalidCluster(target));
        }

        let mut path = vec![target];
        while let Some(ancestor) = self.cluster(path[path.len() - 1]).ancestor {
            path.push(ancestor);
        }

        // Every descendant of a cluster on the path that is not on the path itself.
        let severed: Vec<ClusterIndex> = path
            .iter()
            .flat_map(|index| self.cluster(*index).descendants.iter().copied())
            .filter(|index| !path.contains(index))
            .collect();

        let root = path[path.len() - 1];
        let allowed = self.subtree_states(root, &severed)?;

        let view = self.extract_view(self.initial_state, &allowed)?;
        self.push_level(view);
        Ok(())
    }

    /// Restores the view that this view was zoomed from. Returns false, and
    /// does nothing, when this is the top level.
    pub fn zoom_out(&mut self) -> bool {
        match self.previous_level.take() {
            Some(previous) => {
                *self = *previous;
                debug!("Zoomed out to level {}", self.zoom_level);
                true
            }
            None => false,
        }
    }

    /// Zooms out until the top level is reached, returns the number of levels.
    pub fn zoom_out_till_top(&mut self) -> usize {
        let mut levels = 0;
        while self.zoom_out() {
            levels += 1;
        }

        levels
    }

    fn push_level(&mut self, view: LtsView) {
        let parent = std::mem::replace(self, view);
        self.previous_level = Some(Box::new(parent));
        debug!("Zoomed in to level {}", self.zoom_level);
    }

    /// Creates and lays out the view of the states in `allowed`, which must
    /// be sorted, that are reachable from `initial` without leaving `allowed`.
    fn extract_view(&self, initial: StateIndex, allowed: &[StateIndex]) -> Result<LtsView, LayoutError> {
        let mut reachable = vec![false; self.states.len()];
        let mut queue = VecDeque::from([initial]);
        reachable[initial] = true;

        while let Some(state) = queue.pop_front() {
            for transition in &self.states[state].out_transitions {
                let to = self.transitions[*transition].to;
                if !reachable[to] && allowed.binary_search(&to).is_ok() {
                    reachable[to] = true;
                    queue.push_back(to);
                }
            }
        }

        let states: Vec<StateIndex> = (0..self.states.len()).filter(|state| reachable[*state]).collect();
        let mut mapping = vec![None; self.states.len()];
        for (new, old) in states.iter().enumerate() {
            mapping[*old] = Some(new);
        }

        let triples: Vec<(StateIndex, usize, StateIndex)> = states
            .iter()
            .flat_map(|state| self.states[*state].out_transitions.iter().chain(&self.states[*state].loops))
            .filter_map(|transition| {
                let transition = &self.transitions[*transition];
                Some((mapping[transition.from]?, transition.label, mapping[transition.to]?))
            })
            .collect();

        // The labels already start with tau, so the label indices are preserved.
        let lts = LabelledTransitionSystem::from_triples(
            mapping[initial].unwrap_or_default(),
            Some(states.len()),
            &triples,
            self.lts.labels().to_vec(),
            vec!["tau".to_string()],
        );

        let mut view = LtsView::new(lts)?;
        for (new, old) in states.iter().enumerate() {
            view.states[new].original_id = self.states[*old].original_id;
        }
        view.zoom_level = self.zoom_level + 1;
        view.max_ranks = Some(self.max_ranks());

        let config = LayoutConfig {
            rank_style: self.ranked_with,
            ..self.config.clone()
        };
        view.run_pipeline(&config)?;

        debug!(
            "Extracted {} of {} states and {} transitions",
            view.num_states(),
            self.num_states(),
            view.num_transitions()
        );
        Ok(view)
    }
}
