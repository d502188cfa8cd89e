use log::debug;
use log::trace;
use log::warn;

use mcrl2rust_lts::StateIndex;

use crate::LayoutConfig;
use crate::LayoutError;
use crate::LtsView;
use crate::RankStyle;
use crate::lts_view::Phase;

impl LtsView {
    /// Assigns a rank to every state that is reachable from the initial state,
    /// and classifies the transitions. Any previous clustering and layout is
    /// discarded.
    pub fn rank_states(&mut self, config: &LayoutConfig) -> Result<(), LayoutError> {
        if self.initial_state >= self.states.len() {
            return Err(LayoutError::InvalidInitialState(self.initial_state, self.states.len()));
        }

        let start = std::time::Instant::now();
        self.clear_ranks_and_clusters();

        match config.rank_style {
            RankStyle::Iterative => self.apply_iterative_ranking(),
            RankStyle::Cyclic => self.apply_cyclic_ranking(),
        }

        for state in &mut self.states {
            state.superiors.sort_unstable();
            state.superiors.dedup();
            state.subordinates.sort_unstable();
            state.subordinates.dedup();
            state.comrades.sort_unstable();
            state.comrades.dedup();
        }

        // A back pointer goes to a lower rank, transitions within a rank are comrades.
        for transition in &mut self.transitions {
            transition.back_pointer = match (self.states[transition.from].rank, self.states[transition.to].rank) {
                (Some(from), Some(to)) => to < from,
                _ => false,
            };
        }

        let num_unreachable = self.states.iter().filter(|state| state.rank.is_none()).count();
        if num_unreachable > 0 {
            warn!("{num_unreachable} states are not reachable from the initial state and are not visualised");
        }

        self.ranked_with = config.rank_style;
        self.phase = Phase::Ranked;

        debug!(
            "Ranked {} states into {} ranks ({:?}), {} back pointers",
            self.states.len() - num_unreachable,
            self.states_in_rank.len(),
            config.rank_style,
            self.num_back_pointers()
        );
        debug!("Time rank_states: {:.3}s", start.elapsed().as_secs_f64());
        Ok(())
    }

    /// The rank of a state is the length of a shortest path from the initial state.
    fn apply_iterative_ranking(&mut self) {
        let mut current_rank = 0;
        self.states[self.initial_state].rank = Some(0);
        self.states_in_rank.push(vec![self.initial_state]);

        while !self.states_in_rank[current_rank].is_empty() {
            let mut next_rank: Vec<StateIndex> = Vec::new();

            for index in 0..self.states_in_rank[current_rank].len() {
                let begin = self.states_in_rank[current_rank][index];

                for out_index in 0..self.states[begin].out_transitions.len() {
                    let end = self.transitions[self.states[begin].out_transitions[out_index]].to;
                    self.link(begin, end, current_rank, &mut next_rank);
                }
            }

            trace!("Rank {}: {:?}", current_rank + 1, next_rank);
            self.states_in_rank.push(next_rank);
            current_rank += 1;
        }

        // The last rank is always empty.
        self.states_in_rank.pop();
    }

    /// Follows both the incoming and outgoing transitions, so every transition
    /// connects states whose ranks differ by at most one.
    fn apply_cyclic_ranking(&mut self) {
        let mut current_rank = 0;
        self.states[self.initial_state].rank = Some(0);
        self.states_in_rank.push(vec![self.initial_state]);

        while !self.states_in_rank[current_rank].is_empty() {
            let mut next_rank: Vec<StateIndex> = Vec::new();

            for index in 0..self.states_in_rank[current_rank].len() {
                let current = self.states_in_rank[current_rank][index];

                for in_index in 0..self.states[current].in_transitions.len() {
                    let begin = self.transitions[self.states[current].in_transitions[in_index]].from;
                    self.link(current, begin, current_rank, &mut next_rank);
                }

                for out_index in 0..self.states[current].out_transitions.len() {
                    let end = self.transitions[self.states[current].out_transitions[out_index]].to;
                    self.link(current, end, current_rank, &mut next_rank);
                }
            }

            trace!("Rank {}: {:?}", current_rank + 1, next_rank);
            self.states_in_rank.push(next_rank);
            current_rank += 1;
        }

        self.states_in_rank.pop();
    }

    /// Records the relation between the state `current` in the current rank
    /// and a state `other` connected to it by a transition, ranking `other`
    /// when it has no rank yet.
    fn link(&mut self, current: StateIndex, other: StateIndex, current_rank: usize, next_rank: &mut Vec<StateIndex>) {
        match self.states[other].rank {
            None => {
                self.states[other].rank = Some(current_rank + 1);
                next_rank.push(other);
                self.states[current].subordinates.push(other);
                self.states[other].superiors.push(current);
            }
            Some(rank) if rank == current_rank + 1 => {
                self.states[current].subordinates.push(other);
                self.states[other].superiors.push(current);
            }
            Some(rank) if rank == current_rank => {
                self.states[current].comrades.push(other);
                self.states[other].comrades.push(current);
            }
            Some(_) => {
                // A transition to a lower rank.
            }
        }
    }
}
