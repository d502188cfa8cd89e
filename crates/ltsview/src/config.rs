/// Determines how states are assigned to ranks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RankStyle {
    /// The rank of a state is the length of a shortest path from the initial state.
    #[default]
    Iterative,

    /// Transitions are followed in both directions, such that every transition
    /// connects states whose ranks differ by at most one.
    Cyclic,
}

/// Determines how the descendants of a cluster are spread over its base circle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClusterStyle {
    /// Every descendant gets an angular sector proportional to its bounding cylinder.
    #[default]
    Weighted,

    /// All descendants get sectors of equal size, as done by FSMView.
    Uniform,
}

/// Parameters of the force directed relaxation. The defaults are tuned for
/// the ring spacing used by the single pass positioner.
#[derive(Clone, Debug, PartialEq)]
pub struct ForceConfig {
    /// The rest length of the springs between connected states.
    pub handle_length: f32,

    /// The strength of the repulsion between states in the same cluster.
    pub repulsion_strength: f32,

    /// The time step of one relaxation step.
    pub delta: f32,

    /// The fraction of the velocity that is kept after every step.
    pub damping: f32,

    /// The maximum length of the force acting on a single state.
    pub max_force: f32,
}

impl Default for ForceConfig {
    fn default() -> Self {
        ForceConfig {
            handle_length: 0.3,
            repulsion_strength: 0.005,
            delta: 0.1,
            damping: 0.8,
            max_force: 1.0,
        }
    }
}

/// All the settings that influence the layout pipeline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutConfig {
    pub rank_style: RankStyle,
    pub cluster_style: ClusterStyle,

    /// When set the single pass positions are only the starting point of a
    /// force directed relaxation driven by the caller.
    pub multi_pass: bool,

    pub force: ForceConfig,
}
