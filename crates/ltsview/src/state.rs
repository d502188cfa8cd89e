use glam::Vec2;
use glam::Vec3;

use mcrl2rust_lts::LabelIndex;
use mcrl2rust_lts::StateIndex;

use crate::ClusterIndex;

/// The index of a transition in the transition table of a view.
pub type TransitionIndex = usize;

/// A transition of the visualised LTS.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub(crate) from: StateIndex,
    pub(crate) to: StateIndex,
    pub(crate) label: LabelIndex,
    pub(crate) back_pointer: bool,
}

impl Transition {
    pub fn from(&self) -> StateIndex {
        self.from
    }

    pub fn to(&self) -> StateIndex {
        self.to
    }

    pub fn label(&self) -> LabelIndex {
        self.label
    }

    /// Returns true iff this transition goes to a state of a lower rank.
    pub fn is_back_pointer(&self) -> bool {
        self.back_pointer
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

/// A single position on the top disk of a cluster, identified by its ring and
/// the index of the slot within that ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot {
    pub ring: usize,
    pub slot: usize,
}

/// A state of the visualised LTS together with its layout information.
#[derive(Clone, Debug, PartialEq)]
pub struct State {
    pub(crate) id: StateIndex,
    pub(crate) original_id: StateIndex,

    pub(crate) rank: Option<usize>,
    pub(crate) cluster: Option<ClusterIndex>,

    // Polar position in degrees on the top disk of the cluster, a negative
    // angle means that the state is centered.
    pub(crate) position_angle: f32,
    pub(crate) position_radius: f32,
    pub(crate) slot: Option<Slot>,

    pub(crate) position_abs: Vec3,
    pub(crate) outgoing_control: Vec3,
    pub(crate) incoming_control: Vec3,
    pub(crate) loop_control1: Vec3,
    pub(crate) loop_control2: Vec3,

    pub(crate) in_transitions: Vec<TransitionIndex>,
    pub(crate) out_transitions: Vec<TransitionIndex>,
    pub(crate) loops: Vec<TransitionIndex>,

    // Neighbours in the previous, next and same rank that are connected by a transition.
    pub(crate) superiors: Vec<StateIndex>,
    pub(crate) subordinates: Vec<StateIndex>,
    pub(crate) comrades: Vec<StateIndex>,

    pub(crate) simulated: bool,
    pub(crate) selected: bool,
}

impl State {
    pub(crate) fn new(id: StateIndex) -> State {
        State {
            id,
            original_id: id,
            rank: None,
            cluster: None,
            position_angle: -1.0,
            position_radius: 0.0,
            slot: None,
            position_abs: Vec3::ZERO,
            outgoing_control: Vec3::ZERO,
            incoming_control: Vec3::ZERO,
            loop_control1: Vec3::ZERO,
            loop_control2: Vec3::ZERO,
            in_transitions: Vec::new(),
            out_transitions: Vec::new(),
            loops: Vec::new(),
            superiors: Vec::new(),
            subordinates: Vec::new(),
            comrades: Vec::new(),
            simulated: false,
            selected: false,
        }
    }

    pub fn id(&self) -> StateIndex {
        self.id
    }

    /// The index of this state in the unzoomed LTS.
    pub fn original_id(&self) -> StateIndex {
        self.original_id
    }

    /// Returns the rank, or None when the state is unreachable or not ranked yet.
    pub fn rank(&self) -> Option<usize> {
        self.rank
    }

    pub fn cluster(&self) -> Option<ClusterIndex> {
        self.cluster
    }

    pub fn position_angle(&self) -> f32 {
        self.position_angle
    }

    pub fn position_radius(&self) -> f32 {
        self.position_radius
    }

    /// Returns the slot assigned by the single pass positioner, this is
    /// cleared when the state is moved by the force directed relaxation.
    pub fn slot(&self) -> Option<Slot> {
        self.slot
    }

    pub fn is_centered(&self) -> bool {
        self.position_angle < -0.9
    }

    pub(crate) fn center(&mut self) {
        self.position_angle = -1.0;
        self.position_radius = 0.0;
    }

    pub(crate) fn set_polar(&mut self, angle: f32, radius: f32) {
        self.position_angle = angle;
        self.position_radius = radius;
    }

    /// Returns the position on the top disk of the cluster as a vector in the
    /// frame of the cluster.
    pub fn local_position(&self) -> Vec2 {
        if self.is_centered() {
            Vec2::ZERO
        } else {
            from_polar(self.position_angle, self.position_radius)
        }
    }

    pub fn position_abs(&self) -> Vec3 {
        self.position_abs
    }

    pub fn outgoing_control(&self) -> Vec3 {
        self.outgoing_control
    }

    pub fn incoming_control(&self) -> Vec3 {
        self.incoming_control
    }

    pub fn loop_control1(&self) -> Vec3 {
        self.loop_control1
    }

    pub fn loop_control2(&self) -> Vec3 {
        self.loop_control2
    }

    pub fn in_transitions(&self) -> &[TransitionIndex] {
        &self.in_transitions
    }

    /// The outgoing transitions, excluding self loops.
    pub fn out_transitions(&self) -> &[TransitionIndex] {
        &self.out_transitions
    }

    pub fn loops(&self) -> &[TransitionIndex] {
        &self.loops
    }

    pub fn superiors(&self) -> &[StateIndex] {
        &self.superiors
    }

    pub fn subordinates(&self) -> &[StateIndex] {
        &self.subordinates
    }

    pub fn comrades(&self) -> &[StateIndex] {
        &self.comrades
    }

    pub fn is_deadlock(&self) -> bool {
        self.out_transitions.len() + self.loops.len() == 0
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    pub fn set_simulated(&mut self, simulated: bool) {
        self.simulated = simulated;
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// Forgets the ranking, clustering and layout information.
    pub(crate) fn clear_hierarchy(&mut self) {
        self.rank = None;
        self.cluster = None;
        self.slot = None;
        self.superiors.clear();
        self.subordinates.clear();
        self.comrades.clear();
        self.center();
    }
}

/// Converts an angle in degrees and a radius to a vector.
pub fn from_polar(angle: f32, radius: f32) -> Vec2 {
    Vec2::from_angle(angle.to_radians()) * radius
}

/// Converts a vector to an angle in degrees in [0, 360) and a radius.
pub fn to_polar(vector: Vec2) -> (f32, f32) {
    let radius = vector.length();
    if radius == 0.0 || !radius.is_finite() {
        return (0.0, 0.0);
    }

    let mut angle = vector.y.atan2(vector.x).to_degrees();
    if angle < 0.0 {
        angle += 360.0;
    }

    if angle >= 360.0 {
        // Adding 360 to a tiny negative angle rounds up.
        angle = 0.0;
    }

    (angle, radius)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_polar_conversion() {
        let (angle, radius) = to_polar(from_polar(270.0, 2.0));
        assert!((angle - 270.0).abs() < 1e-3, "angle {angle}");
        assert!((radius - 2.0).abs() < 1e-5, "radius {radius}");

        let (angle, radius) = to_polar(Vec2::new(1.0, -1e-9));
        assert!((0.0..360.0).contains(&angle));
        assert!((radius - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_centered_state() {
        let mut state = State::new(0);
        assert!(state.is_centered());
        assert_eq!(state.local_position(), Vec2::ZERO);

        state.set_polar(90.0, 1.0);
        assert!(!state.is_centered());
        assert!((state.local_position() - Vec2::new(0.0, 1.0)).length() < 1e-5);
    }
}
