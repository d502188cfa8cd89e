use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use glam::Vec2;
use log::debug;

use mcrl2rust_lts::StateIndex;

use crate::Cluster;
use crate::ForceConfig;
use crate::LayoutError;
use crate::LtsView;
use crate::lts_view::Phase;
use crate::to_polar;

/// Below this distance two states are considered to be at the same position.
const MIN_DISTANCE: f32 = 1e-4;

/// Iteratively improves the positions of the states within their clusters
/// using spring forces along the transitions between adjacent ranks and
/// repulsion between the states of a cluster.
pub struct ForceDirected {
    config: ForceConfig,
    velocities: Vec<Vec2>,
}

impl ForceDirected {
    /// Starts a relaxation from the current positions of the view.
    pub fn new(view: &LtsView, config: &ForceConfig) -> Result<ForceDirected, LayoutError> {
        view.require(Phase::Positioned)?;

        Ok(ForceDirected {
            config: config.clone(),
            velocities: vec![Vec2::ZERO; view.num_states()],
        })
    }

    /// Performs a single relaxation step and returns the total displacement
    /// of the states.
    pub fn step(&mut self, view: &mut LtsView) -> f32 {
        self.velocities.resize(view.num_states(), Vec2::ZERO);

        let forces: Vec<Vec2> = (0..view.num_states()).map(|state| self.force(view, state)).collect();

        let mut displacement = 0.0;
        for (index, force) in forces.into_iter().enumerate() {
            let Some(cluster) = view.states[index].cluster else {
                continue;
            };
            let top_radius = view.cluster(cluster).top_radius;

            let velocity = (self.velocities[index] + force * self.config.delta) * self.config.damping;
            self.velocities[index] = velocity;

            let state = &mut view.states[index];
            let old = state.local_position();
            let (angle, radius) = to_polar((old + velocity).clamp_length_max(top_radius));

            if radius < MIN_DISTANCE {
                state.center();
            } else {
                state.set_polar(angle, radius);
            }
            state.slot = None;

            displacement += state.local_position().distance(old);
        }

        view.update_absolute_positions();
        displacement
    }

    /// Repeats relaxation steps until the stop flag is raised or the given
    /// number of steps has been performed, returns the number of steps.
    pub fn run(&mut self, view: &mut LtsView, stop: &AtomicBool, max_steps: Option<usize>) -> usize {
        let mut steps = 0;
        let mut displacement = 0.0;

        while !stop.load(Ordering::Relaxed) && max_steps.map_or(true, |max| steps < max) {
            displacement = self.step(view);
            steps += 1;
        }

        debug!("Performed {steps} force directed steps, last displacement {displacement:.5}");
        steps
    }

    /// The total force on the given state in the frame of its cluster.
    fn force(&self, view: &LtsView, index: StateIndex) -> Vec2 {
        let state = &view.states[index];
        let Some(cluster) = state.cluster else {
            return Vec2::ZERO;
        };

        let cluster = view.cluster(cluster);
        if cluster.top_radius <= 0.0 {
            return Vec2::ZERO;
        }

        let position = state.local_position();
        let mut force = Vec2::ZERO;

        for neighbour in state.superiors.iter().chain(&state.subordinates) {
            let target = local_projection(view, cluster, *neighbour);
            force += compute_spring_force(position, target, self.config.handle_length);
        }

        for other in &cluster.states {
            if *other != index {
                force += compute_repulsion_force(
                    position,
                    view.states[*other].local_position(),
                    self.config.repulsion_strength,
                    index,
                );
            }
        }

        force.clamp_length_max(self.config.max_force)
    }
}

/// The position of the given state projected onto the plane of the cluster, in the frame of the cluster.
fn local_projection(view: &LtsView, cluster: &Cluster, state: StateIndex) -> Vec2 {
    let offset = (view.states[state].position_abs - cluster.position_abs).truncate();
    Vec2::from_angle(-cluster.rotation.to_radians()).rotate(offset)
}

/// Compute a spring force between two points with a desired rest length.
fn compute_spring_force(p1: Vec2, p2: Vec2, rest_length: f32) -> Vec2 {
    let dist = p1.distance(p2);

    if dist < MIN_DISTANCE {
        Vec2::ZERO
    } else {
        (p2 - p1) / dist * f32::log2(dist / rest_length)
    }
}

/// Computes a repulsion force between two points with a given strength,
/// states at the same position are pushed in a direction based on their index.
fn compute_repulsion_force(p1: Vec2, p2: Vec2, repulsion_strength: f32, index: StateIndex) -> Vec2 {
    let dist = p1.distance(p2);

    if dist < MIN_DISTANCE {
        Vec2::from_angle(index as f32) * repulsion_strength / MIN_DISTANCE
    } else {
        (p1 - p2) * repulsion_strength / (dist * dist)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use mcrl2rust_lts::random_lts_seeded;

    use crate::LayoutConfig;

    use super::*;

    fn multi_pass_view(seed: u64) -> LtsView {
        let config = LayoutConfig {
            multi_pass: true,
            ..Default::default()
        };

        LtsView::with_layout(random_lts_seeded(seed, 60, 3, 3), &config).unwrap()
    }

    #[test]
    fn test_requires_positions() {
        let view = LtsView::new(random_lts_seeded(0, 10, 2, 2)).unwrap();
        assert!(matches!(
            ForceDirected::new(&view, &ForceConfig::default()),
            Err(LayoutError::NotPositioned)
        ));
    }

    #[test]
    fn test_relaxation_stays_bounded() {
        for seed in 0..5 {
            let mut view = multi_pass_view(seed);
            let mut layout = ForceDirected::new(&view, &ForceConfig::default()).unwrap();

            for _ in 0..200 {
                let displacement = layout.step(&mut view);
                assert!(displacement.is_finite());
            }

            for state in view.states() {
                let Some(cluster) = state.cluster() else {
                    continue;
                };

                assert!(state.position_abs().is_finite());
                assert!(state.position_radius() <= view.cluster(cluster).top_radius() + 1e-4);
                assert!(state.is_centered() || (0.0..360.0).contains(&state.position_angle()));
            }
        }
    }

    #[test]
    fn test_relaxation_from_centre() {
        let mut view = multi_pass_view(3);
        view.clear_state_positions();

        let mut layout = ForceDirected::new(&view, &ForceConfig::default()).unwrap();
        layout.step(&mut view);

        // Repulsion separates the states of every cluster that has room for them.
        for cluster in view.clusters() {
            if cluster.num_states() > 1 && cluster.top_radius() > 0.0 {
                assert!(cluster.states().iter().any(|state| !view.state(*state).is_centered()));
            }
        }
    }

    #[test]
    fn test_stop_flag() {
        let mut view = multi_pass_view(1);
        let mut layout = ForceDirected::new(&view, &ForceConfig::default()).unwrap();

        let stop = AtomicBool::new(true);
        assert_eq!(layout.run(&mut view, &stop, None), 0);

        stop.store(false, Ordering::Relaxed);
        assert_eq!(layout.run(&mut view, &stop, Some(10)), 10);
        assert!(view.states().iter().all(|state| state.slot().is_none()));
    }

    #[test]
    fn test_deterministic() {
        let mut first = multi_pass_view(2);
        let mut second = first.clone();

        let stop = AtomicBool::new(false);
        ForceDirected::new(&first, &ForceConfig::default())
            .unwrap()
            .run(&mut first, &stop, Some(25));
        ForceDirected::new(&second, &ForceConfig::default())
            .unwrap()
            .run(&mut second, &stop, Some(25));

        assert!(first == second);
    }
}
