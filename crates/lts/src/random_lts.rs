use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::CompactTransition;
use crate::LabelledTransitionSystem;

/// Generates a monolithic LTS with the desired number of states, labels and
/// (maximum) out degree for all the states.
pub fn random_lts(num_of_states: usize, num_of_labels: u32, outdegree: usize) -> LabelledTransitionSystem {
    random_lts_with(&mut rand::rng(), num_of_states, num_of_labels, outdegree)
}

/// Same as [random_lts], but reproducible for the given seed.
pub fn random_lts_seeded(seed: u64, num_of_states: usize, num_of_labels: u32, outdegree: usize) -> LabelledTransitionSystem {
    random_lts_with(&mut StdRng::seed_from_u64(seed), num_of_states, num_of_labels, outdegree)
}

fn random_lts_with<R: Rng>(
    rng: &mut R,
    num_of_states: usize,
    num_of_labels: u32,
    outdegree: usize,
) -> LabelledTransitionSystem {
    // Introduce lower case letters for the labels.
    let labels: Vec<String> = (0..num_of_labels)
        .map(|i| char::from_digit(i + 10, 36).map_or_else(|| format!("l{i}"), |c| c.to_string()))
        .collect();

    let mut transitions: Vec<(usize, CompactTransition)> = Vec::new();
    for from in 0..num_of_states {
        let mut outgoing: Vec<CompactTransition> = Vec::new();

        // Introduce outgoing transitions for this state based on the desired out degree.
        for _ in 0..rng.random_range(0..outdegree.max(1)) {
            // Pick a random label and state.
            let label = rng.random_range(0..num_of_labels.max(1)) as usize;
            let to = rng.random_range(0..num_of_states);

            let transition = CompactTransition::new(label, to);
            if let Err(pos) = outgoing.binary_search(&transition) {
                outgoing.insert(pos, transition);
            }
        }

        transitions.extend(outgoing.into_iter().map(|transition| (from, transition)));
    }

    LabelledTransitionSystem::new(
        0,
        Some(num_of_states),
        || transitions.iter().cloned(),
        labels,
        vec![],
    )
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_random_lts() {
        let lts = random_lts(10, 3, 3);
        assert_eq!(lts.num_of_states(), 10);
    }

    #[test]
    fn test_random_lts_seeded() {
        assert_eq!(random_lts_seeded(42, 20, 3, 4), random_lts_seeded(42, 20, 3, 4));
    }
}
