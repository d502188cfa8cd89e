use std::error::Error;
use std::io::Read;
use std::io::Write;

use log::debug;
use log::trace;
use regex::Regex;
use rustc_hash::FxHashMap;
use streaming_iterator::StreamingIterator;
use thiserror::Error;

use mcrl2rust_lts::CompactTransition;
use mcrl2rust_lts::LabelIndex;
use mcrl2rust_lts::LabelledTransitionSystem;
use mcrl2rust_lts::StateIndex;

use crate::line_iterator::LineIterator;

#[derive(Error, Debug)]
pub enum IOError {
    #[error("Invalid .aut header {0}")]
    InvalidHeader(&'static str),

    #[error("Invalid transition line {0}")]
    InvalidTransition(String),

    #[error("Transition {0} refers to state {1} but the header declares {2} states")]
    StateOutOfRange(usize, usize, usize),
}

/// Loads a labelled transition system in the Aldebaran format from the given reader.
///
/// The Aldebaran format consists of a header:
///     `des (<initial>: Nat, <num_of_transitions>: Nat, <num_of_states>: Nat)`
///
/// And one line for every transition:
///     `(<from>: Nat, "<label>": Str, <to>: Nat)`
///     `(<from>: Nat, <label>: Str, <to>: Nat)`
///
/// The labels in `hidden_labels` are renamed to the internal action tau.
pub fn read_aut(reader: impl Read, hidden_labels: Vec<String>) -> Result<LabelledTransitionSystem, Box<dyn Error>> {
    let start = std::time::Instant::now();
    let mut lines = LineIterator::new(reader);
    lines.advance();
    let header = lines
        .get()
        .ok_or(IOError::InvalidHeader("The first line should be the header"))?;

    // Regex for des (<initial>: Nat, <num_of_transitions>: Nat, <num_of_states>: Nat)
    let header_regex = Regex::new(r#"des\s*\(\s*([0-9]*)\s*,\s*([0-9]*)\s*,\s*([0-9]*)\s*\)\s*"#)
        .expect("Regex compilation should not fail");

    // Regex for (<from>: Nat, "<label>": str, <to>: Nat)
    let transition_regex = Regex::new(r#"\s*\(\s*([0-9]*)\s*,\s*"(.*)"\s*,\s*([0-9]*)\s*\)\s*"#)
        .expect("Regex compilation should not fail");

    // Regex for (<from>: Nat, label: str, <to>: Nat), used in the VLTS benchmarks
    let unquoted_transition_regex = Regex::new(r#"\s*\(\s*([0-9]*)\s*,\s*(.*)\s*,\s*([0-9]*)\s*\)\s*"#)
        .expect("Regex compilation should not fail");

    let (_, [initial_txt, num_of_transitions_txt, num_of_states_txt]) = header_regex
        .captures(header)
        .ok_or(IOError::InvalidHeader(
            "does not match des (<init>, <num_transitions>, <num_states>)",
        ))?
        .extract();

    let initial_state: usize = initial_txt.parse()?;
    let num_of_transitions: usize = num_of_transitions_txt.parse()?;
    let num_of_states: usize = num_of_states_txt.parse()?;

    if initial_state >= num_of_states.max(1) {
        return Err(IOError::InvalidHeader("the initial state is not one of the declared states").into());
    }

    let mut labels_index: FxHashMap<String, LabelIndex> = FxHashMap::default();
    let mut labels: Vec<String> = Vec::new();
    let mut transitions: Vec<(StateIndex, CompactTransition)> = Vec::with_capacity(num_of_transitions);

    while let Some(line) = lines.next() {
        trace!("{}", line);
        if line.trim().is_empty() {
            continue;
        }

        // Try either of the transition regexes and otherwise return an error.
        let (_, [from_txt, label_txt, to_txt]) = transition_regex
            .captures(line)
            .or_else(|| unquoted_transition_regex.captures(line))
            .ok_or_else(|| IOError::InvalidTransition(line.clone()))?
            .extract();

        // Parse the from and to states, with the given label.
        let from: usize = from_txt.parse()?;
        let to: usize = to_txt.parse()?;

        for state in [from, to] {
            if state >= num_of_states {
                return Err(IOError::StateOutOfRange(transitions.len(), state, num_of_states).into());
            }
        }

        let label_index = *labels_index.entry(label_txt.to_string()).or_insert_with(|| {
            labels.push(label_txt.to_string());
            labels.len() - 1
        });

        trace!("Read transition {} --[{}]-> {}", from, label_txt, to);
        transitions.push((from, CompactTransition::new(label_index, to)));
    }

    if transitions.len() != num_of_transitions {
        debug!(
            "The header declares {} transitions, but {} were read",
            num_of_transitions,
            transitions.len()
        );
    }

    let lts = LabelledTransitionSystem::new(
        initial_state,
        Some(num_of_states),
        || transitions.iter().cloned(),
        labels,
        hidden_labels,
    );

    debug!("Time read_aut: {:.3}s", start.elapsed().as_secs_f64());
    Ok(lts)
}

/// Writes the labelled transition system in the Aldebaran format to the given writer.
pub fn write_aut(writer: &mut impl Write, lts: &LabelledTransitionSystem) -> Result<(), Box<dyn Error>> {
    writeln!(
        writer,
        "des ({}, {}, {})",
        lts.initial_state_index(),
        lts.num_of_transitions(),
        lts.num_of_states()
    )?;

    for state_index in lts.iter_states() {
        for (label, to) in lts.outgoing_transitions(state_index) {
            writeln!(writer, "({}, \"{}\", {})", state_index, lts.labels()[label], to)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    const ABP_FRAGMENT: &str = "des (0, 4, 4)\n(0, \"r1(d1)\", 1)\n(1, \"tau\", 2)\n(2, s4(d1), 3)\n(3, \"tau\", 0)\n";

    #[test]
    fn test_reading_aut() {
        let lts = read_aut(ABP_FRAGMENT.as_bytes(), vec!["tau".into()]).unwrap();

        assert_eq!(lts.num_of_states(), 4);
        assert_eq!(lts.num_of_transitions(), 4);
        assert_eq!(lts.initial_state_index(), 0);

        // The transition 1 --tau-> 2 is hidden.
        assert!(lts.outgoing_transitions(1).all(|(label, to)| lts.is_hidden_label(label) && to == 2));
    }

    #[test]
    fn test_invalid_header() {
        assert!(read_aut("dse (0, 0, 1)".as_bytes(), vec![]).is_err());
        assert!(read_aut("des (3, 0, 1)".as_bytes(), vec![]).is_err());
    }

    #[test]
    fn test_state_out_of_range() {
        assert!(read_aut("des (0, 1, 2)\n(0, \"a\", 2)\n".as_bytes(), vec![]).is_err());
    }

    #[test]
    fn test_writing_aut() {
        let lts = read_aut(ABP_FRAGMENT.as_bytes(), vec![]).unwrap();

        let mut output: Vec<u8> = Vec::new();
        write_aut(&mut output, &lts).unwrap();

        let reread = read_aut(&output[..], vec![]).unwrap();
        assert_eq!(reread.num_of_states(), lts.num_of_states());
        assert_eq!(reread.num_of_transitions(), lts.num_of_transitions());
    }
}
