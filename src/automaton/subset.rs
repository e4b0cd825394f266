/*
    Subset construction: turns a nondeterministic automaton into a
    deterministic one whose states are sets of the original states
*/

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use itertools::Itertools;
use log::{debug, trace};

use super::{Automaton, TransitionTable};

// Label of the empty set, the dead state every missing transition goes to
pub const SINK_LABEL: &str = "∅";

pub type StateSet = BTreeSet<String>;

/// The result of a subset construction. Composite states are identified by
/// the set of original states they stand for; the label is only their name
/// in the resulting automaton.
#[derive(Debug, Clone)]
pub struct SubsetConstruction {
    pub dfa: Automaton,
    labels: BTreeMap<StateSet, String>,
}

impl SubsetConstruction {
    pub fn label_of<S: AsRef<str>>(&self, states: &[S]) -> Option<&str> {
        let key: StateSet = states.iter().map(|s| s.as_ref().to_string()).collect();
        self.labels.get(&key).map(String::as_str)
    }

    pub fn composite_states(&self) -> impl Iterator<Item = (&StateSet, &str)> {
        self.labels.iter().map(|(set, label)| (set, label.as_str()))
    }
}

fn base_label(states: &StateSet) -> String {
    if states.is_empty() {
        SINK_LABEL.to_string()
    } else {
        format!("{{{}}}", states.iter().join(","))
    }
}

// Original state names may already contain braces or commas, so two sets can
// print the same. Later ones get primes until the name is free.
fn unique_label(states: &StateSet, used: &mut HashSet<String>) -> String {
    let mut label = base_label(states);
    while used.contains(&label) {
        label.push('\'');
    }
    used.insert(label.clone());
    label
}

pub fn construct(nfa: &Automaton) -> SubsetConstruction {
    let alphabet = nfa.alphabet.iter().sorted().collect_vec();
    let mut labels: BTreeMap<StateSet, String> = BTreeMap::new();
    // Labels must not reuse alphabet symbols, or the DFA cannot become a grammar
    let mut used: HashSet<String> = nfa.alphabet.iter().cloned().collect();
    let mut transitions = TransitionTable::new();
    let mut queue = VecDeque::new();

    let start: StateSet = BTreeSet::from([nfa.start_state.clone()]);
    let start_label = unique_label(&start, &mut used);
    labels.insert(start.clone(), start_label.clone());
    queue.push_back(start);

    // The empty set is explored like any other, which gives the sink its
    // self loops
    while let Some(current) = queue.pop_front() {
        let current_label = labels[&current].clone();
        let row = transitions.entry(current_label).or_default();

        for symbol in &alphabet {
            let target: StateSet = current.iter()
                .flat_map(|state| nfa.targets(state, symbol))
                .cloned()
                .collect();

            let target_label = match labels.get(&target) {
                Some(label) => label.clone(),
                None => {
                    let label = unique_label(&target, &mut used);
                    trace!("new composite state {}", label);
                    labels.insert(target.clone(), label.clone());
                    queue.push_back(target);
                    label
                }
            };
            row.entry(symbol.to_string()).or_default().insert(target_label);
        }
    }

    let accepting = labels.iter()
        .filter(|(set, _)| set.iter().any(|state| nfa.accepting.contains(state)))
        .map(|(_, label)| label.clone())
        .collect();

    let dfa = Automaton {
        states: labels.values().cloned().collect(),
        alphabet: nfa.alphabet.clone(),
        transitions,
        start_state: start_label,
        accepting,
    };
    debug!("subset construction: {} states became {}", nfa.states.len(), dfa.states.len());

    SubsetConstruction { dfa, labels }
}

impl Automaton {
    pub fn nfa_to_dfa(&self) -> Automaton {
        construct(self).dfa
    }
}
