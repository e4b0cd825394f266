/*
    This module is for storing and running finite automata
*/

pub mod subset;

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Display;

use itertools::Itertools;

use crate::error_handling::*;

// state -> symbol -> targets; a missing entry means no transition
pub type TransitionTable = HashMap<String, HashMap<String, HashSet<String>>>;

#[derive(Debug, PartialEq)]
pub enum AutomatonErrorType {
    // A transition or accepting state names a state outside Q
    UndefinedState(String),
    // The start state is not in Q
    UndefinedStart(String),
    // A transition reads a symbol outside the alphabet
    UndefinedSymbol(String),
}

impl ErrorType for AutomatonErrorType {}

impl Display for AutomatonErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AutomatonErrorType::UndefinedState(state) => write!(f, "State `{}` is not in the state set", state),
            AutomatonErrorType::UndefinedStart(state) => write!(f, "Start state `{}` is not in the state set", state),
            AutomatonErrorType::UndefinedSymbol(symbol) => write!(f, "Symbol `{}` is not in the alphabet", symbol),
        }
    }
}

pub type AutomatonError = Error<AutomatonErrorType>;
pub type Result<T> = std::result::Result<T, AutomatonErrorType>;

/// A finite automaton. `transitions` may map a (state, symbol) pair to
/// several states, in which case the automaton is nondeterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct Automaton {
    pub states: HashSet<String>,
    pub alphabet: HashSet<String>,
    pub transitions: TransitionTable,
    pub start_state: String,
    pub accepting: HashSet<String>,
}

fn to_set(names: &[&str]) -> HashSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

impl Automaton {
    pub fn new(states: HashSet<String>, alphabet: HashSet<String>, transitions: TransitionTable, start_state: String, accepting: HashSet<String>) -> Result<Self> {
        let automaton = Automaton { states, alphabet, transitions, start_state, accepting };
        automaton.validate()?;
        Ok(automaton)
    }

    /// Builds an automaton from a literal definition, one `(state, symbol,
    /// targets)` entry per transition.
    pub fn from_definition(states: &[&str], alphabet: &[&str], start: &str, transitions: &[(&str, &str, &[&str])], accepting: &[&str]) -> Result<Self> {
        let mut table = TransitionTable::new();
        for (state, symbol, targets) in transitions {
            table.entry(state.to_string())
                .or_default()
                .entry(symbol.to_string())
                .or_default()
                .extend(targets.iter().map(|target| target.to_string()));
        }

        Automaton::new(to_set(states), to_set(alphabet), table, start.to_string(), to_set(accepting))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.states.contains(&self.start_state) {
            return Err(AutomatonErrorType::UndefinedStart(self.start_state.clone()));
        }

        for (state, row) in self.transitions.iter().sorted_by_key(|(state, _)| *state) {
            if !self.states.contains(state) {
                return Err(AutomatonErrorType::UndefinedState(state.clone()));
            }
            for (symbol, targets) in row.iter().sorted_by_key(|(symbol, _)| *symbol) {
                if !self.alphabet.contains(symbol) {
                    return Err(AutomatonErrorType::UndefinedSymbol(symbol.clone()));
                }
                if let Some(target) = targets.iter().filter(|t| !self.states.contains(*t)).sorted().next() {
                    return Err(AutomatonErrorType::UndefinedState(target.clone()));
                }
            }
        }

        match self.accepting.iter().filter(|f| !self.states.contains(*f)).sorted().next() {
            Some(state) => Err(AutomatonErrorType::UndefinedState(state.clone())),
            None => Ok(()),
        }
    }

    pub(crate) fn add_transition(&mut self, from: &str, symbol: &str, to: &str) {
        self.transitions.entry(from.to_string())
            .or_default()
            .entry(symbol.to_string())
            .or_default()
            .insert(to.to_string());
    }

    pub fn targets<'a>(&'a self, state: &str, symbol: &str) -> impl Iterator<Item = &'a String> + 'a {
        self.transitions.get(state)
            .and_then(|row| row.get(symbol))
            .into_iter()
            .flatten()
    }

    /// True when no (state, symbol) pair has more than one target.
    pub fn is_deterministic(&self) -> bool {
        self.transitions.values()
            .all(|row| row.values().all(|targets| targets.len() <= 1))
    }

    /// Runs the automaton over `word`, tracking every state it could be in.
    pub fn accepts<I, S>(&self, word: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut current: HashSet<&String> = HashSet::from([&self.start_state]);
        for symbol in word {
            current = current.iter()
                .flat_map(|state| self.targets(state, symbol.as_ref()))
                .collect();
            if current.is_empty() {
                return false;
            }
        }
        current.iter().any(|state| self.accepting.contains(*state))
    }

    pub fn reachable_states(&self) -> HashSet<String> {
        let mut reachable = HashSet::from([self.start_state.clone()]);
        let mut queue = VecDeque::from([self.start_state.clone()]);

        while let Some(state) = queue.pop_front() {
            let Some(row) = self.transitions.get(&state) else { continue };
            for target in row.values().flatten() {
                if reachable.insert(target.clone()) {
                    queue.push_back(target.clone());
                }
            }
        }

        reachable
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.values().flat_map(HashMap::values).map(HashSet::len).sum()
    }
}

fn braced<'a>(names: impl Iterator<Item = &'a String>) -> String {
    format!("{{{}}}", names.sorted().join(", "))
}

impl Display for Automaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "States: {}", braced(self.states.iter()))?;
        writeln!(f, "Alphabet: {}", braced(self.alphabet.iter()))?;
        writeln!(f, "Start: {}", self.start_state)?;
        writeln!(f, "Accepting: {}", braced(self.accepting.iter()))?;
        write!(f, "Transitions:")?;

        let rows = self.transitions.iter()
            .flat_map(|(state, row)| row.iter().map(move |(symbol, targets)| (state, symbol, targets)))
            .filter(|(_, _, targets)| !targets.is_empty())
            .sorted_by_key(|(state, symbol, _)| (*state, *symbol));
        for (state, symbol, targets) in rows {
            match targets.iter().exactly_one() {
                Ok(target) => write!(f, "\n({}, {}) -> {}", state, symbol, target)?,
                Err(_) => write!(f, "\n({}, {}) -> {}", state, symbol, braced(targets.iter()))?,
            }
        }
        Ok(())
    }
}
