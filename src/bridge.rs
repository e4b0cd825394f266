/*
    Conversions between right-linear grammars and finite automata
*/

use std::collections::HashSet;
use std::fmt::Display;

use log::debug;

use crate::automaton::{Automaton, AutomatonErrorType, TransitionTable};
use crate::error_handling::*;
use crate::grammar::{Grammar, GrammarErrorType, Production, Symbol};

// Preferred name of the accepting state added for `A → a` productions,
// primed until it clashes with no grammar symbol
pub const ACCEPT_STATE: &str = "X";

#[derive(Debug, PartialEq)]
pub enum BridgeErrorType {
    // A production is not of the form `a`, `a B` or ε
    MalformedBridgeInput(Production),
    // The grammar does not pass validation
    InvalidGrammar(GrammarErrorType),
    // The automaton does not pass validation
    InvalidAutomaton(AutomatonErrorType),
}

impl ErrorType for BridgeErrorType {}

impl Display for BridgeErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeErrorType::MalformedBridgeInput(production) => write!(f, "`{}` is not right-linear", production),
            BridgeErrorType::InvalidGrammar(e) => write!(f, "Invalid grammar: {}", e),
            BridgeErrorType::InvalidAutomaton(e) => write!(f, "Invalid automaton: {}", e),
        }
    }
}

impl From<GrammarErrorType> for BridgeErrorType {
    fn from(error: GrammarErrorType) -> Self {
        BridgeErrorType::InvalidGrammar(error)
    }
}

impl From<AutomatonErrorType> for BridgeErrorType {
    fn from(error: AutomatonErrorType) -> Self {
        BridgeErrorType::InvalidAutomaton(error)
    }
}

pub type BridgeError = Error<BridgeErrorType>;
pub type Result<T> = std::result::Result<T, BridgeErrorType>;

/// Builds an automaton with one state per nonterminal plus an accepting
/// state. `A → a B` becomes a transition from A to B on `a`, `A → a` a
/// transition into the accepting state, and `A → ε` makes A accepting.
pub fn grammar_to_automaton(grammar: &Grammar) -> Result<Automaton> {
    grammar.validate()?;

    let mut accept = ACCEPT_STATE.to_string();
    while grammar.nonterminals.contains(&accept) || grammar.terminals.contains(&accept) {
        accept.push('\'');
    }

    let mut automaton = Automaton {
        states: grammar.nonterminals.iter().cloned().chain([accept.clone()]).collect(),
        alphabet: grammar.terminals.clone(),
        transitions: TransitionTable::new(),
        start_state: grammar.start_symbol.clone(),
        accepting: HashSet::from([accept.clone()]),
    };

    for production in &grammar.productions {
        match &production.right[..] {
            [] => {
                automaton.accepting.insert(production.left.clone());
            }
            [Symbol::Terminal(t)] => automaton.add_transition(&production.left, t, &accept),
            [Symbol::Terminal(t), Symbol::Nonterminal(next)] => automaton.add_transition(&production.left, t, next),
            _ => return Err(BridgeErrorType::MalformedBridgeInput(production.clone())),
        }
    }

    debug!(
        "grammar to automaton: {} states, {} transitions",
        automaton.states.len(),
        automaton.transition_count()
    );
    Ok(automaton)
}

/// Builds a right-linear grammar with one nonterminal per state: `p → a q`
/// for every transition and `f → ε` for every accepting state.
pub fn automaton_to_grammar(automaton: &Automaton) -> Result<Grammar> {
    automaton.validate()?;

    let mut productions = Vec::new();
    for (state, row) in &automaton.transitions {
        for (symbol, targets) in row {
            for target in targets {
                productions.push(Production::new(state.clone(), vec![
                    Symbol::Terminal(symbol.clone()),
                    Symbol::Nonterminal(target.clone())
                ]));
            }
        }
    }
    for state in &automaton.accepting {
        productions.push(Production::new(state.clone(), Vec::new()));
    }
    productions.sort();

    Ok(Grammar::new(
        automaton.states.clone(),
        automaton.alphabet.clone(),
        productions,
        automaton.start_state.clone()
    )?)
}

impl Grammar {
    pub fn to_automaton(&self) -> Result<Automaton> {
        grammar_to_automaton(self)
    }
}

impl Automaton {
    pub fn to_regular_grammar(&self) -> Result<Grammar> {
        automaton_to_grammar(self)
    }
}
