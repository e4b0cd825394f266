//! Grammars and finite automata: normalization to Chomsky Normal Form,
//! subset construction, and conversion between right-linear grammars and
//! automata.

pub mod automaton;
pub mod bridge;
pub mod error_handling;
pub mod generator;
pub mod grammar;
pub mod parser;
