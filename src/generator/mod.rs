/*
    This module generates sentences
*/

use rand::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Display;

use itertools::Itertools;
use log::trace;

use crate::error_handling::*;
use crate::grammar::{Grammar, Symbol};

#[derive(Debug, PartialEq)]
pub enum GenerateErrorType {
    // A nonterminal without any production was reached
    UndefinedNonterminal(String),
    // The derivation went deeper than allowed
    DepthExceeded(usize),
}

impl ErrorType for GenerateErrorType {}

impl Display for GenerateErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerateErrorType::UndefinedNonterminal(nonterminal) => write!(f, "No definition for nonterminal `{}`", nonterminal),
            GenerateErrorType::DepthExceeded(depth) => write!(f, "Derivation did not finish within {} steps", depth),
        }
    }
}

pub type GenerateError = Error<GenerateErrorType>;
pub type GenResult = Result<String, GenerateErrorType>;

// A word of the language, one entry per terminal
pub type Word = Vec<String>;

pub fn generate<R: Rng + ?Sized>(grammar: &Grammar, rng: &mut R, max_depth: usize) -> GenResult {
    generate_nonterminal(&grammar.start_symbol, grammar, rng, max_depth)
}

fn generate_nonterminal<R: Rng + ?Sized>(nonterminal: &str, grammar: &Grammar, rng: &mut R, depth: usize) -> GenResult {
    if depth == 0 {
        return Err(GenerateErrorType::DepthExceeded(0));
    }

    let alternatives = grammar.productions_of(nonterminal).collect_vec();
    let production = alternatives
        .choose(rng)
        .ok_or_else(|| GenerateErrorType::UndefinedNonterminal(nonterminal.to_string()))?;

    let mut result = String::new();
    for symbol in &production.right {
        let generated = match symbol {
            Symbol::Nonterminal(n) => generate_nonterminal(n, grammar, rng, depth - 1),
            Symbol::Terminal(t) => Ok(t.clone()),
        };
        result.push_str(&generated.map_err(|e| match e {
            GenerateErrorType::DepthExceeded(d) => GenerateErrorType::DepthExceeded(d + 1),
            e => e,
        })?);
    }

    return Ok(result);
}

/// Every word of length at most `max_len` that the grammar derives, found as
/// the least fixed point of the per-nonterminal word sets.
pub fn enumerate(grammar: &Grammar, max_len: usize) -> BTreeSet<Word> {
    let mut words: HashMap<String, BTreeSet<Word>> = grammar.nonterminals.iter()
        .map(|n| (n.clone(), BTreeSet::new()))
        .collect();
    let empty = BTreeSet::new();
    let mut changed = true;
    let mut rounds = 0;

    while changed {
        changed = false;
        rounds += 1;
        for production in &grammar.productions {
            let mut partial: BTreeSet<Word> = BTreeSet::from([Vec::new()]);
            for symbol in &production.right {
                partial = match symbol {
                    Symbol::Terminal(t) => partial.into_iter()
                        .filter(|prefix| prefix.len() < max_len)
                        .map(|mut prefix| { prefix.push(t.clone()); prefix })
                        .collect(),
                    Symbol::Nonterminal(n) => partial.iter()
                        .cartesian_product(words.get(n).unwrap_or(&empty))
                        .filter(|(prefix, suffix)| prefix.len() + suffix.len() <= max_len)
                        .map(|(prefix, suffix)| prefix.iter().chain(suffix).cloned().collect())
                        .collect(),
                };
                if partial.is_empty() {
                    break;
                }
            }

            let known = words.entry(production.left.clone()).or_default();
            for word in partial {
                if known.insert(word) {
                    changed = true;
                }
            }
        }
    }

    trace!("enumeration up to length {} settled after {} rounds", max_len, rounds);
    words.remove(&grammar.start_symbol).unwrap_or_default()
}
