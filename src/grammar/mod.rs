/*
    This module is for storing, validating and classifying grammars
*/

pub mod normalize;

use std::collections::HashSet;
use std::fmt::Display;

use itertools::Itertools;

use crate::error_handling::*;

// The marker used for the empty right side when reading and printing rules
pub const EPSILON: &str = "ε";

// The base unit in a grammar rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Terminal(String),
    Nonterminal(String),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Terminal(name) | Symbol::Nonterminal(name) => name,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }

    pub fn as_nonterminal(&self) -> Option<&str> {
        match self {
            Symbol::Nonterminal(name) => Some(name),
            Symbol::Terminal(_) => None,
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// The symbols in a single alternative, empty for ε
pub type Alternative = Vec<Symbol>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Production {
    pub left: String,
    pub right: Alternative,
}

impl Production {
    pub fn new(left: impl Into<String>, right: Alternative) -> Self {
        Production { left: left.into(), right }
    }

    pub fn is_epsilon(&self) -> bool {
        self.right.is_empty()
    }

    /// The target of a unit production `A → B`, if this is one.
    pub fn unit_target(&self) -> Option<&str> {
        match &self.right[..] {
            [Symbol::Nonterminal(target)] => Some(target),
            _ => None,
        }
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = &str> {
        self.right.iter().filter_map(Symbol::as_nonterminal)
    }
}

impl Display for Production {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.right.is_empty() {
            write!(f, "{} → {}", self.left, EPSILON)
        } else {
            write!(f, "{} → {}", self.left, self.right.iter().join(" "))
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum GrammarErrorType {
    // A right side uses a symbol outside VN ∪ VT
    UndefinedSymbol(String),
    // The start symbol is not a nonterminal
    UndefinedStart(String),
    // A production is written for something that is not a nonterminal
    UndefinedNonterminal(String),
    // The same name is both a terminal and a nonterminal
    OverlappingSymbol(String),
    // ε appears next to other symbols in one right side
    MisplacedEpsilon(String),
}

impl ErrorType for GrammarErrorType {}

impl Display for GrammarErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrammarErrorType::UndefinedSymbol(symbol) => write!(f, "Symbol `{}` is neither a terminal nor a nonterminal", symbol),
            GrammarErrorType::UndefinedStart(start) => write!(f, "Start symbol `{}` is not a nonterminal", start),
            GrammarErrorType::UndefinedNonterminal(left) => write!(f, "Production defined for `{}`, which is not a nonterminal", left),
            GrammarErrorType::OverlappingSymbol(symbol) => write!(f, "`{}` is both a terminal and a nonterminal", symbol),
            GrammarErrorType::MisplacedEpsilon(right) => write!(f, "`{}` mixes {} with other symbols", right, EPSILON),
        }
    }
}

pub type GrammarError = Error<GrammarErrorType>;
pub type Result<T> = std::result::Result<T, GrammarErrorType>;

// Position of a grammar in the Chomsky hierarchy, as far as this crate cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarClass {
    Regular,
    NotRegular,
}

impl Display for GrammarClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrammarClass::Regular => write!(f, "Regular (Type-3)"),
            GrammarClass::NotRegular => write!(f, "Not Regular"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Grammar {
    pub nonterminals: HashSet<String>,
    pub terminals: HashSet<String>,
    pub productions: Vec<Production>,
    pub start_symbol: String,
}

// Productions are a multiset, so their order does not matter for equality
impl PartialEq for Grammar {
    fn eq(&self, other: &Self) -> bool {
        self.start_symbol == other.start_symbol
            && self.nonterminals == other.nonterminals
            && self.terminals == other.terminals
            && self.productions.iter().sorted().eq(other.productions.iter().sorted())
    }
}

// Turns one right side of a rule table into an alternative
fn parse_table_alternative(right: &str, nonterminals: &HashSet<String>, terminals: &HashSet<String>) -> Result<Alternative> {
    let names = right.split_whitespace().collect_vec();
    if names == [EPSILON] {
        return Ok(Vec::new());
    }
    if names.contains(&EPSILON) {
        return Err(GrammarErrorType::MisplacedEpsilon(right.to_string()));
    }

    names.into_iter().map(|name| {
        if terminals.contains(name) {
            Ok(Symbol::Terminal(name.to_string()))
        } else if nonterminals.contains(name) {
            Ok(Symbol::Nonterminal(name.to_string()))
        } else {
            Err(GrammarErrorType::UndefinedSymbol(name.to_string()))
        }
    }).collect()
}

impl Grammar {
    pub fn new(nonterminals: HashSet<String>, terminals: HashSet<String>, productions: Vec<Production>, start_symbol: String) -> Result<Self> {
        let grammar = Grammar { nonterminals, terminals, productions, start_symbol };
        grammar.validate()?;
        Ok(grammar)
    }

    /// Builds a grammar from a rule table. Each right side is a space separated
    /// list of symbol names, or `ε` on its own.
    pub fn from_table(nonterminals: &[&str], terminals: &[&str], table: &[(&str, &[&str])], start: &str) -> Result<Self> {
        let nonterminals: HashSet<String> = nonterminals.iter().map(|s| s.to_string()).collect();
        let terminals: HashSet<String> = terminals.iter().map(|s| s.to_string()).collect();

        let mut productions = Vec::new();
        for (left, rights) in table {
            for right in rights.iter() {
                let right = parse_table_alternative(right, &nonterminals, &terminals)?;
                productions.push(Production::new(*left, right));
            }
        }

        Grammar::new(nonterminals, terminals, productions, start.to_string())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.nonterminals.contains(&self.start_symbol) {
            return Err(GrammarErrorType::UndefinedStart(self.start_symbol.clone()));
        }

        if let Some(shared) = self.nonterminals.intersection(&self.terminals).sorted().next() {
            return Err(GrammarErrorType::OverlappingSymbol(shared.clone()));
        }

        for production in &self.productions {
            if !self.nonterminals.contains(&production.left) {
                return Err(GrammarErrorType::UndefinedNonterminal(production.left.clone()));
            }

            let undefined = production.right.iter().find(|symbol| match symbol {
                Symbol::Terminal(t) => !self.terminals.contains(t),
                Symbol::Nonterminal(n) => !self.nonterminals.contains(n),
            });
            if let Some(symbol) = undefined {
                return Err(GrammarErrorType::UndefinedSymbol(symbol.name().to_string()));
            }
        }

        Ok(())
    }

    /// A grammar is regular when every right side is `a`, `a B` or ε.
    pub fn classify(&self) -> GrammarClass {
        let regular = self.productions.iter().all(|production| matches!(
            &production.right[..],
            [] | [Symbol::Terminal(_)] | [Symbol::Terminal(_), Symbol::Nonterminal(_)]
        ));

        if regular {
            GrammarClass::Regular
        } else {
            GrammarClass::NotRegular
        }
    }

    pub fn is_cnf(&self) -> bool {
        self.productions.iter().all(|production| matches!(
            &production.right[..],
            [Symbol::Terminal(_)] | [Symbol::Nonterminal(_), Symbol::Nonterminal(_)]
        ))
    }

    pub fn productions_of<'a>(&'a self, left: &'a str) -> impl Iterator<Item = &'a Production> + 'a {
        self.productions.iter().filter(move |production| production.left == left)
    }

    // Productions ordered by (left, right) for printing
    pub fn sorted_productions(&self) -> Vec<&Production> {
        self.productions.iter()
            .sorted_by(|a, b| {
                let a_names = a.right.iter().map(Symbol::name).collect_vec();
                let b_names = b.right.iter().map(Symbol::name).collect_vec();
                (&a.left, a_names).cmp(&(&b.left, b_names))
            })
            .collect()
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "VN: {{{}}}", self.nonterminals.iter().sorted().join(", "))?;
        writeln!(f, "VT: {{{}}}", self.terminals.iter().sorted().join(", "))?;
        writeln!(f, "Start: {}", self.start_symbol)?;
        write!(f, "Productions:")?;
        for production in self.sorted_productions() {
            write!(f, "\n{}", production)?;
        }
        Ok(())
    }
}
