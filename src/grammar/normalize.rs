/*
    Grammar normalization: the four cleanup passes and the conversion to
    Chomsky Normal Form
*/

use std::collections::{BTreeSet, HashMap, HashSet};

use itertools::Itertools;
use log::{debug, trace};

use super::{Alternative, Grammar, Production, Result, Symbol};

/// Owns a grammar while it is being normalized, together with the counter
/// used to mint fresh nonterminals. Each pass runs to its own fixed point
/// before returning.
#[derive(Debug, Clone)]
pub struct Normalizer {
    grammar: Grammar,
    next_fresh: usize,
}

// Every way of dropping some of the nullable symbols from a right side,
// except the one that leaves nothing. Variants are deduplicated as they grow,
// so repeated nullable symbols stay linear.
fn expand_nullable(production: &Production, nullable: &HashSet<String>) -> Vec<Production> {
    let variants = production.right.iter().fold(BTreeSet::from([Alternative::new()]), |variants, symbol| {
        let optional = symbol.as_nonterminal().is_some_and(|n| nullable.contains(n));
        variants.into_iter()
            .flat_map(|prefix| {
                let mut extended = prefix.clone();
                extended.push(symbol.clone());
                [Some(extended), optional.then_some(prefix)]
            })
            .flatten()
            .collect()
    });

    variants.into_iter()
        .filter(|right| !right.is_empty())
        .map(|right| Production::new(production.left.clone(), right))
        .collect()
}

impl Normalizer {
    pub fn new(grammar: Grammar) -> Result<Self> {
        grammar.validate()?;
        Ok(Normalizer { grammar, next_fresh: 1 })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn into_grammar(self) -> Grammar {
        self.grammar
    }

    // Passes leave the productions sorted so that fresh names come out the
    // same on every run
    fn set_productions(&mut self, productions: impl IntoIterator<Item = Production>) {
        self.grammar.productions = productions.into_iter().unique().sorted().collect();
    }

    /// Nonterminals that derive the empty string.
    pub fn nullable(&self) -> HashSet<String> {
        self.nullable_rounds().0
    }

    // The closures below also report how many rounds they took to settle
    pub(crate) fn nullable_rounds(&self) -> (HashSet<String>, usize) {
        let mut nullable = HashSet::new();
        let mut changed = true;
        let mut rounds = 0;

        while changed {
            changed = false;
            rounds += 1;
            for production in &self.grammar.productions {
                if nullable.contains(&production.left) {
                    continue;
                }
                let all_nullable = production.right.iter().all(|symbol| match symbol {
                    Symbol::Nonterminal(n) => nullable.contains(n),
                    Symbol::Terminal(_) => false,
                });
                if all_nullable {
                    nullable.insert(production.left.clone());
                    changed = true;
                }
            }
        }

        trace!("nullable set settled after {} rounds", rounds);
        (nullable, rounds)
    }

    pub fn eliminate_epsilon(&mut self) -> &mut Self {
        let nullable = self.nullable();
        debug!("ε-elimination: nullable = {{{}}}", nullable.iter().sorted().join(", "));

        let expanded = self.grammar.productions.iter()
            .filter(|production| !production.is_epsilon())
            .flat_map(|production| expand_nullable(production, &nullable))
            .collect_vec();
        self.set_productions(expanded);
        self
    }

    /// Pairs (A, B) such that A ⇒* B using only unit productions, A ⇒* A included.
    pub fn unit_pairs(&self) -> HashSet<(String, String)> {
        self.unit_pairs_rounds().0
    }

    pub(crate) fn unit_pairs_rounds(&self) -> (HashSet<(String, String)>, usize) {
        let mut pairs: HashSet<(String, String)> = self.grammar.nonterminals.iter()
            .map(|n| (n.clone(), n.clone()))
            .collect();
        let mut changed = true;
        let mut rounds = 0;

        while changed {
            changed = false;
            rounds += 1;
            let known = pairs.iter().cloned().collect_vec();
            for (from, via) in known {
                for target in self.grammar.productions_of(&via).filter_map(Production::unit_target) {
                    if pairs.insert((from.clone(), target.to_string())) {
                        changed = true;
                    }
                }
            }
        }

        trace!("unit pairs settled after {} rounds", rounds);
        (pairs, rounds)
    }

    pub fn eliminate_unit_productions(&mut self) -> &mut Self {
        let pairs = self.unit_pairs();
        let units = self.grammar.productions.iter().filter(|p| p.unit_target().is_some()).count();

        let mut productions = Vec::new();
        for (from, via) in &pairs {
            for production in self.grammar.productions_of(via) {
                if production.unit_target().is_none() {
                    productions.push(Production::new(from.clone(), production.right.clone()));
                }
            }
        }

        debug!("unit elimination: removed {} unit productions", units);
        self.set_productions(productions);
        self
    }

    pub fn reachable(&self) -> HashSet<String> {
        self.reachable_rounds().0
    }

    pub(crate) fn reachable_rounds(&self) -> (HashSet<String>, usize) {
        let mut reachable = HashSet::from([self.grammar.start_symbol.clone()]);
        let mut changed = true;
        let mut rounds = 0;

        while changed {
            changed = false;
            rounds += 1;
            for production in &self.grammar.productions {
                if !reachable.contains(&production.left) {
                    continue;
                }
                for nonterminal in production.nonterminals() {
                    if reachable.insert(nonterminal.to_string()) {
                        changed = true;
                    }
                }
            }
        }

        trace!("reachable set settled after {} rounds", rounds);
        (reachable, rounds)
    }

    pub fn eliminate_unreachable(&mut self) -> &mut Self {
        let reachable = self.reachable();
        self.retain_nonterminals(&reachable);
        self
    }

    /// Nonterminals that derive at least one terminal string.
    pub fn productive(&self) -> HashSet<String> {
        self.productive_rounds().0
    }

    pub(crate) fn productive_rounds(&self) -> (HashSet<String>, usize) {
        let mut productive = HashSet::new();
        let mut changed = true;
        let mut rounds = 0;

        while changed {
            changed = false;
            rounds += 1;
            for production in &self.grammar.productions {
                if productive.contains(&production.left) {
                    continue;
                }
                if production.nonterminals().all(|n| productive.contains(n)) {
                    productive.insert(production.left.clone());
                    changed = true;
                }
            }
        }

        trace!("productive set settled after {} rounds", rounds);
        (productive, rounds)
    }

    pub fn eliminate_non_productive(&mut self) -> &mut Self {
        let productive = self.productive();
        self.retain_nonterminals(&productive);
        self
    }

    // Drops every nonterminal outside `keep` (the start symbol always stays)
    // and every production that mentions one
    fn retain_nonterminals(&mut self, keep: &HashSet<String>) {
        let start = self.grammar.start_symbol.clone();
        let dropped = self.grammar.nonterminals.iter()
            .filter(|n| !keep.contains(*n) && **n != start)
            .sorted()
            .join(", ");
        if !dropped.is_empty() {
            debug!("dropping nonterminals {{{}}}", dropped);
        }

        self.grammar.nonterminals.retain(|n| keep.contains(n) || *n == start);
        self.grammar.productions.retain(|production| {
            keep.contains(&production.left) && production.nonterminals().all(|n| keep.contains(n))
        });
    }

    // N1, N2, ... skipping names the grammar already uses
    fn fresh_nonterminal(&mut self) -> String {
        loop {
            let name = format!("N{}", self.next_fresh);
            self.next_fresh += 1;
            if !self.grammar.nonterminals.contains(&name) && !self.grammar.terminals.contains(&name) {
                self.grammar.nonterminals.insert(name.clone());
                return name;
            }
        }
    }

    fn is_cnf_shape(production: &Production) -> bool {
        matches!(
            &production.right[..],
            [Symbol::Terminal(_)] | [Symbol::Nonterminal(_), Symbol::Nonterminal(_)]
        )
    }

    /// Runs the four passes, then replaces terminals inside long right sides
    /// and splits right sides longer than two.
    pub fn to_cnf(&mut self) -> &mut Self {
        self.eliminate_epsilon()
            .eliminate_unit_productions()
            .eliminate_unreachable()
            .eliminate_non_productive();

        let mut terminal_nonterminals: HashMap<String, String> = HashMap::new();
        let mut productions = Vec::new();

        for production in std::mem::take(&mut self.grammar.productions) {
            if Self::is_cnf_shape(&production) {
                productions.push(production);
                continue;
            }

            let mut right = Vec::with_capacity(production.right.len());
            for symbol in production.right {
                let nonterminal = match symbol {
                    Symbol::Nonterminal(n) => n,
                    Symbol::Terminal(t) => match terminal_nonterminals.get(&t) {
                        Some(n) => n.clone(),
                        None => {
                            let fresh = self.fresh_nonterminal();
                            productions.push(Production::new(fresh.clone(), vec![Symbol::Terminal(t.clone())]));
                            terminal_nonterminals.insert(t, fresh.clone());
                            fresh
                        }
                    },
                };
                right.push(Symbol::Nonterminal(nonterminal));
            }

            while right.len() > 2 {
                let fresh = self.fresh_nonterminal();
                let rest = right.split_off(2);
                productions.push(Production::new(fresh.clone(), right));
                right = std::iter::once(Symbol::Nonterminal(fresh)).chain(rest).collect();
            }

            productions.push(Production::new(production.left, right));
        }

        debug!(
            "CNF: {} terminal nonterminals, {} nonterminals in total",
            terminal_nonterminals.len(),
            self.grammar.nonterminals.len()
        );
        self.set_productions(productions);
        self
    }
}

/// Validates the grammar and converts it to Chomsky Normal Form.
pub fn to_cnf(grammar: Grammar) -> Result<Grammar> {
    let mut normalizer = Normalizer::new(grammar)?;
    normalizer.to_cnf();
    Ok(normalizer.into_grammar())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::enumerate;
    use crate::grammar::tests::has_production;
    use crate::grammar::{GrammarErrorType, EPSILON};

    // The grammar that exercises every pass: ε, a unit production, an
    // unreachable C, and D which is only reachable from C
    fn variant_grammar() -> Grammar {
        Grammar::from_table(
            &["S", "A", "B", "C", "D"],
            &["a", "b"],
            &[
                ("S", &["a B", "A"]),
                ("A", &["b A a", "a S", "a"]),
                ("B", &["A b B", "B S", "a", "ε"]),
                ("C", &["B A"]),
                ("D", &["a"]),
            ],
            "S"
        ).unwrap()
    }

    fn without_empty(words: BTreeSet<Vec<String>>) -> BTreeSet<Vec<String>> {
        words.into_iter().filter(|w| !w.is_empty()).collect()
    }

    #[test]
    fn nullable_symbols() {
        let grammar = Grammar::from_table(
            &["S", "A", "B"],
            &["a"],
            &[("S", &["A B", "a"]), ("A", &["ε"]), ("B", &["A A", "a"])],
            "S"
        ).unwrap();
        let normalizer = Normalizer::new(grammar).unwrap();

        let expected: HashSet<String> = ["S", "A", "B"].iter().map(|s| s.to_string()).collect();
        assert_eq!(normalizer.nullable(), expected);
    }

    #[test]
    fn epsilon_elimination_drops_nullable_symbol() {
        let mut normalizer = Normalizer::new(variant_grammar()).unwrap();
        normalizer.eliminate_epsilon();
        let grammar = normalizer.grammar();

        assert!(has_production(grammar, "B", "A b"));
        assert!(has_production(grammar, "B", "A b B"));
        assert!(has_production(grammar, "B", "S"));
        assert!(has_production(grammar, "S", "a"));
        assert!(!has_production(grammar, "B", "ε"));
        assert!(grammar.productions.iter().all(|p| !p.is_epsilon()));
    }

    #[test]
    fn epsilon_elimination_keeps_all_combinations() {
        // Dropping both nullable symbols must still leave `S → b`
        let grammar = Grammar::from_table(
            &["S", "A"],
            &["a", "b"],
            &[("S", &["A b A"]), ("A", &["a", "ε"])],
            "S"
        ).unwrap();
        let mut normalizer = Normalizer::new(grammar.clone()).unwrap();
        normalizer.eliminate_epsilon();

        for right in ["A b A", "b A", "A b", "b"] {
            assert!(has_production(normalizer.grammar(), "S", right), "missing S → {}", right);
        }
        assert_eq!(enumerate(normalizer.grammar(), 4), without_empty(enumerate(&grammar, 4)));
    }

    #[test]
    fn unit_elimination() {
        let grammar = Grammar::from_table(
            &["S", "A"],
            &["a"],
            &[("S", &["A"]), ("A", &["a", "a S"])],
            "S"
        ).unwrap();
        let mut normalizer = Normalizer::new(grammar).unwrap();
        normalizer.eliminate_unit_productions();

        assert!(has_production(normalizer.grammar(), "S", "a"));
        assert!(has_production(normalizer.grammar(), "S", "a S"));
        assert!(!has_production(normalizer.grammar(), "S", "A"));
    }

    #[test]
    fn unit_cycles_terminate() {
        let grammar = Grammar::from_table(
            &["S", "A", "B"],
            &["a", "b"],
            &[("S", &["A"]), ("A", &["B", "a"]), ("B", &["A", "S", "b"])],
            "S"
        ).unwrap();
        let mut normalizer = Normalizer::new(grammar.clone()).unwrap();
        normalizer.eliminate_unit_productions();

        let grammar_after = normalizer.grammar();
        assert!(grammar_after.productions.iter().all(|p| p.unit_target().is_none()));
        for left in ["S", "A", "B"] {
            assert!(has_production(grammar_after, left, "a"));
            assert!(has_production(grammar_after, left, "b"));
        }
        assert_eq!(enumerate(grammar_after, 3), enumerate(&grammar, 3));
    }

    #[test]
    fn unreachable_elimination() {
        let mut normalizer = Normalizer::new(variant_grammar()).unwrap();
        normalizer.eliminate_unreachable();
        let grammar = normalizer.grammar();

        assert!(!grammar.nonterminals.contains("C"));
        assert!(!grammar.nonterminals.contains("D"));
        assert!(grammar.productions.iter().all(|p| p.left != "C" && p.left != "D"));
        assert!(has_production(grammar, "B", "A b B"));
    }

    #[test]
    fn non_productive_elimination() {
        let grammar = Grammar::from_table(
            &["S", "A", "L"],
            &["a"],
            &[("S", &["a", "A", "L a"]), ("A", &["a A"]), ("L", &["L L"])],
            "S"
        ).unwrap();
        let mut normalizer = Normalizer::new(grammar).unwrap();
        normalizer.eliminate_non_productive();
        let grammar = normalizer.grammar();

        assert_eq!(grammar.nonterminals, HashSet::from(["S".to_string()]));
        assert_eq!(grammar.productions, vec![Production::new("S", vec![Symbol::Terminal("a".to_string())])]);
    }

    #[test]
    fn empty_language_keeps_start() {
        let grammar = Grammar::from_table(&["S"], &["a"], &[("S", &["a S"])], "S").unwrap();
        let cnf = to_cnf(grammar).unwrap();

        assert!(cnf.productions.is_empty());
        assert!(cnf.nonterminals.contains("S"));
        assert_eq!(cnf.validate(), Ok(()));
    }

    #[test]
    fn cnf_shape_and_language() {
        let grammar = variant_grammar();
        let cnf = to_cnf(grammar.clone()).unwrap();

        assert!(cnf.is_cnf());
        assert_eq!(cnf.validate(), Ok(()));
        assert_eq!(enumerate(&cnf, 5), without_empty(enumerate(&grammar, 5)));
    }

    #[test]
    fn cnf_is_idempotent() {
        let once = to_cnf(variant_grammar()).unwrap();
        let twice = to_cnf(once.clone()).unwrap();

        assert!(twice.is_cnf());
        assert_eq!(enumerate(&twice, 5), enumerate(&once, 5));
    }

    #[test]
    fn cnf_binarizes_long_rules() {
        let grammar = Grammar::from_table(
            &["S", "A"],
            &["a", "b"],
            &[("S", &["A b A A"]), ("A", &["a"])],
            "S"
        ).unwrap();
        let cnf = to_cnf(grammar.clone()).unwrap();

        assert!(cnf.is_cnf());
        assert_eq!(cnf.productions_of("S").count(), 1);
        assert_eq!(enumerate(&cnf, 4), enumerate(&grammar, 4));
    }

    #[test]
    fn fresh_names_avoid_user_names() {
        let grammar = Grammar::from_table(
            &["S", "N1", "N2"],
            &["a", "b"],
            &[("S", &["a N1 N2"]), ("N1", &["a"]), ("N2", &["b"])],
            "S"
        ).unwrap();
        let cnf = to_cnf(grammar.clone()).unwrap();

        assert!(cnf.is_cnf());
        assert!(has_production(&cnf, "N1", "a"));
        assert!(has_production(&cnf, "N2", "b"));
        assert_eq!(enumerate(&cnf, 3), enumerate(&grammar, 3));
    }

    #[test]
    fn output_is_deterministic() {
        let first = to_cnf(variant_grammar()).unwrap().to_string();
        for _ in 0..5 {
            assert_eq!(to_cnf(variant_grammar()).unwrap().to_string(), first);
        }
    }

    #[test]
    fn invalid_grammar_is_rejected() {
        let mut grammar = variant_grammar();
        grammar.start_symbol = "Z".to_string();
        assert_eq!(to_cnf(grammar).unwrap_err(), GrammarErrorType::UndefinedStart("Z".to_string()));
    }

    // A1 → A2, A2 → A3, ..., An → last: every closure needs one round per link
    fn chain_grammar(length: usize, last: &str) -> Grammar {
        let names = (1..=length).map(|i| format!("A{}", i)).collect_vec();
        let mut productions = names.iter()
            .tuple_windows()
            .map(|(from, to)| Production::new(from.clone(), vec![Symbol::Nonterminal(to.clone())]))
            .collect_vec();
        let right = match last {
            EPSILON => Vec::new(),
            terminal => vec![Symbol::Terminal(terminal.to_string())],
        };
        productions.push(Production::new(names[length - 1].clone(), right));

        Grammar::new(
            names.iter().cloned().collect(),
            HashSet::from(["a".to_string()]),
            productions,
            names[0].clone()
        ).unwrap()
    }

    #[test]
    fn closures_settle_within_bound() {
        for length in [1, 2, 5, 9] {
            let bound = length + 1;

            let normalizer = Normalizer::new(chain_grammar(length, "a")).unwrap();
            let (productive, rounds) = normalizer.productive_rounds();
            assert_eq!(productive.len(), length);
            assert!(rounds <= bound, "productive took {} rounds for {}", rounds, length);

            let (reachable, rounds) = normalizer.reachable_rounds();
            assert_eq!(reachable.len(), length);
            assert!(rounds <= bound, "reachable took {} rounds for {}", rounds, length);

            let (pairs, rounds) = normalizer.unit_pairs_rounds();
            assert_eq!(pairs.len(), length * (length + 1) / 2);
            assert!(rounds <= bound, "unit pairs took {} rounds for {}", rounds, length);

            let normalizer = Normalizer::new(chain_grammar(length, EPSILON)).unwrap();
            let (nullable, rounds) = normalizer.nullable_rounds();
            assert_eq!(nullable.len(), length);
            assert!(rounds <= bound, "nullable took {} rounds for {}", rounds, length);
        }
    }

    #[test]
    fn unreachable_elimination_keeps_language() {
        let grammar = variant_grammar();
        let mut normalizer = Normalizer::new(grammar.clone()).unwrap();
        normalizer.eliminate_unreachable();

        assert_eq!(enumerate(normalizer.grammar(), 5), enumerate(&grammar, 5));
    }

    #[test]
    fn non_productive_elimination_keeps_language() {
        let grammar = Grammar::from_table(
            &["S", "A", "B", "L"],
            &["a", "b"],
            &[("S", &["a S", "A", "B b", "L a"]), ("A", &["a A", "a L"]), ("B", &["b", "S b"]), ("L", &["L L"])],
            "S"
        ).unwrap();
        let mut normalizer = Normalizer::new(grammar.clone()).unwrap();
        normalizer.eliminate_non_productive();

        assert!(!normalizer.grammar().nonterminals.contains("A"));
        assert!(!normalizer.grammar().nonterminals.contains("L"));
        assert_eq!(enumerate(normalizer.grammar(), 6), enumerate(&grammar, 6));
    }

    #[test]
    fn many_nullable_occurrences() {
        let long = vec!["A"; 70].join(" ");
        let grammar = Grammar::from_table(
            &["S", "A"],
            &["a"],
            &[("S", &[long.as_str()]), ("A", &["a", "ε"])],
            "S"
        ).unwrap();
        let mut normalizer = Normalizer::new(grammar).unwrap();
        normalizer.eliminate_epsilon();

        assert_eq!(normalizer.grammar().productions_of("S").count(), 70);
        assert!(has_production(normalizer.grammar(), "S", "A"));
        assert!(has_production(normalizer.grammar(), "S", &long));
        assert!(has_production(normalizer.grammar(), "A", "a"));
    }
}
