/*
    This module parses grammar files and automaton definition files
*/

mod definition;
mod lexer;
mod verifier;

use std::collections::HashSet;
use std::fmt::Display;
use std::fs::File;
use std::io::BufRead;
use std::path::Path;

use crate::automaton::AutomatonErrorType;
use crate::error_handling::*;
use crate::grammar::{Alternative, Grammar, GrammarErrorType, Production, Symbol};
use itertools::Itertools;
use lexer::*;
use log::debug;
use verifier::verify_rules;
use verifier::IntermediateRuleset;

pub use definition::{parse_automaton_file, parse_automaton_str};

#[derive(Debug)]
pub enum CompileErrorType {
    // A line which should contain a rule does not
    MissingEquals,
    // A rule has multiple equals signs
    UnexpectedEquals,
    // The user starts a rule line with something other than a nonterminal
    MissingNonterminal,
    // There is an unclosed quote
    UnmatchedQuote,
    // An undefined token was used
    UndefinedNonterminal(String),
    // ε next to other symbols in one alternative
    MisplacedEpsilon,
    // A quoted symbol where a state name belongs
    ExpectedState(String),
    // A state name where a quoted symbol belongs
    ExpectedSymbol(String),
    // A definition line starting with a word we do not know
    UnknownDirective(String),
    // More than one `start` line
    DuplicateStart,
    // No `start` line at all
    MissingStart,
    // The rules are fine line by line but the grammar is not
    Grammar(GrammarErrorType),
    // The definition is fine line by line but the automaton is not
    Automaton(AutomatonErrorType),
    // Somehow a full rewrite was parsed as a base alternative
    // This is a problem with chomsky, not the grammar
    UnsplitRewrite,
    // A blank line got too deep into the parser
    // This is a problem with chomsky, not the grammar
    UnexpectedBlankLine,
    // There was an issue with reading a file
    FileError(std::io::Error),
}

impl ErrorType for CompileErrorType {}

impl PartialEq for CompileErrorType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CompileErrorType::FileError(a), CompileErrorType::FileError(b)) => a.kind() == b.kind(),
            (CompileErrorType::UndefinedNonterminal(a), CompileErrorType::UndefinedNonterminal(b))
            | (CompileErrorType::ExpectedState(a), CompileErrorType::ExpectedState(b))
            | (CompileErrorType::ExpectedSymbol(a), CompileErrorType::ExpectedSymbol(b))
            | (CompileErrorType::UnknownDirective(a), CompileErrorType::UnknownDirective(b)) => a == b,
            (CompileErrorType::Grammar(a), CompileErrorType::Grammar(b)) => a == b,
            (CompileErrorType::Automaton(a), CompileErrorType::Automaton(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl Display for CompileErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileErrorType::MissingEquals => write!(f, "Expected `=` after nonterminal"),
            CompileErrorType::UnexpectedEquals => write!(f, "Unexpected `=` encountered"),
            CompileErrorType::MissingNonterminal => write!(f, "Tried to define something other than a nonterminal"),
            CompileErrorType::UnmatchedQuote => write!(f, "Unmatched quotes"),
            CompileErrorType::UndefinedNonterminal(nonterminal) => write!(f, "Could not find definition for `{}`", nonterminal),
            CompileErrorType::MisplacedEpsilon => write!(f, "`{}` must be the only symbol of its alternative", EPSILON_CHAR),
            CompileErrorType::ExpectedState(symbol) => write!(f, "Expected a state name, found \"{}\"", symbol),
            CompileErrorType::ExpectedSymbol(state) => write!(f, "Expected a quoted symbol, found `{}`", state),
            CompileErrorType::UnknownDirective(name) => write!(f, "Unknown definition `{}`", name),
            CompileErrorType::DuplicateStart => write!(f, "The start state is given more than once"),
            CompileErrorType::MissingStart => write!(f, "No start state given"),
            CompileErrorType::Grammar(e) => write!(f, "{}", e),
            CompileErrorType::Automaton(e) => write!(f, "{}", e),
            CompileErrorType::UnsplitRewrite => write!(f, "Rewrite was not fully split (this is a problem with chomsky, not the grammar)"),
            CompileErrorType::UnexpectedBlankLine => write!(f, "Blank line encountered in rule parser (this is a problem with chomsky, not the grammar)"),
            CompileErrorType::FileError(e) => write!(f, "File error: {}", e),
        }
    }
}

pub type CompileError = Error<CompileErrorType>;
pub type CompileErrors = Errors<CompileErrorType>;

fn io_error(error: std::io::Error, file: &Path) -> CompileError {
    CompileError {
        location: Location::file(file.to_path_buf()),
        error: CompileErrorType::FileError(error)
    }
}

pub type Result<T> = std::result::Result<T, CompileErrorType>;
pub type LineResult<T> = std::result::Result<T, CompileError>;
pub type FileResult<T> = std::result::Result<T, CompileErrors>;

// The alternatives of one rule line
pub type Rewrite = Vec<Alternative>;

#[derive(PartialEq, Debug)]
struct Rule {
    symbol: String,
    rewrite: Rewrite,
    location: Location
}

fn parse_alternative(tokens: &[Token]) -> Result<Alternative> {
    if tokens == [Token::Epsilon] {
        return Ok(Vec::new());
    }

    tokens.iter().map(|t| match t {
        Token::Equals => Err(CompileErrorType::UnexpectedEquals),
        Token::Or => Err(CompileErrorType::UnsplitRewrite),
        Token::Epsilon => Err(CompileErrorType::MisplacedEpsilon),
        Token::Nonterminal(s) => Ok(Symbol::Nonterminal(s.clone())),
        Token::Terminal(s) => Ok(Symbol::Terminal(s.clone()))
    }).collect()
}

fn parse_rewrite(tokens: &[Token]) -> Result<Rewrite> {
    tokens.split(|t| *t == Token::Or).map(parse_alternative).collect()
}

fn parse_line(tokens: &[Token], location: Location) -> Result<Rule> {
    // Try to get the token the rule is for. The match returns a result which
    // is then unwrapped with the ? operator
    let symbol = match tokens.get(0) {
        Some(Token::Nonterminal(s)) => Ok(s.clone()),
        Some(_) => Err(CompileErrorType::MissingNonterminal),
        None => Err(CompileErrorType::UnexpectedBlankLine)
    }?;

    if tokens.get(1) != Some(&Token::Equals) {
        return Err(CompileErrorType::MissingEquals)
    }

    let rewrite = parse_rewrite(&tokens[2..])?;

    return Ok(Rule {
        symbol,
        rewrite,
        location
    });
}

fn parse_lex_line(line: &str, location: Location) -> LineResult<Rule> {
    lexer::lex_line(line)
        .and_then(|lexed_line| parse_line(&lexed_line, location.clone()))
        .map_err(|error| CompileError { location: location, error })
}

fn is_content_line(line: &String) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with(';')
}

// Returns an iterator over the content lines of a reader, with the io errors
// wrapped in CompileError and enumerated
fn numbered_lines<'a>(reader: impl BufRead + 'a, path: &'a Path) -> impl Iterator<Item = (usize, LineResult<String>)> + 'a {
    reader
        .lines()
        .map(move |line| line.map_err(|e| io_error(e, path)))
        .enumerate()
        .filter(|(_, line)| line.as_ref().is_ok_and(is_content_line) || line.is_err())
        .map(|(num, line)| (num + 1, line))
}

// Splits per-line results into the successes, or every failure if any
fn collect_lines<T>(lines: impl Iterator<Item = LineResult<T>>) -> FileResult<Vec<T>> {
    let (values, errors): (Vec<_>, Vec<_>) = lines.partition_map(|line| match line {
        Ok(value) => itertools::Either::Left(value),
        Err(error) => itertools::Either::Right(error),
    });

    if errors.len() > 0 {
        Err(errors)
    } else {
        Ok(values)
    }
}

// Merges the rules into one rewrite per nonterminal, first definition wins
// the location
fn ruleset_from_rules(rules: Vec<Rule>) -> IntermediateRuleset {
    let mut ruleset = IntermediateRuleset::with_capacity(rules.len());
    for rule in rules {
        ruleset.entry(rule.symbol)
            .or_insert_with(|| (Vec::new(), rule.location))
            .0
            .extend(rule.rewrite);
    }
    ruleset
}

fn grammar_from_rules(rule_list: Vec<Rule>, start: Option<&str>, path: &Path) -> FileResult<Grammar> {
    let start_symbol = match (start, rule_list.first()) {
        (Some(start), _) => start.to_string(),
        (None, Some(rule)) => rule.symbol.clone(),
        (None, None) => String::new(),
    };

    let ruleset = ruleset_from_rules(rule_list);
    verify_rules(&ruleset)?;

    let nonterminals: HashSet<String> = ruleset.keys().cloned().collect();
    let mut terminals = HashSet::new();
    let mut productions = Vec::new();
    for (symbol, (rewrite, _)) in ruleset.into_iter().sorted_by(|a, b| a.0.cmp(&b.0)) {
        for alternative in rewrite {
            terminals.extend(alternative.iter().filter(|s| s.is_terminal()).map(|s| s.name().to_string()));
            productions.push(Production::new(symbol.clone(), alternative));
        }
    }

    debug!(
        "read {} productions over {} nonterminals from {}",
        productions.len(),
        nonterminals.len(),
        path.display()
    );
    Grammar::new(nonterminals, terminals, productions, start_symbol)
        .map_err(|e| vec![CompileError::at(Location::file(path.to_path_buf()), CompileErrorType::Grammar(e))])
}

fn parse_grammar(reader: impl BufRead, path: &Path, start: Option<&str>) -> FileResult<Grammar> {
    let parsed_lines = numbered_lines(reader, path).map(|(num, line_res)| {
        line_res.and_then(|line| parse_lex_line(&line, Location {
            file: path.to_path_buf(),
            line: num
        }))
    });

    let rules = collect_lines(parsed_lines)?;
    return grammar_from_rules(rules, start, path);
}

/// Reads a grammar file. The start symbol is the first rule's nonterminal
/// unless `start` overrides it.
pub fn parse_file(path: &Path, start: Option<&str>) -> FileResult<Grammar> {
    let file = File::open(path).map_err(|e| vec![io_error(e, path)])?;
    parse_grammar(std::io::BufReader::new(file), path, start)
}

pub fn parse_str(text: &str, path: &Path, start: Option<&str>) -> FileResult<Grammar> {
    parse_grammar(text.as_bytes(), path, start)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::iter::zip;
    use std::path::PathBuf;

    use super::*;
    use crate::grammar::tests::has_production;
    use crate::grammar::GrammarClass;

    fn s_nonterminal(text: &str) -> Symbol {
        Symbol::Nonterminal(text.to_string())
    }

    fn s_terminal(text: &str) -> Symbol {
        Symbol::Terminal(text.to_string())
    }

    fn rewrite_map(grammar: &Grammar) -> HashMap<String, Vec<Alternative>> {
        grammar.productions.iter()
            .map(|p| (p.left.clone(), p.right.clone()))
            .into_group_map()
    }

    #[test]
    fn parse_normal_alternative() {
        let lines = vec![
            vec![
                Token::Terminal("a".to_string()),
                Token::Nonterminal("S".to_string())
            ],
            vec![
                Token::Nonterminal("A".to_string()),
                Token::Terminal("b".to_string()),
                Token::Nonterminal("B".to_string())
            ],
            vec![Token::Epsilon],
            vec![]
        ];
        let answers = vec![
            vec![s_terminal("a"), s_nonterminal("S")],
            vec![s_nonterminal("A"), s_terminal("b"), s_nonterminal("B")],
            vec![],
            vec![]
        ];

        for (line, answer) in zip(lines, answers) {
            assert_eq!(parse_alternative(&line[..]).unwrap(), answer);
        }
    }

    #[test]
    fn parse_malformed_alternative() {
        assert_eq!(parse_alternative(&[Token::Equals]), Err(CompileErrorType::UnexpectedEquals));
        assert_eq!(parse_alternative(&[Token::Or]), Err(CompileErrorType::UnsplitRewrite));
        assert_eq!(
            parse_alternative(&[Token::Terminal("a".to_string()), Token::Epsilon]),
            Err(CompileErrorType::MisplacedEpsilon)
        );
    }

    #[test]
    fn parse_normal_line() {
        let text = "B = \"c\" B | \"d\" | ε";
        let lexed = lexer::lex_line(text).unwrap();
        let location = Location::default();

        let answer = Rule {
            symbol: "B".to_string(),
            rewrite: vec![
                vec![s_terminal("c"), s_nonterminal("B")],
                vec![s_terminal("d")],
                vec![]
            ],
            location: location.clone()
        };

        assert_eq!(parse_line(&lexed[..], location), Ok(answer));
    }

    #[test]
    fn parse_malformed_line() {
        // Blank
        assert_eq!(parse_line(&[], Location::default()), Err(CompileErrorType::UnexpectedBlankLine));

        // Missing equals
        assert_eq!(parse_line(
            &lexer::lex_line("S \"a\" B").unwrap()[..],
            Location::default()
        ), Err(CompileErrorType::MissingEquals));

        // Improper definition
        assert_eq!(parse_line(
            &lexer::lex_line("\"a\" = S B").unwrap()[..],
            Location::default()
        ), Err(CompileErrorType::MissingNonterminal));
        assert_eq!(parse_line(
            &lexer::lex_line("| = S B").unwrap()[..],
            Location::default()
        ), Err(CompileErrorType::MissingNonterminal));
        assert_eq!(parse_line(
            &lexer::lex_line("= S B").unwrap()[..],
            Location::default()
        ), Err(CompileErrorType::MissingNonterminal));
    }

    #[test]
    fn parse_normal_file() {
        let example_path = PathBuf::from("example_data/regular.bnf");
        let example_parsed = parse_file(&example_path, None).unwrap();

        assert_eq!(example_parsed, crate::grammar::tests::regular_grammar());
        assert_eq!(example_parsed.classify(), GrammarClass::Regular);
    }

    #[test]
    fn parse_file_with_epsilon_and_start_override() {
        let example_path = PathBuf::from("example_data/variant.bnf");
        let grammar = parse_file(&example_path, Some("B")).unwrap();

        assert_eq!(grammar.start_symbol, "B");
        assert!(has_production(&grammar, "B", "ε"));
        assert!(has_production(&grammar, "B", "A b B"));
        assert_eq!(grammar.nonterminals.len(), 5);
        assert_eq!(grammar.terminals, HashSet::from(["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn rules_on_several_lines_merge() {
        let text = "S = \"a\" S\n; a comment\n\nS = \"b\"\n";
        let grammar = parse_str(text, Path::new("inline.bnf"), None).unwrap();

        assert_eq!(rewrite_map(&grammar)["S"].len(), 2);
        assert!(has_production(&grammar, "S", "b"));
    }

    #[test]
    fn parse_malformed_file() {
        let example_path = PathBuf::from("example_data/malformed.bnf");
        let example_parsed = parse_file(&example_path, None).unwrap_err();

        assert_eq!(example_parsed, vec![
            CompileError {
                location: Location {
                    file: example_path.clone(),
                    line: 3
                },
                error: CompileErrorType::MissingNonterminal
            },
            CompileError {
                location: Location {
                    file: example_path,
                    line: 5
                },
                error: CompileErrorType::UnexpectedEquals
            }
        ]);
    }

    #[test]
    fn undefined_nonterminals_are_reported() {
        let text = "S = \"a\" A | B\nA = \"a\" B";
        let errors = parse_str(text, Path::new("inline.bnf"), None).unwrap_err();

        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.error == CompileErrorType::UndefinedNonterminal("B".to_string())));
        assert_eq!(errors.iter().map(|e| e.location.line).sorted().collect_vec(), [1, 2]);
    }

    #[test]
    fn bad_start_override() {
        let errors = parse_str("S = \"a\"", Path::new("inline.bnf"), Some("T")).unwrap_err();
        assert_eq!(errors[0].error, CompileErrorType::Grammar(GrammarErrorType::UndefinedStart("T".to_string())));
    }

    #[test]
    fn missing_file() {
        let errors = parse_file(Path::new("example_data/no_such_file.bnf"), None).unwrap_err();
        assert_eq!(errors[0].error, CompileErrorType::FileError(std::io::ErrorKind::NotFound.into()));
    }
}
