use std::collections::HashSet;
use std::fs::File;
use std::io::BufRead;
use std::path::Path;

use log::debug;

use crate::automaton::{Automaton, TransitionTable};
use super::lexer::{lex_line, Token, EPSILON_CHAR};
use super::CompileErrorType::*;
use super::{collect_lines, io_error, numbered_lines, CompileError, FileResult, LineResult, Location, Result};

// One line of an automaton definition
#[derive(PartialEq, Debug)]
enum Line {
    States(Vec<String>),
    Alphabet(Vec<String>),
    Start(String),
    Accept(Vec<String>),
    Transition {
        from: String,
        symbol: String,
        targets: Vec<String>
    },
}

// State names separated by spaces or `|`
fn state_names(tokens: &[Token]) -> Result<Vec<String>> {
    tokens.iter()
        .filter_map(|t| match t {
            Token::Or => None,
            Token::Nonterminal(s) => Some(Ok(s.clone())),
            Token::Terminal(s) => Some(Err(ExpectedState(s.clone()))),
            Token::Epsilon => Some(Err(ExpectedState(EPSILON_CHAR.to_string()))),
            Token::Equals => Some(Err(UnexpectedEquals)),
        })
        .collect()
}

fn symbol_names(tokens: &[Token]) -> Result<Vec<String>> {
    tokens.iter()
        .filter_map(|t| match t {
            Token::Or => None,
            Token::Terminal(s) => Some(Ok(s.clone())),
            Token::Nonterminal(s) => Some(Err(ExpectedSymbol(s.clone()))),
            Token::Epsilon => Some(Err(ExpectedSymbol(EPSILON_CHAR.to_string()))),
            Token::Equals => Some(Err(UnexpectedEquals)),
        })
        .collect()
}

fn parse_definition_line(tokens: &[Token]) -> Result<Line> {
    match tokens {
        [Token::Nonterminal(name), Token::Equals, rest @ ..] => match name.as_str() {
            "states" => Ok(Line::States(state_names(rest)?)),
            "alphabet" => Ok(Line::Alphabet(symbol_names(rest)?)),
            "accept" => Ok(Line::Accept(state_names(rest)?)),
            "start" => match &state_names(rest)?[..] {
                [state] => Ok(Line::Start(state.clone())),
                [] => Err(MissingStart),
                _ => Err(DuplicateStart),
            },
            _ => Err(UnknownDirective(name.clone())),
        },
        [Token::Nonterminal(from), Token::Terminal(symbol), Token::Equals, rest @ ..] => Ok(Line::Transition {
            from: from.clone(),
            symbol: symbol.clone(),
            targets: state_names(rest)?
        }),
        [Token::Nonterminal(_), Token::Nonterminal(s), ..] => Err(ExpectedSymbol(s.clone())),
        [Token::Nonterminal(_), ..] => Err(MissingEquals),
        [] => Err(UnexpectedBlankLine),
        _ => Err(MissingNonterminal),
    }
}

fn parse_lex_definition_line(line: &str, location: Location) -> LineResult<(Line, Location)> {
    lex_line(line)
        .and_then(|tokens| parse_definition_line(&tokens))
        .map(|parsed| (parsed, location.clone()))
        .map_err(|error| CompileError { location, error })
}

fn automaton_from_lines(lines: Vec<(Line, Location)>, path: &Path) -> FileResult<Automaton> {
    let mut explicit_states: Option<HashSet<String>> = None;
    let mut explicit_alphabet: Option<HashSet<String>> = None;
    let mut mentioned_states = HashSet::new();
    let mut mentioned_symbols = HashSet::new();
    let mut accepting = HashSet::new();
    let mut transitions = TransitionTable::new();
    let mut start: Option<String> = None;
    let mut errors = Vec::new();

    for (line, location) in lines {
        match line {
            Line::States(states) => explicit_states.get_or_insert_with(HashSet::new).extend(states),
            Line::Alphabet(symbols) => explicit_alphabet.get_or_insert_with(HashSet::new).extend(symbols),
            Line::Start(state) => {
                if start.is_some() {
                    errors.push(CompileError::at(location, DuplicateStart));
                } else {
                    mentioned_states.insert(state.clone());
                    start = Some(state);
                }
            }
            Line::Accept(states) => {
                mentioned_states.extend(states.iter().cloned());
                accepting.extend(states);
            }
            Line::Transition { from, symbol, targets } => {
                mentioned_states.insert(from.clone());
                mentioned_states.extend(targets.iter().cloned());
                mentioned_symbols.insert(symbol.clone());
                transitions.entry(from).or_default().entry(symbol).or_default().extend(targets);
            }
        }
    }

    let file_location = Location::file(path.to_path_buf());
    let Some(start) = start else {
        errors.push(CompileError::at(file_location, MissingStart));
        return Err(errors);
    };
    if !errors.is_empty() {
        return Err(errors);
    }

    let states = explicit_states.unwrap_or(mentioned_states);
    let alphabet = explicit_alphabet.unwrap_or(mentioned_symbols);
    debug!("read automaton with {} states from {}", states.len(), path.display());

    Automaton::new(states, alphabet, transitions, start, accepting)
        .map_err(|e| vec![CompileError::at(file_location, super::CompileErrorType::Automaton(e))])
}

fn parse_automaton(reader: impl BufRead, path: &Path) -> FileResult<Automaton> {
    let parsed_lines = numbered_lines(reader, path).map(|(num, line_res)| {
        line_res.and_then(|line| parse_lex_definition_line(&line, Location {
            file: path.to_path_buf(),
            line: num
        }))
    });

    let lines = collect_lines(parsed_lines)?;
    automaton_from_lines(lines, path)
}

/// Reads an automaton definition file.
pub fn parse_automaton_file(path: &Path) -> FileResult<Automaton> {
    let file = File::open(path).map_err(|e| vec![io_error(e, path)])?;
    parse_automaton(std::io::BufReader::new(file), path)
}

pub fn parse_automaton_str(text: &str, path: &Path) -> FileResult<Automaton> {
    parse_automaton(text.as_bytes(), path)
}
