mod cli;

use std::path::Path;
use std::process::ExitCode;

use chomsky::automaton::subset;
use chomsky::error_handling::*;
use chomsky::generator;
use chomsky::grammar::normalize::Normalizer;
use chomsky::grammar::Grammar;
use chomsky::parser;
use clap::Parser;
use itertools::Itertools;
use log::{info, LevelFilter};

use cli::{Cli, Command, GrammarArgs};

type CommandResult = Result<(), ExitCode>;

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    pretty_env_logger::formatted_builder()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .init();
}

fn report<T: ErrorType>(errors: &[Error<T>]) -> ExitCode {
    for error in errors {
        eprintln!("{}", error);
    }
    ExitCode::FAILURE
}

fn report_in<T: ErrorType>(file: &Path, error: T) -> ExitCode {
    report(&[Error::at(Location::file(file.to_path_buf()), error)])
}

fn load_grammar(args: &GrammarArgs) -> Result<Grammar, ExitCode> {
    info!("reading grammar from {}", args.file.display());
    parser::parse_file(&args.file, args.start.as_deref()).map_err(|errors| report(&errors))
}

// Single characters unless the word is written with spaces between symbols
fn split_word(word: &str) -> Vec<String> {
    if word.contains(char::is_whitespace) {
        word.split_whitespace().map(String::from).collect()
    } else {
        word.chars().map(String::from).collect()
    }
}

fn normalize(args: &GrammarArgs) -> CommandResult {
    let grammar = load_grammar(args)?;
    let mut normalizer = Normalizer::new(grammar).map_err(|e| report_in(&args.file, e))?;

    let steps: [(&str, fn(&mut Normalizer) -> &mut Normalizer); 5] = [
        ("After ε-elimination", Normalizer::eliminate_epsilon),
        ("After renaming elimination", Normalizer::eliminate_unit_productions),
        ("After removing inaccessible symbols", Normalizer::eliminate_unreachable),
        ("After removing non-productive symbols", Normalizer::eliminate_non_productive),
        ("Chomsky Normal Form", Normalizer::to_cnf),
    ];

    println!("=== Original grammar ===\n{}", normalizer.grammar());
    for (title, step) in steps {
        step(&mut normalizer);
        println!("\n=== {} ===\n{}", title, normalizer.grammar());
    }
    Ok(())
}

fn classify(args: &GrammarArgs) -> CommandResult {
    let grammar = load_grammar(args)?;
    println!("{}", grammar.classify());
    Ok(())
}

fn to_automaton(args: &GrammarArgs, words: &[String]) -> CommandResult {
    let grammar = load_grammar(args)?;
    let automaton = grammar.to_automaton().map_err(|e| report_in(&args.file, e))?;

    println!("{}", automaton);
    println!("Deterministic: {}", automaton.is_deterministic());
    for word in words {
        let verdict = if automaton.accepts(split_word(word)) { "accepted" } else { "rejected" };
        println!("{}: {}", word, verdict);
    }
    Ok(())
}

fn determinize(file: &Path) -> CommandResult {
    info!("reading automaton from {}", file.display());
    let nfa = parser::parse_automaton_file(file).map_err(|errors| report(&errors))?;
    println!("Deterministic: {}", nfa.is_deterministic());

    let construction = subset::construct(&nfa);
    println!("\n=== DFA ===\n{}", construction.dfa);

    let grammar = construction.dfa.to_regular_grammar().map_err(|e| report_in(file, e))?;
    println!("\n=== Regular grammar from the DFA ===\n{}", grammar);
    println!("\nClassification: {}", grammar.classify());
    Ok(())
}

fn generate(args: &GrammarArgs, amount: Option<u32>, all: Option<usize>, max_depth: usize) -> CommandResult {
    let grammar = load_grammar(args)?;

    if let Some(max_len) = all {
        for word in generator::enumerate(&grammar, max_len) {
            println!("{}", word.iter().join(""));
        }
        return Ok(());
    }

    let mut rng = rand::thread_rng();
    for _ in 0..amount.unwrap_or(1) {
        let generated = generator::generate(&grammar, &mut rng, max_depth)
            .map_err(|e| report_in(&args.file, e))?;
        println!("{}", generated);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let result = match &cli.command {
        Command::Normalize { grammar } => normalize(grammar),
        Command::Classify { grammar } => classify(grammar),
        Command::Automaton { grammar, words } => to_automaton(grammar, words),
        Command::Determinize { file } => determinize(file),
        Command::Generate { grammar, amount, all, max_depth } => generate(grammar, *amount, *all, *max_depth),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => code,
    }
}
