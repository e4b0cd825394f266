use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct GrammarArgs {
    /// File containing the grammar
    pub file: PathBuf,

    /// Start symbol (default: first in the file)
    #[arg(short, long, value_name = "SYMBOL")]
    pub start: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print each normalization step down to Chomsky Normal Form
    Normalize {
        #[command(flatten)]
        grammar: GrammarArgs,
    },

    /// Tell whether a grammar is regular
    Classify {
        #[command(flatten)]
        grammar: GrammarArgs,
    },

    /// Turn a right-linear grammar into a finite automaton
    Automaton {
        #[command(flatten)]
        grammar: GrammarArgs,

        /// Words to check (characters, or space separated symbols)
        #[arg(short, long = "check", value_name = "WORD")]
        words: Vec<String>,
    },

    /// Make an automaton deterministic and turn it back into a grammar
    Determinize {
        /// File containing the automaton definition
        file: PathBuf,
    },

    /// Generate sentences from a grammar
    Generate {
        #[command(flatten)]
        grammar: GrammarArgs,

        /// Amount to generate (default: 1)
        #[arg(short = 'n', long, value_name = "AMOUNT")]
        amount: Option<u32>,

        /// List every sentence up to this length instead
        #[arg(long, value_name = "LENGTH")]
        all: Option<usize>,

        /// Give up on derivations deeper than this
        #[arg(long, value_name = "DEPTH", default_value_t = 64)]
        max_depth: usize,
    },
}
