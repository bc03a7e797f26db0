//! CLI tool to inspect how Circom sources are tokenized.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use circom_lexer::{Channel, Document, Lexer, Mode, StateTable, Token, TokenKind};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "circom-lex",
    version,
    about = "Inspect how Circom sources are tokenized"
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    /// `RUST_LOG` takes precedence when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the tokens of each file
    Tokens {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Include whitespace and comments
        #[arg(long)]
        hidden: bool,
        /// Emit a JSON array per file
        #[arg(long)]
        json: bool,
    },
    /// Print every token with the lexer state captured after it
    States { file: PathBuf },
    /// Report lexical errors and unterminated strings or comments
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Byte offset to 1-based line and column lookup. Lines end at
/// `\r\n`, `\r` or `\n`, like line comments do. Columns count chars.
struct LineIndex<'a> {
    source: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(source: &'a str) -> Self {
        let bytes = source.as_bytes();
        let mut starts = vec![0];
        for (i, &b) in bytes.iter().enumerate() {
            if b == b'\n' || (b == b'\r' && bytes.get(i + 1) != Some(&b'\n')) {
                starts.push(i + 1);
            }
        }
        Self { source, starts }
    }

    fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&s| s <= offset);
        let line_start = self.starts[line - 1];
        let column = self.source[line_start..offset].chars().count() + 1;
        (line, column)
    }
}

#[derive(Serialize)]
struct TokenRow<'a> {
    #[serde(flatten)]
    token: &'a Token,
    text: &'a str,
    line: usize,
    column: usize,
}

fn read(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => {
            debug!(path = %path.display(), bytes = content.len(), "read source");
            Some(content)
        }
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            None
        }
    }
}

/// Rows to print for `tokens`, leaving out the hidden channel unless
/// `hidden` is set.
fn token_rows<'a>(source: &'a str, tokens: &'a [Token], hidden: bool) -> Vec<TokenRow<'a>> {
    let index = LineIndex::new(source);
    tokens
        .iter()
        .filter(|t| hidden || t.channel == Channel::Default)
        .map(|token| {
            let (line, column) = index.line_col(token.span.start);
            TokenRow {
                token,
                text: token.text(source),
                line,
                column,
            }
        })
        .collect()
}

fn print_tokens(path: &Path, source: &str, hidden: bool, json: bool) -> bool {
    let tokens = circom_lexer::tokenize(source);
    let rows = token_rows(source, &tokens, hidden);
    info!(path = %path.display(), tokens = tokens.len(), shown = rows.len(), "tokenized");

    if json {
        match serde_json::to_string_pretty(&rows) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                return false;
            }
        }
    } else {
        println!("== {}", path.display());
        for row in &rows {
            let kind = format!("{:?}", row.token.kind);
            println!(
                "{:>4}:{:<4} {kind:<28} {:?}",
                row.line, row.column, row.text
            );
        }
    }
    true
}

fn print_states(source: &str) {
    let mut table = StateTable::new();
    let mut lexer = Lexer::new(source);
    while let Some((token, state)) = lexer.next_with_state() {
        let id = table.intern(&state);
        let kind = format!("{:?}", token.kind);
        let text = format!("{:?}", token.text(source));
        println!(
            "{:>6}..{:<6} {kind:<28} {text:<24} -> #{id} {state}",
            token.span.start, token.span.end,
        );
    }
    info!(states = table.len(), "distinct lexer states");
}

/// A lexical problem located by 1-based line and column.
#[derive(Debug, PartialEq, Eq)]
struct Problem {
    line: usize,
    column: usize,
    message: String,
}

/// Error tokens, then an unterminated string or comment at end of input.
fn problems(source: &str) -> Vec<Problem> {
    let index = LineIndex::new(source);
    let doc = Document::new(source);

    let mut found: Vec<Problem> = doc
        .tokens()
        .iter()
        .filter_map(|token| match token.kind {
            TokenKind::Error(kind) => {
                let (line, column) = index.line_col(token.span.start);
                Some(Problem {
                    line,
                    column,
                    message: kind.to_string(),
                })
            }
            _ => None,
        })
        .collect();

    let open = match doc.final_state().mode() {
        Mode::Default => None,
        Mode::String => Some("string"),
        Mode::BlockComment => Some("block comment"),
    };
    if let Some(what) = open {
        let (line, column) = index.line_col(source.len());
        found.push(Problem {
            line,
            column,
            message: format!("unterminated {what} at end of input"),
        });
    }
    debug!(tokens = doc.tokens().len(), problems = found.len(), "checked");
    found
}

fn check(path: &Path, source: &str) -> bool {
    let found = problems(source);
    for p in &found {
        eprintln!("{}:{}:{}: {}", path.display(), p.line, p.column, p.message);
    }
    if found.is_empty() {
        eprintln!("{}: ok", path.display());
    }
    found.is_empty()
}

/// Run one subcommand. Returns whether any file had a problem.
fn run(command: &Command) -> bool {
    let mut had_error = false;

    match command {
        Command::Tokens {
            files,
            hidden,
            json,
        } => {
            for path in files {
                match read(path) {
                    Some(source) => had_error |= !print_tokens(path, &source, *hidden, *json),
                    None => had_error = true,
                }
            }
        }
        Command::States { file } => match read(file) {
            Some(source) => print_states(&source),
            None => had_error = true,
        },
        Command::Check { files } => {
            for path in files {
                match read(path) {
                    Some(source) => had_error |= !check(path, &source),
                    None => had_error = true,
                }
            }
        }
    }
    had_error
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if run(&cli.command) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
