//! Incremental, mode-aware lexer for the Circom circuit language.
//!
//! The lexer tracks an explicit mode (default, block comment, string)
//! and a mode stack. Between any two tokens the live state can be
//! captured as an immutable [`LexerState`] and later handed back to
//! [`resume`], so an editor can re-lex from a cached anchor after a
//! local edit instead of from the top of the file.
//!
//! # Quick start
//!
//! ## Tokenize a file
//!
//! ```
//! use circom_lexer::{tokenize, TokenKind, Channel};
//!
//! let src = "signal input a; // the witness\n";
//! let tokens = tokenize(src);
//! let visible: Vec<&str> = tokens
//!     .iter()
//!     .filter(|t| t.channel == Channel::Default && t.kind != TokenKind::Eof)
//!     .map(|t| t.text(src))
//!     .collect();
//! assert_eq!(visible, ["signal", "input", "a", ";"]);
//! ```
//!
//! ## Resume from a captured state
//!
//! ```
//! use circom_lexer::{Lexer, resume, TokenKind};
//!
//! let src = "a/*c*/b";
//! let mut lexer = Lexer::new(src);
//! lexer.next();
//! let (start, state) = lexer.next_with_state().unwrap();
//! assert_eq!(start.kind, TokenKind::BlockCommentStart);
//!
//! let rest: Vec<_> = resume(src, start.span.end, &state)
//!     .unwrap()
//!     .map(|t| t.kind)
//!     .collect();
//! assert_eq!(rest[0], TokenKind::BlockCommentText);
//! ```
//!
//! ## Keep a document in sync across edits
//!
//! ```
//! use circom_lexer::{Document, tokenize};
//!
//! let mut doc = Document::new("var x = 1;");
//! doc.edit(4..5, "total").unwrap();
//! assert_eq!(doc.tokens(), tokenize("var total = 1;").as_slice());
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod incremental;
pub mod lexer;
pub mod mode;
pub mod token;

pub use incremental::{AnchorCache, Document, EditSummary, StateTable};
pub use lexer::{Lexer, OffsetError, OffsetErrorKind, resume, tokenize};
pub use mode::{LexerState, Mode, initial_state};
pub use token::{Channel, Keyword, LexErrorKind, Punct, Span, Token, TokenKind};
