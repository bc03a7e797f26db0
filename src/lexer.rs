use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::mode::{LexerState, Mode};
use crate::token::{Keyword, LexErrorKind, Punct, Span, Token, TokenKind};

/// Classifies an invalid offset or range handed to the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetErrorKind {
    /// Offset is past the end of the text.
    OutOfBounds { len: usize },
    /// Offset falls inside a multi-byte character.
    NotCharBoundary,
    /// Range ends before it starts.
    InvertedRange { end: usize },
}

impl fmt::Display for OffsetErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { len } => {
                write!(f, "offset out of bounds (text is {len} bytes)")
            }
            Self::NotCharBoundary => {
                write!(f, "offset is not on a character boundary")
            }
            Self::InvertedRange { end } => {
                write!(f, "range ends at {end}, before its start")
            }
        }
    }
}

/// Error produced when resuming or editing at an invalid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at byte offset {offset}")]
pub struct OffsetError {
    pub kind: OffsetErrorKind,
    pub offset: usize,
}

pub(crate) fn check_offset(input: &str, offset: usize) -> Result<(), OffsetError> {
    if offset > input.len() {
        return Err(OffsetError {
            kind: OffsetErrorKind::OutOfBounds { len: input.len() },
            offset,
        });
    }
    if !input.is_char_boundary(offset) {
        return Err(OffsetError {
            kind: OffsetErrorKind::NotCharBoundary,
            offset,
        });
    }
    Ok(())
}

/// Tokenize a whole Circom source, ending with `Eof`.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).collect()
}

/// Resume lexing `input` at `offset` from a previously captured state.
///
/// # Errors
///
/// Returns `OffsetError` if `offset` is past the end of `input` or
/// splits a UTF-8 character.
pub fn resume<'a>(
    input: &'a str,
    offset: usize,
    state: &LexerState,
) -> Result<Lexer<'a>, OffsetError> {
    check_offset(input, offset)?;
    debug!(offset, %state, "resuming lexer");
    Ok(Lexer {
        input,
        pos: offset,
        mode: state.mode(),
        stack: state.mode_stack().to_vec(),
        frozen: state.shared_stack(),
        reach: offset,
        done: false,
    })
}

/// Operators and punctuation, longest first so the first hit wins.
const PUNCTS: &[(&str, Punct)] = &[
    ("<==", Punct::LeftConstraint),
    ("==>", Punct::RightConstraint),
    ("<--", Punct::LeftSignal),
    ("-->", Punct::RightSignal),
    ("===", Punct::ConstraintEq),
    ("**=", Punct::PowAssign),
    ("<<=", Punct::ShlAssign),
    (">>=", Punct::ShrAssign),
    ("==", Punct::EqEq),
    ("!=", Punct::NotEq),
    ("<=", Punct::LtEq),
    (">=", Punct::GtEq),
    ("**", Punct::Pow),
    ("++", Punct::PlusPlus),
    ("--", Punct::MinusMinus),
    ("+=", Punct::PlusAssign),
    ("-=", Punct::MinusAssign),
    ("*=", Punct::StarAssign),
    ("/=", Punct::SlashAssign),
    ("\\=", Punct::IntDivAssign),
    ("%=", Punct::PercentAssign),
    ("&&", Punct::AndAnd),
    ("&=", Punct::AmpAssign),
    ("||", Punct::OrOr),
    ("|=", Punct::PipeAssign),
    ("^=", Punct::CaretAssign),
    ("<<", Punct::Shl),
    (">>", Punct::Shr),
    ("(", Punct::LParen),
    (")", Punct::RParen),
    ("[", Punct::LBracket),
    ("]", Punct::RBracket),
    ("{", Punct::LBrace),
    ("}", Punct::RBrace),
    (";", Punct::Semicolon),
    (",", Punct::Comma),
    (".", Punct::Dot),
    ("?", Punct::Question),
    (":", Punct::Colon),
    ("=", Punct::Assign),
    ("!", Punct::Not),
    ("<", Punct::Lt),
    (">", Punct::Gt),
    ("+", Punct::Plus),
    ("-", Punct::Minus),
    ("*", Punct::Star),
    ("/", Punct::Slash),
    ("\\", Punct::IntDiv),
    ("%", Punct::Percent),
    ("&", Punct::Amp),
    ("|", Punct::Pipe),
    ("^", Punct::Caret),
    ("~", Punct::Tilde),
];

const fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '\u{000C}' | '\u{FEFF}')
}

const fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

const fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// A live lexing session over one source text.
///
/// Iterating yields tokens up to and including `Eof`. The current
/// mode and mode stack can be snapshotted between tokens with
/// [`Lexer::current_state`].
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    mode: Mode,
    stack: Vec<Mode>,
    /// Shared copy of `stack`, rebuilt on every push and pop so
    /// snapshots never alias the working stack.
    frozen: Arc<[Mode]>,
    /// One past the furthest byte examined for the last token.
    reach: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    /// Start a fresh session at offset 0 in the initial state.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            mode: Mode::Default,
            stack: Vec::new(),
            frozen: Arc::from([]),
            reach: 0,
            done: false,
        }
    }

    /// Immutable snapshot of the current mode and mode stack.
    #[must_use]
    pub fn current_state(&self) -> LexerState {
        LexerState::from_shared(self.mode, Arc::clone(&self.frozen))
    }

    /// Byte offset where the next token starts.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Next token together with the state captured right after it.
    pub fn next_with_state(&mut self) -> Option<(Token, LexerState)> {
        let token = self.next()?;
        Some((token, self.current_state()))
    }

    /// One past the furthest byte the last token's scan looked at,
    /// end of input counting as a byte. Edits at or beyond this
    /// offset cannot change that token.
    pub(crate) const fn reach(&self) -> usize {
        self.reach
    }

    fn touch(&mut self, end: usize) {
        self.reach = self.reach.max(end);
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_char(&mut self) -> Option<char> {
        self.touch(self.pos + 1);
        self.rest().chars().next()
    }

    fn peek_byte_at(&mut self, offset: usize) -> Option<u8> {
        self.touch(self.pos + offset + 1);
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map_or(rest.len(), |(i, _)| i);
        self.pos += len;
        self.touch(self.pos + 1);
    }

    fn eat_digits(&mut self) {
        self.eat_while(|c| c.is_ascii_digit());
    }

    fn push(&mut self, to: Mode) {
        trace!(from = %self.mode, to = %to, depth = self.stack.len() + 1, "push mode");
        self.stack.push(self.mode);
        self.mode = to;
        self.frozen = Arc::from(self.stack.as_slice());
    }

    /// Return to the enclosing mode. On an empty stack the lexer
    /// falls back to `Default` and reports `false`.
    fn pop(&mut self) -> bool {
        if let Some(prev) = self.stack.pop() {
            trace!(from = %self.mode, to = %prev, depth = self.stack.len(), "pop mode");
            self.mode = prev;
            self.frozen = Arc::from(self.stack.as_slice());
            true
        } else {
            debug!(mode = %self.mode, offset = self.pos, "mode exit with empty stack");
            self.mode = Mode::Default;
            false
        }
    }

    fn exit_mode(&mut self, ok: TokenKind) -> TokenKind {
        if self.pop() {
            ok
        } else {
            TokenKind::Error(LexErrorKind::UnmatchedModeExit)
        }
    }

    fn lex_default(&mut self) -> TokenKind {
        let Some(ch) = self.peek_char() else {
            return TokenKind::Eof;
        };
        let next = self.peek_byte_at(1);

        match ch {
            c if is_whitespace(c) => {
                self.eat_while(is_whitespace);
                TokenKind::Whitespace
            }
            '/' if next == Some(b'/') => {
                self.eat_while(|c| c != '\n' && c != '\r');
                TokenKind::LineComment
            }
            '/' if next == Some(b'*') => {
                self.pos += 2;
                self.push(Mode::BlockComment);
                TokenKind::BlockCommentStart
            }
            // `*/*` is a multiplication followed by a comment opener.
            '*' if next == Some(b'/') && self.peek_byte_at(2) != Some(b'*') => {
                self.pos += 2;
                TokenKind::Error(LexErrorKind::UnmatchedModeExit)
            }
            '"' => {
                self.pos += 1;
                self.push(Mode::String);
                TokenKind::StringStart
            }
            c if is_ident_start(c) => self.read_ident(),
            c if c.is_ascii_digit() => self.read_number(),
            c => self.read_punct(c),
        }
    }

    fn read_ident(&mut self) -> TokenKind {
        let start = self.pos;
        self.eat_while(is_ident_continue);
        Keyword::from_ident(&self.input[start..self.pos])
            .map_or(TokenKind::Ident, TokenKind::Keyword)
    }

    fn read_number(&mut self) -> TokenKind {
        if self.peek_byte_at(0) == Some(b'0')
            && matches!(self.peek_byte_at(1), Some(b'x' | b'X'))
            && self.peek_byte_at(2).is_some_and(|b| b.is_ascii_hexdigit())
        {
            self.pos += 2;
            self.eat_while(|c| c.is_ascii_hexdigit());
            return TokenKind::Number;
        }

        self.eat_digits();
        let number_end = self.pos;

        // major.minor.patch, otherwise back off to the plain number
        for _ in 0..2 {
            let dot_then_digit = self.peek_byte_at(0) == Some(b'.')
                && self.peek_byte_at(1).is_some_and(|b| b.is_ascii_digit());
            if !dot_then_digit {
                self.pos = number_end;
                return TokenKind::Number;
            }
            self.pos += 1;
            self.eat_digits();
        }
        TokenKind::Version
    }

    fn read_punct(&mut self, ch: char) -> TokenKind {
        self.touch(self.pos + 3);
        let rest = self.rest();
        if let Some(&(text, punct)) = PUNCTS.iter().find(|(text, _)| rest.starts_with(text)) {
            self.pos += text.len();
            return TokenKind::Punct(punct);
        }
        self.pos += ch.len_utf8();
        TokenKind::Error(LexErrorKind::UnexpectedCharacter(ch))
    }

    fn lex_block_comment(&mut self) -> TokenKind {
        self.touch(self.pos + 2);
        let rest = self.rest();
        if rest.starts_with("*/") {
            self.pos += 2;
            return self.exit_mode(TokenKind::BlockCommentEnd);
        }
        match rest.find("*/") {
            Some(at) => {
                self.pos += at;
                self.touch(self.pos + 2);
            }
            None => {
                self.pos = self.input.len();
                self.touch(self.pos + 1);
            }
        }
        TokenKind::BlockCommentText
    }

    fn lex_string(&mut self) -> TokenKind {
        match self.peek_char() {
            Some('"') => {
                self.pos += 1;
                self.exit_mode(TokenKind::StringEnd)
            }
            Some('\\') => {
                self.pos += 1;
                match self.peek_char() {
                    Some(c @ ('n' | 't' | 'r' | '\\' | '"' | '\'' | '0')) => {
                        self.pos += c.len_utf8();
                        TokenKind::StringEscape
                    }
                    Some(c) => {
                        self.pos += c.len_utf8();
                        TokenKind::Error(LexErrorKind::InvalidEscape(Some(c)))
                    }
                    None => TokenKind::Error(LexErrorKind::InvalidEscape(None)),
                }
            }
            Some(_) => {
                self.eat_while(|c| c != '"' && c != '\\');
                TokenKind::StringText
            }
            None => TokenKind::Eof,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        let start = self.pos;
        self.reach = start;
        if start >= self.input.len() {
            self.touch(start + 1);
            self.done = true;
            return Some(Token::new(TokenKind::Eof, Span::new(start, start)));
        }
        let kind = match self.mode {
            Mode::Default => self.lex_default(),
            Mode::BlockComment => self.lex_block_comment(),
            Mode::String => self.lex_string(),
        };
        debug_assert!(self.pos > start, "lexer must make progress");
        Some(Token::new(kind, Span::new(start, self.pos)))
    }
}

impl FusedIterator for Lexer<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).into_iter().map(|t| t.kind).collect()
    }

    fn texts(input: &str) -> Vec<&str> {
        tokenize(input).iter().map(|t| t.text(input)).collect()
    }

    #[test]
    fn simple_words() {
        let tokens = tokenize("signal input a;");
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Keyword(Keyword::Signal),
                TokenKind::Whitespace,
                TokenKind::Keyword(Keyword::Input),
                TokenKind::Whitespace,
                TokenKind::Ident,
                TokenKind::Punct(Punct::Semicolon),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn empty_input_is_just_eof() {
        let tokens = tokenize("");
        assert_eq!(tokens, vec![Token::new(TokenKind::Eof, Span::new(0, 0))]);
    }

    #[test]
    fn constraint_operators() {
        assert_eq!(
            kinds("<==|==>|<--|-->|==="),
            vec![
                TokenKind::Punct(Punct::LeftConstraint),
                TokenKind::Punct(Punct::Pipe),
                TokenKind::Punct(Punct::RightConstraint),
                TokenKind::Punct(Punct::Pipe),
                TokenKind::Punct(Punct::LeftSignal),
                TokenKind::Punct(Punct::Pipe),
                TokenKind::Punct(Punct::RightSignal),
                TokenKind::Punct(Punct::Pipe),
                TokenKind::Punct(Punct::ConstraintEq),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn longest_match_wins() {
        assert_eq!(
            kinds("a**=b\\c<<=2"),
            vec![
                TokenKind::Ident,
                TokenKind::Punct(Punct::PowAssign),
                TokenKind::Ident,
                TokenKind::Punct(Punct::IntDiv),
                TokenKind::Ident,
                TokenKind::Punct(Punct::ShlAssign),
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn numbers_and_versions() {
        assert_eq!(
            kinds("pragma circom 2.1.6;"),
            vec![
                TokenKind::Keyword(Keyword::Pragma),
                TokenKind::Whitespace,
                TokenKind::Keyword(Keyword::Circom),
                TokenKind::Whitespace,
                TokenKind::Version,
                TokenKind::Punct(Punct::Semicolon),
                TokenKind::Eof,
            ]
        );
        assert_eq!(texts("0xFFz"), vec!["0xFF", "z", ""]);
        assert_eq!(texts("1.5"), vec!["1", ".", "5", ""]);
        assert_eq!(texts("0x"), vec!["0", "x", ""]);
    }

    #[test]
    fn identifiers_allow_dollar_and_underscore() {
        assert_eq!(texts("$a _b c1"), vec!["$a", " ", "_b", " ", "c1", ""]);
        assert_eq!(kinds("main_")[0], TokenKind::Ident);
    }

    #[test]
    fn block_comment_modes() {
        let mut lexer = Lexer::new("/*x*/");
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::BlockCommentStart));
        assert_eq!(lexer.mode(), Mode::BlockComment);
        assert_eq!(
            lexer.current_state(),
            LexerState::new(Mode::BlockComment, [Mode::Default]).unwrap()
        );
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::BlockCommentText));
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::BlockCommentEnd));
        assert_eq!(lexer.current_state(), LexerState::INITIAL);
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::Eof));
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn block_comment_is_not_nested() {
        assert_eq!(
            kinds("/* /* */"),
            vec![
                TokenKind::BlockCommentStart,
                TokenKind::BlockCommentText,
                TokenKind::BlockCommentEnd,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_with_escapes() {
        let input = r#"log("a\n\q")"#;
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Keyword(Keyword::Log),
                TokenKind::Punct(Punct::LParen),
                TokenKind::StringStart,
                TokenKind::StringText,
                TokenKind::StringEscape,
                TokenKind::Error(LexErrorKind::InvalidEscape(Some('q'))),
                TokenKind::StringEnd,
                TokenKind::Punct(Punct::RParen),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn dangling_backslash() {
        assert_eq!(
            kinds("\"ab\\"),
            vec![
                TokenKind::StringStart,
                TokenKind::StringText,
                TokenKind::Error(LexErrorKind::InvalidEscape(None)),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn stray_comment_close() {
        assert_eq!(texts("*/"), vec!["*/", ""]);
        assert_eq!(kinds("*/")[0], TokenKind::Error(LexErrorKind::UnmatchedModeExit));
    }

    #[test]
    fn star_before_comment() {
        assert_eq!(
            kinds("a*/*c*/b"),
            vec![
                TokenKind::Ident,
                TokenKind::Punct(Punct::Star),
                TokenKind::BlockCommentStart,
                TokenKind::BlockCommentText,
                TokenKind::BlockCommentEnd,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unexpected_character_is_one_char() {
        let input = "a@é#";
        assert_eq!(texts(input), vec!["a", "@", "é", "#", ""]);
        assert_eq!(
            kinds(input)[2],
            TokenKind::Error(LexErrorKind::UnexpectedCharacter('é'))
        );
    }

    #[test]
    fn line_comment_stops_at_newline() {
        assert_eq!(texts("x // hi\r\ny"), vec!["x", " ", "// hi", "\r\n", "y", ""]);
        assert_eq!(tokenize("// hi")[0].channel, crate::token::Channel::Hidden);
    }

    #[test]
    fn bom_is_whitespace() {
        let tokens = tokenize("\u{FEFF}template");
        assert_eq!(tokens[0].kind, TokenKind::Whitespace);
        assert_eq!(tokens[0].span, Span::new(0, 3));
        assert_eq!(tokens[1].kind, TokenKind::Keyword(Keyword::Template));
    }

    #[test]
    fn failed_pop_recovers_to_default() {
        let state = LexerState::new(Mode::String, None).unwrap();
        let mut lexer = resume("\"x", 0, &state).expect("resume");
        let first = lexer.next().expect("token");
        assert_eq!(first.kind, TokenKind::Error(LexErrorKind::UnmatchedModeExit));
        assert_eq!(lexer.current_state(), LexerState::INITIAL);
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::Ident));
    }

    #[test]
    fn resume_rejects_bad_offsets() {
        let state = LexerState::INITIAL;
        let err = resume("ab", 3, &state).unwrap_err();
        assert_eq!(err.kind, OffsetErrorKind::OutOfBounds { len: 2 });
        let err = resume("é", 1, &state).unwrap_err();
        assert_eq!(err.kind, OffsetErrorKind::NotCharBoundary);
        assert_eq!(err.to_string(), "offset is not on a character boundary at byte offset 1");
    }

    #[test]
    fn snapshot_does_not_alias_live_stack() {
        let mut lexer = Lexer::new("\"a\"");
        lexer.next();
        let inside = lexer.current_state();
        lexer.next();
        lexer.next();
        assert_eq!(inside, LexerState::new(Mode::String, [Mode::Default]).unwrap());
        assert!(lexer.current_state().is_initial());
    }
}
