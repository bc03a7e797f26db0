#![allow(dead_code)]

use circom_lexer::{Lexer, LexerState, Token, TokenKind, resume, tokenize};

pub fn kinds(input: &str) -> Vec<TokenKind> {
    tokenize(input).into_iter().map(|t| t.kind).collect()
}

pub fn texts(input: &str) -> Vec<&str> {
    tokenize(input).iter().map(|t| t.text(input)).collect()
}

/// Helper: assert spans tile the input exactly and end in one `Eof`.
pub fn assert_covers(input: &str, tokens: &[Token]) {
    let mut at = 0;
    for (i, token) in tokens.iter().enumerate() {
        assert_eq!(
            token.span.start, at,
            "gap or overlap before token {i} ({token:?}) in {input:?}"
        );
        let is_last = i + 1 == tokens.len();
        if is_last {
            assert_eq!(token.kind, TokenKind::Eof, "last token in {input:?}");
            assert!(token.span.is_empty());
        } else {
            assert_ne!(token.kind, TokenKind::Eof, "early Eof in {input:?}");
            assert!(!token.span.is_empty(), "empty token {token:?} in {input:?}");
        }
        at = token.span.end;
    }
    assert_eq!(at, input.len(), "tokens stop short in {input:?}");
}

/// Every token paired with the state captured right after it.
pub fn lex_with_states(input: &str) -> Vec<(Token, LexerState)> {
    let mut lexer = Lexer::new(input);
    std::iter::from_fn(|| lexer.next_with_state()).collect()
}

/// Lex the first `split` tokens, then resume from the captured state
/// and return the tokens of the second pass.
pub fn resume_after(input: &str, split: usize) -> Vec<Token> {
    let (offset, state) = if split == 0 {
        (0, LexerState::INITIAL)
    } else {
        let (token, state) = lex_with_states(input)[split - 1].clone();
        (token.span.end, state)
    };
    resume(input, offset, &state)
        .unwrap_or_else(|e| panic!("resume at {offset} failed: {e}"))
        .collect()
}
