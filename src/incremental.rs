//! Host-side pieces of incremental lexing.
//!
//! An editor keeps per-token state so that after an edit it can
//! restart the lexer near the change instead of at the top of the
//! file. [`StateTable`] turns states into small integers for hosts
//! that store one `int` per token, [`AnchorCache`] maps offsets to
//! resumable states, and [`Document`] ties both ideas together by
//! re-lexing only the region an edit can affect.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use tracing::debug;

use crate::lexer::{Lexer, OffsetError, OffsetErrorKind, check_offset, resume};
use crate::mode::LexerState;
use crate::token::{Span, Token, TokenKind};

/// Interns lexer states as dense integer ids.
///
/// The initial state is always [`StateTable::INITIAL_ID`].
#[derive(Debug, Clone)]
pub struct StateTable {
    states: Vec<LexerState>,
    ids: HashMap<LexerState, usize>,
}

impl StateTable {
    pub const INITIAL_ID: usize = 0;

    #[must_use]
    pub fn new() -> Self {
        Self {
            states: vec![LexerState::INITIAL],
            ids: HashMap::from([(LexerState::INITIAL, Self::INITIAL_ID)]),
        }
    }

    /// Id for `state`, allocating a new one on first sight.
    pub fn intern(&mut self, state: &LexerState) -> usize {
        if let Some(&id) = self.ids.get(state) {
            return id;
        }
        let id = self.states.len();
        self.states.push(state.clone());
        self.ids.insert(state.clone(), id);
        id
    }

    #[must_use]
    pub fn get(&self, id: usize) -> Option<&LexerState> {
        self.states.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl Default for StateTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered `offset -> state` anchors from which lexing may resume.
#[derive(Debug, Clone, Default)]
pub struct AnchorCache {
    anchors: BTreeMap<usize, LexerState>,
}

impl AnchorCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, offset: usize, state: LexerState) {
        self.anchors.insert(offset, state);
    }

    /// Closest anchor at or before `offset`, or the start of the text.
    #[must_use]
    pub fn nearest(&self, offset: usize) -> (usize, LexerState) {
        self.anchors
            .range(..=offset)
            .next_back()
            .map_or((0, LexerState::INITIAL), |(&at, state)| (at, state.clone()))
    }

    /// Drop every anchor at or after `offset`. Returns how many went.
    pub fn invalidate_from(&mut self, offset: usize) -> usize {
        let dropped = self.anchors.split_off(&offset);
        if !dropped.is_empty() {
            debug!(offset, dropped = dropped.len(), "invalidated anchors");
        }
        dropped.len()
    }

    /// A lexer over `text` started from the nearest anchor at or
    /// before `offset`.
    ///
    /// # Errors
    ///
    /// Returns `OffsetError` if `offset` or the chosen anchor is not a
    /// valid position in `text`.
    pub fn lexer<'a>(&self, text: &'a str, offset: usize) -> Result<Lexer<'a>, OffsetError> {
        check_offset(text, offset)?;
        let (at, state) = self.nearest(offset);
        resume(text, at, &state)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// What a [`Document::edit`] changed in the token list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditSummary {
    /// Index of the first token that was re-lexed.
    pub first: usize,
    /// Old tokens replaced, starting at `first`.
    pub removed: usize,
    /// New tokens inserted at `first`.
    pub inserted: usize,
}

/// Source text kept in sync with its tokens across edits.
#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    tokens: Vec<Token>,
    /// State in effect where each token starts.
    starts: Vec<LexerState>,
    /// Per-token scan reach, see `Lexer::reach`.
    reach: Vec<usize>,
}

impl Document {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut tokens = Vec::new();
        let mut starts = Vec::new();
        let mut reach = Vec::new();

        let mut lexer = Lexer::new(&text);
        loop {
            let state = lexer.current_state();
            let Some(token) = lexer.next() else { break };
            tokens.push(token);
            starts.push(state);
            reach.push(lexer.reach());
        }

        Self {
            text,
            tokens,
            starts,
            reach,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// All tokens, ending with `Eof`.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// State the lexer was in when token `index` started.
    #[must_use]
    pub fn state_before(&self, index: usize) -> Option<&LexerState> {
        self.starts.get(index)
    }

    /// State at end of input. Anything but the initial state means a
    /// string or comment was left open.
    #[must_use]
    pub fn final_state(&self) -> LexerState {
        self.starts.last().cloned().unwrap_or_default()
    }

    /// Anchors at every token start.
    #[must_use]
    pub fn anchors(&self) -> AnchorCache {
        let mut cache = AnchorCache::new();
        for (token, state) in self.tokens.iter().zip(&self.starts) {
            cache.record(token.span.start, state.clone());
        }
        cache
    }

    /// Intern the start state of every token, in token order.
    pub fn state_ids(&self, table: &mut StateTable) -> Vec<usize> {
        self.starts.iter().map(|s| table.intern(s)).collect()
    }

    /// Replace `range` of the text with `replacement` and re-lex.
    ///
    /// Lexing restarts at the first token whose scan reached into the
    /// edit and stops as soon as it lines up with an old token that
    /// begins after the edit in the same state; the rest of the old
    /// tokens are kept, shifted.
    ///
    /// # Errors
    ///
    /// Returns `OffsetError` if the range is inverted, out of bounds,
    /// or splits a character. The document is unchanged on error.
    pub fn edit(
        &mut self,
        range: Range<usize>,
        replacement: &str,
    ) -> Result<EditSummary, OffsetError> {
        let Range {
            start,
            end: old_end,
        } = range;
        if old_end < start {
            return Err(OffsetError {
                kind: OffsetErrorKind::InvertedRange { end: old_end },
                offset: start,
            });
        }
        check_offset(&self.text, start)?;
        check_offset(&self.text, old_end)?;

        // Eof always reaches past the end of the text.
        let first = self
            .reach
            .iter()
            .position(|&r| r > start)
            .unwrap_or(self.tokens.len().saturating_sub(1));
        let restart = self.tokens.get(first).map_or(0, |t| t.span.start);
        let state = self
            .starts
            .get(first)
            .cloned()
            .unwrap_or(LexerState::INITIAL);

        self.text.replace_range(start..old_end, replacement);
        let new_end = start + replacement.len();

        let mut tokens = Vec::new();
        let mut starts = Vec::new();
        let mut reach = Vec::new();
        let mut tail = None;

        let mut lexer = resume(&self.text, restart, &state)?;
        loop {
            let pre = lexer.current_state();
            let at = lexer.offset();
            if at >= new_end {
                let old_at = at - new_end + old_end;
                if let Ok(k) = self.tokens.binary_search_by_key(&old_at, |t| t.span.start) {
                    if k >= first && self.starts[k] == pre {
                        tail = Some(k);
                        break;
                    }
                }
            }
            let Some(token) = lexer.next() else { break };
            tokens.push(token);
            starts.push(pre);
            reach.push(lexer.reach());
            if token.kind == TokenKind::Eof {
                break;
            }
        }

        let removed_end = tail.unwrap_or(self.tokens.len());
        let shift = |offset: usize| offset - old_end + new_end;
        for token in &mut self.tokens[removed_end..] {
            token.span = Span::new(shift(token.span.start), shift(token.span.end));
        }
        for r in &mut self.reach[removed_end..] {
            *r = shift(*r);
        }

        let summary = EditSummary {
            first,
            removed: removed_end - first,
            inserted: tokens.len(),
        };
        self.tokens.splice(first..removed_end, tokens);
        self.starts.splice(first..removed_end, starts);
        self.reach.splice(first..removed_end, reach);

        debug!(
            first = summary.first,
            removed = summary.removed,
            inserted = summary.inserted,
            converged = tail.is_some(),
            "relexed after edit"
        );
        Ok(summary)
    }
}
