//! Lexical modes and immutable lexer state snapshots.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// A lexical context selecting which rules are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[repr(u8)]
pub enum Mode {
    Default = 0,
    BlockComment = 1,
    String = 2,
}

impl Mode {
    /// Every mode, ordered by id.
    pub const ALL: [Self; 3] = [Self::Default, Self::BlockComment, Self::String];

    /// Small integer identifying this mode.
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Default),
            1 => Some(Self::BlockComment),
            2 => Some(Self::String),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::BlockComment => "BLOCK_COMMENT",
            Self::String => "STRING",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Snapshot of a lexer's mode and mode stack.
///
/// The stack is ordered outermost first and never holds the active
/// mode on top. An empty stack is always stored as `None`, so states
/// compare and hash by content no matter how they were built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LexerState {
    mode: Mode,
    mode_stack: Option<Arc<[Mode]>>,
}

impl LexerState {
    /// Default mode, nothing pushed.
    pub const INITIAL: Self = Self {
        mode: Mode::Default,
        mode_stack: None,
    };

    /// Build a state from a mode and the modes beneath it.
    ///
    /// Returns `None` when the innermost stacked mode equals `mode`,
    /// or when two neighbouring stack entries are equal (popping would
    /// then put the active mode on top). No lexer reaches such a state.
    #[must_use]
    pub fn new(mode: Mode, stack: impl IntoIterator<Item = Mode>) -> Option<Self> {
        let stack: Arc<[Mode]> = stack.into_iter().collect();
        let chain: Vec<Mode> = stack.iter().copied().chain([mode]).collect();
        if chain.windows(2).any(|pair| pair[0] == pair[1]) {
            return None;
        }
        Some(Self::from_shared(mode, stack))
    }

    /// Build a state around an already shared stack.
    pub(crate) fn from_shared(mode: Mode, stack: Arc<[Mode]>) -> Self {
        Self {
            mode,
            mode_stack: (!stack.is_empty()).then_some(stack),
        }
    }

    pub(crate) fn shared_stack(&self) -> Arc<[Mode]> {
        self.mode_stack.clone().unwrap_or_else(|| Arc::from([]))
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Pushed modes, outermost first. Empty when nothing is pushed.
    #[must_use]
    pub fn mode_stack(&self) -> &[Mode] {
        self.mode_stack.as_deref().unwrap_or(&[])
    }

    /// Number of modes pushed beneath the active one.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.mode_stack().len()
    }

    #[must_use]
    pub fn is_initial(&self) -> bool {
        *self == Self::INITIAL
    }
}

impl Default for LexerState {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for LexerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mode)?;
        if let Some(stack) = &self.mode_stack {
            f.write_str(" [")?;
            for (i, mode) in stack.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{mode}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

/// The state every fresh lexing session starts from.
#[must_use]
pub const fn initial_state() -> LexerState {
    LexerState::INITIAL
}
