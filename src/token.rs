use std::fmt;

use serde::Serialize;

/// Half-open byte range `[start, end)` into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Output channel of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Channel {
    /// Tokens a parser consumes.
    Default,
    /// Whitespace and comments.
    Hidden,
}

/// Classifies a lexical problem carried by an error token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LexErrorKind {
    /// Character that cannot start any token in the current mode.
    UnexpectedCharacter(char),
    /// Mode exit (`*/` or closing quote) with nothing to return to.
    UnmatchedModeExit,
    /// Unknown escape inside a string. `None` for a backslash at
    /// end of input.
    InvalidEscape(Option<char>),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedCharacter(ch) => {
                write!(f, "unexpected character: {}", ch.escape_debug())
            }
            Self::UnmatchedModeExit => {
                write!(f, "closing delimiter without matching opener")
            }
            Self::InvalidEscape(Some(ch)) => {
                write!(f, "invalid escape sequence: \\{}", ch.escape_debug())
            }
            Self::InvalidEscape(None) => {
                write!(f, "dangling backslash at end of input")
            }
        }
    }
}

/// Circom reserved words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Keyword {
    Pragma,
    Circom,
    CustomTemplates,
    Include,
    Template,
    Function,
    Component,
    Main,
    Public,
    Signal,
    Input,
    Output,
    Var,
    If,
    Else,
    For,
    While,
    Do,
    Return,
    Log,
    Assert,
    Parallel,
    Custom,
    Bus,
}

impl Keyword {
    /// Look up an identifier in the reserved word table.
    #[must_use]
    pub fn from_ident(ident: &str) -> Option<Self> {
        let kw = match ident {
            "pragma" => Self::Pragma,
            "circom" => Self::Circom,
            "custom_templates" => Self::CustomTemplates,
            "include" => Self::Include,
            "template" => Self::Template,
            "function" => Self::Function,
            "component" => Self::Component,
            "main" => Self::Main,
            "public" => Self::Public,
            "signal" => Self::Signal,
            "input" => Self::Input,
            "output" => Self::Output,
            "var" => Self::Var,
            "if" => Self::If,
            "else" => Self::Else,
            "for" => Self::For,
            "while" => Self::While,
            "do" => Self::Do,
            "return" => Self::Return,
            "log" => Self::Log,
            "assert" => Self::Assert,
            "parallel" => Self::Parallel,
            "custom" => Self::Custom,
            "bus" => Self::Bus,
            _ => return None,
        };
        Some(kw)
    }
}

/// Operators and punctuation, named by shape rather than meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Punct {
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `?`
    Question,
    /// `:`
    Colon,
    /// `=`
    Assign,
    /// `==`
    EqEq,
    /// `===`
    ConstraintEq,
    /// `!=`
    NotEq,
    /// `!`
    Not,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `<--`
    LeftSignal,
    /// `<==`
    LeftConstraint,
    /// `-->`
    RightSignal,
    /// `==>`
    RightConstraint,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `**`
    Pow,
    /// `/`
    Slash,
    /// `\` (integer division)
    IntDiv,
    /// `%`
    Percent,
    /// `++`
    PlusPlus,
    /// `--`
    MinusMinus,
    /// `+=`
    PlusAssign,
    /// `-=`
    MinusAssign,
    /// `*=`
    StarAssign,
    /// `**=`
    PowAssign,
    /// `/=`
    SlashAssign,
    /// `\=`
    IntDivAssign,
    /// `%=`
    PercentAssign,
    /// `&`
    Amp,
    /// `&&`
    AndAnd,
    /// `&=`
    AmpAssign,
    /// `|`
    Pipe,
    /// `||`
    OrOr,
    /// `|=`
    PipeAssign,
    /// `^`
    Caret,
    /// `^=`
    CaretAssign,
    /// `~`
    Tilde,
    /// `<<`
    Shl,
    /// `<<=`
    ShlAssign,
    /// `>>`
    Shr,
    /// `>>=`
    ShrAssign,
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    /// Run of whitespace, newlines included.
    Whitespace,
    /// `// ...` up to, not including, the newline.
    LineComment,
    /// `/*`, entering block comment mode.
    BlockCommentStart,
    /// Body of a block comment.
    BlockCommentText,
    /// `*/`, leaving block comment mode.
    BlockCommentEnd,
    /// Opening `"`, entering string mode.
    StringStart,
    /// Literal characters inside a string.
    StringText,
    /// A recognised escape such as `\n`.
    StringEscape,
    /// Closing `"`, leaving string mode.
    StringEnd,
    Ident,
    Keyword(Keyword),
    /// Decimal or `0x` hexadecimal integer.
    Number,
    /// `major.minor.patch`, as used by `pragma circom`.
    Version,
    Punct(Punct),
    /// Lexical error; always covers at least one character.
    Error(LexErrorKind),
    /// End of input. Zero width, emitted exactly once.
    Eof,
}

impl TokenKind {
    /// Channel this kind is emitted on.
    #[must_use]
    pub const fn channel(self) -> Channel {
        match self {
            Self::Whitespace
            | Self::LineComment
            | Self::BlockCommentStart
            | Self::BlockCommentText
            | Self::BlockCommentEnd => Channel::Hidden,
            _ => Channel::Default,
        }
    }

    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// A single token: what it is and where it sits in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub channel: Channel,
}

impl Token {
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            channel: kind.channel(),
        }
    }

    /// The source text this token covers.
    ///
    /// # Panics
    ///
    /// Panics if `source` is not the text the token was lexed from.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.start..self.span.end]
    }
}
