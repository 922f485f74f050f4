use htsql_ast::Span;
use smol_str::SmolStr;

/// The fixed grammar symbols (§6), recognized longest-match-first by the
/// scanner. Multi-character forms are tried before their single-character
/// prefixes (`!==` before `!=` before `!`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::IntoStaticStr, strum_macros::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Sym {
    Dot,
    Colon,
    Assign,
    Arrow,
    Plus,
    Minus,
    Star,
    Slash,
    Question,
    Caret,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Pipe,
    Amp,
    Bang,
    Eq,
    Ne,
    EqEq,
    NeNe,
    Tilde,
    NotTilde,
    Lt,
    Le,
    Gt,
    Ge,
    Dollar,
}

impl Sym {
    /// The literal text of the symbol, longest variants first so a
    /// straightforward linear scan performs longest-match.
    pub const TABLE: &'static [(&'static str, Sym)] = &[
        ("!==", Sym::NeNe),
        ("!=", Sym::Ne),
        ("!~", Sym::NotTilde),
        ("==", Sym::EqEq),
        ("<=", Sym::Le),
        (">=", Sym::Ge),
        ("->", Sym::Arrow),
        (":=", Sym::Assign),
        (".", Sym::Dot),
        (":", Sym::Colon),
        ("+", Sym::Plus),
        ("-", Sym::Minus),
        ("*", Sym::Star),
        ("/", Sym::Slash),
        ("?", Sym::Question),
        ("^", Sym::Caret),
        ("{", Sym::LBrace),
        ("}", Sym::RBrace),
        ("(", Sym::LParen),
        (")", Sym::RParen),
        (",", Sym::Comma),
        ("|", Sym::Pipe),
        ("&", Sym::Amp),
        ("!", Sym::Bang),
        ("=", Sym::Eq),
        ("~", Sym::Tilde),
        ("<", Sym::Lt),
        (">", Sym::Gt),
        ("$", Sym::Dollar),
    ];

    pub fn text(self) -> &'static str {
        Sym::TABLE
            .iter()
            .find(|(_, sym)| *sym == self)
            .map(|(text, _)| *text)
            .expect("every Sym variant is in Sym::TABLE")
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum_macros::IntoStaticStr, strum_macros::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum TokenKind {
    Name,
    Int,
    Decimal,
    Float,
    String,
    Symbol,
    End,
}

/// A single lexical token (§4.1). `raw` is the exact source slice (quotes
/// and `''` escapes intact for `String`, so the parser/binder can decide how
/// to unescape); `sym` is populated only for `TokenKind::Symbol`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    pub kind: TokenKind,
    pub raw: SmolStr,
    pub sym: Option<Sym>,
    pub span: Span,
}

impl Token {
    pub fn is_symbol(&self, sym: Sym) -> bool {
        self.kind == TokenKind::Symbol && self.sym == Some(sym)
    }

    pub fn is_end(&self) -> bool {
        self.kind == TokenKind::End
    }

    /// True when `self` begins exactly where `other` ends, i.e. no
    /// whitespace or comment lay between them in the source. Used by the
    /// parser to glue `$name` and `*N` atoms together (§6 atoms).
    pub fn is_adjacent_to(&self, other: &Token) -> bool {
        self.span.start == other.span.end
    }
}
