use htsql_ast::{Domain, SortDirection, Span};
use htsql_catalog::ClassId;
use smol_str::SmolStr;

/// §3 "Binding tree": a node mirrors its originating syntax node but with
/// names replaced by resolved references, and carries a resolved domain and
/// plurality flag instead of lexical text.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub kind: Box<BindingKind>,
    pub domain: Domain,
    /// True when this binding ranges over more than one row relative to its
    /// enclosing scope (§4.3 "Aggregates and plural contexts").
    pub plural: bool,
    pub span: Span,
}

impl Binding {
    pub fn new(kind: BindingKind, domain: Domain, plural: bool, span: Span) -> Self {
        Self { kind: Box::new(kind), domain, plural, span }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    Integer(SmolStr),
    Decimal(SmolStr),
    Float(SmolStr),
    String(SmolStr),
}

/// A single item of a selection: either a bare expression or a named
/// assignment (`credits := credits * 2`).
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionItem {
    pub label: SmolStr,
    pub value: Binding,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BindingKind {
    /// The unit class: the implicit root every query starts from.
    Unit,
    /// A class-extent traversal (unit -> table, or a link target).
    Table { class: ClassId },
    /// Reading a single-valued attribute arrow off `base`.
    Attribute { base: Binding, arrow_name: SmolStr },
    /// Following a class-to-class arrow (direct or reverse FK) off `base`.
    Link { base: Binding, arrow_name: SmolStr, target: ClassId },
    Literal { value: LiteralValue },
    List { items: Vec<Binding> },
    /// A structural coercion of an untyped literal/expression to `target`.
    Cast { inner: Binding, target: Domain },
    /// One primitive operator or named function, resolved to a signature.
    Formula { name: SmolStr, args: Vec<Binding> },
    /// `base^kernel`: a quotient class grouping `base` by `kernel`.
    Quotient { base: Binding, base_class: ClassId, kernel: Vec<(SmolStr, Binding)> },
    /// The complement link back from a quotient to its pre-projection base.
    Complement { quotient: Binding },
    Sieve { base: Binding, condition: Binding },
    Selection { base: Binding, items: Vec<SelectionItem> },
    Sort { base: Binding, direction: SortDirection },
    /// A `define`/`where` calculated attribute; has no value of its own,
    /// only extends the enclosing scope for the bindings that follow it.
    Assignment { name: SmolStr, value: Binding },
    /// `$name` resolved to the binding it was captured from.
    Reference { name: SmolStr, value: Binding },
}
