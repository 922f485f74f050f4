use smol_str::SmolStr;

/// The closed set of semantic types tracked by the binder and encoder.
///
/// `Untyped` is the domain of a quoted literal before it is coerced against
/// a target domain (§4.3 "Type resolution"); `Void` is the domain of a
/// binding with no useful value (e.g. a bare class reference used only for
/// navigation).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Domain {
    Boolean,
    Integer,
    Decimal,
    Float,
    String,
    Enum(Vec<SmolStr>),
    Date,
    Time,
    DateTime,
    Record(SmolStr),
    List(Box<Domain>),
    Untyped,
    Void,
}

impl Domain {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Domain::Integer | Domain::Decimal | Domain::Float)
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self, Domain::Untyped)
    }

    /// One rung up the numeric promotion chain `integer -> decimal -> float`
    /// (§4.3). Returns `None` once `self` is the top of the chain or isn't
    /// numeric.
    pub fn widen_numeric(&self) -> Option<Domain> {
        match self {
            Domain::Integer => Some(Domain::Decimal),
            Domain::Decimal => Some(Domain::Float),
            Domain::Float => None,
            _ => None,
        }
    }

    /// The most general domain of two numeric domains along the promotion
    /// chain, used by overload resolution when operand domains differ.
    pub fn numeric_join(a: &Domain, b: &Domain) -> Option<Domain> {
        fn rank(d: &Domain) -> Option<u8> {
            match d {
                Domain::Integer => Some(0),
                Domain::Decimal => Some(1),
                Domain::Float => Some(2),
                _ => None,
            }
        }
        let (ra, rb) = (rank(a)?, rank(b)?);
        Some(if ra >= rb { a.clone() } else { b.clone() })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Domain::Boolean => "boolean",
            Domain::Integer => "integer",
            Domain::Decimal => "decimal",
            Domain::Float => "float",
            Domain::String => "string",
            Domain::Enum(_) => "enum",
            Domain::Date => "date",
            Domain::Time => "time",
            Domain::DateTime => "datetime",
            Domain::Record(_) => "record",
            Domain::List(_) => "list",
            Domain::Untyped => "untyped",
            Domain::Void => "void",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
