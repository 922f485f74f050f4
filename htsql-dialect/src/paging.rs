/// How a dialect expresses `LIMIT`/`OFFSET` (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingStyle {
    /// `LIMIT n OFFSET m` (pgsql, sqlite, mysql).
    LimitOffset,
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY` (mssql).
    FetchFirst,
    /// No native paging clause: wrap in `ROW_NUMBER() OVER (...)` and filter
    /// in an outer query (oracle, for releases predating `FETCH FIRST`).
    RowNumber,
}

/// How a dialect concatenates strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatStyle {
    /// The `||` operator (pgsql, sqlite, oracle).
    Operator,
    /// The `CONCAT(...)` function (mysql, mssql).
    Function,
}

/// How `LIKE` compares case, and what keyword (if any) selects the other
/// case sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeCasing {
    /// `LIKE` is case-sensitive; case-insensitive match needs `ILIKE`.
    SensitiveWithIlike,
    /// `LIKE` is case-insensitive by default (collation-dependent); no
    /// separate keyword exists.
    InsensitiveByDefault,
    /// `LIKE` is case-sensitive with no case-insensitive variant; emulate
    /// with `UPPER(...)`/`LOWER(...)` wrapping.
    SensitiveNoIlike,
}
