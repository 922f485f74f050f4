use htsql_ast::{BinaryOp, Literal, SortDirection, Span, Syntax, UnaryOp};
use htsql_lexer::{Sym, Token, TokenKind};
use smol_str::SmolStr;

use crate::error::ParseError;

/// Recursive-descent over the precedence levels of §6, lowest precedence
/// outermost, one function per level except 2-5 (sort/sieve/projection/
/// selection), which share a single postfix loop — see
/// [`Parser::parse_postfix_chain`]. Each level calls the next until `atom`
/// bottoms out at a leaf.
pub struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .unwrap_or_else(|| self.tokens.last().unwrap())
    }

    fn bump(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn at_sym(&self, sym: Sym) -> bool {
        self.peek().is_symbol(sym)
    }

    fn eat_sym(&mut self, sym: Sym) -> bool {
        if self.at_sym(sym) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_sym(&mut self, sym: Sym, expected_desc: &str) -> PResult<Token> {
        if self.at_sym(sym) {
            Ok(self.bump())
        } else {
            Err(ParseError::unexpected(self.peek(), &[expected_desc]))
        }
    }

    fn expect_name(&mut self) -> PResult<(SmolStr, Span)> {
        if self.peek().kind == TokenKind::Name {
            let t = self.bump();
            Ok((t.raw, t.span))
        } else {
            Err(ParseError::unexpected(self.peek(), &["identifier"]))
        }
    }

    /// `/ expr [ /:ident ]`, the full entry point (§6).
    pub fn parse_query(&mut self) -> PResult<Syntax> {
        let open = self.expect_sym(Sym::Slash, "'/'")?;
        let expr = self.parse_infix_call()?;
        let mut format = None;
        let mut end_span = expr.span();
        if self.at_sym(Sym::Slash) && self.peek_at(1).is_symbol(Sym::Colon) {
            self.bump(); // '/'
            self.bump(); // ':'
            let (name, name_span) = self.expect_name()?;
            format = Some(name);
            end_span = name_span;
        }
        if self.peek().kind != TokenKind::End {
            return Err(ParseError::unexpected(self.peek(), &["end of input"]));
        }
        Ok(Syntax::Query {
            expr: Box::new(expr),
            format,
            span: open.span.to(end_span),
        })
    }

    /// Level 1 (lowest): infix function call `:name[(args)]`, left-assoc
    /// chain.
    fn parse_infix_call(&mut self) -> PResult<Syntax> {
        let mut base = self.parse_postfix_chain()?;
        while self.at_sym(Sym::Colon) {
            let colon = self.bump();
            let (name, _) = self.expect_name()?;
            let args = if self.eat_sym(Sym::LParen) {
                let mut args = Vec::new();
                if !self.at_sym(Sym::RParen) {
                    loop {
                        args.push(self.parse_infix_call()?);
                        if !self.eat_sym(Sym::Comma) {
                            break;
                        }
                    }
                }
                let close = self.expect_sym(Sym::RParen, "')'")?;
                base = Syntax::InfixCall {
                    base: Box::new(base),
                    name,
                    args,
                    span: colon.span.to(close.span),
                };
                continue;
            } else if self.can_start_atom() {
                vec![self.parse_postfix_chain()?]
            } else {
                Vec::new()
            };
            let span = colon.span.to(
                args.last()
                    .map(|a: &Syntax| a.span())
                    .unwrap_or(colon.span),
            );
            base = Syntax::InfixCall {
                base: Box::new(base),
                name,
                args,
                span,
            };
        }
        Ok(base)
    }

    /// Levels 2-5: postfix sort `+`/`-`, sieve `base?cond`, projection
    /// `base^kernel` and selection `base{items}`.
    ///
    /// These four decorate a base expression and, unlike the binary
    /// operators above and below them, chain strictly in textual left-to-
    /// right order rather than by nested containment: `a?b{c}` always means
    /// "select `c` from the sieve of `a` by `b`", and `a{c}?b` always means
    /// "sieve the selection of `a` by `b`" — whichever was written last
    /// wraps the result so far. A single loop here (instead of one
    /// recursive-descent level per decorator) is what makes that hold; the
    /// binder commutes a sieve/projection that ends up wrapping a selection
    /// back underneath it, since only a selection may be the outermost node
    /// of a flow expression (see DESIGN.md).
    ///
    /// `cond`/`kernel` are parsed one level up (`parse_or`, no postfix
    /// loop) so a trailing selection can't be swallowed into them; selection
    /// items are parsed at the full expression level so each item may carry
    /// its own sort decorator (`credits-`).
    fn parse_postfix_chain(&mut self) -> PResult<Syntax> {
        let mut base = self.parse_or()?;
        loop {
            if self.at_sym(Sym::Plus) || self.at_sym(Sym::Minus) {
                let direction = if self.at_sym(Sym::Plus) {
                    SortDirection::Ascending
                } else {
                    SortDirection::Descending
                };
                let tok = self.bump();
                let span = base.span().to(tok.span);
                base = Syntax::Sort {
                    base: Box::new(base),
                    direction,
                    span,
                };
            } else if self.at_sym(Sym::Question) {
                self.bump();
                let cond = self.parse_or()?;
                let span = base.span().to(cond.span());
                base = Syntax::Sieve {
                    base: Box::new(base),
                    condition: Box::new(cond),
                    span,
                };
            } else if self.at_sym(Sym::Caret) {
                self.bump();
                let kernel = self.parse_or()?;
                let span = base.span().to(kernel.span());
                base = Syntax::Projection {
                    base: Box::new(base),
                    kernel: Box::new(kernel),
                    span,
                };
            } else if self.at_sym(Sym::LBrace) {
                let open = self.bump();
                let mut items = Vec::new();
                if !self.at_sym(Sym::RBrace) {
                    loop {
                        items.push(self.parse_selection_item()?);
                        if !self.eat_sym(Sym::Comma) {
                            break;
                        }
                    }
                }
                let close = self.expect_sym(Sym::RBrace, "'}'")?;
                base = Syntax::Selection {
                    base: Box::new(base),
                    items,
                    span: open.span.to(close.span),
                };
            } else {
                break;
            }
        }
        Ok(base)
    }

    /// A selection item is either a bare expression or `name := expr`
    /// (§3 "assignment"; legal only here and in `define`/`where` argument
    /// lists, §4.3).
    fn parse_selection_item(&mut self) -> PResult<Syntax> {
        if self.peek().kind == TokenKind::Name && self.peek_at(1).is_symbol(Sym::Assign) {
            let (name, name_span) = self.expect_name()?;
            self.bump(); // ':='
            let value = self.parse_infix_call()?;
            let span = name_span.to(value.span());
            return Ok(Syntax::Assignment {
                name,
                value: Box::new(value),
                span,
            });
        }
        self.parse_infix_call()
    }

    /// Level 6 (first part): logical `|`, left-assoc.
    fn parse_or(&mut self) -> PResult<Syntax> {
        let mut left = self.parse_and()?;
        while self.eat_sym(Sym::Pipe) {
            let right = self.parse_and()?;
            let span = left.span().to(right.span());
            left = Syntax::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }
        Ok(left)
    }

    /// Level 6 (second part): logical `&`, left-assoc.
    fn parse_and(&mut self) -> PResult<Syntax> {
        let mut left = self.parse_not()?;
        while self.eat_sym(Sym::Amp) {
            let right = self.parse_not()?;
            let span = left.span().to(right.span());
            left = Syntax::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }
        Ok(left)
    }

    /// Level 6 (third part): prefix `!`.
    fn parse_not(&mut self) -> PResult<Syntax> {
        if self.at_sym(Sym::Bang) {
            let tok = self.bump();
            let operand = self.parse_not()?;
            let span = tok.span.to(operand.span());
            return Ok(Syntax::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
                span,
            });
        }
        self.parse_comparison()
    }

    /// Level 7: comparisons, non-associative.
    fn parse_comparison(&mut self) -> PResult<Syntax> {
        let left = self.parse_additive()?;
        let op = match self.peek().sym {
            Some(Sym::Eq) => BinaryOp::Eq,
            Some(Sym::Ne) => BinaryOp::Ne,
            Some(Sym::EqEq) => BinaryOp::Equal,
            Some(Sym::NeNe) => BinaryOp::NotEqual,
            Some(Sym::Tilde) => BinaryOp::Matches,
            Some(Sym::NotTilde) => BinaryOp::NotMatches,
            Some(Sym::Lt) => BinaryOp::Lt,
            Some(Sym::Le) => BinaryOp::Le,
            Some(Sym::Gt) => BinaryOp::Gt,
            Some(Sym::Ge) => BinaryOp::Ge,
            _ => return Ok(left),
        };
        self.bump();
        let right = self.parse_additive()?;
        let span = left.span().to(right.span());
        Ok(Syntax::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span,
        })
    }

    /// Level 8: additive `+`/`-`, left-assoc.
    fn parse_additive(&mut self) -> PResult<Syntax> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().sym {
                Some(Sym::Plus) => BinaryOp::Add,
                Some(Sym::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.bump();
            let right = self.parse_multiplicative()?;
            let span = left.span().to(right.span());
            left = Syntax::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }
        Ok(left)
    }

    /// Level 9: multiplicative `*`/`/`, left-assoc.
    fn parse_multiplicative(&mut self) -> PResult<Syntax> {
        let mut left = self.parse_unary_minus()?;
        loop {
            let op = match self.peek().sym {
                Some(Sym::Star) => BinaryOp::Mul,
                Some(Sym::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.bump();
            let right = self.parse_unary_minus()?;
            let span = left.span().to(right.span());
            left = Syntax::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }
        Ok(left)
    }

    /// Level 10: prefix `-`.
    fn parse_unary_minus(&mut self) -> PResult<Syntax> {
        if self.at_sym(Sym::Minus) {
            let tok = self.bump();
            let operand = self.parse_unary_minus()?;
            let span = tok.span.to(operand.span());
            return Ok(Syntax::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
                span,
            });
        }
        self.parse_link()
    }

    /// Level 11: linking `->`, non-associative.
    fn parse_link(&mut self) -> PResult<Syntax> {
        let base = self.parse_composition()?;
        if self.eat_sym(Sym::Arrow) {
            let (name, name_span) = self.expect_name()?;
            let span = base.span().to(name_span);
            return Ok(Syntax::Link {
                base: Box::new(base),
                class: name,
                span,
            });
        }
        Ok(base)
    }

    /// Level 13 (assignment at 12 is handled only in restricted positions,
    /// see `parse_selection_item`): composition `.`, left-assoc.
    fn parse_composition(&mut self) -> PResult<Syntax> {
        let mut left = self.parse_atom()?;
        while self.eat_sym(Sym::Dot) {
            let right = self.parse_atom()?;
            let span = left.span().to(right.span());
            left = Syntax::Composition {
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }
        Ok(left)
    }

    fn can_start_atom(&self) -> bool {
        let t = self.peek();
        matches!(t.kind, TokenKind::Name | TokenKind::Int | TokenKind::Decimal | TokenKind::Float | TokenKind::String)
            || t.is_symbol(Sym::LBrace)
            || t.is_symbol(Sym::LParen)
            || t.is_symbol(Sym::Star)
            || t.is_symbol(Sym::Caret)
            || t.is_symbol(Sym::Dollar)
            || t.is_symbol(Sym::Slash)
    }

    /// Level 14 (highest): atoms.
    fn parse_atom(&mut self) -> PResult<Syntax> {
        let t = self.peek().clone();
        match t.kind {
            TokenKind::Int => {
                self.bump();
                Ok(Syntax::Literal { value: Literal::Int(t.raw), span: t.span })
            }
            TokenKind::Decimal => {
                self.bump();
                Ok(Syntax::Literal { value: Literal::Decimal(t.raw), span: t.span })
            }
            TokenKind::Float => {
                self.bump();
                Ok(Syntax::Literal { value: Literal::Float(t.raw), span: t.span })
            }
            TokenKind::String => {
                self.bump();
                Ok(Syntax::Literal { value: Literal::String(t.raw), span: t.span })
            }
            TokenKind::Name => self.parse_name_atom(),
            TokenKind::Symbol => match t.sym {
                Some(Sym::Dollar) => self.parse_reference(),
                Some(Sym::Star) => self.parse_wildcard(),
                Some(Sym::Caret) => {
                    self.bump();
                    Ok(Syntax::Complement { span: t.span })
                }
                // A leading `/` inside an expression opens a nested segment
                // (a selection item that is itself a full flow expression,
                // e.g. `/school{code, /program{title}}`). Transparent
                // grouping: the inner expression is parsed exactly as if it
                // were the top-level query body, just without its own `/`
                // format decorator.
                Some(Sym::Slash) => {
                    self.bump();
                    let inner = self.parse_infix_call()?;
                    let span = t.span.to(inner.span());
                    Ok(Syntax::Group {
                        inner: Box::new(inner),
                        span,
                    })
                }
                Some(Sym::LParen) => {
                    self.bump();
                    let inner = self.parse_infix_call()?;
                    let close = self.expect_sym(Sym::RParen, "')'")?;
                    Ok(Syntax::Group {
                        inner: Box::new(inner),
                        span: t.span.to(close.span),
                    })
                }
                Some(Sym::LBrace) => {
                    self.bump();
                    let mut items = Vec::new();
                    if !self.at_sym(Sym::RBrace) {
                        loop {
                            items.push(self.parse_infix_call()?);
                            if !self.eat_sym(Sym::Comma) {
                                break;
                            }
                        }
                    }
                    let close = self.expect_sym(Sym::RBrace, "'}'")?;
                    Ok(Syntax::List { items, span: t.span.to(close.span) })
                }
                _ => Err(ParseError::unexpected(&t, &["expression"])),
            },
            TokenKind::End => Err(ParseError::unexpected(&t, &["expression"])),
        }
    }

    fn parse_reference(&mut self) -> PResult<Syntax> {
        let dollar = self.bump();
        if self.peek().kind != TokenKind::Name || !self.peek().is_adjacent_to(&dollar) {
            return Err(ParseError::unexpected(self.peek(), &["identifier after '$'"]));
        }
        let (name, name_span) = self.expect_name()?;
        Ok(Syntax::Reference {
            name,
            span: dollar.span.to(name_span),
        })
    }

    fn parse_wildcard(&mut self) -> PResult<Syntax> {
        let star = self.bump();
        if self.peek().kind == TokenKind::Int && self.peek().is_adjacent_to(&star) {
            let idx_tok = self.bump();
            let index: u32 = idx_tok
                .raw
                .parse()
                .map_err(|_| ParseError::unexpected(&idx_tok, &["selector index"]))?;
            return Ok(Syntax::Wildcard {
                index: Some(index),
                span: star.span.to(idx_tok.span),
            });
        }
        Ok(Syntax::Wildcard { index: None, span: star.span })
    }

    /// `name`, `name(args)` (prefix call).
    fn parse_name_atom(&mut self) -> PResult<Syntax> {
        let (name, span) = self.expect_name()?;
        if self.at_sym(Sym::LParen) {
            self.bump();
            let mut args = Vec::new();
            if !self.at_sym(Sym::RParen) {
                loop {
                    args.push(self.parse_infix_call()?);
                    if !self.eat_sym(Sym::Comma) {
                        break;
                    }
                }
            }
            let close = self.expect_sym(Sym::RParen, "')'")?;
            return Ok(Syntax::PrefixCall {
                name,
                args,
                span: span.to(close.span),
            });
        }
        Ok(Syntax::Identifier { name, span })
    }
}

/// Parses a complete HTSQL source string into a syntax tree.
pub fn parse(tokens: &[Token]) -> PResult<Syntax> {
    Parser::new(tokens).parse_query()
}

#[cfg(test)]
mod tests {
    use super::*;
    use htsql_lexer::scan;

    fn parse_str(src: &str) -> Syntax {
        let tokens = scan(src).expect("scan");
        parse(&tokens).unwrap_or_else(|e| panic!("parse failed for {src:?}: {}", e.message))
    }

    #[test]
    fn parses_plain_selection() {
        let tree = parse_str("/school{code, name}");
        match tree {
            Syntax::Query { expr, format, .. } => {
                assert!(format.is_none());
                match *expr {
                    Syntax::Selection { items, .. } => assert_eq!(items.len(), 2),
                    other => panic!("expected selection, got {other:?}"),
                }
            }
            other => panic!("expected query, got {other:?}"),
        }
    }

    #[test]
    fn parses_format_decorator() {
        let tree = parse_str("/school{code}/:json");
        match tree {
            Syntax::Query { format, .. } => assert_eq!(format.as_deref(), Some("json")),
            other => panic!("expected query, got {other:?}"),
        }
    }

    #[test]
    fn selection_wraps_trailing_sieve() {
        // `course?credits>3{title}` decorates left to right: sieve first,
        // then selection wraps the sieved flow, i.e.
        // `(course?credits>3){title}`.
        let tree = parse_str("/course?credits>3{title}");
        let Syntax::Query { expr, .. } = tree else { panic!() };
        match *expr {
            Syntax::Selection { base, .. } => match *base {
                Syntax::Sieve { .. } => {}
                other => panic!("expected sieve as selection base, got {other:?}"),
            },
            other => panic!("expected selection, got {other:?}"),
        }
    }

    #[test]
    fn composition_binds_tighter_than_sieve() {
        let tree = parse_str("/department{code, school.name}?school.campus='old'");
        let Syntax::Query { expr, .. } = tree else { panic!() };
        match *expr {
            Syntax::Sieve { base, condition, .. } => {
                assert!(matches!(*base, Syntax::Selection { .. }));
                assert!(matches!(*condition, Syntax::Binary { op: BinaryOp::Equal, .. }));
            }
            other => panic!("expected sieve, got {other:?}"),
        }
    }

    #[test]
    fn descending_sort_decorator() {
        let tree = parse_str("/course?credits>3{title, credits-}");
        let Syntax::Query { expr, .. } = tree else { panic!() };
        let Syntax::Selection { base, items, .. } = *expr else { panic!() };
        assert!(matches!(*base, Syntax::Sieve { .. }));
        match &items[1] {
            Syntax::Sort { direction, .. } => assert_eq!(*direction, SortDirection::Descending),
            other => panic!("expected sort, got {other:?}"),
        }
    }

    #[test]
    fn nested_selection_segment() {
        let tree = parse_str("/school{code, /program{title}}");
        let Syntax::Query { expr, .. } = tree else { panic!() };
        let Syntax::Selection { items, .. } = *expr else { panic!() };
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn reference_and_infix_call() {
        let tree = parse_str("/school{code}:as(title)");
        let Syntax::Query { expr, .. } = tree else { panic!() };
        match *expr {
            Syntax::InfixCall { name, .. } => assert_eq!(name.as_str(), "as"),
            other => panic!("expected infix call, got {other:?}"),
        }
    }

    #[test]
    fn projection_with_complement() {
        let tree = parse_str("/school^campus{campus, count(school)}");
        let Syntax::Query { expr, .. } = tree else { panic!() };
        let Syntax::Selection { base, .. } = *expr else { panic!() };
        assert!(matches!(*base, Syntax::Projection { .. }));
    }

    #[test]
    fn unexpected_token_reports_position() {
        let tokens = scan("/school{").unwrap();
        let err = parse(&tokens).unwrap_err();
        assert!(err.span.start >= 8);
    }
}
