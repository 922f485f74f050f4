use htsql_ast::{Domain, Literal, Span, Syntax};
use htsql_catalog::{naming::normalize_name, ArrowKind, ArrowTarget, ClassId, ModelGraph};
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::binding::{Binding, BindingKind, LiteralValue, SelectionItem};
use crate::error::{BindError, BinderError, LinkError, PluralityError};
use crate::formula;
use crate::scope::{ScopeKind, Scopes};

/// A fully bound query: the binding tree plus its optional format
/// decorator.
pub struct BoundQuery {
    pub binding: Binding,
    pub format: Option<SmolStr>,
}

/// The binder (§4.3): walks a syntax tree depth-first against a
/// [`ModelGraph`], producing a binding tree with resolved scopes, names,
/// and domains.
pub struct Binder<'g> {
    graph: &'g ModelGraph,
}

impl<'g> Binder<'g> {
    pub fn new(graph: &'g ModelGraph) -> Self {
        Self { graph }
    }

    pub fn bind_query(&self, syntax: &Syntax) -> Result<BoundQuery, BinderError> {
        let Syntax::Query { expr, format, .. } = syntax else {
            return Err(BindError::scope_mismatch("expected a query", syntax.span()).into());
        };
        let mut scopes = Scopes::new(self.graph);
        let binding = self.bind(expr, &mut scopes)?;
        Ok(BoundQuery { binding, format: format.clone() })
    }

    fn bind(&self, syntax: &Syntax, scopes: &mut Scopes) -> Result<Binding, BinderError> {
        match syntax {
            Syntax::Literal { value, span } => Ok(self.bind_literal(value, *span)),
            Syntax::Identifier { name, span } => self.resolve_identifier(name, scopes, *span),
            Syntax::Reference { name, span } => scopes
                .lookup_reference(name)
                .cloned()
                .ok_or_else(|| BindError::unresolved_name(name, &["reference"], *span).into()),
            Syntax::Wildcard { index, span } => self.bind_wildcard(*index, scopes, *span),
            Syntax::Complement { span } => self.bind_complement(scopes, *span),
            Syntax::Group { inner, .. } => self.bind(inner, scopes),
            Syntax::List { items, span } => self.bind_list(items, scopes, *span),
            Syntax::Selection { base, items, span } => self.bind_selection(base, items, scopes, *span),
            Syntax::Sieve { base, condition, span } => self.bind_sieve(base, condition, scopes, *span),
            Syntax::Projection { base, kernel, span } => self.bind_projection(base, kernel, scopes, *span),
            Syntax::Composition { left, right, .. } => self.bind_composition(left, right, scopes),
            Syntax::Link { base, class, span } => self.bind_link(base, class, scopes, *span),
            Syntax::Assignment { name, value, span } => self.bind_assignment(name, value, scopes, *span),
            Syntax::InfixCall { base, name, args, span } => self.bind_infix_call(base, name, args, scopes, *span),
            Syntax::PrefixCall { name, args, span } => self.bind_prefix_call(name, args, scopes, *span),
            Syntax::Binary { op, left, right, span } => {
                let left = self.bind(left, scopes)?;
                let right = self.bind(right, scopes)?;
                let (domain, left, right) = formula::resolve_binary(*op, left, right, *span)?;
                let plural = left.plural || right.plural;
                Ok(Binding::new(
                    BindingKind::Formula { name: SmolStr::new(binary_op_name(*op)), args: vec![left, right] },
                    domain,
                    plural,
                    *span,
                ))
            }
            Syntax::Unary { op, operand, span } => {
                let operand = self.bind(operand, scopes)?;
                let (domain, operand) = formula::resolve_unary(*op, operand, *span)?;
                let plural = operand.plural;
                Ok(Binding::new(
                    BindingKind::Formula { name: SmolStr::new(unary_op_name(*op)), args: vec![operand] },
                    domain,
                    plural,
                    *span,
                ))
            }
            Syntax::Sort { base, direction, span } => {
                let base = self.bind(base, scopes)?;
                let domain = base.domain.clone();
                let plural = base.plural;
                Ok(Binding::new(BindingKind::Sort { base, direction: *direction }, domain, plural, *span))
            }
            Syntax::Query { .. } => Err(BindError::scope_mismatch("nested query is not an expression", syntax.span()).into()),
        }
    }

    fn bind_literal(&self, value: &Literal, span: Span) -> Binding {
        match value {
            Literal::Int(raw) => {
                Binding::new(BindingKind::Literal { value: LiteralValue::Integer(raw.clone()) }, Domain::Integer, false, span)
            }
            Literal::Decimal(raw) => {
                Binding::new(BindingKind::Literal { value: LiteralValue::Decimal(raw.clone()) }, Domain::Decimal, false, span)
            }
            Literal::Float(raw) => {
                Binding::new(BindingKind::Literal { value: LiteralValue::Float(raw.clone()) }, Domain::Float, false, span)
            }
            Literal::String(raw) => {
                Binding::new(BindingKind::Literal { value: LiteralValue::String(raw.clone()) }, Domain::Untyped, false, span)
            }
        }
    }

    fn bind_list(&self, items: &[Syntax], scopes: &mut Scopes, span: Span) -> Result<Binding, BinderError> {
        let mut bound = Vec::with_capacity(items.len());
        for item in items {
            bound.push(self.bind(item, scopes)?);
        }
        let domain = bound.first().map(|b| b.domain.clone()).unwrap_or(Domain::Void);
        let plural = bound.iter().any(|b| b.plural);
        Ok(Binding::new(BindingKind::List { items: bound }, Domain::List(Box::new(domain)), plural, span))
    }

    /// Pushes the scope a sieve/projection/selection's body should be bound
    /// in, given the already-bound `base` (§4.3 "evaluate their body... in
    /// the base's class scope").
    fn push_scope_for(&self, base: &Binding, scopes: &mut Scopes, span: Span) -> Result<(), BinderError> {
        if let BindingKind::Quotient { base_class, kernel, .. } = &*base.kind {
            let complement_name = scopes.graph().class(*base_class).name.clone();
            let kernel_map: IndexMap<SmolStr, Binding> = kernel.iter().cloned().collect();
            scopes.push_projection(*base_class, base.clone(), kernel_map, complement_name);
            return Ok(());
        }
        match flow_class(base) {
            Some(class) => {
                scopes.push_class(class, base.clone());
                Ok(())
            }
            None => Err(LinkError::unreachable("<flow>", span).into()),
        }
    }

    fn bind_selection(&self, base: &Syntax, items: &[Syntax], scopes: &mut Scopes, span: Span) -> Result<Binding, BinderError> {
        let base_binding = self.bind(base, scopes)?;
        self.push_scope_for(&anchor(&base_binding), scopes, span)?;
        let mut bound_items = Vec::with_capacity(items.len());
        let result = (|| {
            for item in items {
                bound_items.push(self.bind_selection_item(item, scopes)?);
            }
            Ok(())
        })();
        scopes.pop();
        result?;
        let plural = base_binding.plural;
        let domain = Domain::Record(SmolStr::new(format!("selection@{}", span.start)));
        Ok(Binding::new(BindingKind::Selection { base: base_binding, items: bound_items }, domain, plural, span))
    }

    fn bind_selection_item(&self, item: &Syntax, scopes: &mut Scopes) -> Result<SelectionItem, BinderError> {
        let item = match item {
            Syntax::Assignment { name, value, .. } => {
                let value = self.bind(value, scopes)?;
                scopes.define(name, value.clone());
                scopes.capture_reference(name, value.clone());
                SelectionItem { label: name.clone(), value }
            }
            Syntax::InfixCall { base, name, args, .. } if name.as_str() == "as" && args.len() == 1 => {
                let value = self.bind(base, scopes)?;
                let label = match &args[0] {
                    Syntax::Identifier { name, .. } => name.clone(),
                    other => return Err(BindError::scope_mismatch("':as' expects an identifier", other.span()).into()),
                };
                SelectionItem { label, value }
            }
            other => {
                let value = self.bind(other, scopes)?;
                SelectionItem { label: derive_label(other), value }
            }
        };
        self.require_singular(&item.value)?;
        Ok(item)
    }

    /// §4.3: a scalar item or sieve condition must resolve to a single value
    /// per row of its enclosing scope. A nested segment binds its own rows
    /// (it is not narrowed into the enclosing row at all) so it is exempt;
    /// an aggregate already collapses to one value per group at
    /// construction, so a plural argument under it never reaches here.
    fn require_singular(&self, value: &Binding) -> Result<(), BinderError> {
        if value.plural && !matches!(&*value.kind, BindingKind::Selection { .. }) {
            return Err(PluralityError::plural_in_singular_position(value.span).into());
        }
        Ok(())
    }

    fn bind_sieve(&self, base: &Syntax, condition: &Syntax, scopes: &mut Scopes, span: Span) -> Result<Binding, BinderError> {
        let base_binding = self.bind(base, scopes)?;
        self.sieve_onto(base_binding, condition, scopes, span)
    }

    /// `a{c}?b` parses with the sieve wrapping the selection, but only a
    /// selection may be the outermost node of a flow expression — so the
    /// sieve is pushed underneath any selection layers here instead.
    /// Filtering commutes with choosing columns (it doesn't change which
    /// rows survive), so `a{c}?b` and `a?b{c}` bind to the same rows; the
    /// condition is resolved in the innermost non-selection base's scope
    /// either way.
    fn sieve_onto(&self, base_binding: Binding, condition: &Syntax, scopes: &mut Scopes, span: Span) -> Result<Binding, BinderError> {
        match *base_binding.kind {
            BindingKind::Selection { base: inner_base, items } => {
                let outer_domain = base_binding.domain;
                let sieved = self.sieve_onto(inner_base, condition, scopes, span)?;
                let plural = sieved.plural;
                Ok(Binding::new(BindingKind::Selection { base: sieved, items }, outer_domain, plural, span))
            }
            other_kind => {
                let base_binding =
                    Binding { kind: Box::new(other_kind), domain: base_binding.domain, plural: base_binding.plural, span: base_binding.span };
                self.push_scope_for(&anchor(&base_binding), scopes, span)?;
                let condition_result = self.bind(condition, scopes);
                scopes.pop();
                let condition = condition_result?;
                let condition = formula::coerce(condition, &Domain::Boolean, span)?;
                self.require_singular(&condition)?;
                let domain = base_binding.domain.clone();
                let plural = base_binding.plural;
                Ok(Binding::new(BindingKind::Sieve { base: base_binding, condition }, domain, plural, span))
            }
        }
    }

    fn bind_projection(&self, base: &Syntax, kernel: &Syntax, scopes: &mut Scopes, span: Span) -> Result<Binding, BinderError> {
        let base_binding = self.bind(base, scopes)?;
        self.projection_onto(base_binding, kernel, scopes, span)
    }

    /// The same commuting rule as [`Self::sieve_onto`], for `a{c}^k`.
    fn projection_onto(&self, base_binding: Binding, kernel: &Syntax, scopes: &mut Scopes, span: Span) -> Result<Binding, BinderError> {
        match *base_binding.kind {
            BindingKind::Selection { base: inner_base, items } => {
                let quotient = self.projection_onto(inner_base, kernel, scopes, span)?;
                let domain = Domain::Record(SmolStr::new(format!("selection@{}", span.start)));
                let plural = quotient.plural;
                Ok(Binding::new(BindingKind::Selection { base: quotient, items }, domain, plural, span))
            }
            other_kind => {
                let base_binding =
                    Binding { kind: Box::new(other_kind), domain: base_binding.domain, plural: base_binding.plural, span: base_binding.span };
                let Some(base_class) = flow_class(&base_binding) else {
                    return Err(LinkError::unreachable("^ base", span).into());
                };
                scopes.push_class(base_class, anchor(&base_binding));
                let kernel_result = self.bind_kernel(kernel, scopes);
                scopes.pop();
                let kernel_bindings = kernel_result?;
                if kernel_bindings.is_empty() {
                    return Err(LinkError::no_kernel(span).into());
                }
                let domain = Domain::Record(SmolStr::new(format!("quotient@{}", span.start)));
                Ok(Binding::new(BindingKind::Quotient { base: base_binding, base_class, kernel: kernel_bindings }, domain, true, span))
            }
        }
    }

    fn bind_kernel(&self, kernel: &Syntax, scopes: &mut Scopes) -> Result<Vec<(SmolStr, Binding)>, BinderError> {
        if let Syntax::List { items, .. } = kernel {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let value = self.bind(item, scopes)?;
                out.push((normalize_name(&derive_label(item)), value));
            }
            Ok(out)
        } else {
            let value = self.bind(kernel, scopes)?;
            Ok(vec![(normalize_name(&derive_label(kernel)), value)])
        }
    }

    fn bind_composition(&self, left: &Syntax, right: &Syntax, scopes: &mut Scopes) -> Result<Binding, BinderError> {
        let left_binding = self.bind(left, scopes)?;
        self.push_scope_for(&left_binding, scopes, left.span())?;
        let result = self.bind(right, scopes);
        scopes.pop();
        result
    }

    fn bind_link(&self, base: &Syntax, class_name: &str, scopes: &mut Scopes, span: Span) -> Result<Binding, BinderError> {
        let base_binding = self.bind(base, scopes)?;
        let Some(origin_class) = flow_class(&base_binding) else {
            return Err(LinkError::unreachable(class_name, span).into());
        };
        let origin_name = scopes.graph().class(origin_class).name.clone();
        let needle = normalize_name(class_name);
        let candidates: Vec<_> = scopes
            .graph()
            .arrows_from(origin_class)
            .filter(|a| matches!(&a.target, ArrowTarget::Class(c) if scopes.graph().class(*c).name == needle))
            .cloned()
            .collect();
        let chosen = match candidates.len() {
            0 => return Err(LinkError::unreachable(class_name, span).into()),
            1 => candidates.into_iter().next().unwrap(),
            _ => candidates
                .into_iter()
                .find(|a| matches!(a.kind, ArrowKind::DirectForeignKey { .. }))
                .ok_or_else(|| LinkError::ambiguous(&origin_name, class_name, span))?,
        };
        let target = match chosen.target {
            ArrowTarget::Class(c) => c,
            ArrowTarget::Domain(_) => unreachable!("filtered to class-targeted arrows above"),
        };
        let domain = Domain::Record(scopes.graph().class(target).name.clone());
        let plural = base_binding.plural || !chosen.singular;
        Ok(Binding::new(
            BindingKind::Link { base: base_binding, arrow_name: chosen.name, target },
            domain,
            plural,
            span,
        ))
    }

    fn bind_assignment(&self, name: &str, value: &Syntax, scopes: &mut Scopes, span: Span) -> Result<Binding, BinderError> {
        let value = self.bind(value, scopes)?;
        scopes.define(name, value.clone());
        scopes.capture_reference(name, value.clone());
        let domain = value.domain.clone();
        let plural = value.plural;
        Ok(Binding::new(BindingKind::Assignment { name: SmolStr::new(name), value }, domain, plural, span))
    }

    fn bind_prefix_call(&self, name: &str, args: &[Syntax], scopes: &mut Scopes, span: Span) -> Result<Binding, BinderError> {
        if formula::is_aggregate_name(name) {
            if args.len() != 1 {
                return Err(BindError::wrong_arity(name, 1, args.len(), span).into());
            }
            let arg = self.bind(&args[0], scopes)?;
            let domain = formula::aggregate_domain(name, &arg.domain)
                .ok_or_else(|| BindError::unresolved_name(name, &["function"], span))?;
            return Ok(Binding::new(BindingKind::Formula { name: SmolStr::new(name), args: vec![arg] }, domain, false, span));
        }
        Err(BindError::unresolved_name(name, &["function"], span).into())
    }

    fn bind_infix_call(
        &self,
        base: &Syntax,
        name: &str,
        _args: &[Syntax],
        scopes: &mut Scopes,
        span: Span,
    ) -> Result<Binding, BinderError> {
        let base_binding = self.bind(base, scopes)?;
        if name == "as" {
            return Ok(base_binding);
        }
        if formula::is_aggregate_name(name) {
            let domain = formula::aggregate_domain(name, &base_binding.domain)
                .ok_or_else(|| BindError::unresolved_name(name, &["function"], span))?;
            return Ok(Binding::new(BindingKind::Formula { name: SmolStr::new(name), args: vec![base_binding] }, domain, false, span));
        }
        Err(BindError::unresolved_name(name, &["function"], span).into())
    }

    fn bind_wildcard(&self, index: Option<u32>, scopes: &mut Scopes, span: Span) -> Result<Binding, BinderError> {
        let class = match &scopes.current().kind {
            ScopeKind::Class { class } => *class,
            _ => return Err(LinkError::unreachable("*", span).into()),
        };
        let current = scopes.current().current.clone().expect("class scope always has current");
        let attributes: Vec<_> = scopes
            .graph()
            .arrows_from(class)
            .filter(|a| matches!(a.kind, ArrowKind::Attribute { .. }))
            .cloned()
            .collect();
        let selected: Vec<_> = match index {
            Some(n) if n >= 1 => attributes.into_iter().skip(n as usize - 1).take(1).collect(),
            _ => attributes,
        };
        let items = selected
            .into_iter()
            .map(|arrow| {
                let ArrowTarget::Domain(domain) = &arrow.target else { unreachable!() };
                SelectionItem {
                    label: arrow.name.clone(),
                    value: Binding::new(
                        BindingKind::Attribute { base: current.clone(), arrow_name: arrow.name.clone() },
                        domain.clone(),
                        current.plural,
                        span,
                    ),
                }
            })
            .collect();
        let domain = Domain::Record(SmolStr::new(format!("wildcard@{}", span.start)));
        Ok(Binding::new(BindingKind::Selection { base: current.clone(), items }, domain, current.plural, span))
    }

    fn bind_complement(&self, scopes: &mut Scopes, span: Span) -> Result<Binding, BinderError> {
        let base_class = match &scopes.current().kind {
            ScopeKind::Projection { base_class, .. } => *base_class,
            _ => return Err(LinkError::unreachable("^", span).into()),
        };
        let quotient = scopes.current().current.clone().expect("projection scope always has current");
        let domain = Domain::Record(scopes.graph().class(base_class).name.clone());
        Ok(Binding::new(BindingKind::Complement { quotient }, domain, true, span))
    }

    /// Resolves `source` (a stored override expression, user global or
    /// calculated field) within the current scope stack, so calculated
    /// fields see their own table's attributes and globals see the root
    /// scope. Used lazily since the catalog carries only unparsed text.
    fn bind_named_expr(&self, name: &str, source: &str, scopes: &mut Scopes, span: Span) -> Result<Binding, BinderError> {
        let parsed = htsql_parser::parse_source(source)?;
        let Syntax::Query { expr, .. } = parsed else {
            unreachable!("parse_source always returns a Query")
        };
        let mut value = self.bind(&expr, scopes)?;
        value.span = span;
        let domain = value.domain.clone();
        let plural = value.plural;
        Ok(Binding::new(BindingKind::Reference { name: SmolStr::new(name), value }, domain, plural, span))
    }

    fn resolve_identifier(&self, name: &str, scopes: &mut Scopes, span: Span) -> Result<Binding, BinderError> {
        if let Some(b) = scopes.lookup_define(name) {
            return Ok(b.clone());
        }
        enum Kind {
            Root,
            Class(ClassId),
            Projection(IndexMap<SmolStr, Binding>, SmolStr, ClassId),
        }
        let kind = match &scopes.current().kind {
            ScopeKind::Root => Kind::Root,
            ScopeKind::Class { class } => Kind::Class(*class),
            ScopeKind::Projection { kernel, complement_name, base_class } => {
                Kind::Projection(kernel.clone(), complement_name.clone(), *base_class)
            }
        };
        match kind {
            Kind::Root => {
                if let Some(class) = scopes.graph().class_named(name) {
                    return Ok(Binding::new(
                        BindingKind::Table { class: class.id },
                        Domain::Record(class.name.clone()),
                        true,
                        span,
                    ));
                }
                if let Some(source) = scopes.graph().globals.get(&normalize_name(name)).cloned() {
                    return self.bind_named_expr(name, &source, scopes, span);
                }
                Err(BindError::unresolved_name(name, &scopes.scope_trail(), span).into())
            }
            Kind::Class(class) => {
                let current = scopes.current().current.clone().expect("class scope always has current");
                if let Some(arrow) = scopes.graph().arrow_named(class, name).cloned() {
                    if let ArrowKind::Calculated { source } = &arrow.kind {
                        return self.bind_named_expr(name, source, scopes, span);
                    }
                    let plural = current.plural || !arrow.singular;
                    return Ok(match &arrow.target {
                        ArrowTarget::Domain(d) => Binding::new(
                            BindingKind::Attribute { base: current, arrow_name: arrow.name.clone() },
                            d.clone(),
                            plural,
                            span,
                        ),
                        ArrowTarget::Class(target) => {
                            let target = *target;
                            Binding::new(
                                BindingKind::Link { base: current, arrow_name: arrow.name.clone(), target },
                                Domain::Record(scopes.graph().class(target).name.clone()),
                                plural,
                                span,
                            )
                        }
                    });
                }
                Err(BindError::unresolved_name(name, &scopes.scope_trail(), span).into())
            }
            Kind::Projection(kernel, complement_name, base_class) => {
                let needle = normalize_name(name);
                if let Some(k) = kernel.get(&needle) {
                    return Ok(k.clone());
                }
                if needle == complement_name {
                    let quotient = scopes.current().current.clone().expect("projection scope always has current");
                    return Ok(Binding::new(
                        BindingKind::Complement { quotient },
                        Domain::Record(scopes.graph().class(base_class).name.clone()),
                        true,
                        span,
                    ));
                }
                Err(BindError::unresolved_name(name, &scopes.scope_trail(), span).into())
            }
        }
    }
}

/// A binding used to anchor a newly-opened scope's body is singular
/// relative to that scope, however plural it was relative to whatever
/// scope it was reached from — "many schools" doesn't make each school's
/// own `code` plural. Dotted composition (`department.code`) is the one
/// place that taint must still carry forward, so this is applied only at
/// the three call sites that open a fresh body (selection items, a sieve
/// condition, a projection kernel), never at [`Binder::bind_composition`].
fn anchor(base: &Binding) -> Binding {
    Binding { plural: false, ..base.clone() }
}

/// Peels sort/assignment/reference/sieve decorators to find the class a
/// binding's flow currently ranges over, if any (quotients are handled
/// separately since they open a projection scope, not a class scope).
fn flow_class(binding: &Binding) -> Option<ClassId> {
    match &*binding.kind {
        BindingKind::Table { class } => Some(*class),
        BindingKind::Link { target, .. } => Some(*target),
        BindingKind::Sieve { base, .. } => flow_class(base),
        BindingKind::Sort { base, .. } => flow_class(base),
        BindingKind::Assignment { value, .. } => flow_class(value),
        BindingKind::Reference { value, .. } => flow_class(value),
        _ => None,
    }
}

fn derive_label(syntax: &Syntax) -> SmolStr {
    match syntax {
        Syntax::Identifier { name, .. } => name.clone(),
        Syntax::Sort { base, .. } => derive_label(base),
        Syntax::PrefixCall { name, .. } => name.clone(),
        Syntax::InfixCall { name, .. } => name.clone(),
        Syntax::Composition { right, .. } => derive_label(right),
        Syntax::Group { inner, .. } => derive_label(inner),
        // A nested segment (`/program{title}`) has no identifier of its own
        // at the item position; it takes the name of the class it selects
        // from, same as a bare link would.
        Syntax::Selection { base, .. } => derive_label(base),
        Syntax::Sieve { base, .. } => derive_label(base),
        Syntax::Wildcard { .. } => SmolStr::new("*"),
        _ => SmolStr::new("value"),
    }
}

fn binary_op_name(op: htsql_ast::BinaryOp) -> &'static str {
    use htsql_ast::BinaryOp::*;
    match op {
        Or => "or",
        And => "and",
        Eq => "eq",
        Ne => "ne",
        Equal => "equal",
        NotEqual => "not_equal",
        Matches => "matches",
        NotMatches => "not_matches",
        Lt => "lt",
        Le => "le",
        Gt => "gt",
        Ge => "ge",
        Add => "add",
        Sub => "sub",
        Mul => "mul",
        Div => "div",
    }
}

fn unary_op_name(op: htsql_ast::UnaryOp) -> &'static str {
    match op {
        htsql_ast::UnaryOp::Not => "not",
        htsql_ast::UnaryOp::Neg => "neg",
    }
}
