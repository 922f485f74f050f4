use htsql_ast::{BinaryOp, Domain, Span, UnaryOp};

use crate::binding::{Binding, BindingKind};
use crate::error::TypeError;

/// Coerces `binding` to `target`, wrapping it in a `Cast` when it arrived
/// untyped (§4.3 "Untyped quoted literals are coerced structurally").
/// Returns a `TypeError` when no coercion path exists.
pub fn coerce(binding: Binding, target: &Domain, span: Span) -> Result<Binding, TypeError> {
    if &binding.domain == target {
        return Ok(binding);
    }
    if binding.domain.is_untyped() {
        let plural = binding.plural;
        return Ok(Binding::new(
            BindingKind::Cast { inner: binding, target: target.clone() },
            target.clone(),
            plural,
            span,
        ));
    }
    if binding.domain.is_numeric() && target.is_numeric() {
        if let Some(joined) = Domain::numeric_join(&binding.domain, target) {
            if &joined == target {
                let plural = binding.plural;
                return Ok(Binding::new(
                    BindingKind::Cast { inner: binding, target: target.clone() },
                    target.clone(),
                    plural,
                    span,
                ));
            }
        }
    }
    Err(TypeError::no_overload("coerce", &[binding.domain.clone(), target.clone()], span))
}

/// Picks a common domain for two operands per §4.3's coercion chain:
/// identical domains match directly; otherwise numerics widen along
/// `integer -> decimal -> float`, and an untyped side adopts the other's
/// domain.
fn common_domain(a: &Domain, b: &Domain, op: &str, span: Span) -> Result<Domain, TypeError> {
    if a == b {
        return Ok(a.clone());
    }
    if a.is_untyped() && !b.is_untyped() {
        return Ok(b.clone());
    }
    if b.is_untyped() && !a.is_untyped() {
        return Ok(a.clone());
    }
    if a.is_untyped() && b.is_untyped() {
        return Ok(Domain::String);
    }
    if a.is_numeric() && b.is_numeric() {
        if let Some(joined) = Domain::numeric_join(a, b) {
            return Ok(joined);
        }
    }
    Err(TypeError::no_overload(op, &[a.clone(), b.clone()], span))
}

/// Resolves a binary operator (§4.3 "Type resolution") and returns the
/// result domain plus the (possibly coerced) operands.
pub fn resolve_binary(
    op: BinaryOp,
    left: Binding,
    right: Binding,
    span: Span,
) -> Result<(Domain, Binding, Binding), TypeError> {
    match op {
        BinaryOp::Or | BinaryOp::And => {
            let left = coerce(left, &Domain::Boolean, span)?;
            let right = coerce(right, &Domain::Boolean, span)?;
            Ok((Domain::Boolean, left, right))
        }
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Equal | BinaryOp::NotEqual => {
            let common = common_domain(&left.domain, &right.domain, "=", span)?;
            let left = coerce(left, &common, span)?;
            let right = coerce(right, &common, span)?;
            Ok((Domain::Boolean, left, right))
        }
        BinaryOp::Matches | BinaryOp::NotMatches => {
            let left = coerce(left, &Domain::String, span)?;
            let right = coerce(right, &Domain::String, span)?;
            Ok((Domain::Boolean, left, right))
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let common = common_domain(&left.domain, &right.domain, "<", span)?;
            let left = coerce(left, &common, span)?;
            let right = coerce(right, &common, span)?;
            Ok((Domain::Boolean, left, right))
        }
        BinaryOp::Add => {
            if matches!(left.domain, Domain::String) || matches!(right.domain, Domain::String) {
                let left = coerce(left, &Domain::String, span)?;
                let right = coerce(right, &Domain::String, span)?;
                return Ok((Domain::String, left, right));
            }
            let common = common_domain(&left.domain, &right.domain, "+", span)?;
            let left = coerce(left, &common, span)?;
            let right = coerce(right, &common, span)?;
            Ok((common, left, right))
        }
        BinaryOp::Sub | BinaryOp::Mul => {
            let common = common_domain(&left.domain, &right.domain, op_name(op), span)?;
            let left = coerce(left, &common, span)?;
            let right = coerce(right, &common, span)?;
            Ok((common, left, right))
        }
        BinaryOp::Div => {
            let common = common_domain(&left.domain, &right.domain, "/", span)?;
            // Integer division yields decimal (§4.3).
            let result = if matches!(common, Domain::Integer) { Domain::Decimal } else { common.clone() };
            let left = coerce(left, &result, span)?;
            let right = coerce(right, &result, span)?;
            Ok((result, left, right))
        }
    }
}

fn op_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        _ => "?",
    }
}

pub fn resolve_unary(op: UnaryOp, operand: Binding, span: Span) -> Result<(Domain, Binding), TypeError> {
    match op {
        UnaryOp::Not => {
            let operand = coerce(operand, &Domain::Boolean, span)?;
            Ok((Domain::Boolean, operand))
        }
        UnaryOp::Neg => {
            if !operand.domain.is_numeric() {
                return Err(TypeError::no_overload("-", &[operand.domain.clone()], span));
            }
            let domain = operand.domain.clone();
            Ok((domain, operand))
        }
    }
}

/// The aggregate functions named in §8's "Aggregate empty-set law". Each
/// takes a single plural argument and collapses it to a singular result.
pub fn aggregate_domain(name: &str, arg: &Domain) -> Option<Domain> {
    match name {
        "count" => Some(Domain::Integer),
        "exists" | "every" => Some(Domain::Boolean),
        "sum" => Some(if arg.is_numeric() { arg.clone() } else { Domain::Decimal }),
        "min" | "max" => Some(arg.clone()),
        "avg" => Some(match arg {
            Domain::Float => Domain::Float,
            _ => Domain::Decimal,
        }),
        _ => None,
    }
}

pub fn is_aggregate_name(name: &str) -> bool {
    matches!(name, "count" | "exists" | "every" | "sum" | "min" | "max" | "avg")
}
