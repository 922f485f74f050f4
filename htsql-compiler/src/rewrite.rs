use htsql_binder::LiteralValue;
use htsql_encoder::code::{aggregate_unit, cast_code, compound_unit, formula_code, literal_code};
use htsql_encoder::{Code, CodeKind, Segment, SegmentItem};

/// The rewrite stage (§9 design note): constant-folds literal arithmetic
/// before compilation. Aggregate bundling and filter lifting are not
/// separate rewrites here — they fall out of compiling a flow's own chain
/// directly, since the encoder already nests a sieve's predicate inside the
/// plural flow it filters.
pub fn rewrite_segment(segment: &Segment) -> Segment {
    Segment { flow: segment.flow.clone(), items: segment.items.iter().map(|(label, item)| (label.clone(), rewrite_item(item))).collect() }
}

fn rewrite_item(item: &SegmentItem) -> SegmentItem {
    match item {
        SegmentItem::Scalar(code) => SegmentItem::Scalar(fold_code(code)),
        SegmentItem::Nested(inner) => SegmentItem::Nested(rewrite_segment(inner)),
    }
}

pub fn fold_code(code: &Code) -> Code {
    match &**code {
        CodeKind::Cast { inner, target } => {
            let inner = fold_code(inner);
            match &*inner {
                CodeKind::Literal { value, .. } => literal_code(value.clone(), target.clone()),
                _ => cast_code(inner, target.clone()),
            }
        }
        CodeKind::Formula { signature, operands, domain } => {
            let folded: Vec<Code> = operands.iter().map(fold_code).collect();
            match fold_constant_formula(signature, &folded) {
                Some(value) => literal_code(value, domain.clone()),
                None => formula_code(signature.clone(), folded, domain.clone()),
            }
        }
        CodeKind::Compound { code: inner, flow } => compound_unit(fold_code(inner), flow.clone()),
        CodeKind::Aggregate { signature, operand, plural_flow, base_flow, domain } => {
            aggregate_unit(signature.clone(), fold_code(operand), plural_flow.clone(), base_flow.clone(), domain.clone())
        }
        _ => code.clone(),
    }
}

/// Folds a formula whose operands are all literals of a numeric domain.
/// Returns `None` for anything else, leaving the formula for the assembler
/// to emit as SQL.
fn fold_constant_formula(signature: &str, operands: &[Code]) -> Option<LiteralValue> {
    let values: Vec<f64> = operands
        .iter()
        .map(|code| match &**code {
            CodeKind::Literal { value, .. } => parse_numeric(value),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    let result = match (signature, values.as_slice()) {
        ("+", [a, b]) => a + b,
        ("-", [a, b]) => a - b,
        ("*", [a, b]) => a * b,
        ("/", [a, b]) if *b != 0.0 => a / b,
        ("-", [a]) => -a,
        _ => return None,
    };

    Some(format_numeric(result, operands))
}

fn parse_numeric(value: &LiteralValue) -> Option<f64> {
    match value {
        LiteralValue::Integer(s) | LiteralValue::Decimal(s) | LiteralValue::Float(s) => s.as_str().parse().ok(),
        LiteralValue::String(_) => None,
    }
}

/// Re-renders a folded numeric result in the most specific literal shape
/// its operands used (integer stays integer when the result is whole).
fn format_numeric(result: f64, operands: &[Code]) -> LiteralValue {
    let all_integer = operands.iter().all(|code| matches!(&**code, CodeKind::Literal { value: LiteralValue::Integer(_), .. }));
    if all_integer && result.fract() == 0.0 {
        LiteralValue::Integer(smol_str::SmolStr::new(format!("{}", result as i64)))
    } else {
        LiteralValue::Decimal(smol_str::SmolStr::new(format!("{result}")))
    }
}
