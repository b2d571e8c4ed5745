//! # simplify.rs
//!
//! Bounded fixed-point rewriting of expression trees.
//!
//! Every pass rebuilds the tree bottom-up and applies the local rules below at
//! each node. Passes repeat until one leaves the tree unchanged or
//! [`MAX_PASSES`] is reached. The rules only ever shrink a tree or move it
//! towards a normal form (numeric coefficient first, constants on the right of
//! a sum, negative coefficients written as subtraction), so in practice the
//! loop settles after a handful of passes.

use crate::astnode::AstNode;
use crate::operators::{BinaryOperatorKind, UnaryOperatorKind};
use crate::parser::MAX_SAFE_LITERAL;

/// Upper bound on the number of rewrite passes.
pub const MAX_PASSES: usize = 64;

/// Upper bound on rules applied to a single node within one pass.
const LOCAL_REWRITES: usize = 16;

/// Simplifies `ast`, returning a new tree.
///
/// # Examples
/// ```
/// use exprsafe::{parse_expression, simplify_ast};
///
/// let ast = parse_expression("(x + 0) * 1 + x").unwrap();
/// assert_eq!(simplify_ast(&ast).to_string(), "2 * x");
/// ```
pub fn simplify(ast: &AstNode) -> AstNode {
    let mut current = ast.clone();
    for pass in 0..MAX_PASSES {
        let next = simplify_pass(&current);
        tracing::trace!(pass, complexity = next.complexity(), "simplification pass");
        if next == current {
            return next;
        }
        current = next;
    }
    tracing::warn!(passes = MAX_PASSES, "simplification stopped before reaching a fixed point");
    current
}

fn simplify_pass(node: &AstNode) -> AstNode {
    let mut node = match node {
        AstNode::Number(_) | AstNode::Variable(_) => return node.clone(),
        AstNode::UnaryOperator { kind, expr } => AstNode::unary(*kind, simplify_pass(expr)),
        AstNode::BinaryOperator { kind, left, right } => {
            AstNode::binary(*kind, simplify_pass(left), simplify_pass(right))
        }
        AstNode::FunctionCall { kind, args } => {
            AstNode::call(*kind, args.iter().map(simplify_pass).collect())
        }
        AstNode::UserFunctionCall { name, args } => AstNode::UserFunctionCall {
            name: name.clone(),
            args: args.iter().map(simplify_pass).collect(),
        },
    };

    for _ in 0..LOCAL_REWRITES {
        match rewrite(&node) {
            Some(next) => node = next,
            None => break,
        }
    }
    node
}

/// Applies the first matching rule at the root of `node`.
fn rewrite(node: &AstNode) -> Option<AstNode> {
    if let Some(folded) = fold(node) {
        return Some(folded);
    }
    match node {
        AstNode::UnaryOperator { kind, expr } => rewrite_unary(*kind, expr),
        AstNode::BinaryOperator { kind, left, right } => match kind {
            BinaryOperatorKind::Add => rewrite_add(left, right),
            BinaryOperatorKind::Sub => rewrite_sub(left, right),
            BinaryOperatorKind::Mul => rewrite_mul(left, right),
            BinaryOperatorKind::Div => rewrite_div(left, right),
            BinaryOperatorKind::Pow => rewrite_pow(left, right),
        },
        _ => None,
    }
}

/// A value the parser accepts back as a literal, with `-0` normalized to `0`.
fn literal(value: f64) -> Option<f64> {
    if !value.is_finite() || value.abs() > MAX_SAFE_LITERAL {
        return None;
    }
    Some(if value == 0.0 { 0.0 } else { value })
}

fn finite(value: f64) -> Option<AstNode> {
    literal(value).map(AstNode::Number)
}

/// Folds nodes whose operands are all numbers, with the evaluator's real
/// semantics. A fold that would fail is skipped.
fn fold(node: &AstNode) -> Option<AstNode> {
    match node {
        AstNode::UnaryOperator { kind, expr } => {
            let v = expr.as_number()?;
            finite(kind.apply(v))
        }
        AstNode::BinaryOperator { kind, left, right } => {
            let (l, r) = (left.as_number()?, right.as_number()?);
            kind.apply(l, r).ok().and_then(finite)
        }
        AstNode::FunctionCall { kind, args } => {
            let values = args.iter().map(AstNode::as_number).collect::<Option<Vec<f64>>>()?;
            kind.apply(&values).ok().and_then(finite)
        }
        _ => None,
    }
}

/// `k * base`, written as `base` or `-base` for a unit coefficient.
fn scaled(k: f64, base: AstNode) -> AstNode {
    if k == 1.0 {
        base
    } else if k == -1.0 {
        -base
    } else {
        AstNode::Number(k) * base
    }
}

/// Splits a term into its numeric coefficient and the rest.
fn split_term(node: &AstNode) -> (f64, AstNode) {
    match node {
        AstNode::BinaryOperator { kind: BinaryOperatorKind::Mul, left, right } => {
            match left.as_number() {
                Some(c) => (c, right.as_ref().clone()),
                None => (1.0, node.clone()),
            }
        }
        AstNode::UnaryOperator { kind: UnaryOperatorKind::Negative, expr } => {
            let (c, base) = split_term(expr);
            (-c, base)
        }
        _ => (1.0, node.clone()),
    }
}

/// Splits a factor into its base and numeric exponent.
fn split_power(node: &AstNode) -> (AstNode, f64) {
    if let AstNode::BinaryOperator { kind: BinaryOperatorKind::Pow, left, right } = node {
        if let Some(e) = right.as_number() {
            return (left.as_ref().clone(), e);
        }
    }
    (node.clone(), 1.0)
}

/// A `c * v` term with a negative coefficient, returned as `(|c|, v)`.
fn negative_term(node: &AstNode) -> Option<(f64, AstNode)> {
    if let AstNode::BinaryOperator { kind: BinaryOperatorKind::Mul, left, right } = node {
        let c = left.as_number()?;
        if c < 0.0 {
            return Some((-c, right.as_ref().clone()));
        }
    }
    None
}

fn rewrite_unary(kind: UnaryOperatorKind, expr: &AstNode) -> Option<AstNode> {
    match kind {
        UnaryOperatorKind::Positive => Some(expr.clone()),
        UnaryOperatorKind::Negative => match expr {
            AstNode::UnaryOperator { kind: UnaryOperatorKind::Negative, expr: inner } => {
                Some(inner.as_ref().clone())
            }
            AstNode::BinaryOperator { kind: BinaryOperatorKind::Mul, left, right } => {
                let c = left.as_number()?;
                Some(scaled(-c, right.as_ref().clone()))
            }
            _ => None,
        },
    }
}

fn rewrite_add(left: &AstNode, right: &AstNode) -> Option<AstNode> {
    if right.is_number(0.0) {
        return Some(left.clone());
    }
    if left.is_number(0.0) {
        return Some(right.clone());
    }
    if let AstNode::UnaryOperator { kind: UnaryOperatorKind::Negative, expr } = right {
        return Some(left.clone() - expr.as_ref().clone());
    }
    if let Some(c) = right.as_number() {
        if c < 0.0 {
            return Some(left.clone() - AstNode::Number(-c));
        }
        if let Some(chained) = chain_constant(left, c) {
            return Some(chained);
        }
    }
    if let Some((c, v)) = negative_term(right) {
        return Some(left.clone() - scaled(c, v));
    }
    if left.as_number().is_some() && right.as_number().is_none() {
        return Some(right.clone() + left.clone());
    }
    combine_like_terms(left, right, 1.0)
}

fn rewrite_sub(left: &AstNode, right: &AstNode) -> Option<AstNode> {
    if right.is_number(0.0) {
        return Some(left.clone());
    }
    if left.is_number(0.0) {
        return Some(-right.clone());
    }
    if let AstNode::UnaryOperator { kind: UnaryOperatorKind::Negative, expr } = right {
        return Some(left.clone() + expr.as_ref().clone());
    }
    if let Some(c) = right.as_number() {
        if c < 0.0 {
            return Some(left.clone() + AstNode::Number(-c));
        }
        if let Some(chained) = chain_constant(left, -c) {
            return Some(chained);
        }
    }
    if let Some((c, v)) = negative_term(right) {
        return Some(left.clone() + scaled(c, v));
    }
    combine_like_terms(left, right, -1.0)
}

/// `(x + c1) + c2` and `(x - c1) + c2` collapse into one constant.
/// `c` is the signed constant being added.
fn chain_constant(left: &AstNode, c: f64) -> Option<AstNode> {
    let AstNode::BinaryOperator { kind, left: inner, right: c1 } = left else {
        return None;
    };
    let c1 = c1.as_number()?;
    let total = match kind {
        BinaryOperatorKind::Add => c1 + c,
        BinaryOperatorKind::Sub => c - c1,
        _ => return None,
    };
    let total = finite(total)?;
    Some(inner.as_ref().clone() + total)
}

/// `a*x + b*x → (a+b)*x`, with `sign` selecting addition or subtraction.
/// Terms that would cancel to zero are left alone so no variable vanishes.
fn combine_like_terms(left: &AstNode, right: &AstNode, sign: f64) -> Option<AstNode> {
    if left.as_number().is_some() || right.as_number().is_some() {
        return None;
    }
    let (a, base_l) = split_term(left);
    let (b, base_r) = split_term(right);
    if base_l != base_r {
        return None;
    }
    let k = literal(a + sign * b)?;
    if k == 0.0 {
        return None;
    }
    Some(scaled(k, base_l))
}

fn rewrite_mul(left: &AstNode, right: &AstNode) -> Option<AstNode> {
    if left.is_number(0.0) || right.is_number(0.0) {
        return Some(AstNode::zero());
    }
    if right.is_number(1.0) {
        return Some(left.clone());
    }
    if left.is_number(1.0) {
        return Some(right.clone());
    }
    if left.is_number(-1.0) {
        return Some(-right.clone());
    }
    if left.as_number().is_none() && right.as_number().is_some() {
        return Some(right.clone() * left.clone());
    }

    if let AstNode::UnaryOperator { kind: UnaryOperatorKind::Negative, expr } = left {
        return Some(-(expr.as_ref().clone() * right.clone()));
    }
    if let AstNode::UnaryOperator { kind: UnaryOperatorKind::Negative, expr } = right {
        return Some(-(left.clone() * expr.as_ref().clone()));
    }

    // hoist numeric coefficients to the front
    if let AstNode::BinaryOperator { kind: BinaryOperatorKind::Mul, left: c, right: v } = right {
        if let Some(c) = c.as_number() {
            return Some(match left.as_number() {
                Some(c1) => scaled(literal(c1 * c)?, v.as_ref().clone()),
                None => AstNode::Number(c) * (left.clone() * v.as_ref().clone()),
            });
        }
    }
    if let AstNode::BinaryOperator { kind: BinaryOperatorKind::Mul, left: c, right: u } = left {
        if let (Some(c), None) = (c.as_number(), right.as_number()) {
            return Some(AstNode::Number(c) * (u.as_ref().clone() * right.clone()));
        }
    }

    if left.as_number().is_some() {
        return None;
    }
    // only non-negative integer exponents merge without changing where
    // the product is defined
    let (base_l, e1) = split_power(left);
    let (base_r, e2) = split_power(right);
    if base_l != base_r || base_l.as_number().is_some() {
        return None;
    }
    if !is_natural(e1) || !is_natural(e2) {
        return None;
    }
    let e = literal(e1 + e2)?;
    if e == 1.0 {
        return Some(base_l);
    }
    Some(base_l.pow(AstNode::Number(e)))
}

fn is_natural(e: f64) -> bool {
    e >= 0.0 && e.fract() == 0.0
}

fn rewrite_div(left: &AstNode, right: &AstNode) -> Option<AstNode> {
    right.is_number(1.0).then(|| left.clone())
}

fn rewrite_pow(left: &AstNode, right: &AstNode) -> Option<AstNode> {
    if right.is_number(1.0) {
        return Some(left.clone());
    }
    if right.is_number(0.0) {
        return Some(AstNode::one());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExprError;
    use crate::evaluator::{Context, evaluate};
    use crate::functions::buildin::FunctionKind;
    use crate::lexer::tokenize;
    use crate::limits::Limits;
    use crate::parser;

    fn parse(input: &str) -> AstNode {
        let limits = Limits::default();
        parser::parse(&tokenize(input, &limits).unwrap(), &limits).unwrap()
    }

    fn simplified(input: &str) -> AstNode {
        simplify(&parse(input))
    }

    fn x() -> AstNode {
        AstNode::variable("x")
    }

    #[test]
    fn test_constant_folding() {
        assert_eq!(simplified("2+3*4"), AstNode::Number(14.0));
        assert_eq!(simplified("-(2^2)"), AstNode::Number(-4.0));
        assert_eq!(simplified("max(1, 7, 3)"), AstNode::Number(7.0));
        assert_eq!(simplified("sqrt(16) + x"), x() + AstNode::Number(4.0));
    }

    #[test]
    fn test_failing_folds_are_skipped() {
        assert_eq!(simplified("1/0"), parse("1/0"));
        assert_eq!(
            simplified("sqrt(-1)"),
            AstNode::call1(FunctionKind::Sqrt, AstNode::Number(-1.0))
        );
        assert_eq!(simplified("10^400"), parse("10^400"));
    }

    #[test]
    fn test_identities() {
        for input in ["x+0", "0+x", "x-0", "x*1", "1*x", "x/1", "x^1", "+x", "--x"] {
            assert_eq!(simplified(input), x(), "{input}");
        }
        assert_eq!(simplified("x*0"), AstNode::zero());
        assert_eq!(simplified("0*sin(x)"), AstNode::zero());
        assert_eq!(simplified("x^0"), AstNode::one());
        // the exponent may still be undefined
        assert_eq!(simplified("1^x"), parse("1^x"));
        assert_eq!(simplified("0-x"), -x());
    }

    #[test]
    fn test_sign_rules() {
        let y = AstNode::variable("y");
        assert_eq!(simplified("x+(-y)"), x() - y.clone());
        assert_eq!(simplified("x-(-y)"), x() + y.clone());
        assert_eq!(simplified("x + -3"), x() - AstNode::Number(3.0));
        assert_eq!(simplified("x - -3"), x() + AstNode::Number(3.0));
        assert_eq!(simplified("-(2*x)"), AstNode::Number(-2.0) * x());
        assert_eq!(simplified("x * -y"), -(x() * y));
    }

    #[test]
    fn test_coefficients() {
        assert_eq!(simplified("x*3"), AstNode::Number(3.0) * x());
        assert_eq!(simplified("2*(3*x)"), AstNode::Number(6.0) * x());
        assert_eq!(simplified("-1*x"), -x());
        let y = AstNode::variable("y");
        assert_eq!(simplified("y*(2*x)"), AstNode::Number(2.0) * (y.clone() * x()));
        assert_eq!(simplified("(2*y)*x"), AstNode::Number(2.0) * (y * x()));
    }

    #[test]
    fn test_constant_chaining() {
        assert_eq!(simplified("(x+1)+2"), x() + AstNode::Number(3.0));
        assert_eq!(simplified("(x-1)+2"), x() + AstNode::Number(1.0));
        assert_eq!(simplified("(x+1)-3"), x() - AstNode::Number(2.0));
        assert_eq!(simplified("(x+1)-1"), x());
        assert_eq!(simplified("2+x"), x() + AstNode::Number(2.0));
    }

    #[test]
    fn test_like_terms() {
        assert_eq!(simplified("x+x"), AstNode::Number(2.0) * x());
        assert_eq!(simplified("2*x+3*x"), AstNode::Number(5.0) * x());
        assert_eq!(simplified("3*x-x"), AstNode::Number(2.0) * x());
        assert_eq!(simplified("x-2*x"), -x());
        // cancelling terms keep their variables
        assert_eq!(simplified("x-x"), x() - x());
        assert_eq!(simplified("x+y"), x() + AstNode::variable("y"));
    }

    #[test]
    fn test_same_base_powers() {
        let two = AstNode::Number(2.0);
        assert_eq!(simplified("x*x"), x().pow(two));
        assert_eq!(simplified("x^2*x^3"), x().pow(AstNode::Number(5.0)));
        assert_eq!(simplified("x^2*x"), x().pow(AstNode::Number(3.0)));
        assert_eq!(simplified("x*x^-1"), x() * x().pow(AstNode::Number(-1.0)));
    }

    #[test]
    fn test_powers_that_change_the_domain_stay_apart() {
        let ctx = |v: f64| Context::new().with_variable("x", v);
        for (input, at) in [("x^-1*x^2", 0.0), ("x^0.5*x^0.5", -1.0)] {
            let ast = parse(input);
            let reduced = simplify(&ast);
            assert_eq!(reduced, ast, "{input}");
            assert_eq!(
                evaluate(&reduced, &ctx(at)).unwrap_err().kind(),
                evaluate(&ast, &ctx(at)).unwrap_err().kind(),
                "{input}"
            );
        }
        assert_eq!(
            evaluate(&simplified("1^x"), &Context::new()),
            Err(ExprError::UndefinedVariable { name: "x".into() })
        );
    }

    #[test]
    fn test_folds_stay_within_literal_range() {
        let reduced = simplified("2^60 * x");
        assert_eq!(reduced, parse("2^60 * x"));
        assert_eq!(parse(&reduced.to_string()), reduced);

        let reduced = simplified("9007199254740991 * (9007199254740991 * x)");
        assert_eq!(parse(&reduced.to_string()), reduced);
        assert_eq!(simplified("2^52"), AstNode::Number(4_503_599_627_370_496.0));
        assert!(literal(MAX_SAFE_LITERAL).is_some());
        assert!(literal(MAX_SAFE_LITERAL + 1.0).is_none());
    }

    #[test]
    fn test_derivative_shapes() {
        // n*u^(n-1)*du for x^2
        let raw = AstNode::Number(2.0) * x().pow(AstNode::Number(1.0)) * AstNode::one();
        assert_eq!(simplify(&raw), AstNode::Number(2.0) * x());
        let raw = AstNode::call1(FunctionKind::Cos, x()) * AstNode::one();
        assert_eq!(simplify(&raw), AstNode::call1(FunctionKind::Cos, x()));
    }

    #[test]
    fn test_idempotent() {
        for input in [
            "x+x+x",
            "2*x*3*y - x",
            "sin(x)^2 + cos(x)^2",
            "(x+1)*(x-1) / (x^0 + 0)",
            "-(-(x*2))*-1 + 4 - 4",
            "x^y^2 * x",
        ] {
            let once = simplified(input);
            assert_eq!(simplify(&once), once, "{input}");
        }
    }

    #[test]
    fn test_user_function_arguments_are_simplified() {
        let node = AstNode::UserFunctionCall {
            name: "f".into(),
            args: vec![x() + AstNode::zero(), AstNode::Number(1.0) + AstNode::Number(2.0)],
        };
        assert_eq!(
            simplify(&node),
            AstNode::UserFunctionCall { name: "f".into(), args: vec![x(), AstNode::Number(3.0)] }
        );
    }
}
