//! Evaluation of an [`Expr`] at a point.
//!
//! Evaluation never panics and never returns a non-finite number: every
//! mathematically invalid result is reported as [`Undefined`].

use std::fmt;

use super::ast::{BinaryOp, Expr, Predicate, UnaryOp};

/// Why an expression has no value at a given `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Undefined {
    /// Argument outside a function's domain, e.g. `asin(2)`.
    Domain,
    DivisionByZero,
    EvenRootOfNegative,
    /// Non-integer power of a negative base.
    FractionalPowerOfNegative,
    LogOfNonPositive,
    /// Overflow, NaN or infinity from a primitive operation.
    NotFinite,
    /// A domain restriction does not hold.
    Restricted,
}

impl fmt::Display for Undefined {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Undefined::Domain => "outside the function's domain",
            Undefined::DivisionByZero => "division by zero",
            Undefined::EvenRootOfNegative => "square root of a negative number",
            Undefined::FractionalPowerOfNegative => "fractional power of a negative number",
            Undefined::LogOfNonPositive => "logarithm of a non-positive number",
            Undefined::NotFinite => "result is not finite",
            Undefined::Restricted => "excluded by the domain restriction",
        };
        write!(f, "{reason}")
    }
}

/// Value of an expression at one point.
pub type Outcome = Result<f64, Undefined>;

pub(crate) fn finite(value: f64) -> Outcome {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Undefined::NotFinite)
    }
}

fn power(base: f64, exponent: f64) -> Outcome {
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(Undefined::FractionalPowerOfNegative);
    }
    if base == 0.0 && exponent < 0.0 {
        return Err(Undefined::DivisionByZero);
    }
    finite(base.powf(exponent))
}

fn holds(predicate: &Predicate, x: f64) -> Result<bool, Undefined> {
    let left = evaluate(&predicate.left, x)?;
    let right = evaluate(&predicate.right, x)?;
    Ok(predicate.op.holds(left, right))
}

/// Evaluates `expr` with the variable bound to `x`.
pub fn evaluate(expr: &Expr, x: f64) -> Outcome {
    match expr {
        Expr::Constant(value) => finite(*value),
        Expr::Variable => finite(x),
        Expr::Unary {
            op: UnaryOp::Negate,
            operand,
        } => Ok(-evaluate(operand, x)?),
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, x)?;
            let right = evaluate(right, x)?;
            match op {
                BinaryOp::Add => finite(left + right),
                BinaryOp::Subtract => finite(left - right),
                BinaryOp::Multiply => finite(left * right),
                BinaryOp::Divide if right == 0.0 => Err(Undefined::DivisionByZero),
                BinaryOp::Divide => finite(left / right),
                BinaryOp::Power => power(left, right),
            }
        }
        Expr::Call { function, args } => {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, x))
                .collect::<Result<Vec<f64>, Undefined>>()?;
            function.apply(&values)
        }
        Expr::DomainRestricted { inner, predicates } => {
            for predicate in predicates {
                if !holds(predicate, x)? {
                    return Err(Undefined::Restricted);
                }
            }
            evaluate(inner, x)
        }
    }
}

impl Expr {
    /// See [`evaluate`].
    pub fn eval(&self, x: f64) -> Outcome {
        evaluate(self, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::parse;

    fn at(text: &str, x: f64) -> Outcome {
        parse(text).unwrap().eval(x)
    }

    #[test]
    fn arithmetic() {
        assert_eq!(at("x^2 - 1", 3.0), Ok(8.0));
        assert_eq!(at("-x^2", 3.0), Ok(-9.0));
        assert_eq!(at("2^3^2", 0.0), Ok(512.0));
        assert_eq!(at("(x-3.0)*(x+4.0)", -4.0), Ok(0.0));
        assert_eq!(at("10/4/5", 0.0), Ok(0.5));
        assert_eq!(at("2^-1", 0.0), Ok(0.5));
    }

    #[test]
    fn division_by_exact_zero() {
        assert_eq!(at("1/x", 0.0), Err(Undefined::DivisionByZero));
        assert_eq!(at("1/(x-x)", 7.0), Err(Undefined::DivisionByZero));
        assert_eq!(at("1/x", 1e-310), Err(Undefined::NotFinite));
        assert_eq!(at("1/x", 1e-3).map(|v| v.round()), Ok(1000.0));
    }

    #[test]
    fn powers_of_negative_bases() {
        assert_eq!(at("x^0.5", -4.0), Err(Undefined::FractionalPowerOfNegative));
        assert_eq!(at("x^3", -2.0), Ok(-8.0));
        assert_eq!(at("x^-1", 0.0), Err(Undefined::DivisionByZero));
        assert_eq!(at("x^0", 0.0), Ok(1.0));
    }

    #[test]
    fn overflow_is_undefined() {
        assert_eq!(at("10^x", 400.0), Err(Undefined::NotFinite));
        assert_eq!(at("x*x", 1e200), Err(Undefined::NotFinite));
        assert_eq!(at("x", f64::NAN), Err(Undefined::NotFinite));
        assert_eq!(at("1", f64::INFINITY), Ok(1.0));
    }

    #[test]
    fn restrictions() {
        assert_eq!(at("x^2 - 1|-2<x<2", 1.0), Ok(0.0));
        assert_eq!(at("x^2 - 1|-2<x<2", 2.0), Err(Undefined::Restricted));
        assert_eq!(at("x^2 - 1|-2<x<2", -3.0), Err(Undefined::Restricted));
        // the predicate holds, so sqrt itself decides
        assert_eq!(at("sqrt(x)|x<0", -1.0), Err(Undefined::EvenRootOfNegative));
        assert_eq!(at("sqrt(x)|x<0", 4.0), Err(Undefined::Restricted));
        assert_eq!(at("1|x!=0", 0.0), Err(Undefined::Restricted));
        assert_eq!(at("1|x!=0", 0.5), Ok(1.0));
    }

    #[test]
    fn undefined_predicate_makes_node_undefined() {
        assert_eq!(at("x | ln(x) > 0", -1.0), Err(Undefined::LogOfNonPositive));
        assert_eq!(at("x | ln(x) > 0", 0.5), Err(Undefined::Restricted));
        assert_eq!(at("x | ln(x) > 0", 3.0), Ok(3.0));
    }

    #[test]
    fn restriction_bounds_may_be_expressions() {
        assert_eq!(at("x | -pi/2 < x < pi/2", 1.5), Ok(1.5));
        assert_eq!(at("x | -pi/2 < x < pi/2", 1.6), Err(Undefined::Restricted));
    }

    #[test]
    fn reasons_read_well() {
        assert_eq!(Undefined::DivisionByZero.to_string(), "division by zero");
    }
}
