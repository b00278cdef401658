//! Built-in functions callable from expressions.
//!
//! Adding a function means adding a variant here; the parser and evaluator
//! pick it up through [`Function::lookup`] and [`Function::apply`].

use super::eval::{finite, Outcome, Undefined};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Sqrt,
    Cbrt,
    Abs,
    Exp,
    Ln,
    /// `log(v)` is base 10, `log(b, v)` is base `b`.
    Log,
    Floor,
    Ceil,
    Sign,
    Min,
    Max,
}

const ALL: [Function; 20] = [
    Function::Sin,
    Function::Cos,
    Function::Tan,
    Function::Asin,
    Function::Acos,
    Function::Atan,
    Function::Sinh,
    Function::Cosh,
    Function::Tanh,
    Function::Sqrt,
    Function::Cbrt,
    Function::Abs,
    Function::Exp,
    Function::Ln,
    Function::Log,
    Function::Floor,
    Function::Ceil,
    Function::Sign,
    Function::Min,
    Function::Max,
];

/// Named constants usable without parentheses.
pub fn lookup_constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        _ => None,
    }
}

impl Function {
    pub fn lookup(name: &str) -> Option<Function> {
        ALL.iter().copied().find(|f| f.name() == name)
    }

    pub fn all() -> &'static [Function] {
        &ALL
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Asin => "asin",
            Function::Acos => "acos",
            Function::Atan => "atan",
            Function::Sinh => "sinh",
            Function::Cosh => "cosh",
            Function::Tanh => "tanh",
            Function::Sqrt => "sqrt",
            Function::Cbrt => "cbrt",
            Function::Abs => "abs",
            Function::Exp => "exp",
            Function::Ln => "ln",
            Function::Log => "log",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Sign => "sign",
            Function::Min => "min",
            Function::Max => "max",
        }
    }

    /// Inclusive range of accepted argument counts.
    pub fn arity(self) -> (usize, usize) {
        match self {
            Function::Log => (1, 2),
            Function::Min | Function::Max => (2, 2),
            _ => (1, 1),
        }
    }

    pub fn accepts(self, count: usize) -> bool {
        let (min, max) = self.arity();
        (min..=max).contains(&count)
    }

    /// Applies the function to already evaluated arguments. The argument
    /// count has been checked by the parser.
    pub fn apply(self, args: &[f64]) -> Outcome {
        let Some(&x) = args.first() else {
            return Err(Undefined::Domain);
        };
        let second = || args.get(1).copied().ok_or(Undefined::Domain);
        let value = match self {
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Asin | Function::Acos if !(-1.0..=1.0).contains(&x) => {
                return Err(Undefined::Domain)
            }
            Function::Asin => x.asin(),
            Function::Acos => x.acos(),
            Function::Atan => x.atan(),
            Function::Sinh => x.sinh(),
            Function::Cosh => x.cosh(),
            Function::Tanh => x.tanh(),
            Function::Sqrt if x < 0.0 => return Err(Undefined::EvenRootOfNegative),
            Function::Sqrt => x.sqrt(),
            Function::Cbrt => x.cbrt(),
            Function::Abs => x.abs(),
            Function::Exp => x.exp(),
            Function::Ln => logarithm(x)?.ln(),
            Function::Log => match args {
                [value] => logarithm(*value)?.log10(),
                [base, value] => {
                    let base = logarithm(*base)?;
                    if base == 1.0 {
                        return Err(Undefined::Domain);
                    }
                    logarithm(*value)?.log(base)
                }
                _ => return Err(Undefined::Domain),
            },
            Function::Floor => x.floor(),
            Function::Ceil => x.ceil(),
            Function::Sign => {
                if x == 0.0 {
                    0.0
                } else {
                    x.signum()
                }
            }
            Function::Min => x.min(second()?),
            Function::Max => x.max(second()?),
        };
        finite(value)
    }
}

fn logarithm(x: f64) -> Outcome {
    if x > 0.0 {
        Ok(x)
    } else {
        Err(Undefined::LogOfNonPositive)
    }
}
