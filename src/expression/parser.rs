//! Recursive-descent parser for slot expressions.
//!
//! ```text
//! top         := sum ( "|" restriction ( "," restriction )* )? END
//! restriction := sum cmp sum ( cmp sum )?
//! sum         := product ( ("+" | "-") product )*
//! product     := unary ( ("*" | "/") unary )*
//! unary       := ("-" | "+") unary | power
//! power       := primary ( "^" unary )?
//! primary     := NUMBER | "x" | CONST | NAME "(" sum ( "," sum )* ")" | "(" sum ")"
//! ```
//!
//! `^` is right-associative and binds tighter than negation, so `-x^2` is
//! `-(x^2)` and `2^-x` is `2^(-x)`.

use super::ast::{BinaryOp, Expr, Predicate};
use super::functions::{lookup_constant, Function};
use super::lexer::tokenize;
use super::token::{Token, TokenKind};
use crate::error::{ExpressionError, ParseError};

const MAX_DEPTH: usize = 200;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with End.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::End {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError::new(
            format!("expected {expected}, found {}", token.kind.describe()),
            token.offset,
        )
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::new(
                "expression nested too deeply",
                self.peek().offset,
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_top(&mut self) -> Result<Expr, ParseError> {
        if self.peek().kind == TokenKind::End {
            return Err(ParseError::new("empty expression", self.peek().offset));
        }

        let inner = self.parse_sum()?;
        let expr = if self.eat(&TokenKind::Pipe) {
            let mut predicates = Vec::new();
            loop {
                self.parse_restriction(&mut predicates)?;
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            Expr::DomainRestricted {
                inner: Box::new(inner),
                predicates,
            }
        } else {
            inner
        };

        let token = self.peek();
        match token.kind {
            TokenKind::End => Ok(expr),
            TokenKind::RightParen => Err(ParseError::new("unmatched ')'", token.offset)),
            _ => Err(ParseError::new(
                format!("unexpected {}", token.kind.describe()),
                token.offset,
            )),
        }
    }

    /// `a < x` or the chained `a < x < b`, which yields two predicates.
    fn parse_restriction(&mut self, predicates: &mut Vec<Predicate>) -> Result<(), ParseError> {
        let mut left = self.parse_sum()?;
        let mut chained = 0;
        while let TokenKind::Comparison(op) = self.peek().kind {
            if chained == 2 {
                return Err(ParseError::new(
                    "a restriction chains at most two comparisons",
                    self.peek().offset,
                ));
            }
            self.advance();
            let right = self.parse_sum()?;
            predicates.push(Predicate {
                left,
                op,
                right: right.clone(),
            });
            left = right;
            chained += 1;
        }
        if chained == 0 {
            return Err(self.unexpected("a comparison"));
        }
        Ok(())
    }

    fn parse_sum(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_product()?;
        // each operator in the chain nests the tree one level deeper
        let mut chained = 0;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            self.enter()?;
            chained += 1;
            let right = self.parse_product()?;
            left = Expr::binary(op, left, right);
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_product(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        let mut chained = 0;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                _ => break,
            };
            self.advance();
            self.enter()?;
            chained += 1;
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        self.enter()?;
        let result = match self.peek().kind {
            TokenKind::Minus => {
                self.advance();
                self.parse_unary().map(Expr::negate)
            }
            TokenKind::Plus => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_power(),
        };
        self.leave();
        result
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_primary()?;
        if self.eat(&TokenKind::Caret) {
            let exponent = self.parse_unary()?;
            return Ok(Expr::binary(BinaryOp::Power, base, exponent));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number(value) => {
                self.advance();
                Ok(Expr::Constant(value))
            }
            TokenKind::Variable => {
                self.advance();
                Ok(Expr::Variable)
            }
            TokenKind::Identifier(name) => {
                self.advance();
                self.parse_name(&name, token.offset)
            }
            TokenKind::LeftParen => {
                self.advance();
                self.enter()?;
                let inner = self.parse_sum()?;
                self.leave();
                self.close_paren(token.offset)?;
                Ok(inner)
            }
            _ => Err(self.unexpected("a number, 'x', a function or '('")),
        }
    }

    fn close_paren(&mut self, open_offset: usize) -> Result<(), ParseError> {
        match self.peek().kind {
            TokenKind::RightParen => {
                self.advance();
                Ok(())
            }
            TokenKind::End => Err(ParseError::new("unmatched '('", open_offset)),
            _ => Err(self.unexpected("')'")),
        }
    }

    fn parse_name(&mut self, name: &str, offset: usize) -> Result<Expr, ParseError> {
        let is_call = self.peek().kind == TokenKind::LeftParen;
        if !is_call {
            if let Some(value) = lookup_constant(name) {
                return Ok(Expr::Constant(value));
            }
            if Function::lookup(name).is_some() {
                return Err(self.unexpected(&format!("'(' after '{name}'")));
            }
            return Err(ParseError::new(format!("unknown name '{name}'"), offset));
        }

        let Some(function) = Function::lookup(name) else {
            return Err(ParseError::new(format!("unknown function '{name}'"), offset));
        };

        let open_offset = self.advance().offset;
        self.enter()?;
        let mut args = vec![self.parse_sum()?];
        while self.eat(&TokenKind::Comma) {
            args.push(self.parse_sum()?);
        }
        self.leave();
        self.close_paren(open_offset)?;

        if !function.accepts(args.len()) {
            let (min, max) = function.arity();
            let expected = if min == max {
                format!("{min}")
            } else {
                format!("{min} to {max}")
            };
            let plural = if max == 1 { "" } else { "s" };
            return Err(ParseError::new(
                format!(
                    "'{name}' takes {expected} argument{plural}, got {}",
                    args.len()
                ),
                offset,
            ));
        }

        Ok(Expr::call(function, args))
    }
}

/// Parses slot text into an expression tree.
pub fn parse(input: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);
    Ok(parser.parse_top()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ast::Comparison;

    fn error(input: &str) -> (String, usize) {
        let err = parse(input).unwrap_err();
        (err.message(), err.offset())
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(
            parse("1-x-2").unwrap(),
            Expr::binary(
                BinaryOp::Subtract,
                Expr::binary(BinaryOp::Subtract, Expr::Constant(1.0), Expr::Variable),
                Expr::Constant(2.0)
            )
        );
        assert_eq!(
            parse("x^2^3").unwrap(),
            Expr::binary(
                BinaryOp::Power,
                Expr::Variable,
                Expr::binary(BinaryOp::Power, Expr::Constant(2.0), Expr::Constant(3.0))
            )
        );
        assert_eq!(
            parse("-x^2").unwrap(),
            Expr::negate(Expr::binary(BinaryOp::Power, Expr::Variable, Expr::Constant(2.0)))
        );
        assert_eq!(
            parse("2*-x").unwrap(),
            Expr::binary(BinaryOp::Multiply, Expr::Constant(2.0), Expr::negate(Expr::Variable))
        );
    }

    #[test]
    fn calls_and_constants() {
        assert_eq!(
            parse("log(2, x)").unwrap(),
            Expr::call(Function::Log, vec![Expr::Constant(2.0), Expr::Variable])
        );
        assert_eq!(
            parse("sin(pi*x)").unwrap(),
            Expr::call(
                Function::Sin,
                vec![Expr::binary(
                    BinaryOp::Multiply,
                    Expr::Constant(std::f64::consts::PI),
                    Expr::Variable
                )]
            )
        );
        assert_eq!(parse("X").unwrap(), Expr::Variable);
        assert_eq!(parse("+x").unwrap(), Expr::Variable);
    }

    #[test]
    fn chained_restriction_splits_into_predicates() {
        let expr = parse("x^2 - 1|-2<x<2").unwrap();
        let Expr::DomainRestricted { predicates, .. } = expr else {
            panic!("expected a restricted expression");
        };
        assert_eq!(predicates.len(), 2);
        assert_eq!(predicates[0].left, Expr::negate(Expr::Constant(2.0)));
        assert_eq!(predicates[0].op, Comparison::Less);
        assert_eq!(predicates[0].right, Expr::Variable);
        assert_eq!(predicates[1].left, Expr::Variable);
        assert_eq!(predicates[1].right, Expr::Constant(2.0));
    }

    #[test]
    fn several_restrictions() {
        let expr = parse("1/x | x != 0, x >= -3").unwrap();
        let Expr::DomainRestricted { predicates, .. } = expr else {
            panic!("expected a restricted expression");
        };
        assert_eq!(predicates.len(), 2);
        assert_eq!(predicates[0].op, Comparison::NotEqual);
        assert_eq!(predicates[1].op, Comparison::GreaterOrEqual);
    }

    #[test]
    fn operator_without_operand() {
        let (message, offset) = error("x+*2");
        assert_eq!(offset, 2);
        assert!(message.contains("'*'"), "{message}");
    }

    #[test]
    fn structural_errors_carry_offsets() {
        assert_eq!(error("").1, 0);
        assert_eq!(error("   ").0, "empty expression");
        assert_eq!(error("(x+1"), ("unmatched '('".to_string(), 0));
        assert_eq!(error("x+1)"), ("unmatched ')'".to_string(), 3));
        assert_eq!(error("2x").1, 1);
        assert_eq!(error("x 2").1, 2);
        assert_eq!(error("x^").1, 2);
        assert_eq!(error("x|").1, 2);
        assert_eq!(error("x|x").1, 3);
        assert_eq!(error("x|1<x<2<3").1, 7);
        assert_eq!(error("(x|x>0)").1, 2);
    }

    #[test]
    fn unknown_names_and_arity() {
        assert_eq!(error("foo(x)"), ("unknown function 'foo'".to_string(), 0));
        assert_eq!(error("2*abc"), ("unknown name 'abc'".to_string(), 2));
        assert_eq!(
            error("1+sin(x, 2)"),
            ("'sin' takes 1 argument, got 2".to_string(), 2)
        );
        assert_eq!(
            error("max(x)"),
            ("'max' takes 2 arguments, got 1".to_string(), 0)
        );
        assert_eq!(error("sin x").1, 4);
    }

    #[test]
    fn lexical_errors_pass_through() {
        assert!(matches!(parse("x # 1"), Err(ExpressionError::Lex(_))));
        assert_eq!(error("x # 1").1, 2);
    }

    #[test]
    fn deep_nesting_is_rejected_not_overflowed() {
        let deep = format!("{}x{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(error(&deep).0, "expression nested too deeply");
        let negations = format!("{}x", "-".repeat(10_000));
        assert!(parse(&negations).is_err());
    }

    #[test]
    fn long_operator_chains_are_rejected_not_overflowed() {
        let sum = vec!["x"; 20_000].join("+");
        let (message, offset) = error(&sum);
        assert_eq!(message, "expression nested too deeply");
        assert!(offset > 0 && offset < sum.len());

        let product = vec!["x"; 20_000].join("*");
        assert_eq!(error(&product).0, "expression nested too deeply");
        let mixed = vec!["x"; 20_000].join("-1/");
        assert_eq!(error(&mixed).0, "expression nested too deeply");
    }

    #[test]
    fn moderate_chains_still_parse_and_evaluate() {
        let sum = vec!["x"; 100].join("+");
        assert_eq!(parse(&sum).unwrap().eval(1.0), Ok(100.0));
        let product = vec!["2"; 50].join("*");
        assert_eq!(parse(&product).unwrap().eval(0.0), Ok(2f64.powi(50)));
    }

    #[test]
    fn printed_form_parses_back_to_the_same_tree() {
        for text in [
            "x^2 - 1|-2<x<2",
            "-(x+1)^2",
            "(x+8)*(x+4)*(x-1)",
            "1/(x-3)/2",
            "2^-x",
            "log(2, x) + max(sin(x), cos(x))",
            "sqrt(x)|x<0",
            "1/x | x != 0, x >= -3",
            "x-(1-x)",
            "(x^2)^3",
            "0.1 + 1e",
        ] {
            let Ok(expr) = parse(text) else { continue };
            let printed = expr.to_string();
            assert_eq!(parse(&printed).unwrap(), expr, "{text} -> {printed}");
        }
    }
}
