//! [`Expression`] operations.

use crate::algebra::{
    polynomial::{self, Atom, Polynomial},
    Coefficient, Expression, FunctionSymbol, Symbol,
};
use num_complex::Complex64;
use smol_str::SmolStr;
use std::collections::BTreeMap;

/// Errors raised while manipulating an [`Expression`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AlgebraError {
    #[error("{function}() can't be applied here, {reason}")]
    InvalidFunctionArguments {
        function: SmolStr,
        reason: &'static str,
    },
    #[error(
        "unable to substitute \"{replacement}\" into an argument of {function}()"
    )]
    NonSymbolArgument {
        function: SmolStr,
        replacement: Expression,
    },
    #[error("unable to divide by the non-constant expression \"{denominator}\"")]
    NonConstantDenominator { denominator: Expression },
    #[error("division by zero")]
    DivisionByZero,
    #[error(
        "square roots are only supported for non-negative rational constants, found \"{operand}\""
    )]
    UnsupportedSqrt { operand: Expression },
    #[error("no value was provided for \"{name}\"")]
    UnknownSymbol { name: SmolStr },
    #[error("unable to numerically evaluate the function {name}()")]
    UnableToEvaluate { name: SmolStr },
}

/// Replace all references to a [`Symbol`] with an [`Expression`].
pub fn substitute(
    expression: &Expression,
    symbol: &Symbol,
    value: &Expression,
) -> Result<Expression, AlgebraError> {
    substitute_all(expression, &[(symbol.clone(), value.clone())])
}

/// Replace several [`Symbol`]s at once.
///
/// The substitution is simultaneous, so a replacement value is never itself
/// substituted into. Function arguments and derivative variables may only be
/// replaced by other symbols.
pub fn substitute_all(
    expression: &Expression,
    substitutions: &[(Symbol, Expression)],
) -> Result<Expression, AlgebraError> {
    let lookup = |symbol: &Symbol| {
        substitutions
            .iter()
            .find(|(candidate, _)| candidate == symbol)
            .map(|(_, value)| value)
    };

    let got = match expression {
        Expression::Symbol(symbol) => match lookup(symbol) {
            Some(value) => value.clone(),
            None => expression.clone(),
        },
        Expression::Constant(_) => expression.clone(),
        Expression::Function(applied) => {
            let mut arguments = applied.arguments().clone();

            for argument in arguments.iter_mut() {
                match lookup(argument) {
                    Some(Expression::Symbol(replacement)) => {
                        *argument = replacement.clone()
                    },
                    Some(other) => {
                        return Err(AlgebraError::NonSymbolArgument {
                            function: applied.function().name().into(),
                            replacement: other.clone(),
                        })
                    },
                    None => {},
                }
            }

            Expression::Function(applied.with_arguments(arguments)?)
        },
        Expression::Sum(terms) => Expression::Sum(
            terms
                .iter()
                .map(|term| substitute_all(term, substitutions))
                .collect::<Result<_, _>>()?,
        ),
        Expression::Product(factors) => Expression::Product(
            factors
                .iter()
                .map(|factor| substitute_all(factor, substitutions))
                .collect::<Result<_, _>>()?,
        ),
        Expression::Power { base, exponent } => Expression::Power {
            base: Box::new(substitute_all(base, substitutions)?),
            exponent: *exponent,
        },
        Expression::Negate(inner) => -substitute_all(inner, substitutions)?,
        Expression::Quotient {
            numerator,
            denominator,
        } => {
            substitute_all(numerator, substitutions)?
                / substitute_all(denominator, substitutions)?
        },
        Expression::Sqrt(operand) => {
            Expression::Sqrt(Box::new(substitute_all(operand, substitutions)?))
        },
        Expression::Derivative { operand, variables } => {
            let renamed: Option<Vec<Symbol>> = variables
                .iter()
                .map(|variable| match lookup(variable) {
                    None => Some(variable.clone()),
                    Some(Expression::Symbol(replacement)) => {
                        Some(replacement.clone())
                    },
                    Some(_) => None,
                })
                .collect();

            match renamed {
                Some(variables) => Expression::Derivative {
                    operand: Box::new(substitute_all(operand, substitutions)?),
                    variables,
                },
                // We can't rename the variable we're differentiating by, so
                // evaluate the derivative first
                None => substitute_all(&simplify(expression)?, substitutions)?,
            }
        },
    };

    Ok(got)
}

/// Calculate an [`Expression`]'s partial derivative with respect to a
/// particular [`Symbol`].
///
/// The result is not simplified, and the product rule never reorders
/// factors.
pub fn partial_derivative(expr: &Expression, symbol: &Symbol) -> Expression {
    if !expr.depends_on(symbol) {
        return Expression::zero();
    }

    match expr {
        Expression::Constant(_) => Expression::zero(),
        Expression::Symbol(s) => {
            if s == symbol {
                Expression::one()
            } else {
                Expression::zero()
            }
        },
        Expression::Function(applied) => match applied.differentiate(symbol) {
            Some(derivative) => Expression::Function(derivative),
            None => Expression::zero(),
        },
        Expression::Sum(terms) => Expression::sum(
            terms.iter().map(|term| partial_derivative(term, symbol)),
        ),
        Expression::Product(factors) => {
            // The product rule
            let mut terms = Vec::new();

            for (i, factor) in factors.iter().enumerate() {
                if !factor.depends_on(symbol) {
                    continue;
                }

                let mut term = factors.clone();
                term[i] = partial_derivative(factor, symbol);
                terms.push(Expression::Product(term));
            }

            Expression::sum(terms)
        },
        Expression::Power { base, exponent } => {
            if *exponent == 0 {
                Expression::zero()
            } else if base.is_commutative() {
                // (f^n)' = n * f^(n-1) * f'
                Expression::integer(i64::from(*exponent))
                    * Expression::clone(base).pow(exponent - 1)
                    * partial_derivative(base, symbol)
            } else {
                let repeated = vec![Expression::clone(base); *exponent as usize];
                partial_derivative(&Expression::Product(repeated), symbol)
            }
        },
        Expression::Negate(inner) => -partial_derivative(inner, symbol),
        Expression::Quotient {
            numerator,
            denominator,
        } => {
            let d_numerator = partial_derivative(numerator, symbol);

            if denominator.depends_on(symbol) {
                // The quotient rule
                let d_denominator = partial_derivative(denominator, symbol);
                let numerator = Expression::clone(numerator);
                let denominator = Expression::clone(denominator);

                (d_numerator * denominator.clone() - numerator * d_denominator)
                    / denominator.pow(2)
            } else {
                d_numerator / Expression::clone(denominator)
            }
        },
        Expression::Sqrt(operand) => {
            // the chain rule: sqrt(g)' = g' / (2 * sqrt(g))
            let g_dash = partial_derivative(operand, symbol);
            g_dash / (Expression::integer(2) * Expression::clone(operand).sqrt())
        },
        Expression::Derivative { .. } => expr.clone().derivative(symbol),
    }
}

/// Expand an [`Expression`] into its canonical [`Polynomial`] form,
/// evaluating any derivatives along the way.
pub fn expand(expression: &Expression) -> Result<Polynomial, AlgebraError> {
    match expression {
        Expression::Constant(value) => Ok(Polynomial::constant(value.clone())),
        Expression::Symbol(symbol) => {
            Ok(Polynomial::atom(Atom::Symbol(symbol.clone())))
        },
        Expression::Function(applied) => {
            Ok(Polynomial::atom(Atom::Function(applied.clone())))
        },
        Expression::Sum(terms) => {
            terms.iter().try_fold(Polynomial::zero(), |sum, term| {
                expand(term).map(|term| &sum + &term)
            })
        },
        Expression::Product(factors) => {
            factors.iter().try_fold(Polynomial::one(), |product, factor| {
                expand(factor).map(|factor| &product * &factor)
            })
        },
        Expression::Power { base, exponent } => Ok(expand(base)?.pow(*exponent)),
        Expression::Negate(inner) => Ok(-&expand(inner)?),
        Expression::Quotient {
            numerator,
            denominator,
        } => {
            let divisor = expand(denominator)?;

            if divisor.is_zero() {
                return Err(AlgebraError::DivisionByZero);
            }

            let inverse = divisor.inverse().ok_or_else(|| {
                AlgebraError::NonConstantDenominator {
                    denominator: Expression::clone(denominator),
                }
            })?;

            Ok(&expand(numerator)? * &inverse)
        },
        Expression::Sqrt(operand) => expand(operand)?
            .as_constant()
            .and_then(|value| polynomial::sqrt(&value))
            .ok_or_else(|| AlgebraError::UnsupportedSqrt {
                operand: Expression::clone(operand),
            }),
        Expression::Derivative { operand, variables } => {
            let mut derivative = Expression::clone(operand);

            for variable in variables {
                derivative = partial_derivative(&derivative, variable);
            }

            expand(&derivative)
        },
    }
}

/// Normalise an expression.
///
/// The result is fully expanded, like terms are collected, commuting factors
/// are sorted, and noncommuting factors keep their relative order. Applying
/// `simplify()` to its own output gives the same expression back.
pub fn simplify(expression: &Expression) -> Result<Expression, AlgebraError> {
    expand(expression).map(|polynomial| polynomial.to_expression())
}

/// Numerically evaluate an expression which doesn't contain any functions.
pub fn evaluate<F>(
    expression: &Expression,
    lookup_symbol_value: &F,
) -> Result<Complex64, AlgebraError>
where
    F: Fn(&Symbol) -> Option<Complex64>,
{
    match expression {
        Expression::Constant(value) => Ok(value.to_complex64()),
        Expression::Symbol(symbol) => {
            lookup_symbol_value(symbol).ok_or_else(|| {
                AlgebraError::UnknownSymbol {
                    name: symbol.name().into(),
                }
            })
        },
        Expression::Function(applied) => Err(AlgebraError::UnableToEvaluate {
            name: applied.function().name().into(),
        }),
        Expression::Sum(terms) => {
            terms.iter().try_fold(Complex64::new(0.0, 0.0), |sum, term| {
                evaluate(term, lookup_symbol_value).map(|term| sum + term)
            })
        },
        Expression::Product(factors) => {
            factors.iter().try_fold(Complex64::new(1.0, 0.0), |product, f| {
                evaluate(f, lookup_symbol_value).map(|f| product * f)
            })
        },
        Expression::Power { base, exponent } => {
            evaluate(base, lookup_symbol_value).map(|b| b.powu(*exponent))
        },
        Expression::Negate(inner) => {
            evaluate(inner, lookup_symbol_value).map(|value| -value)
        },
        Expression::Quotient {
            numerator,
            denominator,
        } => {
            let numerator = evaluate(numerator, lookup_symbol_value)?;
            let denominator = evaluate(denominator, lookup_symbol_value)?;
            Ok(numerator / denominator)
        },
        Expression::Sqrt(operand) => {
            evaluate(operand, lookup_symbol_value).map(|value| value.sqrt())
        },
        Expression::Derivative { .. } => {
            evaluate(&simplify(expression)?, lookup_symbol_value)
        },
    }
}

/// Collect terms by the derivatives of `function`, giving something like
/// `a*W(x, p) + b*Derivative(W(x, p), x) + ...`.
///
/// Terms which don't contain exactly one (undifferentiated or
/// differentiated) copy of `function` are left at the end, and an expression
/// without any functions is returned as-is.
pub fn collect_by_derivative(
    expression: &Expression,
    function: &FunctionSymbol,
) -> Result<Expression, AlgebraError> {
    if !expression.functions().contains(function) {
        return Ok(expression.clone());
    }

    let polynomial = expand(expression)?;
    let mut groups = BTreeMap::new();
    let mut leftovers = Polynomial::zero();

    for (monomial, coefficient) in polynomial.terms() {
        let mut candidates = monomial.commutative().filter(|(atom, _)| {
            matches!(atom, Atom::Function(f) if f.function() == function)
        });

        match (candidates.next(), candidates.next()) {
            (Some((atom, 1)), None) => {
                let rest = monomial.without(atom);
                groups
                    .entry(atom.clone())
                    .or_insert_with(Polynomial::zero)
                    .add_term(rest, coefficient.clone());
            },
            _ => leftovers.add_term(monomial.clone(), coefficient.clone()),
        }
    }

    let mut terms = Vec::new();

    for (atom, coefficients) in groups {
        let factor = atom.to_expression();

        match coefficients.as_constant() {
            Some(c) if c.is_one() => terms.push(factor),
            Some(c) if c == -Coefficient::one() => terms.push(-factor),
            _ => terms.push(Expression::product(vec![
                coefficients.to_expression(),
                factor,
            ])),
        }
    }

    terms.push(leftovers.to_expression());
    terms.retain(|term| *term != Expression::zero());

    Ok(Expression::sum(terms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse, Symbols};

    fn expr(src: &str) -> Expression {
        parse(src, &Symbols::new()).unwrap()
    }

    #[test]
    fn simplify_simple_arithmetic() {
        let inputs = vec![
            ("1", "1"),
            ("1 + 1.5", "5/2"),
            ("1 - 1.5", "-1/2"),
            ("2 * 3", "6"),
            ("4 / 2", "2"),
            ("sqrt(4)", "2"),
            ("sqrt(2 + 2)", "2"),
            ("-(1 + 2)", "-3"),
            ("i*i", "-1"),
            ("(1 + i)*(1 - i)", "2"),
            ("0 * x", "0"),
            ("x - x", "0"),
            ("sqrt(2)*sqrt(2)", "2"),
            ("1/sqrt(2)", "1/2*sqrt(2)"),
            ("sqrt(2)*sqrt(6)", "2*sqrt(3)"),
            ("sqrt(6) - sqrt(2)*sqrt(3)", "0"),
            ("1/(sqrt(2)*sqrt(3))", "1/6*sqrt(6)"),
        ];

        for (src, should_be) in inputs {
            let got = simplify(&expr(src)).unwrap();

            assert_eq!(got.to_string(), should_be, "{}", src);
        }
    }

    #[test]
    fn simplification_collects_like_terms() {
        let inputs = vec![
            ("x", "x"),
            ("2 * x * 3", "6*x"),
            ("x + 5*2", "10 + x"),
            ("x + x", "2*x"),
            ("--x", "x"),
            ("(x + x)*3 + 5", "5 + 6*x"),
            ("x*p - p*x", "0"),
            ("(x + i*p)*(x - i*p)", "p^2 + x^2"),
            ("x/2 + x/2", "x"),
        ];

        for (src, should_be) in inputs {
            let got = simplify(&expr(src)).unwrap();

            assert_eq!(got, expr(should_be), "{} != {}", got, should_be);
        }
    }

    #[test]
    fn simplify_is_idempotent() {
        let inputs = vec![
            "(x + p)^3",
            "(x - i*p)/sqrt(2) * (x + i*p)/sqrt(2)",
            "Derivative(x^2*W(x, p), x)",
            "3*i/2 - x*(p + 1)",
        ];

        for src in inputs {
            let once = simplify(&expr(src)).unwrap();
            let twice = simplify(&once).unwrap();

            assert_eq!(once, twice);
        }
    }

    #[test]
    fn division_only_by_constants() {
        let got = simplify(&expr("1/x"));

        assert_eq!(
            got,
            Err(AlgebraError::NonConstantDenominator {
                denominator: expr("x")
            })
        );
        assert_eq!(
            simplify(&expr("x/(1 - 1)")),
            Err(AlgebraError::DivisionByZero)
        );
        assert!(simplify(&expr("sqrt(x)")).is_err());
        assert!(simplify(&expr("sqrt(-2)")).is_err());
    }

    #[test]
    fn basic_substitutions() {
        let x = Symbol::real("x");
        let inputs = vec![
            ("1 + 2", "3", "1 + 2"),
            ("x", "5", "5"),
            ("y", "5", "y"),
            ("x + 5", "5", " 5 + 5"),
            ("-x", "5", "-5"),
            ("sqrt(x)", "y + y", "sqrt(y + y)"),
        ];

        for (src, new_value, should_be) in inputs {
            let original = expr(src);
            let new_value = expr(new_value);
            let should_be = expr(should_be);

            let got = substitute(&original, &x, &new_value).unwrap();

            assert_eq!(got, should_be, "{} != {}", got, should_be);
        }
    }

    #[test]
    fn substitution_is_simultaneous() {
        let x = Symbol::real("x");
        let p = Symbol::real("p");
        let swap = [(x, expr("p")), (p, expr("x"))];

        let got = substitute_all(&expr("x + 2*p"), &swap).unwrap();

        assert_eq!(got, expr("p + 2*x"));
    }

    #[test]
    fn function_arguments_can_only_be_renamed() {
        let x = Symbol::real("x");
        let q = Symbol::real("q");
        let w = expr("W(x, p)");

        let renamed = substitute(&w, &x, &Expression::from(&q)).unwrap();
        assert_eq!(renamed.to_string(), "W(q, p)");

        let got = substitute(&w, &x, &expr("x + 1"));
        assert!(matches!(got, Err(AlgebraError::NonSymbolArgument { .. })));

        let collapsed = substitute(&w, &x, &expr("p"));
        assert!(matches!(
            collapsed,
            Err(AlgebraError::InvalidFunctionArguments { .. })
        ));
    }

    #[test]
    fn differentiate_wrt_x() {
        let x = Symbol::real("x");
        let inputs = vec![
            ("x", "1"),
            ("1", "0"),
            ("x*x", "2 * x"),
            ("3*x*x + 5*x + 2", "6*x + 5"),
            ("x - y", "1"),
            ("x^3", "3*x^2"),
            ("x/2", "1/2"),
            ("sqrt(2)*x", "sqrt(2)"),
            ("W(x, p)", "Derivative(W(x, p), x)"),
            ("x*W(x, p)", "W(x, p) + x*Derivative(W(x, p), x)"),
            (
                "Derivative(W(x, p), p)",
                "Derivative(W(x, p), p, x)",
            ),
        ];

        for (src, should_be) in inputs {
            let original = expr(src);
            let should_be = simplify(&expr(should_be)).unwrap();

            let got = partial_derivative(&original, &x);
            let got = simplify(&got).unwrap();

            assert_eq!(got, should_be, "{} != {}", got, should_be);
        }
    }

    #[test]
    fn mixed_partials_commute() {
        let got = simplify(&expr("Derivative(W(x, p), p, x)")).unwrap();
        let should_be = simplify(&expr("Derivative(W(x, p), x, p)")).unwrap();

        assert_eq!(got, should_be);
    }

    #[test]
    fn evaluate_matches_the_simplified_form() {
        let lookup = |symbol: &Symbol| match symbol.name() {
            "x" => Some(Complex64::new(0.5, 0.0)),
            "p" => Some(Complex64::new(-1.25, 0.0)),
            _ => None,
        };
        let inputs = vec![
            "(x + i*p)^3",
            "(x - i*p)/sqrt(2) * (x + i*p)/sqrt(2)",
            "Derivative(x^2*p, x)",
        ];

        for src in inputs {
            let original = expr(src);
            let simplified = simplify(&original).unwrap();

            let a = evaluate(&original, &lookup).unwrap();
            let b = evaluate(&simplified, &lookup).unwrap();

            approx::assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
            approx::assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
        }

        assert!(evaluate(&expr("W(x, p)"), &lookup).is_err());
        assert!(evaluate(&expr("y"), &lookup).is_err());
    }

    #[test]
    fn collect_terms_by_derivative() {
        let w = FunctionSymbol::new("W");
        let original = expr(
            "x*Derivative(W(x, p), p) + p*Derivative(W(x, p), p) + 2*W(x, p) + x",
        );

        let got = collect_by_derivative(&original, &w).unwrap();

        assert_eq!(
            got.to_string(),
            "2*W(x, p) + (p + x)*Derivative(W(x, p), p) + x"
        );
        assert_eq!(simplify(&got).unwrap(), simplify(&original).unwrap());
    }

    #[test]
    fn unit_coefficients_are_dropped_when_collecting() {
        let w = FunctionSymbol::new("W");
        let inputs = vec![
            (
                "-Derivative(W(x, p), x) + x*W(x, p)",
                "x*W(x, p) - Derivative(W(x, p), x)",
            ),
            ("W(x, p) - Derivative(W(x, p), p)", "W(x, p) - Derivative(W(x, p), p)"),
        ];

        for (src, should_be) in inputs {
            let got = collect_by_derivative(&expr(src), &w).unwrap();

            assert_eq!(got.to_string(), should_be, "{}", src);
        }
    }

    #[test]
    fn collecting_without_functions_is_a_noop() {
        let w = FunctionSymbol::new("W");
        let original = expr("x*p + 1");

        let got = collect_by_derivative(&original, &w).unwrap();

        assert_eq!(got, original);
    }
}
