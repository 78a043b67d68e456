//! The Moyal star-product.

use crate::{
    algebra::{
        ops,
        polynomial::{Atom, Monomial, Polynomial},
        AlgebraError, Expression, Symbol,
    },
    bopp::{self, Side},
    Symbols,
};
use log::{debug, trace};

/// Errors that may occur while calculating a star-product.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StarError {
    #[error("\"{expression}\" has already been Bopp shifted")]
    AlreadyShifted { expression: Expression },
    #[error("\"{expression}\" contains primed coordinates")]
    PrimedInput { expression: Expression },
    #[error("unable to Bopp shift \"{expression}\" because it contains a function")]
    FunctionInShiftedOperand { expression: Expression },
    #[error(
        "unable to star-multiply \"{left}\" and \"{right}\" because they both contain functions"
    )]
    BothOperandsHaveFunctions { left: Expression, right: Expression },
    #[error(transparent)]
    Algebra(#[from] AlgebraError),
}

/// The two equivalent ways of calculating `a ⋆ b`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Path {
    /// Calculate `a(x + i/2 ∂p', p - i/2 ∂x') b(x', p')`.
    ShiftLeftOperand,
    /// Calculate `b(x - i/2 ∂p', p + i/2 ∂x') a(x', p')`.
    ShiftRightOperand,
}

impl Path {
    /// Pick the path which never needs to Bopp shift a function.
    pub fn for_operands(
        left: &Expression,
        right: &Expression,
    ) -> Result<Path, StarError> {
        match (left.contains_function(), right.contains_function()) {
            (true, true) => Err(StarError::BothOperandsHaveFunctions {
                left: left.clone(),
                right: right.clone(),
            }),
            (true, false) => Ok(Path::ShiftRightOperand),
            (false, _) => Ok(Path::ShiftLeftOperand),
        }
    }
}

/// Calculate the star-product, `left ⋆ right`.
///
/// At most one of the operands may contain a function (e.g. the Wigner
/// function, `W(x, p)`).
pub fn star(
    left: &Expression,
    right: &Expression,
    symbols: &Symbols,
) -> Result<Expression, StarError> {
    let path = Path::for_operands(left, right)?;
    star_via(left, right, path, symbols)
}

/// Calculate `left ⋆ right` by explicitly following a particular [`Path`].
pub fn star_via(
    left: &Expression,
    right: &Expression,
    path: Path,
    symbols: &Symbols,
) -> Result<Expression, StarError> {
    debug!("Calculating ({}) ⋆ ({}) via {:?}", left, right, path);

    let product = shifted_product(left, right, path, symbols)?;
    let evaluated = apply_operators(&product, symbols)?;
    let unprimed = bopp::unprime(&evaluated.to_expression(), symbols)?;
    let result = ops::simplify(&unprimed)?;

    debug!("({}) ⋆ ({}) = {}", left, right, result);

    Ok(result)
}

/// Calculate `left ⋆ right` without applying the derivative operators.
///
/// Each term is left in terms of the primed coordinates, with the operators
/// written as unevaluated [`Expression::Derivative`]s of whatever is to
/// their right.
pub fn star_unevaluated(
    left: &Expression,
    right: &Expression,
    symbols: &Symbols,
) -> Result<Expression, StarError> {
    let path = Path::for_operands(left, right)?;
    let product = shifted_product(left, right, path, symbols)?;

    let terms = product.terms().map(|(monomial, coefficient)| {
        let mut factors = Vec::new();

        if !coefficient.is_one() {
            factors.push(Expression::Constant(coefficient.clone()));
        }

        let commutative = monomial.commutative_part();
        if !commutative.is_one() {
            factors.push(commutative.to_expression());
        }

        if !monomial.word().is_empty() {
            factors.push(unevaluated_word(monomial, symbols));
        }

        Expression::product(factors)
    });

    Ok(Expression::sum(terms.collect::<Vec<_>>()))
}

/// The star-commutator, `left ⋆ right - right ⋆ left`.
pub fn star_commutator(
    left: &Expression,
    right: &Expression,
    symbols: &Symbols,
) -> Result<Expression, StarError> {
    let forwards = star(left, right, symbols)?;
    let backwards = star(right, left, symbols)?;

    Ok(ops::simplify(&(forwards - backwards))?)
}

/// Bopp shift one operand and prime the other, then multiply them together
/// (keeping the shifted operand on the left so its operators act on the
/// primed one).
fn shifted_product(
    left: &Expression,
    right: &Expression,
    path: Path,
    symbols: &Symbols,
) -> Result<Polynomial, StarError> {
    bopp::ensure_unshifted(left)?;
    bopp::ensure_unshifted(right)?;

    let (shifted, primed) = match path {
        Path::ShiftLeftOperand => (
            bopp::bopp(left, Side::Right, symbols)?,
            bopp::make_prime(right, symbols)?,
        ),
        Path::ShiftRightOperand => (
            bopp::bopp(right, Side::Left, symbols)?,
            bopp::make_prime(left, symbols)?,
        ),
    };

    debug!("Multiplying \"{}\" by \"{}\"", shifted, primed);

    Ok(ops::expand(&(shifted * primed))?)
}

/// Walk each term's word from right to left, letting every derivative
/// operator differentiate everything to its right.
fn apply_operators(
    product: &Polynomial,
    symbols: &Symbols,
) -> Result<Polynomial, StarError> {
    let mut result = Polynomial::zero();

    for (monomial, coefficient) in product.terms() {
        let mut operand = Polynomial::one();

        for (atom, exponent) in monomial.word().iter().rev() {
            match operator_variable(atom, symbols) {
                Some(variable) => {
                    for _ in 0..*exponent {
                        let derivative = ops::partial_derivative(
                            &operand.to_expression(),
                            variable,
                        );
                        operand = ops::expand(&derivative)?;
                    }
                },
                None => {
                    let factor = Polynomial::atom(atom.clone()).pow(*exponent);
                    operand = &factor * &operand;
                },
            }

            if operand.is_zero() {
                break;
            }
        }

        let scale =
            Polynomial::term(monomial.commutative_part(), coefficient.clone());
        let term = &scale * &operand;
        trace!(
            "{} => {}",
            Polynomial::term(monomial.clone(), coefficient.clone())
                .to_expression(),
            term.to_expression()
        );

        result = &result + &term;
    }

    Ok(result)
}

fn unevaluated_word(monomial: &Monomial, symbols: &Symbols) -> Expression {
    let mut factors: Vec<Expression> = Vec::new();

    for (atom, exponent) in monomial.word().iter().rev() {
        match operator_variable(atom, symbols) {
            Some(variable) => {
                let mut derivative = Expression::product(factors.drain(..));
                for _ in 0..*exponent {
                    derivative = derivative.derivative(variable);
                }
                factors.push(derivative);
            },
            None if *exponent == 1 => factors.insert(0, atom.to_expression()),
            None => factors.insert(0, atom.to_expression().pow(*exponent)),
        }
    }

    Expression::product(factors)
}

/// If this atom is a derivative operator, which primed coordinate does it
/// differentiate?
fn operator_variable<'s>(atom: &Atom, symbols: &'s Symbols) -> Option<&'s Symbol> {
    match atom {
        Atom::Symbol(symbol) => symbols.operand_of(symbol),
        _ => None,
    }
}
