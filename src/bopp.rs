//! The Bopp shift, which turns a phase-space function into a differential
//! operator acting on primed coordinates.

use crate::{
    algebra::{ops, AlgebraError, Coefficient, Expression, Symbol, SymbolKind},
    star::StarError,
    Symbols,
};
use arrayvec::ArrayVec;

/// Which side of the operand the star operator is on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Side {
    /// The star is to the left of the operand, as in `W ⋆ H`.
    ///
    /// The operand is shifted with `x -> x - i/2 ∂p'` and
    /// `p -> p + i/2 ∂x'`.
    Left,
    /// The star is to the right of the operand, as in `H ⋆ W`.
    ///
    /// The operand is shifted with `x -> x + i/2 ∂p'` and
    /// `p -> p - i/2 ∂x'`.
    Right,
}

impl Side {
    fn sign(self) -> i64 {
        match self {
            Side::Left => -1,
            Side::Right => 1,
        }
    }
}

/// Apply the Bopp shift to `expr`, giving an expanded expression where the
/// derivative operators act on everything to their right.
pub fn bopp(
    expr: &Expression,
    side: Side,
    symbols: &Symbols,
) -> Result<Expression, StarError> {
    ensure_unshifted(expr)?;

    if expr.contains_function() {
        return Err(StarError::FunctionInShiftedOperand {
            expression: expr.clone(),
        });
    }

    let half_i = Expression::Constant(
        Coefficient::i() * Coefficient::from_ratio(side.sign(), 2),
    );

    let mut substitutions: ArrayVec<[(Symbol, Expression); 2]> =
        ArrayVec::new();
    substitutions.push((
        symbols.x().clone(),
        Expression::from(symbols.x())
            + half_i.clone() * Expression::from(symbols.dp()),
    ));
    substitutions.push((
        symbols.p().clone(),
        Expression::from(symbols.p()) - half_i * Expression::from(symbols.dx()),
    ));

    let shifted = ops::simplify(&ops::substitute_all(expr, &substitutions)?)?;
    log::trace!("Bopp shifted \"{}\" ({:?}) to \"{}\"", expr, side, shifted);

    Ok(shifted)
}

/// Replace `x` and `p` with `x'` and `p'`, including inside function
/// arguments.
pub fn make_prime(
    expr: &Expression,
    symbols: &Symbols,
) -> Result<Expression, AlgebraError> {
    ops::substitute_all(expr, &symbols.priming())
}

/// Replace `x'` and `p'` with `x` and `p`.
pub fn unprime(
    expr: &Expression,
    symbols: &Symbols,
) -> Result<Expression, AlgebraError> {
    ops::substitute_all(expr, &symbols.unpriming())
}

/// Make sure an expression is a plain phase-space function which hasn't
/// been primed or shifted yet.
pub(crate) fn ensure_unshifted(expr: &Expression) -> Result<(), StarError> {
    if expr.mentions(SymbolKind::Operator) {
        Err(StarError::AlreadyShifted {
            expression: expr.clone(),
        })
    } else if expr.mentions(SymbolKind::Primed) {
        Err(StarError::PrimedInput {
            expression: expr.clone(),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn shift_the_coordinates() {
        let symbols = Symbols::new();
        let inputs = vec![
            ("x", Side::Right, "i/2*∂p' + x"),
            ("x", Side::Left, "-i/2*∂p' + x"),
            ("p", Side::Right, "-i/2*∂x' + p"),
            ("p", Side::Left, "i/2*∂x' + p"),
            ("5", Side::Right, "5"),
            ("omega*x", Side::Right, "i/2*omega*∂p' + omega*x"),
        ];

        for (src, side, should_be) in inputs {
            let expr = parse(src, &symbols).unwrap();

            let got = bopp(&expr, side, &symbols).unwrap();

            assert_eq!(got.to_string(), should_be, "{} {:?}", src, side);
        }
    }

    #[test]
    fn left_and_right_shifts_differ_by_the_sign_of_the_operators() {
        let symbols = Symbols::new();
        let flip = vec![
            (symbols.dx().clone(), -Expression::from(symbols.dx())),
            (symbols.dp().clone(), -Expression::from(symbols.dp())),
        ];
        let inputs = vec!["x*p", "x^2 + p^3", "omega*x", "x*p^2*x - 3*i*p"];

        for src in inputs {
            let expr = parse(src, &symbols).unwrap();

            let left = bopp(&expr, Side::Left, &symbols).unwrap();
            let right = bopp(&expr, Side::Right, &symbols).unwrap();
            let flipped =
                ops::simplify(&ops::substitute_all(&right, &flip).unwrap())
                    .unwrap();

            assert_eq!(left, flipped, "{}", src);
            assert_ne!(left, right, "{}", src);
        }
    }

    #[test]
    fn operators_stay_to_the_left_of_primed_symbols() {
        let symbols = Symbols::new();
        let x: Expression = symbols.x().into();
        let shifted = bopp(&x.pow(2), Side::Right, &symbols).unwrap();

        assert_eq!(shifted.to_string(), "-1/4*∂p'^2 + i*x*∂p' + x^2");
    }

    #[test]
    fn prime_and_unprime() {
        let symbols = Symbols::new();
        let expr = parse("x*W(x, p) + p^2", &symbols).unwrap();

        let primed = make_prime(&expr, &symbols).unwrap();

        assert_eq!(primed.to_string(), "x'*W(x', p') + p'^2");
        assert_eq!(unprime(&primed, &symbols).unwrap(), expr);
    }

    #[test]
    fn shifting_twice_is_an_error() {
        let symbols = Symbols::new();
        let x: Expression = symbols.x().into();
        let shifted = bopp(&x, Side::Right, &symbols).unwrap();

        let got = bopp(&shifted, Side::Right, &symbols);

        assert!(matches!(got, Err(StarError::AlreadyShifted { .. })));
    }

    #[test]
    fn primed_input_is_an_error() {
        let symbols = Symbols::new();
        let x: Expression = symbols.x().into();
        let primed = make_prime(&x, &symbols).unwrap();

        let got = bopp(&primed, Side::Left, &symbols);

        assert!(matches!(got, Err(StarError::PrimedInput { .. })));
    }

    #[test]
    fn functions_cant_be_shifted() {
        let symbols = Symbols::new();

        let got = bopp(&symbols.wigner(), Side::Left, &symbols);

        assert!(matches!(
            got,
            Err(StarError::FunctionInShiftedOperand { .. })
        ));
    }
}
