//! Assembling the Moyal equation of motion for a Wigner function.

use crate::{
    algebra::{ops, AlgebraError, Expression, FunctionSymbol, ParseError},
    star::{star, StarError},
    Symbols,
};
use std::fmt::{self, Display, Formatter};

/// An equation, `lhs = rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub lhs: Expression,
    pub rhs: Expression,
}

impl Equation {
    pub fn new(lhs: Expression, rhs: Expression) -> Self {
        Equation { lhs, rhs }
    }

    /// Parse an equation like `Derivative(W(x, p), t) = x*W(x, p)`.
    ///
    /// Text without an `=` is treated as `0 = rhs`.
    pub fn parse(s: &str, symbols: &Symbols) -> Result<Self, ParseError> {
        match s.find('=') {
            Some(index) => {
                let (left, right) = s.split_at(index);
                let right = &right[1..];
                Ok(Equation::new(
                    crate::parse(left, symbols)?,
                    crate::parse(right, symbols)?,
                ))
            },
            None => Ok(Equation::new(Expression::zero(), crate::parse(s, symbols)?)),
        }
    }

    /// Group the right-hand side by derivatives of `function`.
    pub fn collected(
        &self,
        function: &FunctionSymbol,
    ) -> Result<Equation, AlgebraError> {
        Ok(Equation::new(
            self.lhs.clone(),
            ops::collect_by_derivative(&self.rhs, function)?,
        ))
    }

    pub fn to_latex(&self) -> String {
        format!("{} = {}", self.lhs.to_latex(), self.rhs.to_latex())
    }
}

impl Display for Equation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.lhs, self.rhs)
    }
}

/// The Moyal equation of motion for `wigner` under `hamiltonian`,
/// `∂W/∂t = -i (H ⋆ W - W ⋆ H)`.
pub fn moyal_equation(
    hamiltonian: &Expression,
    wigner: &Expression,
    symbols: &Symbols,
) -> Result<Equation, StarError> {
    let left = star(hamiltonian, wigner, symbols)?;
    let right = star(wigner, hamiltonian, symbols)?;

    Ok(Equation::new(
        wigner.clone().derivative(symbols.t()),
        commutator_rhs(&left, &right)?,
    ))
}

/// Build the equation of motion for [`Symbols::wigner()`] from the
/// already-calculated `H ⋆ W` and `W ⋆ H`.
pub fn assemble(
    left_product: &Expression,
    right_product: &Expression,
    symbols: &Symbols,
) -> Result<Equation, AlgebraError> {
    Ok(Equation::new(
        symbols.wigner().derivative(symbols.t()),
        commutator_rhs(left_product, right_product)?,
    ))
}

fn commutator_rhs(
    left_product: &Expression,
    right_product: &Expression,
) -> Result<Expression, AlgebraError> {
    let commutator = left_product.clone() - right_product.clone();
    ops::simplify(&(-Expression::i() * commutator))
}

/// The annihilation operator's phase-space symbol, `(x + i p)/√2`.
pub fn annihilation(symbols: &Symbols) -> Expression {
    (Expression::from(symbols.x()) + symbols.i() * Expression::from(symbols.p()))
        / Expression::integer(2).sqrt()
}

/// The creation operator's phase-space symbol, `(x - i p)/√2`.
pub fn creation(symbols: &Symbols) -> Expression {
    (Expression::from(symbols.x()) - symbols.i() * Expression::from(symbols.p()))
        / Expression::integer(2).sqrt()
}

/// The harmonic oscillator Hamiltonian (with `ħ = m = ω = 1`),
/// `a† ⋆ a`.
pub fn oscillator_hamiltonian(
    symbols: &Symbols,
) -> Result<Expression, StarError> {
    star(&creation(symbols), &annihilation(symbols), symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn the_oscillator_hamiltonian() {
        let symbols = Symbols::new();

        let got = oscillator_hamiltonian(&symbols).unwrap();

        assert_eq!(got.to_string(), "-1/2 + 1/2*p^2 + 1/2*x^2");
    }

    #[test]
    fn a_star_a_dagger_is_shifted_by_one() {
        let symbols = Symbols::new();

        let got =
            star(&annihilation(&symbols), &creation(&symbols), &symbols).unwrap();

        assert_eq!(got.to_string(), "1/2 + 1/2*p^2 + 1/2*x^2");
    }

    #[test]
    fn the_oscillators_equation_of_motion() {
        let symbols = Symbols::new();
        let hamiltonian = oscillator_hamiltonian(&symbols).unwrap();

        let got =
            moyal_equation(&hamiltonian, &symbols.wigner(), &symbols).unwrap();

        assert_eq!(
            got.to_string(),
            "Derivative(W(x, p), t) = -p*Derivative(W(x, p), x) + x*Derivative(W(x, p), p)"
        );
    }

    #[test]
    fn assembling_precalculated_products() {
        let symbols = Symbols::new();
        let hamiltonian = oscillator_hamiltonian(&symbols).unwrap();
        let w = symbols.wigner();
        let left = star(&hamiltonian, &w, &symbols).unwrap();
        let right = star(&w, &hamiltonian, &symbols).unwrap();

        let got = assemble(&left, &right, &symbols).unwrap();

        let should_be = moyal_equation(&hamiltonian, &w, &symbols).unwrap();
        assert_eq!(got, should_be);
    }

    #[test]
    fn a_free_particle_just_drifts() {
        let symbols = Symbols::new();
        let hamiltonian = parse("p^2/2", &symbols).unwrap();

        let got =
            moyal_equation(&hamiltonian, &symbols.wigner(), &symbols).unwrap();

        assert_eq!(got.rhs.to_string(), "-p*Derivative(W(x, p), x)");
    }

    #[test]
    fn render_the_equation_as_latex() {
        let symbols = Symbols::new();
        let equation =
            Equation::parse("Derivative(W(x, p), t) = x*W(x, p)", &symbols)
                .unwrap();

        assert_eq!(
            equation.to_latex(),
            "\\frac{\\partial W\\left(x, p\\right)}{\\partial t} = x W\\left(x, p\\right)"
        );
    }
}
