//! Moyal star-products and phase-space equations of motion, calculated
//! symbolically using the Bopp shift.
//!
//! ```rust
//! use moyalstar::{moyal_equation, oscillator_hamiltonian, Symbols};
//!
//! let symbols = Symbols::new();
//! let hamiltonian = oscillator_hamiltonian(&symbols).unwrap();
//!
//! let equation =
//!     moyal_equation(&hamiltonian, &symbols.wigner(), &symbols).unwrap();
//!
//! assert_eq!(
//!     equation.to_string(),
//!     "Derivative(W(x, p), t) = -p*Derivative(W(x, p), x) + x*Derivative(W(x, p), p)"
//! );
//! ```

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

pub mod algebra;
pub mod bopp;
mod equations;
pub mod star;
mod symbols;

pub use algebra::{parse, Expression, ParseError};
pub use bopp::{bopp, make_prime, Side};
pub use equations::{
    annihilation, assemble, creation, moyal_equation, oscillator_hamiltonian,
    Equation,
};
pub use star::{star, star_commutator, star_unevaluated, star_via, Path, StarError};
pub use symbols::Symbols;
