//! The symbolic algebra system.

mod coefficient;
mod expr;
mod latex;
pub mod ops;
mod parse;
pub mod polynomial;

pub use coefficient::Coefficient;
pub use expr::{AppliedFunction, Expression, FunctionSymbol, Symbol, SymbolKind};
pub use ops::AlgebraError;
pub use parse::{parse, ParseError, TokenKind, MAX_EXPONENT};
pub use polynomial::Polynomial;
