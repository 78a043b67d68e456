use crate::algebra::{Expression, FunctionSymbol, Symbol};
use smol_str::SmolStr;
use std::collections::BTreeMap;

/// The symbols used when working in phase space.
///
/// A single [`Symbols`] table is created for a session and passed to every
/// computation, so two expressions built from the same table always agree on
/// what `x`, `p` and `W` mean.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbols {
    x: Symbol,
    p: Symbol,
    x_primed: Symbol,
    p_primed: Symbol,
    dx: Symbol,
    dp: Symbol,
    t: Symbol,
    w: FunctionSymbol,
    functions: BTreeMap<SmolStr, FunctionSymbol>,
}

impl Symbols {
    pub fn new() -> Self {
        let w = FunctionSymbol::new("W");
        let mut functions = BTreeMap::new();
        functions.insert(SmolStr::from(w.name()), w.clone());

        Symbols {
            x: Symbol::real("x"),
            p: Symbol::real("p"),
            x_primed: Symbol::primed("x'"),
            p_primed: Symbol::primed("p'"),
            dx: Symbol::operator("∂x'"),
            dp: Symbol::operator("∂p'"),
            t: Symbol::real("t"),
            w,
            functions,
        }
    }

    /// Get every symbol at once, in the order `(i, W, x, p, x', p', ∂x',
    /// ∂p')`.
    pub fn all(
        &self,
    ) -> (
        Expression,
        &FunctionSymbol,
        &Symbol,
        &Symbol,
        &Symbol,
        &Symbol,
        &Symbol,
        &Symbol,
    ) {
        (
            self.i(),
            &self.w,
            &self.x,
            &self.p,
            &self.x_primed,
            &self.p_primed,
            &self.dx,
            &self.dp,
        )
    }

    /// The imaginary unit.
    pub fn i(&self) -> Expression { Expression::i() }

    /// The Wigner function, `W`.
    pub fn w(&self) -> &FunctionSymbol { &self.w }

    pub fn x(&self) -> &Symbol { &self.x }

    pub fn p(&self) -> &Symbol { &self.p }

    pub fn x_primed(&self) -> &Symbol { &self.x_primed }

    pub fn p_primed(&self) -> &Symbol { &self.p_primed }

    /// The operator which differentiates with respect to `x'`.
    pub fn dx(&self) -> &Symbol { &self.dx }

    /// The operator which differentiates with respect to `p'`.
    pub fn dp(&self) -> &Symbol { &self.dp }

    /// Time.
    pub fn t(&self) -> &Symbol { &self.t }

    /// The Wigner function applied to the phase-space coordinates,
    /// `W(x, p)`.
    pub fn wigner(&self) -> Expression {
        self.w
            .apply(&self.x, &self.p)
            .expect("x and p are always distinct real symbols")
    }

    /// Declare a real parameter (e.g. a mass or frequency).
    pub fn real<S: Into<SmolStr>>(&self, name: S) -> Symbol {
        Symbol::real(name)
    }

    /// Declare another function symbol which may be applied to phase-space
    /// coordinates.
    pub fn declare_function<S: Into<SmolStr>>(
        &mut self,
        name: S,
    ) -> FunctionSymbol {
        let name = name.into();

        self.functions
            .entry(name.clone())
            .or_insert_with(|| FunctionSymbol::new(name))
            .clone()
    }

    /// Find a previously declared function symbol.
    pub fn function(&self, name: &str) -> Option<&FunctionSymbol> {
        self.functions.get(name)
    }

    /// Resolve a name to one of the well-known constants or symbols.
    pub fn lookup(&self, name: &str) -> Option<Expression> {
        match name {
            "i" => Some(self.i()),
            _ => [&self.x, &self.p, &self.t]
                .iter()
                .find(|symbol| symbol.name() == name)
                .map(|&symbol| Expression::from(symbol)),
        }
    }

    /// The primed coordinate a derivative operator acts on.
    pub(crate) fn operand_of(&self, operator: &Symbol) -> Option<&Symbol> {
        if *operator == self.dx {
            Some(&self.x_primed)
        } else if *operator == self.dp {
            Some(&self.p_primed)
        } else {
            None
        }
    }

    /// Substitutions which replace the coordinates with their primed
    /// counterparts.
    pub(crate) fn priming(&self) -> [(Symbol, Expression); 2] {
        [
            (self.x.clone(), Expression::from(&self.x_primed)),
            (self.p.clone(), Expression::from(&self.p_primed)),
        ]
    }

    /// The inverse of [`Symbols::priming()`].
    pub(crate) fn unpriming(&self) -> [(Symbol, Expression); 2] {
        [
            (self.x_primed.clone(), Expression::from(&self.x)),
            (self.p_primed.clone(), Expression::from(&self.p)),
        ]
    }
}

impl Default for Symbols {
    fn default() -> Self { Symbols::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::SymbolKind;

    #[test]
    fn the_symbols_have_the_right_kinds() {
        let symbols = Symbols::new();

        let (i, w, x, p, x_primed, p_primed, dx, dp) = symbols.all();

        assert_eq!(i, Expression::i());
        assert_eq!(w.name(), "W");
        assert_eq!(x.kind(), SymbolKind::Real);
        assert_eq!(p.kind(), SymbolKind::Real);
        assert_eq!(x_primed.kind(), SymbolKind::Primed);
        assert_eq!(p_primed.kind(), SymbolKind::Primed);
        assert_eq!(dx.kind(), SymbolKind::Operator);
        assert_eq!(dp.kind(), SymbolKind::Operator);
    }

    #[test]
    fn operators_act_on_the_matching_primed_coordinate() {
        let symbols = Symbols::new();

        assert_eq!(symbols.operand_of(symbols.dx()), Some(symbols.x_primed()));
        assert_eq!(symbols.operand_of(symbols.dp()), Some(symbols.p_primed()));
        assert_eq!(symbols.operand_of(symbols.x()), None);
    }

    #[test]
    fn declare_extra_functions() {
        let mut symbols = Symbols::new();
        assert!(symbols.function("rho").is_none());

        let rho = symbols.declare_function("rho");

        assert_eq!(symbols.function("rho"), Some(&rho));
        assert_eq!(symbols.declare_function("rho"), rho);
    }

    #[test]
    fn look_up_well_known_names() {
        let symbols = Symbols::new();

        assert_eq!(symbols.lookup("i"), Some(Expression::i()));
        assert_eq!(symbols.lookup("p"), Some(Expression::from(symbols.p())));
        assert_eq!(symbols.lookup("omega"), None);
    }
}
