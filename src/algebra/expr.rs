use crate::algebra::{ops::AlgebraError, Coefficient};
use num_traits::Zero;
use smol_str::SmolStr;
use std::{
    collections::BTreeSet,
    fmt::{self, Display, Formatter},
    ops::{Add, Div, Mul, Neg, Sub},
};

/// An expression.
///
/// Expressions are immutable trees. Every operation builds a new tree rather
/// than editing one in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Constant(Coefficient),
    Symbol(Symbol),
    /// A function symbol applied to a pair of coordinates, possibly
    /// differentiated.
    Function(AppliedFunction),
    Sum(Vec<Expression>),
    /// A product of factors. The order of the factors is significant because
    /// some symbols don't commute.
    Product(Vec<Expression>),
    Power {
        base: Box<Expression>,
        exponent: u32,
    },
    /// Negate the expression.
    Negate(Box<Expression>),
    /// Division by an expression which must simplify to a constant.
    Quotient {
        numerator: Box<Expression>,
        denominator: Box<Expression>,
    },
    /// The square root of a non-negative rational constant.
    Sqrt(Box<Expression>),
    /// An unevaluated partial derivative.
    Derivative {
        operand: Box<Expression>,
        variables: Vec<Symbol>,
    },
}

impl Expression {
    pub fn zero() -> Self { Expression::Constant(Coefficient::zero()) }

    pub fn one() -> Self { Expression::Constant(Coefficient::one()) }

    /// The imaginary unit, `i`.
    pub fn i() -> Self { Expression::Constant(Coefficient::i()) }

    pub fn integer(value: i64) -> Self {
        Expression::Constant(Coefficient::from_integer(value))
    }

    /// Multiply several factors together, keeping them in the order they
    /// were given.
    ///
    /// This is the multiplication used for noncommuting symbols. Nested
    /// products are flattened, which is fine because multiplication is still
    /// associative.
    pub fn product<I>(factors: I) -> Expression
    where
        I: IntoIterator<Item = Expression>,
    {
        let mut flattened = Vec::new();

        for factor in factors {
            match factor {
                Expression::Product(inner) => flattened.extend(inner),
                other => flattened.push(other),
            }
        }

        match flattened.len() {
            0 => Expression::one(),
            1 => flattened.remove(0),
            _ => Expression::Product(flattened),
        }
    }

    pub fn sum<I>(terms: I) -> Expression
    where
        I: IntoIterator<Item = Expression>,
    {
        let mut flattened = Vec::new();

        for term in terms {
            match term {
                Expression::Sum(inner) => flattened.extend(inner),
                other => flattened.push(other),
            }
        }

        match flattened.len() {
            0 => Expression::zero(),
            1 => flattened.remove(0),
            _ => Expression::Sum(flattened),
        }
    }

    pub fn pow(self, exponent: u32) -> Expression {
        Expression::Power {
            base: Box::new(self),
            exponent,
        }
    }

    pub fn sqrt(self) -> Expression { Expression::Sqrt(Box::new(self)) }

    /// An unevaluated partial derivative with respect to `variable`.
    pub fn derivative(self, variable: &Symbol) -> Expression {
        match self {
            Expression::Derivative {
                operand,
                mut variables,
            } => {
                variables.push(variable.clone());
                Expression::Derivative { operand, variables }
            },
            other => Expression::Derivative {
                operand: Box::new(other),
                variables: vec![variable.clone()],
            },
        }
    }

    /// Visit every node in the tree, parents before children.
    pub fn walk<F>(&self, visit: &mut F)
    where
        F: FnMut(&Expression),
    {
        visit(self);

        match self {
            Expression::Constant(_)
            | Expression::Symbol(_)
            | Expression::Function(_) => {},
            Expression::Sum(children) | Expression::Product(children) => {
                for child in children {
                    child.walk(visit);
                }
            },
            Expression::Power { base: inner, .. }
            | Expression::Negate(inner)
            | Expression::Sqrt(inner)
            | Expression::Derivative { operand: inner, .. } => {
                inner.walk(visit)
            },
            Expression::Quotient {
                numerator,
                denominator,
            } => {
                numerator.walk(visit);
                denominator.walk(visit);
            },
        }
    }

    /// Every [`Symbol`] mentioned by this expression, including function
    /// arguments and the variables of a derivative.
    pub fn symbols(&self) -> BTreeSet<Symbol> {
        let mut symbols = BTreeSet::new();

        self.walk(&mut |expr| match expr {
            Expression::Symbol(symbol) => {
                symbols.insert(symbol.clone());
            },
            Expression::Function(function) => {
                symbols.extend(function.arguments().iter().cloned());
            },
            Expression::Derivative { variables, .. } => {
                symbols.extend(variables.iter().cloned());
            },
            _ => {},
        });

        symbols
    }

    /// Every function symbol applied somewhere in this expression.
    pub fn functions(&self) -> BTreeSet<FunctionSymbol> {
        let mut functions = BTreeSet::new();

        self.walk(&mut |expr| {
            if let Expression::Function(applied) = expr {
                functions.insert(applied.function().clone());
            }
        });

        functions
    }

    pub fn contains_function(&self) -> bool {
        let mut found = false;
        self.walk(&mut |expr| {
            found |= matches!(expr, Expression::Function(_))
        });
        found
    }

    pub fn depends_on(&self, symbol: &Symbol) -> bool {
        self.symbols().contains(symbol)
    }

    /// Does this expression contain any symbol of the given kind?
    pub fn mentions(&self, kind: SymbolKind) -> bool {
        self.symbols().iter().any(|symbol| symbol.kind() == kind)
    }

    /// Can this expression be freely reordered within a product?
    pub fn is_commutative(&self) -> bool {
        self.symbols().iter().all(Symbol::is_commutative)
    }

    /// Does this expression contain neither symbols nor functions?
    pub fn is_constant(&self) -> bool {
        self.symbols().is_empty() && !self.contains_function()
    }

    pub(crate) fn precedence(&self) -> Precedence {
        match self {
            Expression::Sum(_) => Precedence::Sum,
            Expression::Product(_)
            | Expression::Quotient { .. }
            | Expression::Negate(_) => Precedence::Product,
            Expression::Power { .. } => Precedence::Power,
            Expression::Constant(c) => {
                if c.is_natural() || *c == Coefficient::i() {
                    Precedence::Atom
                } else if c.is_real() || c.re().is_zero() {
                    // things like "-3", "1/2" and "3*i/2"
                    Precedence::Product
                } else {
                    // complex numbers are always printed in parentheses
                    Precedence::Atom
                }
            },
            Expression::Symbol(_)
            | Expression::Function(_)
            | Expression::Sqrt(_)
            | Expression::Derivative { .. } => Precedence::Atom,
        }
    }

    pub(crate) fn starts_with_minus(&self) -> bool {
        match self {
            Expression::Negate(_) => true,
            Expression::Constant(c) => c.is_negative(),
            Expression::Product(factors) => {
                factors.first().map_or(false, Expression::starts_with_minus)
            },
            Expression::Quotient { numerator, .. } => {
                numerator.starts_with_minus()
            },
            _ => false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Precedence {
    Sum,
    Product,
    Power,
    Atom,
}

/// The role a [`Symbol`] plays in the algebra.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolKind {
    /// An ordinary real-valued symbol which commutes with everything.
    Real,
    /// A primed phase-space coordinate. Derivative operators to its left act
    /// on it, so it may not be reordered.
    Primed,
    /// A derivative operator placeholder which acts on every primed symbol
    /// to its right.
    Operator,
}

/// A named symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    name: SmolStr,
    kind: SymbolKind,
}

impl Symbol {
    /// Create an ordinary (real, commutative) symbol.
    pub fn real<S: Into<SmolStr>>(name: S) -> Self {
        Symbol {
            name: name.into(),
            kind: SymbolKind::Real,
        }
    }

    pub(crate) fn primed<S: Into<SmolStr>>(name: S) -> Self {
        Symbol {
            name: name.into(),
            kind: SymbolKind::Primed,
        }
    }

    pub(crate) fn operator<S: Into<SmolStr>>(name: S) -> Self {
        Symbol {
            name: name.into(),
            kind: SymbolKind::Operator,
        }
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn kind(&self) -> SymbolKind { self.kind }

    pub fn is_commutative(&self) -> bool { self.kind == SymbolKind::Real }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<Symbol> for Expression {
    fn from(symbol: Symbol) -> Expression { Expression::Symbol(symbol) }
}

impl From<&Symbol> for Expression {
    fn from(symbol: &Symbol) -> Expression {
        Expression::Symbol(symbol.clone())
    }
}

impl From<Coefficient> for Expression {
    fn from(value: Coefficient) -> Expression { Expression::Constant(value) }
}

impl From<i64> for Expression {
    fn from(value: i64) -> Expression { Expression::integer(value) }
}

/// The name of a phase-space function, such as the Wigner function `W`.
///
/// A function symbol isn't an [`Expression`] by itself. It has to be applied
/// to a pair of coordinates with [`FunctionSymbol::apply()`] first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionSymbol {
    name: SmolStr,
}

impl FunctionSymbol {
    pub fn new<S: Into<SmolStr>>(name: S) -> Self {
        FunctionSymbol { name: name.into() }
    }

    pub fn name(&self) -> &str { &self.name }

    /// Apply this function to two distinct real coordinates, `f(first,
    /// second)`.
    pub fn apply(
        &self,
        first: &Symbol,
        second: &Symbol,
    ) -> Result<Expression, AlgebraError> {
        if !first.is_commutative() || !second.is_commutative() {
            return Err(AlgebraError::InvalidFunctionArguments {
                function: self.name.clone(),
                reason: "the arguments must be real coordinates",
            });
        }

        let applied =
            AppliedFunction::new(self.clone(), [first.clone(), second.clone()])?;

        Ok(Expression::Function(applied))
    }
}

impl Display for FunctionSymbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A [`FunctionSymbol`] applied to two coordinates, together with how many
/// times it has been differentiated with respect to each of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppliedFunction {
    function: FunctionSymbol,
    arguments: [Symbol; 2],
    orders: [u32; 2],
}

impl AppliedFunction {
    pub(crate) fn new(
        function: FunctionSymbol,
        arguments: [Symbol; 2],
    ) -> Result<Self, AlgebraError> {
        if arguments[0] == arguments[1] {
            return Err(AlgebraError::InvalidFunctionArguments {
                function: function.name,
                reason: "the arguments must be two distinct coordinates",
            });
        }

        Ok(AppliedFunction {
            function,
            arguments,
            orders: [0, 0],
        })
    }

    pub fn function(&self) -> &FunctionSymbol { &self.function }

    pub fn arguments(&self) -> &[Symbol; 2] { &self.arguments }

    /// The number of times this function has been differentiated with
    /// respect to each argument.
    pub fn orders(&self) -> [u32; 2] { self.orders }

    pub fn derivative_count(&self) -> u32 { self.orders[0] + self.orders[1] }

    pub fn is_commutative(&self) -> bool {
        self.arguments.iter().all(Symbol::is_commutative)
    }

    /// The partial derivative with respect to `variable`, or `None` if the
    /// function doesn't depend on it.
    pub fn differentiate(&self, variable: &Symbol) -> Option<AppliedFunction> {
        let position = self.arguments.iter().position(|a| a == variable)?;
        let mut orders = self.orders;
        orders[position] += 1;

        Some(AppliedFunction {
            orders,
            ..self.clone()
        })
    }

    pub(crate) fn with_arguments(
        &self,
        arguments: [Symbol; 2],
    ) -> Result<AppliedFunction, AlgebraError> {
        let mut renamed = AppliedFunction::new(self.function.clone(), arguments)?;
        renamed.orders = self.orders;
        Ok(renamed)
    }

    /// The variables this function has been differentiated by, in the order
    /// they'd be written down.
    pub(crate) fn derivative_variables(&self) -> Vec<Symbol> {
        let mut variables = Vec::new();

        for (argument, &order) in self.arguments.iter().zip(&self.orders) {
            for _ in 0..order {
                variables.push(argument.clone());
            }
        }

        variables
    }

    pub(crate) fn write_call(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}, {})",
            self.function, self.arguments[0], self.arguments[1]
        )
    }
}

impl Display for AppliedFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.derivative_count() == 0 {
            return self.write_call(f);
        }

        write!(f, "Derivative(")?;
        self.write_call(f)?;
        for variable in self.derivative_variables() {
            write!(f, ", {}", variable)?;
        }
        write!(f, ")")
    }
}

// define some operator overloads to make constructing an expression easier.

impl Add for Expression {
    type Output = Expression;

    fn add(self, rhs: Expression) -> Expression {
        Expression::sum(vec![self, rhs])
    }
}

impl Sub for Expression {
    type Output = Expression;

    fn sub(self, rhs: Expression) -> Expression {
        Expression::sum(vec![self, -rhs])
    }
}

/// Multiplication never reorders its operands, so `a * b` and `b * a` are
/// different trees.
impl Mul for Expression {
    type Output = Expression;

    fn mul(self, rhs: Expression) -> Expression {
        Expression::product(vec![self, rhs])
    }
}

impl Div for Expression {
    type Output = Expression;

    fn div(self, rhs: Expression) -> Expression {
        Expression::Quotient {
            numerator: Box::new(self),
            denominator: Box::new(rhs),
        }
    }
}

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Self::Output { Expression::Negate(Box::new(self)) }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(value) => write!(f, "{}", value),
            Expression::Symbol(symbol) => write!(f, "{}", symbol),
            Expression::Function(function) => write!(f, "{}", function),
            Expression::Sum(terms) => write_sum(terms, f),
            Expression::Product(factors) => write_product(factors, f),
            Expression::Power { base, exponent } => {
                write_operand(base, base.precedence() < Precedence::Atom, f)?;
                write!(f, "^{}", exponent)
            },
            Expression::Negate(inner) => {
                write!(f, "-")?;
                let parens = inner.precedence() < Precedence::Product
                    || inner.starts_with_minus();
                write_operand(inner, parens, f)
            },
            Expression::Quotient {
                numerator,
                denominator,
            } => {
                write_operand(
                    numerator,
                    numerator.precedence() < Precedence::Product,
                    f,
                )?;
                write!(f, "/")?;
                write_operand(
                    denominator,
                    denominator.precedence() < Precedence::Atom,
                    f,
                )
            },
            Expression::Sqrt(operand) => write!(f, "sqrt({})", operand),
            Expression::Derivative { operand, variables } => {
                write!(f, "Derivative({}", operand)?;
                for variable in variables {
                    write!(f, ", {}", variable)?;
                }
                write!(f, ")")
            },
        }
    }
}

fn write_sum(terms: &[Expression], f: &mut Formatter<'_>) -> fmt::Result {
    if terms.is_empty() {
        return write!(f, "0");
    }

    for (i, term) in terms.iter().enumerate() {
        let rendered = if term.precedence() == Precedence::Sum {
            format!("({})", term)
        } else {
            term.to_string()
        };

        if i == 0 {
            write!(f, "{}", rendered)?;
        } else if let Some(rest) = rendered.strip_prefix('-') {
            write!(f, " - {}", rest)?;
        } else {
            write!(f, " + {}", rendered)?;
        }
    }

    Ok(())
}

fn write_product(factors: &[Expression], f: &mut Formatter<'_>) -> fmt::Result {
    if factors.is_empty() {
        return write!(f, "1");
    }

    for (i, factor) in factors.iter().enumerate() {
        if i > 0 {
            write!(f, "*")?;
        }

        let parens = factor.precedence() < Precedence::Product
            || (i > 0 && factor.starts_with_minus());
        write_operand(factor, parens, f)?;
    }

    Ok(())
}

fn write_operand(
    expr: &Expression,
    parens: bool,
    f: &mut Formatter<'_>,
) -> fmt::Result {
    if parens {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expression { Symbol::real("x").into() }

    fn p() -> Expression { Symbol::real("p").into() }

    #[test]
    fn display() {
        let w = FunctionSymbol::new("W")
            .apply(&Symbol::real("x"), &Symbol::real("p"))
            .unwrap();
        let inputs = vec![
            (Expression::integer(3), "3"),
            (Expression::i(), "i"),
            (x() + p(), "x + p"),
            (x() - p(), "x - p"),
            (x() * p(), "x*p"),
            (p() * x(), "p*x"),
            (x() / Expression::integer(2), "x/2"),
            ((x() + p()) * x(), "(x + p)*x"),
            ((x() + p()).pow(2), "(x + p)^2"),
            (-(x() + p()), "-(x + p)"),
            (-(-x()), "-(-x)"),
            (x() * -p(), "x*(-p)"),
            (
                Expression::Constant(Coefficient::from_ratio(-1, 2)) * x(),
                "-1/2*x",
            ),
            (
                x() + Expression::Constant(Coefficient::from_ratio(-1, 2)) * p(),
                "x - 1/2*p",
            ),
            (Expression::integer(2).sqrt(), "sqrt(2)"),
            (w.clone(), "W(x, p)"),
            (
                w.derivative(&Symbol::real("x")),
                "Derivative(W(x, p), x)",
            ),
            (
                x() / (Expression::integer(2) * p()),
                "x/(2*p)",
            ),
            (
                Expression::Constant(Coefficient::from_ratio(3, 2) * Coefficient::i())
                    .pow(2),
                "(3*i/2)^2",
            ),
            (
                Expression::Constant(Coefficient::one() + Coefficient::i()) * x(),
                "(1 + i)*x",
            ),
            (
                Expression::Constant(Coefficient::one() + Coefficient::i()).pow(2),
                "(1 + i)^2",
            ),
        ];

        for (expr, should_be) in inputs {
            let got = expr.to_string();
            assert_eq!(got, should_be);
        }
    }

    #[test]
    fn products_keep_their_order_and_flatten() {
        let got = x() * (p() * x());

        assert_eq!(got, Expression::Product(vec![x(), p(), x()]));
    }

    #[test]
    fn function_arguments_must_be_distinct_real_symbols() {
        let w = FunctionSymbol::new("W");
        let x = Symbol::real("x");

        assert!(w.apply(&x, &x).is_err());
        assert!(w.apply(&x, &Symbol::primed("p'")).is_err());
        assert!(w.apply(&x, &Symbol::real("p")).is_ok());
    }

    #[test]
    fn differentiating_an_applied_function_counts_orders() {
        let x = Symbol::real("x");
        let p = Symbol::real("p");
        let w = match FunctionSymbol::new("W").apply(&x, &p).unwrap() {
            Expression::Function(applied) => applied,
            _ => unreachable!(),
        };

        let got = w
            .differentiate(&p)
            .and_then(|d| d.differentiate(&x))
            .and_then(|d| d.differentiate(&p))
            .unwrap();

        assert_eq!(got.orders(), [1, 2]);
        assert_eq!(got.to_string(), "Derivative(W(x, p), x, p, p)");
        assert!(w.differentiate(&Symbol::real("t")).is_none());
    }

    #[test]
    fn commutativity_follows_the_symbols() {
        let primed = Expression::Symbol(Symbol::primed("x'"));

        assert!((x() * p()).is_commutative());
        assert!(!(x() * primed).is_commutative());
        assert!(Expression::integer(2).sqrt().is_constant());
    }
}
