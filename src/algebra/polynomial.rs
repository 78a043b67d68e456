//! The canonical form every [`Expression`] is normalised into.
//!
//! A [`Polynomial`] is a sum of terms, each term being a [`Coefficient`]
//! times a [`Monomial`]. A monomial keeps its commuting factors sorted in a
//! map, followed by an ordered "word" of the factors which don't commute.
//! Two expressions are equal after normalisation exactly when their
//! polynomials are equal.

use crate::algebra::{AppliedFunction, Coefficient, Expression, Symbol};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive};
use std::{
    collections::BTreeMap,
    ops::{Add, Mul, Neg, Sub},
};

/// An indivisible factor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Atom {
    /// `sqrt(n)` for some square-free `n`.
    Sqrt(u64),
    Symbol(Symbol),
    Function(AppliedFunction),
}

impl Atom {
    pub fn is_commutative(&self) -> bool {
        match self {
            Atom::Sqrt(_) => true,
            Atom::Symbol(symbol) => symbol.is_commutative(),
            Atom::Function(function) => function.is_commutative(),
        }
    }

    pub fn to_expression(&self) -> Expression {
        match self {
            Atom::Sqrt(n) => {
                Expression::Constant(Coefficient::real(BigRational::from_integer(
                    BigInt::from(*n),
                )))
                .sqrt()
            },
            Atom::Symbol(symbol) => Expression::Symbol(symbol.clone()),
            Atom::Function(function) => Expression::Function(function.clone()),
        }
    }
}

/// A product of [`Atom`]s raised to positive powers.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Monomial {
    commutative: BTreeMap<Atom, u32>,
    word: Vec<(Atom, u32)>,
}

impl Monomial {
    pub fn one() -> Self { Monomial::default() }

    pub fn atom(atom: Atom) -> Self {
        let mut monomial = Monomial::one();
        monomial.push(atom, 1);
        monomial
    }

    pub fn is_one(&self) -> bool {
        self.commutative.is_empty() && self.word.is_empty()
    }

    /// The commuting factors, in canonical order.
    pub fn commutative(&self) -> impl Iterator<Item = (&Atom, u32)> + '_ {
        self.commutative.iter().map(|(atom, &exponent)| (atom, exponent))
    }

    /// The factors which don't commute, in the order they were multiplied.
    pub fn word(&self) -> &[(Atom, u32)] { &self.word }

    /// All factors, commuting ones first.
    pub fn factors(&self) -> impl Iterator<Item = (&Atom, u32)> + '_ {
        self.commutative().chain(
            self.word.iter().map(|(atom, exponent)| (atom, *exponent)),
        )
    }

    /// The same monomial with only its commuting factors.
    pub(crate) fn commutative_part(&self) -> Monomial {
        Monomial {
            commutative: self.commutative.clone(),
            word: Vec::new(),
        }
    }

    /// Remove one commuting factor entirely.
    pub(crate) fn without(&self, atom: &Atom) -> Monomial {
        let mut commutative = self.commutative.clone();
        commutative.remove(atom);

        Monomial {
            commutative,
            word: self.word.clone(),
        }
    }

    fn push(&mut self, atom: Atom, exponent: u32) {
        if exponent == 0 {
            return;
        }

        if atom.is_commutative() {
            *self.commutative.entry(atom).or_insert(0) += exponent;
            return;
        }

        if let Some((last, last_exponent)) = self.word.last_mut() {
            if *last == atom {
                *last_exponent += exponent;
                return;
            }
        }

        self.word.push((atom, exponent));
    }

    /// Multiply two monomials, returning any numeric factor which falls out
    /// (e.g. `sqrt(2)*sqrt(2) = 2`).
    fn multiply(&self, other: &Monomial) -> (Coefficient, Monomial) {
        let mut product = self.clone();

        for (atom, exponent) in other.factors() {
            product.push(atom.clone(), exponent);
        }

        let scale = product.reduce_radicals();
        (scale, product)
    }

    fn reduce_radicals(&mut self) -> Coefficient {
        let mut scale = BigInt::one();
        let radicals: Vec<(u64, u32)> = self
            .commutative
            .iter()
            .filter_map(|(atom, &exponent)| match atom {
                Atom::Sqrt(n) => Some((*n, exponent)),
                _ => None,
            })
            .collect();

        if radicals.is_empty() {
            return Coefficient::one();
        }

        self.commutative.retain(|atom, _| !matches!(atom, Atom::Sqrt(_)));

        // every radicand is square-free, so merging two of them only ever
        // pulls out their common factor
        let mut radicand: u64 = 1;
        let mut unmerged = Vec::new();

        for (n, exponent) in radicals {
            for _ in 0..exponent / 2 {
                scale *= BigInt::from(n);
            }
            if exponent % 2 == 0 {
                continue;
            }

            let common = gcd(radicand, n);
            match (radicand / common).checked_mul(n / common) {
                Some(merged) => {
                    scale *= BigInt::from(common);
                    radicand = merged;
                },
                None => unmerged.push(n),
            }
        }

        if radicand > 1 {
            self.commutative.insert(Atom::Sqrt(radicand), 1);
        }
        for n in unmerged {
            self.commutative.insert(Atom::Sqrt(n), 1);
        }

        Coefficient::real(BigRational::from_integer(scale))
    }

    /// Is this monomial made entirely of square roots?
    fn is_radical(&self) -> bool {
        self.word.is_empty()
            && self.commutative.keys().all(|atom| matches!(atom, Atom::Sqrt(_)))
    }

    pub fn to_expression(&self) -> Expression {
        Expression::product(self.factors().map(|(atom, exponent)| {
            let base = atom.to_expression();
            if exponent == 1 {
                base
            } else {
                base.pow(exponent)
            }
        }))
    }
}

/// A sum of terms in canonical form.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Polynomial {
    terms: BTreeMap<Monomial, Coefficient>,
}

impl Polynomial {
    pub fn zero() -> Self { Polynomial::default() }

    pub fn one() -> Self { Polynomial::constant(Coefficient::one()) }

    pub fn constant(value: Coefficient) -> Self {
        Polynomial::term(Monomial::one(), value)
    }

    pub fn atom(atom: Atom) -> Self {
        Polynomial::term(Monomial::atom(atom), Coefficient::one())
    }

    pub fn term(monomial: Monomial, coefficient: Coefficient) -> Self {
        let mut polynomial = Polynomial::zero();
        polynomial.add_term(monomial, coefficient);
        polynomial
    }

    pub fn is_zero(&self) -> bool { self.terms.is_empty() }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    pub fn terms(
        &self,
    ) -> impl Iterator<Item = (&Monomial, &Coefficient)> + '_ {
        self.terms.iter()
    }

    /// Get the value of this polynomial if it doesn't contain any atoms.
    pub fn as_constant(&self) -> Option<Coefficient> {
        match self.terms.len() {
            0 => Some(Coefficient::zero()),
            1 => self
                .terms
                .iter()
                .next()
                .filter(|(monomial, _)| monomial.is_one())
                .map(|(_, coefficient)| coefficient.clone()),
            _ => None,
        }
    }

    pub fn contains_function(&self) -> bool {
        self.terms.keys().any(|monomial| {
            monomial
                .factors()
                .any(|(atom, _)| matches!(atom, Atom::Function(_)))
        })
    }

    pub(crate) fn add_term(
        &mut self,
        monomial: Monomial,
        coefficient: Coefficient,
    ) {
        if coefficient.is_zero() {
            return;
        }

        let sum = match self.terms.remove(&monomial) {
            Some(existing) => existing + coefficient,
            None => coefficient,
        };

        if !sum.is_zero() {
            self.terms.insert(monomial, sum);
        }
    }

    pub fn scale(&self, factor: &Coefficient) -> Polynomial {
        let mut scaled = Polynomial::zero();

        for (monomial, coefficient) in &self.terms {
            scaled.add_term(monomial.clone(), coefficient.clone() * factor.clone());
        }

        scaled
    }

    pub fn pow(&self, exponent: u32) -> Polynomial {
        let mut result = Polynomial::one();

        for _ in 0..exponent {
            result = &result * self;
        }

        result
    }

    /// The multiplicative inverse, only defined for nonzero constants
    /// (possibly involving square roots).
    pub fn inverse(&self) -> Option<Polynomial> {
        if self.terms.len() != 1 {
            return None;
        }

        let (monomial, coefficient) = self.terms.iter().next()?;

        if !monomial.is_radical() {
            return None;
        }

        // 1/(c*sqrt(n)) = sqrt(n)/(c*n)
        let mut denominator = coefficient.clone();
        for (atom, _) in monomial.commutative() {
            if let Atom::Sqrt(n) = atom {
                denominator = denominator
                    * Coefficient::real(BigRational::from_integer(
                        BigInt::from(*n),
                    ));
            }
        }

        let scale = denominator.inverse()?;
        Some(Polynomial::term(monomial.clone(), scale))
    }

    /// Convert back into an [`Expression`], with terms and factors in
    /// canonical order.
    pub fn to_expression(&self) -> Expression {
        Expression::sum(self.terms.iter().map(|(monomial, coefficient)| {
            term_to_expression(monomial, coefficient)
        }))
    }
}

fn term_to_expression(
    monomial: &Monomial,
    coefficient: &Coefficient,
) -> Expression {
    if monomial.is_one() {
        return Expression::Constant(coefficient.clone());
    }

    let factors = monomial.to_expression();

    if coefficient.is_one() {
        factors
    } else if *coefficient == -Coefficient::one() {
        -factors
    } else {
        Expression::product(vec![Expression::Constant(coefficient.clone()), factors])
    }
}

/// The exact square root of a non-negative rational constant.
///
/// Returns `None` if the value is negative, complex, or too large to factor.
pub(crate) fn sqrt(value: &Coefficient) -> Option<Polynomial> {
    if !value.is_real() || value.re().is_negative() {
        return None;
    }
    if value.is_zero() {
        return Some(Polynomial::zero());
    }

    // sqrt(a/b) = sqrt(a*b)/b
    let numerator = value.re().numer();
    let denominator = value.re().denom();
    let radicand = (numerator * denominator).to_u64()?;
    let (square, free) = split_square_free(radicand);

    let coefficient = Coefficient::real(BigRational::new(
        BigInt::from(square),
        denominator.clone(),
    ));

    if free == 1 {
        Some(Polynomial::constant(coefficient))
    } else {
        Some(Polynomial::term(Monomial::atom(Atom::Sqrt(free)), coefficient))
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Split `n` into `square^2 * free`, where `free` is square-free.
fn split_square_free(mut n: u64) -> (u64, u64) {
    let mut square = 1;
    let mut free = 1;
    let mut factor = 2;

    while factor <= n / factor {
        let mut count = 0;
        while n % factor == 0 {
            n /= factor;
            count += 1;
        }

        for _ in 0..count / 2 {
            square *= factor;
        }
        if count % 2 == 1 {
            free *= factor;
        }

        factor += 1;
    }

    (square, free * n)
}

impl<'a> Add<&'a Polynomial> for &'a Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: &'a Polynomial) -> Polynomial {
        let mut sum = self.clone();

        for (monomial, coefficient) in &rhs.terms {
            sum.add_term(monomial.clone(), coefficient.clone());
        }

        sum
    }
}

impl<'a> Sub<&'a Polynomial> for &'a Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: &'a Polynomial) -> Polynomial { self + &-rhs }
}

impl<'a> Neg for &'a Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial { self.scale(&-Coefficient::one()) }
}

/// Multiplication distributes term by term, preserving the order of
/// noncommuting factors.
impl<'a> Mul<&'a Polynomial> for &'a Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: &'a Polynomial) -> Polynomial {
        let mut product = Polynomial::zero();

        for (left, left_coefficient) in &self.terms {
            for (right, right_coefficient) in &rhs.terms {
                let (scale, monomial) = left.multiply(right);
                let coefficient = left_coefficient.clone()
                    * right_coefficient.clone()
                    * scale;
                product.add_term(monomial, coefficient);
            }
        }

        product
    }
}
