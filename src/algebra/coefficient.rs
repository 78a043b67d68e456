//! Exact complex-rational numbers used as the coefficients of an
//! [`Expression`](crate::Expression).

use num_bigint::BigInt;
use num_complex::{Complex, Complex64};
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    ops::{Add, Mul, Neg, Sub},
};

/// A number of the form `a + b*i` where `a` and `b` are arbitrary precision
/// rationals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coefficient(Complex<BigRational>);

impl Coefficient {
    pub fn new(re: BigRational, im: BigRational) -> Self {
        Coefficient(Complex::new(re, im))
    }

    pub fn real(value: BigRational) -> Self {
        Coefficient::new(value, BigRational::zero())
    }

    pub fn zero() -> Self { Coefficient::from_integer(0) }

    pub fn one() -> Self { Coefficient::from_integer(1) }

    /// The imaginary unit.
    pub fn i() -> Self {
        Coefficient::new(BigRational::zero(), BigRational::one())
    }

    pub fn from_integer(value: i64) -> Self {
        Coefficient::real(BigRational::from_integer(BigInt::from(value)))
    }

    /// Create the real number `numerator/denominator`.
    ///
    /// # Panics
    ///
    /// If `denominator` is zero.
    pub fn from_ratio(numerator: i64, denominator: i64) -> Self {
        Coefficient::real(BigRational::new(
            BigInt::from(numerator),
            BigInt::from(denominator),
        ))
    }

    pub fn re(&self) -> &BigRational { &self.0.re }

    pub fn im(&self) -> &BigRational { &self.0.im }

    pub fn is_zero(&self) -> bool { self.0.re.is_zero() && self.0.im.is_zero() }

    pub fn is_one(&self) -> bool { self.0.re.is_one() && self.0.im.is_zero() }

    pub fn is_real(&self) -> bool { self.0.im.is_zero() }

    /// Does this number print with a leading minus sign?
    pub fn is_negative(&self) -> bool {
        if self.0.re.is_zero() {
            self.0.im.is_negative()
        } else {
            self.0.im.is_zero() && self.0.re.is_negative()
        }
    }

    /// Is this a non-negative integer, the only kind of number which can be
    /// written without any operators?
    pub(crate) fn is_natural(&self) -> bool {
        self.0.im.is_zero()
            && self.0.re.is_integer()
            && !self.0.re.is_negative()
    }

    pub fn inverse(&self) -> Option<Coefficient> {
        if self.is_zero() {
            return None;
        }

        let Complex { re, im } = &self.0;
        let norm = re * re + im * im;

        Some(Coefficient::new(re / &norm, -(im / &norm)))
    }

    pub fn pow(&self, exponent: u32) -> Coefficient {
        let mut result = Coefficient::one();

        for _ in 0..exponent {
            result = result * self.clone();
        }

        result
    }

    /// Get the nearest floating point approximation.
    pub fn to_complex64(&self) -> Complex64 {
        Complex64::new(
            self.0.re.to_f64().unwrap_or(std::f64::NAN),
            self.0.im.to_f64().unwrap_or(std::f64::NAN),
        )
    }

    pub fn to_latex(&self) -> String {
        let Complex { re, im } = &self.0;

        if im.is_zero() {
            return latex_rational(re);
        }
        if re.is_zero() {
            return latex_imaginary(im);
        }

        let (sign, im) = if im.is_negative() {
            ("-", -im.clone())
        } else {
            ("+", im.clone())
        };

        format!(
            "\\left({} {} {}\\right)",
            latex_rational(re),
            sign,
            latex_imaginary(&im)
        )
    }
}

impl PartialOrd for Coefficient {
    fn partial_cmp(&self, other: &Coefficient) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coefficient {
    fn cmp(&self, other: &Coefficient) -> Ordering {
        self.0
            .re
            .cmp(&other.0.re)
            .then_with(|| self.0.im.cmp(&other.0.im))
    }
}

impl From<i64> for Coefficient {
    fn from(value: i64) -> Coefficient { Coefficient::from_integer(value) }
}

impl From<BigRational> for Coefficient {
    fn from(value: BigRational) -> Coefficient { Coefficient::real(value) }
}

impl Add for Coefficient {
    type Output = Coefficient;

    fn add(self, rhs: Coefficient) -> Coefficient { Coefficient(self.0 + rhs.0) }
}

impl Sub for Coefficient {
    type Output = Coefficient;

    fn sub(self, rhs: Coefficient) -> Coefficient { Coefficient(self.0 - rhs.0) }
}

impl Mul for Coefficient {
    type Output = Coefficient;

    fn mul(self, rhs: Coefficient) -> Coefficient { Coefficient(self.0 * rhs.0) }
}

impl Neg for Coefficient {
    type Output = Coefficient;

    fn neg(self) -> Coefficient { Coefficient(-self.0) }
}

impl Display for Coefficient {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Complex { re, im } = &self.0;

        if im.is_zero() {
            return write!(f, "{}", re);
        }
        if re.is_zero() {
            return write_imaginary(im, f);
        }

        write!(f, "({}", re)?;
        if im.is_negative() {
            write!(f, " - ")?;
            write_imaginary(&-im.clone(), f)?;
        } else {
            write!(f, " + ")?;
            write_imaginary(im, f)?;
        }
        write!(f, ")")
    }
}

fn write_imaginary(im: &BigRational, f: &mut Formatter<'_>) -> fmt::Result {
    if im.is_negative() {
        write!(f, "-")?;
    }

    let magnitude = im.abs();

    if magnitude.numer().is_one() {
        write!(f, "i")?;
    } else {
        write!(f, "{}*i", magnitude.numer())?;
    }

    if !magnitude.denom().is_one() {
        write!(f, "/{}", magnitude.denom())?;
    }

    Ok(())
}

fn latex_rational(value: &BigRational) -> String {
    let sign = if value.is_negative() { "-" } else { "" };
    let magnitude = value.abs();

    if magnitude.denom().is_one() {
        format!("{}{}", sign, magnitude.numer())
    } else {
        format!(
            "{}\\frac{{{}}}{{{}}}",
            sign,
            magnitude.numer(),
            magnitude.denom()
        )
    }
}

fn latex_imaginary(im: &BigRational) -> String {
    let sign = if im.is_negative() { "-" } else { "" };
    let magnitude = im.abs();
    let numerator = if magnitude.numer().is_one() {
        String::from("i")
    } else {
        format!("{} i", magnitude.numer())
    };

    if magnitude.denom().is_one() {
        format!("{}{}", sign, numerator)
    } else {
        format!("{}\\frac{{{}}}{{{}}}", sign, numerator, magnitude.denom())
    }
}
