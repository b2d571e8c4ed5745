//! # core.rs
//!
//! Numeric backend abstraction for the evaluator.
//!
//! The `Scalar` trait lists every operation the evaluator and the built-in
//! functions need. It is implemented for `f64` (the strict real evaluator)
//! and for `num_complex::Complex<f64>` (the complex evaluator), so a single
//! tree-walk serves both.

use num_complex::{Complex, ComplexFloat};
use num_traits::{One, Zero};

/// Operations required from a number type to evaluate an expression tree.
pub trait Scalar: Copy + Send + Sync + std::fmt::Debug + 'static {
    fn from_f64(v: f64) -> Self;

    /// The value as a real number, if it has no imaginary part.
    fn as_real(&self) -> Option<f64>;
    /// Magnitude used for the division-by-zero check.
    fn magnitude(&self) -> f64;
    fn is_finite(&self) -> bool;

    fn is_zero(&self) -> bool {
        self.magnitude() == 0.0
    }

    fn neg(&self) -> Self;
    fn add(&self, rhs: &Self) -> Self;
    fn sub(&self, rhs: &Self) -> Self;
    fn mul(&self, rhs: &Self) -> Self;
    fn div(&self, rhs: &Self) -> Self;
    fn pow(&self, rhs: &Self) -> Self;

    /// Whether `self ^ exponent` leaves the domain of this number type.
    fn pow_outside_domain(&self, exponent: &Self) -> bool;

    fn sin(&self) -> Self;
    fn cos(&self) -> Self;
    fn tan(&self) -> Self;
    fn asin(&self) -> Self;
    fn acos(&self) -> Self;
    fn atan(&self) -> Self;
    fn sinh(&self) -> Self;
    fn cosh(&self) -> Self;
    fn tanh(&self) -> Self;
    fn exp(&self) -> Self;
    fn ln(&self) -> Self;
    fn log10(&self) -> Self;
    fn sqrt(&self) -> Self;
    fn abs(&self) -> Self;
    fn ceil(&self) -> Self;
    fn floor(&self) -> Self;
    fn round(&self) -> Self;
}

impl Scalar for f64 {
    fn from_f64(v: f64) -> Self { v }

    fn as_real(&self) -> Option<f64> { Some(*self) }
    fn magnitude(&self) -> f64 { f64::abs(*self) }
    fn is_finite(&self) -> bool { f64::is_finite(*self) }

    fn neg(&self) -> Self { -*self }
    fn add(&self, rhs: &Self) -> Self { self + rhs }
    fn sub(&self, rhs: &Self) -> Self { self - rhs }
    fn mul(&self, rhs: &Self) -> Self { self * rhs }
    fn div(&self, rhs: &Self) -> Self { self / rhs }
    fn pow(&self, rhs: &Self) -> Self { self.powf(*rhs) }

    fn pow_outside_domain(&self, exponent: &Self) -> bool {
        *self < 0.0 && exponent.fract() != 0.0
    }

    fn sin(&self) -> Self { f64::sin(*self) }
    fn cos(&self) -> Self { f64::cos(*self) }
    fn tan(&self) -> Self { f64::tan(*self) }
    fn asin(&self) -> Self { f64::asin(*self) }
    fn acos(&self) -> Self { f64::acos(*self) }
    fn atan(&self) -> Self { f64::atan(*self) }
    fn sinh(&self) -> Self { f64::sinh(*self) }
    fn cosh(&self) -> Self { f64::cosh(*self) }
    fn tanh(&self) -> Self { f64::tanh(*self) }
    fn exp(&self) -> Self { f64::exp(*self) }
    fn ln(&self) -> Self { f64::ln(*self) }
    fn log10(&self) -> Self { f64::log10(*self) }
    fn sqrt(&self) -> Self { f64::sqrt(*self) }
    fn abs(&self) -> Self { f64::abs(*self) }
    fn ceil(&self) -> Self { f64::ceil(*self) }
    fn floor(&self) -> Self { f64::floor(*self) }
    fn round(&self) -> Self { f64::round(*self) }
}

/// Integral exponents small enough for `powi`.
fn as_i32_exponent(z: &Complex<f64>) -> Option<i32> {
    let in_range = (i32::MIN as f64..=i32::MAX as f64).contains(&z.re);
    (z.im == 0.0 && z.re.fract() == 0.0 && in_range).then_some(z.re as i32)
}

impl Scalar for Complex<f64> {
    fn from_f64(v: f64) -> Self { Complex::from(v) }

    fn as_real(&self) -> Option<f64> {
        (self.im == 0.0).then_some(self.re)
    }
    fn magnitude(&self) -> f64 { self.norm() }
    fn is_finite(&self) -> bool { self.re.is_finite() && self.im.is_finite() }

    fn neg(&self) -> Self { -*self }
    fn add(&self, rhs: &Self) -> Self { self + rhs }
    fn sub(&self, rhs: &Self) -> Self { self - rhs }
    fn mul(&self, rhs: &Self) -> Self { self * rhs }
    fn div(&self, rhs: &Self) -> Self { self / rhs }

    fn pow(&self, rhs: &Self) -> Self {
        // integral powers stay exact on the real axis
        match as_i32_exponent(rhs) {
            Some(n) => ComplexFloat::powi(*self, n),
            None if Scalar::is_zero(self) => Complex::zero(),
            None => ComplexFloat::powc(*self, *rhs),
        }
    }

    fn pow_outside_domain(&self, _exponent: &Self) -> bool {
        false
    }

    fn sin(&self) -> Self { ComplexFloat::sin(*self) }
    fn cos(&self) -> Self { ComplexFloat::cos(*self) }
    fn tan(&self) -> Self { ComplexFloat::tan(*self) }
    fn asin(&self) -> Self { ComplexFloat::asin(*self) }
    fn acos(&self) -> Self { ComplexFloat::acos(*self) }
    fn atan(&self) -> Self { ComplexFloat::atan(*self) }
    fn sinh(&self) -> Self { ComplexFloat::sinh(*self) }
    fn cosh(&self) -> Self { ComplexFloat::cosh(*self) }
    fn tanh(&self) -> Self { ComplexFloat::tanh(*self) }
    fn exp(&self) -> Self { ComplexFloat::exp(*self) }
    fn ln(&self) -> Self { ComplexFloat::ln(*self) }
    fn log10(&self) -> Self { ComplexFloat::log10(*self) }
    fn sqrt(&self) -> Self { ComplexFloat::sqrt(*self) }
    fn abs(&self) -> Self { Complex::from(self.norm()) }
    fn ceil(&self) -> Self { Complex::new(self.re.ceil(), self.im.ceil()) }
    fn floor(&self) -> Self { Complex::new(self.re.floor(), self.im.floor()) }
    fn round(&self) -> Self { Complex::new(self.re.round(), self.im.round()) }
}

/// The multiplicative identity for any backend.
pub(crate) fn one<T: Scalar>() -> T {
    T::from_f64(<f64 as One>::one())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_real_pow_domain() {
        assert!(Scalar::pow_outside_domain(&-8.0_f64, &(1.0 / 3.0)));
        assert!(!Scalar::pow_outside_domain(&-8.0_f64, &3.0));
        assert!(!Scalar::pow_outside_domain(&8.0_f64, &0.5));
    }

    #[test]
    fn test_real_sqrt_of_negative_is_not_finite() {
        assert!(!Scalar::is_finite(&Scalar::sqrt(&-1.0_f64)));
    }

    #[test]
    fn test_complex_sqrt_of_negative() {
        let z = Scalar::sqrt(&Complex::from(-1.0));
        assert_abs_diff_eq!(z.re, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(z.im, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_complex_integral_pow_stays_real() {
        let z = Scalar::pow(&Complex::from(-2.0), &Complex::from(2.0));
        assert_eq!(z, Complex::new(4.0, 0.0));
        assert_eq!(z.as_real(), Some(4.0));
    }

    #[test]
    fn test_complex_cube_root_of_negative() {
        let z = Scalar::pow(&Complex::from(-8.0), &Complex::from(1.0 / 3.0));
        // principal root: 2 * e^(i*pi/3)
        assert_abs_diff_eq!(z.re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(z.im, 3.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_one() {
        assert_eq!(one::<f64>(), 1.0);
        assert_eq!(one::<Complex<f64>>(), Complex::new(1.0, 0.0));
    }
}
