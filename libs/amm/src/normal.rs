//! Standard normal CDF and inverse CDF in 64.64 fixed point
//!
//! Both functions are pure: the same input always produces the same raw
//! bits, which is what lets the engine recompute invariants reproducibly.
//!
//! - `cdf` uses the Abramowitz & Stegun 7.1.26 approximation of `erf`
//!   (max absolute error 1.5e-7 on `erf`, so 7.5e-8 on Φ).
//! - `inverse_cdf` uses Acklam's rational approximation with a tail split at
//!   `p = 0.02425` (relative error 1.15e-9).

use rmm_types::{FixedPoint64x64, FixedPointError};

type Fp = FixedPoint64x64;

const ONE: Fp = Fp::ONE;

/// |x| at which Φ is indistinguishable from 0 or 1 in 64.64
const CDF_SATURATION: Fp = Fp::from_int(32);

const FRAC_1_SQRT_2: Fp = Fp::from_raw(0xb504f333f9de6484);

// A&S 7.1.26
const ERF_P: Fp = Fp::from_raw(0x53dd02a4f5ee2e46);
const ERF_A: [Fp; 5] = [
    Fp::from_raw(0x413c831bb169f875),
    Fp::from_raw(-0x48d4c730f051a5ff),
    Fp::from_raw(0x16be1c55bae156b66),
    Fp::from_raw(-0x17401c57014c38f14),
    Fp::from_raw(0x10fb844255a12d72e),
];

// Acklam, central region numerator and denominator
const CENTRAL_NUM: [Fp; 6] = [
    Fp::from_raw(-0x27b263783c0a4ad72b),
    Fp::from_raw(0xdcf23381a01cd8122c),
    Fp::from_raw(-0x113edb2dc53b993a01e),
    Fp::from_raw(0x8a5b95a05a00d778b6),
    Fp::from_raw(-0x1eaa3034c08bcd020a),
    Fp::from_raw(0x281b2640aea8f104b),
];
const CENTRAL_DEN: [Fp; 6] = [
    Fp::from_raw(-0x3679e19c6009889943),
    Fp::from_raw(0xa195f9678213ba3674),
    Fp::from_raw(-0x9bb2f05816c68e543b),
    Fp::from_raw(0x42cd22c69fa6f7fb8c),
    Fp::from_raw(-0xd47dabf0a3c12cc22),
    ONE,
];

// Acklam, tail region numerator and denominator
const TAIL_NUM: [Fp; 6] = [
    Fp::from_raw(-0x1fe30d924acfe07),
    Fp::from_raw(-0x52889303a206e171),
    Fp::from_raw(-0x26698182e02eaf92f),
    Fp::from_raw(-0x28cbb458e07434f96),
    Fp::from_raw(0x45fe9fd3a9371caf2),
    Fp::from_raw(0x2f02b83c7f9f43934),
];
const TAIL_DEN: [Fp; 5] = [
    Fp::from_raw(0x1fe2d857ac9fd3d),
    Fp::from_raw(0x528d34ad640d8e1b),
    Fp::from_raw(0x271f44f915cc2c0c7),
    Fp::from_raw(0x3c120ed12b623132a),
    ONE,
];

/// Lower tail split point, 0.02425
const P_LOW: Fp = Fp::from_raw(0x6353f7ced916873);

/// Normal distribution approximations
pub struct NormalApprox;

impl NormalApprox {
    /// Φ(x), clamped to [0, 1]
    pub fn cdf(x: Fp) -> Result<Fp, FixedPointError> {
        if x >= CDF_SATURATION {
            return Ok(ONE);
        }
        if x <= CDF_SATURATION.checked_neg()? {
            return Ok(Fp::ZERO);
        }

        let z = x.checked_mul(FRAC_1_SQRT_2)?;
        let z_abs = z.checked_abs()?;
        let t = ONE.checked_div(ONE.checked_add(ERF_P.checked_mul(z_abs)?)?)?;

        // t * (a1 + t * (a2 + t * (a3 + t * (a4 + t * a5))))
        let mut poly = Fp::ZERO;
        for coefficient in ERF_A.iter().rev() {
            poly = poly.checked_add(*coefficient)?.checked_mul(t)?;
        }

        let gaussian = z_abs.checked_mul(z_abs)?.checked_neg()?.exp()?;
        let erf_abs = ONE.checked_sub(poly.checked_mul(gaussian)?)?;
        let erf = if z.is_negative() {
            erf_abs.checked_neg()?
        } else {
            erf_abs
        };

        let phi = ONE.checked_add(erf)?.checked_mul(Fp::HALF)?;
        Ok(phi.clamp(Fp::ZERO, ONE))
    }

    /// Φ⁻¹(p) for p strictly inside (0, 1)
    pub fn inverse_cdf(p: Fp) -> Result<Fp, FixedPointError> {
        if p <= Fp::ZERO || p >= ONE {
            return Err(FixedPointError::domain(
                "inverse_cdf",
                "probability outside (0, 1)",
            ));
        }

        let p_high = ONE.checked_sub(P_LOW)?;
        if p < P_LOW {
            Self::tail(p)
        } else if p <= p_high {
            let q = p.checked_sub(Fp::HALF)?;
            let r = q.checked_mul(q)?;
            let numerator = horner(&CENTRAL_NUM, r)?.checked_mul(q)?;
            numerator.checked_div(horner(&CENTRAL_DEN, r)?)
        } else {
            Self::tail(ONE.checked_sub(p)?)?.checked_neg()
        }
    }

    /// Lower-tail branch, `p < P_LOW`
    fn tail(p: Fp) -> Result<Fp, FixedPointError> {
        let q = p.ln()?.checked_mul(Fp::from_int(-2))?.sqrt()?;
        horner(&TAIL_NUM, q)?.checked_div(horner(&TAIL_DEN, q)?)
    }
}

/// Evaluate `c[0]·x^(n-1) + ... + c[n-1]`
fn horner(coefficients: &[Fp], x: Fp) -> Result<Fp, FixedPointError> {
    let mut acc = Fp::ZERO;
    for coefficient in coefficients {
        acc = acc.checked_mul(x)?.checked_add(*coefficient)?;
    }
    Ok(acc)
}
