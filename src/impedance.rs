//! Rectangular / polar conversions for branch impedances.
//!
//! The engine only ever consumes rectangular `(R, X)`; polar input is turned
//! into rectangular here, at the edge, before a case reaches [`crate::flow`].

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::FlowError;

/// Series impedance R + jX of a branch, in ohms.
///
/// Negative R or X is accepted; the engine is a pure arithmetic evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Impedance {
    pub r: f64,
    pub x: f64,
}

/// Either representation of an impedance, as exchanged with callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "lowercase")]
pub enum ImpedanceForm {
    Rectangular { r: f64, x: f64 },
    Polar { magnitude: f64, angle_deg: f64 },
}

impl Impedance {
    pub fn from_rectangular(r: f64, x: f64) -> Self {
        Self { r, x }
    }

    /// Builds an impedance from `|Z|` and its angle in degrees (any range).
    pub fn from_polar(magnitude: f64, angle_deg: f64) -> Result<Self, FlowError> {
        if magnitude < 0.0 {
            return Err(FlowError::InvalidImpedance { magnitude });
        }
        let z = Complex64::from_polar(magnitude, angle_deg.to_radians());
        Ok(Self { r: z.re, x: z.im })
    }

    /// Returns `(|Z|, angle)` with the angle in degrees within (-180, 180].
    ///
    /// Zero impedance maps to `(0, 0)` regardless of the signs of zero.
    pub fn to_polar(&self) -> (f64, f64) {
        if self.r == 0.0 && self.x == 0.0 {
            return (0.0, 0.0);
        }
        let (magnitude, theta) = Complex64::new(self.r, self.x).to_polar();
        let angle = theta.to_degrees();
        // atan2 lands in [-180, 180]; only the lower bound is outside the range
        (magnitude, if angle <= -180.0 { angle + 360.0 } else { angle })
    }

    /// R² + X², the denominator of the branch equations.
    pub fn norm_sqr(&self) -> f64 {
        Complex64::new(self.r, self.x).norm_sqr()
    }
}

impl From<Impedance> for ImpedanceForm {
    fn from(z: Impedance) -> Self {
        ImpedanceForm::Rectangular { r: z.r, x: z.x }
    }
}

impl ImpedanceForm {
    /// Resolves either form to a rectangular impedance.
    pub fn to_impedance(self) -> Result<Impedance, FlowError> {
        match self {
            ImpedanceForm::Rectangular { r, x } => Ok(Impedance::from_rectangular(r, x)),
            ImpedanceForm::Polar {
                magnitude,
                angle_deg,
            } => Impedance::from_polar(magnitude, angle_deg),
        }
    }
}

/// Converts an impedance into the other representation.
pub fn convert_impedance(form: ImpedanceForm) -> Result<ImpedanceForm, FlowError> {
    match form {
        ImpedanceForm::Rectangular { r, x } => {
            let (magnitude, angle_deg) = Impedance::from_rectangular(r, x).to_polar();
            Ok(ImpedanceForm::Polar {
                magnitude,
                angle_deg,
            })
        }
        polar @ ImpedanceForm::Polar { .. } => polar.to_impedance().map(ImpedanceForm::from),
    }
}

/// Reduces an angle in degrees into (-180, 180].
///
/// Angles already in range are returned untouched.
pub fn reduce_degrees(angle: f64) -> f64 {
    if angle > -180.0 && angle <= 180.0 {
        return angle;
    }
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}
