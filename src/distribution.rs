//! Slot distribution types.
//!
//! A distribution declares the domain of one slot. The ledger itself never
//! samples from it; distributions are part of the slot schema that a restored
//! store is validated against, and they drive the baseline
//! [`RandomStrategy`](crate::strategy::RandomStrategy).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::param::ParamValue;

/// Real-valued domain `[low, high]`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FloatDistribution {
    /// Inclusive lower bound.
    pub low: f64,
    /// Inclusive upper bound.
    pub high: f64,
    /// Values are spread evenly in `ln` space; requires `low > 0`.
    pub log_scale: bool,
    /// Grid spacing from `low`, if discretized.
    pub step: Option<f64>,
}

/// Integer domain `[low, high]`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntDistribution {
    /// Inclusive lower bound.
    pub low: i64,
    /// Inclusive upper bound.
    pub high: i64,
    /// Values are spread evenly in `ln` space; requires `low > 0`.
    pub log_scale: bool,
    /// Grid spacing from `low`, if discretized.
    pub step: Option<i64>,
}

/// Unordered choices, identified by index.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CategoricalDistribution {
    /// Valid indices are `0..n_choices`.
    pub n_choices: usize,
}

/// The domain of one slot.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Distribution {
    /// Holds [`ParamValue::Float`].
    Float(FloatDistribution),
    /// Holds [`ParamValue::Int`].
    Int(IntDistribution),
    /// Holds [`ParamValue::Categorical`].
    Categorical(CategoricalDistribution),
}

impl Distribution {
    /// Uniform floats in `[low, high]`.
    #[must_use]
    pub fn uniform(low: f64, high: f64) -> Self {
        Self::Float(FloatDistribution {
            low,
            high,
            log_scale: false,
            step: None,
        })
    }

    /// Log-uniform floats in `[low, high]`.
    #[must_use]
    pub fn log_uniform(low: f64, high: f64) -> Self {
        Self::Float(FloatDistribution {
            low,
            high,
            log_scale: true,
            step: None,
        })
    }

    /// Uniform integers in `[low, high]`.
    #[must_use]
    pub fn int(low: i64, high: i64) -> Self {
        Self::Int(IntDistribution {
            low,
            high,
            log_scale: false,
            step: None,
        })
    }

    /// One of `n_choices` categories.
    #[must_use]
    pub fn categorical(n_choices: usize) -> Self {
        Self::Categorical(CategoricalDistribution { n_choices })
    }

    /// Checks bounds, log-scale and step constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] describing the first violated
    /// constraint.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidArgument(msg));
        match self {
            Self::Float(d) => {
                if !d.low.is_finite() || !d.high.is_finite() || !(d.high - d.low).is_finite() {
                    return invalid(format!(
                        "bounds [{}, {}] must be finite with a finite width",
                        d.low, d.high
                    ));
                }
                if d.low > d.high {
                    return invalid(format!("low ({}) must not exceed high ({})", d.low, d.high));
                }
                if d.log_scale && d.low <= 0.0 {
                    return invalid("log scale requires a positive lower bound".into());
                }
                if d.step.is_some_and(|s| !s.is_finite() || s <= 0.0) {
                    return invalid("step must be positive".into());
                }
            }
            Self::Int(d) => {
                if d.low > d.high {
                    return invalid(format!("low ({}) must not exceed high ({})", d.low, d.high));
                }
                if d.log_scale && d.low < 1 {
                    return invalid("log scale requires a positive lower bound".into());
                }
                if d.step.is_some_and(|s| s <= 0) {
                    return invalid("step must be positive".into());
                }
            }
            Self::Categorical(d) => {
                if d.n_choices == 0 {
                    return invalid("categorical choices cannot be empty".into());
                }
            }
        }
        Ok(())
    }

    /// Returns `true` if `value` has this distribution's kind and lies in its
    /// domain.
    #[must_use]
    pub fn contains(&self, value: &ParamValue) -> bool {
        match (self, value) {
            (Self::Float(d), ParamValue::Float(v)) => (d.low..=d.high).contains(v),
            (Self::Int(d), ParamValue::Int(v)) => (d.low..=d.high).contains(v),
            (Self::Categorical(d), ParamValue::Categorical(v)) => *v < d.n_choices,
            _ => false,
        }
    }
}
