//! Typed event attributes.
//!
//! Attribute values arrive from the log as text. [`classify`] decides
//! once, at parse time, whether the text is an integer, a float or a
//! structured list of scalars; everything downstream works on the
//! resulting [`TypedValue`] instead of re-inspecting strings.
//!
//! Integral floats are demoted to integers (`"3.0"` is `Integer(3)`) so
//! that counters survive a text round trip exactly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest magnitude at which an integral `f64` is still demoted to `i64`.
const I64_DEMOTION_LIMIT: f64 = 9.223_372_036_854_775e18;

/// Errors raised while interpreting attribute text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttributeError {
    /// The attribute text is empty.
    #[error("Attribute text is empty")]
    Empty,
    /// A token is not a number.
    #[error("Not a number: {0:?}")]
    NotNumeric(String),
    /// An integer was required but the value has a fractional part.
    #[error("Expected an integral value, found {0}")]
    NotIntegral(f64),
    /// An integer does not fit the target field.
    #[error("Integer out of range: {0}")]
    OutOfRange(i64),
    /// A single scalar was required but a list was given.
    #[error("Expected a single scalar, found {0} values")]
    ExpectedScalar(usize),
    /// A structured attribute has the wrong number of values.
    #[error("{kind} expects {expected} values, found {found}")]
    Arity {
        /// Name of the structured attribute.
        kind: &'static str,
        /// Human-readable description of the accepted counts.
        expected: &'static str,
        /// Number of values found.
        found: usize,
    },
}

/// A single numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    /// Integral value.
    Integer(i64),
    /// Non-integral (or non-finite) value.
    Float(f64),
}

impl Scalar {
    /// Value as a float.
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Integer(i) => *i as f64,
            Self::Float(f) => *f,
        }
    }

    /// Value as an integer, failing on fractional values.
    pub fn as_i64(&self) -> Result<i64, AttributeError> {
        match self {
            Self::Integer(i) => Ok(*i),
            Self::Float(f) => Err(AttributeError::NotIntegral(*f)),
        }
    }

    /// Value as an `i32`, failing on fractional or out-of-range values.
    pub fn as_i32(&self) -> Result<i32, AttributeError> {
        let i = self.as_i64()?;
        i32::try_from(i).map_err(|_| AttributeError::OutOfRange(i))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
        }
    }
}

/// Result of classifying raw attribute text.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// One whitespace-delimited token.
    Scalar(Scalar),
    /// Two or more whitespace-delimited tokens.
    Structured(Vec<Scalar>),
}

impl TypedValue {
    /// The contained scalars, in order.
    pub fn into_values(self) -> Vec<Scalar> {
        match self {
            Self::Scalar(s) => vec![s],
            Self::Structured(v) => v,
        }
    }
}

/// Classify one numeric token.
pub fn classify_scalar(token: &str) -> Result<Scalar, AttributeError> {
    if let Ok(i) = token.parse::<i64>() {
        return Ok(Scalar::Integer(i));
    }
    let f: f64 = token
        .parse()
        .map_err(|_| AttributeError::NotNumeric(token.to_string()))?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < I64_DEMOTION_LIMIT {
        Ok(Scalar::Integer(f as i64))
    } else {
        Ok(Scalar::Float(f))
    }
}

/// Classify raw attribute text into a typed value.
///
/// Pure: the same text always yields the same value.
pub fn classify(raw: &str) -> Result<TypedValue, AttributeError> {
    let mut values: Vec<Scalar> = raw
        .split_whitespace()
        .map(classify_scalar)
        .collect::<Result<_, _>>()?;
    match values.len() {
        0 => Err(AttributeError::Empty),
        1 => Ok(TypedValue::Scalar(values.remove(0))),
        _ => Ok(TypedValue::Structured(values)),
    }
}

/// Generator cross-section record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossSection {
    /// Cross section for the nominal weight.
    pub cross_section: f64,
    /// Uncertainty of `cross_section`.
    pub cross_section_error: f64,
    /// Number of accepted events (-1 when unknown).
    pub accepted_events: i64,
    /// Number of attempted events (-1 when unknown).
    pub attempted_events: i64,
    /// `(cross_section, error)` pairs for the additional weights.
    pub additional: Vec<(f64, f64)>,
}

impl CrossSection {
    /// Build from the scalar list `xs err [accepted attempted] [xs_i err_i]...`.
    pub fn from_values(values: &[Scalar]) -> Result<Self, AttributeError> {
        let arity_error = || AttributeError::Arity {
            kind: "GenCrossSection",
            expected: "2, or 4 plus pairs",
            found: values.len(),
        };
        if values.len() < 2 || values.len() == 3 || (values.len() > 4 && values.len() % 2 != 0) {
            return Err(arity_error());
        }

        let (accepted_events, attempted_events) = if values.len() >= 4 {
            (values[2].as_i64()?, values[3].as_i64()?)
        } else {
            (-1, -1)
        };
        let additional = values
            .get(4..)
            .unwrap_or_default()
            .chunks_exact(2)
            .map(|pair| (pair[0].as_f64(), pair[1].as_f64()))
            .collect();

        Ok(Self {
            cross_section: values[0].as_f64(),
            cross_section_error: values[1].as_f64(),
            accepted_events,
            attempted_events,
            additional,
        })
    }
}

impl fmt::Display for CrossSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.cross_section, self.cross_section_error, self.accepted_events, self.attempted_events
        )?;
        for (xs, err) in &self.additional {
            write!(f, " {} {}", xs, err)?;
        }
        Ok(())
    }
}

/// Parton distribution information for the hard process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfInfo {
    /// PDG codes of the two incoming partons.
    pub parton_id: [i32; 2],
    /// Momentum fractions of the two partons.
    pub x: [f64; 2],
    /// Factorisation scale.
    pub scale: f64,
    /// PDF values `x * f(x)`.
    pub xf: [f64; 2],
    /// LHAPDF set ids.
    pub pdf_id: [i32; 2],
}

impl PdfInfo {
    /// Build from `id1 id2 x1 x2 scale xf1 xf2 pdf_id1 pdf_id2`.
    pub fn from_values(values: &[Scalar]) -> Result<Self, AttributeError> {
        if values.len() != 9 {
            return Err(AttributeError::Arity {
                kind: "GenPdfInfo",
                expected: "9",
                found: values.len(),
            });
        }
        Ok(Self {
            parton_id: [values[0].as_i32()?, values[1].as_i32()?],
            x: [values[2].as_f64(), values[3].as_f64()],
            scale: values[4].as_f64(),
            xf: [values[5].as_f64(), values[6].as_f64()],
            pdf_id: [values[7].as_i32()?, values[8].as_i32()?],
        })
    }
}

impl fmt::Display for PdfInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {} {} {}",
            self.parton_id[0],
            self.parton_id[1],
            self.x[0],
            self.x[1],
            self.scale,
            self.xf[0],
            self.xf[1],
            self.pdf_id[0],
            self.pdf_id[1]
        )
    }
}

/// Value of a named attribute attached to an event.
///
/// Events read from a log carry `Text`; the composer stores the typed
/// variants it produces from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// Uninterpreted text as it appeared in the log.
    Text(String),
    /// Integer scalar.
    Integer(i64),
    /// Floating-point scalar.
    Float(f64),
    /// Cross-section record.
    CrossSection(CrossSection),
    /// PDF record.
    PdfInfo(PdfInfo),
}

impl AttributeValue {
    /// Text form, as it would be written to a log.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Integer payload, if this is an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Float payload, if this is a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<Scalar> for AttributeValue {
    fn from(s: Scalar) -> Self {
        match s {
            Scalar::Integer(i) => Self::Integer(i),
            Scalar::Float(f) => Self::Float(f),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::CrossSection(cs) => write!(f, "{}", cs),
            Self::PdfInfo(pdf) => write!(f, "{}", pdf),
        }
    }
}
