//! Attribute policy: which signal attributes a composite event carries.
//!
//! The policy is a plain table from attribute name to [`AttributeKind`].
//! The composer copies exactly these attributes from the signal event and
//! coerces each one to its kind; an attribute missing from the signal is
//! an error, never a default.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::types::{classify, AttributeError, AttributeValue, CrossSection, PdfInfo, Scalar, TypedValue};
use crate::DEFAULT_POLICY_VERSION;

/// Semantic type of a composed attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Integer scalar; fractional values are rejected.
    Integer,
    /// Floating-point scalar; integral values are kept as integers.
    Float,
    /// Cross-section record.
    CrossSection,
    /// PDF record.
    PdfInfo,
}

impl AttributeKind {
    /// Coerce raw attribute text to this kind.
    pub fn coerce(&self, raw: &str) -> Result<AttributeValue, AttributeError> {
        let typed = classify(raw)?;
        match self {
            Self::Integer => match single(typed)? {
                Scalar::Integer(i) => Ok(AttributeValue::Integer(i)),
                Scalar::Float(f) => Err(AttributeError::NotIntegral(f)),
            },
            Self::Float => Ok(single(typed)?.into()),
            Self::CrossSection => {
                CrossSection::from_values(&typed.into_values()).map(AttributeValue::CrossSection)
            }
            Self::PdfInfo => PdfInfo::from_values(&typed.into_values()).map(AttributeValue::PdfInfo),
        }
    }
}

fn single(value: TypedValue) -> Result<Scalar, AttributeError> {
    match value {
        TypedValue::Scalar(s) => Ok(s),
        TypedValue::Structured(v) => Err(AttributeError::ExpectedScalar(v.len())),
    }
}

/// One row of the policy table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRule {
    /// Attribute name as it appears on the event.
    pub name: String,
    /// Kind the value is coerced to.
    pub kind: AttributeKind,
}

impl AttributeRule {
    /// Create a new rule.
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Table of attributes copied from the signal event into a composite.
///
/// Rules are applied in order, so the composite's attributes appear in
/// table order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributePolicy {
    /// Policy version identifier.
    pub version: String,
    /// Attribute rules.
    pub rules: Vec<AttributeRule>,
}

impl AttributePolicy {
    /// Create a policy from explicit rules.
    pub fn new(rules: Vec<AttributeRule>) -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            rules,
        }
    }

    /// A policy that copies nothing.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Parse a policy from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get the policy ID.
    pub fn policy_id(&self) -> &str {
        &self.version
    }

    /// Look up the kind of an attribute.
    pub fn kind_of(&self, name: &str) -> Option<AttributeKind> {
        self.rules.iter().find(|r| r.name == name).map(|r| r.kind)
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the policy has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Deterministic hash of the table.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(self)
    }
}

impl Default for AttributePolicy {
    fn default() -> Self {
        Self::new(vec![
            AttributeRule::new("signal_process_id", AttributeKind::Integer),
            AttributeRule::new("signal_process_vertex", AttributeKind::Integer),
            AttributeRule::new("event_scale", AttributeKind::Float),
            AttributeRule::new("alphaQCD", AttributeKind::Float),
            AttributeRule::new("alphaQED", AttributeKind::Float),
            AttributeRule::new("mpi", AttributeKind::Integer),
            AttributeRule::new("GenCrossSection", AttributeKind::CrossSection),
            AttributeRule::new("GenPdfInfo", AttributeKind::PdfInfo),
        ])
    }
}
