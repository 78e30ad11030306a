//! Decoding of the stored mood vector payload.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum VectorError {
    #[error("Mood vector is not a JSON array of numbers: {0}")]
    Malformed(String),

    #[error("Mood vector is empty")]
    Empty,

    #[error("Mood vector component {0} is not finite")]
    NonFinite(usize),
}

/// An ordered sequence of finite floats describing a user's mood.
#[derive(Debug, Clone, PartialEq)]
pub struct MoodVector(Vec<f64>);

impl MoodVector {
    /// Parses a JSON-encoded array such as `[0.1, -0.4, 1]`.
    pub fn parse(raw: &str) -> Result<Self, VectorError> {
        let components: Vec<f64> =
            serde_json::from_str(raw).map_err(|e| VectorError::Malformed(e.to_string()))?;
        Self::try_from(components)
    }

    pub fn components(&self) -> &[f64] {
        &self.0
    }
}

impl TryFrom<Vec<f64>> for MoodVector {
    type Error = VectorError;

    fn try_from(components: Vec<f64>) -> Result<Self, Self::Error> {
        if components.is_empty() {
            return Err(VectorError::Empty);
        }
        if let Some(index) = components.iter().position(|c| !c.is_finite()) {
            return Err(VectorError::NonFinite(index));
        }
        Ok(MoodVector(components))
    }
}
