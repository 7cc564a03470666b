//! Message envelope: a subject plus a JSON payload.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use timesheet_domain::Result;

use crate::errors::InfraError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub subject: String,
    pub payload: Vec<u8>,
}

impl Envelope {
    pub fn new(subject: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self { subject: subject.into(), payload: payload.into() }
    }

    /// Serialize `message` as the JSON payload for `subject`.
    ///
    /// # Errors
    /// Returns the mapped `serde_json` error if `message` cannot be encoded.
    pub fn encode<T: Serialize>(subject: impl Into<String>, message: &T) -> Result<Self> {
        let payload = serde_json::to_vec(message).map_err(InfraError::from)?;
        Ok(Self { subject: subject.into(), payload })
    }

    /// Deserialize the payload.
    ///
    /// # Errors
    /// Returns `TimesheetError::InvalidArgument` for malformed JSON or a
    /// payload of the wrong shape.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.payload).map_err(InfraError::from)?)
    }
}
