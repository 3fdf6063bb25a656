use validator::Validate;

use crate::error::{Error, Result};

/// Runs the payload's `validator` rules, mapping failures to a 400.
pub fn validate<T: Validate>(payload: &T) -> Result<()> {
    payload.validate().map_err(|errors| {
        tracing::debug!(?errors, "Request payload failed validation");
        Error::Validation(errors)
    })
}
