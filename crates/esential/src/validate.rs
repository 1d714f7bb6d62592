//! Binary validation.

use crate::error::{BuildError, Result};
use wasmparser::Validator;

/// Check `binary` against the wasm core specification.
pub fn validate(binary: &[u8]) -> Result<()> {
    Validator::new()
        .validate_all(binary)
        .map(|_| ())
        .map_err(|err| BuildError::ValidationError {
            message: err.to_string(),
        })
}
