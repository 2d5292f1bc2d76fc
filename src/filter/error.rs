use thiserror::Error;

/// Errors that can occur when compiling filter tokens
///
/// Only raised under [`UnrecognizedPolicy::Reject`](super::UnrecognizedPolicy);
/// the default policy drops unrecognized tokens instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error(
        "Unrecognized filter expression: '{0}'. Run `rest-filter operators` to list the supported syntaxes"
    )]
    UnrecognizedToken(String),
}
