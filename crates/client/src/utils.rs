//! Internal helper macros.

/// Returns early with `Err($error)` when `$predicate` does not hold.
///
/// The validating counterpart of `assert!`:
///
/// ```ignore
/// ensure!(self.data.is_none() || self.mime_fields.is_empty(), RequestError::PayloadConflict);
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
