use wrdata_core::{Capability, WrdataError};

/// Collapse a set of provider errors into a uniform `WrdataError` outcome.
///
/// Rules:
/// - If `attempted_any` is false → `Unsupported(capability)`.
/// - If `not_found_what` is `Some` and all errors are `NotFound` → `NotFound(what)`.
/// - Else → `AllProvidersFailed(errors)`.
pub fn collapse_errors(
    capability: Capability,
    attempted_any: bool,
    errors: Vec<WrdataError>,
    not_found_what: Option<String>,
) -> WrdataError {
    if !attempted_any {
        return WrdataError::unsupported(capability.to_string());
    }
    if let Some(what) = not_found_what
        && !errors.is_empty()
        && errors
            .iter()
            .all(|e| matches!(e, WrdataError::NotFound { .. }))
    {
        return WrdataError::not_found(what);
    }
    WrdataError::AllProvidersFailed(errors)
}
