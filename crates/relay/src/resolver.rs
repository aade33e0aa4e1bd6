//! URL resolution helpers.

use tracing::trace;
use url::Url;

/// Resolves `reference` against `base`.
///
/// An absolute `reference` is returned unchanged. When `base` cannot be parsed or
/// the join fails, the original `reference` is returned so that one malformed line
/// never aborts the surrounding playlist.
pub fn resolve(base: &str, reference: &str) -> String {
    if Url::parse(reference).is_ok() {
        return reference.to_owned();
    }

    match Url::parse(base).and_then(|base| base.join(reference)) {
        Ok(resolved) => resolved.into(),
        Err(error) => {
            trace!(base, reference, %error, "Leaving unresolvable reference as-is");
            reference.to_owned()
        }
    }
}
