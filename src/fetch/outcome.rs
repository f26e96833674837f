//! Three-way fetch result.

use super::FetchError;

/// Result of one fetch (or one source lookup) with absence made explicit.
///
/// Callers deciding whether to fall through to the next source must be able
/// to distinguish "the resource definitively does not exist here" from "the
/// attempt failed"; conflating the two either re-hammers dead endpoints or
/// skips live ones. A plain `Result<Option<T>, E>` invites exactly that
/// conflation, so the three cases are spelled out.
#[derive(Debug)]
pub enum FetchOutcome<T> {
    /// The fetch produced a value.
    Value(T),
    /// Definitive absence (e.g. HTTP 404, or a well-formed response with no
    /// usable payload). Never retried at the same source.
    Absent,
    /// The attempt failed after its retry schedule was exhausted.
    Failed(FetchError),
}

impl<T> FetchOutcome<T> {
    /// Converts into `Some(value)` on success, `None` otherwise.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Absent | Self::Failed(_) => None,
        }
    }

    /// Returns true if this outcome carries a value.
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Returns true for definitive absence.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Maps the carried value, preserving `Absent` and `Failed`.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchOutcome<U> {
        match self {
            Self::Value(v) => FetchOutcome::Value(f(v)),
            Self::Absent => FetchOutcome::Absent,
            Self::Failed(e) => FetchOutcome::Failed(e),
        }
    }

    /// Turns an empty-or-whitespace value into `Absent`.
    ///
    /// Sources that return an empty abstract field have no data, which is
    /// absence rather than success.
    pub fn filter_non_empty(self) -> FetchOutcome<T>
    where
        T: AsRef<str>,
    {
        match self {
            Self::Value(v) if v.as_ref().trim().is_empty() => Self::Absent,
            other => other,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_into_option_value() {
        let outcome: FetchOutcome<u32> = FetchOutcome::Value(7);
        assert_eq!(outcome.into_option(), Some(7));
    }

    #[test]
    fn test_into_option_absent_and_failed() {
        let absent: FetchOutcome<u32> = FetchOutcome::Absent;
        assert_eq!(absent.into_option(), None);

        let failed: FetchOutcome<u32> =
            FetchOutcome::Failed(FetchError::timeout("https://example.com"));
        assert_eq!(failed.into_option(), None);
    }

    #[test]
    fn test_map_preserves_absent() {
        let outcome: FetchOutcome<u32> = FetchOutcome::Absent;
        assert!(outcome.map(|v| v * 2).is_absent());
    }

    #[test]
    fn test_filter_non_empty_blanks_become_absent() {
        let outcome = FetchOutcome::Value("   ".to_string());
        assert!(outcome.filter_non_empty().is_absent());

        let outcome = FetchOutcome::Value("real text".to_string());
        assert!(outcome.filter_non_empty().is_value());
    }
}
