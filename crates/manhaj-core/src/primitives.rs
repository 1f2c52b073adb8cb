//! # Engine Primitives
//!
//! Hardcoded limits for the Manhaj engine.
//!
//! These are compiled into the binary and are immutable at runtime.

/// Maximum number of parent hops taken by the ancestor walk.
///
/// A breadcrumb therefore holds at most `MAX_ANCESTOR_DEPTH + 1` nodes.
/// The walk truncates silently when the bound is reached.
pub const MAX_ANCESTOR_DEPTH: usize = 10;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a node title, in characters.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum length of a node description, in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

/// Maximum size of an opaque content document (1 MiB).
pub const MAX_CONTENT_LENGTH: usize = 1024 * 1024;

/// Maximum length of a node id supplied by a caller or a seed manifest.
pub const MAX_ID_LENGTH: usize = 128;

/// Maximum length of user names and subjects.
pub const MAX_NAME_LENGTH: usize = 120;

/// Maximum length of an email address (RFC 5321 path limit).
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Curriculum grades span the twelve school years.
pub const MIN_GRADE: u8 = 1;
pub const MAX_GRADE: u8 = 12;

/// Country wildcard accepted by curriculum tags.
pub const ALL_COUNTRIES: &str = "ALL";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestor_depth_is_ten() {
        assert_eq!(MAX_ANCESTOR_DEPTH, 10);
    }

    #[test]
    fn grade_range_is_school_years() {
        assert_eq!((MIN_GRADE, MAX_GRADE), (1, 12));
    }
}
