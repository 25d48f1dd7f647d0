//! Slug derivation for wiki entries.

/// Derive a URL-safe slug from a title.
///
/// Lowercases, maps runs of non-alphanumeric characters to single hyphens,
/// and trims leading/trailing hyphens. Deterministic, and stable under title
/// case changes that leave the lowercased title unchanged.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_hyphen = true;

    for c in title.chars() {
        if c.is_alphanumeric() {
            for lc in c.to_lowercase() {
                slug.push(lc);
            }
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("The Glass Desert"), "the-glass-desert");
    }

    #[test]
    fn test_slugify_collapses_punctuation() {
        assert_eq!(slugify("Mira's  Ledger (Vol. 2)"), "mira-s-ledger-vol-2");
    }

    #[test]
    fn test_slugify_stable_under_case_changes() {
        assert_eq!(slugify("EMBERBORN keep"), slugify("Emberborn Keep"));
    }

    #[test]
    fn test_slugify_trims_edges() {
        assert_eq!(slugify("  ...Ashfall...  "), "ashfall");
    }

    #[test]
    fn test_slugify_empty() {
        assert_eq!(slugify("!!!"), "");
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_slug_deterministic(title in ".{0,60}") {
                prop_assert_eq!(slugify(&title), slugify(&title));
            }

            #[test]
            fn prop_slug_case_insensitive(title in "[a-zA-Z -]{0,60}") {
                prop_assert_eq!(slugify(&title), slugify(&title.to_uppercase()));
            }

            #[test]
            fn prop_slug_charset(title in ".{0,60}") {
                let slug = slugify(&title);
                prop_assert!(slug.chars().all(|c| c.is_alphanumeric() || c == '-'));
                prop_assert!(!slug.starts_with('-'));
                prop_assert!(!slug.ends_with('-'));
            }
        }
    }
}
