use regex::Regex;

lazy_static::lazy_static! {
    /// Branches made of these characters are plain branch names. Anything else is taken to be a
    /// regular expression already, e.g. `release-.*`.
    static ref SIMPLE_BRANCH: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^[A-Za-z0-9_.\-]+$").unwrap()
    };
}

/// Anchors a plain branch name so that it only matches itself: `release-4.1` must not match
/// `release-4.10`. Branches that already are regular expressions are returned unchanged.
pub(crate) fn make_branch_explicit(branch: &str) -> String {
    if SIMPLE_BRANCH.is_match(branch) {
        // `.` is the only character of a plain branch name with a meaning in a regex.
        format!("^{}$", branch.replace('.', r"\."))
    } else {
        branch.to_owned()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn simple_branches_are_anchored() {
        assert_eq!(make_branch_explicit("master"), "^master$");
        assert_eq!(make_branch_explicit("release-4.1"), r"^release-4\.1$");
        assert_eq!(make_branch_explicit("openshift_3.11"), r"^openshift_3\.11$");
    }

    #[test]
    fn explicit_branches_match_only_themselves() {
        let explicit = Regex::new(&make_branch_explicit("release-4.1")).unwrap();
        assert!(explicit.is_match("release-4.1"));
        assert!(!explicit.is_match("release-4.10"));
        assert!(!explicit.is_match("release-4x1"));
    }

    #[test]
    fn regular_expressions_are_kept() {
        assert_eq!(make_branch_explicit("release-.*"), "release-.*");
        assert_eq!(make_branch_explicit("^master$"), "^master$");
        // `/` is not part of a plain branch name.
        assert_eq!(make_branch_explicit("feature/x"), "feature/x");
        assert_eq!(make_branch_explicit("brånch"), "brånch");
    }
}
