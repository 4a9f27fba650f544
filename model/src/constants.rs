/// Helper macro to avoid retyping the domain-like prefix of the ci-operator label keys. When given
/// no parameters, this returns the prefix. When given a string literal parameter it adds
/// `/parameter` to the end.
macro_rules! ci_operator {
    () => {
        "ci-operator.openshift.io"
    };
    ($s:literal) => {
        concat!(ci_operator!(), "/", $s)
    };
}

// Label keys
pub const LABEL_PROWGEN_CONTROLLED: &str = ci_operator!("prowgen-controlled");
pub const LABEL_VARIANT: &str = ci_operator!("variant");

// Job name prefixes
pub const PRESUBMIT_PREFIX: &str = "pull";
pub const POSTSUBMIT_PREFIX: &str = "branch";

// Prow
pub const PROW_AGENT: &str = "kubernetes";

/// The branch a job file is named after when the jobs in it do not list any branch.
pub const DEFAULT_BRANCH: &str = "master";

#[test]
fn ci_operator_constants_macro_test() {
    assert_eq!("ci-operator.openshift.io", ci_operator!());
    assert_eq!(
        "ci-operator.openshift.io/prowgen-controlled",
        LABEL_PROWGEN_CONTROLLED
    );
    assert_eq!("ci-operator.openshift.io/foo", ci_operator!("foo"));
}
