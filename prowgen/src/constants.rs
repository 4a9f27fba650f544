//! Names shared by every pod spec that runs ci-operator.

/// The ci-operator binary, also the name of its service account.
pub(crate) const CI_OPERATOR: &str = "ci-operator";
pub(crate) const CI_OPERATOR_IMAGE: &str = "ci-operator:latest";
pub(crate) const PULL_ALWAYS: &str = "Always";
pub(crate) const CPU_REQUEST: &str = "10m";

/// The environment variable ci-operator reads its configuration from.
pub(crate) const CONFIG_SPEC: &str = "CONFIG_SPEC";

// Sentry
pub(crate) const SENTRY_DSN_VOLUME: &str = "sentry-dsn";
pub(crate) const SENTRY_DSN_SECRET: &str = "sentry-dsn";
pub(crate) const SENTRY_DSN_MOUNT_PATH: &str = "/etc/sentry-dsn";
pub(crate) const SENTRY_DSN_SECRET_PATH: &str = "/etc/sentry-dsn/ci-operator";

// Volumes of cluster tests
pub(crate) const CLUSTER_PROFILE_VOLUME: &str = "cluster-profile";
pub(crate) const JOB_DEFINITION_VOLUME: &str = "job-definition";
pub(crate) const E2E_TARGETS: &str = "e2e-targets";

/// The ci-operator target that builds every image of a component.
pub(crate) const IMAGES_TARGET: &str = "[images]";
/// The name of the jobs that build and promote images.
pub(crate) const IMAGES_JOB: &str = "images";
/// Asks ci-operator to also import the release payload the images are tested in.
pub(crate) const RELEASE_LATEST_TARGET: &str = "[release:latest]";

pub(crate) const RPM_MIRROR: &str = "https://rpms.svc.ci.openshift.org";
