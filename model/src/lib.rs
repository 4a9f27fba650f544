/*!

This library provides the documents `ci-operator-prowgen` reads and writes: ci-operator build
configurations, and the Prow job files generated from them. It also knows where both kinds of files
live in a directory tree and how to walk them.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use ci_operator::{
    AdditionalImages, ClusterProfile, ClusterTestConfiguration, ContainerTestConfiguration,
    CustomTestImageClusterTestConfiguration, ImageBuildConfiguration,
    InstallerClusterTestConfiguration, PromotionConfiguration, RandomClusterTestConfiguration,
    ReleaseBuildConfiguration, ReleaseTagConfiguration, TestKind, TestStepConfiguration,
    UpgradeClusterTestConfiguration,
};
pub use config::Info;
pub use constants::{LABEL_PROWGEN_CONTROLLED, LABEL_VARIANT};
pub use error::{Error, Result};
pub use jobconfig::{JobFileInfo, JobType, Rewrite};
pub use prow::{
    Brancher, DecorationConfig, JobBase, JobConfig, Periodic, Postsubmit, Presubmit, ProwJob,
    ProwgenLabel,
};

mod ci_operator;
pub mod config;
pub mod constants;
mod error;
mod files;
pub mod jobconfig;
pub mod prow;
