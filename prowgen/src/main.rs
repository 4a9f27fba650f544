/*!

`ci-operator-prowgen` generates the Prow jobs that run ci-operator for every component of a
ci-operator configuration tree, and removes the jobs it generated earlier that no configuration
asks for anymore. Jobs written by hand live in the same files and are left alone.

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

mod branch;
mod cloud_profile;
mod constants;
mod generate;
mod job_builder;
mod pod_spec;
mod prune;

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Builder;
use log::{error, LevelFilter};
use prowgen_model::{config, jobconfig, ProwgenLabel};
use std::path::{Path, PathBuf};

/// Where ci-operator configuration files live in the release repository.
const RELEASE_REPO_CONFIG_DIR: &str = "ci-operator/config";
/// Where Prow job files live in the release repository.
const RELEASE_REPO_JOBS_DIR: &str = "ci-operator/jobs";

/// Generates Prow jobs from ci-operator configuration files.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
    /// Path to a directory with a directory structure holding ci-operator configuration files for
    /// multiple components.
    #[clap(long = "from-dir")]
    from_dir: Option<PathBuf>,
    /// Behave like `--from-dir=$GOPATH/src/github.com/openshift/release/ci-operator/config`.
    #[clap(long = "from-release-repo")]
    from_release_repo: bool,
    /// Path to a directory with a directory structure holding Prow job configuration files for
    /// multiple components.
    #[clap(long = "to-dir")]
    to_dir: Option<PathBuf>,
    /// Behave like `--to-dir=$GOPATH/src/github.com/openshift/release/ci-operator/jobs`.
    #[clap(long = "to-release-repo")]
    to_release_repo: bool,
    /// Only generate jobs for these subdirectories of the configuration tree, e.g. `openshift` or
    /// `openshift/origin`. The whole tree is used when none are given.
    #[clap(name = "SUBDIR")]
    sub_dirs: Vec<String>,
}

fn main() {
    let args = Args::parse();
    init_logger(args.log_level);
    if let Err(e) = run(args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let from_dir = resolve_dir(
        args.from_dir,
        args.from_release_repo,
        "from",
        RELEASE_REPO_CONFIG_DIR,
    )?;
    let to_dir = resolve_dir(args.to_dir, args.to_release_repo, "to", RELEASE_REPO_JOBS_DIR)?;
    let sub_dirs = if args.sub_dirs.is_empty() {
        vec![String::new()]
    } else {
        args.sub_dirs
    };

    for sub_dir in &sub_dirs {
        config::operate_on_config_subdir(
            &from_dir,
            sub_dir,
            generate::generate_jobs_to_dir(&to_dir, ProwgenLabel::New),
        )
        .with_context(|| {
            format!(
                "Failed to generate jobs (target '{}', source '{}', subdir '{}')",
                to_dir.display(),
                from_dir.display(),
                sub_dir
            )
        })?;
        jobconfig::rewrite_subdir(&to_dir, sub_dir, prune::prune_stale_jobs).with_context(
            || {
                format!(
                    "Failed to prune stale generated jobs (target '{}', subdir '{}')",
                    to_dir.display(),
                    sub_dir
                )
            },
        )?;
    }
    Ok(())
}

/// Picks the directory given by `--<direction>-dir` or `--<direction>-release-repo`. Exactly one
/// of them must be given, and it must be an existing directory.
fn resolve_dir(
    dir: Option<PathBuf>,
    release_repo: bool,
    direction: &str,
    release_repo_dir: &str,
) -> Result<PathBuf> {
    let dir = match (dir, release_repo) {
        (Some(dir), false) => dir,
        (None, true) => release_repo_path(release_repo_dir)
            .with_context(|| format!("--{}-release-repo error", direction))?,
        (Some(_), true) => bail!(
            "`--{0}-dir` and `--{0}-release-repo` cannot be used together",
            direction
        ),
        (None, false) => bail!(
            "ci-operator-prowgen needs exactly one of `--{}-{{dir,release-repo}}` options",
            direction
        ),
    };
    if !dir.is_dir() {
        bail!("'{}' is not an existing directory", dir.display());
    }
    Ok(dir)
}

/// The path of `sub_dir` in the release repository checked out in `$GOPATH`.
fn release_repo_path(sub_dir: &str) -> Result<PathBuf> {
    let gopath = match std::env::var_os("GOPATH") {
        Some(gopath) => PathBuf::from(gopath),
        None => Path::new(
            &std::env::var_os("HOME").context("Neither GOPATH nor HOME are set")?,
        )
        .join("go"),
    };
    Ok(gopath
        .join("src/github.com/openshift/release")
        .join(sub_dir))
}

/// Initialize the logger with the value passed by `--log-level` (or its default) when the
/// `RUST_LOG` environment variable is not present. If present, the `RUST_LOG` environment variable
/// overrides `--log-level`/`level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate and its model.
            Builder::new()
                .filter(Some(env!("CARGO_CRATE_NAME")), level)
                .filter(Some("prowgen_model"), level)
                .init();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dirs_must_be_given_once() {
        let tempdir = tempfile::TempDir::new().unwrap();
        let dir = Some(tempdir.path().to_owned());
        assert_eq!(
            resolve_dir(dir.clone(), false, "from", RELEASE_REPO_CONFIG_DIR).unwrap(),
            tempdir.path()
        );
        assert!(resolve_dir(dir, true, "from", RELEASE_REPO_CONFIG_DIR).is_err());
        let error = resolve_dir(None, false, "to", RELEASE_REPO_JOBS_DIR).unwrap_err();
        assert_eq!(
            error.to_string(),
            "ci-operator-prowgen needs exactly one of `--to-{dir,release-repo}` options"
        );
    }

    #[test]
    fn dirs_must_exist() {
        let tempdir = tempfile::TempDir::new().unwrap();
        let missing = tempdir.path().join("missing");
        assert!(resolve_dir(Some(missing), false, "to", RELEASE_REPO_JOBS_DIR).is_err());
    }
}
