use crate::error::{self, Result};
use crate::files::{file_name, read_yaml, yaml_files};
use crate::ReleaseBuildConfiguration;
use log::trace;
use regex::Regex;
use snafu::{ensure, OptionExt};
use std::path::{Path, PathBuf};

lazy_static::lazy_static! {
    static ref THREE_X_BRANCHES: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^(release|enterprise|openshift)-3\.[0-9]+$").unwrap()
    };
    static ref FOUR_X_BRANCHES: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^(release|enterprise|openshift)-4\.[0-9]+$").unwrap()
    };
}

/// Identifies the component a ci-operator configuration file belongs to. Configuration files
/// live at `<root>/<org>/<repo>/<org>-<repo>-<branch>[__<variant>].yaml`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Info {
    pub org: String,
    pub repo: String,
    pub branch: String,
    /// Distinguishes several configurations for the same branch. Empty when there is none.
    pub variant: String,
    /// The path of the configuration file.
    pub filename: PathBuf,
}

impl Info {
    /// Derives the component information from the path of its configuration file.
    pub fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let repo_dir = path.parent();
        let repo = repo_dir.and_then(file_name).context(error::ConfigPathSnafu {
            path,
            reason: "missing repository directory",
        })?;
        let org = repo_dir
            .and_then(Path::parent)
            .and_then(file_name)
            .context(error::ConfigPathSnafu {
                path,
                reason: "missing organization directory",
            })?;
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .context(error::ConfigPathSnafu {
                path,
                reason: "missing file name",
            })?;
        let prefix = format!("{}-{}-", org, repo);
        let rest = stem.strip_prefix(&prefix).context(error::ConfigPathSnafu {
            path,
            reason: format!("file name does not start with '{}'", prefix),
        })?;
        let (branch, variant) = rest.split_once("__").unwrap_or((rest, ""));
        ensure!(
            !branch.is_empty(),
            error::ConfigPathSnafu {
                path,
                reason: "file name does not contain a branch",
            }
        );

        Ok(Self {
            org: org.to_owned(),
            repo: repo.to_owned(),
            branch: branch.to_owned(),
            variant: variant.to_owned(),
            filename: path.to_owned(),
        })
    }

    /// The key under which jobs for this component are stored: `<org>/<repo>`.
    pub fn org_repo(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }

    /// The file name of the configuration, which is also its key in the config map.
    pub fn basename(&self) -> String {
        file_name(&self.filename).unwrap_or_default().to_owned()
    }

    /// The config map the configuration file is published in.
    pub fn config_map_name(&self) -> String {
        format!("ci-operator-{}-configs", flavor_for_branch(&self.branch))
    }
}

/// Configuration files are spread over several config maps depending on the branch they are
/// for.
pub fn flavor_for_branch(branch: &str) -> &'static str {
    if branch == "master" {
        "master"
    } else if THREE_X_BRANCHES.is_match(branch) {
        "3.x"
    } else if FOUR_X_BRANCHES.is_match(branch) {
        "4.x"
    } else {
        "misc"
    }
}

/// Reads a ci-operator configuration file.
pub fn read_config<P>(path: P) -> Result<ReleaseBuildConfiguration>
where
    P: AsRef<Path>,
{
    read_yaml(path.as_ref())
}

/// Calls `f` with every configuration found under `config_dir/sub_dir`, in file name order. An
/// empty `sub_dir` covers the whole tree. The first error stops the walk.
pub fn operate_on_config_subdir<P, F>(config_dir: P, sub_dir: &str, mut f: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnMut(&ReleaseBuildConfiguration, &Info) -> Result<()>,
{
    for path in yaml_files(&config_dir.as_ref().join(sub_dir))? {
        trace!("Reading ci-operator configuration '{}'", path.display());
        let info = Info::from_path(&path)?;
        let config = read_config(&path)?;
        f(&config, &info)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn info_from_path() {
        let info = Info::from_path("/configs/openshift/origin/openshift-origin-master.yaml").unwrap();
        assert_eq!(
            info,
            Info {
                org: "openshift".into(),
                repo: "origin".into(),
                branch: "master".into(),
                variant: String::new(),
                filename: "/configs/openshift/origin/openshift-origin-master.yaml".into(),
            }
        );
        assert_eq!(info.org_repo(), "openshift/origin");
        assert_eq!(info.basename(), "openshift-origin-master.yaml");
        assert_eq!(info.config_map_name(), "ci-operator-master-configs");
    }

    #[test]
    fn info_from_path_with_variant() {
        let info = Info::from_path(
            "openshift/installer/openshift-installer-release-4.1__okd.yaml",
        )
        .unwrap();
        assert_eq!(info.branch, "release-4.1");
        assert_eq!(info.variant, "okd");
        assert_eq!(info.config_map_name(), "ci-operator-4.x-configs");
    }

    #[test]
    fn info_from_bad_paths() {
        assert!(Info::from_path("openshift/origin/kubernetes-origin-master.yaml").is_err());
        assert!(Info::from_path("openshift/origin/openshift-origin-.yaml").is_err());
        assert!(Info::from_path("openshift-origin-master.yaml").is_err());
    }

    #[test]
    fn flavors() {
        assert_eq!(flavor_for_branch("master"), "master");
        assert_eq!(flavor_for_branch("release-3.11"), "3.x");
        assert_eq!(flavor_for_branch("enterprise-3.9"), "3.x");
        assert_eq!(flavor_for_branch("openshift-4.0"), "4.x");
        assert_eq!(flavor_for_branch("release-4.10"), "4.x");
        assert_eq!(flavor_for_branch("release-4.1-rc"), "misc");
        assert_eq!(flavor_for_branch("feature-branch"), "misc");
    }

    #[test]
    fn walks_configs_in_file_name_order() {
        let tempdir = tempfile::TempDir::new().unwrap();
        let root = tempdir.path();
        let test = "tests:\n- as: unit\n  commands: make\n  container:\n    from: src\n";
        for (org, repo, file) in [
            ("openshift", "origin", "openshift-origin-release-3.11.yaml"),
            ("openshift", "origin", "openshift-origin-master.yaml"),
            ("openshift", "installer", "openshift-installer-master.yaml"),
            ("kube", "dns", "kube-dns-master.yaml"),
        ] {
            let dir = root.join(org).join(repo);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(file), test).unwrap();
        }
        fs::write(root.join("openshift").join("README.md"), "not a config").unwrap();

        let mut seen = Vec::new();
        operate_on_config_subdir(root, "openshift", |config, info| {
            assert_eq!(config.tests.len(), 1);
            seen.push(format!("{}/{}", info.org_repo(), info.branch));
            Ok(())
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![
                "openshift/installer/master",
                "openshift/origin/master",
                "openshift/origin/release-3.11"
            ]
        );

        let mut count = 0;
        operate_on_config_subdir(root, "", |_, _| {
            count += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn bad_config_stops_the_walk() {
        let tempdir = tempfile::TempDir::new().unwrap();
        let dir = tempdir.path().join("org").join("repo");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("org-repo-master.yaml"), "tests: [ unterminated").unwrap();
        assert!(operate_on_config_subdir(tempdir.path(), "", |_, _| Ok(())).is_err());
    }
}
