use anyhow::{format_err, Context, Result};
use prowgen_model::{jobconfig, JobConfig, JobType};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

const RELEASE_REPO: &str = "src/github.com/openshift/release";

/// A release repository checked out in a temporary `GOPATH`. The directory is deleted when the
/// `ReleaseRepo` goes out of scope.
#[derive(Debug)]
pub struct ReleaseRepo {
    gopath: TempDir,
}

impl ReleaseRepo {
    /// Creates an empty configuration tree and an empty job tree.
    pub fn new() -> Result<Self> {
        let repo = Self {
            gopath: TempDir::new()?,
        };
        fs::create_dir_all(repo.config_dir())?;
        fs::create_dir_all(repo.jobs_dir())?;
        Ok(repo)
    }

    /// The `GOPATH` the repository is checked out in.
    pub fn gopath(&self) -> &Path {
        self.gopath.path()
    }

    pub fn config_dir(&self) -> PathBuf {
        self.gopath().join(RELEASE_REPO).join("ci-operator/config")
    }

    pub fn jobs_dir(&self) -> PathBuf {
        self.gopath().join(RELEASE_REPO).join("ci-operator/jobs")
    }

    /// Writes the ci-operator configuration of `org/repo` for `branch`. A variant is added with
    /// `branch__variant`.
    pub fn add_config(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
        contents: &str,
    ) -> Result<PathBuf> {
        let path = self
            .config_dir()
            .join(org)
            .join(repo)
            .join(format!("{}-{}-{}.yaml", org, repo, branch));
        write(&path, contents)?;
        Ok(path)
    }

    /// Removes a configuration written by [`ReleaseRepo::add_config`].
    pub fn remove_config(&self, org: &str, repo: &str, branch: &str) -> Result<()> {
        let path = self
            .config_dir()
            .join(org)
            .join(repo)
            .join(format!("{}-{}-{}.yaml", org, repo, branch));
        fs::remove_file(&path).context(format!("Unable to remove '{}'", path.display()))
    }

    /// Writes a job file by hand.
    pub fn add_job_file(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
        job_type: JobType,
        contents: &str,
    ) -> Result<PathBuf> {
        let path = self.job_file(org, repo, branch, job_type);
        write(&path, contents)?;
        Ok(path)
    }

    /// The path of the job file holding the `job_type` jobs of `org/repo` for `branch`.
    pub fn job_file(&self, org: &str, repo: &str, branch: &str, job_type: JobType) -> PathBuf {
        self.jobs_dir().join(org).join(repo).join(format!(
            "{}-{}-{}-{}.yaml",
            org, repo, branch, job_type
        ))
    }

    pub fn read_job_config(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
        job_type: JobType,
    ) -> Result<JobConfig> {
        let path = self.job_file(org, repo, branch, job_type);
        jobconfig::read_from_file(&path)
            .map_err(|e| format_err!("Unable to read job file '{}': {}", path.display(), e))
    }

    /// The contents of every file in the job tree, keyed by their path relative to it.
    pub fn snapshot(&self) -> Result<BTreeMap<PathBuf, String>> {
        let jobs_dir = self.jobs_dir();
        let mut files = BTreeMap::new();
        for entry in WalkDir::new(&jobs_dir) {
            let entry = entry?;
            if entry.file_type().is_file() {
                let relative = entry.path().strip_prefix(&jobs_dir)?.to_owned();
                files.insert(relative, fs::read_to_string(entry.path())?);
            }
        }
        Ok(files)
    }
}

fn write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents).context(format!("Unable to write '{}'", path.display()))
}
