use crate::constants::DEFAULT_BRANCH;
use crate::error::{self, Result};
use crate::files::{delete_file, file_name, read_yaml, yaml_files};
use crate::prow::{JobConfig, ProwJob};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};
use snafu::{OptionExt, ResultExt};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// The kind of jobs a job file holds. Every job file holds a single kind.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Presubmits,
    Postsubmits,
    Periodics,
}

derive_display_from_serialize!(JobType);
derive_fromstr_from_deserialize!(JobType);

/// Identifies a job file. Job files live at
/// `<root>/<org>/<repo>/<org>-<repo>-<branch>-<type>.yaml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFileInfo {
    pub org: String,
    pub repo: String,
    /// The branch label the file is named after, see [`make_regex_filename_label`].
    pub branch: String,
    pub job_type: JobType,
    pub filename: PathBuf,
}

impl JobFileInfo {
    pub fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let repo_dir = path.parent();
        let repo = repo_dir.and_then(file_name).context(error::JobPathSnafu {
            path,
            reason: "missing repository directory",
        })?;
        let org = repo_dir
            .and_then(Path::parent)
            .and_then(file_name)
            .context(error::JobPathSnafu {
                path,
                reason: "missing organization directory",
            })?;
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .context(error::JobPathSnafu {
                path,
                reason: "missing file name",
            })?;
        let prefix = format!("{}-{}-", org, repo);
        let (branch, job_type) = stem
            .strip_prefix(&prefix)
            .and_then(|rest| rest.rsplit_once('-'))
            .context(error::JobPathSnafu {
                path,
                reason: format!("file name is not '{}<branch>-<type>'", prefix),
            })?;
        let job_type = job_type.parse::<JobType>().ok().context(error::JobPathSnafu {
            path,
            reason: format!("unknown job type '{}'", job_type),
        })?;

        Ok(Self {
            org: org.to_owned(),
            repo: repo.to_owned(),
            branch: branch.to_owned(),
            job_type,
            filename: path.to_owned(),
        })
    }
}

/// Turns a branch matcher into something that can be part of a file name: regular expression
/// syntax is dropped and `/` becomes `-`.
pub fn make_regex_filename_label(branch: &str) -> String {
    branch
        .chars()
        .filter(|c| !"^$\\*?+()[]{}|".contains(*c))
        .map(|c| if c == '/' { '-' } else { c })
        .collect()
}

/// What to do with a job file after it has been looked at by [`rewrite_subdir`].
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite {
    Write(JobConfig),
    Delete,
}

pub fn read_from_file<P>(path: P) -> Result<JobConfig>
where
    P: AsRef<Path>,
{
    read_yaml(path.as_ref())
}

/// Writes `job_config` to `path`, creating the parent directories if needed.
pub fn write_to_file<P>(path: P, job_config: &JobConfig) -> Result<()>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context(error::CreateDirSnafu { path: parent })?;
    }
    let contents =
        serde_yaml::to_string(job_config).context(error::YamlSerializeSnafu { path })?;
    fs::write(path, contents).context(error::WriteFileSnafu { path })?;
    trace!("Wrote job file '{}'", path.display());
    Ok(())
}

/// Writes the jobs `job_config` holds for `org/repo` into the job files under `root`. Jobs replace
/// the jobs of the same name that are already in their file. Other jobs in the file are kept.
pub fn write_to_dir<P>(root: P, org: &str, repo: &str, job_config: JobConfig) -> Result<()>
where
    P: AsRef<Path>,
{
    let org_repo = format!("{}/{}", org, repo);
    let JobConfig {
        mut presubmits,
        mut postsubmits,
        periodics,
    } = job_config;
    let dir = root.as_ref().join(org).join(repo);
    let path_for = |branch: &str, job_type: JobType| {
        dir.join(format!(
            "{}-{}-{}-{}.yaml",
            org,
            repo,
            make_regex_filename_label(branch),
            job_type
        ))
    };

    let mut files: BTreeMap<PathBuf, JobConfig> = BTreeMap::new();
    for job in presubmits.remove(&org_repo).unwrap_or_default() {
        let path = path_for(branch_of(&job.brancher.branches), JobType::Presubmits);
        files
            .entry(path)
            .or_default()
            .presubmits
            .entry(org_repo.clone())
            .or_default()
            .push(job);
    }
    for job in postsubmits.remove(&org_repo).unwrap_or_default() {
        let path = path_for(branch_of(&job.brancher.branches), JobType::Postsubmits);
        files
            .entry(path)
            .or_default()
            .postsubmits
            .entry(org_repo.clone())
            .or_default()
            .push(job);
    }
    if !periodics.is_empty() {
        files
            .entry(path_for(DEFAULT_BRANCH, JobType::Periodics))
            .or_default()
            .periodics = periodics;
    }

    for (path, new) in files {
        let mut merged = if path.exists() {
            read_from_file(&path)?
        } else {
            JobConfig::default()
        };
        for (key, jobs) in new.presubmits {
            let old = merged.presubmits.remove(&key).unwrap_or_default();
            merged.presubmits.insert(key, merge_jobs(old, jobs));
        }
        for (key, jobs) in new.postsubmits {
            let old = merged.postsubmits.remove(&key).unwrap_or_default();
            merged.postsubmits.insert(key, merge_jobs(old, jobs));
        }
        if !new.periodics.is_empty() {
            let old = std::mem::take(&mut merged.periodics);
            merged.periodics = merge_jobs(old, new.periodics);
        }
        write_to_file(&path, &merged)?;
    }
    Ok(())
}

/// Walks the job files under `root/sub_dir`, hands each one to `f` and writes or deletes it as
/// `f` decides. Periodics files are never touched. A `sub_dir` that does not exist holds no jobs.
pub fn rewrite_subdir<P, F>(root: P, sub_dir: &str, mut f: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnMut(JobConfig, &JobFileInfo) -> Result<Rewrite>,
{
    let dir = root.as_ref().join(sub_dir);
    if !dir.exists() {
        debug!("No job files in '{}'", dir.display());
        return Ok(());
    }
    for path in yaml_files(&dir)? {
        // Periodics files are not always named after a repository, e.g. `infra-periodics.yaml`.
        if job_type_of(&path) == Some(JobType::Periodics) {
            debug!("Skipping periodics file '{}'", path.display());
            continue;
        }
        let info = JobFileInfo::from_path(&path)?;
        let job_config = read_from_file(&path)?;
        match f(job_config, &info)? {
            Rewrite::Write(job_config) => write_to_file(&path, &job_config)?,
            Rewrite::Delete => delete_file(&path)?,
        }
    }
    Ok(())
}

/// The job type named by the last `-` separated part of the file name, whatever comes before it.
fn job_type_of(path: &Path) -> Option<JobType> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.rsplit('-').next())
        .and_then(|suffix| suffix.parse().ok())
}

fn branch_of(branches: &[String]) -> &str {
    branches.first().map(String::as_str).unwrap_or(DEFAULT_BRANCH)
}

fn merge_jobs<J>(old: Vec<J>, new: Vec<J>) -> Vec<J>
where
    J: ProwJob,
{
    let replaced: BTreeSet<String> = new.iter().map(|job| job.name().to_owned()).collect();
    let mut jobs: Vec<J> = old
        .into_iter()
        .filter(|job| !replaced.contains(job.name()))
        .chain(new)
        .collect();
    jobs.sort_by(|a, b| a.name().cmp(b.name()));
    jobs
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prow::{Brancher, JobBase, Postsubmit, Presubmit, ProwgenLabel};
    use crate::LABEL_PROWGEN_CONTROLLED;
    use maplit::btreemap;
    use tempfile::TempDir;

    fn presubmit(name: &str, branch: &str) -> Presubmit {
        Presubmit {
            job_base: job_base(name),
            brancher: Brancher {
                branches: vec![branch.to_owned()],
                ..Default::default()
            },
            always_run: true,
            context: String::new(),
            rerun_command: String::new(),
            trigger: String::new(),
            other: Default::default(),
        }
    }

    fn postsubmit(name: &str, branch: &str) -> Postsubmit {
        Postsubmit {
            job_base: job_base(name),
            brancher: Brancher {
                branches: vec![branch.to_owned()],
                ..Default::default()
            },
            other: Default::default(),
        }
    }

    fn job_base(name: &str) -> JobBase {
        JobBase {
            name: name.to_owned(),
            labels: btreemap! {
                LABEL_PROWGEN_CONTROLLED.to_owned() => ProwgenLabel::New.to_string(),
            },
            agent: None,
            decorate: false,
            decoration_config: None,
            spec: None,
        }
    }

    fn names<J: ProwJob>(jobs: &[J]) -> Vec<&str> {
        jobs.iter().map(ProwJob::name).collect()
    }

    #[test]
    fn job_file_info() {
        let info =
            JobFileInfo::from_path("jobs/openshift/origin/openshift-origin-release-3.11-presubmits.yaml")
                .unwrap();
        assert_eq!(info.org, "openshift");
        assert_eq!(info.repo, "origin");
        assert_eq!(info.branch, "release-3.11");
        assert_eq!(info.job_type, JobType::Presubmits);

        let info = JobFileInfo::from_path("openshift/origin/openshift-origin-master-periodics.yaml")
            .unwrap();
        assert_eq!(info.job_type, JobType::Periodics);

        assert!(JobFileInfo::from_path("openshift/origin/openshift-origin-master-jobs.yaml").is_err());
        assert!(JobFileInfo::from_path("openshift/origin/other-origin-master-presubmits.yaml").is_err());
        assert!(JobFileInfo::from_path("infra-periodics.yaml").is_err());
    }

    #[test]
    fn filename_labels() {
        assert_eq!(make_regex_filename_label("master"), "master");
        assert_eq!(make_regex_filename_label("^master$"), "master");
        assert_eq!(make_regex_filename_label(r"^release-4\.1$"), "release-4.1");
        assert_eq!(make_regex_filename_label("feature/x"), "feature-x");
        assert_eq!(make_regex_filename_label("^(a|b)+$"), "ab");
        assert_eq!(JobType::Postsubmits.to_string(), "postsubmits");
    }

    #[test]
    fn write_groups_jobs_by_file() {
        let tempdir = TempDir::new().unwrap();
        let job_config = JobConfig {
            presubmits: btreemap! {
                "org/repo".to_owned() => vec![
                    presubmit("pull-ci-org-repo-master-unit", "master"),
                    presubmit("pull-ci-org-repo-release-4.1-unit", "release-4.1"),
                ],
            },
            postsubmits: btreemap! {
                "org/repo".to_owned() => vec![postsubmit("branch-ci-org-repo-master-images", "^master$")],
            },
            periodics: Vec::new(),
        };
        write_to_dir(tempdir.path(), "org", "repo", job_config).unwrap();

        let dir = tempdir.path().join("org").join("repo");
        let master = read_from_file(dir.join("org-repo-master-presubmits.yaml")).unwrap();
        assert_eq!(
            names(&master.presubmits["org/repo"]),
            vec!["pull-ci-org-repo-master-unit"]
        );
        assert!(master.postsubmits.is_empty());
        let release = read_from_file(dir.join("org-repo-release-4.1-presubmits.yaml")).unwrap();
        assert_eq!(release.presubmits["org/repo"].len(), 1);
        let post = read_from_file(dir.join("org-repo-master-postsubmits.yaml")).unwrap();
        assert_eq!(
            names(&post.postsubmits["org/repo"]),
            vec!["branch-ci-org-repo-master-images"]
        );
    }

    #[test]
    fn write_merges_with_existing_file() {
        let tempdir = TempDir::new().unwrap();
        let path = tempdir
            .path()
            .join("org")
            .join("repo")
            .join("org-repo-master-presubmits.yaml");
        let mut hand_written = presubmit("pull-ci-org-repo-master-zz-manual", "master");
        hand_written.job_base.labels.clear();
        let mut old = presubmit("pull-ci-org-repo-master-unit", "master");
        old.always_run = false;
        write_to_file(
            &path,
            &JobConfig {
                presubmits: btreemap! {
                    "org/repo".to_owned() => vec![hand_written.clone(), old],
                },
                ..Default::default()
            },
        )
        .unwrap();

        let job_config = JobConfig {
            presubmits: btreemap! {
                "org/repo".to_owned() => vec![
                    presubmit("pull-ci-org-repo-master-unit", "master"),
                    presubmit("pull-ci-org-repo-master-e2e", "master"),
                ],
            },
            ..Default::default()
        };
        write_to_dir(tempdir.path(), "org", "repo", job_config).unwrap();

        let merged = read_from_file(&path).unwrap();
        let jobs = &merged.presubmits["org/repo"];
        assert_eq!(
            names(jobs),
            vec![
                "pull-ci-org-repo-master-e2e",
                "pull-ci-org-repo-master-unit",
                "pull-ci-org-repo-master-zz-manual"
            ]
        );
        assert!(jobs[1].always_run);
        assert_eq!(jobs[2], hand_written);
    }

    #[test]
    fn rewrite_skips_periodics_and_deletes() {
        let tempdir = TempDir::new().unwrap();
        let dir = tempdir.path().join("org").join("repo");
        let presubmits = dir.join("org-repo-master-presubmits.yaml");
        let postsubmits = dir.join("org-repo-master-postsubmits.yaml");
        let periodics = dir.join("org-repo-master-periodics.yaml");
        write_to_file(
            &presubmits,
            &JobConfig {
                presubmits: btreemap! {
                    "org/repo".to_owned() => vec![presubmit("pull-ci-org-repo-master-unit", "master")],
                },
                ..Default::default()
            },
        )
        .unwrap();
        write_to_file(
            &postsubmits,
            &JobConfig {
                postsubmits: btreemap! {
                    "org/repo".to_owned() => vec![postsubmit("branch-ci-org-repo-master-images", "^master$")],
                },
                ..Default::default()
            },
        )
        .unwrap();
        fs::write(&periodics, "not: [ a job file").unwrap();

        let mut seen = Vec::new();
        rewrite_subdir(tempdir.path(), "org", |job_config, info| {
            seen.push(info.job_type);
            Ok(if job_config.presubmits.is_empty() {
                Rewrite::Delete
            } else {
                Rewrite::Write(JobConfig::default())
            })
        })
        .unwrap();

        assert_eq!(seen, vec![JobType::Postsubmits, JobType::Presubmits]);
        assert!(!postsubmits.exists());
        assert!(read_from_file(&presubmits).unwrap().presubmits.is_empty());
        assert_eq!(fs::read_to_string(&periodics).unwrap(), "not: [ a job file");
    }

    #[test]
    fn rewrite_skips_periodics_named_after_anything() {
        let tempdir = TempDir::new().unwrap();
        let infra = tempdir.path().join("infra-periodics.yaml");
        fs::write(&infra, "periodics: []\n").unwrap();
        let presubmits = tempdir
            .path()
            .join("org")
            .join("repo")
            .join("org-repo-master-presubmits.yaml");
        write_to_file(
            &presubmits,
            &JobConfig {
                presubmits: btreemap! {
                    "org/repo".to_owned() => vec![presubmit("pull-ci-org-repo-master-unit", "master")],
                },
                ..Default::default()
            },
        )
        .unwrap();

        let mut seen = Vec::new();
        rewrite_subdir(tempdir.path(), "", |job_config, info| {
            seen.push(info.filename.clone());
            Ok(Rewrite::Write(job_config))
        })
        .unwrap();

        assert_eq!(seen, vec![presubmits]);
        assert_eq!(fs::read_to_string(&infra).unwrap(), "periodics: []\n");
        assert_eq!(job_type_of(&infra), Some(JobType::Periodics));
        assert_eq!(job_type_of(Path::new("org-repo-master-jobs.yaml")), None);
    }

    #[test]
    fn deleting_a_file_that_is_already_gone() {
        let tempdir = TempDir::new().unwrap();
        let path = tempdir
            .path()
            .join("org")
            .join("repo")
            .join("org-repo-master-postsubmits.yaml");
        write_to_file(&path, &JobConfig::default()).unwrap();

        rewrite_subdir(tempdir.path(), "org", |_, info| {
            fs::remove_file(&info.filename).unwrap();
            Ok(Rewrite::Delete)
        })
        .unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn rewrite_missing_subdir() {
        let tempdir = TempDir::new().unwrap();
        rewrite_subdir(tempdir.path(), "nothing-here", |_, _| Ok(Rewrite::Delete)).unwrap();
    }
}
