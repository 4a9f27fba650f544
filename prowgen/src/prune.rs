use log::{debug, info};
use prowgen_model::{JobBase, JobConfig, JobFileInfo, ProwJob, ProwgenLabel, Rewrite};
use std::collections::BTreeMap;

/// Where a job in a job file stands after a generation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobState {
    /// Written by hand. Never touched.
    Unmanaged,
    /// Generated by an earlier pass and not generated again.
    Stale,
    /// Generated by this pass.
    Current,
}

pub(crate) fn classify(job: &JobBase) -> JobState {
    match job.prowgen_label().map(str::parse::<ProwgenLabel>) {
        None => JobState::Unmanaged,
        Some(Ok(ProwgenLabel::New)) => JobState::Current,
        Some(_) => JobState::Stale,
    }
}

/// Drops the stale jobs of a job file and marks the current ones as generated. Periodics are
/// copied over.
pub(crate) fn prune(job_config: JobConfig) -> JobConfig {
    JobConfig {
        presubmits: prune_repos(job_config.presubmits),
        postsubmits: prune_repos(job_config.postsubmits),
        periodics: job_config.periodics,
    }
}

/// Prunes a job file, deleting it when neither presubmits nor postsubmits are left.
pub(crate) fn prune_stale_jobs(
    job_config: JobConfig,
    file_info: &JobFileInfo,
) -> prowgen_model::Result<Rewrite> {
    let pruned = prune(job_config);
    if pruned.has_no_triggered_jobs() {
        info!(
            "Deleting '{}', no jobs are left in it",
            file_info.filename.display()
        );
        Ok(Rewrite::Delete)
    } else {
        Ok(Rewrite::Write(pruned))
    }
}

fn prune_repos<J>(repos: BTreeMap<String, Vec<J>>) -> BTreeMap<String, Vec<J>>
where
    J: ProwJob,
{
    repos
        .into_iter()
        .map(|(org_repo, jobs)| (org_repo, prune_jobs(jobs)))
        .filter(|(_, jobs)| !jobs.is_empty())
        .collect()
}

fn prune_jobs<J>(jobs: Vec<J>) -> Vec<J>
where
    J: ProwJob,
{
    jobs.into_iter()
        .filter_map(|mut job| match classify(job.job_base()) {
            JobState::Unmanaged => Some(job),
            JobState::Stale => {
                info!("Removing stale job '{}'", job.name());
                None
            }
            JobState::Current => {
                debug!("Keeping generated job '{}'", job.name());
                job.job_base_mut()
                    .set_prowgen_label(ProwgenLabel::Generated);
                Some(job)
            }
        })
        .collect()
}
