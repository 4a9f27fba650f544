use crate::constants::{IMAGES_JOB, IMAGES_TARGET, RELEASE_LATEST_TARGET};
use crate::job_builder::JobBuilder;
use crate::pod_spec::{ci_operator_pod_spec, pod_spec_for_test};
use log::info;
use prowgen_model::{jobconfig, Info, JobConfig, ProwgenLabel, ReleaseBuildConfiguration};
use std::path::Path;

/// Generates the jobs of one ci-operator configuration:
///
/// - one presubmit for every test, in the order the tests are declared
/// - if the configuration builds images, a presubmit that builds them
/// - if the configuration also promotes them, a postsubmit that builds and promotes them
///
/// Every job carries the prowgen label with the value `label`.
pub(crate) fn generate_jobs(
    config: &ReleaseBuildConfiguration,
    info: &Info,
    label: ProwgenLabel,
) -> JobConfig {
    let mut presubmits = Vec::new();
    let mut postsubmits = Vec::new();

    for test in &config.tests {
        presubmits.push(
            JobBuilder {
                name: &test.as_,
                info,
                label,
                pod_spec: pod_spec_for_test(info, config.release(), test),
            }
            .build_presubmit(),
        );
    }

    if !config.images.is_empty() {
        let mut additional_args = Vec::new();
        if config.promotes_official_images() {
            additional_args.push(format!("--target={}", RELEASE_LATEST_TARGET));
        }
        presubmits.push(
            JobBuilder {
                name: IMAGES_JOB,
                info,
                label,
                pod_spec: ci_operator_pod_spec(info, IMAGES_TARGET, &additional_args),
            }
            .build_presubmit(),
        );

        if let Some(promotion) = &config.promotion {
            let additional_args: Vec<String> = std::iter::once("--promote".to_owned())
                .chain(
                    promotion
                        .additional_images
                        .sources()
                        .map(|source| format!("--target={}", source)),
                )
                .collect();
            postsubmits.push(
                JobBuilder {
                    name: IMAGES_JOB,
                    info,
                    label,
                    pod_spec: ci_operator_pod_spec(info, IMAGES_TARGET, &additional_args),
                }
                .build_postsubmit(),
            );
        }
    }

    let mut job_config = JobConfig::default();
    let org_repo = info.org_repo();
    if !presubmits.is_empty() {
        job_config.presubmits.insert(org_repo.clone(), presubmits);
    }
    if !postsubmits.is_empty() {
        job_config.postsubmits.insert(org_repo, postsubmits);
    }
    job_config
}

/// Generates the jobs of a configuration and writes them into the job files under `dir`.
pub(crate) fn generate_jobs_to_dir(
    dir: &Path,
    label: ProwgenLabel,
) -> impl FnMut(&ReleaseBuildConfiguration, &Info) -> prowgen_model::Result<()> + '_ {
    move |config, info| {
        info!(
            "Generating jobs for '{}' on branch '{}'",
            info.org_repo(),
            info.branch
        );
        jobconfig::write_to_dir(
            dir,
            &info.org,
            &info.repo,
            generate_jobs(config, info, label),
        )
    }
}
