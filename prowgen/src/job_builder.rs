use crate::branch::make_branch_explicit;
use k8s_openapi::api::core::v1::PodSpec;
use log::warn;
use prowgen_model::constants::{POSTSUBMIT_PREFIX, PRESUBMIT_PREFIX, PROW_AGENT};
use prowgen_model::prow::{default_rerun_command_for, default_trigger_for};
use prowgen_model::{
    Brancher, DecorationConfig, Info, JobBase, Postsubmit, Presubmit, ProwgenLabel,
    LABEL_PROWGEN_CONTROLLED, LABEL_VARIANT,
};
use std::collections::BTreeMap;

/// Prow labels the resources of a job with its name, and label values are limited to 63
/// characters.
const MAX_JOB_NAME_LENGTH: usize = 63;
/// Names with a prefix at least this long leave the test author little room, so they are not
/// warned about.
const MAX_WARNED_PREFIX_LENGTH: usize = 53;

/// Wraps the pod spec of a test into a Prow job for the component described by `info`.
#[derive(Debug, Clone)]
pub(crate) struct JobBuilder<'a> {
    /// The name of the test, or of the pseudo-test that builds images.
    pub(crate) name: &'a str,
    pub(crate) info: &'a Info,
    pub(crate) label: ProwgenLabel,
    pub(crate) pod_spec: PodSpec,
}

impl JobBuilder<'_> {
    /// A job that runs for every pull request against the branch.
    pub(crate) fn build_presubmit(self) -> Presubmit {
        let name = self.variant_name();
        let branch = self.info.branch.clone();
        Presubmit {
            context: format!("ci/prow/{}", name),
            rerun_command: default_rerun_command_for(&name),
            trigger: default_trigger_for(&name),
            always_run: true,
            brancher: Brancher {
                branches: vec![branch],
                ..Brancher::default()
            },
            job_base: self.build_base(&name, PRESUBMIT_PREFIX),
            other: BTreeMap::new(),
        }
    }

    /// A job that runs for every change merged into the branch, and nothing else.
    pub(crate) fn build_postsubmit(self) -> Postsubmit {
        let name = self.variant_name();
        let branch = make_branch_explicit(&self.info.branch);
        Postsubmit {
            brancher: Brancher {
                branches: vec![branch],
                ..Brancher::default()
            },
            job_base: self.build_base(&name, POSTSUBMIT_PREFIX),
            other: BTreeMap::new(),
        }
    }

    /// Jobs of a variant configuration are told apart from the jobs of the main configuration
    /// by their name.
    fn variant_name(&self) -> String {
        if self.info.variant.is_empty() {
            self.name.to_owned()
        } else {
            format!("{}-{}", self.info.variant, self.name)
        }
    }

    fn build_base(self, name: &str, prefix: &str) -> JobBase {
        let job_prefix = format!(
            "{}-ci-{}-{}-{}-",
            prefix, self.info.org, self.info.repo, self.info.branch
        );
        let job_name = format!("{}{}", job_prefix, name);
        if job_name.len() > MAX_JOB_NAME_LENGTH && job_prefix.len() < MAX_WARNED_PREFIX_LENGTH {
            warn!(
                "Generated job name '{}' is longer than {} characters. This may cause issues when \
                 Prow attempts to label resources with job name. Consider a shorter name.",
                job_name, MAX_JOB_NAME_LENGTH
            );
        }

        JobBase {
            name: job_name,
            labels: create_labels(self.label, &self.info.variant),
            agent: Some(PROW_AGENT.to_owned()),
            decorate: true,
            decoration_config: Some(DecorationConfig {
                skip_cloning: Some(true),
                ..DecorationConfig::default()
            }),
            spec: Some(self.pod_spec),
        }
    }
}

/// Creates the labels that mark a job as generated.
fn create_labels(label: ProwgenLabel, variant: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(LABEL_PROWGEN_CONTROLLED.to_owned(), label.to_string());
    if !variant.is_empty() {
        labels.insert(LABEL_VARIANT.to_owned(), variant.to_owned());
    }
    labels
}
