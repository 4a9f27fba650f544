use crate::constants::LABEL_PROWGEN_CONTROLLED;
use k8s_openapi::api::core::v1::PodSpec;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// The Prow job configuration held by one job file. Jobs are keyed by `<org>/<repo>`.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct JobConfig {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub presubmits: BTreeMap<String, Vec<Presubmit>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub postsubmits: BTreeMap<String, Vec<Postsubmit>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub periodics: Vec<Periodic>,
}

impl JobConfig {
    /// Whether there are no presubmits and no postsubmits. Periodics are not considered.
    pub fn has_no_triggered_jobs(&self) -> bool {
        self.presubmits.values().all(Vec::is_empty)
            && self.postsubmits.values().all(Vec::is_empty)
    }
}

/// The values of the [`LABEL_PROWGEN_CONTROLLED`] label.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProwgenLabel {
    /// Put on jobs while they are being generated. It only survives until the stale jobs have
    /// been pruned.
    #[serde(rename = "newly-generated")]
    New,
    /// Put on generated jobs once the jobs they replace have been pruned.
    #[serde(rename = "true")]
    Generated,
}

derive_display_from_serialize!(ProwgenLabel);
derive_fromstr_from_deserialize!(ProwgenLabel);

/// The settings shared by all kinds of jobs. Keys of the job that are not modeled here are kept by
/// the job that flattens this struct.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JobBase {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub decorate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoration_config: Option<DecorationConfig>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_pod_spec"
    )]
    pub spec: Option<PodSpec>,
}

impl JobBase {
    /// The value of the [`LABEL_PROWGEN_CONTROLLED`] label, if the job has it.
    pub fn prowgen_label(&self) -> Option<&str> {
        self.labels
            .get(LABEL_PROWGEN_CONTROLLED)
            .map(String::as_str)
    }

    pub fn set_prowgen_label(&mut self, label: ProwgenLabel) {
        self.labels
            .insert(LABEL_PROWGEN_CONTROLLED.to_owned(), label.to_string());
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct DecorationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_cloning: Option<bool>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// Which branches a job runs for. Entries are regular expressions.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Brancher {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_branches: Vec<String>,
}

// Flattened fields are filled in declaration order: the structs take the keys they know, so the
// catch-all map has to come last to only see the rest.

/// A job that runs against pull requests.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Presubmit {
    #[serde(flatten)]
    pub job_base: JobBase,
    #[serde(flatten)]
    pub brancher: Brancher,
    #[serde(default)]
    pub always_run: bool,
    /// The context the job reports its status under.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rerun_command: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub trigger: String,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// A job that runs after changes merge into a branch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Postsubmit {
    #[serde(flatten)]
    pub job_base: JobBase,
    #[serde(flatten)]
    pub brancher: Brancher,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// A job that runs on a schedule.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Periodic {
    #[serde(flatten)]
    pub job_base: JobBase,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cron: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub interval: String,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// Access to the [`JobBase`] of any kind of job.
pub trait ProwJob {
    fn job_base(&self) -> &JobBase;
    fn job_base_mut(&mut self) -> &mut JobBase;

    fn name(&self) -> &str {
        &self.job_base().name
    }
}

macro_rules! impl_prow_job {
    ($i:ident) => {
        impl ProwJob for $i {
            fn job_base(&self) -> &JobBase {
                &self.job_base
            }

            fn job_base_mut(&mut self) -> &mut JobBase {
                &mut self.job_base
            }
        }
    };
}

impl_prow_job!(Presubmit);
impl_prow_job!(Postsubmit);
impl_prow_job!(Periodic);

/// The comment that reruns the presubmit `name`.
pub fn default_rerun_command_for(name: &str) -> String {
    format!("/test {}", name)
}

/// The regular expression matching comments that trigger the presubmit `name`.
pub fn default_trigger_for(name: &str) -> String {
    format!(r"(?m)^/test( | .* ){},?($|\s.*)", name)
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Hand-written job files rarely name their containers, but `k8s-openapi` requires a name. An
/// empty one is filled in before the spec is handed to the Kubernetes type.
fn deserialize_pod_spec<'de, D>(deserializer: D) -> Result<Option<PodSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut value = match Option::<Value>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(value) => value,
    };
    if let Some(containers) = value
        .get_mut("containers")
        .and_then(Value::as_sequence_mut)
    {
        let name = Value::String("name".to_owned());
        for container in containers.iter_mut().filter_map(Value::as_mapping_mut) {
            if !container.contains_key(&name) {
                container.insert(name.clone(), Value::String(String::new()));
            }
        }
    }
    serde_yaml::from_value(value).map(Some).map_err(D::Error::custom)
}
