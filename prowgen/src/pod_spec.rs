use crate::cloud_profile::{
    cloud_for, config_map_name, needs_config_map, secret_name, RANDOM_PROFILES,
};
use crate::constants::{
    CI_OPERATOR, CI_OPERATOR_IMAGE, CLUSTER_PROFILE_VOLUME, CONFIG_SPEC, CPU_REQUEST, E2E_TARGETS,
    JOB_DEFINITION_VOLUME, PULL_ALWAYS, RPM_MIRROR, SENTRY_DSN_MOUNT_PATH, SENTRY_DSN_SECRET,
    SENTRY_DSN_SECRET_PATH, SENTRY_DSN_VOLUME,
};
use k8s_openapi::api::core::v1::{
    ConfigMapKeySelector, ConfigMapProjection, ConfigMapVolumeSource, Container, EnvVar,
    EnvVarSource, PodSpec, ProjectedVolumeSource, ResourceRequirements, SecretProjection,
    SecretVolumeSource, Volume, VolumeMount, VolumeProjection,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use prowgen_model::{ClusterProfile, Info, TestKind, TestStepConfiguration};
use std::collections::BTreeMap;

/// The org/repo whose tests install the RPMs they build themselves.
const ORIGIN: &str = "openshift/origin";

/// Collects the ci-operator container and the volumes of its pod while a pod spec is put
/// together.
#[derive(Debug, Clone)]
pub(crate) struct PodSpecBuilder<'a> {
    info: &'a Info,
    command: Vec<String>,
    args: Vec<String>,
    env: Vec<EnvVar>,
    volume_mounts: Vec<VolumeMount>,
    volumes: Vec<Volume>,
}

impl<'a> PodSpecBuilder<'a> {
    /// A pod that can read the configuration of `info` and report to Sentry, but runs nothing yet.
    pub(crate) fn new(info: &'a Info) -> Self {
        Self {
            info,
            command: Vec::new(),
            args: Vec::new(),
            env: vec![EnvVar {
                name: CONFIG_SPEC.to_owned(),
                value: None,
                value_from: Some(EnvVarSource {
                    config_map_key_ref: Some(ConfigMapKeySelector {
                        name: Some(info.config_map_name()),
                        key: info.basename(),
                        ..ConfigMapKeySelector::default()
                    }),
                    ..EnvVarSource::default()
                }),
            }],
            volume_mounts: vec![VolumeMount {
                name: SENTRY_DSN_VOLUME.to_owned(),
                mount_path: SENTRY_DSN_MOUNT_PATH.to_owned(),
                read_only: Some(true),
                ..VolumeMount::default()
            }],
            volumes: vec![Volume {
                name: SENTRY_DSN_VOLUME.to_owned(),
                secret: Some(SecretVolumeSource {
                    secret_name: Some(SENTRY_DSN_SECRET.to_owned()),
                    ..SecretVolumeSource::default()
                }),
                ..Volume::default()
            }],
        }
    }

    /// A pod running ci-operator for `target`. `additional_args` follow the common arguments.
    pub(crate) fn ci_operator<S>(info: &'a Info, target: &str, additional_args: &[S]) -> Self
    where
        S: AsRef<str>,
    {
        let mut builder = Self::new(info);
        builder.command = vec![CI_OPERATOR.to_owned()];
        builder
            .arg("--give-pr-author-access-to-namespace=true")
            .arg("--artifact-dir=$(ARTIFACTS)")
            .arg(format!("--target={}", target))
            .arg(format!("--sentry-dsn-path={}", SENTRY_DSN_SECRET_PATH));
        for arg in additional_args {
            builder.arg(arg.as_ref());
        }
        builder
    }

    /// Appends an argument to the ci-operator command line.
    ///
    /// # Panics
    ///
    /// ci-operator only understands `--flag=value` arguments, anything else is a bug in the caller.
    pub(crate) fn arg<S>(&mut self, arg: S) -> &mut Self
    where
        S: Into<String>,
    {
        let arg = arg.into();
        assert!(
            arg.starts_with("--"),
            "all args to ci-operator must be in the form --flag=value, not {}",
            arg
        );
        self.args.push(arg);
        self
    }

    pub(crate) fn env<S1, S2>(&mut self, name: S1, value: S2) -> &mut Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        self.env.push(EnvVar {
            name: name.into(),
            value: Some(value.into()),
            value_from: None,
        });
        self
    }

    pub(crate) fn volume(&mut self, volume: Volume) -> &mut Self {
        self.volumes.push(volume);
        self
    }

    pub(crate) fn mount<S1, S2>(
        &mut self,
        name: S1,
        mount_path: S2,
        sub_path: Option<String>,
    ) -> &mut Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        self.volume_mounts.push(VolumeMount {
            name: name.into(),
            mount_path: mount_path.into(),
            sub_path,
            ..VolumeMount::default()
        });
        self
    }

    pub(crate) fn build(self) -> PodSpec {
        PodSpec {
            service_account_name: Some(CI_OPERATOR.to_owned()),
            containers: vec![Container {
                name: String::new(),
                image: Some(CI_OPERATOR_IMAGE.to_owned()),
                image_pull_policy: Some(PULL_ALWAYS.to_owned()),
                command: non_empty(self.command),
                args: non_empty(self.args),
                env: non_empty(self.env),
                resources: Some(ResourceRequirements {
                    requests: Some(
                        [("cpu".to_owned(), Quantity(CPU_REQUEST.to_owned()))]
                            .into_iter()
                            .collect::<BTreeMap<_, _>>(),
                    ),
                    ..ResourceRequirements::default()
                }),
                volume_mounts: non_empty(self.volume_mounts),
                ..Container::default()
            }],
            volumes: non_empty(self.volumes),
            ..PodSpec::default()
        }
    }
}

/// The pod spec of a job that runs ci-operator for `target`.
pub(crate) fn ci_operator_pod_spec<S>(info: &Info, target: &str, additional_args: &[S]) -> PodSpec
where
    S: AsRef<str>,
{
    PodSpecBuilder::ci_operator(info, target, additional_args).build()
}

/// The pod spec of the job that runs `test`. `release` is the name of the release the component
/// is built against.
pub(crate) fn pod_spec_for_test(info: &Info, release: &str, test: &TestStepConfiguration) -> PodSpec {
    match shape(&test.kind) {
        Shape::Container => ci_operator_pod_spec::<&str>(info, &test.as_, &[]),
        Shape::Random => random_pod_spec(info, test),
        Shape::Cluster(cluster) => cluster_pod_spec(info, release, test, &cluster),
    }
}

enum Shape<'a> {
    Container,
    Random,
    Cluster(ClusterTest<'a>),
}

/// What a test that launches a cluster from a job definition template needs.
struct ClusterTest<'a> {
    /// The job definition template. Some installer tests have the template built into
    /// ci-operator.
    template: Option<&'static str>,
    profile: &'a ClusterProfile,
    /// The image stream tag the tests run from, if not the default one.
    test_image_stream_tag: Option<&'a str>,
    /// openshift-ansible installs the RPMs of the release under test.
    needs_release_rpms: bool,
}

impl<'a> ClusterTest<'a> {
    fn ansible(template: &'static str, profile: &'a ClusterProfile) -> Self {
        Self {
            template: Some(template),
            profile,
            test_image_stream_tag: None,
            needs_release_rpms: true,
        }
    }

    fn installer(template: Option<&'static str>, profile: &'a ClusterProfile) -> Self {
        Self {
            template,
            profile,
            test_image_stream_tag: None,
            needs_release_rpms: false,
        }
    }
}

fn shape(kind: &TestKind) -> Shape<'_> {
    match kind {
        TestKind::Container(_) => Shape::Container,
        TestKind::OpenshiftInstallerRandom(_) => Shape::Random,
        TestKind::OpenshiftAnsible(c) => {
            Shape::Cluster(ClusterTest::ansible("cluster-launch-e2e", &c.cluster_profile))
        }
        TestKind::OpenshiftAnsibleSrc(c) => {
            Shape::Cluster(ClusterTest::ansible("cluster-launch-src", &c.cluster_profile))
        }
        TestKind::OpenshiftAnsibleCustom(c) => Shape::Cluster(ClusterTest::ansible(
            "cluster-launch-e2e-openshift-ansible",
            &c.cluster_profile,
        )),
        TestKind::OpenshiftAnsibleUpgrade(c) => Shape::Cluster(ClusterTest::ansible(
            "cluster-launch-e2e-upgrade",
            &c.cluster_profile,
        )),
        TestKind::OpenshiftAnsible40(c) => Shape::Cluster(ClusterTest::ansible(
            "cluster-scaleup-e2e-40",
            &c.cluster_profile,
        )),
        TestKind::OpenshiftInstaller(c) => Shape::Cluster(ClusterTest::installer(
            (!c.upgrade).then(|| "cluster-launch-installer-e2e"),
            &c.cluster_profile,
        )),
        TestKind::OpenshiftInstallerSrc(c) => Shape::Cluster(ClusterTest::installer(
            Some("cluster-launch-installer-src"),
            &c.cluster_profile,
        )),
        TestKind::OpenshiftInstallerUpi(c) => Shape::Cluster(ClusterTest::installer(
            Some("cluster-launch-installer-upi-e2e"),
            &c.cluster_profile,
        )),
        TestKind::OpenshiftInstallerConsole(c) => Shape::Cluster(ClusterTest::installer(
            Some("cluster-launch-installer-console"),
            &c.cluster_profile,
        )),
        TestKind::OpenshiftInstallerCustomTestImage(c) => Shape::Cluster(ClusterTest {
            test_image_stream_tag: Some(c.from.as_str()),
            ..ClusterTest::installer(
                Some("cluster-launch-installer-custom-test-image"),
                &c.cluster_profile,
            )
        }),
    }
}

fn cluster_pod_spec(
    info: &Info,
    release: &str,
    test: &TestStepConfiguration,
    cluster: &ClusterTest<'_>,
) -> PodSpec {
    let cloud = cloud_for(cluster.profile).unwrap_or_default();
    let secret_dir = format!("/usr/local/{}-cluster-profile", test.as_);
    let template_path = format!("/usr/local/{}", test.as_);

    let mut profile_volume = cluster_profile_volume(CLUSTER_PROFILE_VOLUME, &secret_name(cloud));
    if needs_config_map(cluster.profile) {
        if let Some(sources) = profile_volume
            .projected
            .as_mut()
            .and_then(|projected| projected.sources.as_mut())
        {
            sources.push(config_map_projection(config_map_name(cluster.profile)));
        }
    }

    let mut builder = PodSpecBuilder::ci_operator::<&str>(info, &test.as_, &[]);
    if let Some(template) = cluster.template {
        builder.volume(config_map_volume(
            JOB_DEFINITION_VOLUME,
            &[format!("prow-job-{}", template)],
        ));
    }
    builder
        .volume(profile_volume)
        .arg(format!("--secret-dir={}", secret_dir));
    if cluster.template.is_some() {
        builder.arg(format!("--template={}", template_path));
    }
    builder.mount(CLUSTER_PROFILE_VOLUME, &secret_dir, None);
    if let Some(template) = cluster.template {
        builder
            .mount(
                JOB_DEFINITION_VOLUME,
                &template_path,
                Some(format!("{}.yaml", template)),
            )
            .env("CLUSTER_TYPE", cloud)
            .env("JOB_NAME_SAFE", job_name_safe(&test.as_))
            .env("TEST_COMMAND", &test.commands);
        if let Some(tag) = cluster.test_image_stream_tag {
            builder.env("TEST_IMAGESTREAM_TAG", tag);
        }
    }
    if cluster.needs_release_rpms && info.org_repo() != ORIGIN {
        builder.env("RPM_REPO_OPENSHIFT_ORIGIN", rpm_repo_url(release));
    }
    match &test.kind {
        TestKind::OpenshiftAnsible40(_) => {
            builder.env("RPM_REPO_CRIO_DIR", format!("{}-rhel-7", release));
        }
        TestKind::OpenshiftAnsibleUpgrade(upgrade) => {
            builder
                .env("PREVIOUS_ANSIBLE_VERSION", &upgrade.previous_version)
                .env(
                    "PREVIOUS_IMAGE_ANSIBLE",
                    format!(
                        "docker.io/openshift/origin-ansible:v{}",
                        upgrade.previous_version
                    ),
                )
                .env("PREVIOUS_RPM_DEPENDENCIES_REPO", &upgrade.previous_rpm_deps)
                .env("PREVIOUS_RPM_REPO", rpm_repo_url(&upgrade.previous_version));
        }
        _ => {}
    }
    builder.build()
}

/// Installer tests that pick their cloud when the job runs. The pod carries the credentials and
/// templates of every candidate cloud and a script that draws one of them from the weights in the
/// `e2e-targets` config map.
fn random_pod_spec(info: &Info, test: &TestStepConfiguration) -> PodSpec {
    let mut builder = PodSpecBuilder::new(info);
    for profile in &RANDOM_PROFILES {
        builder.volume(cluster_profile_volume(
            &format!("cluster-profile-{}", profile),
            &secret_name(profile.as_str()),
        ));
    }
    builder
        .volume(config_map_volume(
            JOB_DEFINITION_VOLUME,
            &[
                "prow-job-cluster-launch-installer-e2e".to_owned(),
                "prow-job-cluster-launch-installer-upi-e2e".to_owned(),
            ],
        ))
        .volume(config_map_volume(E2E_TARGETS, &[E2E_TARGETS.to_owned()]));
    builder.command = vec!["bash".to_owned()];
    builder.args = vec!["-c".to_owned(), random_target_script(&test.as_)];
    builder
        .env("JOB_NAME_SAFE", job_name_safe(&test.as_))
        .env("TEST_COMMAND", &test.commands);
    for profile in &RANDOM_PROFILES {
        builder.mount(
            format!("cluster-profile-{}", profile),
            format!("/usr/local/cluster-profiles/{}", profile),
            None,
        );
    }
    builder
        .mount(
            E2E_TARGETS,
            format!("/usr/local/{}", E2E_TARGETS),
            Some(E2E_TARGETS.to_owned()),
        )
        .mount(JOB_DEFINITION_VOLUME, "/usr/local/job-definition", None);
    builder.build()
}

fn random_target_script(target: &str) -> String {
    format!(
        r#"set -eux
target=$(awk < /usr/local/e2e-targets \
    --assign "r=$RANDOM" \
    'BEGIN {{ r /= 32767 }} (r -= $1) <= 0 {{ print $2; exit }}')
case "$target" in
    aws) template=e2e; CLUSTER_TYPE=aws;;
    azure) template=e2e; CLUSTER_TYPE=azure4;;
    aws-upi) template=upi-e2e; CLUSTER_TYPE=aws;;
    vsphere) template=upi-e2e; CLUSTER_TYPE=vsphere;;
    *) echo >&2 "invalid target $target"; exit 1 ;;
esac
ln -s "/usr/local/job-definition/cluster-launch-installer-$template.yaml" /tmp/{target}
ln -s "/usr/local/cluster-profiles/$CLUSTER_TYPE" /tmp/{target}-cluster-profile
export CLUSTER_TYPE
exec ci-operator \
    --artifact-dir=$(ARTIFACTS) \
    --give-pr-author-access-to-namespace=true \
    --secret-dir=/tmp/{target}-cluster-profile \
    --sentry-dsn-path={sentry} \
    --target={target} \
    --template=/tmp/{target}
"#,
        target = target,
        sentry = SENTRY_DSN_SECRET_PATH,
    )
}

/// The RPM repository of an origin release. Releases are either named `origin-v<version>` or
/// just `<version>`.
pub(crate) fn rpm_repo_url(release: &str) -> String {
    if release.starts_with("origin-v") {
        format!("{}/openshift-{}/", RPM_MIRROR, release)
    } else {
        format!("{}/openshift-origin-v{}/", RPM_MIRROR, release)
    }
}

fn job_name_safe(name: &str) -> String {
    name.replace('_', "-")
}

fn cluster_profile_volume(name: &str, secret: &str) -> Volume {
    Volume {
        name: name.to_owned(),
        projected: Some(ProjectedVolumeSource {
            sources: Some(vec![VolumeProjection {
                secret: Some(SecretProjection {
                    name: Some(secret.to_owned()),
                    ..SecretProjection::default()
                }),
                ..VolumeProjection::default()
            }]),
            ..ProjectedVolumeSource::default()
        }),
        ..Volume::default()
    }
}

/// A volume with the contents of the given config maps. A single config map is mounted as is,
/// several are projected into one volume.
fn config_map_volume(name: &str, config_maps: &[String]) -> Volume {
    let mut volume = Volume {
        name: name.to_owned(),
        ..Volume::default()
    };
    match config_maps {
        [] => {}
        [config_map] => {
            volume.config_map = Some(ConfigMapVolumeSource {
                name: Some(config_map.to_owned()),
                ..ConfigMapVolumeSource::default()
            })
        }
        _ => {
            volume.projected = Some(ProjectedVolumeSource {
                sources: Some(
                    config_maps
                        .iter()
                        .map(|config_map| config_map_projection(config_map.to_owned()))
                        .collect(),
                ),
                ..ProjectedVolumeSource::default()
            })
        }
    }
    volume
}

fn config_map_projection(name: String) -> VolumeProjection {
    VolumeProjection {
        config_map: Some(ConfigMapProjection {
            name: Some(name),
            ..ConfigMapProjection::default()
        }),
        ..VolumeProjection::default()
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}
