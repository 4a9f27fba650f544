use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// The promotion namespace of the official OpenShift release payload.
const OFFICIAL_NAMESPACE: &str = "ocp";

/// The parts of a ci-operator build configuration that decide which Prow jobs exist for it. The
/// configuration files carry many more keys (build root, resources, raw steps, ...); they are
/// ignored here.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct ReleaseBuildConfiguration {
    /// The release the component is built against.
    #[serde(default)]
    pub tag_specification: Option<ReleaseTagConfiguration>,
    /// Images built from the repository.
    #[serde(default)]
    pub images: Vec<ImageBuildConfiguration>,
    /// Where built images are published after a merge.
    #[serde(default)]
    pub promotion: Option<PromotionConfiguration>,
    /// Tests in the order they are declared.
    #[serde(default)]
    pub tests: Vec<TestStepConfiguration>,
}

impl ReleaseBuildConfiguration {
    /// The name of the release the component is built against, used to locate RPM repositories.
    /// Empty when the configuration has no tag specification.
    pub fn release(&self) -> &str {
        self.tag_specification
            .as_ref()
            .map_or("", |tag_specification| tag_specification.name.as_str())
    }

    /// Whether the images built for this configuration end up in the official release payload.
    pub fn promotes_official_images(&self) -> bool {
        let disabled = self
            .promotion
            .as_ref()
            .map_or(false, |promotion| promotion.disabled);
        !disabled && self.promotion_namespace() == OFFICIAL_NAMESPACE
    }

    fn promotion_namespace(&self) -> &str {
        match &self.promotion {
            Some(promotion) if !promotion.namespace.is_empty() => promotion.namespace.as_str(),
            _ => self
                .tag_specification
                .as_ref()
                .map_or("", |tag_specification| tag_specification.namespace.as_str()),
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct ReleaseTagConfiguration {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct ImageBuildConfiguration {
    #[serde(default)]
    pub from: Option<String>,
    pub to: String,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct PromotionConfiguration {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
    /// Images promoted in addition to the ones built from the repository.
    #[serde(default)]
    pub additional_images: AdditionalImages,
    #[serde(default)]
    pub excluded_images: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

/// A mapping of promoted tag to source image that remembers the order it was written in, so the
/// jobs generated from it do not change between runs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AdditionalImages(Vec<(String, String)>);

impl AdditionalImages {
    pub fn new(images: Vec<(String, String)>) -> Self {
        Self(images)
    }

    /// The source images, in declaration order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, source)| source.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for AdditionalImages {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedPairs;

        impl<'de> Visitor<'de> for OrderedPairs {
            type Value = AdditionalImages;

            fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of image tags to source images")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut images = Vec::new();
                while let Some((tag, source)) = map.next_entry::<String, String>()? {
                    images.push((tag, source));
                }
                Ok(AdditionalImages(images))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(AdditionalImages::default())
            }
        }

        deserializer.deserialize_map(OrderedPairs)
    }
}

/// One test declared by a configuration. Exactly one of the test kinds must be given.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(try_from = "RawTestStep")]
pub struct TestStepConfiguration {
    /// The name of the test.
    pub as_: String,
    /// The shell commands the test runs.
    pub commands: String,
    pub kind: TestKind,
}

/// The keys of [`TestKind`] as they appear in a configuration.
const TEST_KINDS: &[&str] = &[
    "container",
    "openshift_ansible",
    "openshift_ansible_src",
    "openshift_ansible_custom",
    "openshift_ansible_upgrade",
    "openshift_ansible_40",
    "openshift_installer",
    "openshift_installer_src",
    "openshift_installer_upi",
    "openshift_installer_console",
    "openshift_installer_custom_test_image",
    "openshift_installer_random",
];

/// A test as written. The first kind key found becomes `kind`; the remaining keys land in `rest`,
/// where a second kind key is caught.
#[derive(Deserialize)]
struct RawTestStep {
    #[serde(rename = "as")]
    as_: String,
    #[serde(default)]
    commands: String,
    #[serde(flatten)]
    kind: TestKind,
    #[serde(flatten)]
    rest: BTreeMap<String, serde_yaml::Value>,
}

impl TryFrom<RawTestStep> for TestStepConfiguration {
    type Error = String;

    fn try_from(raw: RawTestStep) -> Result<Self, Self::Error> {
        if let Some(extra) = raw
            .rest
            .keys()
            .find(|key| TEST_KINDS.contains(&key.as_str()))
        {
            return Err(format!(
                "test '{}' declares more than one kind, '{}' is not allowed alongside another",
                raw.as_, extra
            ));
        }
        Ok(Self {
            as_: raw.as_,
            commands: raw.commands,
            kind: raw.kind,
        })
    }
}

/// How a test is executed. Each kind carries exactly the settings it needs.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    /// Runs `commands` in a container built from an image of the pipeline.
    Container(ContainerTestConfiguration),
    /// Launches a cluster with openshift-ansible and runs the end-to-end suite.
    OpenshiftAnsible(ClusterTestConfiguration),
    /// Launches a cluster with openshift-ansible and runs `commands` from the source image.
    OpenshiftAnsibleSrc(ClusterTestConfiguration),
    /// Launches a cluster with the openshift-ansible image under test.
    OpenshiftAnsibleCustom(ClusterTestConfiguration),
    /// Installs a previous version with openshift-ansible and upgrades it.
    OpenshiftAnsibleUpgrade(UpgradeClusterTestConfiguration),
    /// Launches a 4.0 cluster and scales it up with openshift-ansible.
    #[serde(rename = "openshift_ansible_40")]
    OpenshiftAnsible40(ClusterTestConfiguration),
    /// Launches a cluster with the installer and runs the end-to-end suite.
    OpenshiftInstaller(InstallerClusterTestConfiguration),
    /// Launches a cluster with the installer and runs `commands` from the source image.
    OpenshiftInstallerSrc(ClusterTestConfiguration),
    /// Launches a cluster on user provisioned infrastructure.
    OpenshiftInstallerUpi(ClusterTestConfiguration),
    /// Launches a cluster with the installer and runs the console tests.
    OpenshiftInstallerConsole(ClusterTestConfiguration),
    /// Launches a cluster with the installer and runs `commands` from a custom image.
    OpenshiftInstallerCustomTestImage(CustomTestImageClusterTestConfiguration),
    /// Launches a cluster on a cloud drawn at random when the job runs.
    OpenshiftInstallerRandom(RandomClusterTestConfiguration),
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct ContainerTestConfiguration {
    #[serde(default)]
    pub from: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClusterTestConfiguration {
    pub cluster_profile: ClusterProfile,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UpgradeClusterTestConfiguration {
    pub cluster_profile: ClusterProfile,
    pub previous_version: String,
    pub previous_rpm_deps: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InstallerClusterTestConfiguration {
    pub cluster_profile: ClusterProfile,
    /// Upgrade tests drive the installer without a job definition template.
    #[serde(default)]
    pub upgrade: bool,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CustomTestImageClusterTestConfiguration {
    pub cluster_profile: ClusterProfile,
    /// The image stream tag the tests run from.
    pub from: String,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct RandomClusterTestConfiguration {}

/// A named bundle of cloud credentials and settings used to provision a test cluster. Profiles
/// this crate does not know are carried as `Other` so that configurations written for newer
/// profiles still load.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(from = "String")]
pub enum ClusterProfile {
    Aws,
    AwsAtomic,
    AwsCentos,
    AwsCentos40,
    AwsGluster,
    Azure4,
    Gcp,
    Gcp40,
    GcpHa,
    GcpCrio,
    GcpLogging,
    GcpLoggingJournald,
    GcpLoggingJsonFile,
    GcpLoggingCrio,
    OpenStack,
    VSphere,
    Other(String),
}

impl ClusterProfile {
    pub fn as_str(&self) -> &str {
        match self {
            ClusterProfile::Aws => "aws",
            ClusterProfile::AwsAtomic => "aws-atomic",
            ClusterProfile::AwsCentos => "aws-centos",
            ClusterProfile::AwsCentos40 => "aws-centos-40",
            ClusterProfile::AwsGluster => "aws-gluster",
            ClusterProfile::Azure4 => "azure4",
            ClusterProfile::Gcp => "gcp",
            ClusterProfile::Gcp40 => "gcp-40",
            ClusterProfile::GcpHa => "gcp-ha",
            ClusterProfile::GcpCrio => "gcp-crio",
            ClusterProfile::GcpLogging => "gcp-logging",
            ClusterProfile::GcpLoggingJournald => "gcp-logging-journald",
            ClusterProfile::GcpLoggingJsonFile => "gcp-logging-json-file",
            ClusterProfile::GcpLoggingCrio => "gcp-logging-crio",
            ClusterProfile::OpenStack => "openstack",
            ClusterProfile::VSphere => "vsphere",
            ClusterProfile::Other(name) => name.as_str(),
        }
    }
}

impl From<String> for ClusterProfile {
    fn from(name: String) -> Self {
        match name.as_str() {
            "aws" => ClusterProfile::Aws,
            "aws-atomic" => ClusterProfile::AwsAtomic,
            "aws-centos" => ClusterProfile::AwsCentos,
            "aws-centos-40" => ClusterProfile::AwsCentos40,
            "aws-gluster" => ClusterProfile::AwsGluster,
            "azure4" => ClusterProfile::Azure4,
            "gcp" => ClusterProfile::Gcp,
            "gcp-40" => ClusterProfile::Gcp40,
            "gcp-ha" => ClusterProfile::GcpHa,
            "gcp-crio" => ClusterProfile::GcpCrio,
            "gcp-logging" => ClusterProfile::GcpLogging,
            "gcp-logging-journald" => ClusterProfile::GcpLoggingJournald,
            "gcp-logging-json-file" => ClusterProfile::GcpLoggingJsonFile,
            "gcp-logging-crio" => ClusterProfile::GcpLoggingCrio,
            "openstack" => ClusterProfile::OpenStack,
            "vsphere" => ClusterProfile::VSphere,
            _ => ClusterProfile::Other(name),
        }
    }
}

impl From<&str> for ClusterProfile {
    fn from(name: &str) -> Self {
        ClusterProfile::from(name.to_owned())
    }
}

impl Display for ClusterProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
