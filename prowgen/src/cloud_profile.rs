use prowgen_model::ClusterProfile;

/// The profiles a randomly placed installer test can land on.
pub(crate) const RANDOM_PROFILES: [ClusterProfile; 3] = [
    ClusterProfile::Aws,
    ClusterProfile::Azure4,
    ClusterProfile::VSphere,
];

/// The cloud a cluster profile provisions clusters in, or `None` for profiles without one.
pub(crate) fn cloud_for(profile: &ClusterProfile) -> Option<&'static str> {
    match profile {
        ClusterProfile::Aws
        | ClusterProfile::AwsAtomic
        | ClusterProfile::AwsCentos
        | ClusterProfile::AwsCentos40
        | ClusterProfile::AwsGluster => Some("aws"),
        ClusterProfile::Azure4 => Some("azure4"),
        ClusterProfile::Gcp
        | ClusterProfile::Gcp40
        | ClusterProfile::GcpHa
        | ClusterProfile::GcpCrio
        | ClusterProfile::GcpLogging
        | ClusterProfile::GcpLoggingJournald
        | ClusterProfile::GcpLoggingJsonFile
        | ClusterProfile::GcpLoggingCrio => Some("gcp"),
        ClusterProfile::OpenStack => Some("openstack"),
        ClusterProfile::VSphere => Some("vsphere"),
        ClusterProfile::Other(_) => None,
    }
}

/// Profiles other than the bare cloud ones also ship a `cluster-profile-<profile>` config map.
pub(crate) fn needs_config_map(profile: &ClusterProfile) -> bool {
    !matches!(
        profile,
        ClusterProfile::Aws
            | ClusterProfile::Azure4
            | ClusterProfile::OpenStack
            | ClusterProfile::VSphere
    )
}

pub(crate) fn secret_name(cloud: &str) -> String {
    format!("cluster-secrets-{}", cloud)
}

pub(crate) fn config_map_name(profile: &ClusterProfile) -> String {
    format!("cluster-profile-{}", profile)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn clouds() {
        assert_eq!(cloud_for(&ClusterProfile::AwsCentos40), Some("aws"));
        assert_eq!(cloud_for(&ClusterProfile::Azure4), Some("azure4"));
        assert_eq!(cloud_for(&ClusterProfile::GcpLoggingJsonFile), Some("gcp"));
        assert_eq!(cloud_for(&ClusterProfile::OpenStack), Some("openstack"));
        assert_eq!(cloud_for(&ClusterProfile::VSphere), Some("vsphere"));
        assert_eq!(cloud_for(&ClusterProfile::from("libvirt")), None);
    }

    #[test]
    fn config_maps() {
        assert!(!needs_config_map(&ClusterProfile::Aws));
        assert!(!needs_config_map(&ClusterProfile::VSphere));
        assert!(needs_config_map(&ClusterProfile::AwsAtomic));
        assert!(needs_config_map(&ClusterProfile::Gcp));
        assert!(needs_config_map(&ClusterProfile::from("libvirt")));
        assert_eq!(
            config_map_name(&ClusterProfile::GcpHa),
            "cluster-profile-gcp-ha"
        );
        assert_eq!(secret_name("gcp"), "cluster-secrets-gcp");
    }
}
