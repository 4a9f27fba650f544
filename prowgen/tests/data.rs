#![allow(unused)]

use std::fs;
use std::path::PathBuf;

fn data_path(file_name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop();
    path.join("prowgen/tests/data").join(file_name)
}

fn read(file_name: &str) -> String {
    fs::read_to_string(data_path(file_name)).unwrap()
}

/// A configuration with tests, images and promotion.
pub fn origin_config() -> String {
    read("openshift-origin-master.yaml")
}

/// The same configuration as [`origin_config`] with the images, promotion and cluster tests
/// removed.
pub fn origin_unit_only_config() -> String {
    read("openshift-origin-master-unit-only.yaml")
}

/// A presubmits file with a hand-written job and a job generated by an earlier run.
pub fn origin_presubmits() -> String {
    read("openshift-origin-master-presubmits.yaml")
}

/// A periodics file.
pub fn origin_periodics() -> String {
    read("openshift-origin-master-periodics.yaml")
}
