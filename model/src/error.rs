use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
pub struct Error(OpaqueError);
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum OpaqueError {
    #[snafu(display("Invalid ci-operator configuration path '{}': {}", path.display(), reason))]
    ConfigPath { path: PathBuf, reason: String },

    #[snafu(display("Unable to create directory '{}': {}", path.display(), source))]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to delete file '{}': {}", path.display(), source))]
    DeleteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Invalid job file path '{}': {}", path.display(), reason))]
    JobPath { path: PathBuf, reason: String },

    #[snafu(display("Unable to read file '{}': {}", path.display(), source))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to walk directory '{}': {}", path.display(), source))]
    WalkDir {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[snafu(display("Unable to write file '{}': {}", path.display(), source))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to parse '{}': {}", path.display(), source))]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[snafu(display("Unable to serialize jobs for '{}': {}", path.display(), source))]
    YamlSerialize {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}
