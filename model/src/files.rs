use crate::error::{self, Result};
use serde::de::DeserializeOwned;
use snafu::ResultExt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Lists the YAML files under `root` in file name order. Collecting the list before acting on it
/// lets callers rewrite or delete the files they visit.
pub(crate) fn yaml_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.context(error::WalkDirSnafu { path: root })?;
        if entry.file_type().is_file() && is_yaml(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|extension| extension.to_str()),
        Some("yaml") | Some("yml")
    )
}

pub(crate) fn read_yaml<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let contents = fs::read_to_string(path).context(error::ReadFileSnafu { path })?;
    Ok(serde_yaml::from_str(&contents).context(error::YamlParseSnafu { path })?)
}

/// Removes `path`, which is fine if it is already gone.
pub(crate) fn delete_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        result => Ok(result.context(error::DeleteFileSnafu { path })?),
    }
}

/// The last component of `path` as a `&str`, if there is one and it is valid UTF-8.
pub(crate) fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn delete_missing_file() {
        let tempdir = TempDir::new().unwrap();
        let path = tempdir.path().join("gone.yaml");
        fs::write(&path, "{}").unwrap();
        delete_file(&path).unwrap();
        assert!(!path.exists());
        delete_file(&path).unwrap();
    }

    #[test]
    fn delete_failure_is_reported() {
        let tempdir = TempDir::new().unwrap();
        assert!(delete_file(tempdir.path()).is_err());
    }

    #[test]
    fn only_yaml_files_are_listed() {
        let tempdir = TempDir::new().unwrap();
        fs::create_dir(tempdir.path().join("org")).unwrap();
        for name in ["org/b.yaml", "a.yml", "README.md", "org/c.json"] {
            fs::write(tempdir.path().join(name), "{}").unwrap();
        }
        let files: Vec<_> = yaml_files(tempdir.path())
            .unwrap()
            .into_iter()
            .map(|path| path.strip_prefix(tempdir.path()).unwrap().to_owned())
            .collect();
        assert_eq!(files, vec![PathBuf::from("a.yml"), PathBuf::from("org/b.yaml")]);
    }
}
