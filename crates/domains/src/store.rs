//! TOML configuration files on disk.

use crate::{ConfigKind, DomainError};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

/// Named TOML files under `<root>/<kind>/<name>.toml`.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    /// Create a store rooted at a domain's config directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, kind: ConfigKind, name: &str) -> PathBuf {
        self.root.join(kind.dir_name()).join(format!("{}.toml", name))
    }

    /// Sorted names of the files of `kind`. A missing directory lists nothing.
    pub async fn list(&self, kind: ConfigKind) -> Result<Vec<String>, DomainError> {
        let dir = self.root.join(kind.dir_name());
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Parse the file `name` of `kind`.
    pub async fn load(&self, kind: ConfigKind, name: &str) -> Result<toml::Table, DomainError> {
        let path = self.path(kind, name);
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DomainError::ConfigNotFound {
                    kind,
                    name: name.to_string(),
                    available: self.list(kind).await?,
                });
            }
            Err(e) => return Err(e.into()),
        };

        text.parse::<toml::Table>().map_err(|e| DomainError::InvalidConfig {
            path,
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_list_and_load() {
        let dir = tempdir().expect("tempdir");
        let subjects = dir.path().join("subjects");
        std::fs::create_dir_all(&subjects).unwrap();
        std::fs::write(subjects.join("unicorn.toml"), "name = \"a unicorn\"\n").unwrap();
        std::fs::write(subjects.join("fox.toml"), "name = \"a fox\"\n").unwrap();
        std::fs::write(subjects.join("notes.md"), "ignored").unwrap();

        let store = ConfigStore::new(dir.path());
        assert_eq!(store.list(ConfigKind::Subjects).await.unwrap(), vec!["fox", "unicorn"]);
        assert!(store.list(ConfigKind::Rubrics).await.unwrap().is_empty());

        let table = store.load(ConfigKind::Subjects, "fox").await.unwrap();
        assert_eq!(table["name"].as_str(), Some("a fox"));
    }

    #[tokio::test]
    async fn test_missing_config_lists_available() {
        let dir = tempdir().expect("tempdir");
        let rubrics = dir.path().join("rubrics");
        std::fs::create_dir_all(&rubrics).unwrap();
        std::fs::write(rubrics.join("anatomy.toml"), "rubric = \"legs\"\n").unwrap();

        let err = ConfigStore::new(dir.path())
            .load(ConfigKind::Rubrics, "style")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Rubric 'style' not found. Available: [\"anatomy\"]");
    }

    #[tokio::test]
    async fn test_malformed_toml() {
        let dir = tempdir().expect("tempdir");
        let subjects = dir.path().join("subjects");
        std::fs::create_dir_all(&subjects).unwrap();
        std::fs::write(subjects.join("bad.toml"), "name = ").unwrap();

        let err = ConfigStore::new(dir.path())
            .load(ConfigKind::Subjects, "bad")
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::InvalidConfig { .. }));
    }
}
