// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::{OperatorError, Result};
use crate::files::FileStore;
use async_trait::async_trait;
use log::debug;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// File store over the workload container's filesystem, mounted at `root`.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a container path onto the mount. Only plain components are
    /// accepted so a path can never leave the root.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let mut resolved = self.root.clone();
        for component in Path::new(path).components() {
            match component {
                Component::RootDir | Component::CurDir => {}
                Component::Normal(part) => resolved.push(part),
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(OperatorError::file_store(
                        path,
                        "path escapes the container root",
                    ));
                }
            }
        }
        if resolved == self.root {
            return Err(OperatorError::file_store(path, "not a file path"));
        }
        Ok(resolved)
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn push(&self, path: &str, content: &str) -> Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| OperatorError::file_store(path, e.to_string()))?;
        }

        // Write next to the target and rename so readers never see a
        // partially written file.
        let mut tmp = target.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| OperatorError::file_store(path, e.to_string()))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|e| OperatorError::file_store(path, e.to_string()))?;

        debug!("pushed {} bytes to {}", content.len(), target.display());
        Ok(())
    }

    async fn pull(&self, path: &str) -> Result<String> {
        let target = self.resolve(path)?;
        match tokio::fs::read_to_string(&target).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(OperatorError::FileNotFound(path.to_string()))
            }
            Err(e) => Err(OperatorError::file_store(path, e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_creates_parents_and_pull_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        store
            .push("/etc/kamailio/kamailio-local.cfg", "listen=udp:0.0.0.0:5060")
            .await
            .unwrap();

        let on_disk =
            std::fs::read_to_string(dir.path().join("etc/kamailio/kamailio-local.cfg")).unwrap();
        assert_eq!(on_disk, "listen=udp:0.0.0.0:5060");
        assert_eq!(
            store.pull("/etc/kamailio/kamailio-local.cfg").await.unwrap(),
            "listen=udp:0.0.0.0:5060"
        );
        assert!(!dir.path().join("etc/kamailio/kamailio-local.cfg.tmp").exists());
    }

    #[tokio::test]
    async fn test_push_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        store.push("/etc/kamailio/kamctlrc", "SIP_DOMAIN=a\n").await.unwrap();
        store.push("/etc/kamailio/kamctlrc", "SIP_DOMAIN=b\n").await.unwrap();
        assert_eq!(
            store.pull("/etc/kamailio/kamctlrc").await.unwrap(),
            "SIP_DOMAIN=b\n"
        );
    }

    #[tokio::test]
    async fn test_pull_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        let err = store.pull("/etc/kamailio/kamctlrc").await.unwrap_err();
        assert!(matches!(err, OperatorError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_rejects_paths_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        assert!(store.push("/etc/../../passwd", "x").await.is_err());
        assert!(store.push("/", "x").await.is_err());
    }
}
