use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use serde::Deserialize;
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::storage::{Error, StorageBackend, StoredObject};

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct BackendConfig {
    #[serde(default = "BackendConfig::default_root_dir")]
    pub root_dir: String,
}

impl BackendConfig {
    fn default_root_dir() -> String {
        "/registry".to_string()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            root_dir: Self::default_root_dir(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Backend {
    root: PathBuf,
}

impl Backend {
    pub fn new(config: &BackendConfig) -> Result<Self, Error> {
        if config.root_dir.is_empty() {
            return Err(Error::Configuration(
                "Filesystem root directory must not be empty".to_string(),
            ));
        }

        Ok(Self {
            root: PathBuf::from(&config.root_dir),
        })
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let components = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>();

    Some(components.join("/"))
}

/// Depth-first walk that reads one directory at a time.
struct Walk {
    root: PathBuf,
    directories: Vec<PathBuf>,
    objects: VecDeque<StoredObject>,
}

impl Walk {
    fn new(root: PathBuf) -> Self {
        Self {
            directories: vec![root.clone()],
            root,
            objects: VecDeque::new(),
        }
    }

    async fn next_object(&mut self) -> Result<Option<StoredObject>, Error> {
        loop {
            if let Some(object) = self.objects.pop_front() {
                return Ok(Some(object));
            }

            let Some(directory) = self.directories.pop() else {
                return Ok(None);
            };

            self.expand(&directory).await?;
        }
    }

    async fn expand(&mut self, directory: &Path) -> Result<(), Error> {
        let mut read_dir = match fs::read_dir(directory).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound && directory == self.root.as_path() => {
                return Err(Error::Configuration(format!(
                    "Storage root directory '{}' does not exist",
                    self.root.display()
                )));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Directory vanished during walk: {}", directory.display());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = read_dir.next_entry().await? {
            let file_type = entry.file_type().await?;
            let path = entry.path();

            if file_type.is_dir() {
                self.directories.push(path);
            } else if file_type.is_file() {
                let size = match entry.metadata().await {
                    Ok(metadata) => metadata.len(),
                    Err(e) if e.kind() == ErrorKind::NotFound => continue,
                    Err(e) => return Err(e.into()),
                };

                if let Some(path) = relative_path(&self.root, &path) {
                    self.objects.push_back(StoredObject { path, size });
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl StorageBackend for Backend {
    fn list_paths(&self) -> BoxStream<'_, Result<StoredObject, Error>> {
        let walk = Walk::new(self.root.clone());

        stream::try_unfold(walk, |mut walk| async move {
            let object = walk.next_object().await?;
            Ok::<_, Error>(object.map(|object| (object, walk)))
        })
        .boxed()
    }

    async fn read_object(&self, path: &str) -> Result<Vec<u8>, Error> {
        Ok(fs::read(self.full_path(path)).await?)
    }
}
