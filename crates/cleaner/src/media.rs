use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::backend::{DeleteHandle, DeleteStatus, RemoteBackend};
use crate::error::CleanerError;
use crate::jobs::WorkItem;
use crate::width::{display_width, truncate_to_width};

/// Directory holding media uploaded by local users.
const LOCAL_CONTENT: &str = "local_content";

/// A media file stored under `<root>/local_content/aa/bb/rest`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Media {
    pub id: String,
    pub path: PathBuf,
}

impl WorkItem for Media {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self, max_width: usize) -> String {
        let (id, id_width) = truncate_to_width(&self.id, max_width);
        let path = self.path.display().to_string();
        let room_left = max_width.saturating_sub(id_width + display_width(" -> "));
        if room_left == 0 {
            return id;
        }
        format!("{} -> {}", id, truncate_to_width(&path, room_left).0)
    }
}

/// Path of a local media file from its id.
pub fn media_path(root: &Path, id: &str) -> Option<PathBuf> {
    let first = id.get(..2)?;
    let second = id.get(2..4)?;
    let rest = id.get(4..).filter(|r| !r.is_empty())?;
    Some(root.join(LOCAL_CONTENT).join(first).join(second).join(rest))
}

/// Media files on disk.
#[derive(Debug, Clone)]
pub struct MediaLibrary {
    root: PathBuf,
}

impl MediaLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List every local media file.
    ///
    /// Only files at `local_content/aa/bb/rest` are media; anything else is
    /// skipped. An unreadable directory is an error.
    pub fn scan(&self) -> Result<Vec<Media>, CleanerError> {
        let content = self.root.join(LOCAL_CONTENT);
        debug!("Scanning media directory: {}", content.display());

        let mut medias = Vec::new();
        for entry in WalkDir::new(&content)
            .min_depth(3)
            .max_depth(3)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| CleanerError::Io(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Ok(relative) = path.strip_prefix(&content) else {
                continue;
            };
            let id: String = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect();

            // Directory names must rebuild the exact path from the id
            match media_path(&self.root, &id) {
                Some(expected) if expected == path => medias.push(Media { id, path: expected }),
                _ => debug!("Skipping {}: not a local media path", path.display()),
            }
        }

        info!("Found {} media files", medias.len());
        Ok(medias)
    }

    pub async fn remove(&self, media: &Media) -> Result<(), CleanerError> {
        tokio::fs::remove_file(&media.path).await.map_err(|e| {
            warn!("Failed to remove {}: {}", media.path.display(), e);
            CleanerError::Io(format!("{}: {}", media.path.display(), e))
        })
    }
}

/// Deletes media files that the database does not reference.
pub struct MediaBackend {
    library: MediaLibrary,
    pool: PgPool,
}

impl MediaBackend {
    pub fn new(library: MediaLibrary, pool: PgPool) -> Self {
        Self { library, pool }
    }

    pub async fn connect(
        library: MediaLibrary,
        database_uri: &str,
        timeout: Duration,
    ) -> Result<Self, CleanerError> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(timeout)
            .connect(database_uri)
            .await?;
        Ok(Self::new(library, pool))
    }
}

#[async_trait]
impl RemoteBackend for MediaBackend {
    type Item = Media;

    async fn list_all(&self) -> Result<Vec<Media>, CleanerError> {
        let library = self.library.clone();
        tokio::task::spawn_blocking(move || library.scan())
            .await
            .map_err(|e| CleanerError::Worker(e.to_string()))?
    }

    async fn list_keep(&self) -> Result<Vec<String>, CleanerError> {
        let ids: Vec<String> =
            sqlx::query_scalar("select media_id from local_media_repository")
                .fetch_all(&self.pool)
                .await?;
        info!("{} media referenced by the database", ids.len());
        Ok(ids)
    }

    async fn submit_delete(&self, media: &Media) -> Result<DeleteHandle, CleanerError> {
        self.library.remove(media).await?;
        Ok(DeleteHandle(media.id.clone()))
    }

    async fn poll_status(&self, _handle: &DeleteHandle) -> Result<DeleteStatus, CleanerError> {
        // Removal is synchronous, a submitted deletion is already complete
        Ok(DeleteStatus::Complete)
    }

    fn noun(&self) -> &'static str {
        "medias"
    }
}
