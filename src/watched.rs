//! Watch list kept in memory and mirrored to a JSON file.
//!
//! The file holds a plain JSON array of [`WatchedMovie`] records. It is read
//! once when the store opens and rewritten in full after every mutation
//! (temp file + rename, so a crash never leaves a half-written list).

use crate::models::WatchedMovie;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

#[derive(Debug)]
pub struct WatchedStore {
    path: PathBuf,
    movies: Vec<WatchedMovie>,
}

impl WatchedStore {
    /// Opens the list at `path`. A missing, unreadable or corrupt file
    /// yields an empty list.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let movies = match load(&path) {
            Ok(Some(movies)) => {
                info!("Loaded {} watched movies from {:?}", movies.len(), path);
                movies
            }
            Ok(None) => {
                debug!(path = ?path, "no watch list on disk yet");
                Vec::new()
            }
            Err(e) => {
                warn!("Ignoring unreadable watch list {:?}: {:#}", path, e);
                Vec::new()
            }
        };
        Self { path, movies }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> &[WatchedMovie] {
        &self.movies
    }

    pub fn contains(&self, id: &str) -> bool {
        self.movies.iter().any(|m| m.id == id)
    }

    pub fn find(&self, id: &str) -> Option<&WatchedMovie> {
        self.movies.iter().find(|m| m.id == id)
    }

    /// Appends `movie` unless its id is already listed.
    pub fn add(&mut self, movie: WatchedMovie) -> AddOutcome {
        if self.contains(&movie.id) {
            warn!("'{}' ({}) is already on the watch list", movie.title, movie.id);
            return AddOutcome::AlreadyPresent;
        }
        info!(
            "Adding '{}' ({}) to watch list, rated {}",
            movie.title, movie.id, movie.user_rating
        );
        self.movies.push(movie);
        self.persist_or_log();
        AddOutcome::Added
    }

    /// Drops every entry with `id`; returns how many were removed.
    pub fn remove(&mut self, id: &str) -> usize {
        let before = self.movies.len();
        self.movies.retain(|m| m.id != id);
        let removed = before - self.movies.len();
        info!("Removed {} watch list entries for {}", removed, id);
        self.persist_or_log();
        removed
    }

    fn persist_or_log(&self) {
        if let Err(e) = save(&self.path, &self.movies) {
            error!("Failed to persist watch list to {:?}: {:#}", self.path, e);
        }
    }
}

fn load(path: &Path) -> Result<Option<Vec<WatchedMovie>>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path).context("reading watch list failed")?;
    if text.trim().is_empty() {
        return Ok(Some(Vec::new()));
    }
    let movies = serde_json::from_str(&text).context("watch list JSON parse failed")?;
    Ok(Some(movies))
}

fn save(path: &Path, movies: &[WatchedMovie]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("creating watch list directory failed")?;
    }
    let json = serde_json::to_string_pretty(movies).context("serializing watch list failed")?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json).context("writing temporary watch list failed")?;
    std::fs::rename(&tmp, path).context("replacing watch list failed")?;
    debug!(path = ?path, count = movies.len(), "watch list saved");
    Ok(())
}
