use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::playlist::{HistoryRepository, HistorySong, PlaylistSeedRecord};

/// A published playlist as recorded locally: enough to answer the seed
/// heuristic's recency questions on the next generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPlaylist {
    pub user: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub seed_provenance: String,
    pub genres: Vec<String>,
    pub tracks: Vec<StoredTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTrack {
    pub track_id: String,
    pub genre: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikedTrack {
    pub user: String,
    pub track_id: String,
    pub genre: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    playlists: Vec<StoredPlaylist>,
    #[serde(default)]
    liked: Vec<LikedTrack>,
}

/// JSON-file-backed history repository. Reads go through the file on every
/// call, so a store handle never holds stale state between generations.
pub struct JsonHistoryStore {
    path: PathBuf,
}

impl JsonHistoryStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        JsonHistoryStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn load(&self) -> Result<HistoryFile> {
        if !self.path.exists() {
            return Ok(HistoryFile::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read history file {}", self.path.display()))?;
        let file: HistoryFile = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse history file {}", self.path.display()))?;
        Ok(file)
    }

    fn save(&self, file: &HistoryFile) -> Result<()> {
        let content = serde_json::to_string_pretty(file)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("failed to write history file {}", self.path.display()))?;
        Ok(())
    }

    /// Append a published playlist to the history.
    pub fn record_playlist(&self, playlist: StoredPlaylist) -> Result<()> {
        let mut file = self.load()?;
        file.playlists.push(playlist);
        self.save(&file)
    }

    /// Record a liked track for the user, once per (track, genre) pair.
    pub fn record_liked(&self, user: &str, track_id: &str, genre: &str) -> Result<()> {
        let mut file = self.load()?;
        let already_liked = file.liked.iter().any(|liked| {
            liked.user == user && liked.track_id == track_id && liked.genre.eq_ignore_ascii_case(genre)
        });
        if !already_liked {
            file.liked.push(LikedTrack {
                user: user.to_string(),
                track_id: track_id.to_string(),
                genre: genre.to_string(),
            });
            self.save(&file)?;
        }
        Ok(())
    }

    /// The user's last `limit` playlists tagged with `genre`, newest first.
    fn recent_playlists(
        &self,
        file: &HistoryFile,
        user: &str,
        genre: &str,
        limit: usize,
    ) -> Vec<StoredPlaylist> {
        let mut playlists: Vec<StoredPlaylist> = file
            .playlists
            .iter()
            .filter(|playlist| {
                playlist.user == user
                    && playlist
                        .genres
                        .iter()
                        .any(|tag| tag.eq_ignore_ascii_case(genre))
            })
            .cloned()
            .collect();
        playlists.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        playlists.truncate(limit);
        playlists
    }
}

impl HistoryRepository for JsonHistoryStore {
    fn recent_songs_by_genre(
        &self,
        user: &str,
        genre: &str,
        limit: usize,
    ) -> Result<Vec<HistorySong>> {
        let file = self.load()?;
        let mut songs: Vec<HistorySong> = Vec::new();
        for playlist in self.recent_playlists(&file, user, genre, limit) {
            for track in playlist.tracks {
                if songs.iter().all(|song| song.track_id != track.track_id) {
                    songs.push(HistorySong {
                        track_id: track.track_id,
                        genre: track.genre,
                    });
                }
            }
        }
        Ok(songs)
    }

    fn recent_playlists_by_genre(
        &self,
        user: &str,
        genre: &str,
        limit: usize,
    ) -> Result<Vec<PlaylistSeedRecord>> {
        let file = self.load()?;
        Ok(self
            .recent_playlists(&file, user, genre, limit)
            .into_iter()
            .map(|playlist| PlaylistSeedRecord {
                seed_provenance: playlist.seed_provenance,
            })
            .collect())
    }

    fn liked_songs_by_genre(&self, user: &str, genre: &str) -> Result<Vec<String>> {
        let file = self.load()?;
        Ok(file
            .liked
            .into_iter()
            .filter(|liked| liked.user == user && liked.genre.eq_ignore_ascii_case(genre))
            .map(|liked| liked.track_id)
            .collect())
    }
}
