use std::collections::HashSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::fuzzy::FeatureTarget;
use crate::models::TrackInfo;

/// One genre's share of a playlist request. Percentages are applied
/// independently and need not sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreRequest {
    pub genre: String,
    pub percentage: f64,
}

impl GenreRequest {
    /// Number of tracks to request for this genre, at least 1.
    pub fn track_count(&self, total_count: usize) -> usize {
        let share = (total_count as f64 * self.percentage / 100.0).round() as usize;
        share.max(1)
    }
}

/// Seed handed to the recommendation search for one genre: either concrete
/// track ids or, when the user has no history in the genre, the genre itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedChoice {
    Tracks(Vec<String>),
    Genre(String),
}

impl SeedChoice {
    /// String form recorded into the playlist's seed provenance:
    /// track ids comma-joined, a genre seed as-is.
    pub fn provenance(&self) -> String {
        match self {
            SeedChoice::Tracks(ids) => ids.join(","),
            SeedChoice::Genre(genre) => genre.clone(),
        }
    }
}

/// Seed provenance of one past playlist, as recorded at publish time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSeedRecord {
    pub seed_provenance: String,
}

impl PlaylistSeedRecord {
    /// Individual seed tokens: the provenance string is semicolon-joined
    /// across genres and comma-joined within a genre.
    pub fn seed_tokens(&self) -> HashSet<String> {
        self.seed_provenance
            .split(';')
            .flat_map(|genre_part| genre_part.split(','))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// A track from the user's recent playlists together with the genre tag it
/// was recorded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySong {
    pub track_id: String,
    pub genre: String,
}

/// A candidate picked up during generation; becomes a stored track only if
/// it survives the final resize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackCandidate {
    pub track_id: String,
    pub genre: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    Success,
    Warning,
    Error,
}

/// Terminal result of one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub status: GenerationStatus,
    pub message: String,
    pub track_count: usize,
}

impl GenerationOutcome {
    pub fn success(track_count: usize) -> Self {
        GenerationOutcome {
            status: GenerationStatus::Success,
            message: "playlist assembled".to_string(),
            track_count,
        }
    }

    pub fn warning(missing: usize, track_count: usize) -> Self {
        GenerationOutcome {
            status: GenerationStatus::Warning,
            message: format!(
                "playlist is missing {missing} tracks; try regenerating, \
                 relaxing the constraints, or liking a few more songs"
            ),
            track_count,
        }
    }

    pub fn error() -> Self {
        GenerationOutcome {
            status: GenerationStatus::Error,
            message: "no tracks found matching the given criteria".to_string(),
            track_count: 0,
        }
    }
}

/// Constraints forwarded to the recommendation search alongside the
/// feature targets.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub min_popularity: u32,
    /// Track length bounds in minutes.
    pub length_min: Option<f64>,
    pub length_max: Option<f64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            min_popularity: 50,
            length_min: None,
            length_max: None,
        }
    }
}

/// Everything the publish step needs: the final, already-resized candidate
/// list plus the metadata recorded with the playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    pub user: String,
    pub name: String,
    pub description: String,
    pub candidates: Vec<TrackCandidate>,
    pub seed_provenance: String,
    pub genres: Vec<String>,
}

/// Read access to the user's listening history: recent playlists per genre,
/// the tracks they contained, and liked songs.
#[cfg_attr(test, mockall::automock)]
pub trait HistoryRepository {
    /// Tracks from the user's last `limit` playlists tagged with `genre`,
    /// newest playlist first, deduplicated by track id.
    fn recent_songs_by_genre(&self, user: &str, genre: &str, limit: usize)
        -> Result<Vec<HistorySong>>;

    /// Seed provenance of the user's last `limit` playlists tagged with
    /// `genre`, newest first.
    fn recent_playlists_by_genre(
        &self,
        user: &str,
        genre: &str,
        limit: usize,
    ) -> Result<Vec<PlaylistSeedRecord>>;

    fn liked_songs_by_genre(&self, user: &str, genre: &str) -> Result<Vec<String>>;
}

/// The external recommendation API, treated as a black-box search.
/// Implementations absorb rate limiting (one retry after the server-given
/// delay) and upstream failures into an empty result list.
#[cfg_attr(test, mockall::automock)]
pub trait CatalogSearch {
    fn search(
        &self,
        features: &FeatureTarget,
        seed: &SeedChoice,
        count: usize,
        options: &SearchOptions,
    ) -> Result<Vec<String>>;
}

/// Track and artist metadata lookups against the external catalog.
#[cfg_attr(test, mockall::automock)]
pub trait CatalogMetadata {
    /// Ids of the tracks most recently saved to the user's library.
    fn recently_added_tracks(&self, limit: usize) -> Result<Vec<String>>;

    /// Subset of `track_ids` whose artists carry `genre`, matched
    /// case-insensitively against the artists' catalog genre tags.
    fn tracks_matching_genre(&self, genre: &str, track_ids: &[String]) -> Result<Vec<String>>;

    fn track_info(&self, track_id: &str) -> Result<TrackInfo>;
}

/// Persistence and publication of a finished playlist. Called at most once
/// per generation attempt, only with the final candidate list.
#[cfg_attr(test, mockall::automock)]
pub trait PlaylistPublisher {
    fn publish(&self, request: &PublishRequest) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_count_rounds_and_enforces_minimum() {
        let seventy = GenreRequest {
            genre: "rock".to_string(),
            percentage: 70.0,
        };
        let thirty = GenreRequest {
            genre: "jazz".to_string(),
            percentage: 30.0,
        };
        let tiny = GenreRequest {
            genre: "ambient".to_string(),
            percentage: 1.0,
        };
        assert_eq!(seventy.track_count(10), 7);
        assert_eq!(thirty.track_count(10), 3);
        assert_eq!(thirty.track_count(25), 8); // 7.5 rounds up
        assert_eq!(tiny.track_count(10), 1);
    }

    #[test]
    fn provenance_joins_track_seeds_with_commas() {
        let tracks = SeedChoice::Tracks(vec!["a1".to_string(), "b2".to_string()]);
        assert_eq!(tracks.provenance(), "a1,b2");
        let genre = SeedChoice::Genre("rock".to_string());
        assert_eq!(genre.provenance(), "rock");
    }

    #[test]
    fn seed_tokens_split_on_both_separators() {
        let record = PlaylistSeedRecord {
            seed_provenance: "a1,b2;rock;c3".to_string(),
        };
        let tokens = record.seed_tokens();
        assert_eq!(tokens.len(), 4);
        assert!(tokens.contains("a1"));
        assert!(tokens.contains("b2"));
        assert!(tokens.contains("rock"));
        assert!(tokens.contains("c3"));
    }
}
