use std::collections::HashSet;

use anyhow::Result;
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use super::types::{CatalogMetadata, HistoryRepository, SeedChoice};

/// How many of the user's most recently saved tracks are considered for the
/// recently-added seed pool.
const RECENTLY_ADDED_LIMIT: usize = 10;

/// Seed selection for one genre of a playlist request.
pub struct SeedSelector;

impl SeedSelector {
    /// Pick a seed for `genre` that does not repeat any seed recorded in the
    /// user's last `recency_limit` playlists for that genre.
    ///
    /// Priority: a liked song in the genre, then a recently saved track whose
    /// artists match the genre, then a track from the user's own recent
    /// playlists carrying the genre tag. A user with no recent playlists in
    /// the genre gets a genre seed, leaving the search unconstrained.
    pub fn choose_seed<H, M, R>(
        user: &str,
        genre: &str,
        history: &H,
        metadata: &M,
        recency_limit: usize,
        rng: &mut R,
    ) -> Result<SeedChoice>
    where
        H: HistoryRepository,
        M: CatalogMetadata,
        R: Rng,
    {
        let recent_songs = history.recent_songs_by_genre(user, genre, recency_limit)?;
        if recent_songs.is_empty() {
            debug!("no recent songs for genre '{genre}', falling back to genre seed");
            return Ok(SeedChoice::Genre(genre.to_string()));
        }

        // Only tracks whose recorded tag matches the requested genre exactly
        // qualify for the last-resort draw.
        let genre_filtered: Vec<&str> = recent_songs
            .iter()
            .filter(|song| song.genre.eq_ignore_ascii_case(genre))
            .map(|song| song.track_id.as_str())
            .collect();

        let used_seeds: HashSet<String> = history
            .recent_playlists_by_genre(user, genre, recency_limit)?
            .iter()
            .flat_map(|record| record.seed_tokens())
            .collect();

        let mut liked = history.liked_songs_by_genre(user, genre)?;
        liked.retain(|id| !used_seeds.contains(id));
        if let Some(track_id) = liked.choose(rng) {
            debug!("seed for genre '{genre}': liked song {track_id}");
            return Ok(SeedChoice::Tracks(vec![track_id.clone()]));
        }

        let recently_added = metadata.recently_added_tracks(RECENTLY_ADDED_LIMIT)?;
        let mut matching = metadata.tracks_matching_genre(genre, &recently_added)?;
        matching.retain(|id| !used_seeds.contains(id));
        if let Some(track_id) = matching.choose(rng) {
            debug!("seed for genre '{genre}': recently added track {track_id}");
            return Ok(SeedChoice::Tracks(vec![track_id.clone()]));
        }

        if let Some(track_id) = genre_filtered.choose(rng) {
            debug!("seed for genre '{genre}': recent playlist track {track_id}");
            return Ok(SeedChoice::Tracks(vec![track_id.to_string()]));
        }

        // Recent songs exist but none carry the requested genre tag and no
        // other pool produced a track. Never draw from an empty set.
        debug!("no seedable track for genre '{genre}', falling back to genre seed");
        Ok(SeedChoice::Genre(genre.to_string()))
    }
}
