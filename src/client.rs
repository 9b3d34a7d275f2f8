use std::collections::{HashMap, HashSet};
use std::time::Duration;

use anyhow::Result;
use log::warn;
use ureq::Agent;
use urlencoding::encode;

use crate::config::Config;
use crate::fuzzy::FeatureTarget;
use crate::models::{
    ArtistsResponse, CreatedPlaylist, RecommendationsResponse, SavedTracksResponse, TrackInfo,
    TrackObject, TracksResponse, UserProfile,
};
use crate::playlist::{CatalogMetadata, CatalogSearch, SearchOptions, SeedChoice};

/// Spotify Web API client using bearer-token authentication
pub struct SpotifyClient {
    agent: Agent,
    base_url: String,
    access_token: String,
}

impl SpotifyClient {
    /// Create a new client with configuration from environment
    pub fn new(config: &Config) -> Self {
        SpotifyClient {
            agent: Agent::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Send a GET request and return the response body
    fn get_body(&self, url: &str) -> Result<String> {
        let response = self
            .agent
            .get(url)
            .set("Authorization", &self.bearer())
            .call()
            .map_err(|e| anyhow::anyhow!("GET {} failed: {}", url, e))?;
        Ok(response.into_string()?)
    }

    /// Send a POST request with a JSON body and return the response body
    fn post_json(&self, url: &str, body: serde_json::Value) -> Result<String> {
        let response = self
            .agent
            .post(url)
            .set("Authorization", &self.bearer())
            .send_json(body)
            .map_err(|e| anyhow::anyhow!("POST {} failed: {}", url, e))?;
        Ok(response.into_string()?)
    }

    /// Fetch the authenticated user's profile. Doubles as the connectivity
    /// check before any generation work starts.
    pub fn me(&self) -> Result<UserProfile> {
        let url = format!("{}/me", self.base_url);
        let body = self.get_body(&url)?;
        let profile: UserProfile = serde_json::from_str(&body)
            .map_err(|e| anyhow::anyhow!("Failed to parse profile response: {}", e))?;
        Ok(profile)
    }

    fn recommendations_url(
        &self,
        features: &FeatureTarget,
        seed: &SeedChoice,
        count: usize,
        options: &SearchOptions,
    ) -> String {
        let mut url = format!(
            "{}/recommendations?limit={}&target_energy={:.3}&target_valence={:.3}\
             &target_tempo={:.1}&target_loudness={:.1}&target_danceability={:.3}&min_popularity={}",
            self.base_url,
            count,
            features.energy,
            features.valence,
            features.tempo,
            features.loudness,
            features.danceability,
            options.min_popularity
        );
        match seed {
            SeedChoice::Tracks(ids) => {
                url.push_str(&format!("&seed_tracks={}", encode(&ids.join(","))));
            }
            SeedChoice::Genre(genre) => {
                url.push_str(&format!("&seed_genres={}", encode(genre)));
            }
        }
        if let Some(minutes) = options.length_min {
            url.push_str(&format!("&min_duration_ms={}", (minutes * 60_000.0) as u64));
        }
        if let Some(minutes) = options.length_max {
            url.push_str(&format!("&max_duration_ms={}", (minutes * 60_000.0) as u64));
        }
        url
    }

    /// GET with rate-limit handling: a 429 is retried once after the
    /// server-specified delay. Any upstream failure, including an exhausted
    /// retry, yields `None` so one genre's search cannot abort its siblings.
    fn get_body_degraded(&self, url: &str) -> Option<String> {
        let mut retried = false;
        loop {
            match self
                .agent
                .get(url)
                .set("Authorization", &self.bearer())
                .call()
            {
                Ok(response) => match response.into_string() {
                    Ok(body) => return Some(body),
                    Err(e) => {
                        warn!("failed to read response body: {e}");
                        return None;
                    }
                },
                Err(ureq::Error::Status(429, response)) if !retried => {
                    let retry_after = response
                        .header("Retry-After")
                        .and_then(|value| value.parse::<u64>().ok())
                        .unwrap_or(1);
                    warn!("rate limited, retrying in {retry_after} seconds");
                    std::thread::sleep(Duration::from_secs(retry_after));
                    retried = true;
                }
                Err(ureq::Error::Status(code, _)) => {
                    warn!("catalog returned status {code} for {url}");
                    return None;
                }
                Err(e) => {
                    warn!("catalog request failed: {e}");
                    return None;
                }
            }
        }
    }

    /// Create a playlist for the user and return its catalog id
    pub fn create_playlist(&self, user_id: &str, name: &str, description: &str) -> Result<String> {
        let url = format!("{}/users/{}/playlists", self.base_url, encode(user_id));
        let body = self.post_json(
            &url,
            serde_json::json!({
                "name": name,
                "description": description,
                "public": false,
            }),
        )?;
        let created: CreatedPlaylist = serde_json::from_str(&body)
            .map_err(|e| anyhow::anyhow!("Failed to parse create-playlist response: {}", e))?;
        Ok(created.id)
    }

    /// Add tracks to an existing playlist, in the given order
    pub fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        let uris: Vec<String> = track_ids
            .iter()
            .map(|id| format!("spotify:track:{id}"))
            .collect();
        let url = format!("{}/playlists/{}/tracks", self.base_url, encode(playlist_id));
        self.post_json(&url, serde_json::json!({ "uris": uris }))?;
        Ok(())
    }
}

impl CatalogSearch for SpotifyClient {
    fn search(
        &self,
        features: &FeatureTarget,
        seed: &SeedChoice,
        count: usize,
        options: &SearchOptions,
    ) -> Result<Vec<String>> {
        let url = self.recommendations_url(features, seed, count, options);
        let Some(body) = self.get_body_degraded(&url) else {
            return Ok(vec![]);
        };
        match serde_json::from_str::<RecommendationsResponse>(&body) {
            Ok(parsed) => Ok(parsed.tracks.into_iter().map(|track| track.id).collect()),
            Err(e) => {
                // A malformed payload counts as zero matches for this genre.
                warn!("failed to parse recommendations response: {e}");
                Ok(vec![])
            }
        }
    }
}

impl CatalogMetadata for SpotifyClient {
    fn recently_added_tracks(&self, limit: usize) -> Result<Vec<String>> {
        let url = format!("{}/me/tracks?limit={}", self.base_url, limit);
        let Some(body) = self.get_body_degraded(&url) else {
            return Ok(vec![]);
        };
        match serde_json::from_str::<SavedTracksResponse>(&body) {
            Ok(parsed) => Ok(parsed.items.into_iter().map(|item| item.track.id).collect()),
            Err(e) => {
                warn!("failed to parse saved-tracks response: {e}");
                Ok(vec![])
            }
        }
    }

    fn tracks_matching_genre(&self, genre: &str, track_ids: &[String]) -> Result<Vec<String>> {
        if track_ids.is_empty() {
            return Ok(vec![]);
        }

        let tracks_url = format!(
            "{}/tracks?ids={}",
            self.base_url,
            encode(&track_ids.join(","))
        );
        let Some(body) = self.get_body_degraded(&tracks_url) else {
            return Ok(vec![]);
        };
        let tracks: TracksResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("failed to parse tracks response: {e}");
                return Ok(vec![]);
            }
        };

        let mut artist_ids: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for track in &tracks.tracks {
            for artist in &track.artists {
                if seen.insert(artist.id.as_str()) {
                    artist_ids.push(artist.id.clone());
                }
            }
        }
        if artist_ids.is_empty() {
            return Ok(vec![]);
        }

        let artists_url = format!(
            "{}/artists?ids={}",
            self.base_url,
            encode(&artist_ids.join(","))
        );
        let Some(body) = self.get_body_degraded(&artists_url) else {
            return Ok(vec![]);
        };
        let artists: ArtistsResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("failed to parse artists response: {e}");
                return Ok(vec![]);
            }
        };

        let genres_by_artist: HashMap<String, Vec<String>> = artists
            .artists
            .into_iter()
            .map(|artist| (artist.id, artist.genres))
            .collect();

        let wanted = genre.to_lowercase();
        let matching = tracks
            .tracks
            .into_iter()
            .filter(|track| {
                track.artists.iter().any(|artist| {
                    genres_by_artist
                        .get(&artist.id)
                        .map(|genres| genres.iter().any(|g| g.to_lowercase() == wanted))
                        .unwrap_or(false)
                })
            })
            .map(|track| track.id)
            .collect();
        Ok(matching)
    }

    fn track_info(&self, track_id: &str) -> Result<TrackInfo> {
        let url = format!("{}/tracks/{}", self.base_url, encode(track_id));
        let body = self.get_body(&url)?;
        let track: TrackObject = serde_json::from_str(&body)
            .map_err(|e| anyhow::anyhow!("Failed to parse track response: {}", e))?;
        Ok(track.into_track_info())
    }
}
