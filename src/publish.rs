use anyhow::Result;
use chrono::Utc;
use log::warn;

use crate::client::SpotifyClient;
use crate::history::{JsonHistoryStore, StoredPlaylist, StoredTrack};
use crate::playlist::{CatalogMetadata, PlaylistPublisher, PublishRequest};

/// The persistence half of a generation: creates the playlist in the
/// catalog, adds the tracks, and records everything into local history so
/// the next generation's seed selection can see it.
pub struct PlaylistUploader<'a> {
    client: &'a SpotifyClient,
    history: &'a JsonHistoryStore,
}

impl<'a> PlaylistUploader<'a> {
    pub fn new(client: &'a SpotifyClient, history: &'a JsonHistoryStore) -> Self {
        Self { client, history }
    }
}

impl PlaylistPublisher for PlaylistUploader<'_> {
    fn publish(&self, request: &PublishRequest) -> Result<()> {
        let playlist_id =
            self.client
                .create_playlist(&request.user, &request.name, &request.description)?;

        let track_ids: Vec<String> = request
            .candidates
            .iter()
            .map(|candidate| candidate.track_id.clone())
            .collect();
        self.client.add_tracks(&playlist_id, &track_ids)?;

        let tracks = request
            .candidates
            .iter()
            .map(|candidate| {
                // Track metadata is decoration on the history record; a
                // failed lookup must not lose the playlist itself.
                let title = match self.client.track_info(&candidate.track_id) {
                    Ok(info) => Some(info.title),
                    Err(e) => {
                        warn!("no metadata for track {}: {e}", candidate.track_id);
                        None
                    }
                };
                StoredTrack {
                    track_id: candidate.track_id.clone(),
                    genre: candidate.genre.clone(),
                    title,
                }
            })
            .collect();

        self.history.record_playlist(StoredPlaylist {
            user: request.user.clone(),
            name: request.name.clone(),
            created_at: Utc::now(),
            seed_provenance: request.seed_provenance.clone(),
            genres: request.genres.clone(),
            tracks,
        })
    }
}
