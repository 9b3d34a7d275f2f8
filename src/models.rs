use serde::{Deserialize, Serialize};

/// Track metadata as this crate consumes it, validated out of the raw
/// catalog payload at the client boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub id: String,
    pub title: String,
    pub duration_secs: u64,
    pub artists: Vec<ArtistInfo>,
    pub album_art_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistInfo {
    pub id: String,
    pub name: String,
}

/// Response structure for the /recommendations endpoint
#[derive(Debug, Deserialize)]
pub struct RecommendationsResponse {
    pub tracks: Vec<TrackRef>,
}

#[derive(Debug, Deserialize)]
pub struct TrackRef {
    pub id: String,
}

/// Response structure for /me/tracks (the user's saved tracks)
#[derive(Debug, Deserialize)]
pub struct SavedTracksResponse {
    pub items: Vec<SavedTrackItem>,
}

#[derive(Debug, Deserialize)]
pub struct SavedTrackItem {
    pub track: TrackRef,
}

/// Full track objects from /tracks and /tracks/{id}
#[derive(Debug, Deserialize)]
pub struct TracksResponse {
    pub tracks: Vec<TrackObject>,
}

#[derive(Debug, Deserialize)]
pub struct TrackObject {
    pub id: String,
    pub name: String,
    pub duration_ms: u64,
    pub artists: Vec<ArtistRef>,
    pub album: Option<AlbumRef>,
}

impl TrackObject {
    pub fn into_track_info(self) -> TrackInfo {
        let album_art_url = self
            .album
            .and_then(|album| album.images.into_iter().next())
            .map(|image| image.url);
        TrackInfo {
            id: self.id,
            title: self.name,
            duration_secs: self.duration_ms / 1000,
            artists: self
                .artists
                .into_iter()
                .map(|artist| ArtistInfo {
                    id: artist.id,
                    name: artist.name,
                })
                .collect(),
            album_art_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AlbumRef {
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

#[derive(Debug, Deserialize)]
pub struct ImageRef {
    pub url: String,
}

/// Artist objects from /artists, carrying the catalog genre tags used by
/// the seed heuristic's genre match.
#[derive(Debug, Deserialize)]
pub struct ArtistsResponse {
    pub artists: Vec<ArtistObject>,
}

#[derive(Debug, Deserialize)]
pub struct ArtistObject {
    pub id: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Response structure for /me
#[derive(Debug, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
}

/// Response structure for playlist creation
#[derive(Debug, Deserialize)]
pub struct CreatedPlaylist {
    pub id: String,
}
