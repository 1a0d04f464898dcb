use serde::{Deserialize, Serialize};
use url::Url;

/// Base of the provider's public search page used for track links
const SEARCH_BASE_URL: &str = "https://open.spotify.com/search/";

/// Mode string the backend reports when the ML model produced the batch
const ML_MODE: &str = "ML";

/// A recommended track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: Option<i64>,
    #[serde(rename = "trackName")]
    pub track_name: String,
    pub artist: String,
    pub album: Option<String>,
    pub year: Option<String>,
    pub source: Option<String>,
    pub tags: Option<String>,
    #[serde(rename = "artistSeed")]
    pub artist_seed: Option<String>,
    #[serde(rename = "genreSeed")]
    pub genre_seed: Option<String>,
    #[serde(rename = "spotifyId")]
    pub spotify_id: Option<String>,
    #[serde(rename = "albumImage")]
    pub album_image: Option<String>,
    #[serde(rename = "likeProb")]
    pub like_prob: Option<f64>,
}

impl Track {
    /// Key identifying a track within a batch for feedback bookkeeping.
    pub fn feedback_key(&self) -> String {
        format!("{}-{}", self.track_name, self.artist)
    }

    /// Link to the provider's search page for this track.
    pub fn search_url(&self) -> String {
        let query = format!("{} {}", self.track_name, self.artist);
        match Url::parse(SEARCH_BASE_URL) {
            Ok(mut url) => {
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().push(&query);
                }
                url.to_string()
            }
            Err(_) => SEARCH_BASE_URL.to_string(),
        }
    }

    /// Source tag with underscores shown as spaces ("lastfm_similar" -> "lastfm similar").
    pub fn source_display(&self) -> Option<String> {
        self.source.as_ref().map(|s| s.replace('_', " "))
    }
}

/// Response of `/recommend`, `/recommend/next` and `/recommend/previous`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationBatch {
    #[serde(default)]
    pub recommendations: Vec<Track>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(rename = "totalAvailable", default)]
    pub total_available: Option<u64>,
}

impl RecommendationBatch {
    pub fn is_ml(&self) -> bool {
        self.mode.as_deref() == Some(ML_MODE)
    }
}

/// Body of `POST /feedback`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackRequest {
    #[serde(rename = "trackName")]
    pub track_name: String,
    pub artist: String,
    pub liked: bool,
    pub album: Option<String>,
    pub year: Option<String>,
    #[serde(rename = "spotifyId")]
    pub spotify_id: Option<String>,
}

impl FeedbackRequest {
    pub fn for_track(track: &Track, liked: bool) -> Self {
        Self {
            track_name: track.track_name.clone(),
            artist: track.artist.clone(),
            liked,
            album: track.album.clone(),
            year: track.year.clone(),
            spotify_id: track.spotify_id.clone(),
        }
    }
}
