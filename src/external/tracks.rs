use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::config::SeedTrack;

/// A track drawn into the candidate pool before preview filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateTrack {
    /// Song title.
    pub name: String,
    /// Performing artist.
    pub artist: String,
    /// Album artwork URL.
    pub album_cover: Option<String>,
}

/// Error raised when the track source backend fails outright.
///
/// A missing preview is not an error; it is the `Ok(None)` case.
#[derive(Debug, Error)]
pub enum TrackSourceError {
    #[error("track source unavailable: {0}")]
    Unavailable(String),
}

/// Track catalog contract used during game launch.
pub trait TrackSource: Send + Sync {
    /// Supply the candidate pool; order carries no meaning, the launcher
    /// does its own selection.
    fn draw_candidates(&self) -> BoxFuture<'static, Result<Vec<CandidateTrack>, TrackSourceError>>;

    /// Best-effort preview lookup for a candidate. `None` means no
    /// preview is available and the candidate is skipped.
    fn preview_url(
        &self,
        title: &str,
        artist: &str,
    ) -> BoxFuture<'static, Result<Option<String>, TrackSourceError>>;
}

/// In-process track source seeded from configuration.
#[derive(Clone, Default)]
pub struct StaticTrackSource {
    tracks: Arc<Vec<SeedTrack>>,
}

impl StaticTrackSource {
    /// Build a pool from config seed entries.
    pub fn from_seed(seed: &[SeedTrack]) -> Self {
        Self {
            tracks: Arc::new(seed.to_vec()),
        }
    }
}

impl TrackSource for StaticTrackSource {
    fn draw_candidates(&self) -> BoxFuture<'static, Result<Vec<CandidateTrack>, TrackSourceError>> {
        let tracks = Arc::clone(&self.tracks);
        Box::pin(async move {
            Ok(tracks
                .iter()
                .map(|track| CandidateTrack {
                    name: track.name.clone(),
                    artist: track.artist.clone(),
                    album_cover: track.album_cover.clone(),
                })
                .collect())
        })
    }

    fn preview_url(
        &self,
        title: &str,
        artist: &str,
    ) -> BoxFuture<'static, Result<Option<String>, TrackSourceError>> {
        let tracks = Arc::clone(&self.tracks);
        let title = title.to_owned();
        let artist = artist.to_owned();
        Box::pin(async move {
            Ok(tracks
                .iter()
                .find(|track| track.name == title && track.artist == artist)
                .and_then(|track| track.preview_url.clone()))
        })
    }
}
