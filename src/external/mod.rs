//! Contracts for the collaborators surrounding the multiplayer core.
//!
//! Identity resolution and the track/preview catalog belong to the wider
//! platform; the core consumes them through these traits and ships static
//! in-process implementations for tests and standalone runs.

/// User identity lookup.
pub mod directory;
/// Candidate track draw and best-effort preview lookup.
pub mod tracks;

pub use directory::{DirectoryError, StaticUserDirectory, UserDirectory, UserRecord};
pub use tracks::{CandidateTrack, StaticTrackSource, TrackSource, TrackSourceError};
