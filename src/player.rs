use crate::error::Result;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Loading,
    Playing,
    /// The stream ran out.
    Ended,
    /// The file never started playing.
    Failed(String),
}

impl PlayerState {
    pub fn is_finished(&self) -> bool {
        matches!(self, PlayerState::Ended | PlayerState::Failed(_))
    }
}

/// The minimum a playback backend has to offer.
///
/// `release` frees the backend's handles. After it the player must not be used
/// again; callers go through [`crate::playback::PlaybackSession`], which calls it
/// exactly once.
pub trait Player {
    fn load(&mut self, path: &Path) -> Result<()>;

    fn play(&mut self) -> Result<()>;

    /// Polls the backend. Must not block.
    fn state(&mut self) -> PlayerState;

    fn stop(&mut self);

    fn release(&mut self);

    /// Draws the current frame into the bound surface. Returns whether anything
    /// was drawn, so the caller knows to present it.
    fn draw(&mut self, _width: u32, _height: u32) -> Result<bool> {
        Ok(false)
    }
}
