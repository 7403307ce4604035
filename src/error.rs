use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("video folder not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("no video files in {}", .0.display())]
    NoMedia(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("path is not valid UTF-8: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("player was already released")]
    Released,

    #[error("mpv: {0}")]
    Mpv(#[from] libmpv2::Error),

    #[error(transparent)]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("window: {0}")]
    Window(String),

    #[error("graphics: {0}")]
    Graphics(String),

    #[error("giving up after {0} clips in a row failed to play")]
    TooManyFailures(usize),
}

impl From<winit::error::OsError> for Error {
    fn from(err: winit::error::OsError) -> Self {
        Error::Window(err.to_string())
    }
}

impl From<raw_window_handle::HandleError> for Error {
    fn from(err: raw_window_handle::HandleError) -> Self {
        Error::Window(err.to_string())
    }
}

impl From<glutin::error::Error> for Error {
    fn from(err: glutin::error::Error) -> Self {
        Error::Graphics(err.to_string())
    }
}

impl Error {
    /// Errors that stop the run before anything is shown.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::DirectoryNotFound(_) | Error::NoMedia(_) | Error::Config(_)
        )
    }
}
