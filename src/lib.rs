pub mod abort;
pub mod blank;
pub mod display;
pub mod error;
pub mod gl;
pub mod input;
pub mod logging;
pub mod media;
pub mod mpvclient;
pub mod options;
pub mod playback;
pub mod player;
pub mod runner;
pub mod settings;

pub use error::{Error, Result};
