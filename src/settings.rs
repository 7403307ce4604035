use crate::error::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.json";

/// What user input does to the running screensaver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputAction {
    Exit,
    Next,
}

/// Which renderer plays a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Pick by file format.
    Auto,
    /// Frames are drawn into our own surface.
    Render,
    /// The player owns the window contents.
    Embed,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Backend::Auto),
            "render" => Ok(Backend::Render),
            "embed" => Ok(Backend::Embed),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    // Folder searched for videos
    pub video_dir: PathBuf,

    // Recognized extensions, with the leading dot
    pub extensions: Vec<String>,

    // Extensions that are raw elementary streams
    pub elementary_extensions: Vec<String>,

    // Descend into subfolders
    pub recursive: bool,

    // Include hidden entries
    pub include_hidden: bool,

    // Pointer displacement (px) that counts as input
    pub mouse_threshold: u32,

    pub poll_interval_ms: u64,

    // Input right after startup is ignored for this long
    pub startup_grace_ms: u64,

    pub mute: bool,

    // Passed through to mpv's hwdec
    pub hwdec: String,

    pub on_input: InputAction,

    pub backend: Backend,

    // Black out the monitors not showing the video
    pub blank_others: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let video_dir = directories::UserDirs::new()
            .and_then(|dirs| dirs.video_dir().map(Path::to_path_buf))
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_default();
        Self {
            video_dir,
            extensions: [".mp4", ".avi", ".mov", ".mkv", ".hevc", ".265"]
                .map(String::from)
                .to_vec(),
            elementary_extensions: [".hevc", ".265"].map(String::from).to_vec(),
            recursive: false,
            include_hidden: false,
            mouse_threshold: 5,
            poll_interval_ms: 50,
            startup_grace_ms: 1000,
            mute: false,
            hwdec: "auto".to_string(),
            on_input: InputAction::Exit,
            backend: Backend::Auto,
            blank_others: false,
        }
    }
}

impl Settings {
    /// Default location of the settings file, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "clipsaver")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Reads the settings file, writing the defaults there when it doesn't exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::File::open(path) {
            Ok(file) => Self::from_reader(std::io::BufReader::new(file)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let result = Self::default();
                if let Err(err) = result.save(path) {
                    tracing::warn!("Could not write default settings to {}: {err}", path.display());
                }
                Ok(result)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serialized)?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }
}
