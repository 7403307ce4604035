use crate::error::Result;
use crate::settings::{Backend, InputAction, Settings};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt, Clone)]
#[structopt(name = "clipsaver", about = "Plays random videos fullscreen until you touch something.")]
pub struct Options {
    /// Folder to pick videos from
    #[structopt(short, long, parse(from_os_str))]
    pub dir: Option<PathBuf>,

    /// Settings file to use instead of the default one
    #[structopt(long, parse(from_os_str))]
    pub config: Option<PathBuf>,

    /// Mute audio
    #[structopt(short, long)]
    pub mute: bool,

    /// Pointer movement (px) that counts as input
    #[structopt(short, long)]
    pub threshold: Option<u32>,

    /// Start another clip on input instead of exiting
    #[structopt(long)]
    pub next_on_input: bool,

    /// Black out every monitor except the primary one
    #[structopt(long)]
    pub blank_others: bool,

    /// Search subfolders too
    #[structopt(short, long)]
    pub recursive: bool,

    /// Include hidden entries
    #[structopt(short, long)]
    pub all: bool,

    /// Renderer: auto, render or embed
    #[structopt(long)]
    pub backend: Option<Backend>,

    /// More logging (-v debug, -vv trace)
    #[structopt(short, long, parse(from_occurrences))]
    pub verbose: u8,
}

impl Options {
    /// Loads the settings file and applies the command line on top of it.
    pub fn settings(&self) -> Result<Settings> {
        let base = match self.config.clone().or_else(Settings::default_path) {
            Some(path) => Settings::load(&path)?,
            None => Settings::default(),
        };
        Ok(self.apply(base))
    }

    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(dir) = &self.dir {
            settings.video_dir = dir.clone();
        }
        if let Some(threshold) = self.threshold {
            settings.mouse_threshold = threshold;
        }
        if let Some(backend) = self.backend {
            settings.backend = backend;
        }
        if self.next_on_input {
            settings.on_input = InputAction::Next;
        }
        settings.mute |= self.mute;
        settings.blank_others |= self.blank_others;
        settings.recursive |= self.recursive;
        settings.include_hidden |= self.all;
        settings
    }
}

#[derive(Debug, StructOpt, Clone)]
#[structopt(name = "clipsaver-blank", about = "Blacks out secondary monitors until you touch something.")]
pub struct BlankOptions {
    /// Blank the primary monitor as well
    #[structopt(short, long)]
    pub all: bool,

    /// Pointer movement (px) that counts as input
    #[structopt(short, long, default_value = "5")]
    pub threshold: u32,

    /// More logging (-v debug, -vv trace)
    #[structopt(short, long, parse(from_occurrences))]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_settings() {
        let opts = Options::from_iter([
            "clipsaver",
            "--dir",
            "/media/clips",
            "-t",
            "9",
            "--next-on-input",
            "--backend",
            "embed",
            "-m",
        ]);
        let settings = opts.apply(Settings::default());
        assert_eq!(settings.video_dir, PathBuf::from("/media/clips"));
        assert_eq!(settings.mouse_threshold, 9);
        assert_eq!(settings.on_input, InputAction::Next);
        assert_eq!(settings.backend, Backend::Embed);
        assert!(settings.mute);
        assert!(!settings.blank_others);
    }

    #[test]
    fn absent_flags_keep_file_settings() {
        let file = Settings {
            mute: true,
            mouse_threshold: 20,
            ..Settings::default()
        };
        let settings = Options::from_iter(["clipsaver"]).apply(file.clone());
        assert_eq!(settings, file);
    }

    #[test]
    fn blank_defaults() {
        let opts = BlankOptions::from_iter(["clipsaver-blank", "-vv"]);
        assert!(!opts.all);
        assert_eq!(opts.threshold, 5);
        assert_eq!(opts.verbose, 2);
    }
}
