use crate::error::{Error, Result};
use crate::settings::Settings;
use auto_enums::auto_enum;
use rand::seq::SliceRandom;
use rand::Rng;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// How the bytes of a video file are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFormat {
    /// mp4, mkv and friends.
    Container,
    /// A bare encoded stream such as `.hevc`, which needs a capable external decoder.
    ElementaryStream,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    pub path: PathBuf,
    pub format: VideoFormat,
}

impl VideoFile {
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or(self.path.as_os_str())
            .to_string_lossy()
            .into_owned()
    }
}

/// Which files count as videos.
#[derive(Debug, Clone)]
pub struct MediaFilter {
    extensions: Vec<String>,
    elementary: Vec<String>,
    include_hidden: bool,
}

impl MediaFilter {
    pub fn new<S: AsRef<str>>(extensions: &[S], elementary: &[S], include_hidden: bool) -> Self {
        Self {
            extensions: extensions.iter().map(|ext| normalize(ext.as_ref())).collect(),
            elementary: elementary.iter().map(|ext| normalize(ext.as_ref())).collect(),
            include_hidden,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.extensions.as_slice(),
            settings.elementary_extensions.as_slice(),
            settings.include_hidden,
        )
    }

    /// Classifies `path`, or `None` if it doesn't have a recognized extension.
    pub fn classify(&self, path: &Path) -> Option<VideoFormat> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if !self.extensions.contains(&ext) {
            return None;
        }
        if self.elementary.contains(&ext) {
            Some(VideoFormat::ElementaryStream)
        } else {
            Some(VideoFormat::Container)
        }
    }

    fn visible(&self, name: &OsStr) -> bool {
        self.include_hidden || !is_hidden(name)
    }
}

fn normalize(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}

fn is_hidden(name: &OsStr) -> bool {
    name.as_encoded_bytes().starts_with(b".")
}

/// The videos found in one folder.
#[derive(Debug, Clone)]
pub struct MediaLibrary {
    videos: Vec<VideoFile>,
}

impl MediaLibrary {
    pub fn scan(dir: &Path, filter: &MediaFilter, recursive: bool) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::DirectoryNotFound(dir.to_path_buf()));
        }
        let mut videos = candidates(dir, filter, recursive)?
            .filter_map(|path| {
                filter
                    .classify(&path)
                    .map(|format| VideoFile { path, format })
            })
            .collect::<Vec<_>>();
        if videos.is_empty() {
            return Err(Error::NoMedia(dir.to_path_buf()));
        }
        videos.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(Self { videos })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::scan(
            &settings.video_dir,
            &MediaFilter::from_settings(settings),
            settings.recursive,
        )
    }

    pub fn videos(&self) -> &[VideoFile] {
        &self.videos
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    /// Uniform pick. The same file may come up twice in a row.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &VideoFile {
        // scan() never builds an empty library
        self.videos.choose(rng).unwrap_or(&self.videos[0])
    }
}

fn candidates(
    dir: &Path,
    filter: &MediaFilter,
    recursive: bool,
) -> Result<impl Iterator<Item = PathBuf>> {
    let entries = if recursive {
        None
    } else {
        Some(fs::read_dir(dir)?)
    };
    Ok(walk(dir, filter.clone(), entries))
}

#[auto_enum(Iterator)]
fn walk(
    dir: &Path,
    filter: MediaFilter,
    entries: Option<fs::ReadDir>,
) -> impl Iterator<Item = PathBuf> {
    match entries {
        None => WalkDir::new(dir)
            .into_iter()
            .filter_entry(move |entry| entry.depth() == 0 || filter.visible(entry.file_name()))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path()),
        Some(entries) => entries
            .filter_map(|entry| entry.ok())
            .filter(move |entry| {
                filter.visible(&entry.file_name())
                    && entry.file_type().map_or(false, |ft| ft.is_file())
            })
            .map(|entry| entry.path()),
    }
}
