use clipsaver::media::{MediaLibrary, VideoFile};
use clipsaver::options::Options;
use clipsaver::{logging, runner, Result};
use std::process::ExitCode;
use structopt::StructOpt;

fn run(opts: Options) -> Result<()> {
    let settings = opts.settings()?;
    tracing::info!("Searching folder: {}", settings.video_dir.display());
    let library = MediaLibrary::from_settings(&settings)?;
    tracing::info!("Found {} videos", library.len());
    for name in library.videos().iter().map(VideoFile::name) {
        tracing::debug!("- {name}");
    }
    runner::run(settings, library)
}

fn main() -> ExitCode {
    let opts = Options::from_args();
    logging::init(opts.verbose);
    match run(opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_config() => {
            tracing::error!("Configuration error: {err}");
            ExitCode::FAILURE
        }
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
