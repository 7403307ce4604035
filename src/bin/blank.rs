use clipsaver::blank::{self, BlankSettings};
use clipsaver::logging;
use clipsaver::options::BlankOptions;
use std::process::ExitCode;
use structopt::StructOpt;

fn main() -> ExitCode {
    let opts = BlankOptions::from_args();
    logging::init(opts.verbose);
    let settings = BlankSettings {
        include_primary: opts.all,
        threshold: opts.threshold,
        ..BlankSettings::default()
    };
    match blank::run(settings) {
        Ok(()) => {
            tracing::info!("All screens released");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
