mod args;
mod dash;

use clap::Parser;
use log::info;

use crate::args::Args;
use crate::dash::{report_error, run_dashboard};

fn main() {
    let args = Args::parse();

    if args.verbose {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    info!("args: {:?}", args.config);

    if let Err(e) = run_dashboard(&args) {
        report_error(&e);
        std::process::exit(1);
    }
}
