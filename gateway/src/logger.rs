use log::LevelFilter;
use logforth::append;

use crate::args::Args;

pub fn init(args: &Args) {
    let level = args.log_level.parse::<LevelFilter>().unwrap_or_else(|_| {
        eprintln!("unrecognized log level '{}', using info", args.log_level);
        LevelFilter::Info
    });

    logforth::builder()
        .dispatch(|dispatch| dispatch.filter(level).append(append::Stderr::default()))
        .apply();
}
