use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};
use std::env;
use std::fs::File;

const DEFAULT_LOG_FILE: &str = "quartz.log";

// stdout carries the UCI protocol, so diagnostics only ever go to a file.
// QUARTZ_LOG selects the level (off/error/warn/info/debug/trace) and
// QUARTZ_LOG_FILE overrides the destination.
pub fn init_logging() {
    let level = match env::var("QUARTZ_LOG")
        .map(|v| v.to_ascii_lowercase())
        .as_deref()
    {
        Ok("off") | Ok("none") => return,
        Ok("error") => LevelFilter::Error,
        Ok("warn") => LevelFilter::Warn,
        Ok("debug") => LevelFilter::Debug,
        Ok("trace") => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    let path = env::var("QUARTZ_LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());

    // Search threads are named (search-master, search-N); tagging records
    // with the writer makes SMP traces readable
    let config = ConfigBuilder::new()
        .set_thread_level(LevelFilter::Info)
        .set_target_level(LevelFilter::Debug)
        .build();

    // An unwritable destination silently disables logging; the protocol
    // stream is never touched
    if let Ok(file) = File::create(&path) {
        if WriteLogger::init(level, config, file).is_ok() {
            log::info!("log level {:?}, writing to {}", level, path);
        }
    }
}
