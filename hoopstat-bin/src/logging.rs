use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

/// Initialize the logging system with the given level for our own crates.
pub(crate) fn init_logging(level: LevelFilter) {
    // Set a base level for all modules to `warn`, which is a reasonable default.
    // It will be overridden by RUST_LOG if it's set.
    let env = Env::default().filter_or("RUST_LOG", "warn");

    let mut builder = Builder::from_env(env);
    builder.format_timestamp(None).format_module_path(false);

    if std::env::var("RUST_LOG").is_err() {
        // Dependencies stay at `warn`; `-v` flags only affect our own crates
        builder
            .filter_level(LevelFilter::Warn)
            .filter_module("hoopstat", level)
            .filter_module("hoopstat_lib", level);
    }

    builder.format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()));
    builder.init();
}
