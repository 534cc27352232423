use env_logger::Env;

/// Install the stderr logger. `RUST_LOG` overrides the `info` default.
pub fn init() {
    let result = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
    if let Err(e) = result {
        eprintln!("[taskboard] Logger already installed: {}", e);
    }
}
