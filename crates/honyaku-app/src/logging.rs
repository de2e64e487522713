use tracing_subscriber::EnvFilter;

/// Human-readable logs on a terminal, JSON lines otherwise.
///
/// Logs go to stderr, stdout carries translations.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if atty::is(atty::Stream::Stderr) {
        builder.init();
    } else {
        builder.json().init();
    }
}
