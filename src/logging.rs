use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Set to `pretty` for human-readable output instead of JSON lines.
const LOG_FORMAT_ENV: &str = "AITK_LOG_FORMAT";

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let pretty = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("pretty"))
        .unwrap_or(false);
    let registry = tracing_subscriber::registry().with(filter);
    if pretty {
        registry.with(fmt::layer().compact()).init();
    } else {
        registry.with(fmt::layer().json()).init();
    }
}
