/// Logger setup and progress bars shared by the binaries and long-running stages
use indicatif::{ProgressBar, ProgressStyle};

/// Install `env_logger` with `info` as the default level; `RUST_LOG` overrides it.
/// Calling it again is harmless.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Bar over `len` items of `unit`, with throughput and remaining time
pub fn progress_bar(len: u64, unit: &str, message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let template = format!(
        "[{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) eta {{eta}} {{msg}}",
        unit
    );
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("▉▊▋▌▍▎▏ "),
    );
    pb.set_message(message);
    pb
}
