//! Panic reporting.
//!
//! A panicking pass is caught by the schedule loop, so the process keeps
//! running; the hook makes sure the panic and its backtrace still reach the
//! daily log file.

use chrono::Local;
use std::{
    backtrace::Backtrace,
    fs::OpenOptions,
    io::Write,
    panic::{PanicHookInfo, take_hook},
    path::{Path, PathBuf},
    thread,
};

use crate::logging::LOG_FILE_PREFIX;

/// Installs a global panic hook that logs a one-line summary via `tracing` and
/// appends the full record, backtrace included, to the current daily log file.
pub fn install(log_dir: impl AsRef<Path>) {
    let log_dir = log_dir.as_ref().to_path_buf();
    let previous_hook = take_hook();

    std::panic::set_hook(Box::new(move |panic_info: &PanicHookInfo<'_>| {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tracing::error!(
                target: "like_monitor::panic",
                thread = %thread_name(),
                location = %panic_location(panic_info),
                "Panic: {}",
                panic_payload_to_string(panic_info)
            );

            let _ = append_panic_record(&log_dir, &format_panic_record(panic_info));
        }));

        previous_hook(panic_info);
    }));
}

/// Same naming as `tracing_appender::rolling::daily`.
fn daily_log_path(log_dir: &Path) -> PathBuf {
    let filename = format!("{LOG_FILE_PREFIX}.{}", Local::now().format("%Y-%m-%d"));
    log_dir.join(filename)
}

fn append_panic_record(log_dir: &Path, record: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(daily_log_path(log_dir))?;
    writeln!(file, "{record}")?;
    file.flush()
}

fn thread_name() -> String {
    thread::current()
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| "<unnamed>".to_string())
}

fn panic_location(panic_info: &PanicHookInfo<'_>) -> String {
    panic_info
        .location()
        .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
        .unwrap_or_else(|| "<unknown>".to_string())
}

fn format_panic_record(panic_info: &PanicHookInfo<'_>) -> String {
    let backtrace = Backtrace::force_capture();
    let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");

    format!(
        "{ts} PANIC thread={} location={} payload={}\nBacktrace:\n{backtrace}",
        thread_name(),
        panic_location(panic_info),
        panic_payload_to_string(panic_info)
    )
}

fn panic_payload_to_string(panic_info: &PanicHookInfo<'_>) -> String {
    if let Some(s) = panic_info.payload().downcast_ref::<&'static str>() {
        return (*s).to_string();
    }
    if let Some(s) = panic_info.payload().downcast_ref::<String>() {
        return s.clone();
    }
    panic_info.to_string()
}
