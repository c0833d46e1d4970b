//! Kodegen Release Pipeline - build, archive and publish releases.

use kodegen_release_pipeline::cli::{self, OutputManager, format_duration};
use kodegen_release_pipeline::{EnvConfig, ReleaseError, fault};
use std::process;
use std::time::Instant;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let start = Instant::now();
    let env = EnvConfig::from_process();

    let result = fault::catch_faults(cli::run(env)).await;

    log::info!("Total in {}", format_duration(start.elapsed()));

    if let Err(e) = result {
        report(&e);
        process::exit(e.exit_code());
    }
}

fn report(e: &ReleaseError) {
    if let ReleaseError::Usage(usage) = e {
        let _ = usage.print();
        return;
    }

    let output = OutputManager::new(false);
    output.error(&format!("Error: {e}"));

    if let ReleaseError::Panic { backtrace, .. } = e
        && !backtrace.is_empty()
    {
        output.error_detail(&format!("stacktrace from panic:\n{backtrace}"));
    }

    let suggestions = e.recovery_suggestions();
    if !suggestions.is_empty() {
        output.error_detail("\n💡 Recovery suggestions:");
        for suggestion in suggestions {
            output.error_detail(&format!("    {suggestion}"));
        }
    }
}
