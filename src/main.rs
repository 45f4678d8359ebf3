use accreditation_ledger::config::CONFIG_FILE_NAME;
use accreditation_ledger::{LedgerConfig, PageSource, Pipeline, RunReport};
use anyhow::{Context, Result};
use chrono::Utc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = LedgerConfig::from_file_or_default(CONFIG_FILE_NAME)
        .with_context(|| format!("Failed to load {}", CONFIG_FILE_NAME))?;

    println!("🏷️  Accreditation Ledger v{}", accreditation_ledger::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🌐 Source: {}", config.target_url);

    let source = page_source(&config);
    let pipeline = Pipeline::new(config);
    let report = pipeline.run(&*source, Utc::now())?;

    print_report(&report);
    Ok(())
}

#[cfg(feature = "http")]
fn page_source(config: &LedgerConfig) -> Box<dyn PageSource> {
    Box::new(accreditation_ledger::HttpPageSource::new(&config.user_agent))
}

/// Without a transport every run is Stale, but state and page still update
#[cfg(not(feature = "http"))]
fn page_source(_config: &LedgerConfig) -> Box<dyn PageSource> {
    use accreditation_ledger::FetchError;
    use std::time::Duration;

    struct NoTransport;

    impl PageSource for NoTransport {
        fn fetch(&self, _url: &str, _timeout: Duration) -> Result<String, FetchError> {
            Err(FetchError::Unsupported(
                "rebuild with --features http".to_string(),
            ))
        }
    }

    eprintln!("⚠️  Built without the `http` feature; the live page cannot be fetched");
    Box::new(NoTransport)
}

fn print_report(report: &RunReport) {
    let state = &report.reconciliation.state;
    let summary = &report.reconciliation.summary;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if report.is_stale() {
        println!("⚠️  Update STALE, previous records kept");
        if let Some(reason) = &report.reconciliation.stale_reason {
            println!("   Reason: {}", reason);
        }
    } else {
        println!("✅ Update successful");
        if let Some(scheme) = report.scheme {
            println!("   Markup: {}", scheme.name());
        }
        println!("   New:           {}", summary.newly_accredited);
        println!("   Re-accredited: {}", summary.reaccredited);
        println!("   Unlisted:      {}", summary.newly_unlisted);
        println!("   Renamed:       {}", summary.renamed);
    }

    println!(
        "📊 Registry: {} organizations ({} accredited, {} unlisted)",
        state.len(),
        state.accredited_count(),
        state.unlisted_count()
    );
    println!("💾 State: {}", report.state_file.display());

    match &report.render {
        Ok(path) => println!("🖼️  Page: {}", path.display()),
        Err(err) => println!("❌ Page not rendered: {}", err),
    }
}
