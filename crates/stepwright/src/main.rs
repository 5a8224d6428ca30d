use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use stepwright_engine::executor::{ExecutorConfig, ScenarioExecutor, ScenarioResult};
use stepwright_engine::hints::FileHintProvider;
use stepwright_engine::{load_scenarios, Config, ConfigLoader, StructureHints};
use stepwright_wd::WebDriverSession;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "stepwright", version, about = "Natural-language web scenario runner")]
struct Args {
    /// Scenario file or directory of scenario files
    #[arg(short = 't', long)]
    tests: PathBuf,

    /// Configuration file (falls back to ./stepwright.yaml, then
    /// ~/.stepwright/config.yaml, then defaults)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Target base URL (overrides config)
    #[arg(short = 'u', long)]
    url: Option<String>,

    /// Browser to use (chrome/firefox, overrides config)
    #[arg(long)]
    browser: Option<String>,

    /// Run the browser headless
    #[arg(long)]
    headless: bool,

    /// Structure-hint file produced by a page analyzer
    #[arg(long)]
    hints: Option<PathBuf>,

    /// WebDriver endpoint to connect to
    #[arg(long, default_value = "http://localhost:4444")]
    webdriver_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the run report.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config: Config = match &args.config {
        Some(path) => ConfigLoader::load_from(path)
            .await
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ConfigLoader::load_default().await?,
    };
    if let Some(url) = args.url {
        config.test.base_url = url;
    }
    if let Some(browser) = args.browser {
        config.browser.name = browser;
    }
    if args.headless {
        config.browser.headless = true;
    }
    if config.test.base_url.is_empty() {
        bail!("no base URL provided; use -u/--url or set test.base_url in the config file");
    }

    let scenarios = load_scenarios(&args.tests)
        .await
        .with_context(|| format!("loading scenarios from {}", args.tests.display()))?;
    if scenarios.is_empty() {
        bail!("no scenarios found in {}", args.tests.display());
    }
    info!(count = scenarios.len(), "scenarios loaded");

    let hints = match &args.hints {
        Some(path) => FileHintProvider::load(path)
            .await
            .with_context(|| format!("loading hints from {}", path.display()))?,
        None => StructureHints::default(),
    };

    let mut session = WebDriverSession::new(
        &args.webdriver_url,
        &config.browser.name,
        config.browser.headless,
        config.browser.window_size,
    );
    session
        .launch()
        .await
        .context("launching WebDriver session")?;

    let executor_config = ExecutorConfig {
        settle_delay: Duration::from_millis(config.test.settle_delay_ms),
        page_load_timeout: Duration::from_secs(config.browser.page_load_timeout),
        screenshot_dir: Some(config.test.screenshot_dir.clone()),
    };

    let mut reports = Vec::new();
    for (mut scenario, warnings) in scenarios {
        for warning in &warnings {
            warn!(scenario = %scenario.name, "{}", warning);
        }
        scenario.apply_default_timeout(config.test.wait_timeout);

        info!(scenario = %scenario.name, "running");
        let mut executor = ScenarioExecutor::new(&mut session, executor_config.clone())
            .with_hints(hints.clone());
        let result = executor.run(&scenario, &config.test.base_url).await;
        print_scenario_report(&result);
        reports.push(result);
    }

    if let Err(e) = session.close().await {
        warn!(error = %e, "session close failed");
    }

    let failed = reports.iter().filter(|r| !r.passed()).count();
    print_summary(&reports, failed);
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_scenario_report(result: &ScenarioResult) {
    let verdict = if result.passed() { "PASS" } else { "FAIL" };
    println!("\n=== {} [{}]", result.name, verdict);
    if let Some(message) = &result.navigation_error {
        println!("  navigation error: {}", message);
    }
    for (index, step) in result.results.iter().enumerate() {
        let mark = if step.succeeded { "ok" } else { "FAILED" };
        println!(
            "  {:>3}. {:<6} {} ({}ms)",
            index + 1,
            mark,
            step.step.raw_text,
            step.elapsed_ms
        );
        if let Some(error) = &step.error {
            println!("       {}", error);
        }
        if let Some(path) = &step.screenshot {
            println!("       screenshot: {}", path.display());
        }
    }
    if let Some(at) = result.aborted_at {
        println!("  aborted at step {}; later steps were not run", at + 1);
    }
}

fn print_summary(reports: &[ScenarioResult], failed: usize) {
    println!("\n{} scenario(s): {} passed, {} failed", reports.len(), reports.len() - failed, failed);
}
