use spaced_review::config::DEFAULT_CONFIG_PATH;
use spaced_review::*;

use log::info;
use std::process::ExitCode;

const DEMO_OWNER: &str = "demo";

fn run() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(DEFAULT_CONFIG_PATH)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_filter))
        .init();

    let store = SqliteCardStore::open(&config.database_path)?;
    let manager = CardLifecycleManager::new(store);

    if manager.get_stats(DEMO_OWNER)?.total_cards == 0 {
        let report = manager.initialize_cards(DEMO_OWNER, ["examA#q1", "examA#q2", "examA#q3"]);
        info!("Sample cards created: {}", report.created.len());
    }

    let due = manager.get_due_cards(DEMO_OWNER, None)?;
    info!("{} cards due for '{}'", due.len(), DEMO_OWNER);
    for card in &due {
        info!(
            "  - {} (interval {}d, ease {:.2}, streak {})",
            card.source_ref, card.interval, card.ease_factor, card.repetitions
        );
    }

    let stats = manager.get_stats(DEMO_OWNER)?;
    info!(
        "Due today: {}, learned: {}, total: {}",
        stats.due_today, stats.learned, stats.total_cards
    );
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
