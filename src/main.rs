use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

use h2h_league::config::{LeagueConfig, Settings, load_env_files, load_league_config};
use h2h_league::model::{MatchStatus, Mode, StandingsSnapshot, Token};
use h2h_league::points::FplClient;
use h2h_league::resolver::{Resolver, SeedSource, resolve_all_tokens};
use h2h_league::schedule::{labelled_schedule, load_schedule, name_map};
use h2h_league::season::{RunOptions, run_gameweek};
use h2h_league::store::{JsonStore, ResultStore};

fn main() -> Result<()> {
    load_env_files();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let gw = match arg_value(&args, "--gw") {
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| anyhow!("--gw expects a positive gameweek, got {raw:?}"))?,
        None => 1,
    };
    if gw == 0 {
        return Err(anyhow!("--gw must be at least 1"));
    }
    let mode = match arg_value(&args, "--mode") {
        Some(raw) => raw.parse::<Mode>()?,
        None => Mode::Final,
    };
    let freeze_seeds = args.iter().any(|a| a == "--freeze-seeds");

    let settings = Settings::from_env();
    let config = load_league_config(&settings.config_path)?;
    let schedule = load_schedule(&settings.schedule_path)?;
    let participants = config.participants();

    let mut store = JsonStore::open(&settings.data_dir)?;
    store
        .save_schedule(&labelled_schedule(&schedule, &participants))
        .context("write schedule.json")?;

    let provider = FplClient::new(settings.api_base.clone(), settings.timeout_secs)?;
    let summary = run_gameweek(
        &mut store,
        &provider,
        &config,
        &schedule,
        RunOptions {
            gw,
            mode,
            freeze_seeds,
        },
    )?;

    println!("GW{} ({}) written to {}", gw, mode, store.dir().display());
    for m in &summary.record.matches {
        println!(
            "  {} {} - {} {}  [{}]",
            m.home_name,
            m.home_points,
            m.away_points,
            m.away_name,
            status_text(&m.status)
        );
    }
    println!("Standings through GW{}:", summary.standings.through_gw);
    for (pos, row) in summary.standings.teams.iter().enumerate() {
        println!(
            "  {:>2}. {:<24} P{:<3} W{:<3} D{:<3} L{:<3} {:>5}:{:<5} {:>3} pts",
            pos + 1,
            row.name,
            row.played,
            row.wins,
            row.draws,
            row.losses,
            row.points_for,
            row.points_against,
            row.league_points
        );
    }
    if let Some(seeds) = summary.seeds_captured.as_ref() {
        println!(
            "Seeds frozen from standings through GW{}: {:?}{}",
            seeds.captured_through_gw,
            seeds.seeds,
            if seeds.provisional { " (provisional, live points)" } else { "" }
        );
    }

    if gw >= config.playoffs.regular_season_end {
        print_bracket(&store, &config, &summary.standings)?;
    }

    match summary.prizes.as_ref() {
        Some(report) => {
            println!("Prizes through GW{}:", report.processed_through_gw);
            for total in &report.ledger.totals {
                println!(
                    "  {:<24} {} {:>8.2}  kits {}",
                    total.name, report.ledger.currency, total.weekly_winnings, total.kits_won
                );
            }
            for block in &report.blocks {
                if let Some(note) = block.note.as_deref() {
                    println!("  {}: {}", block.name, note);
                }
            }
        }
        None => println!("No prize configuration; prizes skipped"),
    }

    Ok(())
}

fn print_bracket(
    store: &JsonStore,
    config: &LeagueConfig,
    standings: &StandingsSnapshot,
) -> Result<()> {
    let frozen = store.load_seeds()?;
    let seeds = match frozen.as_ref() {
        Some(seeds) => SeedSource::Frozen(seeds),
        None => SeedSource::Live(standings),
    };
    let resolver = Resolver::new(store, &config.playoffs);
    let resolved = resolve_all_tokens(&resolver, &seeds)?;
    let names = name_map(&config.participants());

    println!("Bracket:");
    for token in Token::ALL {
        let label = resolved
            .get(&token)
            .copied()
            .flatten()
            .map(|id| names.get(&id).cloned().unwrap_or_else(|| id.to_string()))
            .unwrap_or_else(|| "(unresolved)".to_string());
        println!("  {:<18} {}", token.as_str(), label);
    }
    Ok(())
}

fn status_text(status: &MatchStatus) -> String {
    match status {
        MatchStatus::Final => "final".to_string(),
        MatchStatus::Live => "live".to_string(),
        MatchStatus::Pending { reason } => format!("pending: {reason}"),
    }
}

fn arg_value(args: &[String], key: &str) -> Option<String> {
    let prefix = format!("{key}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == key
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}
