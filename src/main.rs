//! TeamInv - team inventory pooling and key aggregation
//!
//! A CLI tool that imports per-agent inventory exports, groups agents into
//! teams and reports the combined equipment and portal keys of a team.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Invalid arguments or runtime error

mod analysis;
mod cli;
mod config;
mod ingest;
mod layer;
mod models;
mod report;
mod store;
mod sync;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::{AgentCommand, Args, Command, OutputFormat, ScopeArgs, SheetsCommand, TeamCommand};
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use layer::{ClaimedPortals, KeyLayer, MarkerRegistry, NoClaims};
use models::{AgentInventory, MapDisplayMode, Team};
use report::keys::{key_rows, parse_distance, KeyQuery, KeySort, LatLng};
use std::path::{Path, PathBuf};
use store::{FileOutcome, TeamStore};
use sync::MergePolicy;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    init_logging(&args);

    debug!("TeamInv v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args) {
        error!("Command failed: {}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: generate a default .teaminv.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to change the store path, import filters and sheet tab.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load config and store, run one command, save when it changed anything.
fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let mut store = TeamStore::open(&config.general.store)
        .with_context(|| format!("Failed to open store {}", config.general.store.display()))?;
    info!("Store: {} ({} team(s))", store.path().display(), store.teams().len());

    let changed = match args.command.clone() {
        Command::InitConfig => false,
        Command::Team(cmd) => handle_team(&mut store, cmd)?,
        Command::Agent(cmd) => handle_agent(&mut store, &config, cmd, args.quiet)?,
        Command::Report {
            scope,
            format,
            output,
            center,
        } => {
            let format = format.unwrap_or(config.display.format);
            handle_report(&store, &scope, format, output, center)?;
            false
        }
        Command::Keys {
            scope,
            search,
            center,
            sort,
            desc,
            within,
        } => {
            let query = KeyQuery {
                search,
                center,
                sort,
                descending: desc,
                within_m: within.as_deref().map(parse_distance),
            };
            handle_keys(&store, &scope, &query)?;
            false
        }
        Command::Export { output } => {
            handle_export(&store, output)?;
            false
        }
        Command::ImportTeams { file, policy } => {
            let incoming = ingest::read_teams_file(&file)
                .with_context(|| format!("Failed to import {}", file.display()))?;
            apply_incoming(&mut store, incoming, policy)?;
            true
        }
        Command::Sheets(cmd) => handle_sheets(&mut store, &config, cmd)?,
        Command::Markers {
            visible,
            removed,
            selected,
            mode,
            scope,
        } => {
            let view = MarkerView {
                visible: &visible,
                removed: removed.as_deref(),
                selected: selected.as_deref(),
                mode,
            };
            handle_markers(&store, &config, &scope, &view)?;
            false
        }
        Command::Portal { guid, scope } => {
            let (_, agents) = scoped_agents(&store, &scope)?;
            let keys = analysis::aggregate_keys(&agents);
            match layer::portal_details(&keys, &guid) {
                Some(details) => println!("{}", details),
                None => println!("No team keys for portal {}", guid),
            }
            false
        }
        Command::DisplayMode { mode } => {
            store.set_map_display_mode(mode);
            println!("✅ Map markers now show keys as: {}", mode);
            true
        }
    };

    if changed {
        store.save()?;
        debug!("Store saved to {}", store.path().display());
    }

    Ok(())
}

fn handle_team(store: &mut TeamStore, cmd: TeamCommand) -> Result<bool> {
    match cmd {
        TeamCommand::Create { name } => {
            let team = store.create_team(&name, Utc::now())?;
            println!("✅ Created team {} ({})", team.name, team.id);
        }
        TeamCommand::Delete { id } => {
            let team = store.delete_team(&id)?;
            println!(
                "🗑️  Deleted team {} with {} agent(s)",
                team.name,
                team.agents.len()
            );
        }
        TeamCommand::List => {
            print_teams(store);
            return Ok(false);
        }
        TeamCommand::Select { id, none } => {
            let id = if none { None } else { id };
            store.select_team(id.as_deref())?;
            match store.selected_team() {
                Some(team) => println!("✅ Selected {}", team.label()),
                None => println!("✅ Showing all teams"),
            }
        }
    }
    Ok(true)
}

fn print_teams(store: &TeamStore) {
    if store.teams().is_empty() {
        println!("No teams yet. Create one with `teaminv team create <NAME>`.");
        return;
    }

    let selected = store.selected_id();
    for team in store.teams() {
        let marker = if selected == Some(team.id.as_str()) { "*" } else { " " };
        println!("{} {}  {}", marker, team.id, team.label());
    }
}

fn handle_agent(
    store: &mut TeamStore,
    config: &Config,
    cmd: AgentCommand,
    quiet: bool,
) -> Result<bool> {
    match cmd {
        AgentCommand::Import {
            paths,
            team,
            name,
            new_team,
        } => import_agents(store, config, &paths, team, name.as_deref(), new_team, quiet),
        AgentCommand::Remove { team, name } => {
            store.remove_agent(&team, &name)?;
            println!("🗑️  Removed agent {} from team {}", name, team);
            Ok(true)
        }
        AgentCommand::List { team } => {
            let team = match team {
                Some(id) => store
                    .team(&id)
                    .ok_or_else(|| store::StoreError::TeamNotFound(id.clone()))?,
                None => store
                    .selected_team()
                    .context("No team selected; pass --team")?,
            };
            print_agents(team);
            Ok(false)
        }
    }
}

fn print_agents(team: &Team) {
    println!("{}", team.label());
    for agent in &team.agents {
        println!(
            "  {}  imported {}  {} key(s) at {} portal(s)",
            agent.name,
            agent.imported_at.format("%Y-%m-%d %H:%M"),
            agent.key_count(),
            agent.key_portals()
        );
    }
}

/// Pick the team an import goes to, creating the first team when needed.
fn resolve_import_team(
    store: &mut TeamStore,
    team: Option<String>,
    new_team: Option<String>,
) -> Result<String> {
    if let Some(id) = team {
        if store.team(&id).is_none() {
            return Err(store::StoreError::TeamNotFound(id).into());
        }
        return Ok(id);
    }

    if let Some(selected) = store.selected_team() {
        return Ok(selected.id.clone());
    }

    if store.teams().is_empty() {
        let Some(name) = new_team else {
            bail!("No teams yet; pass --new-team <NAME> to create the first one");
        };
        let created = store.create_team(&name, Utc::now())?;
        println!("✅ Created team {} ({})", created.name, created.id);
        return Ok(created.id);
    }

    bail!("No team selected; pass --team <ID> or run `teaminv team select <ID>`")
}

/// Ingest snapshot files into one team. A bad file is reported and skipped.
fn import_agents(
    store: &mut TeamStore,
    config: &Config,
    paths: &[PathBuf],
    team: Option<String>,
    name: Option<&str>,
    new_team: Option<String>,
    quiet: bool,
) -> Result<bool> {
    let scanner = ingest::SnapshotScanner::new(ingest::ScanConfig::from(&config.import));
    let files = scanner.collect(paths)?;
    if files.is_empty() {
        bail!("No inventory exports found");
    }
    if name.is_some() && files.len() > 1 {
        warn!("--name applies to every file; later files replace earlier ones");
    }

    let team_id = resolve_import_team(store, team, new_team)?;
    info!("Importing {} file(s) into team {}", files.len(), team_id);

    let progress = if files.len() > 1 && !quiet {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let result = store.import_snapshots(&team_id, &files, name, Utc::now(), |file, outcome| {
        if let FileOutcome::Imported { agent, replaced } = outcome {
            let verb = if *replaced { "Updated" } else { "Added" };
            match &progress {
                Some(pb) => pb.println(format!("   {} {}", verb, agent)),
                None => println!("✅ {} agent {}", verb, agent),
            }
        }
        if let Some(pb) = &progress {
            pb.set_message(file.display().to_string());
            pb.inc(1);
        }
    });

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let summary = result?;

    if !summary.skipped.is_empty() {
        eprintln!("⚠️  {} file(s) skipped:", summary.skipped.len());
        for file in &summary.skipped {
            eprintln!("     {}", file.display());
        }
    }
    if files.len() > 1 {
        println!("📥 Imported {} of {} file(s)", summary.imported, files.len());
    }

    Ok(true)
}

/// Resolve which agents a view covers and how to describe it.
fn scoped_agents(store: &TeamStore, scope: &ScopeArgs) -> Result<(String, Vec<AgentInventory>)> {
    if scope.all {
        return Ok((
            "All teams".to_string(),
            analysis::agents_for_display(store.teams(), None),
        ));
    }

    let team = match scope.team.as_deref() {
        Some(id) => Some(
            store
                .team(id)
                .ok_or_else(|| store::StoreError::TeamNotFound(id.to_string()))?,
        ),
        None => store.selected_team(),
    };

    Ok(match team {
        Some(team) => (
            format!("Team {}", team.name),
            analysis::agents_for_display(store.teams(), Some(&team.id)),
        ),
        None => (
            "All teams".to_string(),
            analysis::agents_for_display(store.teams(), None),
        ),
    })
}

fn handle_report(
    store: &TeamStore,
    scope: &ScopeArgs,
    format: OutputFormat,
    output: Option<PathBuf>,
    center: Option<LatLng>,
) -> Result<()> {
    let (label, agents) = scoped_agents(store, scope)?;
    let report = report::InventoryReport::new(label, &agents, center);

    let rendered = match format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    match output {
        Some(path) => {
            std::fs::write(&path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("\n📊 Inventory Summary ({}):", report.scope);
            println!("   Agents: {}", agents.len());
            println!(
                "   Equipment: {} | Keys: {} | Other: {}",
                report.summary.equipment_total(),
                report.summary.keys_total(),
                report.summary.other_total()
            );
            println!("\n✅ Report saved to: {}", path.display());
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

fn handle_keys(store: &TeamStore, scope: &ScopeArgs, query: &KeyQuery) -> Result<()> {
    let (label, agents) = scoped_agents(store, scope)?;
    let keys = analysis::aggregate_keys(&agents);
    let rows = key_rows(&keys, query);

    if query.sort == KeySort::Distance && query.center.is_none() {
        warn!("--sort distance needs --center; sorting by title");
    }

    println!(
        "🔑 {}: {} key(s) at {} portal(s)",
        label,
        rows.iter().fold(0u64, |sum, r| sum.saturating_add(r.total)),
        rows.len()
    );
    for row in &rows {
        let distance = row.distance_label();
        if distance.is_empty() {
            println!("{:>5}  {}", row.total, row.title);
        } else {
            println!("{:>5}  {:>8}  {}", row.total, distance, row.title);
        }
        println!("       {}", report::format_breakdown(row.agents));
    }

    Ok(())
}

fn handle_export(store: &TeamStore, output: Option<PathBuf>) -> Result<()> {
    if store.teams().is_empty() {
        bail!("No teams to export");
    }

    let path = output.unwrap_or_else(|| PathBuf::from(store::export_file_name(Utc::now())));
    store::write_export(&path, store.teams())?;

    let summary = sync::ImportSummary::of(store.teams());
    println!(
        "✅ Exported {} team(s) with {} agent(s) to {}",
        summary.teams,
        summary.agents,
        path.display()
    );
    Ok(())
}

/// Reconcile an incoming team list with the store.
fn apply_incoming(
    store: &mut TeamStore,
    incoming: Vec<Team>,
    policy: Option<MergePolicy>,
) -> Result<()> {
    let how = match policy {
        _ if store.teams().is_empty() => "Imported",
        Some(MergePolicy::Replace) => "Replaced stored teams with",
        Some(MergePolicy::Union) => "Merged",
        None => "Imported",
    };
    let summary = store.apply_import(incoming, policy)?;

    println!(
        "✅ {} {} team(s) with {} agent(s); {} team(s) stored",
        how,
        summary.teams,
        summary.agents,
        store.teams().len()
    );
    Ok(())
}

fn handle_sheets(store: &mut TeamStore, config: &Config, cmd: SheetsCommand) -> Result<bool> {
    match config.sheets_credentials() {
        Some((client_id, spreadsheet_id)) => {
            debug!("Sheets client {} on spreadsheet {}", client_id, spreadsheet_id)
        }
        None => warn!("[sheets] client_id and spreadsheet_id are not configured"),
    }

    match cmd {
        SheetsCommand::Push { output } => {
            if store.teams().is_empty() {
                bail!("No teams to push");
            }
            let body = sync::sheets::encode_push(&config.sheets.tab, store.teams(), Utc::now())?;
            let json = serde_json::to_string_pretty(&body)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!(
                        "✅ Update body for {} written to {}",
                        sync::sheets::payload_range(&config.sheets.tab),
                        path.display()
                    );
                }
                None => println!("{}", json),
            }
            Ok(false)
        }
        SheetsCommand::Pull { file, policy } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let response = sync::sheets::parse_response(&text)?;
            let incoming = sync::sheets::decode_pull(&response)?;
            apply_incoming(store, incoming, policy)?;
            Ok(true)
        }
    }
}

/// Map view state replayed by the markers command.
struct MarkerView<'a> {
    visible: &'a Path,
    removed: Option<&'a Path>,
    selected: Option<&'a str>,
    mode: Option<MapDisplayMode>,
}

fn handle_markers(
    store: &TeamStore,
    config: &Config,
    scope: &ScopeArgs,
    view: &MarkerView<'_>,
) -> Result<()> {
    let (_, agents) = scoped_agents(store, scope)?;

    let registry: Box<dyn MarkerRegistry> = if config.layer.claimed_portals.is_empty() {
        Box::new(NoClaims)
    } else {
        Box::new(ClaimedPortals::new(config.layer.claimed_portals.iter().cloned()))
    };

    let mut key_layer = KeyLayer::new(store.map_display_mode(config.display.map_display_mode));
    key_layer.set_keys(analysis::aggregate_keys(&agents), registry.as_ref());
    if let Some(mode) = view.mode {
        key_layer.set_display_mode(mode, registry.as_ref());
    }
    for guid in read_guid_list(view.visible)? {
        key_layer.portal_added(&guid, registry.as_ref());
    }
    if let Some(path) = view.removed {
        for guid in read_guid_list(path)? {
            key_layer.portal_removed(&guid);
        }
    }
    if let Some(guid) = view.selected {
        if key_layer.marker(guid).is_some() {
            key_layer.portal_selected(None, Some(guid), registry.as_ref());
        } else {
            warn!("Selected portal {} has no key marker", guid);
        }
    }

    let markers: Vec<_> = key_layer.markers().collect();
    println!("{}", serde_json::to_string_pretty(&markers)?);
    Ok(())
}

/// Read portal guids from a JSON array or a plain list, one per line.
fn read_guid_list(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if text.trim_start().starts_with('[') {
        return serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse guid list {}", path.display()));
    }

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
