mod tui;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use diarist_core::api::{DiaryApi, HttpDiaryApi};
use diarist_core::bootstrap::IndexPlan;
use diarist_core::capture::AudioBlob;
use diarist_core::collection::DiaryCollection;
use diarist_core::config::DiaristConfig;
use diarist_core::error::DiaristError;
use diarist_core::model::*;
use diarist_core::view::project;
use diarist_core::workflow::{CompleteOutcome, DiarySession, WorkflowState};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "diarist",
    about = "Diarist: talk about your day, get a diary entry",
    version
)]
enum Cli {
    /// Initialize Diarist in the current project
    Init {
        /// Origin of the diary backend
        #[arg(long, default_value = "http://localhost:5000")]
        url: String,
        /// User id sent with conversation and listing requests
        #[arg(long)]
        user: Option<String>,
    },
    /// Hold a diary conversation from recorded audio files, one file per turn
    Converse {
        /// Audio files to upload, in speaking order
        #[arg(required = true)]
        audio: Vec<PathBuf>,
        /// Writing style for the generated diary
        #[arg(long)]
        style: Option<String>,
        /// Theme for the generated diary
        #[arg(long)]
        theme: Option<String>,
        /// Regenerate the draft once with these extra instructions
        #[arg(long)]
        regenerate: Option<String>,
        /// Replace the generated title
        #[arg(long)]
        title: Option<String>,
        /// Entry date (YYYY-MM-DD) instead of the suggested one
        #[arg(long)]
        date: Option<String>,
        /// Show the draft and drop it instead of saving
        #[arg(long)]
        discard: bool,
        /// Output raw JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },
    /// List saved diaries, newest first
    List {
        /// Page number, starting at 1
        #[arg(short, long, default_value = "1")]
        page: usize,
        /// Output raw JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },
    /// Show the diaries of one month
    Calendar {
        /// Year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
        /// Month 1-12 (defaults to the current month)
        #[arg(short, long)]
        month: Option<u32>,
        /// Output raw JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },
    /// Search diaries by title and content
    Search {
        /// Search query
        query: String,
        /// Output raw JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },
    /// Show one diary
    Get {
        /// Diary ID
        id: String,
        /// Output raw JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },
    /// Edit a saved diary
    Update {
        /// Diary ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        /// positive, neutral or negative
        #[arg(long)]
        mood: Option<String>,
        /// Entry date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Output raw JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },
    /// Delete a saved diary
    Delete {
        /// Diary ID
        id: String,
        /// Required: deleted diaries cannot be recovered
        #[arg(long)]
        confirm: bool,
        /// Output raw JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },
    /// Transcribe an audio file without a conversation
    Transcribe {
        /// Audio file
        file: PathBuf,
        /// Output raw JSON instead of plain text
        #[arg(long)]
        json: bool,
    },
    /// Print the one-time database setup script for the backend store
    BootstrapDb {
        /// Database name
        #[arg(long, default_value = "ai_diary")]
        database: String,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Emit the plan as JSON instead of a mongosh script
        #[arg(long)]
        json: bool,
    },
    /// Launch the interactive terminal diary
    Tui,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log lines would tear through the TUI's alternate screen.
    let default_filter = if matches!(cli, Cli::Tui) {
        "off"
    } else {
        "diarist=info,diarist_core=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .compact()
        .init();

    let config = DiaristConfig::load(Some(&std::env::current_dir()?)).unwrap_or_else(|e| {
        tracing::warn!("{e}, falling back to defaults");
        DiaristConfig::default_config()
    });

    let result = run(cli, &config).await;
    if let Err(ref err) = result {
        let friendly = format_backend_error(err, &config);
        if friendly != format!("{}", err) {
            eprintln!("{}", friendly);
            std::process::exit(1);
        }
    }
    result
}

async fn run(cli: Cli, config: &DiaristConfig) -> Result<()> {
    match cli {
        Cli::Init { url, user } => cmd_init(&std::env::current_dir()?, &url, user.as_deref()),
        Cli::Converse {
            audio,
            style,
            theme,
            regenerate,
            title,
            date,
            discard,
            json,
        } => {
            let api = make_api(config)?;
            require_user(config)?;
            let mut preferences = config.preferences.to_preferences();
            if style.is_some() {
                preferences.style = style;
            }
            if theme.is_some() {
                preferences.theme = theme;
            }
            let opts = ConverseOptions {
                audio,
                fallback_mime: config.capture.mime.clone(),
                preferences,
                regenerate,
                title,
                date: date.as_deref().map(parse_date).transpose()?,
                discard,
            };
            cmd_converse(&api, DiarySession::from_config(config), opts, json).await
        }
        Cli::List { page, json } => {
            let api = make_api(config)?;
            let mut collection = make_collection(config)?;
            cmd_list(&api, &mut collection, page, json).await
        }
        Cli::Calendar { year, month, json } => {
            let api = make_api(config)?;
            let mut collection = make_collection(config)?;
            cmd_calendar(&api, &mut collection, year, month, json).await
        }
        Cli::Search { query, json } => {
            let api = make_api(config)?;
            let mut collection = make_collection(config)?;
            cmd_search(&api, &mut collection, &query, json).await
        }
        Cli::Get { id, json } => {
            let api = make_api(config)?;
            cmd_get(&api, &id, json).await
        }
        Cli::Update {
            id,
            title,
            content,
            mood,
            date,
            json,
        } => {
            let input = UpdateDiaryInput {
                title,
                content,
                mood: mood
                    .as_deref()
                    .map(|s| s.parse::<Mood>().map_err(anyhow::Error::msg))
                    .transpose()?,
                entry_date: date.as_deref().map(parse_date).transpose()?,
            };
            let api = make_api(config)?;
            let mut collection = DiaryCollection::new(config.resolve_user_id(), 1);
            cmd_update(&api, &mut collection, &id, &input, json).await
        }
        Cli::Delete { id, confirm, json } => {
            let api = make_api(config)?;
            let mut collection = DiaryCollection::new(config.resolve_user_id(), 1);
            cmd_delete(&api, &mut collection, &id, confirm, json).await
        }
        Cli::Transcribe { file, json } => {
            let api = make_api(config)?;
            cmd_transcribe(&api, &file, &config.capture.mime, json).await
        }
        Cli::BootstrapDb {
            database,
            output,
            json,
        } => cmd_bootstrap_db(&database, output.as_deref(), json),
        Cli::Tui => tui::run_tui(config).await,
    }
}

fn make_api(config: &DiaristConfig) -> Result<HttpDiaryApi> {
    HttpDiaryApi::new(&config.api).context("failed to create API client")
}

fn require_user(config: &DiaristConfig) -> Result<String> {
    config.resolve_user_id().context(
        "no user id configured: set api.user_id in .diarist/config.toml or export DIARIST_USER_ID",
    )
}

fn make_collection(config: &DiaristConfig) -> Result<DiaryCollection> {
    let user_id = require_user(config)?;
    Ok(DiaryCollection::new(Some(user_id), config.diary.page_size))
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}

/// Turn session and connection failures into actionable messages.
fn format_backend_error(err: &anyhow::Error, config: &DiaristConfig) -> String {
    let core = err.chain().find_map(|e| e.downcast_ref::<DiaristError>());
    match core {
        Some(DiaristError::SessionExpired { login_url }) => format!(
            "{}\n\n  Sign in again at {}\n  then update api.session_cookie in .diarist/config.local.toml.\n",
            "Error: session expired".red(),
            login_url.cyan()
        ),
        Some(DiaristError::Http(e)) if e.is_connect() || e.is_timeout() => format!(
            "{}\n\n  Cannot reach the diary backend at {}.\n  Check api.base_url in .diarist/config.toml.\n",
            "Error: backend unavailable".red(),
            config.api.base_url
        ),
        _ => format!("{}", err),
    }
}

fn colored_mood(mood: Option<Mood>) -> String {
    let label = format!(
        "{:<8}",
        mood.map(|m| m.to_string()).unwrap_or_else(|| "-".into())
    );
    match mood {
        Some(Mood::Positive) => label.green().to_string(),
        Some(Mood::Negative) => label.red().to_string(),
        _ => label.dimmed().to_string(),
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "undated".into())
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{n} {}", if n == 1 { one } else { many })
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn cmd_init(dir: &Path, url: &str, user: Option<&str>) -> Result<()> {
    let diarist_dir = dir.join(".diarist");

    if diarist_dir.exists() {
        println!("Diarist already initialized in this project.");
        return Ok(());
    }

    std::fs::create_dir_all(&diarist_dir)?;

    let note = "# Keep api.session_cookie in config.local.toml, it is gitignored\n";
    let toml_str = DiaristConfig::starter_toml(url, user)?;
    std::fs::write(diarist_dir.join("config.toml"), format!("{note}{toml_str}"))?;

    let gitignore_path = dir.join(".gitignore");
    let entry = ".diarist/config.local.toml";
    if gitignore_path.exists() {
        let contents = std::fs::read_to_string(&gitignore_path)?;
        if !contents.lines().any(|l| l.trim() == entry) {
            let mut appended = contents;
            if !appended.ends_with('\n') {
                appended.push('\n');
            }
            appended.push_str(entry);
            appended.push('\n');
            std::fs::write(&gitignore_path, appended)?;
        }
    } else {
        std::fs::write(&gitignore_path, format!("{entry}\n"))?;
    }

    println!("{}", "Initialized Diarist in .diarist/".green());
    println!("  {}   .diarist/config.toml", "Config:".dimmed());
    println!("  {}  {}", "Backend:".dimmed(), url.cyan());
    match user {
        Some(u) => println!("  {}     {}", "User:".dimmed(), u.cyan()),
        None => println!(
            "  {}     {}",
            "User:".dimmed(),
            "not set (api.user_id or DIARIST_USER_ID)".yellow()
        ),
    }
    println!();
    println!("{}", "Quick Start:".bold());
    println!("  1. Start talking:   {}", "diarist tui".cyan());
    println!("  2. Browse entries:  {}", "diarist list".cyan());
    Ok(())
}

// ---------------------------------------------------------------------------
// converse
// ---------------------------------------------------------------------------

struct ConverseOptions {
    audio: Vec<PathBuf>,
    fallback_mime: String,
    preferences: Preferences,
    regenerate: Option<String>,
    title: Option<String>,
    date: Option<NaiveDate>,
    discard: bool,
}

#[derive(Serialize)]
struct ConverseReport {
    state: WorkflowState,
    transcript: Vec<Message>,
    draft: Option<DiaryDraft>,
    diary_id: Option<String>,
}

fn print_message(message: &Message) {
    match message.role {
        Role::Ai => println!("  {}  {}", "AI ".magenta(), message.text),
        Role::User => println!("  {}  {}", "You".cyan(), message.text),
    }
}

fn print_draft(draft: &DiaryDraft) {
    println!();
    println!("{}", draft.title.bold());
    println!(
        "{} {}",
        draft.entry_date.format("%Y-%m-%d").to_string().cyan(),
        colored_mood(Some(draft.mood))
    );
    println!();
    println!("{}", draft.content);
    println!();
}

async fn cmd_converse<A: DiaryApi>(
    api: &A,
    mut session: DiarySession,
    opts: ConverseOptions,
    json: bool,
) -> Result<()> {
    session
        .start(api)
        .await
        .context("failed to start conversation")?;
    if !json {
        session.transcript().messages().iter().for_each(print_message);
    }
    session.set_preferences(opts.preferences)?;

    for path in &opts.audio {
        let blob = AudioBlob::from_path(path, &opts.fallback_mime)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let messages = session
            .submit_audio(api, &blob)
            .await
            .with_context(|| format!("failed to send {}", path.display()))?;
        if !json {
            messages.iter().for_each(print_message);
        }
    }

    let mut outcome = session
        .complete(api)
        .await
        .context("failed to generate diary")?;
    if let Some(extra) = opts.regenerate.as_deref() {
        if outcome == CompleteOutcome::Draft {
            outcome = session
                .regenerate(api, Some(extra))
                .await
                .context("failed to regenerate diary")?;
        }
    }

    let (draft, diary_id) = match outcome {
        CompleteOutcome::Saved(diary) => (None, Some(diary.id)),
        CompleteOutcome::Draft => {
            if let Some(title) = opts.title {
                session.set_title(title)?;
            }
            if let Some(date) = opts.date {
                session.set_entry_date(date)?;
            }
            let draft = session.draft().cloned();
            match draft {
                Some(ref d) if !json => print_draft(d),
                _ => {}
            }
            if opts.discard {
                session.discard(true)?;
                (draft, None)
            } else {
                let id = session.save(api).await.context("failed to save diary")?;
                (draft, Some(id))
            }
        }
    };

    if json {
        let view = project(&session);
        let report = ConverseReport {
            state: view.state,
            transcript: view.transcript,
            draft,
            diary_id,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match diary_id {
        Some(id) => println!("{} {}", "Saved:".green(), id.cyan()),
        None => println!("{}", "Draft discarded.".yellow()),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

async fn cmd_list<A: DiaryApi>(
    api: &A,
    collection: &mut DiaryCollection,
    page: usize,
    json: bool,
) -> Result<()> {
    let loaded = collection
        .load_page(api, page)
        .await
        .context("failed to load diaries")?
        .clone();

    if json {
        println!("{}", serde_json::to_string_pretty(&loaded)?);
        return Ok(());
    }

    if loaded.diaries.is_empty() {
        println!("No diaries found.");
        return Ok(());
    }

    for (date, rows) in collection.grouped() {
        let heading = date
            .map(|d| d.format("%A, %B %-d, %Y").to_string())
            .unwrap_or_else(|| "Undated".into());
        println!("{}", heading.bold());
        for row in &rows {
            println!("  {}  {}  {}", colored_mood(row.mood), row.title, row.id.dimmed());
            if !row.preview.is_empty() {
                println!("            {}", row.preview.dimmed());
            }
        }
        println!();
    }

    println!("{}", "─".repeat(78).dimmed());
    println!(
        "  page {} of {}, {}",
        loaded.page,
        loaded.pages.max(1),
        plural(loaded.total, "diary", "diaries")
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// calendar
// ---------------------------------------------------------------------------

async fn cmd_calendar<A: DiaryApi>(
    api: &A,
    collection: &mut DiaryCollection,
    year: Option<i32>,
    month: Option<u32>,
    json: bool,
) -> Result<()> {
    let (current_year, current_month) = collection.calendar_month();
    let loaded = collection
        .load_calendar(
            api,
            year.unwrap_or(current_year),
            month.unwrap_or(current_month),
        )
        .await
        .context("failed to load calendar")?;

    if json {
        println!("{}", serde_json::to_string_pretty(loaded)?);
        return Ok(());
    }

    let first = NaiveDate::from_ymd_opt(loaded.year, loaded.month, 1)
        .context("calendar month out of range")?;
    println!("{}", first.format("%B %Y").to_string().bold());

    if loaded.diaries_by_date.is_empty() {
        println!("  No diaries this month.");
        return Ok(());
    }

    for (date, rows) in &loaded.diaries_by_date {
        for row in rows {
            println!(
                "  {}  {}  {}",
                date.format("%a %d").to_string().cyan(),
                row.title,
                row.id.dimmed()
            );
        }
    }
    println!("{}", "─".repeat(78).dimmed());
    println!("  {}", plural(loaded.total(), "diary", "diaries"));
    Ok(())
}

// ---------------------------------------------------------------------------
// search
// ---------------------------------------------------------------------------

async fn cmd_search<A: DiaryApi>(
    api: &A,
    collection: &mut DiaryCollection,
    query: &str,
    json: bool,
) -> Result<()> {
    let rows = collection
        .search(api, query)
        .await
        .context("search failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }

    if query.trim().is_empty() {
        println!("Enter a search term.");
        return Ok(());
    }
    if rows.is_empty() {
        println!("No diaries match \"{}\".", query.trim());
        return Ok(());
    }

    for row in rows {
        println!(
            "  {}  {}  {}",
            format_date(row.entry_date).cyan(),
            row.title.bold(),
            row.id.dimmed()
        );
        if !row.preview.is_empty() {
            println!("              {}", row.preview.dimmed());
        }
    }
    println!("{}", "─".repeat(78).dimmed());
    println!("  {}", plural(rows.len(), "result", "results"));
    Ok(())
}

// ---------------------------------------------------------------------------
// get / update / delete
// ---------------------------------------------------------------------------

async fn cmd_get<A: DiaryApi>(api: &A, id: &str, json: bool) -> Result<()> {
    let entry = api.get_diary(id).await.context("diary not found")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
        return Ok(());
    }

    println!("{}", entry.title.bold());
    println!(
        "{} {}",
        format_date(entry.entry_date).cyan(),
        colored_mood(entry.mood)
    );
    println!();
    println!("{}", entry.content);
    println!();
    println!("{}", "--- Details ---".dimmed());
    println!("  {}       {}", "ID:".dimmed(), entry.id.cyan());
    if let Some(ref created) = entry.created_at {
        println!("  {}  {}", "Created:".dimmed(), created);
    }
    Ok(())
}

async fn cmd_update<A: DiaryApi>(
    api: &A,
    collection: &mut DiaryCollection,
    id: &str,
    input: &UpdateDiaryInput,
    json: bool,
) -> Result<()> {
    if input.is_empty() {
        anyhow::bail!("nothing to update: pass --title, --content, --mood or --date");
    }

    let entry = collection
        .update(api, id, input)
        .await
        .context("failed to update diary")?;

    if json {
        println!("{}", serde_json::to_string_pretty(entry)?);
    } else {
        println!(
            "{} {} ({})",
            "Updated:".green(),
            entry.title,
            entry.id.cyan()
        );
    }
    Ok(())
}

async fn cmd_delete<A: DiaryApi>(
    api: &A,
    collection: &mut DiaryCollection,
    id: &str,
    confirm: bool,
    json: bool,
) -> Result<()> {
    if !confirm {
        anyhow::bail!("delete requires --confirm: deleted diaries cannot be recovered");
    }

    collection
        .delete(api, id, true)
        .await
        .context("failed to delete diary")?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("{} {}", "Deleted:".red(), id.cyan());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// transcribe
// ---------------------------------------------------------------------------

async fn cmd_transcribe<A: DiaryApi>(
    api: &A,
    file: &Path,
    fallback_mime: &str,
    json: bool,
) -> Result<()> {
    let blob = AudioBlob::from_path(file, fallback_mime)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let text = api
        .transcribe(&blob)
        .await
        .context("transcription failed")?;

    if json {
        println!("{}", serde_json::json!({ "text": text }));
    } else {
        println!("{text}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// bootstrap-db
// ---------------------------------------------------------------------------

fn cmd_bootstrap_db(database: &str, output: Option<&Path>, json: bool) -> Result<()> {
    let plan = IndexPlan::default().with_database(database);
    let rendered = if json {
        plan.to_json()?
    } else {
        plan.render_mongosh()
    };

    match output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", rendered.trim_end()))
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("{} {}", "Wrote".green(), path.display());
        }
        None => println!("{}", rendered.trim_end()),
    }
    Ok(())
}
