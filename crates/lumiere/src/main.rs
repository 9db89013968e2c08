//! lumiere - Browse movies, write and vote on alternate endings

mod cli;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use lumiere_core::draft::{clear_draft, load_draft, Draft, RestoredDraft};
use lumiere_core::feed::{
    assemble_climaxes, available_languages, climax_counts, filter_by_language,
    load_movie_climaxes, load_my_climaxes, sort_climaxes, FEATURED_MOVIE_LIMIT,
    RECENT_CLIMAX_LIMIT,
};
use lumiere_core::models::{
    extract_movie_id, ClimaxId, MovieId, MoviePage, NewClimax, SortOrder, UserId,
};
use lumiere_core::validation::{
    validate_credentials, validate_display_name, validate_submission, word_count,
};
use lumiere_core::vote::VoteState;
use lumiere_core::{
    auth, BaasClient, Config, DraftAutosave, EmptyQuery, FileStore, MetadataClient,
    MetadataSource, SearchDebouncer, Session, TimedCache, VoteOutcome, VoteReconciler,
};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "lumiere",
    version,
    about = "Browse movies, write and vote on alternate endings",
    long_about = "Browse movies from the metadata API, read the alternate endings other\n\
                  viewers wrote, vote on the best ones and write your own.\n\
                  \n\
                  Examples:\n\
                    lumiere                                  # Home feed (default)\n\
                    lumiere movies --query \"the matrix\"       # Search movies\n\
                    lumiere movies --page 2 --language fr    # Popular movies, French only\n\
                    lumiere movie 603-the-matrix --sort latest\n\
                    lumiere write --movie 603 --file ending.txt --publish\n\
                    lumiere vote 8c1f...                     # Upvote an ending\n\
                  \n\
                  Environment Variables:\n\
                    LUMIERE_TMDB_API_KEY                     # Metadata API key\n\
                    LUMIERE_TMDB_BASE_URL                    # Metadata API base URL\n\
                    LUMIERE_BAAS_URL                         # BaaS project URL\n\
                    LUMIERE_BAAS_ANON_KEY                    # BaaS anon key\n\
                    LUMIERE_CACHE_DIR                        # Cache/state directory\n\
                    LUMIERE_NO_COLOR                         # Disable ANSI colors\n\
                    RUST_LOG                                 # Log filter (default lumiere=info)"
)]
struct Cli {
    #[command(subcommand)]
    mode: Option<Mode>,

    /// Config file (default: <config_dir>/lumiere/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for cached responses, the draft and the session
    #[arg(long, global = true, env = "LUMIERE_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Metadata API key
    #[arg(long, global = true, env = "LUMIERE_TMDB_API_KEY", hide_env_values = true)]
    tmdb_api_key: Option<String>,

    /// BaaS project URL
    #[arg(long, global = true, env = "LUMIERE_BAAS_URL")]
    baas_url: Option<String>,

    /// BaaS anon key
    #[arg(long, global = true, env = "LUMIERE_BAAS_ANON_KEY", hide_env_values = true)]
    baas_anon_key: Option<String>,

    /// Output lists as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Disable ANSI colors (log-friendly)
    #[arg(long, global = true, env = "LUMIERE_NO_COLOR")]
    no_color: bool,
}

#[derive(Subcommand)]
enum Mode {
    /// Featured movies, climax counts and the latest endings (default)
    Home,
    /// Browse popular movies or search by title
    Movies {
        /// Title search; omit to browse popular movies
        #[arg(long, short = 'q')]
        query: Option<String>,
        #[arg(long, short = 'p', default_value = "1")]
        page: u32,
        /// Keep only movies whose original language is this code (e.g. fr)
        #[arg(long, short = 'l')]
        language: Option<String>,
    },
    /// Show a movie and its alternate endings
    Movie {
        /// Movie slug, e.g. 603-the-matrix
        slug: String,
        /// votes | latest
        #[arg(long, default_value = "votes")]
        sort: SortOrder,
    },
    /// Edit the draft and optionally publish it
    Write {
        /// Movie id (overrides the draft's movie)
        #[arg(long, short = 'm')]
        movie: Option<u64>,
        /// Read the ending from a file
        #[arg(long, short = 'f', conflicts_with = "content")]
        file: Option<PathBuf>,
        /// Ending text
        #[arg(long, short = 'c')]
        content: Option<String>,
        /// Publish once valid, then clear the draft
        #[arg(long)]
        publish: bool,
    },
    /// Inspect or discard the saved draft
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },
    /// Upvote an ending
    Vote { climax_id: String },
    /// Retract your vote on an ending
    Unvote { climax_id: String },
    /// Your endings with their vote counts
    Mine,
    /// Delete one of your endings
    Delete { climax_id: String },
    /// Sign in with email and password
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        display_name: String,
    },
    /// Forget the stored session
    Signout,
    /// Show or change your profile
    Profile {
        /// New display name
        #[arg(long)]
        display_name: Option<String>,
    },
    /// Clear cached API responses and exit
    ClearCache,
}

#[derive(Subcommand)]
enum DraftAction {
    /// Print the saved draft
    Show,
    /// Discard the saved draft
    Clear,
}

/// Resolved configuration and local stores shared by every command
struct App {
    config: Config,
    state: Arc<FileStore>,
    cache: TimedCache<FileStore>,
    json: bool,
    no_color: bool,
}

impl App {
    fn metadata(&self) -> Result<MetadataClient> {
        Ok(MetadataClient::from_config(&self.config)?)
    }

    fn baas(&self) -> Result<BaasClient> {
        Ok(BaasClient::from_config(&self.config)?)
    }

    fn session(&self) -> Option<Session> {
        Session::load(self.state.as_ref(), Utc::now())
    }

    fn require_session(&self) -> Result<Session> {
        let session = self.session();
        Ok(auth::require(session.as_ref())?.clone())
    }

    /// Popular movies, served from the 24h cache when fresh
    async fn popular_page(&self, metadata: &MetadataClient, page: u32) -> Result<MoviePage> {
        let key = format!("popular_movies_{}", page);
        if let Some(hit) = self.cache.get::<MoviePage>(&key) {
            return Ok(hit);
        }

        let fresh = metadata.popular_movies(page).await?;
        if let Err(e) = self.cache.set(&key, &fresh) {
            warn!(key = %key, error = %e, "Failed to cache popular movies");
        }
        Ok(fresh)
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lumiere=info")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.no_color),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?.with_env(env_lookup),
        None => Config::load()?,
    };
    if let Some(key) = cli.tmdb_api_key {
        config.tmdb_api_key = Some(key);
    }
    if let Some(url) = cli.baas_url {
        config.baas_url = Some(url);
    }
    if let Some(key) = cli.baas_anon_key {
        config.baas_anon_key = Some(key);
    }
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = Some(dir);
    }

    let root = match &config.cache_dir {
        Some(dir) => dir.clone(),
        None => FileStore::default_dir()?,
    };
    debug!(path = %root.display(), "Using state directory");

    // Cached responses get their own subdirectory; clear-cache leaves the draft and session alone
    let app = App {
        state: Arc::new(FileStore::open(&root)?),
        cache: TimedCache::new(FileStore::open(root.join("cache"))?),
        config,
        json: cli.json,
        no_color: cli.no_color,
    };

    match cli.mode.unwrap_or(Mode::Home) {
        Mode::Home => run_home(&app).await?,
        Mode::Movies {
            query,
            page,
            language,
        } => run_movies(&app, query, page, language).await?,
        Mode::Movie { slug, sort } => run_movie(&app, slug, sort).await?,
        Mode::Write {
            movie,
            file,
            content,
            publish,
        } => run_write(&app, movie.map(MovieId), file, content, publish).await?,
        Mode::Draft { action } => run_draft(&app, action).await?,
        Mode::Vote { climax_id } => run_vote(&app, ClimaxId::new(climax_id), true).await?,
        Mode::Unvote { climax_id } => run_vote(&app, ClimaxId::new(climax_id), false).await?,
        Mode::Mine => run_mine(&app).await?,
        Mode::Delete { climax_id } => run_delete(&app, ClimaxId::new(climax_id)).await?,
        Mode::Signin { email, password } => run_signin(&app, email, password).await?,
        Mode::Signup {
            email,
            password,
            display_name,
        } => run_signup(&app, email, password, display_name).await?,
        Mode::Signout => run_signout(&app)?,
        Mode::Profile { display_name } => run_profile(&app, display_name).await?,
        Mode::ClearCache => run_clear_cache(&app)?,
    }

    Ok(())
}

async fn run_home(app: &App) -> Result<()> {
    let metadata = app.metadata()?;
    let baas = app.baas()?;

    let (popular, slugs, recent) = tokio::join!(
        app.popular_page(&metadata, 1),
        baas.climax_slugs(),
        baas.recent_climaxes(RECENT_CLIMAX_LIMIT)
    );

    // Each section degrades on its own
    let featured: Vec<_> = match popular {
        Ok(page) => page.results.into_iter().take(FEATURED_MOVIE_LIMIT).collect(),
        Err(e) => {
            warn!(error = %e, "Featured movies unavailable");
            Vec::new()
        }
    };
    let counts = match slugs {
        Ok(slugs) => climax_counts(&slugs),
        Err(e) => {
            warn!(error = %e, "Climax counts unavailable");
            Default::default()
        }
    };
    let recent = match recent {
        Ok(recent) => recent,
        Err(e) => {
            warn!(error = %e, "Recent climaxes unavailable");
            Vec::new()
        }
    };

    let authors: Vec<UserId> = recent
        .iter()
        .map(|c| c.author_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let ids: Vec<ClimaxId> = recent.iter().map(|c| c.id.clone()).collect();
    let (profiles, votes) = tokio::join!(baas.profiles_for(&authors), baas.votes_for(&ids));
    let recent = assemble_climaxes(
        recent,
        &votes.unwrap_or_default(),
        &profiles.unwrap_or_default(),
        &[],
    );

    if app.json {
        let output = serde_json::json!({
            "featured": featured,
            "climax_counts": counts,
            "recent": recent,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Featured movies");
    println!(
        "{}",
        cli::format_movie_table(&featured, Some(&counts), false, app.no_color)
    );
    println!();
    println!("Latest endings");
    println!("{}", cli::format_climax_table(&recent, false, app.no_color));
    Ok(())
}

async fn run_movies(
    app: &App,
    query: Option<String>,
    page: u32,
    language: Option<String>,
) -> Result<()> {
    let metadata = app.metadata()?;
    let page = page.max(1);

    let results = match query.filter(|q| !q.trim().is_empty()) {
        Some(query) => {
            let mut search = SearchDebouncer::new(Arc::new(metadata), EmptyQuery::Clear);
            search.input(query);
            search.settle().await.context("Search input closed")?;
            search.set_page(page).await?;

            let view = search.view();
            if let Some(error) = view.error {
                bail!(error);
            }
            view.results.unwrap_or_else(MoviePage::empty)
        }
        None => app.popular_page(&metadata, page).await?,
    };

    let languages = available_languages(&results.results);
    let movies = filter_by_language(&results.results, language.as_deref().unwrap_or(""));

    println!(
        "{}",
        cli::format_movie_table(&movies, None, app.json, app.no_color)
    );
    if !app.json {
        println!("{}", cli::format_page_footer(&results, &languages));
    }
    Ok(())
}

async fn run_movie(app: &App, slug: String, sort: SortOrder) -> Result<()> {
    let id = extract_movie_id(&slug);
    if id.get() == 0 {
        bail!("Invalid movie slug '{}' (expected e.g. 603-the-matrix)", slug);
    }

    let metadata = app.metadata()?;
    let Some(movie) = metadata.movie_by_id(id).await? else {
        bail!("Movie not found: {}", slug);
    };

    let baas = app.baas()?;
    let session = app.session();
    let mut climaxes = load_movie_climaxes(&baas, &movie.slug(), session.as_ref()).await?;
    sort_climaxes(&mut climaxes, sort);

    if app.json {
        let output = serde_json::json!({ "movie": movie, "climaxes": climaxes });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", cli::format_movie_info(&movie, climaxes.len()));
    println!();
    println!(
        "{}",
        cli::format_climax_table(&climaxes, false, app.no_color)
    );
    Ok(())
}

async fn run_write(
    app: &App,
    movie: Option<MovieId>,
    file: Option<PathBuf>,
    content: Option<String>,
    publish: bool,
) -> Result<()> {
    let metadata = app.metadata()?;
    let autosave = DraftAutosave::new(Arc::clone(&app.state));
    let mut restored = autosave.restore(movie, &metadata).await;

    let new_content = match (file, content) {
        (Some(path), _) => Some(
            std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        (None, content) => content,
    };
    let edited = new_content.is_some() || movie.is_some();
    if let Some(text) = new_content {
        restored.content = text;
    }

    let draft = Draft::new(
        restored.content.clone(),
        restored.movie.as_ref().map(|m| m.id),
    );
    // Blank drafts are never written, so there is no save to wait for
    if edited && !draft.is_blank() {
        let mut saves = autosave.saves();
        autosave.update(draft);
        saves
            .changed()
            .await
            .context("Draft autosave stopped before saving")?;
        if let Some(error) = saves.borrow().last_error.clone() {
            bail!("Failed to save draft: {}", error);
        };
    }

    println!("{}", cli::format_draft(&restored, autosave.last_saved()));

    if !publish {
        return Ok(());
    }

    let session = app.require_session()?;
    validate_submission(restored.movie.as_ref(), &restored.content)?;
    let Some(movie) = restored.movie else {
        bail!("Please select a movie");
    };

    let baas = app.baas()?;
    let created = baas
        .insert_climax(
            &session,
            &NewClimax::new(&movie, &restored.content, session.user_id.clone()),
        )
        .await?;
    autosave.clear()?;

    println!();
    println!(
        "Published {} ({} words) on {}",
        created.id,
        word_count(&created.content),
        created.movie_slug
    );
    Ok(())
}

async fn run_draft(app: &App, action: DraftAction) -> Result<()> {
    match action {
        DraftAction::Show => {
            let Some(draft) = load_draft(app.state.as_ref()) else {
                println!("No saved draft.");
                return Ok(());
            };
            if app.json {
                println!("{}", serde_json::to_string_pretty(&draft)?);
                return Ok(());
            }
            let movie = match app.metadata() {
                Ok(metadata) => {
                    DraftAutosave::new(Arc::clone(&app.state))
                        .restore(None, &metadata)
                        .await
                        .movie
                }
                Err(e) => {
                    debug!(error = %e, "Metadata unavailable, showing draft without movie");
                    None
                }
            };
            let restored = RestoredDraft {
                content: draft.content,
                movie,
            };
            println!("{}", cli::format_draft(&restored, None));
        }
        DraftAction::Clear => {
            clear_draft(app.state.as_ref())?;
            println!("Draft cleared.");
        }
    }
    Ok(())
}

async fn run_vote(app: &App, climax_id: ClimaxId, upvote: bool) -> Result<()> {
    let session = app.require_session()?;
    let baas = app.baas()?;

    let ids = std::slice::from_ref(&climax_id);
    let (votes, mine) = tokio::join!(baas.votes_for(ids), baas.user_votes(&session, ids));
    let card = VoteReconciler::new(climax_id.clone(), votes?.len() as u64, !mine?.is_empty());

    let current = card.snapshot();
    if (current.state == VoteState::Voted) == upvote {
        println!(
            "{} {} ({} votes)",
            if upvote { "Already voted on" } else { "No vote to retract on" },
            climax_id,
            current.count
        );
        return Ok(());
    }

    match card.toggle(Some(&session), &baas).await? {
        VoteOutcome::Voted { count } => println!("Voted on {} ({} votes)", climax_id, count),
        VoteOutcome::Retracted { count } => {
            println!("Retracted vote on {} ({} votes)", climax_id, count)
        }
        VoteOutcome::Ignored(reason) => println!("Vote ignored: {:?}", reason),
    }
    Ok(())
}

async fn run_mine(app: &App) -> Result<()> {
    let session = app.require_session()?;
    let baas = app.baas()?;
    let climaxes = load_my_climaxes(&baas, &session).await?;
    println!(
        "{}",
        cli::format_climax_table(&climaxes, app.json, app.no_color)
    );
    Ok(())
}

async fn run_delete(app: &App, climax_id: ClimaxId) -> Result<()> {
    let session = app.require_session()?;
    let baas = app.baas()?;
    baas.delete_climax(&session, &climax_id).await?;
    println!("Deleted {}", climax_id);
    Ok(())
}

async fn run_signin(app: &App, email: String, password: String) -> Result<()> {
    validate_credentials(&email, &password, None)?;
    let baas = app.baas()?;
    let session = baas.sign_in(&email, &password).await?;
    session.save(app.state.as_ref())?;
    println!("Signed in as {}", session.email);
    Ok(())
}

async fn run_signup(
    app: &App,
    email: String,
    password: String,
    display_name: String,
) -> Result<()> {
    validate_credentials(&email, &password, Some(&display_name))?;
    let baas = app.baas()?;
    let session = baas.sign_up(&email, &password, &display_name).await?;
    session.save(app.state.as_ref())?;
    println!("Welcome, {}! You are signed in.", display_name);
    Ok(())
}

fn run_signout(app: &App) -> Result<()> {
    Session::forget(app.state.as_ref())?;
    println!("Signed out.");
    Ok(())
}

async fn run_profile(app: &App, display_name: Option<String>) -> Result<()> {
    let session = app.require_session()?;
    let baas = app.baas()?;

    if let Some(name) = display_name {
        validate_display_name(&name)?;
        baas.update_display_name(&session, &name).await?;
        println!("Display name updated to {}", name);
        return Ok(());
    }

    let profile = baas.profile(&session.user_id).await?;
    println!("Email:        {}", session.email);
    println!(
        "Display name: {}",
        profile
            .map(|p| p.display_name)
            .unwrap_or_else(|| "-".to_string())
    );
    Ok(())
}

fn run_clear_cache(app: &App) -> Result<()> {
    app.cache.clear().context("Failed to clear cache")?;
    println!("Cache cleared.");
    Ok(())
}
