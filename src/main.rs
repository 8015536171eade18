use std::{
    process::ExitCode,
    sync::Arc,
};

use affinity::{
    persistence::JsonFileStore,
    AffinityError,
    AuthGrant,
    ClearScope,
    ClientConfig,
    HttpProfileBackend,
    LogSink,
    Outcome,
    ProfileStore,
    ProfileSyncEngine,
    Session,
};
use clap::{
    Parser,
    Subcommand,
};
use tracing::error;
use tracing_subscriber::{
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const SESSION_FILE: &str = "session.json";

/// Manage the interests that personalize your feed
#[derive(Parser)]
#[command(name = "affinity", version)]
struct Cli {
    /// Profile service base url, overrides config.json and AFFINITY_API_URL
    #[arg(long)]
    api_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current profile
    Show,

    /// Add an explicit interest
    Add {
        keyword: String,
        #[arg(long, default_value_t = 1.0)]
        weight: f64,
    },

    /// Remove an explicit interest
    Remove { keyword: String },

    /// Change the weight of an explicit interest
    SetWeight { keyword: String, weight: f64 },

    /// Hide an implicit interest
    Exclude { keyword: String },

    /// Bring back a hidden implicit interest
    Restore { keyword: String },

    /// Remove every explicit interest
    ClearExplicit {
        #[arg(long)]
        yes: bool,
    },

    /// Hide every implicit interest
    ClearImplicit {
        #[arg(long)]
        yes: bool,
    },

    /// Remember who is signed in
    Login {
        #[arg(long)]
        user: String,
        #[arg(long)]
        token: String,
    },

    /// Forget the signed in user
    Logout,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "affinity=debug" } else { "affinity=info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool, AffinityError> {
    let config = ClientConfig::load().with_env_overrides(cli.api_url);
    let session = Session::new(Arc::new(JsonFileStore::open_in_app_dir(SESSION_FILE)?));

    match &cli.command {
        Commands::Login { user, token } => {
            session.save_auth(&AuthGrant { access_token: token.clone(), user_id: user.trim().to_string() })?;
            println!("Signed in as {}", session.current_user_id());
            return Ok(true);
        }
        Commands::Logout => {
            session.clear()?;
            println!("Signed out");
            return Ok(true);
        }
        _ => {}
    }

    let backend = HttpProfileBackend::new(&config)?.with_session(session.clone());
    let engine = ProfileSyncEngine::new(Arc::new(backend), Arc::new(LogSink))
        .with_top_n(config.implicit_top_n);

    if engine.load_profile(&session.current_user_id()).await != Outcome::Applied {
        return Ok(false);
    }

    let outcome = match cli.command {
        Commands::Show => {
            print_profile(&engine.user_id(), &engine.snapshot());
            return Ok(true);
        }
        Commands::Add { keyword, weight } => engine.add_explicit(&keyword, weight).await,
        Commands::Remove { keyword } => engine.remove_explicit(&keyword).await,
        Commands::SetWeight { keyword, weight } => {
            if !engine.stage_weight(&keyword, weight) {
                println!("\"{keyword}\" is not an explicit interest");
                return Ok(false);
            }
            engine.bulk_save_explicit().await
        }
        Commands::Exclude { keyword } => engine.remove_implicit(&keyword).await,
        Commands::Restore { keyword } => engine.undo_exclusion(&keyword).await,
        Commands::ClearExplicit { yes } | Commands::ClearImplicit { yes } if !yes => {
            println!("This cannot be undone in one step. Pass --yes to confirm.");
            return Ok(false);
        }
        Commands::ClearExplicit { .. } => {
            let confirmation = engine.confirm_clear(ClearScope::Explicit);
            engine.clear_all_explicit(&confirmation).await
        }
        Commands::ClearImplicit { .. } => {
            let confirmation = engine.confirm_clear(ClearScope::Implicit);
            engine.clear_all_implicit(&confirmation).await
        }
        Commands::Login { .. } | Commands::Logout => return Ok(true),
    };

    match outcome {
        Outcome::Applied => {
            print_profile(&engine.user_id(), &engine.snapshot());
            Ok(true)
        }
        Outcome::Skipped => {
            println!("Nothing to do");
            Ok(true)
        }
        Outcome::Failed | Outcome::Discarded => Ok(false),
    }
}

fn print_profile(user_id: &str, store: &ProfileStore) {
    println!("Profile: {user_id}");

    println!("\nExplicit interests:");
    if store.explicit().is_empty() {
        println!("  (none)");
    }
    for entry in store.explicit() {
        println!("  {:<32} {:.1}", entry.keyword, entry.weight);
    }

    println!("\nTop implicit interests:");
    if store.top_implicit().is_empty() {
        println!("  (none)");
    }
    for entry in store.top_implicit() {
        println!("  {:<32} {:.1}", entry.keyword, entry.weight);
    }
    if store.implicit().len() > store.top_implicit().len() {
        println!("  ... {} more", store.implicit().len() - store.top_implicit().len());
    }

    if !store.exclusions().is_empty() {
        println!("\nHidden:");
        for keyword in store.exclusions() {
            println!("  {keyword}");
        }
    }
}
