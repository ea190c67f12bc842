use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use omni::app::AppContext;
use omni::cli::{commands, CategoryAction, Cli, Commands};
use omni::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Sources => commands::list_sources(&ctx)?,
        Commands::Enable { source } => commands::set_source_enabled(&ctx, &source, true)?,
        Commands::Disable { source } => commands::set_source_enabled(&ctx, &source, false)?,
        Commands::Search {
            query,
            lang,
            source,
            page,
        } => {
            commands::search(&ctx, &query, lang.as_deref(), source.as_deref(), page).await?;
        }
        Commands::Popular { source, page } => commands::popular(&ctx, &source, page).await?,
        Commands::Latest { source, page } => commands::latest(&ctx, &source, page).await?,
        Commands::Add {
            source,
            remote_id,
            categories,
        } => {
            commands::add(&ctx, &source, &remote_id, categories).await?;
        }
        Commands::Refresh { title } => commands::refresh(&ctx, &title).await?,
        Commands::Update { category } => commands::update(&ctx, category).await?,
        Commands::Remove { title } => commands::remove(&ctx, &title)?,
        Commands::Purge { title } => commands::purge(&ctx, &title)?,
        Commands::Library {
            sort,
            category,
            search,
        } => {
            commands::list_library(&ctx, sort, category.as_deref(), search.as_deref())?;
        }
        Commands::Chapters { title } => commands::list_chapters(&ctx, &title)?,
        Commands::Read { chapters } => commands::mark(&ctx, &chapters, true)?,
        Commands::Unread { chapters } => commands::mark(&ctx, &chapters, false)?,
        Commands::Progress { chapter, page } => commands::progress(&ctx, &chapter, page)?,
        Commands::Bookmark { chapter } => commands::bookmark(&ctx, &chapter)?,
        Commands::Favorite { title } => commands::favorite(&ctx, &title)?,
        Commands::Pages { chapter } => commands::pages(&ctx, &chapter).await?,
        Commands::History { limit, clear } => commands::history(&ctx, limit, clear)?,
        Commands::Category { action } => match action {
            CategoryAction::List => commands::list_categories(&ctx)?,
            CategoryAction::Add { name } => commands::add_category(&ctx, &name)?,
            CategoryAction::Remove { id } => commands::remove_category(&ctx, &id)?,
            CategoryAction::Reorder { ids } => commands::reorder_categories(&ctx, &ids)?,
        },
    }

    Ok(())
}
