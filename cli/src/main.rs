use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use recipe_core::{
    build_index, open_store, AppConfig, CorpusIndex, FeedbackStore, Query, Recommender, SelectionMode, Verdict,
};
use std::path::Path;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "recipes")]
#[command(about = "Inspect a recipe corpus and query ingredient-based recommendations", long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = "RECIPES_CONFIG")]
    config: Option<String>,
    /// Recipe corpus: .csv/.json/.jsonl file or a directory of them
    #[arg(long, global = true, env = "RECIPES_CORPUS")]
    corpus: Option<String>,
    /// Feedback store directory (sled)
    #[arg(long, global = true, env = "RECIPES_STORE")]
    store: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Top,
    Random,
}

impl From<ModeArg> for SelectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Top => SelectionMode::TopN,
            ModeArg::Random => SelectionMode::Random,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load and index the corpus, then print what was kept
    Inspect {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Recommend recipes for a comma-separated ingredient list
    Recommend {
        #[arg(long)]
        ingredients: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        cuisine: Option<String>,
        /// Number of recipes to return
        #[arg(short, long)]
        n: Option<usize>,
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Rate a recipe 1-5; a 1 hides it from future recommendations
    Rate {
        #[arg(long)]
        user: String,
        /// Recipe id or name
        #[arg(long)]
        recipe: String,
        #[arg(long)]
        rating: i64,
    },
    /// Forget every rating of a user
    Reset {
        #[arg(long)]
        user: String,
    },
    /// Recipes previously served to a user
    History {
        #[arg(long)]
        user: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if cli.corpus.is_some() {
        config.corpus = cli.corpus;
    }
    if cli.store.is_some() {
        config.store = cli.store;
    }

    match cli.command {
        Commands::Inspect { json } => inspect(&config, json),
        Commands::Recommend { ingredients, user, cuisine, n, mode, json } => {
            let query = Query {
                ingredients: recipe_core::tokenizer::parse_ingredient_list(&ingredients),
                user_id: user,
                cuisine,
                limit: n,
                mode: mode.map(Into::into),
            };
            recommend(&config, &query, json)
        }
        Commands::Rate { user, recipe, rating } => rate(&config, &user, &recipe, rating),
        Commands::Reset { user } => {
            let removed = persistent_store(&config)?.reset(&user)?;
            println!("removed {removed} rating(s) for {user}");
            Ok(())
        }
        Commands::History { user } => history(&config, &user),
    }
}

fn load_index(config: &AppConfig) -> Result<CorpusIndex> {
    let corpus = config.corpus.as_deref().context("no corpus given (--corpus, RECIPES_CORPUS or config file)")?;
    let index = build_index(corpus, &config.vectorizer)?;
    tracing::debug!(corpus, recipes = index.len(), "corpus ready");
    Ok(index)
}

fn persistent_store(config: &AppConfig) -> Result<Arc<dyn FeedbackStore>> {
    let Some(path) = config.store.as_deref() else {
        bail!("this command needs a feedback store (--store, RECIPES_STORE or config file)");
    };
    Ok(open_store(Some(Path::new(path)))?)
}

fn inspect(config: &AppConfig, json: bool) -> Result<()> {
    let stats = load_index(config)?.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    println!("recipes:    {}", stats.recipes);
    println!("dropped:    {}", stats.dropped);
    println!("vocabulary: {}", stats.vocabulary);
    for (cuisine, count) in &stats.cuisines {
        println!("  {cuisine}: {count}");
    }
    Ok(())
}

fn recommend(config: &AppConfig, query: &Query, json: bool) -> Result<()> {
    let index = Arc::new(load_index(config)?);
    let store = open_store(config.store.as_deref().map(Path::new))?;
    let recommender = Recommender::new(index, store, config.recommender.clone());
    let results = recommender.recommend(query)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("no matching recipes");
    }
    for rec in &results {
        println!("{:>2}. {} (score {:.3}, rating {:.1})", rec.rank, rec.recipe.name, rec.score, rec.recipe.rating);
        println!("    {}", rec.recipe.ingredients);
    }
    Ok(())
}

fn rate(config: &AppConfig, user: &str, recipe: &str, rating: i64) -> Result<()> {
    let verdict = Verdict::from_rating(rating)?;
    let index = load_index(config)?;
    let recipe_id = index
        .find(recipe)
        .map(|(_, r)| r.id.clone())
        .or_else(|| index.recipes().iter().find(|r| r.name == recipe).map(|r| r.id.clone()))
        .with_context(|| format!("unknown recipe: {recipe}"))?;
    persistent_store(config)?.set_verdict(user, &recipe_id, verdict)?;
    println!("{user}: {recipe_id} -> {verdict:?}");
    Ok(())
}

fn history(config: &AppConfig, user: &str) -> Result<()> {
    for entry in persistent_store(config)?.history(user)? {
        let when = OffsetDateTime::from_unix_timestamp(entry.recorded_at)?.format(&Rfc3339)?;
        println!("{when}  {}  [{}]", entry.recipe_id, entry.ingredients);
    }
    Ok(())
}
