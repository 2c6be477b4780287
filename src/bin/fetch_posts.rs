use anyhow::Result;
use clap::Parser;
use futures::future::join_all;
use std::path::PathBuf;

use folio::config;
use folio::graphql::Publication;
use folio::loader::{load_index, load_post_page};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Fetch posts from the configured publication. Lists the latest posts, or renders the given slugs."
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Post slug to render; may be repeated. Slugs are fetched concurrently.
    #[arg(long)]
    slug: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(args.config.as_path()))?;
    let publication = Publication::from_config(&cfg)?;

    if args.slug.is_empty() {
        let posts = load_index(&publication).await;
        if posts.is_empty() {
            println!("No posts yet.");
        }
        for post in posts {
            println!(
                "{:<40}  {:>3} min  {:>6} views  {}",
                post.slug,
                post.read_time_in_minutes.unwrap_or_default(),
                post.views.unwrap_or_default(),
                post.title
            );
        }
        return Ok(());
    }

    let pages = join_all(args.slug.iter().map(|slug| load_post_page(&publication, slug))).await;
    for (slug, page) in args.slug.iter().zip(pages) {
        println!("==> {}", slug);
        println!("{}", page);
        println!();
    }
    Ok(())
}
