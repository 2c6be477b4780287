use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use folio::admin::{AdminWorkflow, DeleteOutcome};
use folio::app::AppContext;
use folio::config;
use folio::content::RichDocument;
use folio::db::{NewProfile, PostStore, SqliteStore};
use folio::editor::SubmitError;
use folio::model::{PostType, Role};

#[derive(Debug, Parser)]
#[command(author, version, about = "Portfolio blog admin tools")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    /// Profile id to act as (must hold the admin role for `admin` commands)
    #[arg(long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print an example configuration file
    InitConfig,
    /// Mirror a profile from the auth service into the local store
    ProfileAdd {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
        #[arg(long, value_parser = parse_role, default_value = "user")]
        role: Role,
    },
    /// Post management
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Debug, Subcommand)]
enum AdminCommand {
    /// List posts, newest first
    List,
    /// Create a post from a YAML draft, or update one with --id
    Save {
        file: PathBuf,
        #[arg(long)]
        id: Option<String>,
    },
    /// Delete a post after confirmation
    Delete { id: String },
    /// Change a profile's role
    Role {
        profile_id: String,
        #[arg(value_parser = parse_role)]
        role: Role,
    },
}

/// Draft file accepted by `admin save`.
#[derive(Debug, Deserialize)]
struct DraftFile {
    title: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    media_url: Option<String>,
    #[serde(default, rename = "type")]
    post_type: PostType,
    body: String,
}

fn parse_role(s: &str) -> Result<Role, String> {
    Role::parse(s).ok_or_else(|| format!("unknown role '{}', expected user or admin", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    if let Command::InitConfig = args.command {
        print!("{}", config::example());
        return Ok(());
    }

    let cfg = config::load(Some(args.config.as_path()))
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    let mut ctx = AppContext::bootstrap(cfg).await?;

    match args.command {
        Command::InitConfig => Ok(()),
        Command::ProfileAdd {
            id,
            name,
            email,
            avatar_url,
            role,
        } => {
            let profile = ctx
                .store
                .upsert_profile(NewProfile {
                    id,
                    name,
                    avatar_url,
                    role,
                    email,
                })
                .await?;
            println!("profile {} saved as {}", profile.id, profile.role.as_str());
            Ok(())
        }
        Command::Admin(action) => {
            let profile_id = args
                .profile
                .as_deref()
                .ok_or_else(|| anyhow!("--profile is required for admin commands"))?;
            ctx.sign_in(profile_id).await?;
            let mut admin = ctx.admin()?;
            admin.refresh().await;
            let result = run_admin(&mut admin, action).await;
            print_notices(&mut admin);
            result
        }
    }
}

async fn run_admin(admin: &mut AdminWorkflow<SqliteStore>, action: AdminCommand) -> Result<()> {
    match action {
        AdminCommand::List => {
            for listing in admin.posts() {
                let post = &listing.post;
                let author = listing
                    .author
                    .as_ref()
                    .and_then(|a| a.name.as_deref())
                    .unwrap_or("-");
                println!(
                    "{}  {:<4}  {:<32}  {}  {}",
                    post.created_at.format("%Y-%m-%d %H:%M"),
                    post.post_type.as_str(),
                    post.slug,
                    author,
                    post.id
                );
            }
            Ok(())
        }
        AdminCommand::Save { file, id } => save_from_file(admin, &file, id.as_deref()).await,
        AdminCommand::Delete { id } => delete_with_confirmation(admin, &id).await,
        AdminCommand::Role { profile_id, role } => {
            if admin.change_role(&profile_id, role).await {
                Ok(())
            } else {
                bail!("role change failed")
            }
        }
    }
}

async fn save_from_file(
    admin: &mut AdminWorkflow<SqliteStore>,
    file: &Path,
    id: Option<&str>,
) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let draft: DraftFile = serde_yaml::from_str(&raw).context("invalid draft file")?;

    let existing = match id {
        Some(id) => Some(
            admin
                .store()
                .get_post(id)
                .await?
                .ok_or_else(|| anyhow!("post {} not found", id))?,
        ),
        None => None,
    };

    let mut editor = admin.open_editor(existing);
    editor.set_title(draft.title);
    if let Some(slug) = draft.slug {
        editor.set_slug(slug);
    }
    editor.set_media_url(draft.media_url.unwrap_or_default());
    editor.set_post_type(draft.post_type);
    editor.set_content(RichDocument::from_plain_text(&draft.body));

    match admin.submit(&mut editor).await {
        Ok(()) => {
            info!(slug = %editor.draft().slug, "draft saved");
            Ok(())
        }
        Err(SubmitError::Invalid(errors)) => {
            for (field, message) in errors.iter() {
                eprintln!("{}: {}", field.as_str(), message);
            }
            bail!("draft is invalid")
        }
        Err(err) => Err(err.into()),
    }
}

async fn delete_with_confirmation(admin: &mut AdminWorkflow<SqliteStore>, id: &str) -> Result<()> {
    let Some(listing) = admin.posts().iter().find(|l| l.post.id == id) else {
        bail!("post {} not found", id);
    };
    let slug = listing.post.slug.clone();

    if admin.request_delete(id).await != DeleteOutcome::Armed {
        bail!("delete was not armed");
    }
    println!("Delete \"{}\"? Type the slug again to confirm:", slug);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let answer = lines.next_line().await?.unwrap_or_default();
    if answer.trim() != slug {
        admin.cancel_delete();
        println!("cancelled");
        return Ok(());
    }

    match admin.request_delete(id).await {
        DeleteOutcome::Deleted => Ok(()),
        _ => bail!("delete failed"),
    }
}

fn print_notices(admin: &mut AdminWorkflow<SqliteStore>) {
    for notice in admin.notices().active() {
        println!("[{:?}] {}", notice.kind, notice.message);
    }
}
