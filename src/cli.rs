//! Admin command-line interface.
//!
//! Thin front end over the client core: every command goes through the
//! session manager and the typed endpoint sets; admin commands pass the
//! role gate first, substituting an interactive sign-in when the gate
//! falls back.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::api::{Api, ListQuery, RegisterPayload, Resource};
use crate::auth::{AuthManager, LoginOutcome, Role};
use crate::config::Config;
use crate::guard::{self, GateDecision};
use crate::http::HttpClient;

#[derive(Debug, Parser)]
#[command(name = "chorale", version, about = "Admin client for the Chorale choir site API")]
pub struct Cli {
    /// Path to a config file (defaults to the per-user config dir).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and persist the session
    Login {
        /// Username or email; prompted when omitted
        username: Option<String>,
    },
    /// Drop the persisted session
    Logout,
    /// Show the signed-in user after reconciling with the server
    Whoami,
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Manage schedule entries
    Schedule {
        #[command(subcommand)]
        action: CrudAction,
    },
    /// Manage commissions
    Commission {
        #[command(subcommand)]
        action: CrudAction,
    },
    /// Manage events
    Event {
        #[command(subcommand)]
        action: CrudAction,
    },
    /// Manage donations (creation is open to the public support flow)
    Donation {
        #[command(subcommand)]
        action: CrudAction,
    },
    /// Manage content entries
    Content {
        #[command(subcommand)]
        action: CrudAction,
    },
    /// Manage media assets
    Media {
        #[command(subcommand)]
        action: MediaAction,
    },
    /// Manage member profiles
    Member {
        #[command(subcommand)]
        action: MemberAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum CrudAction {
    /// List records
    List {
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        page: Option<u32>,
        /// Sort key, e.g. -createdAt for newest-first
        #[arg(long)]
        sort: Option<String>,
        /// Free-text filter
        #[arg(long)]
        search: Option<String>,
    },
    /// Fetch one record by id
    Get { id: String },
    /// Create a record from a JSON payload
    Create { json: String },
    /// Update a record from a JSON payload
    Update { id: String, json: String },
    /// Delete a record
    Remove { id: String },
}

#[derive(Debug, Subcommand)]
pub enum MediaAction {
    #[command(flatten)]
    Crud(CrudAction),
    /// Upload a file as a new media asset
    Upload {
        file: PathBuf,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum MemberAction {
    /// Add a member profile with a portrait image
    Add {
        image: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long)]
        role: Option<String>,
    },
    /// List all member profiles
    List,
    /// Fetch one member by id
    Get { id: String },
    /// Fetch one member by display name
    GetByName { name: String },
    /// Update a member from a JSON payload
    Update { id: String, json: String },
    /// Remove a member
    Remove { id: String },
}

/// Wire up the core and dispatch one command.
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let store = Arc::new(config.session_store());
    let http = Arc::new(HttpClient::new(&config.api_base_url, store.clone())?);
    let api = Api::new(http);
    let manager = AuthManager::new(api.clone(), store);

    match cli.command {
        Command::Login { username } => {
            manager.init().await;
            sign_in(&manager, username).await
        }
        Command::Logout => {
            manager.logout();
            println!("Signed out.");
            Ok(())
        }
        Command::Whoami => {
            manager.init().await;
            match manager.current_user() {
                Some(user) => println!("{} <{}> ({})", user.name, user.id, user.role),
                None => println!("Not signed in."),
            }
            Ok(())
        }
        Command::Register { name, email } => {
            manager.init().await;
            let password = dialoguer::Password::new()
                .with_prompt("Password")
                .with_confirmation("Confirm password", "Passwords do not match")
                .interact()?;
            match manager
                .register(&RegisterPayload {
                    name,
                    email,
                    password,
                })
                .await
            {
                LoginOutcome::Success { user } => {
                    println!("Registered and signed in as {} ({})", user.name, user.role);
                    Ok(())
                }
                LoginOutcome::Failure { error } => bail!(error),
            }
        }
        Command::Schedule { action } => {
            ensure_admin(&manager).await?;
            run_crud(api.schedule(), action).await
        }
        Command::Commission { action } => {
            ensure_admin(&manager).await?;
            run_crud(api.commission(), action).await
        }
        Command::Event { action } => {
            ensure_admin(&manager).await?;
            run_crud(api.event(), action).await
        }
        Command::Donation { action } => {
            // Donation creation mirrors the public support page and is the
            // one write the backend accepts without auth.
            if !matches!(action, CrudAction::Create { .. }) {
                ensure_admin(&manager).await?;
            }
            run_crud(api.donation(), action).await
        }
        Command::Content { action } => {
            ensure_admin(&manager).await?;
            run_crud(api.content(), action).await
        }
        Command::Media { action } => {
            ensure_admin(&manager).await?;
            match action {
                MediaAction::Crud(action) => {
                    run_crud_media(&api, action).await
                }
                MediaAction::Upload {
                    file,
                    title,
                    description,
                } => upload_media(&api, file, title, description).await,
            }
        }
        Command::Member { action } => {
            ensure_admin(&manager).await?;
            run_member(&api, action).await
        }
    }
}

/// Pass the admin gate, substituting an interactive sign-in when the gate
/// falls back (the CLI analog of swapping in a login surface).
async fn ensure_admin(manager: &AuthManager) -> Result<()> {
    manager.init().await;
    match guard::evaluate(&manager.snapshot(), Role::Admin) {
        GateDecision::Allow => Ok(()),
        GateDecision::Fallback => {
            println!("Admin sign-in required.");
            sign_in(manager, None).await?;
            if manager.is_admin() {
                Ok(())
            } else {
                bail!("signed in, but the account lacks the admin role");
            }
        }
        GateDecision::Loading => bail!("session state is still initializing"),
    }
}

async fn sign_in(manager: &AuthManager, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None => dialoguer::Input::new()
            .with_prompt("Username or email")
            .interact_text()?,
    };
    let password = dialoguer::Password::new().with_prompt("Password").interact()?;
    match manager.login(&username, &password).await {
        LoginOutcome::Success { user } => {
            println!("Signed in as {} ({})", user.name, user.role);
            Ok(())
        }
        LoginOutcome::Failure { error } => bail!(error),
    }
}

async fn run_crud<T>(resource: Resource<T>, action: CrudAction) -> Result<()>
where
    T: DeserializeOwned + Serialize,
{
    match action {
        CrudAction::List {
            limit,
            page,
            sort,
            search,
        } => {
            let query = ListQuery {
                limit,
                page,
                sort,
                q: search,
            };
            print_json(&resource.list(query).await?)
        }
        CrudAction::Get { id } => print_json(&resource.get(&id).await?),
        CrudAction::Create { json } => {
            let payload = parse_payload(&json)?;
            print_json(&resource.create(&payload).await?)
        }
        CrudAction::Update { id, json } => {
            let payload = parse_payload(&json)?;
            print_json(&resource.update(&id, &payload).await?)
        }
        CrudAction::Remove { id } => print_json(&resource.remove(&id).await?),
    }
}

async fn run_crud_media(api: &Api, action: CrudAction) -> Result<()> {
    let media = api.media();
    match action {
        CrudAction::List {
            limit,
            page,
            sort,
            search,
        } => {
            let query = ListQuery {
                limit,
                page,
                sort,
                q: search,
            };
            print_json(&media.list(query).await?)
        }
        CrudAction::Get { id } => print_json(&media.get(&id).await?),
        CrudAction::Create { json } => {
            let payload = parse_payload(&json)?;
            print_json(&media.create(&payload).await?)
        }
        CrudAction::Update { id, json } => {
            let payload = parse_payload(&json)?;
            print_json(&media.update(&id, &payload).await?)
        }
        CrudAction::Remove { id } => print_json(&media.remove(&id).await?),
    }
}

async fn upload_media(
    api: &Api,
    file: PathBuf,
    title: Option<String>,
    description: Option<String>,
) -> Result<()> {
    let file_name = file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_string();
    let form = reqwest::multipart::Form::new()
        .part("file", file_part(&file, &file_name)?)
        .text("title", title.unwrap_or_else(|| file_name.clone()))
        .text("description", description.unwrap_or_default())
        .text(
            "type",
            mime_guess::from_path(&file)
                .first_or_octet_stream()
                .type_()
                .as_str()
                .to_string(),
        );
    print_json(&api.media().upload(form).await?)
}

async fn run_member(api: &Api, action: MemberAction) -> Result<()> {
    let members = api.members();
    match action {
        MemberAction::Add { image, name, role } => {
            let file_name = image
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("portrait")
                .to_string();
            let mut form = reqwest::multipart::Form::new()
                .part("image", file_part(&image, &file_name)?)
                .text("name", name);
            if let Some(role) = role {
                form = form.text("role", role);
            }
            print_json(&members.create(form).await?)
        }
        MemberAction::List => print_json(&members.list().await?),
        MemberAction::Get { id } => print_json(&members.get_by_id(&id).await?),
        MemberAction::GetByName { name } => print_json(&members.get_by_name(&name).await?),
        MemberAction::Update { id, json } => {
            let payload = parse_payload(&json)?;
            print_json(&members.update(&id, &payload).await?)
        }
        MemberAction::Remove { id } => print_json(&members.remove(&id).await?),
    }
}

fn file_part(path: &PathBuf, file_name: &str) -> Result<reqwest::multipart::Part> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(mime.as_ref())
        .context("building multipart file part")?;
    Ok(part)
}

fn parse_payload(json: &str) -> Result<Value> {
    serde_json::from_str(json).context("payload is not valid JSON")
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────
