use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use groupspace::auth::{AuthError, AuthService, Session, SessionSync, should_redirect_unauth};
use groupspace::backend::auth::{HostedAuth, SignUpOutcome, UserAttributes};
use groupspace::backend::store::store_for;
use groupspace::backend::{BackendClient, BackendError};
use groupspace::config::{BackendConfig, ConfigError};
use groupspace::nav::{ChannelRouter, NavCommand};
use groupspace::services::profiles::ProfileUpdate;
use groupspace::services::{follows, groups, posts, profiles};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("not signed in; run `groupspace login` first")]
    NotSignedIn,
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("signal handler failed: {0}")]
    Signal(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "groupspace", about = "Groups, posts and follows on a hosted backend")]
struct Cli {
    /// Persist the session here between invocations (overrides AUTH_SESSION_FILE).
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    /// Where sign-out redirects (overrides AUTH_LOGIN_PATH).
    #[arg(long, global = true)]
    login_path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "GROUPSPACE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long, env = "GROUPSPACE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        display_name: Option<String>,
    },
    Whoami,
    Logout,
    /// Mirror the session into a view state and print every change until Ctrl-C.
    Watch,
    Profile(ProfileCommand),
    Groups(GroupsCommand),
    Posts(PostsCommand),
    Follow {
        user_id: String,
    },
    Unfollow {
        user_id: String,
    },
    Followers {
        /// Defaults to the signed-in user.
        user_id: Option<String>,
    },
    Following {
        /// Defaults to the signed-in user.
        user_id: Option<String>,
    },
}

#[derive(Args, Debug)]
struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfileSubcommand {
    Show {
        /// Defaults to the signed-in user.
        user_id: Option<String>,
    },
    Update {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
        #[arg(long)]
        bio: Option<String>,
    },
}

#[derive(Args, Debug)]
struct GroupsCommand {
    #[command(subcommand)]
    command: GroupsSubcommand,
}

#[derive(Subcommand, Debug)]
enum GroupsSubcommand {
    List,
    Show {
        group_id: Uuid,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    Join {
        group_id: Uuid,
    },
    Leave {
        group_id: Uuid,
    },
    Members {
        group_id: Uuid,
    },
}

#[derive(Args, Debug)]
struct PostsCommand {
    #[command(subcommand)]
    command: PostsSubcommand,
}

#[derive(Subcommand, Debug)]
enum PostsSubcommand {
    List {
        group_id: Uuid,
        #[arg(long)]
        limit: Option<usize>,
    },
    Create {
        group_id: Uuid,
        #[arg(long)]
        content: String,
    },
    Delete {
        post_id: Uuid,
    },
}

struct CliContext {
    config: BackendConfig,
    auth: Arc<HostedAuth>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = BackendConfig::from_env()?;
    if let Some(path) = cli.session_file {
        config.session_file = Some(path);
    }
    if let Some(path) = cli.login_path {
        config.login_path = path;
    }
    if config.session_file.is_none() {
        tracing::warn!("no session file configured; sign-in will not outlive this process");
    }

    let client = Arc::new(BackendClient::new(&config)?);
    let auth = Arc::new(HostedAuth::new(client, store_for(&config)));
    let ctx = CliContext { config, auth };

    match cli.command {
        Command::Login { email, password } => {
            let session = ctx.auth.sign_in_with_password(&email, &password).await?;
            eprintln!("signed in as {}", session.user.label());
            Ok(())
        }
        Command::Signup { email, password, display_name } => {
            match ctx.auth.sign_up(&email, &password, display_name.as_deref()).await? {
                SignUpOutcome::SignedIn(session) => eprintln!("signed up as {}", session.user.label()),
                SignUpOutcome::ConfirmationRequired(user) => {
                    eprintln!("check {} for a confirmation link", user.email);
                }
            }
            Ok(())
        }
        Command::Whoami => {
            let session = signed_in(&ctx).await?;
            print_json(&session.user)
        }
        Command::Logout => {
            ctx.auth.sign_out().await?;
            eprintln!("signed out");
            Ok(())
        }
        Command::Watch => run_watch(&ctx).await,
        Command::Profile(profile) => run_profile(&ctx, profile).await,
        Command::Groups(groups) => run_groups(&ctx, groups).await,
        Command::Posts(posts) => run_posts(&ctx, posts).await,
        Command::Follow { user_id } => {
            let session = signed_in(&ctx).await?;
            let rest = ctx.auth.client().rest(Some(&session.access_token));
            let follow = follows::follow_user(&rest, &session.user.id, &user_id).await?;
            print_json(&follow)
        }
        Command::Unfollow { user_id } => {
            let session = signed_in(&ctx).await?;
            let rest = ctx.auth.client().rest(Some(&session.access_token));
            follows::unfollow_user(&rest, &session.user.id, &user_id).await?;
            eprintln!("unfollowed {user_id}");
            Ok(())
        }
        Command::Followers { user_id } => {
            let (token, user_id) = subject(&ctx, user_id).await?;
            let rest = ctx.auth.client().rest(token.as_deref());
            print_json(&follows::list_followers(&rest, &user_id).await?)
        }
        Command::Following { user_id } => {
            let (token, user_id) = subject(&ctx, user_id).await?;
            let rest = ctx.auth.client().rest(token.as_deref());
            print_json(&follows::list_following(&rest, &user_id).await?)
        }
    }
}

async fn run_watch(ctx: &CliContext) -> Result<(), CliError> {
    let (router, mut nav) = ChannelRouter::new();
    let auth: Arc<dyn AuthService> = ctx.auth.clone();
    let mut sync = SessionSync::mount(auth, Arc::new(router), ctx.config.login_path.clone());
    let mut states = sync.subscribe();

    let initial = states.borrow_and_update().clone();
    eprintln!("state: {:?}", initial.phase());

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                let user = state.user.as_ref().map_or("-", |u| u.label());
                eprintln!("state: {:?} user={user}", state.phase());
                if let Some(err) = &state.error {
                    eprintln!("  error: {err}");
                }
                if should_redirect_unauth(&state) {
                    eprintln!("  would redirect to {}", sync.login_path());
                }
            }
            Some(command) = nav.recv() => match command {
                NavCommand::Push(path) => eprintln!("nav: push {path}"),
                NavCommand::Refresh => eprintln!("nav: refresh"),
            },
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    sync.unmount();
    Ok(())
}

async fn run_profile(ctx: &CliContext, profile: ProfileCommand) -> Result<(), CliError> {
    match profile.command {
        ProfileSubcommand::Show { user_id } => {
            let (token, user_id) = subject(ctx, user_id).await?;
            let rest = ctx.auth.client().rest(token.as_deref());
            let profile = profiles::fetch_profile(&rest, &user_id)
                .await?
                .ok_or_else(|| CliError::NotFound(format!("profile {user_id}")))?;
            print_json(&profile)
        }
        ProfileSubcommand::Update { username, display_name, avatar_url, bio } => {
            let session = signed_in(ctx).await?;
            let rest = ctx.auth.client().rest(Some(&session.access_token));
            let update = ProfileUpdate {
                username,
                display_name: display_name.clone(),
                avatar_url: avatar_url.clone(),
                bio,
            };
            let profile = profiles::update_profile(&rest, &session.user.id, &update).await?;

            // Keep the auth user's metadata in step with the profile row.
            let attributes = UserAttributes { display_name, avatar_url, ..UserAttributes::default() };
            if !attributes.is_empty() {
                ctx.auth.update_user(&attributes).await?;
            }
            print_json(&profile)
        }
    }
}

async fn run_groups(ctx: &CliContext, command: GroupsCommand) -> Result<(), CliError> {
    match command.command {
        GroupsSubcommand::List => {
            let token = ctx.auth.access_token().await?;
            let rest = ctx.auth.client().rest(token.as_deref());
            print_json(&groups::list_groups(&rest).await?)
        }
        GroupsSubcommand::Show { group_id } => {
            let token = ctx.auth.access_token().await?;
            let rest = ctx.auth.client().rest(token.as_deref());
            let group = groups::fetch_group(&rest, group_id)
                .await?
                .ok_or_else(|| CliError::NotFound(format!("group {group_id}")))?;
            print_json(&group)
        }
        GroupsSubcommand::Create { name, description } => {
            let session = signed_in(ctx).await?;
            let rest = ctx.auth.client().rest(Some(&session.access_token));
            let group = groups::create_group(&rest, &session.user.id, &name, description.as_deref()).await?;
            print_json(&group)
        }
        GroupsSubcommand::Join { group_id } => {
            let session = signed_in(ctx).await?;
            let rest = ctx.auth.client().rest(Some(&session.access_token));
            print_json(&groups::join_group(&rest, group_id, &session.user.id).await?)
        }
        GroupsSubcommand::Leave { group_id } => {
            let session = signed_in(ctx).await?;
            let rest = ctx.auth.client().rest(Some(&session.access_token));
            groups::leave_group(&rest, group_id, &session.user.id).await?;
            eprintln!("left group {group_id}");
            Ok(())
        }
        GroupsSubcommand::Members { group_id } => {
            let token = ctx.auth.access_token().await?;
            let rest = ctx.auth.client().rest(token.as_deref());
            print_json(&groups::list_members(&rest, group_id).await?)
        }
    }
}

async fn run_posts(ctx: &CliContext, command: PostsCommand) -> Result<(), CliError> {
    match command.command {
        PostsSubcommand::List { group_id, limit } => {
            let token = ctx.auth.access_token().await?;
            let rest = ctx.auth.client().rest(token.as_deref());
            print_json(&posts::list_group_posts(&rest, group_id, limit).await?)
        }
        PostsSubcommand::Create { group_id, content } => {
            let session = signed_in(ctx).await?;
            let rest = ctx.auth.client().rest(Some(&session.access_token));
            print_json(&posts::create_post(&rest, group_id, &session.user.id, &content).await?)
        }
        PostsSubcommand::Delete { post_id } => {
            let session = signed_in(ctx).await?;
            let rest = ctx.auth.client().rest(Some(&session.access_token));
            posts::delete_post(&rest, post_id).await?;
            eprintln!("deleted post {post_id}");
            Ok(())
        }
    }
}

async fn signed_in(ctx: &CliContext) -> Result<Session, CliError> {
    ctx.auth.get_session().await?.ok_or(CliError::NotSignedIn)
}

/// Token to read with, plus the user the command is about: `user_id` when
/// given, otherwise the signed-in user.
async fn subject(ctx: &CliContext, user_id: Option<String>) -> Result<(Option<String>, String), CliError> {
    let session = ctx.auth.get_session().await?;
    let user_id = match (user_id, &session) {
        (Some(id), _) => id,
        (None, Some(session)) => session.user.id.clone(),
        (None, None) => return Err(CliError::NotSignedIn),
    };
    Ok((session.map(|s| s.access_token), user_id))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
