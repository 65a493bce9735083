// taskdesk/src/main.rs

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::{io::{self, BufRead, Write}, process::ExitCode, sync::Arc};
use tracing::debug;

use taskdesk::{
    Access, AccessGuard, ApiClient, AuthService, Config, ConfigManager, Credentials, Outcome,
    Priority, Registration, Role, Scope, Session, SessionStore, TaskBoard, TaskDraft, TaskStatus,
};

#[derive(Parser)]
#[command(name = "taskdesk", version, about = "Command-line client for the task tracker")]
struct Args {
    /// API base URL (overrides config and TASKDESK_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, value_enum)]
        role: Option<RoleArg>,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Work with your tasks (requires login)
    Tasks {
        #[command(subcommand)]
        cmd: TasksCmd,
    },
    /// Inspect or change persisted settings
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },
}

#[derive(Subcommand)]
enum ConfigCmd {
    /// Print the effective API URL and session directory
    Show,
    /// Save the API base URL
    SetUrl {
        url: String,
        #[arg(long, value_enum, default_value_t = ScopeArg::User)]
        scope: ScopeArg,
    },
}

#[derive(Subcommand)]
enum TasksCmd {
    /// List tasks
    List,
    /// Create a task
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_enum, default_value_t = StatusArg::Pending)]
        status: StatusArg,
        #[arg(long, value_enum, default_value_t = PriorityArg::Medium)]
        priority: PriorityArg,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Change a task's status: pending | in-progress | completed
    Status { id: String, status: String },
    /// Delete a task
    Rm {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RoleArg { Admin, User }

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ScopeArg { User, Workspace }

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StatusArg { Pending, InProgress, Completed }

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PriorityArg { Low, Medium, High }

impl From<RoleArg> for Role {
    fn from(r: RoleArg) -> Self { match r { RoleArg::Admin => Role::Admin, RoleArg::User => Role::User } }
}

impl From<ScopeArg> for Scope {
    fn from(s: ScopeArg) -> Self { match s { ScopeArg::User => Scope::User, ScopeArg::Workspace => Scope::Workspace } }
}

impl From<StatusArg> for TaskStatus {
    fn from(s: StatusArg) -> Self {
        match s { StatusArg::Pending => Self::Pending, StatusArg::InProgress => Self::InProgress, StatusArg::Completed => Self::Completed }
    }
}

impl From<PriorityArg> for Priority {
    fn from(p: PriorityArg) -> Self {
        match p { PriorityArg::Low => Self::Low, PriorityArg::Medium => Self::Medium, PriorityArg::High => Self::High }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .init();

    match run(Args::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(api_url: Option<String>) -> Result<ConfigManager> {
    let cwd = std::env::current_dir().context("current dir")?;
    let cfg = ConfigManager::load(cwd)?;
    cfg.apply_env()?;
    if let Some(url) = api_url {
        let mut patch = Config::default();
        patch.api.base_url = Some(url);
        cfg.apply_runtime_overlay(patch)?;
    }
    Ok(cfg)
}

fn build_client(cfg: &ConfigManager, store: SessionStore) -> Result<ApiClient> {
    let c = cfg.get();
    let ua = c.api.user_agent.clone().unwrap_or_else(|| format!("taskdesk/{}", env!("CARGO_PKG_VERSION")));
    let http = reqwest::Client::builder().user_agent(ua).build().context("build http client")?;
    debug!(base_url = c.base_url(), "api client");
    ApiClient::with_client(http, c.base_url(), store)
}

async fn run(args: Args) -> Result<ExitCode> {
    let cfg = load_config(args.api_url)?;
    let store = SessionStore::on_disk(cfg.storage_dir()?);
    // `config` must work even when the saved URL does not parse, so the client is built per command.
    let client = || build_client(&cfg, store.clone());

    match args.cmd {
        Cmd::Login { email, password } => {
            let s = AuthService::new(client()?).login(&Credentials { email, password }).await?;
            println!("Signed in as {} ({})", s.identity.name, s.identity.role);
        }
        Cmd::Register { name, email, password, role } => {
            let reg = Registration { name, email, password, role: role.map(Into::into) };
            let s = AuthService::new(client()?).register(&reg).await?;
            println!("Account created. Signed in as {} ({})", s.identity.name, s.identity.role);
        }
        Cmd::Logout => {
            AuthService::new(client()?).logout()?;
            println!("Signed out");
        }
        Cmd::Whoami => match AuthService::new(client()?).current_user() {
            Some(u) => println!("{} [{}]", u.name, u.role),
            None => println!("Not signed in"),
        },
        Cmd::Tasks { cmd } => {
            let guard = AccessGuard::new(store.clone());
            let session = match (guard.evaluate(), store.current()) {
                (Access::Allow, Some(s)) => s,
                _ => {
                    eprintln!("Not signed in. Run `taskdesk login --email <email> --password <password>` first.");
                    return Ok(ExitCode::from(2));
                }
            };
            return tasks(cmd, Arc::new(client()?), &session).await;
        }
        Cmd::Config { cmd } => return config(cmd, &cfg),
    }
    Ok(ExitCode::SUCCESS)
}

fn config(cmd: ConfigCmd, cfg: &ConfigManager) -> Result<ExitCode> {
    match cmd {
        ConfigCmd::Show => {
            println!("api url:  {}", cfg.get().base_url());
            println!("session:  {}", cfg.storage_dir()?.display());
        }
        ConfigCmd::SetUrl { url, scope } => {
            let path = cfg.set_base_url(scope.into(), &url)?;
            println!("Saved api.base_url to {}", path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn tasks(cmd: TasksCmd, api: Arc<ApiClient>, session: &Session) -> Result<ExitCode> {
    let mut board = TaskBoard::mount(api, session).await;
    let outcome = match cmd {
        TasksCmd::List => board.outcome(),
        TasksCmd::Add { title, description, status, priority, due } => {
            let mut draft = TaskDraft { title, description, status: status.into(), priority: priority.into(), due_date: due };
            board.create_task(&mut draft).await
        }
        TasksCmd::Status { id, status } => board.update_status(&id, &status).await,
        TasksCmd::Rm { id, yes } => {
            let gate = |prompt: &str| yes || ask(prompt);
            board.delete_task(&id, &gate).await
        }
    };
    render(&board);
    Ok(match outcome {
        Outcome::Failed => ExitCode::FAILURE,
        Outcome::Done | Outcome::Cancelled => ExitCode::SUCCESS,
    })
}

fn ask(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    io::stdout().flush().ok();
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() { return false; }
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn render(board: &TaskBoard) {
    if let Some(err) = board.error() {
        eprintln!("! {err}");
    }
    let cards = board.cards();
    if cards.is_empty() {
        if board.error().is_none() { println!("No tasks yet. Create one with `taskdesk tasks add --title ...`."); }
        return;
    }
    for c in cards {
        println!("{}  {}  [{}] [{}]", c.id, c.title, c.status_label, c.priority);
        if let Some(owner) = &c.owner { println!("    created by: {owner}"); }
        if let Some(desc) = &c.description { println!("    {desc}"); }
        if let Some(due) = c.due { println!("    due: {due}"); }
        println!("    created: {}", c.created);
    }
}
