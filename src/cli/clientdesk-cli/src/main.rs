//! ClientDesk CLI - Command line interface.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use clientdesk_api::{
    ApiClient, ApiConfig, ApiError, AuthApi, CustomerForm, CustomersApi, NewUser, ResourceId,
    UserUpdate, UsersApi,
};
use clientdesk_auth::{
    AuthError, ExpiryPolicy, LoginOutcome, Navigator, Route, SessionConfig, SessionContext, SystemClock,
    TokenStore,
};
use clientdesk_storage_sqlite::SqliteBackend;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "clientdesk")]
#[command(about = "ClientDesk CLI - Manage users and customers")]
#[command(version)]
struct Cli {
    /// API base URL
    #[arg(long, default_value = "http://localhost:5070", env = "CLIENTDESK_API_URL")]
    api_url: String,

    /// Directory holding session databases
    #[arg(long, env = "CLIENTDESK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Storage origin name (derived from the API URL when omitted)
    #[arg(long, env = "CLIENTDESK_ORIGIN")]
    origin: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30", env = "CLIENTDESK_TIMEOUT")]
    timeout_secs: u64,

    /// How the server expiry and the token's exp claim combine
    #[arg(long, default_value = "strictest", env = "CLIENTDESK_EXPIRY_POLICY")]
    expiry_policy: ExpiryPolicy,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        /// Username
        username: String,
        /// Password (read from stdin if not provided)
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and clear the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Show session status
    Status,
    /// Resolve a route and show the view it lands on
    Open {
        /// Route path, e.g. /admin
        path: String,
    },
    /// User management (admin)
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Customer management (admin)
    Customers {
        #[command(subcommand)]
        command: CustomerCommands,
    },
    /// Show your own account (customer)
    Profile,
}

#[derive(Subcommand)]
enum UserCommands {
    /// List users
    List,
    /// Create a user
    Add {
        /// Username
        username: String,
        /// Password
        #[arg(long)]
        password: String,
        /// Role name
        #[arg(long, default_value = "customer")]
        role: String,
    },
    /// Update a user; only the given fields change
    Update {
        /// User id
        id: String,
        /// New username
        #[arg(long)]
        username: Option<String>,
        /// New password
        #[arg(long)]
        password: Option<String>,
        /// New role name
        #[arg(long)]
        role: Option<String>,
    },
    /// Delete a user
    Delete {
        /// User id
        id: String,
    },
}

#[derive(Subcommand)]
enum CustomerCommands {
    /// List customers
    List,
    /// Create a customer
    Add {
        /// Full name
        #[arg(long)]
        name: String,
        /// Email address
        #[arg(long)]
        email: String,
        /// Phone number
        #[arg(long)]
        phone: String,
    },
    /// Replace a customer's details
    Update {
        /// Customer id
        id: String,
        /// Full name
        #[arg(long)]
        name: String,
        /// Email address
        #[arg(long)]
        email: String,
        /// Phone number
        #[arg(long)]
        phone: String,
    },
    /// Delete a customer
    Delete {
        /// Customer id
        id: String,
    },
}

// ============================================================================
// Navigation
// ============================================================================

/// Navigator for a one-shot process. A reload only resets the current view.
struct TerminalNavigator {
    location: Mutex<String>,
}

impl TerminalNavigator {
    fn new() -> Self {
        Self {
            location: Mutex::new(Route::Root.path().to_string()),
        }
    }

    fn set(&self, path: &str) {
        let mut location = self.location.lock().unwrap_or_else(|e| e.into_inner());
        *location = path.to_string();
    }
}

impl Navigator for TerminalNavigator {
    fn replace(&self, path: &str) {
        self.set(path);
    }

    fn hard_redirect(&self, path: &str) {
        debug!(path, "Client reloaded");
        self.set(path);
    }

    fn location(&self) -> String {
        self.location
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

// ============================================================================
// Setup
// ============================================================================

struct App {
    session: Arc<SessionContext>,
    client: ApiClient,
}

impl App {
    async fn new(cli: &Cli) -> Result<Self> {
        let data_dir = match &cli.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        let origin = cli
            .origin
            .clone()
            .unwrap_or_else(|| SqliteBackend::origin_from_url(&cli.api_url));

        let backend = SqliteBackend::open(&data_dir, &origin)
            .await
            .with_context(|| format!("Failed to open session storage in {}", data_dir.display()))?;

        let session = Arc::new(SessionContext::new(
            TokenStore::new(Arc::new(backend)),
            Arc::new(TerminalNavigator::new()),
            Arc::new(SystemClock),
            SessionConfig {
                policy: cli.expiry_policy,
            },
        ));

        let config = ApiConfig {
            base_url: cli.api_url.clone(),
            timeout: Duration::from_secs(cli.timeout_secs),
        };
        let client =
            ApiClient::new(&config, session.clone()).context("Failed to create HTTP client")?;

        Ok(Self { session, client })
    }

    /// Opens a panel route. Prints where the guard sent us when it is not `path`.
    async fn enter(&self, path: &str) -> Result<bool> {
        let wanted = Route::parse(path);
        let landed = self.session.navigate(path).await?;

        if landed == wanted {
            return Ok(true);
        }

        match landed {
            Route::Login => println!("Not signed in. Use `clientdesk login` first."),
            other => println!("Access denied; redirected to {other}"),
        }
        Ok(false)
    }
}

/// Per-user data directory, e.g. `~/.local/share/clientdesk`.
fn default_data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .context("Failed to locate the user data directory; pass --data-dir")?;
    Ok(base.join("clientdesk"))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Id typed on the command line, passed to the server as written.
fn path_id(raw: &str) -> ResourceId {
    ResourceId::from(raw)
}

/// Describes where a fresh login lands. A dead end is reported, not fatal.
fn describe_landing(result: Result<Route, AuthError>) -> String {
    match result {
        Ok(route) => format!("Landing view: {route}"),
        Err(e) => {
            warn!(error = %e, "No view available after login");
            format!("Landing view: none ({e})")
        },
    }
}

fn api_error(action: &str, e: ApiError) -> anyhow::Error {
    match e {
        ApiError::Unauthorized { .. } => {
            anyhow::anyhow!("{action} failed: session rejected by the server; sign in again")
        },
        other => anyhow::anyhow!("{action} failed: {}", other.message()),
    }
}

// ============================================================================
// Command Handlers
// ============================================================================

async fn cmd_login(app: &App, username: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => {
            eprint!("Password: ");
            io::stderr().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        },
    };

    let gateway = AuthApi::new(app.client.clone());
    let outcome = app.session.login(&gateway, username, &password).await;

    if let LoginOutcome::Failure { message } = &outcome {
        bail!("{message}");
    }

    let landing = app.session.landing_route(&outcome).await;

    if let LoginOutcome::Success {
        user: Some(user), ..
    } = &outcome
    {
        println!(
            "Signed in as {}",
            user.username.as_deref().unwrap_or(username)
        );
    } else {
        println!("Signed in as {username}");
    }
    println!("{}", describe_landing(app.session.navigate(landing.path()).await));

    Ok(())
}

async fn cmd_logout(app: &App) -> Result<()> {
    app.session.logout().await;
    println!("Signed out");
    Ok(())
}

async fn cmd_whoami(app: &App) -> Result<()> {
    match app.session.current_user().await {
        Some(user) => {
            println!("{}", serde_json::to_string_pretty(&user)?);
        },
        None => println!("Not signed in"),
    }
    Ok(())
}

async fn cmd_status(app: &App) -> Result<()> {
    let authenticated = app.session.is_authenticated().await;

    println!("ClientDesk session:");
    println!("  Authenticated: {authenticated}");
    println!("  Policy:        {}", app.session.policy());

    if let Some(at) = app.session.expires_at().await {
        println!("  Expires:       {}", at.to_rfc3339());
    }
    if let Some(raw) = app.session.store().expires().await {
        println!("  Server expiry: {raw}");
    }

    if !authenticated && app.session.expire_session().await {
        println!("  Expired session cleared");
    }

    Ok(())
}

async fn cmd_open(app: &App, path: &str) -> Result<()> {
    let route = app.session.navigate(path).await?;
    println!("{route}");
    Ok(())
}

async fn cmd_users(app: &App, command: UserCommands) -> Result<()> {
    if !app.enter(Route::Admin.path()).await? {
        return Ok(());
    }
    let users = UsersApi::new(app.client.clone());

    match command {
        UserCommands::List => {
            let list = users.list().await.map_err(|e| api_error("List users", e))?;
            if list.is_empty() {
                println!("No users found");
            }
            for user in &list {
                println!(
                    "{:>6}  {:<24}  {}",
                    user.id.to_string(),
                    user.username,
                    user.role_name.as_deref().unwrap_or("-")
                );
            }
        },
        UserCommands::Add {
            username,
            password,
            role,
        } => {
            let user = NewUser::new(username, password).with_role(role);
            let created = users
                .create(&user)
                .await
                .map_err(|e| api_error("Create user", e))?;
            match created {
                Some(created) => println!("User '{}' created (id {})", created.username, created.id),
                None => println!("User '{}' created", user.username),
            }
        },
        UserCommands::Update {
            id,
            username,
            password,
            role,
        } => {
            let update = UserUpdate {
                username,
                password,
                role_name: role,
            };
            let updated = users
                .update(&path_id(&id), &update)
                .await
                .map_err(|e| api_error("Update user", e))?;
            match updated {
                Some(updated) => println!("User '{}' updated", updated.username),
                None => println!("User {id} updated"),
            }
        },
        UserCommands::Delete { id } => {
            users
                .delete(&path_id(&id))
                .await
                .map_err(|e| api_error("Delete user", e))?;
            println!("User {id} deleted");
        },
    }

    Ok(())
}

async fn cmd_customers(app: &App, command: CustomerCommands) -> Result<()> {
    if !app.enter(Route::Admin.path()).await? {
        return Ok(());
    }
    let customers = CustomersApi::new(app.client.clone());

    match command {
        CustomerCommands::List => {
            let list = customers
                .list()
                .await
                .map_err(|e| api_error("List customers", e))?;
            if list.is_empty() {
                println!("No customers found");
            }
            for c in &list {
                println!(
                    "{:>6}  {:<24}  {:<28}  {}",
                    c.id.to_string(),
                    c.name,
                    c.email,
                    c.phone
                );
            }
        },
        CustomerCommands::Add { name, email, phone } => {
            let form = CustomerForm { name, email, phone };
            let created = customers
                .create(&form)
                .await
                .map_err(|e| api_error("Create customer", e))?;
            match created {
                Some(created) => println!("Customer '{}' created (id {})", created.name, created.id),
                None => println!("Customer '{}' created", form.name),
            }
        },
        CustomerCommands::Update {
            id,
            name,
            email,
            phone,
        } => {
            let form = CustomerForm { name, email, phone };
            let updated = customers
                .update(&path_id(&id), &form)
                .await
                .map_err(|e| api_error("Update customer", e))?;
            match updated {
                Some(updated) => println!("Customer '{}' updated", updated.name),
                None => println!("Customer {id} updated"),
            }
        },
        CustomerCommands::Delete { id } => {
            customers
                .delete(&path_id(&id))
                .await
                .map_err(|e| api_error("Delete customer", e))?;
            println!("Customer {id} deleted");
        },
    }

    Ok(())
}

async fn cmd_profile(app: &App) -> Result<()> {
    if !app.enter(Route::Customer.path()).await? {
        return Ok(());
    }

    let Some(user) = app.session.current_user().await else {
        bail!("Session ended while loading profile");
    };

    println!("Profile:");
    println!("  Id:       {}", user.id.as_deref().unwrap_or("-"));
    println!("  Username: {}", user.username.as_deref().unwrap_or("-"));
    println!(
        "  Role:     {}",
        user.role.as_ref().map_or("-", |r| r.as_str())
    );

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let app = App::new(&cli).await?;

    match cli.command {
        Commands::Login { username, password } => cmd_login(&app, &username, password).await,
        Commands::Logout => cmd_logout(&app).await,
        Commands::Whoami => cmd_whoami(&app).await,
        Commands::Status => cmd_status(&app).await,
        Commands::Open { path } => cmd_open(&app, &path).await,
        Commands::Users { command } => cmd_users(&app, command).await,
        Commands::Customers { command } => cmd_customers(&app, command).await,
        Commands::Profile => cmd_profile(&app).await,
    }
}
