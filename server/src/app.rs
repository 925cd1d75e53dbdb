//! Core application

use std::io::BufRead;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use crate::api::ApiServer;
use crate::auth::password::hash_password;
use crate::auth::{AuthResolver, AuthStrategy, DirectoryClient, SessionManager, UserProvisioner};
use crate::core::cli::{self, CliConfig, Commands, UserCommands};
use crate::core::config::{AppConfig, AuthConfig};
use crate::core::constants::{ENV_LOG, SESSION_SIGNING_KEY_LEN};
use crate::core::shutdown::ShutdownService;
use crate::core::storage::AppStorage;
use crate::data::{NewUser, SessionRepository, SqliteService, UserRepository};
use crate::utils::crypto::{decode_secret, random_bytes};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub storage: AppStorage,
    pub database: Arc<SqliteService>,
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<SessionManager>,
    pub resolver: Arc<AuthResolver>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::User { command: user_cmd }) => {
                return Self::handle_user_command(user_cmd).await;
            }
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        Self::init_with_directory(cli, None).await
    }

    /// Build the application with an optional directory client
    ///
    /// The binary ships without a directory wire client; applications that
    /// embed the server supply one to enable directory trust mode.
    pub async fn init_with_directory(
        cli: &CliConfig,
        directory: Option<Arc<dyn DirectoryClient>>,
    ) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let storage = AppStorage::init().await?;
        let database = Arc::new(
            SqliteService::init(&storage)
                .await
                .context("Failed to initialize SQLite database")?,
        );

        let users: Arc<dyn UserRepository> = Arc::new(database.clone());
        let session_store: Arc<dyn SessionRepository> = Arc::new(database.clone());

        let sessions = Arc::new(SessionManager::new(
            session_store,
            users.clone(),
            signing_key(&config.auth)?,
            config.auth.session_ttl_days,
        ));
        let strategy = AuthStrategy::from_config(&config.auth, users.clone(), directory)?;
        let provisioner = UserProvisioner::new(users.clone(), config.auth.create_home_project);
        let resolver = Arc::new(AuthResolver::new(strategy, provisioner, sessions.clone()));

        tracing::debug!(trust_mode = %config.auth.trust_mode, "Authentication initialized");

        let shutdown = ShutdownService::new(database.clone());

        Ok(Self {
            shutdown,
            config,
            storage,
            database,
            users,
            sessions,
            resolver,
        })
    }

    /// Account management only needs the database, not the auth settings
    async fn handle_user_command(cmd: UserCommands) -> Result<()> {
        let storage = AppStorage::init().await?;
        let database = Arc::new(
            SqliteService::init(&storage)
                .await
                .context("Failed to initialize SQLite database")?,
        );
        let result = Self::run_user_command(&database, cmd).await;
        database.close().await;
        result
    }

    async fn run_user_command(database: &Arc<SqliteService>, cmd: UserCommands) -> Result<()> {
        match cmd {
            UserCommands::Add {
                login,
                email,
                realname,
                password,
                admin,
            } => {
                let password = password_or_stdin(password)?;
                let hash = hash_password(&password)
                    .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
                let user = database
                    .create_user(&NewUser {
                        login,
                        email,
                        realname,
                        password_hash: Some(hash),
                        is_admin: admin,
                    })
                    .await?;
                if let Err(e) = database.create_home_project(&user).await {
                    tracing::warn!(login = %user.login, error = %e, "Failed to create home project");
                }
                println!("Created user '{}' ({})", user.login, user.id);
            }
            UserCommands::Passwd { login, password } => {
                let Some(user) = database.find_user_by_login(&login).await? else {
                    bail!("No user with login '{}'", login);
                };
                let password = password_or_stdin(password)?;
                let hash = hash_password(&password)
                    .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
                database.set_password_hash(&user.id, &hash).await?;
                println!("Password updated for '{}'", user.login);
            }
        }
        Ok(())
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", env!("CARGO_CRATE_NAME"));

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        app.start_background_tasks().await;

        tracing::info!(
            data_dir = %app.storage.data_dir().display(),
            "Storage ready"
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }

    pub async fn start_background_tasks(&self) {
        self.shutdown
            .register(
                self.database
                    .start_checkpoint_task(self.shutdown.subscribe()),
            )
            .await;

        self.shutdown
            .register(
                self.sessions
                    .start_purge_task(self.shutdown.subscribe()),
            )
            .await;

        tracing::debug!("Background tasks started");
    }
}

/// Session signing key from configuration, or a random per-process key
fn signing_key(config: &AuthConfig) -> Result<Vec<u8>> {
    match &config.session_secret {
        Some(secret) => decode_secret(secret).context("Session secret must be hex-encoded"),
        None => {
            tracing::warn!(
                "No session secret configured; sessions will not survive a restart"
            );
            Ok(random_bytes(SESSION_SIGNING_KEY_LEN))
        }
    }
}

/// Use the given password or read one line from stdin
fn password_or_stdin(password: Option<String>) -> Result<String> {
    let password = match password {
        Some(password) => password,
        None => {
            eprint!("Password: ");
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read password from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(password)
}
