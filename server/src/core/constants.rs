// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "Gatehouse";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".gatehouse";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "gatehouse.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "GATEHOUSE_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "GATEHOUSE_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "GATEHOUSE_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "GATEHOUSE_LOG";

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "GATEHOUSE_DATA_DIR";

// =============================================================================
// Environment Variables - Authentication
// =============================================================================

/// Environment variable selecting the trust mode
pub const ENV_TRUST_MODE: &str = "GATEHOUSE_TRUST_MODE";

/// Environment variable for the session signing secret (hex)
pub const ENV_SESSION_SECRET: &str = "GATEHOUSE_SESSION_SECRET";

/// Environment variable for session lifetime in days
pub const ENV_SESSION_TTL_DAYS: &str = "GATEHOUSE_SESSION_TTL_DAYS";

/// Environment variable for the directory search credential
pub const ENV_DIRECTORY_SEARCH_AUTH: &str = "GATEHOUSE_DIRECTORY_SEARCH_AUTH";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5390;

/// Body limit for auth endpoints
pub const AUTH_BODY_LIMIT: usize = 16 * 1024;

/// Graceful shutdown timeout for background tasks
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Sessions
// =============================================================================

/// Cookie name for session token
pub const SESSION_COOKIE_NAME: &str = "gatehouse_session";

/// Default session TTL in days
pub const DEFAULT_SESSION_TTL_DAYS: u32 = 30;

/// Signing key length in bytes
pub const SESSION_SIGNING_KEY_LEN: usize = 32;

/// Interval between expired-session purges
pub const SESSION_PURGE_INTERVAL_SECS: u64 = 3600;

// =============================================================================
// Proxy Trust
// =============================================================================

/// Header carrying the login asserted by the reverse proxy
pub const DEFAULT_PROXY_LOGIN_HEADER: &str = "X-Username";

/// Header carrying the email asserted by the reverse proxy
pub const DEFAULT_PROXY_EMAIL_HEADER: &str = "X-Email";

/// Header carrying the first name asserted by the reverse proxy
pub const DEFAULT_PROXY_FIRST_NAME_HEADER: &str = "X-Firstname";

/// Header carrying the last name asserted by the reverse proxy
pub const DEFAULT_PROXY_LAST_NAME_HEADER: &str = "X-Lastname";

// =============================================================================
// Directory
// =============================================================================

/// Default LDAP port
pub const DEFAULT_DIRECTORY_PORT: u16 = 389;

/// Default LDAPS port
pub const DEFAULT_DIRECTORY_TLS_PORT: u16 = 636;

/// Attribute matched against the submitted login
pub const DEFAULT_DIRECTORY_SEARCH_ATTR: &str = "sAMAccountName";

/// Attribute mapped to the user's email
pub const DEFAULT_DIRECTORY_MAIL_ATTR: &str = "mail";

/// Attribute mapped to the user's display name
pub const DEFAULT_DIRECTORY_NAME_ATTR: &str = "cn";

/// Attribute holding the password when comparing locally
pub const DEFAULT_DIRECTORY_PASSWORD_ATTR: &str = "userPassword";

/// Timeout for each directory operation
pub const DEFAULT_DIRECTORY_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// Users & Projects
// =============================================================================

/// Prefix of provisioned home project names
pub const HOME_PROJECT_PREFIX: &str = "home:";

/// Maximum login length
pub const LOGIN_MAX_LEN: usize = 200;

/// Authentication method recorded on sessions: reverse proxy headers
pub const AUTH_METHOD_PROXY: &str = "proxy";

/// Authentication method recorded on sessions: directory bind
pub const AUTH_METHOD_DIRECTORY: &str = "directory";

/// Authentication method recorded on sessions: local password
pub const AUTH_METHOD_PASSWORD: &str = "password";

// =============================================================================
// SQLite Database
// =============================================================================

/// SQLite database filename
pub const SQLITE_DB_FILENAME: &str = "gatehouse.db";

/// SQLite connection pool max connections
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// SQLite cache size (negative = KB, so -16000 = 16MB)
pub const SQLITE_CACHE_SIZE: &str = "-16000";

/// SQLite WAL auto-checkpoint threshold (pages, ~4MB at 1000)
pub const SQLITE_WAL_AUTOCHECKPOINT: &str = "1000";

/// WAL checkpoint interval in seconds (5 minutes)
pub const SQLITE_CHECKPOINT_INTERVAL_SECS: u64 = 300;
