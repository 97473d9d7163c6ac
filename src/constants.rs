/// Placeholder substituted with the (percent-encoded) player name in profile URLs
pub const PLAYER_PLACEHOLDER: &str = "{player}";

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_USER_AGENT: &str = concat!("player_scraper/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

pub const DEFAULT_REQUESTS_PER_MIN: u64 = 60;
pub const DEFAULT_DELAY_MS: u64 = 250;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_STORE_FILE: &str = "database/players_db.json";
pub const DEFAULT_ROSTER_FILE: &str = "database/online_db.json";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Leading CSV column holding the requested player name
pub const PLAYER_COLUMN: &str = "player";
/// Trailing CSV column holding the profile URL
pub const SOURCE_COLUMN: &str = "source";

/// Timestamp format used in the store and roster files
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// Environment overrides
pub const ENV_PROFILE_URL: &str = "PLAYER_SCRAPER_PROFILE_URL";
pub const ENV_ONLINE_URL: &str = "PLAYER_SCRAPER_ONLINE_URL";
pub const ENV_TOKEN: &str = "PLAYER_SCRAPER_TOKEN";
