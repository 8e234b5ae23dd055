use tracing::warn;

/// Where session rows are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    /// Persisted next to the users in the sled database.
    Sled,
    /// Held in an in-process moka cache; lost on restart.
    Memory,
}

impl SessionBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sled" => Some(Self::Sled),
            "memory" | "moka" => Some(Self::Memory),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionBackend::Sled => "sled",
            SessionBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub http_port: u16,
    pub data_dir: String,
    /// Shared passphrase required to create accounts.
    pub admin_secret: String,
    /// HMAC key for access and refresh tokens.
    pub signing_secret: String,
    pub session_backend: SessionBackend,
    pub allowed_origins: Vec<String>,
}

impl Config {
    const DEFAULT_HOST: &str = "0.0.0.0";
    const DEFAULT_HTTP_PORT: u16 = 8000;
    const DEFAULT_DATA_DIR: &str = "./data";
    const DEFAULT_ADMIN_SECRET: &str = "admin@123";
    const DEFAULT_SIGNING_SECRET: &str = "gatekeep-development-signing-secret";

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let http_port = lookup("GATEKEEP_HTTP_PORT")
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(Self::DEFAULT_HTTP_PORT);

        let admin_secret = lookup("GATEKEEP_ADMIN_SECRET").unwrap_or_else(|| {
            warn!("GATEKEEP_ADMIN_SECRET not set, using default admin secret");
            warn!("⚠️  WARNING: anyone knowing the default secret can create accounts!");
            Self::DEFAULT_ADMIN_SECRET.to_string()
        });

        let signing_secret = lookup("GATEKEEP_SIGNING_SECRET").unwrap_or_else(|| {
            warn!("GATEKEEP_SIGNING_SECRET not set, using development signing secret");
            warn!("⚠️  WARNING: tokens issued by this process can be forged!");
            Self::DEFAULT_SIGNING_SECRET.to_string()
        });

        let session_backend = match lookup("GATEKEEP_SESSION_BACKEND") {
            Some(value) => SessionBackend::parse(&value).unwrap_or_else(|| {
                warn!("Unknown GATEKEEP_SESSION_BACKEND '{}', falling back to sled", value);
                SessionBackend::Sled
            }),
            None => SessionBackend::Sled,
        };

        Self {
            host: lookup("GATEKEEP_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            http_port,
            data_dir: lookup("GATEKEEP_DATA_DIR")
                .unwrap_or_else(|| Self::DEFAULT_DATA_DIR.to_string()),
            admin_secret,
            signing_secret,
            session_backend,
            allowed_origins: lookup("GATEKEEP_ALLOWED_ORIGINS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}
