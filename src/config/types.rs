use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Metro-Harvest
///
/// Every section has defaults matching the production catalog, so an empty
/// file (or no file at all) yields a runnable configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub http: HttpConfig,
    pub proxy: Option<ProxyConfig>,
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Catalog location
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Origin that relative product links are resolved against
    pub base_url: String,

    /// Category listing path, or an absolute category URL
    pub category_path: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://online.metro-cc.ru".to_string(),
            category_path: "/category/myasnye/myaso".to_string(),
        }
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    /// Total per-request timeout in seconds
    pub timeout_secs: u64,

    /// Total number of attempts per URL before giving up
    pub max_retries: u32,

    /// Pause between attempts in seconds; absent or zero disables the pause
    pub retry_delay_secs: Option<u64>,

    /// Upper bound on simultaneously open requests
    pub max_concurrent_requests: u32,

    pub user_agent: String,

    pub accept_language: String,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Option<Duration> {
        self.retry_delay_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 10,
            retry_delay_secs: Some(10),
            max_concurrent_requests: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            accept_language: "ru-RU,ru;q=0.9".to_string(),
        }
    }
}

/// Supported proxy protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    Http,
    Https,
    Socks5,
}

impl ProxyKind {
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Socks5 => "socks5",
        }
    }
}

/// Outbound proxy settings
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    pub kind: ProxyKind,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Proxy URL without credentials, e.g. `socks5://10.0.0.1:1080`
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.kind.scheme(), self.host, self.port)
    }
}

/// Crawl limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of listing pages to visit; 0 disables the cap
    pub max_pages: u32,
}

impl CrawlerConfig {
    pub fn page_cap(&self) -> Option<u32> {
        (self.max_pages > 0).then_some(self.max_pages)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self { max_pages: 100 }
    }
}

/// Output locations
///
/// Relative paths are resolved against `data_dir`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    pub data_dir: PathBuf,

    /// Result JSON document
    pub output_file: PathBuf,

    /// Directory for archived raw HTML responses
    pub responses_dir: PathBuf,

    pub logs_dir: PathBuf,

    /// Log file name inside `logs_dir`
    pub log_file: String,

    /// Keep a copy of every fetched HTML body
    pub save_raw_responses: bool,

    /// Raw responses older than this many days are removed at shutdown
    pub retention_days: u64,
}

impl OutputConfig {
    pub fn output_path(&self) -> PathBuf {
        self.data_dir.join(&self.output_file)
    }

    pub fn responses_path(&self) -> PathBuf {
        self.data_dir.join(&self.responses_dir)
    }

    pub fn logs_path(&self) -> PathBuf {
        self.data_dir.join(&self.logs_dir)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_file: PathBuf::from("outputs/output.json"),
            responses_dir: PathBuf::from("responses"),
            logs_dir: PathBuf::from("logs"),
            log_file: "parser.log".to_string(),
            save_raw_responses: false,
            retention_days: 3,
        }
    }
}

/// Log verbosity used when neither `RUST_LOG` nor `-v`/`-q` is given
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
