//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::cache::CacheBackend;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "folio";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CONTENT_ROOT: &str = "content";
const DEFAULT_COLLECTIONS: [&str; 2] = ["posts", "articles"];
const DEFAULT_PATTERN: &str = "*/page.mdx";
const DEFAULT_AUTHOR: &str = "Site Owner";
const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_CACHE_DIRECTORY: &str = ".folio-cache";
const DEFAULT_CACHE_ENTRY_LIMIT: usize = 64;
const DEFAULT_TOC_MAX_DEPTH: u8 = 3;
const DEFAULT_INLINE_IMAGE_MAX_BYTES: u64 = 2 * 1024 * 1024;
const DEFAULT_SITE_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_SITE_NAME: &str = "Portfolio";
const DEFAULT_SITE_LOCALE: &str = "en-US";

/// Command-line arguments for the folio binary.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Portfolio content pipeline")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOLIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve the content API over HTTP.
    Serve(ServeArgs),
    /// Print the entries of a collection, newest first.
    List(ListArgs),
    /// Print one compiled entry.
    Show(ShowArgs),
    /// Rebuild a collection's cached listing.
    Warm(WarmArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the content root directory.
    #[arg(long = "content-root", value_name = "PATH", global = true)]
    pub content_root: Option<PathBuf>,

    /// Override the list cache backend (memory|fs|none).
    #[arg(long = "cache-backend", value_name = "BACKEND", global = true)]
    pub cache_backend: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    /// Collection to list; defaults to the first configured collection.
    #[arg(long, short = 'c', value_name = "NAME")]
    pub collection: Option<String>,

    /// Print JSON instead of a table.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    #[arg(value_name = "SLUG")]
    pub slug: String,

    /// Collection holding the entry; defaults to the first configured collection.
    #[arg(long, short = 'c', value_name = "NAME")]
    pub collection: Option<String>,

    /// Print only the rendered HTML body.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub html: bool,
}

#[derive(Debug, Args, Clone)]
pub struct WarmArgs {
    /// Collection to warm; every configured collection when omitted.
    #[arg(long, short = 'c', value_name = "NAME")]
    pub collection: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub content: ContentSettings,
    pub cache: CacheSettings,
    pub render: RenderSettings,
    pub site: SiteSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub root: PathBuf,
    pub collections: Vec<String>,
    pub pattern: String,
    pub default_author: String,
}

impl ContentSettings {
    /// Collection used when a command does not name one.
    pub fn default_collection(&self) -> &str {
        // Non-empty after validation.
        self.collections.first().map_or("", String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub backend: CacheBackend,
    pub ttl_seconds: u64,
    pub directory: PathBuf,
    pub key_prefix: Option<String>,
    pub entry_limit: usize,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub toc_max_depth: u8,
    pub inline_image_max_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub origin: String,
    pub name: String,
    pub locale: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix("FOLIO")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("content.collections")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_global_overrides(&cli.overrides);
    if let Some(Command::Serve(serve)) = cli.command.as_ref() {
        raw.apply_serve_overrides(serve);
    }

    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    content: RawContentSettings,
    cache: RawCacheSettings,
    render: RawRenderSettings,
    site: RawSiteSettings,
}

impl RawSettings {
    fn apply_global_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(root) = overrides.content_root.as_ref() {
            self.content.root = Some(root.clone());
        }
        if let Some(backend) = overrides.cache_backend.as_ref() {
            self.cache.backend = Some(backend.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeArgs) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            content,
            cache,
            render,
            site,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            content: build_content_settings(content)?,
            cache: build_cache_settings(cache)?,
            render: build_render_settings(render)?,
            site: build_site_settings(site)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;
    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let root = content
        .root
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONTENT_ROOT));
    if root.as_os_str().is_empty() {
        return Err(LoadError::invalid("content.root", "path must not be empty"));
    }

    let collections = content
        .collections
        .unwrap_or_else(|| DEFAULT_COLLECTIONS.map(String::from).to_vec());
    if collections.is_empty() {
        return Err(LoadError::invalid(
            "content.collections",
            "at least one collection is required",
        ));
    }
    if let Some(bad) = collections
        .iter()
        .find(|name| !crate::domain::slug::is_canonical_slug(name))
    {
        return Err(LoadError::invalid(
            "content.collections",
            format!("`{bad}` is not a lowercase, hyphenated name"),
        ));
    }

    let pattern = content
        .pattern
        .unwrap_or_else(|| DEFAULT_PATTERN.to_string());
    if pattern.trim().is_empty() {
        return Err(LoadError::invalid(
            "content.pattern",
            "pattern must not be empty",
        ));
    }
    glob::Pattern::new(&pattern)
        .map_err(|err| LoadError::invalid("content.pattern", err.to_string()))?;

    let default_author = content
        .default_author
        .map(|author| author.trim().to_string())
        .filter(|author| !author.is_empty())
        .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

    Ok(ContentSettings {
        root,
        collections,
        pattern,
        default_author,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let backend = match cache.backend.as_deref().map(str::trim) {
        None | Some("") => CacheBackend::default(),
        Some(name) => match name.to_ascii_lowercase().as_str() {
            "memory" => CacheBackend::Memory,
            "fs" => CacheBackend::Fs,
            "none" => CacheBackend::None,
            other => {
                return Err(LoadError::invalid(
                    "cache.backend",
                    format!("unknown backend `{other}` (expected memory, fs or none)"),
                ));
            }
        },
    };

    let ttl_seconds = cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            "must be greater than zero",
        ));
    }

    let directory = cache
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIRECTORY));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "cache.directory",
            "path must not be empty",
        ));
    }

    let key_prefix = cache.key_prefix.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        backend,
        ttl_seconds,
        directory,
        key_prefix,
        entry_limit: cache.entry_limit.unwrap_or(DEFAULT_CACHE_ENTRY_LIMIT),
    })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let toc_max_depth = render.toc_max_depth.unwrap_or(DEFAULT_TOC_MAX_DEPTH);
    if !(1..=6).contains(&toc_max_depth) {
        return Err(LoadError::invalid(
            "render.toc_max_depth",
            "must be between 1 and 6",
        ));
    }

    Ok(RenderSettings {
        toc_max_depth,
        inline_image_max_bytes: render
            .inline_image_max_bytes
            .unwrap_or(DEFAULT_INLINE_IMAGE_MAX_BYTES),
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let origin = site
        .origin
        .unwrap_or_else(|| DEFAULT_SITE_ORIGIN.to_string());
    let parsed = url::Url::parse(&origin)
        .map_err(|err| LoadError::invalid("site.origin", format!("`{origin}`: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(LoadError::invalid(
            "site.origin",
            format!("`{origin}` must be an absolute http(s) URL"),
        ));
    }

    Ok(SiteSettings {
        origin,
        name: site.name.unwrap_or_else(|| DEFAULT_SITE_NAME.to_string()),
        locale: site
            .locale
            .unwrap_or_else(|| DEFAULT_SITE_LOCALE.to_string()),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    root: Option<PathBuf>,
    collections: Option<Vec<String>>,
    pattern: Option<String>,
    default_author: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    backend: Option<String>,
    ttl_seconds: Option<u64>,
    directory: Option<PathBuf>,
    key_prefix: Option<String>,
    entry_limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    toc_max_depth: Option<u8>,
    inline_image_max_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    origin: Option<String>,
    name: Option<String>,
    locale: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
        assert_eq!(settings.content.collections, ["posts", "articles"]);
        assert_eq!(settings.content.pattern, "*/page.mdx");
        assert_eq!(settings.content.default_collection(), "posts");
        assert_eq!(settings.cache.backend, CacheBackend::Memory);
        assert_eq!(settings.cache.ttl_seconds, 86_400);
        assert_eq!(settings.render.toc_max_depth, 3);
        assert_eq!(settings.render.inline_image_max_bytes, 2 * 1024 * 1024);
        assert!(matches!(settings.logging.format, LogFormat::Compact));
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());
        raw.cache.backend = Some("memory".to_string());

        raw.apply_global_overrides(&GlobalOverrides {
            log_level: Some("debug".to_string()),
            cache_backend: Some("fs".to_string()),
            ..Default::default()
        });
        raw.apply_serve_overrides(&ServeArgs {
            server_port: Some(4321),
            ..Default::default()
        });
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
        assert_eq!(settings.cache.backend, CacheBackend::Fs);
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        raw.apply_global_overrides(&GlobalOverrides {
            log_json: Some(true),
            ..Default::default()
        });
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut raw = RawSettings::default();
        raw.render.toc_max_depth = Some(7);
        assert!(matches!(
            Settings::from_raw(raw),
            Err(LoadError::Invalid {
                key: "render.toc_max_depth",
                ..
            })
        ));

        let mut raw = RawSettings::default();
        raw.server.port = Some(0);
        assert!(matches!(
            Settings::from_raw(raw),
            Err(LoadError::Invalid {
                key: "server.port",
                ..
            })
        ));

        let mut raw = RawSettings::default();
        raw.cache.backend = Some("redis".to_string());
        assert!(matches!(
            Settings::from_raw(raw),
            Err(LoadError::Invalid {
                key: "cache.backend",
                ..
            })
        ));

        let mut raw = RawSettings::default();
        raw.content.collections = Some(vec!["Blog Posts".to_string()]);
        assert!(matches!(
            Settings::from_raw(raw),
            Err(LoadError::Invalid {
                key: "content.collections",
                ..
            })
        ));

        let mut raw = RawSettings::default();
        raw.site.origin = Some("ftp://example.com".to_string());
        assert!(matches!(
            Settings::from_raw(raw),
            Err(LoadError::Invalid {
                key: "site.origin",
                ..
            })
        ));
    }

    #[test]
    fn blank_author_falls_back_to_default() {
        let mut raw = RawSettings::default();
        raw.content.default_author = Some("   ".to_string());
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(settings.content.default_author, "Site Owner");
    }

    #[test]
    fn no_subcommand_means_serve() {
        let args = CliArgs::parse_from(["folio"]);
        assert!(args.command.is_none());
    }

    #[test]
    fn parse_list_arguments() {
        let args = CliArgs::parse_from(["folio", "list", "--collection", "articles", "--json"]);

        match args.command.expect("list command") {
            Command::List(list) => {
                assert_eq!(list.collection.as_deref(), Some("articles"));
                assert!(list.json);
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn parse_show_arguments_with_global_override() {
        let args = CliArgs::parse_from([
            "folio",
            "show",
            "hello-world",
            "--html",
            "--content-root",
            "/srv/content",
        ]);

        assert_eq!(
            args.overrides.content_root.as_deref(),
            Some(std::path::Path::new("/srv/content"))
        );
        match args.command.expect("show command") {
            Command::Show(show) => {
                assert_eq!(show.slug, "hello-world");
                assert!(show.collection.is_none());
                assert!(show.html);
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn parse_serve_overrides() {
        let args = CliArgs::parse_from(["folio", "serve", "--server-host", "0.0.0.0"]);

        match args.command.expect("serve command") {
            Command::Serve(serve) => {
                assert_eq!(serve.server_host.as_deref(), Some("0.0.0.0"));
                assert!(serve.server_port.is_none());
            }
            _ => panic!("wrong command parsed"),
        }
    }
}
