use anyhow::{Result, anyhow, bail};
use reqwest::Url;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com";
pub const DEFAULT_WEATHER_URL: &str = "https://api.open-meteo.com";
pub const DEFAULT_ENCYCLOPEDIA_URL: &str = "https://en.wikipedia.org";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

const CONFIG_DIR_NAME: &str = "askbox";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub geocoding_base_url: String,
    pub weather_base_url: String,
    pub encyclopedia_base_url: String,
    pub http_timeout_secs: u64,
    pub color: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFileConfig {
    geocoding_base_url: Option<String>,
    weather_base_url: Option<String>,
    encyclopedia_base_url: Option<String>,
    http_timeout_secs: Option<u64>,
    color: Option<bool>,
}

impl AppConfig {
    /// Environment beats `.env`, which beats the config file, which beats
    /// the built-in defaults. `explicit_path` must exist when given.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let config_path = match explicit_path {
            Some(path) => {
                if !path.is_file() {
                    bail!("Failed to load config {}: file not found", path.display());
                }
                path.to_path_buf()
            }
            None => discover_config_path()?,
        };
        let file_config = load_file_config(&config_path)?.unwrap_or_default();

        dotenvy::dotenv().ok();

        let geocoding_base_url = resolve_url(
            "ASKBOX_GEOCODING_URL",
            file_config.geocoding_base_url.as_deref(),
            DEFAULT_GEOCODING_URL,
            &config_path,
            "geocoding_base_url",
        )?;
        let weather_base_url = resolve_url(
            "ASKBOX_WEATHER_URL",
            file_config.weather_base_url.as_deref(),
            DEFAULT_WEATHER_URL,
            &config_path,
            "weather_base_url",
        )?;
        let encyclopedia_base_url = resolve_url(
            "ASKBOX_WIKI_URL",
            file_config.encyclopedia_base_url.as_deref(),
            DEFAULT_ENCYCLOPEDIA_URL,
            &config_path,
            "encyclopedia_base_url",
        )?;
        let http_timeout_secs = resolve_timeout(file_config.http_timeout_secs, &config_path)?;
        let color = env_non_empty("NO_COLOR").is_none() && file_config.color.unwrap_or(true);

        Ok(Self {
            geocoding_base_url,
            weather_base_url,
            encyclopedia_base_url,
            http_timeout_secs,
            color,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            geocoding_base_url: DEFAULT_GEOCODING_URL.to_string(),
            weather_base_url: DEFAULT_WEATHER_URL.to_string(),
            encyclopedia_base_url: DEFAULT_ENCYCLOPEDIA_URL.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            color: true,
        }
    }
}

fn discover_config_path() -> Result<PathBuf> {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let trimmed = xdg.trim();
        if trimmed.is_empty() {
            bail!("Failed to resolve config path: XDG_CONFIG_HOME is set but empty");
        }

        return Ok(PathBuf::from(trimmed)
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME));
    }

    let home = dirs::home_dir()
        .ok_or_else(|| anyhow!("Failed to resolve config path: HOME directory is unavailable"))?;

    Ok(home
        .join(".config")
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME))
}

fn load_file_config(config_path: &Path) -> Result<Option<RawFileConfig>> {
    if !config_path.is_file() {
        return Ok(None);
    }

    let config_text = fs::read_to_string(config_path).map_err(|err| {
        anyhow!(
            "Failed to load config {}: unable to read file: {err}",
            config_path.display()
        )
    })?;

    toml::from_str(&config_text)
        .map(Some)
        .map_err(|err| anyhow!("Failed to load config {}: {err}", config_path.display()))
}

fn resolve_url(
    env_key: &str,
    file_value: Option<&str>,
    default: &str,
    config_path: &Path,
    key_path: &str,
) -> Result<String> {
    if let Some(value) = env_non_empty(env_key) {
        return check_url(&value).map_err(|reason| anyhow!("Invalid {env_key}: {reason}"));
    }
    if let Some(value) = file_value.and_then(non_empty) {
        return check_url(value).map_err(|reason| config_error(config_path, key_path, &reason));
    }
    Ok(default.to_string())
}

fn check_url(value: &str) -> std::result::Result<String, String> {
    let url = Url::parse(value).map_err(|err| format!("invalid url '{value}': {err}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported url scheme '{}'", url.scheme()));
    }
    Ok(value.trim_end_matches('/').to_string())
}

fn resolve_timeout(file_value: Option<u64>, config_path: &Path) -> Result<u64> {
    if let Some(value) = env_non_empty("ASKBOX_HTTP_TIMEOUT_SECS") {
        return match value.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(secs),
            _ => Err(anyhow!(
                "Invalid ASKBOX_HTTP_TIMEOUT_SECS '{value}': expected a positive number of seconds"
            )),
        };
    }
    match file_value {
        Some(0) => Err(config_error(
            config_path,
            "http_timeout_secs",
            "expected a positive number of seconds",
        )),
        Some(secs) => Ok(secs),
        None => Ok(DEFAULT_HTTP_TIMEOUT_SECS),
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|value| non_empty(&value).map(ToOwned::to_owned))
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn config_error(config_path: &Path, key_path: &str, reason: &str) -> anyhow::Error {
    anyhow!(
        "Failed to load config {}: {key_path}: {reason}",
        config_path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, DEFAULT_GEOCODING_URL, DEFAULT_HTTP_TIMEOUT_SECS};
    use serial_test::serial;
    use std::env;
    use std::fs;
    use std::path::Path;

    fn reset_vars() {
        unsafe {
            env::remove_var("ASKBOX_GEOCODING_URL");
            env::remove_var("ASKBOX_WEATHER_URL");
            env::remove_var("ASKBOX_WIKI_URL");
            env::remove_var("ASKBOX_HTTP_TIMEOUT_SECS");
            env::remove_var("NO_COLOR");
            env::remove_var("XDG_CONFIG_HOME");
        }
    }

    fn with_cwd<T>(path: &Path, f: impl FnOnce() -> T) -> T {
        let cwd = env::current_dir().expect("current dir");
        env::set_current_dir(path).expect("set current dir");
        let result = f();
        env::set_current_dir(cwd).expect("restore current dir");
        result
    }

    fn write_config(root: &Path, text: &str) {
        let config_dir = root.join("askbox");
        fs::create_dir_all(&config_dir).expect("create config dir");
        fs::write(config_dir.join("config.toml"), text).expect("write config");
    }

    fn load_in(root: &Path) -> anyhow::Result<AppConfig> {
        unsafe {
            env::set_var("XDG_CONFIG_HOME", root);
        }
        with_cwd(root, || AppConfig::load(None))
    }

    #[test]
    #[serial]
    fn load_uses_defaults_without_file_or_env() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();

        let cfg = load_in(tmp.path()).expect("load config");
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.geocoding_base_url, DEFAULT_GEOCODING_URL);
        assert_eq!(cfg.http_timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
        assert!(cfg.color);
    }

    #[test]
    #[serial]
    fn load_env_overrides_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(
            tmp.path(),
            r#"
geocoding_base_url = "https://geo.example.com/"
weather_base_url = "https://weather.example.com"
http_timeout_secs = 3
"#,
        );

        reset_vars();
        unsafe {
            env::set_var("ASKBOX_WEATHER_URL", "http://127.0.0.1:8080");
            env::set_var("ASKBOX_HTTP_TIMEOUT_SECS", "25");
        }

        let cfg = load_in(tmp.path()).expect("load config");
        assert_eq!(cfg.geocoding_base_url, "https://geo.example.com");
        assert_eq!(cfg.weather_base_url, "http://127.0.0.1:8080");
        assert_eq!(cfg.encyclopedia_base_url, "https://en.wikipedia.org");
        assert_eq!(cfg.http_timeout_secs, 25);
        reset_vars();
    }

    #[test]
    #[serial]
    fn load_does_not_override_existing_os_env_with_dotenv() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::write(
            tmp.path().join(".env"),
            "ASKBOX_WIKI_URL=https://dotenv.example.com\nASKBOX_HTTP_TIMEOUT_SECS=7\n",
        )
        .expect("write env file");

        reset_vars();
        unsafe {
            env::set_var("ASKBOX_WIKI_URL", "https://os.example.com");
        }

        let cfg = load_in(tmp.path()).expect("load config");
        assert_eq!(cfg.encyclopedia_base_url, "https://os.example.com");
        assert_eq!(cfg.http_timeout_secs, 7);
        reset_vars();
    }

    #[test]
    #[serial]
    fn load_reads_explicit_path() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("custom.toml");
        fs::write(&path, "color = false\nhttp_timeout_secs = 2\n").expect("write config");
        reset_vars();

        let cfg = with_cwd(tmp.path(), || AppConfig::load(Some(&path))).expect("load config");
        assert!(!cfg.color);
        assert_eq!(cfg.http_timeout_secs, 2);
    }

    #[test]
    #[serial]
    fn load_fails_when_explicit_path_is_missing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();

        let path = tmp.path().join("missing.toml");
        let err = AppConfig::load(Some(&path)).expect_err("load should fail");
        assert!(err.to_string().contains("missing.toml: file not found"));
    }

    #[test]
    #[serial]
    fn no_color_env_disables_color() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(tmp.path(), "color = true");
        reset_vars();
        unsafe {
            env::set_var("NO_COLOR", "1");
        }

        let cfg = load_in(tmp.path()).expect("load config");
        assert!(!cfg.color);
        reset_vars();
    }

    #[test]
    #[serial]
    fn load_fails_when_xdg_config_home_is_empty() {
        reset_vars();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", "   ");
        }

        let err = AppConfig::load(None).expect_err("load should fail");
        assert!(
            err.to_string()
                .contains("Failed to resolve config path: XDG_CONFIG_HOME is set but empty")
        );
        reset_vars();
    }

    #[test]
    #[serial]
    fn load_fails_on_unknown_root_key() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(tmp.path(), "gemini_api_key = \"x\"");
        reset_vars();

        let err = load_in(tmp.path()).expect_err("load should fail");
        assert!(err.to_string().contains("Failed to load config"));
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    #[serial]
    fn load_fails_on_zero_timeout_in_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(tmp.path(), "http_timeout_secs = 0");
        reset_vars();

        let err = load_in(tmp.path()).expect_err("load should fail");
        assert!(
            err.to_string()
                .contains("http_timeout_secs: expected a positive number of seconds")
        );
    }

    #[test]
    #[serial]
    fn load_fails_on_invalid_env_timeout() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();
        unsafe {
            env::set_var("ASKBOX_HTTP_TIMEOUT_SECS", "soon");
        }

        let err = load_in(tmp.path()).expect_err("load should fail");
        assert!(err.to_string().contains("Invalid ASKBOX_HTTP_TIMEOUT_SECS 'soon'"));
        reset_vars();
    }

    #[test]
    #[serial]
    fn load_fails_on_invalid_url_in_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_config(tmp.path(), "weather_base_url = \"ftp://weather.example.com\"");
        reset_vars();

        let err = load_in(tmp.path()).expect_err("load should fail");
        assert!(
            err.to_string()
                .contains("weather_base_url: unsupported url scheme 'ftp'")
        );
    }
}
