// src/config.rs
use crate::error::{AppError, AppResult};
use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;
use tracing::instrument;

const ENV_FILE: &str = ".env";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;

/// Middleware settings, resolved once at startup and shared read-only afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    // GCP
    pub google_application_credentials: String,
    pub gcp_project_id: String,

    // Google Workspace
    pub google_workspace_domain: String,
    pub google_drive_folder_id: String,

    // Custom GPT
    pub openai_api_key: String,
    pub custom_gpt_id: String,

    // Server
    pub host: String,
    pub port: u16,
    pub debug: bool,
}

impl Settings {
    /// Resolve settings from the process environment, with `.env` in the
    /// working directory as a fallback layer.
    pub fn load() -> AppResult<Self> {
        Self::load_from(Path::new(ENV_FILE))
    }

    /// Same as [`Settings::load`] but reads the override file from `env_file`.
    /// A missing or unreadable file is not an error.
    #[instrument(skip(env_file), fields(env_file = %env_file.display()))]
    pub fn load_from(env_file: &Path) -> AppResult<Self> {
        let source = EnvSource::read(env_file);
        Self::from_lookup(|key| source.get(key).map(str::to_owned))
    }

    /// Resolve every field against `lookup`, falling back to literal defaults.
    ///
    /// Fields are independent of each other. The only failure is a `PORT`
    /// value that is present but not a base-10 `u16`.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            google_application_credentials: string_var(
                &lookup,
                "GOOGLE_APPLICATION_CREDENTIALS",
                "",
            ),
            gcp_project_id: string_var(&lookup, "GCP_PROJECT_ID", ""),
            google_workspace_domain: string_var(&lookup, "GOOGLE_WORKSPACE_DOMAIN", ""),
            google_drive_folder_id: string_var(&lookup, "GOOGLE_DRIVE_FOLDER_ID", ""),
            openai_api_key: string_var(&lookup, "OPENAI_API_KEY", ""),
            custom_gpt_id: string_var(&lookup, "CUSTOM_GPT_ID", ""),
            host: string_var(&lookup, "HOST", DEFAULT_HOST),
            port: port_var(&lookup, "PORT", DEFAULT_PORT)?,
            debug: flag_var(&lookup, "DEBUG"),
        })
    }
}

fn string_var<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn port_var<F>(lookup: &F, key: &'static str, default: u16) -> AppResult<u16>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map_err(|source| AppError::InvalidConfigValue {
                key,
                value: raw,
                source,
            }),
    }
}

fn flag_var<F>(lookup: &F, key: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).is_some_and(|raw| raw.eq_ignore_ascii_case("true"))
}

/// Key/value layer the settings are resolved against.
///
/// Process environment wins over the override file. Names match
/// case-insensitively; an exact-case environment hit is preferred.
#[derive(Debug, Default)]
pub struct EnvSource {
    exact: HashMap<String, String>,
    folded: HashMap<String, String>,
}

impl EnvSource {
    /// Read `env_file` (best-effort) and merge the current process environment over it.
    pub fn read(env_file: &Path) -> Self {
        Self::from_parts(read_env_file(env_file), env::vars_os().map(process_entry))
    }

    pub fn from_parts<I, J>(file: I, process: J) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
        J: IntoIterator<Item = (String, String)>,
    {
        let mut source = Self::default();
        for (key, value) in file {
            source.folded.insert(key.to_ascii_uppercase(), value);
        }
        for (key, value) in process {
            source.folded.insert(key.to_ascii_uppercase(), value.clone());
            source.exact.insert(key, value);
        }
        source
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.exact
            .get(key)
            .or_else(|| self.folded.get(&key.to_ascii_uppercase()))
            .map(String::as_str)
    }
}

/// Non-UTF-8 values stay present (lossily decoded) so a bad `PORT` still fails to parse.
fn process_entry((key, value): (OsString, OsString)) -> (String, String) {
    let key = key.to_string_lossy().into_owned();
    let value = match value.into_string() {
        Ok(value) => value,
        Err(raw) => {
            tracing::warn!(key = %key, "Environment value is not valid UTF-8");
            raw.to_string_lossy().into_owned()
        }
    };
    (key, value)
}

/// Read `NAME=value` lines without touching the process environment.
///
/// Values are literal: no `$VAR` expansion, no escapes. A single pair of
/// matching surrounding quotes is stripped.
fn read_env_file(path: &Path) -> Vec<(String, String)> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No override file, using environment only");
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not read override file, ignoring it");
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        match parse_env_line(line) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => {}
            Err(()) => {
                tracing::warn!(path = %path.display(), line = index + 1, "Skipping malformed override file line");
            }
        }
    }
    tracing::debug!(path = %path.display(), entries = entries.len(), "Read override file");
    entries
}

fn parse_env_line(line: &str) -> Result<Option<(String, String)>, ()> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let line = line.strip_prefix("export ").unwrap_or(line);

    let (key, value) = line.split_once('=').ok_or(())?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return Err(());
    }
    Ok(Some((key.to_string(), unquote(value.trim()).to_string())))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
