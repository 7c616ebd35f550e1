//! Driver settings.
//!
//! The embedded `config.toml` provides every default. A user file only
//! needs to declare the keys it overrides.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Couldn't read config {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config {origin}")]
    Parse {
        origin: Arc<str>,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    log_level: Option<String>,
    client_name: Option<String>,
    port: Option<String>,
    profile: Option<String>,
    #[serde(default)]
    demo: DemoFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DemoFile {
    buses: Option<usize>,
    patterns_per_bus: Option<usize>,
}

impl ConfigFile {
    fn parse(contents: &str, origin: &str) -> Result<Self, Error> {
        toml::from_str(contents).map_err(|source| Error::Parse {
            origin: origin.into(),
            source,
        })
    }

    fn merge(&mut self, user: ConfigFile) {
        fn over<T>(base: &mut Option<T>, user: Option<T>) {
            if user.is_some() {
                *base = user;
            }
        }

        over(&mut self.log_level, user.log_level);
        over(&mut self.client_name, user.client_name);
        over(&mut self.port, user.port);
        over(&mut self.profile, user.profile);
        over(&mut self.demo.buses, user.demo.buses);
        over(&mut self.demo.patterns_per_bus, user.demo.patterns_per_bus);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_level: log::LevelFilter,
    pub client_name: String,
    pub port: String,
    pub profile: String,
    pub buses: usize,
    pub patterns_per_bus: usize,
}

impl Config {
    /// Loads the defaults, overridden by the file at `path` if any.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut base = ConfigFile::parse(DEFAULT_CONFIG, "(embedded)")?;

        if let Some(path) = path {
            let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
                path: path.to_owned(),
                source,
            })?;
            base.merge(ConfigFile::parse(&contents, &path.display().to_string())?);
        }

        Ok(Self::from_file(base))
    }

    fn from_file(file: ConfigFile) -> Self {
        let log_level = match file.log_level.as_deref().map(str::parse) {
            Some(Ok(level)) => level,
            Some(Err(_)) => {
                log::warn!(target: "config", "unknown log_level {:?}, using debug", file.log_level);
                log::LevelFilter::Debug
            }
            None => log::LevelFilter::Debug,
        };

        Config {
            log_level,
            client_name: file
                .client_name
                .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string()),
            port: file.port.unwrap_or_default(),
            profile: file.profile.unwrap_or_default(),
            buses: file.demo.buses.unwrap_or(4),
            patterns_per_bus: file.demo.patterns_per_bus.unwrap_or(3),
        }
    }
}
