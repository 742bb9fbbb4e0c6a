use crate::error::{AppResult, ErrorReason};
use config::{Config, Environment as ConfigEnv, File as ConfigFile};
use duration_str::deserialize_duration;
use serde::{Deserialize, Deserializer, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

mod cli;

pub use cli::Cli;

pub const DEFAULT_STOREPASS: &str = "changeit";
pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const CONFIG_NAME: &str = "truststore-doctor";
const ENV_PREFIX: &str = "TSDOCTOR";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DoctorConfig {
    #[serde(default)]
    pub jdk: Option<PathBuf>,

    #[serde(default = "default_storepass")]
    pub storepass: String,

    #[serde(default, deserialize_with = "deserialize_list")]
    pub expected: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_list")]
    pub certfiles: Vec<PathBuf>,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_timeout", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,

    #[serde(default)]
    pub tomcat: Option<PathBuf>,

    #[serde(default)]
    pub keystore: Option<PathBuf>,

    #[serde(default)]
    pub keypass: Option<String>,

    #[serde(default)]
    pub export_pem: Option<PathBuf>,
}

impl DoctorConfig {
    /// Layers defaults, the config file, `TSDOCTOR_*` variables and CLI flags.
    pub fn load(cli: &Cli) -> AppResult<Self> {
        let file = match &cli.config {
            Some(path) => ConfigFile::from(path.as_path()).required(true),
            None => ConfigFile::with_name(CONFIG_NAME).required(false),
        };
        let mut builder = Config::builder()
            .add_source(file)
            .add_source(ConfigEnv::with_prefix(ENV_PREFIX));
        for (key, value) in cli.overrides() {
            builder = builder.set_override(key, value)?;
        }

        let mut config: Self = builder.build()?.try_deserialize()?;
        if config.jdk.is_none() {
            config.jdk = std::env::var_os("JAVA_HOME")
                .filter(|home| !home.is_empty())
                .map(PathBuf::from);
        }
        Ok(config)
    }

    pub fn java_home(&self) -> AppResult<&Path> {
        self.jdk
            .as_deref()
            .ok_or_else(|| ErrorReason::MissingJavaHome.into())
    }

    pub fn keystore_password(&self) -> &str {
        self.keypass.as_deref().unwrap_or(&self.storepass)
    }
}

impl Default for DoctorConfig {
    fn default() -> Self {
        Self {
            jdk: None,
            storepass: default_storepass(),
            expected: Vec::new(),
            certfiles: Vec::new(),
            host: None,
            port: default_port(),
            timeout: default_timeout(),
            tomcat: None,
            keystore: None,
            keypass: None,
            export_pem: None,
        }
    }
}

fn default_storepass() -> String {
    DEFAULT_STOREPASS.to_owned()
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

const fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

/// Accepts either a list or a single comma-separated string.
fn deserialize_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrJoined {
        List(Vec<String>),
        Joined(String),
    }

    let items = match ListOrJoined::deserialize(deserializer)? {
        ListOrJoined::List(items) => items,
        ListOrJoined::Joined(joined) => joined.split(',').map(str::to_owned).collect(),
    };
    Ok(items
        .into_iter()
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty())
        .map(T::from)
        .collect())
}
