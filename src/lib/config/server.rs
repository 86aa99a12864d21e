use super::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Launch description for one tool-provider process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Alias used to namespace this server's tools.
    pub name: String,
    pub command: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub workdir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, command: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            workdir: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Human readable launch line, e.g. `python weather-server.py`.
    pub fn launch_line(&self) -> String {
        let mut line = self.command.display().to_string();
        if !self.args.is_empty() {
            line.push(' ');
            line.push_str(&self.args.join(" "));
        }
        line
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawServer {
    name: String,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    script: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    workdir: Option<String>,
}

impl TryFrom<RawServer> for ServerConfig {
    type Error = ConfigError;

    fn try_from(raw: RawServer) -> Result<Self, Self::Error> {
        let expand = |s: &str| -> String {
            shellexpand::full(s)
                .map(|cow| cow.into_owned())
                .unwrap_or_else(|_| s.to_string())
        };

        let mut args: Vec<String> = raw.args.iter().map(|arg| expand(arg)).collect();
        let command = match (raw.command, raw.script) {
            (Some(command), _) => PathBuf::from(expand(&command)),
            (None, Some(script)) => {
                let script = expand(&script);
                let interpreter = interpreter_for(&script).ok_or_else(|| {
                    ConfigError::UnsupportedScript {
                        name: raw.name.clone(),
                        script: script.clone(),
                    }
                })?;
                args.insert(0, script);
                PathBuf::from(interpreter)
            }
            (None, None) => {
                return Err(ConfigError::MissingCommand { name: raw.name });
            }
        };

        Ok(Self {
            name: raw.name,
            command,
            args,
            env: raw
                .env
                .iter()
                .map(|(key, value)| (key.clone(), expand(value)))
                .collect(),
            workdir: raw.workdir.map(|d| PathBuf::from(expand(&d))),
        })
    }
}

fn interpreter_for(script: &str) -> Option<&'static str> {
    match Path::new(script).extension().and_then(|ext| ext.to_str()) {
        Some("py") => Some("python"),
        Some("js") => Some("node"),
        _ => None,
    }
}
