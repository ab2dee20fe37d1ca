use std::env;
use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::io;

use fx_agent_core::DEFAULT_MAX_TOOL_TURNS;
use fx_agent_exchange::RateClient;
use fx_agent_gemini_model::{
    DEFAULT_MODEL, GeminiConfig, GeminiConfigBuilder,
};
use fx_agent_mcp::ServerCommand;

const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
const GEMINI_MODEL: &str = "GEMINI_MODEL";
const GEMINI_BASE_URL: &str = "GEMINI_BASE_URL";
const FX_RATES_BASE_URL: &str = "FX_RATES_BASE_URL";
const FX_MAX_TOOL_TURNS: &str = "FX_MAX_TOOL_TURNS";
const FX_MCP_SERVER: &str = "FX_MCP_SERVER";

const SERVER_BINARY: &str = "fx-mcp-server";

/// A configuration problem found at startup.
#[derive(Debug)]
pub enum ConfigError {
    /// A required variable is not set.
    Missing(&'static str),
    /// A variable is set to something that cannot be used.
    Invalid {
        /// The variable name.
        name: &'static str,
        /// The offending value.
        value: String,
    },
    /// The default tool server could not be located.
    ServerNotFound(io::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(name) => {
                write!(f, "{name} is not set in the environment variables")
            }
            ConfigError::Invalid { name, value } => {
                write!(f, "{name} has an invalid value: {value:?}")
            }
            ConfigError::ServerNotFound(err) => {
                write!(f, "cannot locate {SERVER_BINARY}: {err}")
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::ServerNotFound(err) => Some(err),
            _ => None,
        }
    }
}

/// Settings read once from the environment at process entry.
///
/// Blank variables count as unset.
#[derive(Clone)]
pub struct AppConfig {
    gemini_api_key: Option<String>,
    gemini_model: String,
    gemini_base_url: Option<String>,
    rates_base_url: String,
    max_tool_turns: usize,
    mcp_server: Option<ServerCommand>,
}

impl AppConfig {
    /// Reads the process environment.
    ///
    /// Call `dotenvy::dotenv()` first for `.env` files to take part.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let max_tool_turns = match var(FX_MAX_TOOL_TURNS) {
            Some(value) => {
                value.parse::<usize>().map_err(|_| ConfigError::Invalid {
                    name: FX_MAX_TOOL_TURNS,
                    value,
                })?
            }
            None => DEFAULT_MAX_TOOL_TURNS,
        };
        let mcp_server = match var(FX_MCP_SERVER) {
            Some(value) => Some(ServerCommand::parse(&value).ok_or(
                ConfigError::Invalid {
                    name: FX_MCP_SERVER,
                    value,
                },
            )?),
            None => None,
        };

        Ok(Self {
            gemini_api_key: var(GEMINI_API_KEY),
            gemini_model: var(GEMINI_MODEL)
                .unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            gemini_base_url: var(GEMINI_BASE_URL),
            rates_base_url: var(FX_RATES_BASE_URL).unwrap_or_else(|| {
                fx_agent_exchange::DEFAULT_BASE_URL.to_owned()
            }),
            max_tool_turns,
            mcp_server,
        })
    }

    /// Returns the Gemini settings. Fails if no API key is configured.
    pub fn gemini_config(&self) -> Result<GeminiConfig, ConfigError> {
        let Some(api_key) = &self.gemini_api_key else {
            return Err(ConfigError::Missing(GEMINI_API_KEY));
        };
        let mut builder = GeminiConfigBuilder::with_api_key(api_key)
            .with_model(&self.gemini_model);
        if let Some(base_url) = &self.gemini_base_url {
            builder = builder.with_base_url(base_url);
        }
        Ok(builder.build())
    }

    /// Returns the base URL of the rate service.
    #[inline]
    pub fn rates_base_url(&self) -> &str {
        &self.rates_base_url
    }

    /// Creates a client for the rate service.
    #[inline]
    pub fn rate_client(&self) -> RateClient {
        RateClient::new(&self.rates_base_url)
    }

    /// Returns how many rounds of tool calls a prompt may trigger.
    #[inline]
    pub fn max_tool_turns(&self) -> usize {
        self.max_tool_turns
    }

    /// Returns the command starting the tool server.
    ///
    /// Without `FX_MCP_SERVER`, this is the `fx-mcp-server` binary next to
    /// the running executable. Either way, the server is told which rate
    /// service to use.
    pub fn server_command(&self) -> Result<ServerCommand, ConfigError> {
        let command = match &self.mcp_server {
            Some(command) => command.clone(),
            None => {
                let exe =
                    env::current_exe().map_err(ConfigError::ServerNotFound)?;
                let file_name =
                    format!("{SERVER_BINARY}{}", env::consts::EXE_SUFFIX);
                let path = exe.with_file_name(file_name);
                ServerCommand::new(path.to_string_lossy())
            }
        };
        Ok(command.env(FX_RATES_BASE_URL, &self.rates_base_url))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let defaults = config(&[]).unwrap();
        assert_eq!(defaults.rates_base_url(), "https://api.frankfurter.dev/v1");
        assert_eq!(defaults.max_tool_turns(), 5);
        assert!(matches!(
            defaults.gemini_config(),
            Err(ConfigError::Missing("GEMINI_API_KEY"))
        ));

        let command = defaults.server_command().unwrap();
        assert!(command.program().ends_with(&format!(
            "{SERVER_BINARY}{}",
            env::consts::EXE_SUFFIX
        )));
    }

    #[test]
    fn test_overrides() {
        let overridden = config(&[
            ("GEMINI_API_KEY", "key"),
            ("GEMINI_MODEL", "gemini-2.5-pro"),
            ("GEMINI_BASE_URL", "http://127.0.0.1:9/v1beta/"),
            ("FX_RATES_BASE_URL", "http://127.0.0.1:8/v1"),
            ("FX_MAX_TOOL_TURNS", " 2 "),
            ("FX_MCP_SERVER", "cargo run -q --bin fx-mcp-server"),
        ])
        .unwrap();
        assert_eq!(overridden.max_tool_turns(), 2);

        let gemini = overridden.gemini_config().unwrap();
        assert_eq!(gemini.model(), "gemini-2.5-pro");
        assert_eq!(gemini.base_url(), "http://127.0.0.1:9/v1beta");

        let command = overridden.server_command().unwrap();
        assert_eq!(command.program(), "cargo");
        assert_eq!(command.args(), ["run", "-q", "--bin", "fx-mcp-server"]);
    }

    #[test]
    fn test_blank_and_invalid_values() {
        let blank = config(&[("GEMINI_API_KEY", "  ")]).unwrap();
        assert!(blank.gemini_config().is_err());

        let err = config(&[("FX_MAX_TOOL_TURNS", "five")])
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "FX_MAX_TOOL_TURNS has an invalid value: \"five\""
        );
    }
}
