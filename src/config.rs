use serde::Deserialize;
use std::env;

/// Immutable settings snapshot, resolved once at startup.
///
/// Overlay order: built-in defaults < `.env` file < process environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub llm: LlmSettings,
    pub database: DatabaseSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    pub model: String,
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub default_uri: String,
    pub max_connections: usize,
    pub query_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // .env only fills variables absent from the process environment,
        // which gives the defaults < file < env overlay.
        let _ = dotenv::dotenv();

        let mut builder = config::Config::builder()
            .set_default("llm.model", "llama3.2:latest")?
            .set_default("llm.base_url", "http://localhost:11434/v1")?
            .set_default("llm.api_key", "ollama")?
            .set_default("database.default_uri", "sqlite://Chinook.db")?
            .set_default("database.max_connections", 100)?
            .set_default("database.query_timeout_secs", 30)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?;

        if let Ok(model) = env::var("LLM_MODEL") {
            builder = builder.set_override("llm.model", model)?;
        }

        if let Ok(base_url) = env::var("LLM_BASE_URL") {
            builder = builder.set_override("llm.base_url", base_url)?;
        }

        if let Ok(api_key) = env::var("LLM_API_KEY") {
            builder = builder.set_override("llm.api_key", api_key)?;
        }

        if let Ok(default_uri) = env::var("DEFAULT_DB_URI") {
            builder = builder.set_override("database.default_uri", default_uri)?;
        }

        if let Ok(max_connections) = env::var("MAX_CONNECTIONS") {
            let parsed = max_connections.parse::<i64>().map_err(|e| {
                config::ConfigError::Message(format!("invalid MAX_CONNECTIONS: {}", e))
            })?;
            builder = builder.set_override("database.max_connections", parsed)?;
        }

        if let Ok(query_timeout) = env::var("QUERY_TIMEOUT") {
            let parsed = query_timeout.parse::<i64>().map_err(|e| {
                config::ConfigError::Message(format!("invalid QUERY_TIMEOUT: {}", e))
            })?;
            builder = builder.set_override("database.query_timeout_secs", parsed)?;
        }

        if let Ok(host) = env::var("HOST") {
            builder = builder.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            let parsed = port
                .parse::<u16>()
                .map_err(|e| config::ConfigError::Message(format!("invalid PORT: {}", e)))?;
            builder = builder.set_override("server.port", parsed as i64)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests below mutate the process environment and must not interleave.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_settings_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        // Every recognized variable must be absent for the defaults to show
        for key in [
            "LLM_MODEL",
            "LLM_BASE_URL",
            "LLM_API_KEY",
            "DEFAULT_DB_URI",
            "MAX_CONNECTIONS",
            "QUERY_TIMEOUT",
            "HOST",
            "PORT",
        ] {
            env::remove_var(key);
        }

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.llm.model, "llama3.2:latest");
        assert_eq!(settings.llm.base_url, "http://localhost:11434/v1");
        assert_eq!(settings.database.default_uri, "sqlite://Chinook.db");
        assert_eq!(settings.database.max_connections, 100);
        assert_eq!(settings.database.query_timeout_secs, 30);
        assert_eq!(settings.server.port, 8000);
    }

    #[test]
    fn test_malformed_integer_fails_startup() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("MAX_CONNECTIONS", "lots");
        let result = Settings::from_env();
        env::remove_var("MAX_CONNECTIONS");
        assert!(result.is_err());
    }

    #[test]
    fn test_env_override() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("LLM_BASE_URL", "http://inference.internal:8080/v1");
        let settings = Settings::from_env();
        env::remove_var("LLM_BASE_URL");
        assert_eq!(
            settings.unwrap().llm.base_url,
            "http://inference.internal:8080/v1"
        );
    }
}
