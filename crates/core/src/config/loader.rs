use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

use super::{types::Config, ConfigError};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "PILA_CONFIG";

/// Config file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Prefix of per-key overrides, e.g. `PILA_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "PILA_";

/// Where the server reads its configuration from.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load the TOML file at `path`, then apply `PILA_*` environment overrides.
///
/// Nested keys use a double underscore: `PILA_QUEUE__CLAIM_MAX_ATTEMPTS=5`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::new()
        .merge(Toml::file(path))
        .merge(
            Env::prefixed(ENV_PREFIX)
                .ignore(&["CONFIG"])
                .split("__"),
        )
        .extract()
        .map_err(describe)
}

/// Parse a TOML document without environment overrides.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    Figment::from(Toml::string(toml_str))
        .extract()
        .map_err(describe)
}

/// One line per problem, each prefixed with the offending key.
fn describe(error: figment::Error) -> ConfigError {
    let problems: Vec<String> = error
        .into_iter()
        .map(|e| {
            if e.path.is_empty() {
                e.kind.to_string()
            } else {
                format!("{}: {}", e.path.join("."), e.kind)
            }
        })
        .collect();
    ConfigError::ParseError(problems.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    const COUNTER_CONFIG: &str = r#"
[auth]
method = "trusted_header"

[server]
host = "127.0.0.1"
port = 3000

[[transaction_types]]
id = 7
name = "Business Permit"
"#;

    #[test]
    fn test_from_str_reads_counter_setup() {
        let config = load_config_from_str(COUNTER_CONFIG).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.transaction_types.len(), 1);
        assert_eq!(config.transaction_types[0].name, "Business Permit");
    }

    #[test]
    fn test_missing_auth_names_the_key() {
        let err = load_config_from_str("[server]\nport = 8080\n").unwrap_err();
        match err {
            ConfigError::ParseError(message) => assert!(message.contains("auth"), "{}", message),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_type_names_the_nested_key() {
        let err = load_config_from_str("[auth]\nmethod = \"none\"\n\n[server]\nport = \"eighty\"\n")
            .unwrap_err();
        match err {
            ConfigError::ParseError(message) => {
                assert!(message.starts_with("server.port"), "{}", message)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Path::new("/nonexistent/pila.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_directory_is_not_a_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(dir.path());
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_env_overrides_file_values() {
        Jail::expect_with(|jail| {
            jail.create_file("pila.toml", COUNTER_CONFIG)?;
            jail.set_env("PILA_SERVER__PORT", "9100");
            jail.set_env("PILA_QUEUE__CLAIM_MAX_ATTEMPTS", "7");
            jail.set_env(CONFIG_PATH_ENV, "pila.toml");

            let config = load_config(&config_path()).map_err(|e| e.to_string())?;
            assert_eq!(config.server.port, 9100);
            assert_eq!(config.server.host.to_string(), "127.0.0.1");
            assert_eq!(config.queue.claim_max_attempts, 7);
            assert_eq!(config.transaction_types[0].id, 7);
            Ok(())
        });
    }

    #[test]
    fn test_config_path_defaults_without_env() {
        Jail::expect_with(|_jail| {
            std::env::remove_var(CONFIG_PATH_ENV);
            assert_eq!(config_path(), PathBuf::from(DEFAULT_CONFIG_PATH));
            Ok(())
        });
    }
}
