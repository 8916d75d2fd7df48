use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rpc_url: String,
    pub ledger_contract: String,
    pub token_entries: Vec<String>,
    pub staleness_ms: i64,
    pub rpc_retry_delay_ms: u64,
    pub rpc_retry_max_elapsed_ms: u64,
    pub payment_cadence_secs: i64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let rpc_url = env_map
            .get("RPC_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("RPC_URL".to_string()))?;

        let ledger_contract = env_map
            .get("LEDGER_CONTRACT")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("LEDGER_CONTRACT".to_string()))?;

        let token_entries = parse_token_entries_from_map(&env_map)?;

        let staleness_ms = parse_numeric(&env_map, "STALENESS_MS", 30_000i64)?;
        let rpc_retry_delay_ms = parse_numeric(&env_map, "RPC_RETRY_DELAY_MS", 500u64)?;
        let rpc_retry_max_elapsed_ms =
            parse_numeric(&env_map, "RPC_RETRY_MAX_ELAPSED_MS", 5_000u64)?;
        // 30 days: the conservative default gap before a loan counts as
        // off schedule.
        let payment_cadence_secs =
            parse_numeric(&env_map, "PAYMENT_CADENCE_SECS", 2_592_000i64)?;

        Ok(Config {
            port,
            rpc_url,
            ledger_contract,
            token_entries,
            staleness_ms,
            rpc_retry_delay_ms,
            rpc_retry_max_elapsed_ms,
            payment_cadence_secs,
        })
    }
}

fn parse_numeric<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        Some(raw) => raw.parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), format!("cannot parse {:?}", raw))
        }),
        None => Ok(default),
    }
}

fn parse_token_entries_from_map(
    env_map: &HashMap<String, String>,
) -> Result<Vec<String>, ConfigError> {
    if let Some(entries_str) = env_map.get("TOKENS") {
        Ok(entries_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    } else if let Some(file_path) = env_map.get("TOKENS_FILE") {
        let content = std::fs::read_to_string(file_path).map_err(|_| {
            ConfigError::InvalidValue(
                "TOKENS_FILE".to_string(),
                "file not found or unreadable".to_string(),
            )
        })?;
        Ok(content
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    } else {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(
            "RPC_URL".to_string(),
            "https://rpc.example.invalid".to_string(),
        );
        map.insert("LEDGER_CONTRACT".to_string(), "0xcc".to_string());
        map
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.staleness_ms, 30_000);
        assert_eq!(config.rpc_retry_delay_ms, 500);
        assert_eq!(config.rpc_retry_max_elapsed_ms, 5_000);
        assert_eq!(config.payment_cadence_secs, 2_592_000);
        assert!(config.token_entries.is_empty());
    }

    #[test]
    fn test_missing_rpc_url() {
        let mut env_map = setup_required_env();
        env_map.remove("RPC_URL");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "RPC_URL"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_ledger_contract() {
        let mut env_map = setup_required_env();
        env_map.remove("LEDGER_CONTRACT");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "LEDGER_CONTRACT"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_staleness() {
        let mut env_map = setup_required_env();
        env_map.insert("STALENESS_MS".to_string(), "soon".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "STALENESS_MS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_tokens_parsed_from_list() {
        let mut env_map = setup_required_env();
        env_map.insert(
            "TOKENS".to_string(),
            "0xa:USDC:6, 0xb:DAI:18,,".to_string(),
        );
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.token_entries, vec!["0xa:USDC:6", "0xb:DAI:18"]);
    }
}
