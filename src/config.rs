// src/config.rs

use std::env;
use dotenvy::dotenv;

use crate::engine::{CapacityPolicy, CompletionPolicy, ComposerPolicy};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    pub composer_policy: ComposerPolicy,
    /// Alternate curriculum pattern (TOML). Built-in CBSE pattern when unset.
    pub curriculum_pattern_path: Option<String>,
    pub max_drafts_per_user: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        
        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");
        
        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = parse_or("JWT_EXPIRATION", 86_400);
        
        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let port = parse_or("PORT", 3000);

        let composer_policy = ComposerPolicy {
            capacity: parse_or("SECTION_CAPACITY_POLICY", CapacityPolicy::Strict),
            completion: parse_or("COMPLETION_POLICY", CompletionPolicy::NonEmpty),
        };

        let curriculum_pattern_path = env::var("CURRICULUM_PATTERN_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty());

        let max_drafts_per_user = parse_or("MAX_DRAFTS_PER_USER", 10);
        
        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            composer_policy,
            curriculum_pattern_path,
            max_drafts_per_user,
        }
    }
}

/// Reads and parses an env var, falling back to `default` when unset.
/// A value that is set but unparsable aborts startup.
fn parse_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => default,
    }
}

fn parse_value<T>(key: &str, raw: &str) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .unwrap_or_else(|e| panic!("{} has an invalid value {:?}: {}", key, raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_policies() {
        assert_eq!(
            parse_value::<CapacityPolicy>("SECTION_CAPACITY_POLICY", " Lenient "),
            CapacityPolicy::Lenient
        );
        assert_eq!(
            parse_value::<CompletionPolicy>("COMPLETION_POLICY", "full_pattern"),
            CompletionPolicy::FullPattern
        );
    }

    #[test]
    #[should_panic(expected = "PORT has an invalid value")]
    fn garbage_port_aborts() {
        parse_value::<u16>("PORT", "eighty");
    }

    #[test]
    #[should_panic(expected = "COMPLETION_POLICY has an invalid value")]
    fn garbage_policy_aborts() {
        parse_value::<CompletionPolicy>("COMPLETION_POLICY", "sometimes");
    }
}
