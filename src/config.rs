//! Server configuration.
//!
//! Loaded from an optional `Outcrop.toml` in the working directory, then
//! overridden field-by-field by environment variables of the same name
//! (upper-cased). Everything has a hard default, so a bare `outcrop-server`
//! with no config file and no environment still runs.

use serde::Deserialize;
use std::path::Path;

use crate::constants::*;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub seed: u32,
    pub max_players: usize,
    pub gc_radius: f32,
    pub generation_concurrency: usize,
    pub n_create_per_tick: usize,
    pub n_remove_per_tick: usize,
    pub chunk_request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            seed: 12345,
            max_players: DEFAULT_MAX_PLAYERS,
            gc_radius: DEFAULT_GC_RADIUS,
            generation_concurrency: DEFAULT_GEN_CONCURRENCY,
            n_create_per_tick: DEFAULT_N_CREATE,
            n_remove_per_tick: DEFAULT_N_REMOVE,
            chunk_request_timeout_secs: CHUNK_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    /// Loads `Outcrop.toml` if present, then applies environment overrides.
    pub fn load() -> Self {
        let mut config = Self::from_file("Outcrop.toml").unwrap_or_default();
        config.apply_env();
        config
    }

    fn from_file(path: impl AsRef<Path>) -> Option<Self> {
        let text = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&text) {
            Ok(config) => Some(config),
            Err(err) => {
                log::warn!("failed to parse config file, using defaults: {err}");
                None
            }
        }
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_parsed::<u16>("PORT") {
            self.port = v;
        }
        if let Some(v) = env_parsed::<u32>("SEED") {
            self.seed = v;
        }
        if let Some(v) = env_parsed::<usize>("MAX_PLAYERS") {
            self.max_players = v;
        }
        if let Some(v) = env_parsed::<f32>("GC_RADIUS") {
            self.gc_radius = v;
        }
        if let Some(v) = env_parsed::<usize>("GENERATION_CONCURRENCY") {
            self.generation_concurrency = v;
        }
        if let Some(v) = env_parsed::<usize>("N_CREATE_PER_TICK") {
            self.n_create_per_tick = v;
        }
        if let Some(v) = env_parsed::<usize>("N_REMOVE_PER_TICK") {
            self.n_remove_per_tick = v;
        }
        if let Some(v) = env_parsed::<u64>("CHUNK_REQUEST_TIMEOUT_SECS") {
            self.chunk_request_timeout_secs = v;
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert!(config.max_players > 0);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = ServerConfig::from_file("/nonexistent/Outcrop.toml");
        assert!(config.is_none());
    }
}
