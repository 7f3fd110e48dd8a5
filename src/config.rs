use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub model_dir: PathBuf,
    /// Exposes `/metrics` and records score and host usage metrics.
    pub metrics_enabled: bool,
    /// Answer errors with 200 instead of a 4xx/5xx status.
    pub legacy_status_codes: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr = lookup("SERVER_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8080".into())
            .parse()
            .unwrap_or_else(|_| SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080));

        let model_dir = PathBuf::from(lookup("MODEL_DIR").unwrap_or_else(|| "models".to_string()));

        let metrics_enabled = lookup("FLAG").map(|v| parse_flag(&v)).unwrap_or(false);
        let legacy_status_codes = lookup("LEGACY_STATUS_CODES")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);

        Ok(Self {
            listen_addr,
            model_dir,
            metrics_enabled,
            legacy_status_codes,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
            model_dir: PathBuf::from("models"),
            metrics_enabled: false,
            legacy_status_codes: false,
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = config_from(&[]);
        assert_eq!(config.listen_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.model_dir, PathBuf::from("models"));
        assert!(!config.metrics_enabled);
        assert!(!config.legacy_status_codes);
    }

    #[test]
    fn flag_is_case_insensitive() {
        assert!(config_from(&[("FLAG", "True")]).metrics_enabled);
        assert!(config_from(&[("FLAG", "TRUE")]).metrics_enabled);
        assert!(!config_from(&[("FLAG", "1")]).metrics_enabled);
        assert!(!config_from(&[("FLAG", "False")]).metrics_enabled);
    }

    #[test]
    fn overrides_are_read() {
        let config = config_from(&[
            ("SERVER_ADDR", "0.0.0.0:8000"),
            ("MODEL_DIR", "/srv/models"),
            ("LEGACY_STATUS_CODES", "true"),
        ]);
        assert_eq!(config.listen_addr.port(), 8000);
        assert_eq!(config.model_dir, PathBuf::from("/srv/models"));
        assert!(config.legacy_status_codes);
    }

    #[test]
    fn bad_address_falls_back_to_localhost() {
        let config = config_from(&[("SERVER_ADDR", "not-an-address")]);
        assert_eq!(config.listen_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
    }
}
