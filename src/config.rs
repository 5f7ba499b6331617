use std::path::PathBuf;
use std::str::FromStr;

/// Server settings, read once at startup from `ROOMBOOK_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub bind: String,
    pub data_dir: PathBuf,
    pub password: String,
    pub max_connections: usize,
    pub compact_threshold: u64,
    pub tls_cert: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5433,
            bind: "0.0.0.0".into(),
            data_dir: PathBuf::from("./data"),
            password: "roombook".into(),
            max_connections: 256,
            compact_threshold: 1000,
            tls_cert: None,
            tls_key: None,
            metrics_port: None,
        }
    }
}

fn parsed<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable numbers fall back to their defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            port: parsed(get("ROOMBOOK_PORT"), d.port),
            bind: get("ROOMBOOK_BIND").unwrap_or(d.bind),
            data_dir: get("ROOMBOOK_DATA_DIR").map(PathBuf::from).unwrap_or(d.data_dir),
            password: get("ROOMBOOK_PASSWORD").unwrap_or(d.password),
            max_connections: parsed(get("ROOMBOOK_MAX_CONNECTIONS"), d.max_connections),
            compact_threshold: parsed(get("ROOMBOOK_COMPACT_THRESHOLD"), d.compact_threshold),
            tls_cert: get("ROOMBOOK_TLS_CERT").map(PathBuf::from),
            tls_key: get("ROOMBOOK_TLS_KEY").map(PathBuf::from),
            metrics_port: get("ROOMBOOK_METRICS_PORT").and_then(|s| s.trim().parse().ok()),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("roombook.wal")
    }

    pub fn profile_path(&self) -> PathBuf {
        self.data_dir.join("profile.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = Config::from_lookup(lookup(&[]));
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.listen_addr(), "0.0.0.0:5433");
        assert_eq!(cfg.wal_path(), PathBuf::from("./data/roombook.wal"));
    }

    #[test]
    fn variables_override_defaults() {
        let cfg = Config::from_lookup(lookup(&[
            ("ROOMBOOK_PORT", "6000"),
            ("ROOMBOOK_BIND", "127.0.0.1"),
            ("ROOMBOOK_DATA_DIR", "/var/lib/roombook"),
            ("ROOMBOOK_MAX_CONNECTIONS", "16"),
            ("ROOMBOOK_METRICS_PORT", "9100"),
            ("ROOMBOOK_TLS_CERT", "/etc/tls/cert.pem"),
        ]));
        assert_eq!(cfg.listen_addr(), "127.0.0.1:6000");
        assert_eq!(cfg.profile_path(), PathBuf::from("/var/lib/roombook/profile.json"));
        assert_eq!(cfg.max_connections, 16);
        assert_eq!(cfg.metrics_port, Some(9100));
        assert_eq!(cfg.tls_cert, Some(PathBuf::from("/etc/tls/cert.pem")));
        assert_eq!(cfg.tls_key, None);
    }

    #[test]
    fn garbage_numbers_fall_back() {
        let cfg = Config::from_lookup(lookup(&[
            ("ROOMBOOK_PORT", "not-a-port"),
            ("ROOMBOOK_COMPACT_THRESHOLD", "-5"),
            ("ROOMBOOK_METRICS_PORT", "99999"),
        ]));
        assert_eq!(cfg.port, 5433);
        assert_eq!(cfg.compact_threshold, 1000);
        assert_eq!(cfg.metrics_port, None);
    }
}
