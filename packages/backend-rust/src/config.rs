use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// Shared secret gating the admin endpoints. When unset, the admin
    /// surface is open (single-user deployment behind a trusted network).
    pub admin_password: Option<String>,
    /// How many brand-new words the daily feed hands out at most.
    pub daily_new_words: i64,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let admin_password = std::env::var("ADMIN_PASSWORD")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let daily_new_words = std::env::var("DAILY_NEW_WORDS")
            .ok()
            .and_then(|value| value.parse::<i64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(10);

        Self {
            host,
            port,
            log_level,
            admin_password,
            daily_new_words,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
