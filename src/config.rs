use std::{net::SocketAddr, path::PathBuf, str::FromStr};

use anyhow::Context;

const DEV_SECRET_KEY: &str =
    "marquee-development-secret-key-change-me-before-deploying-anywhere-public";

/// Who becomes an admin on self-registration.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AdminPolicy {
    /// Every registered user is an admin.
    #[default]
    Everyone,
    /// Only the first registered user is an admin.
    FirstUser,
}

impl FromStr for AdminPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "everyone" => Ok(AdminPolicy::Everyone),
            "first_user" | "first-user" => Ok(AdminPolicy::FirstUser),
            other => anyhow::bail!("unknown admin policy {other:?}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub secret_key: String,
    pub static_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub admin_policy: AdminPolicy,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://store.db?mode=rwc".to_string());

        let secret_key =
            std::env::var("SECRET_KEY").unwrap_or_else(|_| DEV_SECRET_KEY.to_string());

        let static_dir: PathBuf =
            std::env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string()).into();
        let upload_dir: PathBuf =
            std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "static/movie".to_string()).into();

        let max_upload_mb: usize =
            std::env::var("MAX_UPLOAD_MB").ok().and_then(|s| s.parse().ok()).unwrap_or(16);

        let admin_policy = match std::env::var("ADMIN_POLICY") {
            Ok(raw) => raw.parse().context("ADMIN_POLICY")?,
            Err(_) => AdminPolicy::default(),
        };

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            secret_key,
            static_dir,
            upload_dir,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            admin_policy,
        })
    }
}
