use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

/// Secret used when `THREADLINE_DEV=1` and no secret is configured.
const DEV_SECRET: &str = "dev-secret-change-me";

/// Cloudinary credentials; all three must be present to enable the host.
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

pub struct GeoConfig {
    pub url: String,
    pub token: String,
}

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub cookie_secure: bool,
    /// Refuse image uploads entirely.
    pub media_disabled: bool,
    pub media_dir: PathBuf,
    pub public_url: String,
    pub cloudinary: Option<CloudinaryConfig>,
    pub geo: Option<GeoConfig>,
}

impl Config {
    /// Read configuration from `THREADLINE_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let flag = |key: &str| {
            get(key)
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false)
        };

        let dev = flag("THREADLINE_DEV");
        let jwt_secret = match get("THREADLINE_JWT_SECRET") {
            Some(secret) if !PLACEHOLDER_SECRETS.contains(&secret.as_str()) => secret,
            _ if dev => DEV_SECRET.to_string(),
            _ => bail!(
                "THREADLINE_JWT_SECRET is unset or still a placeholder. \
                 Set it in your .env file (or THREADLINE_DEV=1 for local development)."
            ),
        };

        let port = match get("THREADLINE_PORT") {
            Some(p) => p
                .parse()
                .with_context(|| format!("THREADLINE_PORT is not a port number: {}", p))?,
            None => 5000,
        };

        let cloudinary = match (
            get("THREADLINE_CLOUDINARY_CLOUD"),
            get("THREADLINE_CLOUDINARY_KEY"),
            get("THREADLINE_CLOUDINARY_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        let geo = get("THREADLINE_GEO_URL").map(|url| GeoConfig {
            url,
            token: get("THREADLINE_GEO_TOKEN").unwrap_or_default(),
        });

        Ok(Self {
            host: get("THREADLINE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: get("THREADLINE_DB_PATH")
                .unwrap_or_else(|| "threadline.db".into())
                .into(),
            jwt_secret,
            cookie_secure: flag("THREADLINE_COOKIE_SECURE"),
            media_disabled: flag("THREADLINE_MEDIA_DISABLED"),
            media_dir: get("THREADLINE_MEDIA_DIR")
                .unwrap_or_else(|| "./media".into())
                .into(),
            public_url: get("THREADLINE_PUBLIC_URL")
                .unwrap_or_else(|| "http://localhost:5000".into()),
            cloudinary,
            geo,
        })
    }
}
