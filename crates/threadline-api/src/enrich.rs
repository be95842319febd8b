//! Login enrichment: client address, device info and an optional geo lookup.
//! Everything here is stored for later inspection and never affects auth.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{HeaderMap, header, request::Parts};
use tracing::{debug, warn};
use uuid::Uuid;

use threadline_db::Database;
use threadline_db::models::LoginRecord;

const GEO_TIMEOUT: Duration = Duration::from_secs(3);

/// Who is on the other end of a request.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientMeta {
    fn from_parts(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let ip = header_str("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| header_str("x-real-ip"))
            .map(str::to_string)
            .or_else(|| peer.map(|addr| addr.ip().to_string()));

        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self { ip, user_agent }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ClientMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::from_parts(&parts.headers, peer))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub browser: Option<&'static str>,
    pub os: Option<&'static str>,
    pub device: String,
}

impl DeviceInfo {
    pub fn from_user_agent(ua: Option<&str>) -> Self {
        let ua = ua.unwrap_or_default();

        // Order matters: Edge and Opera also claim Chrome, Chrome claims Safari
        let browser = if ua.contains("Edg/") {
            Some("Edge")
        } else if ua.contains("OPR/") || ua.contains("Opera") {
            Some("Opera")
        } else if ua.contains("Firefox/") {
            Some("Firefox")
        } else if ua.contains("Chrome/") || ua.contains("CriOS/") {
            Some("Chrome")
        } else if ua.contains("Safari/") {
            Some("Safari")
        } else {
            None
        };

        let os = if ua.contains("Windows") {
            Some("Windows")
        } else if ua.contains("Android") {
            Some("Android")
        } else if ua.contains("iPhone") || ua.contains("iPad") {
            Some("iOS")
        } else if ua.contains("Mac OS X") {
            Some("macOS")
        } else if ua.contains("Linux") {
            Some("Linux")
        } else {
            None
        };

        let device = if ua.contains("iPhone") {
            "iPhone".to_string()
        } else if ua.contains("iPad") {
            "iPad".to_string()
        } else {
            android_model(ua).unwrap_or_else(|| "Unknown Device".to_string())
        };

        Self { browser, os, device }
    }
}

/// `... (Linux; Android 13; Pixel 7 Build/TQ3A) ...` -> `Pixel 7`
fn android_model(ua: &str) -> Option<String> {
    let start = ua.find("Android")?;
    let platform = ua[start..].split(')').next()?;
    let model = platform.split(';').nth(1)?.trim();
    let model = model.split(" Build").next()?.trim();
    (!model.is_empty() && model != "K").then(|| model.to_string())
}

struct GeoLookup {
    client: reqwest::Client,
    url: String,
    token: String,
}

pub struct Enricher {
    geo: Option<GeoLookup>,
}

impl Enricher {
    pub fn new(geo_url: &str, geo_token: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(GEO_TIMEOUT).build()?;
        Ok(Self {
            geo: Some(GeoLookup {
                client,
                url: geo_url.trim_end_matches('/').to_string(),
                token: geo_token.to_string(),
            }),
        })
    }

    /// Device info only; no outbound lookups.
    pub fn disabled() -> Self {
        Self { geo: None }
    }

    /// Raw JSON location for a public IP. Any failure yields `None`.
    pub async fn lookup_location(&self, ip: Option<&str>) -> Option<String> {
        let geo = self.geo.as_ref()?;
        let ip = ip?;
        if !is_public(ip) {
            debug!("Skipping geo lookup for non-public address {}", ip);
            return None;
        }

        let url = format!("{}/{}", geo.url, ip);
        let response = geo
            .client
            .get(&url)
            .query(&[("token", geo.token.as_str())])
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match response {
            Ok(r) => match r.json::<serde_json::Value>().await {
                Ok(body) => Some(body.to_string()),
                Err(e) => {
                    warn!("Geo lookup for {} returned bad JSON: {}", ip, e);
                    None
                }
            },
            Err(e) => {
                warn!("Geo lookup for {} failed: {}", ip, e);
                None
            }
        }
    }

    /// Store a login record for `user_id`.
    pub async fn record_login(
        &self,
        db: Arc<Database>,
        user_id: Uuid,
        meta: ClientMeta,
    ) -> anyhow::Result<()> {
        let device = DeviceInfo::from_user_agent(meta.user_agent.as_deref());
        let location = self.lookup_location(meta.ip.as_deref()).await;

        tokio::task::spawn_blocking(move || {
            db.insert_login(&LoginRecord {
                id: &Uuid::new_v4().to_string(),
                user_id: &user_id.to_string(),
                ip: meta.ip.as_deref(),
                browser: device.browser,
                os: device.os,
                device: Some(device.device.as_str()),
                location: location.as_deref(),
            })
        })
        .await??;

        Ok(())
    }
}

fn is_public(ip: &str) -> bool {
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        Ok(IpAddr::V6(v6)) => !(v6.is_loopback() || v6.is_unspecified()),
        Err(_) => false,
    }
}
