/*!
Source de position : API HTTP du système Underwater GPS

```text
GET <base_url>/api/v1/position/global
{"lat": 56.05617, "lon": 18.9996, ...}
```

Une requête par appel, sans retry. Les échecs sont classés en
`transport` / `protocol` / `decode` pour les logs, puis ramenés à
« position indisponible » pour la boucle de polling.
*/

use crate::clock::TimeSource;
use chrono::NaiveTime;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Chemin de l'API position globale
pub const GLOBAL_POSITION_PATH: &str = "/api/v1/position/global";

/// Longueur max du corps de réponse recopié dans les logs
const MAX_BODY_PREVIEW: usize = 200;

/// Position horodatée, produite à chaque cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    /// Latitude en degrés décimaux [-90, 90]
    pub latitude: f64,

    /// Longitude en degrés décimaux [-180, 180]
    pub longitude: f64,

    /// Heure UTC de la mesure
    pub timestamp: NaiveTime,
}

/// Position brute renvoyée par la source
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GlobalPosition {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Request to {url} failed: {detail}")]
    Transport { url: String, detail: String },

    #[error("Got error {status} from {url}: {body}")]
    Protocol { url: String, status: u16, body: String },

    #[error("Invalid position from {url}: {detail}")]
    Decode { url: String, detail: String },
}

impl SourceError {
    /// Classe d'échec pour les logs
    pub fn class(&self) -> &'static str {
        match self {
            SourceError::Transport { .. } => "transport",
            SourceError::Protocol { .. } => "protocol",
            SourceError::Decode { .. } => "decode",
        }
    }
}

/// Trait pour les fournisseurs de position
pub trait PositionSource {
    /// Une seule lecture, sans retry
    fn fetch(&mut self) -> Result<GlobalPosition, SourceError>;
}

/// Lit une position et l'horodate ; `None` si la source est indisponible.
/// Tout échec est loggé avec sa classe.
pub fn fetch_position<S, T>(source: &mut S, clock: &T) -> Option<PositionSample>
where
    S: PositionSource + ?Sized,
    T: TimeSource + ?Sized,
{
    match source.fetch() {
        Ok(position) => {
            debug!("Current global position lat:{} lon:{}", position.lat, position.lon);
            Some(PositionSample {
                latitude: position.lat,
                longitude: position.lon,
                timestamp: clock.now_utc(),
            })
        }
        Err(e) => {
            warn!("Position unavailable ({}): {}", e.class(), e);
            None
        }
    }
}

/// Client HTTP bloquant vers l'API Underwater GPS
pub struct HttpPositionSource {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpPositionSource {
    /// Crée le client ; `timeout` borne chaque requête (connexion + lecture)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tll-bridge/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpPositionSource {
            client,
            url: position_url(base_url),
        })
    }

    /// Client fourni par l'appelant (tests : sans proxy)
    #[cfg(test)]
    pub fn with_client(client: reqwest::blocking::Client, base_url: &str) -> Self {
        HttpPositionSource {
            client,
            url: position_url(base_url),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PositionSource for HttpPositionSource {
    fn fetch(&mut self) -> Result<GlobalPosition, SourceError> {
        let transport = |e: reqwest::Error| SourceError::Transport {
            url: self.url.clone(),
            detail: e.to_string(),
        };

        let response = self.client.get(&self.url).send().map_err(transport)?;
        let status = response.status();
        let body = response.text().map_err(transport)?;

        if !status.is_success() {
            return Err(SourceError::Protocol {
                url: self.url.clone(),
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        decode_position(&body).map_err(|detail| SourceError::Decode {
            url: self.url.clone(),
            detail,
        })
    }
}

/// `<base_url>/api/v1/position/global`, sans double slash
pub fn position_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), GLOBAL_POSITION_PATH)
}

/// Décode le JSON et vérifie les plages de coordonnées
fn decode_position(body: &str) -> Result<GlobalPosition, String> {
    let position: GlobalPosition = serde_json::from_str(body).map_err(|e| e.to_string())?;

    if !(-90.0..=90.0).contains(&position.lat) {
        return Err(format!("latitude out of range: {}", position.lat));
    }
    if !(-180.0..=180.0).contains(&position.lon) {
        return Err(format!("longitude out of range: {}", position.lon));
    }

    Ok(position)
}

fn preview(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() > MAX_BODY_PREVIEW {
        let head: String = trimmed.chars().take(MAX_BODY_PREVIEW).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    }
}
