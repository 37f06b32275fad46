/*!
Construction des trames NMEA 0183 `$RATLL` (Target Latitude/Longitude)

```text
$RATLL,01,5603.370,N,01859.976,E,ROV,015200,T*XX

01            Numéro de cible
5603.370,N    Latitude
01859.976,E   Longitude
ROV           Nom de la cible
015200        Heure UTC hhmmss[.ss]
T             Statut (T = tracked)
*XX           Checksum
```

Le checksum est le XOR de tous les octets entre `$` et `*` (exclus),
en deux chiffres hexadécimaux majuscules.

Par défaut l'heure est émise sans centièmes (`hhmmss`), comme les
traceurs existants ; `fractional_seconds` active le suffixe `.ss`.
*/

use crate::config::SentenceConfig;
use crate::coordinate::{self, LATITUDE_DEGREE_WIDTH, LONGITUDE_DEGREE_WIDTH};
use chrono::{NaiveTime, Timelike};
use std::fmt;
use thiserror::Error;

/// Talker (RA = radar) + type de trame
pub const SENTENCE_HEADER: &str = "RATLL";

/// Erreurs de construction de trame
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TllError {
    #[error("Cannot encode non-finite {axis}: {value}")]
    Encoding { axis: &'static str, value: f64 },
}

/// Trame TLL complète et immuable (`$...*HH`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TllSentence(String);

impl TllSentence {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Corps de la trame entre `$` et `*`
    #[cfg(test)]
    pub fn body(&self) -> &str {
        let end = self.0.rfind('*').unwrap_or(self.0.len());
        &self.0[1..end]
    }
}

impl fmt::Display for TllSentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checksum NMEA : XOR de chaque octet du corps
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0u8, |acc, b| acc ^ b)
}

/// Paramètres fixes des trames émises
#[derive(Debug, Clone)]
pub struct TllBuilder {
    target_id: String,
    target_name: String,
    status: char,
    fractional_seconds: bool,
}

impl TllBuilder {
    /// Cible "01", heure sans centièmes
    pub fn new(target_name: impl Into<String>, status: char) -> Self {
        TllBuilder {
            target_id: "01".to_string(),
            target_name: target_name.into(),
            status,
            fractional_seconds: false,
        }
    }

    pub fn with_target_id(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = target_id.into();
        self
    }

    pub fn with_fractional_seconds(mut self, enabled: bool) -> Self {
        self.fractional_seconds = enabled;
        self
    }

    /// Construit la trame pour une position et une heure UTC
    pub fn build(
        &self,
        latitude: f64,
        longitude: f64,
        time: NaiveTime,
    ) -> Result<TllSentence, TllError> {
        if !latitude.is_finite() {
            return Err(TllError::Encoding {
                axis: "latitude",
                value: latitude,
            });
        }
        if !longitude.is_finite() {
            return Err(TllError::Encoding {
                axis: "longitude",
                value: longitude,
            });
        }

        let lat = coordinate::encode_latitude(latitude);
        let lon = coordinate::encode_longitude(longitude);

        let body = format!(
            "{},{},{},{},{},{},{},{},{}",
            SENTENCE_HEADER,
            self.target_id,
            lat.field(LATITUDE_DEGREE_WIDTH),
            lat.hemisphere,
            lon.field(LONGITUDE_DEGREE_WIDTH),
            lon.hemisphere,
            self.target_name,
            self.format_time(time),
            self.status
        );

        Ok(TllSentence(format!("${}*{:02X}", body, checksum(&body))))
    }

    fn format_time(&self, time: NaiveTime) -> String {
        let hhmmss = format!("{:02}{:02}{:02}", time.hour(), time.minute(), time.second());
        if !self.fractional_seconds {
            return hhmmss;
        }

        // Les secondes intercalaires (nanos >= 1e9) restent plafonnées à .99
        let centis = (time.nanosecond() / 10_000_000).min(99);
        format!("{}.{:02}", hhmmss, centis)
    }
}

impl From<&SentenceConfig> for TllBuilder {
    fn from(config: &SentenceConfig) -> Self {
        let status = config.status.chars().next().unwrap_or('T');
        TllBuilder::new(config.target_name.clone(), status)
            .with_target_id(config.target_id.clone())
            .with_fractional_seconds(config.fractional_seconds)
    }
}
