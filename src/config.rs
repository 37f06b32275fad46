use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use anyhow::{Context, Result};

/// Configuration du pont position → NMEA TLL
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// Source de position (Underwater GPS)
    #[serde(default)]
    pub source: SourceConfig,

    /// Sorties UDP / série
    #[serde(default)]
    pub output: OutputConfig,

    /// Cadence de polling
    #[serde(default)]
    pub poll: PollConfig,

    /// Champs fixes de la trame TLL
    #[serde(default)]
    pub sentence: SentenceConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceConfig {
    /// URL de base du système (ex: "http://192.168.2.94")
    /// La position est lue sur `<base_url>/api/v1/position/global`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout d'une requête HTTP en millisecondes
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct OutputConfig {
    /// Sortie UDP (désactivée si absente)
    pub udp: Option<UdpOutputConfig>,

    /// Sortie série (désactivée si absente)
    pub serial: Option<SerialOutputConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UdpOutputConfig {
    /// Hôte destinataire (ex: "127.0.0.1" pour OpenCPN en local)
    #[serde(default = "default_udp_host")]
    pub host: String,

    /// Port destinataire
    #[serde(default = "default_udp_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SerialOutputConfig {
    /// Port série (ex: "COM1" sur Windows, "/dev/ttyUSB0" sur Linux)
    pub device: String,

    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PollConfig {
    /// Intervalle entre deux lectures de position (ms)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Backoff exponentiel quand la source est indisponible
    #[serde(default = "default_false")]
    pub backoff: bool,

    /// Plafond du backoff (ms)
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SentenceConfig {
    /// Numéro de cible (2 chiffres)
    #[serde(default = "default_target_id")]
    pub target_id: String,

    /// Nom de la cible affiché par le traceur
    #[serde(default = "default_target_name")]
    pub target_name: String,

    /// Statut de suivi (1 caractère, "T" = tracked)
    #[serde(default = "default_status")]
    pub status: String,

    /// Ajouter les centièmes de seconde au champ heure
    #[serde(default = "default_false")]
    pub fractional_seconds: bool,
}

// Fonctions par défaut pour serde
fn default_base_url() -> String { "http://demo.waterlinked.com".to_string() }
fn default_timeout_ms() -> u64 { 2000 }
fn default_udp_host() -> String { "127.0.0.1".to_string() }
fn default_udp_port() -> u16 { 5500 }
fn default_baud_rate() -> u32 { 9600 }
fn default_interval_ms() -> u64 { 1000 }
fn default_max_interval_ms() -> u64 { 30_000 }
fn default_target_id() -> String { "01".to_string() }
fn default_target_name() -> String { "ROV".to_string() }
fn default_status() -> String { "T".to_string() }
fn default_false() -> bool { false }

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for UdpOutputConfig {
    fn default() -> Self {
        UdpOutputConfig {
            host: default_udp_host(),
            port: default_udp_port(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            interval_ms: default_interval_ms(),
            backoff: false,
            max_interval_ms: default_max_interval_ms(),
        }
    }
}

impl Default for SentenceConfig {
    fn default() -> Self {
        SentenceConfig {
            target_id: default_target_id(),
            target_name: default_target_name(),
            status: default_status(),
            fractional_seconds: false,
        }
    }
}

impl Config {
    /// Charge la configuration depuis un fichier TOML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Sauvegarde la configuration dans un fichier TOML
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(path.as_ref(), content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Valide la configuration
    fn validate(&self) -> Result<()> {
        // Au moins une sortie
        if self.output.udp.is_none() && self.output.serial.is_none() {
            anyhow::bail!("No output configured: set [output.udp] and/or [output.serial]");
        }

        if self.source.base_url.trim().is_empty() {
            anyhow::bail!("Invalid source: base_url must not be empty");
        }

        if self.source.timeout_ms == 0 {
            anyhow::bail!("Invalid source: timeout_ms must be greater than 0");
        }

        if let Some(ref udp) = self.output.udp {
            if udp.host.trim().is_empty() {
                anyhow::bail!("Invalid UDP output: host must not be empty");
            }
        }

        if let Some(ref serial) = self.output.serial {
            if serial.device.trim().is_empty() {
                anyhow::bail!("Invalid serial output: device must not be empty");
            }
            if serial.baud_rate == 0 {
                anyhow::bail!("Invalid serial output: baud_rate must be greater than 0");
            }
        }

        // Validation du polling
        if self.poll.interval_ms == 0 {
            anyhow::bail!("Invalid poll: interval_ms must be greater than 0");
        }
        if self.poll.max_interval_ms < self.poll.interval_ms {
            anyhow::bail!("Invalid poll: max_interval_ms must be >= interval_ms");
        }

        // Les champs de la trame ne doivent pas casser le framing NMEA
        let sentence = &self.sentence;
        if sentence.target_id.len() != 2 || !sentence.target_id.bytes().all(|b| b.is_ascii_digit()) {
            anyhow::bail!("Invalid sentence: target_id must be two digits");
        }
        if !is_valid_field(&sentence.target_name) {
            anyhow::bail!("Invalid sentence: target_name must be non-empty printable ASCII without ',', '*' or '$'");
        }
        if sentence.status.chars().count() != 1 || !is_valid_field(&sentence.status) {
            anyhow::bail!("Invalid sentence: status must be a single printable ASCII character");
        }

        Ok(())
    }

    /// Crée un fichier de configuration exemple
    pub fn create_example_config<P: AsRef<Path>>(path: P) -> Result<()> {
        // Mêmes sorties que l'outil historique : UDP local actif, série désactivée
        let example_config = Config {
            source: SourceConfig::default(),
            output: OutputConfig {
                udp: Some(UdpOutputConfig::default()),
                serial: None,
            },
            poll: PollConfig::default(),
            sentence: SentenceConfig::default(),
        };

        example_config.to_file(path)
    }
}

fn is_valid_field(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| (0x20..0x7f).contains(&b) && !matches!(b, b',' | b'*' | b'$'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_udp() -> Config {
        Config {
            output: OutputConfig {
                udp: Some(UdpOutputConfig::default()),
                serial: None,
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source.base_url, "http://demo.waterlinked.com");
        assert_eq!(config.poll.interval_ms, 1000);
        assert!(!config.poll.backoff);
        assert_eq!(config.sentence.target_id, "01");
        assert_eq!(config.sentence.target_name, "ROV");
        assert_eq!(config.sentence.status, "T");
        assert!(!config.sentence.fractional_seconds);
    }

    #[test]
    fn test_no_output_rejected() {
        let config = Config::default();
        assert!(config.validate().is_err());
        assert!(config_with_udp().validate().is_ok());
    }

    #[test]
    fn test_serial_only_accepted() {
        let mut config = Config::default();
        config.output.serial = Some(SerialOutputConfig {
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
        });
        assert!(config.validate().is_ok());

        config.output.serial.as_mut().unwrap().baud_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = config_with_udp();

        // Intervalle invalide
        config.poll.interval_ms = 0;
        assert!(config.validate().is_err());

        config.poll.interval_ms = 5000;
        config.poll.max_interval_ms = 1000;
        assert!(config.validate().is_err());

        config.poll.max_interval_ms = 5000;
        assert!(config.validate().is_ok());

        config.source.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sentence_field_validation() {
        let mut config = config_with_udp();

        config.sentence.target_id = "1".to_string();
        assert!(config.validate().is_err());
        config.sentence.target_id = "AB".to_string();
        assert!(config.validate().is_err());
        config.sentence.target_id = "02".to_string();
        assert!(config.validate().is_ok());

        config.sentence.target_name = "R,OV".to_string();
        assert!(config.validate().is_err());
        config.sentence.target_name = "ROV*".to_string();
        assert!(config.validate().is_err());
        config.sentence.target_name = String::new();
        assert!(config.validate().is_err());
        config.sentence.target_name = "BOKO".to_string();

        config.sentence.status = "TT".to_string();
        assert!(config.validate().is_err());
        config.sentence.status = "L".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [output.udp]
            port = 10110
            "#,
        )
        .unwrap();

        let udp = config.output.udp.as_ref().unwrap();
        assert_eq!(udp.host, "127.0.0.1");
        assert_eq!(udp.port, 10110);
        assert!(config.output.serial.is_none());
        assert_eq!(config.source.timeout_ms, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        Config::create_example_config(&path).unwrap();
        let config = Config::from_file(&path).unwrap();

        assert!(config.output.udp.is_some());
        assert!(config.output.serial.is_none());
        assert_eq!(config.output.udp.unwrap().port, 5500);
    }

    #[test]
    fn test_from_file_rejects_missing_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[source]\nbase_url = \"http://192.168.2.94\"\n").unwrap();

        assert!(Config::from_file(&path).is_err());
    }
}
