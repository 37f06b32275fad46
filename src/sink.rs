/*!
Sorties des trames TLL (fan-out)

- UDP : un datagramme par trame, sans terminaison
- Série : trame + `\n`, port rouvert automatiquement après une erreur

Chaque sortie est indépendante : un échec est loggé et n'empêche pas
l'envoi sur les autres.
*/

use crate::sentence::TllSentence;
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Timeout d'écriture série (buffer de sortie plein)
const SERIAL_WRITE_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Address {0} did not resolve")]
    Unresolved(String),
}

/// Trait pour les sorties de trames
pub trait SentenceSink {
    /// Nom affiché dans les logs (ex: "udp 127.0.0.1:5500")
    fn name(&self) -> &str;

    fn send(&mut self, sentence: &TllSentence) -> Result<(), SinkError>;
}

/// Sortie UDP unicast
pub struct UdpSink {
    socket: UdpSocket,
    destination: SocketAddr,
    label: String,
}

impl UdpSink {
    /// Résout la destination et ouvre un socket sur un port éphémère
    pub fn open(host: &str, port: u16) -> Result<Self, SinkError> {
        let target = format!("{}:{}", host, port);
        let destination = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| SinkError::Unresolved(target.clone()))?;

        let unspecified = if destination.is_ipv4() {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        } else {
            IpAddr::V6(Ipv6Addr::UNSPECIFIED)
        };
        let socket = UdpSocket::bind(SocketAddr::new(unspecified, 0))?;

        info!("UDP output ready: {} ({})", target, destination);

        Ok(UdpSink {
            socket,
            destination,
            label: format!("udp {}", target),
        })
    }
}

impl SentenceSink for UdpSink {
    fn name(&self) -> &str {
        &self.label
    }

    fn send(&mut self, sentence: &TllSentence) -> Result<(), SinkError> {
        self.socket.send_to(sentence.as_bytes(), self.destination)?;
        Ok(())
    }
}

/// Sortie série avec reconnexion paresseuse
pub struct SerialSink {
    device: String,
    baud_rate: u32,
    port: Option<Box<dyn serialport::SerialPort>>,
    label: String,
}

impl SerialSink {
    /// Prépare la sortie sans ouvrir le port
    pub fn new(device: &str, baud_rate: u32) -> Self {
        SerialSink {
            device: device.to_string(),
            baud_rate,
            port: None,
            label: format!("serial {}@{}", device, baud_rate),
        }
    }

    /// Ouvre le port immédiatement ; en cas d'échec la sortie est gardée
    /// et la connexion retentée au prochain envoi
    pub fn open(device: &str, baud_rate: u32) -> Self {
        let mut sink = SerialSink::new(device, baud_rate);
        match sink.open_port() {
            Ok(port) => {
                info!("Serial output ready: {} @ {} baud", device, baud_rate);
                sink.port = Some(port);
            }
            Err(e) => {
                warn!("Failed to open serial port {}: {}", device, e);
                warn!("Will retry on next sentence");
            }
        }
        sink
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn open_port(&self) -> Result<Box<dyn serialport::SerialPort>, SinkError> {
        let port = serialport::new(&self.device, self.baud_rate)
            .timeout(SERIAL_WRITE_TIMEOUT)
            .open()?;
        Ok(port)
    }
}

impl SentenceSink for SerialSink {
    fn name(&self) -> &str {
        &self.label
    }

    fn send(&mut self, sentence: &TllSentence) -> Result<(), SinkError> {
        let mut port = match self.port.take() {
            Some(port) => port,
            None => {
                let port = self.open_port()?;
                info!("Serial port {} reopened", self.device);
                port
            }
        };

        let line = format!("{}\n", sentence);
        port.write_all(line.as_bytes())?;
        port.flush()?;

        // En cas d'erreur le handle est abandonné : réouverture au prochain envoi
        self.port = Some(port);
        Ok(())
    }
}

/// Bilan d'un envoi sur toutes les sorties
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Ensemble des sorties configurées ; les handles sont libérés au drop
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn SentenceSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        SinkSet { sinks: Vec::new() }
    }

    pub fn push(&mut self, sink: Box<dyn SentenceSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Envoie la trame sur chaque sortie, indépendamment des échecs
    pub fn dispatch(&mut self, sentence: &TllSentence) -> DispatchReport {
        let mut report = DispatchReport::default();

        for sink in self.sinks.iter_mut() {
            match sink.send(sentence) {
                Ok(()) => {
                    debug!("Sent to {}", sink.name());
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!("Failed to write to {}: {}", sink.name(), e);
                    report.failed += 1;
                }
            }
        }

        report
    }
}

impl Drop for SinkSet {
    fn drop(&mut self) {
        if !self.is_empty() {
            debug!("Closing {} output(s)", self.len());
        }
    }
}
