use tracing::info;

/// Compteurs de la boucle de polling
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Cycles de polling exécutés
    pub cycles: u64,

    /// Trames TLL générées
    pub sentences: u64,

    /// Lectures de position échouées
    pub source_failures: u64,

    /// Positions impossibles à encoder
    pub encoding_failures: u64,

    /// Envois réussis (toutes sorties confondues)
    pub sink_deliveries: u64,

    /// Envois échoués (toutes sorties confondues)
    pub sink_failures: u64,

    /// Échecs consécutifs de la source (remis à 0 au premier succès)
    pub consecutive_source_failures: u32,
}

impl BridgeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_source_failure(&mut self) {
        self.source_failures += 1;
        self.consecutive_source_failures = self.consecutive_source_failures.saturating_add(1);
    }

    pub fn record_source_success(&mut self) {
        self.consecutive_source_failures = 0;
    }

    pub fn log_stats(&self) {
        info!(
            "Stats: cycles={}, sentences={}, source_failures={}, encoding_failures={}, delivered={}, sink_failures={}",
            self.cycles,
            self.sentences,
            self.source_failures,
            self.encoding_failures,
            self.sink_deliveries,
            self.sink_failures
        );
    }
}
