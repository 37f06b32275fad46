/*!
Boucle de polling : lecture position → trame TLL → sorties

Deux états : lecture (un seul fetch) puis attente (délai fixe), quel que
soit le résultat de la lecture. Le backoff exponentiel est optionnel et ne
s'applique qu'après des échecs consécutifs de la source.

L'arrêt est coopératif : le flag est vérifié entre deux cycles et pendant
l'attente ; un cycle commencé va toujours à son terme.
*/

use crate::clock::TimeSource;
use crate::config::PollConfig;
use crate::sentence::TllBuilder;
use crate::sink::{DispatchReport, SinkSet};
use crate::source::{self, PositionSource};
use crate::stats::BridgeStats;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Log des stats tous les N cycles
const STATS_LOG_CYCLES: u64 = 60;

/// Granularité de l'attente interruptible
const WAIT_SLICE: Duration = Duration::from_millis(100);

/// Politique de cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub backoff: bool,
    pub max_interval: Duration,
}

impl PollPolicy {
    /// Délai avant le prochain cycle après `consecutive_failures` échecs de la source
    /// min(interval * 2^n, max_interval) si backoff, sinon interval
    pub fn delay_after(&self, consecutive_failures: u32) -> Duration {
        if !self.backoff || consecutive_failures == 0 {
            return self.interval;
        }

        let factor = 2u32.saturating_pow(consecutive_failures);
        self.interval
            .saturating_mul(factor)
            .min(self.max_interval)
    }
}

impl From<&PollConfig> for PollPolicy {
    fn from(config: &PollConfig) -> Self {
        PollPolicy {
            interval: Duration::from_millis(config.interval_ms),
            backoff: config.backoff,
            max_interval: Duration::from_millis(config.max_interval_ms),
        }
    }
}

/// Résultat d'un cycle de polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Trame générée et envoyée (éventuellement avec des échecs de sortie)
    Sent(DispatchReport),

    /// Source indisponible, aucune trame ce cycle
    SourceUnavailable,

    /// Position non encodable, aucune trame ce cycle
    EncodingFailed,
}

/// Contexte de la boucle : possède la source, l'horloge et les sorties
pub struct PollLoop<S: PositionSource, T: TimeSource> {
    source: S,
    clock: T,
    builder: TllBuilder,
    sinks: SinkSet,
    policy: PollPolicy,
    stats: BridgeStats,
}

impl<S: PositionSource, T: TimeSource> PollLoop<S, T> {
    pub fn new(source: S, clock: T, builder: TllBuilder, sinks: SinkSet, policy: PollPolicy) -> Self {
        PollLoop {
            source,
            clock,
            builder,
            sinks,
            policy,
            stats: BridgeStats::new(),
        }
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    /// Un cycle complet : fetch → build → dispatch
    pub fn run_cycle(&mut self) -> CycleOutcome {
        self.stats.cycles += 1;

        let Some(sample) = source::fetch_position(&mut self.source, &self.clock) else {
            self.stats.record_source_failure();
            return CycleOutcome::SourceUnavailable;
        };
        self.stats.record_source_success();

        let sentence = match self
            .builder
            .build(sample.latitude, sample.longitude, sample.timestamp)
        {
            Ok(sentence) => sentence,
            Err(e) => {
                error!("Skipping cycle: {}", e);
                self.stats.encoding_failures += 1;
                return CycleOutcome::EncodingFailed;
            }
        };

        self.stats.sentences += 1;
        info!("{}", sentence);

        let report = self.sinks.dispatch(&sentence);
        self.stats.sink_deliveries += report.delivered as u64;
        self.stats.sink_failures += report.failed as u64;

        CycleOutcome::Sent(report)
    }

    /// Délai avant le prochain cycle selon l'état courant
    pub fn next_delay(&self) -> Duration {
        self.policy.delay_after(self.stats.consecutive_source_failures)
    }

    /// Boucle jusqu'à ce que `shutdown` passe à true
    pub fn run(&mut self, shutdown: &AtomicBool) {
        info!(
            "Polling every {:?} (backoff: {})",
            self.policy.interval, self.policy.backoff
        );

        while !shutdown.load(Ordering::SeqCst) {
            let outcome = self.run_cycle();

            if self.stats.cycles % STATS_LOG_CYCLES == 0 {
                self.stats.log_stats();
            }

            let delay = self.next_delay();
            if outcome == CycleOutcome::SourceUnavailable && delay > self.policy.interval {
                debug!(
                    "Source unavailable {} times in a row, next poll in {:?}",
                    self.stats.consecutive_source_failures, delay
                );
            }

            if !idle_wait(delay, shutdown) {
                break;
            }
        }

        info!("Shutdown requested, poll loop stopped");
        self.stats.log_stats();
    }
}

/// Attend `delay` par tranches ; retourne false si l'arrêt a été demandé
fn idle_wait(delay: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + delay;

    loop {
        if shutdown.load(Ordering::SeqCst) {
            return false;
        }

        let now = Instant::now();
        if now >= deadline {
            return true;
        }

        std::thread::sleep(WAIT_SLICE.min(deadline - now));
    }
}
