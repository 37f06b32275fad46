use chrono::{NaiveTime, Utc};

/// Trait pour les sources d'heure UTC utilisées pour horodater les positions
pub trait TimeSource {
    /// Heure UTC courante (heure, minute, seconde, fraction)
    fn now_utc(&self) -> NaiveTime;
}

/// Horloge système
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        SystemClock
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemClock {
    fn now_utc(&self) -> NaiveTime {
        Utc::now().time()
    }
}

/// Horloge figée (tests et rejeu)
#[cfg(test)]
pub struct FixedClock(pub NaiveTime);

#[cfg(test)]
impl TimeSource for FixedClock {
    fn now_utc(&self) -> NaiveTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_system_clock_is_utc_time_of_day() {
        let clock = SystemClock::new();
        let before = Utc::now().time();
        let t = clock.now_utc();

        assert!(t.hour() < 24);
        // Même heure à une seconde près (hors passage de minuit)
        let delta = (t - before).num_seconds().abs();
        assert!(delta <= 1 || delta >= 86_399);
    }

    #[test]
    fn test_fixed_clock() {
        let t = NaiveTime::from_hms_opt(1, 52, 0).unwrap();
        assert_eq!(FixedClock(t).now_utc(), t);
    }
}
