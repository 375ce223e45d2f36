//! Pulse telemetry ring buffer and logging helpers.
//!
//! Every rising edge is stored in a fixed-capacity history together with how
//! late the poll loop rendered it, and mirrored to defmt (or stdout on host
//! builds) for bring-up.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use heapless::HistoryBuf;
use trigger_core::pulse::{Notifications, PulseEvent};

use crate::config::TELEMETRY_RING_CAPACITY;

/// Telemetry ring buffer type alias.
pub type TelemetryRing = HistoryBuf<PulseRecord, TELEMETRY_RING_CAPACITY>;

/// One rendered rising edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PulseRecord {
    pub pulse_index: u32,
    /// Scheduled time since train start.
    pub scheduled_ms: u32,
    /// Delay between the scheduled and the rendered edge.
    pub latency_ms: u32,
    /// Clock reading when the edge was rendered.
    pub rendered_at_ms: u32,
}

/// Records pulse edges and train run-state changes.
pub struct TelemetryRecorder {
    ring: TelemetryRing,
    max_latency_ms: u32,
}

impl TelemetryRecorder {
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            max_latency_ms: 0,
        }
    }

    /// Records every event in `notes`, rendered at `now`.
    pub fn record(&mut self, notes: &Notifications, now: u32) {
        for event in notes {
            match *event {
                PulseEvent::Asserted {
                    pulse_index,
                    scheduled_ms,
                    latency_ms,
                    ..
                } => {
                    self.ring.write(PulseRecord {
                        pulse_index,
                        scheduled_ms,
                        latency_ms,
                        rendered_at_ms: now,
                    });
                    self.max_latency_ms = self.max_latency_ms.max(latency_ms);
                    log_pulse(pulse_index, scheduled_ms, latency_ms);
                }
                PulseEvent::Deasserted => {}
                PulseEvent::RunStateChanged { running } => {
                    if running {
                        self.max_latency_ms = 0;
                    }
                    log_run_state(running, now, self.max_latency_ms);
                }
            }
        }
    }

    /// Recorded edges in chronological order.
    pub fn oldest_first(&self) -> impl Iterator<Item = &PulseRecord> {
        self.ring.oldest_ordered()
    }

    pub fn latest(&self) -> Option<&PulseRecord> {
        self.ring.recent()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Worst edge latency since the current train started.
    pub fn max_latency_ms(&self) -> u32 {
        self.max_latency_ms
    }
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "none")]
fn log_pulse(pulse_index: u32, scheduled_ms: u32, latency_ms: u32) {
    if latency_ms == 0 {
        defmt::trace!("telemetry:pulse #{} t={}ms", pulse_index, scheduled_ms);
    } else {
        defmt::warn!(
            "telemetry:pulse #{} t={}ms late={}ms",
            pulse_index,
            scheduled_ms,
            latency_ms
        );
    }
}

#[cfg(not(target_os = "none"))]
fn log_pulse(pulse_index: u32, scheduled_ms: u32, latency_ms: u32) {
    if latency_ms == 0 {
        println!("telemetry:pulse #{pulse_index} t={scheduled_ms}ms");
    } else {
        println!("telemetry:pulse #{pulse_index} t={scheduled_ms}ms late={latency_ms}ms");
    }
}

#[cfg(target_os = "none")]
fn log_run_state(running: bool, now: u32, max_latency_ms: u32) {
    if running {
        defmt::info!("telemetry:train started at={}ms", now);
    } else {
        defmt::info!(
            "telemetry:train stopped at={}ms max_late={}ms",
            now,
            max_latency_ms
        );
    }
}

#[cfg(not(target_os = "none"))]
fn log_run_state(running: bool, now: u32, max_latency_ms: u32) {
    if running {
        println!("telemetry:train started at={now}ms");
    } else {
        println!("telemetry:train stopped at={now}ms max_late={max_latency_ms}ms");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trigger_core::pulse::{PulseTrainState, TrainLimit};
    use trigger_core::config::TrainConfig;

    #[test]
    fn records_edges_with_latency() {
        let mut train = PulseTrainState::new(TrainConfig {
            period_ms: 10,
            limit: TrainLimit::Unbounded,
        });
        let mut recorder = TelemetryRecorder::new();

        recorder.record(&train.start(0), 0);
        recorder.record(&train.tick(5), 5);
        recorder.record(&train.tick(13), 13);

        let records: Vec<PulseRecord> = recorder.oldest_first().copied().collect();
        assert_eq!(
            records,
            vec![
                PulseRecord {
                    pulse_index: 1,
                    scheduled_ms: 0,
                    latency_ms: 0,
                    rendered_at_ms: 0,
                },
                PulseRecord {
                    pulse_index: 2,
                    scheduled_ms: 10,
                    latency_ms: 3,
                    rendered_at_ms: 13,
                },
            ]
        );
        assert_eq!(recorder.max_latency_ms(), 3);
    }

    #[test]
    fn ring_keeps_most_recent_edges() {
        let mut train = PulseTrainState::new(TrainConfig {
            period_ms: 10,
            limit: TrainLimit::Unbounded,
        });
        let mut recorder = TelemetryRecorder::new();
        recorder.record(&train.start(0), 0);

        let mut now = 0;
        while train.pulse_index() < 100 {
            now += 1;
            recorder.record(&train.tick(now), now);
        }

        assert_eq!(recorder.len(), TELEMETRY_RING_CAPACITY);
        assert_eq!(recorder.latest().map(|record| record.pulse_index), Some(100));
        assert_eq!(recorder.oldest_first().next().map(|record| record.pulse_index), Some(37));
    }

    #[test]
    fn restart_resets_latency_watermark() {
        let mut train = PulseTrainState::default();
        let mut recorder = TelemetryRecorder::new();
        recorder.record(&train.start(0), 0);
        recorder.record(&train.tick(1_250), 1_250);
        assert_eq!(recorder.max_latency_ms(), 250);

        recorder.record(&train.start(2_000), 2_000);
        assert_eq!(recorder.max_latency_ms(), 0);
    }
}
