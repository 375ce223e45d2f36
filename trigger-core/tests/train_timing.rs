use trigger_core::clock::{ClockSource, ManualClock};
use trigger_core::config::TrainConfig;
use trigger_core::pulse::{PULSE_WIDTH_MS, PulseEvent, PulseTrainState, TrainLimit};

fn unbounded(period_ms: u32) -> PulseTrainState {
    PulseTrainState::new(TrainConfig {
        period_ms,
        limit: TrainLimit::Unbounded,
    })
}

/// Pulses observed while polling with the given step pattern, as
/// `(pulse_index, scheduled_ms, elapsed_ms)`.
fn collect_pulses(
    period_ms: u32,
    start_ms: u32,
    steps: &[u32],
    pulses: usize,
) -> Vec<(u32, u32, u32)> {
    let mut clock = ManualClock::starting_at(start_ms);
    let mut train = unbounded(period_ms);
    let mut seen = Vec::new();

    for event in &train.start(clock.now_ms()) {
        if let PulseEvent::Asserted {
            pulse_index,
            elapsed_ms,
            scheduled_ms,
            ..
        } = *event
        {
            seen.push((pulse_index, scheduled_ms, elapsed_ms));
        }
    }

    let mut step = steps.iter().copied().cycle();
    while seen.len() < pulses {
        clock.advance(step.next().unwrap_or(1));
        if let Some(PulseEvent::Asserted {
            pulse_index,
            elapsed_ms,
            scheduled_ms,
            ..
        }) = train.tick(clock.now_ms()).assertion()
        {
            seen.push((pulse_index, scheduled_ms, elapsed_ms));
        }
    }

    seen
}

#[test]
fn pulse_spacing_is_exact_for_irregular_polling() {
    let periods = [10, 11, 37, 100, 999, 1_000, 4_321];
    let patterns: [&[u32]; 5] = [&[1], &[1, 2, 3], &[3, 7, 1, 4], &[4], &[2, 1, 1, 4, 3]];

    for period in periods {
        for pattern in patterns {
            let seen = collect_pulses(period, 12_345, pattern, 50);
            for (k, (pulse_index, scheduled_ms, elapsed_ms)) in seen.iter().copied().enumerate() {
                let k = u32::try_from(k).expect("pulse count fits u32");
                assert_eq!(pulse_index, k + 1, "period {period} pattern {pattern:?}");
                assert_eq!(scheduled_ms, k * period, "period {period} pattern {pattern:?}");
                // The edge can only trail its slot by less than one poll step.
                assert!(elapsed_ms >= scheduled_ms);
                assert!(elapsed_ms - scheduled_ms < 7, "period {period} pattern {pattern:?}");
            }
        }
    }
}

#[test]
fn coarse_polling_keeps_scheduled_times() {
    // Polling slower than the period delays edges but never shifts the grid.
    for period in [10, 25, 100] {
        let step = period + 3;
        let seen = collect_pulses(period, 0, &[step], 40);
        for (k, (_, scheduled_ms, elapsed_ms)) in seen.iter().copied().enumerate() {
            let k = u32::try_from(k).expect("pulse count fits u32");
            assert_eq!(scheduled_ms, k * period);
            assert_eq!(elapsed_ms % step, 0, "edges land on poll instants");
            assert!(elapsed_ms >= scheduled_ms);
        }
    }
}

#[test]
fn late_poll_reports_actual_edge_time() {
    let mut train = unbounded(1_000);
    let _ = train.start(0);
    let _ = train.tick(5);

    assert_eq!(
        train.tick(1_013).assertion(),
        Some(PulseEvent::Asserted {
            pulse_index: 2,
            elapsed_ms: 1_013,
            scheduled_ms: 1_000,
            latency_ms: 13,
        })
    );
    // The grid is untouched by the late poll.
    assert_eq!(train.high_phase_start_ms(), 1_000);
}

#[test]
fn high_width_is_exact_under_millisecond_polling() {
    for period in [10, 50, 1_000] {
        let mut clock = ManualClock::starting_at(777);
        let mut train = unbounded(period);
        let mut rose_at = Some(clock.now_ms());
        let _ = train.start(clock.now_ms());
        let mut widths = Vec::new();

        while widths.len() < 20 {
            clock.advance(1);
            let now = clock.now_ms();
            for event in &train.tick(now) {
                match *event {
                    PulseEvent::Deasserted => {
                        let rose = rose_at.take().expect("deassert follows an assert");
                        widths.push(now.wrapping_sub(rose));
                    }
                    PulseEvent::Asserted { latency_ms, .. } => {
                        assert_eq!(latency_ms, 0);
                        assert!(rose_at.is_none(), "two HIGH edges in a row");
                        rose_at = Some(now);
                    }
                    PulseEvent::RunStateChanged { .. } => {}
                }
            }
        }

        assert!(widths.iter().all(|&width| width == PULSE_WIDTH_MS));
    }
}

#[test]
fn train_survives_counter_wraparound() {
    let start = u32::MAX - 2_500;
    let mut clock = ManualClock::starting_at(start);
    let mut train = unbounded(1_000);
    let _ = train.start(clock.now_ms());
    let mut elapsed = vec![0];

    for _ in 0..5_000 {
        clock.advance(1);
        if let Some(PulseEvent::Asserted { elapsed_ms, .. }) =
            train.tick(clock.now_ms()).assertion()
        {
            elapsed.push(elapsed_ms);
        }
    }

    assert_eq!(clock.now_ms(), 2_499);
    assert_eq!(elapsed, vec![0, 1_000, 2_000, 3_000, 4_000, 5_000]);
    assert_eq!(train.high_phase_start_ms(), start.wrapping_add(5_000));
}

#[test]
fn stopped_train_never_reasserts() {
    let mut train = unbounded(10);
    let _ = train.start(0);
    let _ = train.stop();

    for now in 0..1_000 {
        assert!(train.tick(now).is_empty());
    }
    assert!(!train.is_asserted());
    assert_eq!(train.pulse_index(), 1);
}

#[test]
fn one_second_period_scenario() {
    let mut train = unbounded(1_000);
    let mut assertions = Vec::new();
    let mut deassertions = Vec::new();

    for event in &train.start(0) {
        if let PulseEvent::Asserted { elapsed_ms, .. } = *event {
            assertions.push(elapsed_ms);
        }
    }

    for now in 1..=3_010 {
        for event in &train.tick(now) {
            match *event {
                PulseEvent::Asserted { .. } => assertions.push(now),
                PulseEvent::Deasserted => deassertions.push(now),
                PulseEvent::RunStateChanged { .. } => {}
            }
        }
    }

    assert_eq!(assertions, vec![0, 1_000, 2_000, 3_000]);
    assert_eq!(deassertions, vec![5, 1_005, 2_005, 3_005]);
}

#[test]
fn period_below_minimum_is_raised() {
    let mut train = unbounded(1_000);
    assert_eq!(train.set_period(3), 10);
    assert_eq!(train.period_ms(), 10);
    assert_eq!(train.set_period(0), 10);
    assert_eq!(train.set_period(u32::MAX), u32::MAX);
}
