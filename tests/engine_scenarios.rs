// End to end scenarios for the penalty engine
//
// Each test drives a PenaltyEngine with hand built telemetry samples and checks the cut
// events, ledger state and notifications it produces.

use pitlane_penalty::{
    CalendarDay, CutEvent, Notification, PenaltyConfig, PenaltyEngine, PenaltyMode, SessionInfo,
    SessionKind, TelemetrySample, TickReport,
    engine::{Flag, LightsFrame, TextColour},
};

const WEDNESDAY: CalendarDay = CalendarDay {
    weekday: 2,
    day_of_month: 14,
};

fn session_info() -> SessionInfo {
    SessionInfo {
        player_name: "Tester".to_string(),
        car_name: "gt3".to_string(),
        track_name: "spa".to_string(),
        number_of_laps: 12,
        ..SessionInfo::default()
    }
}

fn engine(config: PenaltyConfig) -> PenaltyEngine {
    PenaltyEngine::new(config, session_info(), WEDNESDAY, 0.)
}

fn no_lights() -> PenaltyConfig {
    PenaltyConfig {
        use_start_lights: false,
        ..PenaltyConfig::default()
    }
}

fn sample(session: SessionKind, lap: u32, tyres_out: u8, speed_kmh: f32) -> TelemetrySample {
    TelemetrySample {
        delta_s: 0.1,
        session,
        lap,
        tyres_out,
        speed_kmh,
        ..TelemetrySample::default()
    }
}

fn chat_wires(reports: &[TickReport]) -> Vec<String> {
    reports
        .iter()
        .flat_map(|r| r.notifications.iter())
        .filter_map(|n| match n {
            Notification::Chat { message } => Some(message.wire.clone()),
            _ => None,
        })
        .collect()
}

/// Runs one counted cut in a race: two ticks off track, then back on, then a long pause
/// so the next cut is not debounced.
fn race_cut(engine: &mut PenaltyEngine, lap: u32) -> Vec<TickReport> {
    let mut reports = vec![
        engine.tick(&sample(SessionKind::Race, lap, 4, 150.)),
        engine.tick(&sample(SessionKind::Race, lap, 4, 150.)),
        engine.tick(&sample(SessionKind::Race, lap, 0, 150.)),
    ];
    assert_eq!(reports[2].cut_event, CutEvent::CutEndedPenalizable);
    reports.push(engine.tick(&TelemetrySample {
        delta_s: 11.,
        ..sample(SessionKind::Race, lap, 0, 150.)
    }));
    reports
}

#[test]
fn short_cut_at_constant_speed_is_penalizable() {
    let mut engine = engine(no_lights());
    let events: Vec<CutEvent> = [0, 0, 4, 4, 4, 0]
        .iter()
        .map(|tyres| {
            engine
                .tick(&sample(SessionKind::Practice, 2, *tyres, 100.))
                .cut_event
        })
        .collect();

    assert_eq!(
        events,
        vec![
            CutEvent::NoChange,
            CutEvent::NoChange,
            CutEvent::CutStarted,
            CutEvent::CutContinuing,
            CutEvent::CutContinuing,
            CutEvent::CutEndedPenalizable,
        ]
    );
    assert_eq!(engine.state().ledger.warning_count, 1);
}

#[test]
fn slowing_down_off_track_is_safe() {
    let mut engine = engine(no_lights());
    let ticks = [(0, 100.), (0, 100.), (4, 100.), (4, 50.), (4, 100.), (0, 100.)];
    let events: Vec<CutEvent> = ticks
        .iter()
        .map(|(tyres, speed)| {
            engine
                .tick(&sample(SessionKind::Practice, 2, *tyres, *speed))
                .cut_event
        })
        .collect();

    assert_eq!(events[5], CutEvent::CutEndedSafe);
    assert_eq!(engine.state().ledger.warning_count, 0);
}

#[test]
fn cut_warning_shows_and_expires() {
    let mut engine = engine(no_lights());
    engine.tick(&sample(SessionKind::Race, 3, 0, 150.));
    engine.tick(&sample(SessionKind::Race, 3, 4, 150.));
    let report = engine.tick(&sample(SessionKind::Race, 3, 0, 150.));

    assert!(report.notifications.contains(&Notification::Warning {
        text: Some("CUT TRACK WARNING".to_string()),
        colour: TextColour::Yellow
    }));
    assert!(report.notifications.contains(&Notification::Flag {
        flag: Flag::BlackWhite,
        visible: true
    }));
    assert!(report.notifications.contains(&Notification::Status {
        text: Some("Warnings: 1/3".to_string())
    }));
    assert_eq!(
        chat_wires(&[report]),
        vec!["PLP: Cut the track on lap 3|Tester".to_string()]
    );

    let report = engine.tick(&TelemetrySample {
        delta_s: 10.5,
        ..sample(SessionKind::Race, 3, 0, 150.)
    });
    assert!(report.notifications.contains(&Notification::Warning {
        text: None,
        colour: TextColour::Yellow
    }));
    assert!(report.notifications.contains(&Notification::Flag {
        flag: Flag::BlackWhite,
        visible: false
    }));
}

#[test]
fn penalty_after_more_cuts_than_warnings() {
    let mut engine = engine(no_lights());
    engine.tick(&sample(SessionKind::Race, 2, 0, 150.));

    for _ in 0..3 {
        race_cut(&mut engine, 2);
    }
    assert_eq!(engine.state().ledger.warning_count, 3);
    assert!(!engine.state().ledger.penalty_active);

    let reports = race_cut(&mut engine, 2);
    assert!(engine.state().ledger.penalty_active);
    assert_eq!(engine.state().ledger.penalty_laps_remaining, 3);
    assert!(
        chat_wires(&reports)
            .contains(&"PLP>DRIVE THROUGH PENALTY FOR CUTTING|on lap 2|Tester".to_string())
    );
    assert!(reports[2].notifications.contains(&Notification::Flag {
        flag: Flag::Black,
        visible: true
    }));

    // no more cuts are tracked while the penalty is pending
    let report = engine.tick(&sample(SessionKind::Race, 2, 4, 150.));
    assert_eq!(report.cut_event, CutEvent::NoChange);
}

#[test]
fn drive_through_served_in_pit_lane() {
    let mut engine = engine(PenaltyConfig {
        total_warnings: 0,
        ..no_lights()
    });
    engine.tick(&sample(SessionKind::Race, 2, 0, 150.));
    race_cut(&mut engine, 2);
    assert!(engine.state().ledger.penalty_active);

    let report = engine.tick(&sample(SessionKind::Race, 3, 0, 150.));
    assert_eq!(engine.state().ledger.penalty_laps_remaining, 2);
    assert!(report.notifications.contains(&Notification::Status {
        text: Some("2 laps left".to_string())
    }));

    let mut reports = Vec::new();
    for _ in 0..20 {
        reports.push(engine.tick(&TelemetrySample {
            is_in_pit_lane: true,
            ..sample(SessionKind::Race, 3, 0, 60.)
        }));
    }
    assert!(engine.state().ledger.taking_penalty);
    reports.push(engine.tick(&sample(SessionKind::Race, 3, 0, 120.)));

    let ledger = &engine.state().ledger;
    assert!(!ledger.penalty_active);
    assert_eq!(ledger.warning_count, 0);
    let wires = chat_wires(&reports);
    assert_eq!(
        wires
            .iter()
            .filter(|w| w.starts_with("PLP>taking penalty"))
            .count(),
        1
    );
    assert!(wires.contains(&"PLP>taken penalty|on lap 3|Tester".to_string()));
}

#[test]
fn ignored_drive_through_resets_warnings() {
    let mut engine = engine(PenaltyConfig {
        total_warnings: 0,
        laps_to_take_penalty: 1,
        ..no_lights()
    });
    engine.tick(&sample(SessionKind::Race, 2, 0, 150.));
    race_cut(&mut engine, 2);

    let report = engine.tick(&sample(SessionKind::Race, 3, 0, 150.));
    assert!(report.notifications.contains(&Notification::Status {
        text: Some("THIS LAP".to_string())
    }));

    let report = engine.tick(&sample(SessionKind::Race, 4, 0, 150.));
    assert!(chat_wires(&[report]).contains(&"PLP>ignored penalty|Tester".to_string()));
    assert!(!engine.state().ledger.penalty_active);
    assert_eq!(engine.state().ledger.penalty_laps_remaining, 0);
    assert_eq!(engine.state().ledger.warning_count, 0);
}

#[test]
fn ignored_drive_through_does_not_start_a_cut_on_the_same_tick() {
    let mut engine = engine(PenaltyConfig {
        total_warnings: 0,
        laps_to_take_penalty: 1,
        ..no_lights()
    });
    engine.tick(&sample(SessionKind::Race, 2, 0, 150.));
    race_cut(&mut engine, 2);
    engine.tick(&sample(SessionKind::Race, 3, 0, 150.));

    // off track on the tick the penalty is ignored, long after the last counted cut
    let report = engine.tick(&TelemetrySample {
        delta_s: 11.,
        ..sample(SessionKind::Race, 4, 4, 150.)
    });
    assert!(!engine.state().ledger.penalty_active);
    assert_eq!(report.cut_event, CutEvent::NoChange);

    let report = engine.tick(&sample(SessionKind::Race, 4, 4, 150.));
    assert_eq!(report.cut_event, CutEvent::CutStarted);
}

#[test]
fn pit_speeding_time_penalty_on_each_lap() {
    let mut engine = engine(PenaltyConfig {
        penalty_mode_speeding: PenaltyMode::Time,
        ..no_lights()
    });
    engine.tick(&sample(SessionKind::Race, 3, 0, 150.));

    let speeding = |lap| TelemetrySample {
        is_in_pit_lane: true,
        ..sample(SessionKind::Race, lap, 0, 90.)
    };
    let mut reports = Vec::new();
    for _ in 0..5 {
        reports.push(engine.tick(&speeding(3)));
    }
    reports.push(engine.tick(&sample(SessionKind::Race, 3, 0, 150.)));
    reports.push(engine.tick(&sample(SessionKind::Race, 8, 0, 150.)));
    for _ in 0..5 {
        reports.push(engine.tick(&speeding(8)));
    }

    let wires = chat_wires(&reports);
    let penalties: Vec<&str> = wires
        .iter()
        .map(String::as_str)
        .filter(|w| w.contains("FOR SPEEDING"))
        .collect();
    assert_eq!(
        penalties,
        vec![
            "PLP>GIVEN A 10 SECOND TIME PENALTY FOR SPEEDING|on lap 3|Tester",
            "PLP>GIVEN A 10 SECOND TIME PENALTY FOR SPEEDING|on lap 8|Tester",
        ]
    );
    assert!(!engine.state().ledger.speeding_penalty_active);
    assert!(!engine.state().ledger.penalty_active);
}

#[test]
fn pit_speeding_penalised_once_per_lap() {
    let mut engine = engine(no_lights());
    engine.tick(&sample(SessionKind::Race, 3, 0, 150.));

    let speeding = |lap| TelemetrySample {
        is_in_pit_lane: true,
        ..sample(SessionKind::Race, lap, 0, 90.)
    };
    let mut reports = Vec::new();
    for _ in 0..10 {
        reports.push(engine.tick(&speeding(3)));
    }
    let penalties = |reports: &[TickReport]| {
        chat_wires(reports)
            .iter()
            .filter(|w| w.contains("FOR SPEEDING"))
            .count()
    };
    assert_eq!(penalties(&reports), 1);
    assert!(engine.state().ledger.speeding_penalty_active);
    assert_eq!(engine.state().ledger.speeding_issued_on_lap, 3);
    // not served on the visit it was given on
    assert!(!engine.state().ledger.taking_penalty);

    // crossing the line still in pit lane does not use up a lap
    reports.push(engine.tick(&speeding(4)));
    assert_eq!(penalties(&reports), 1);
    assert_eq!(engine.state().ledger.penalty_laps_remaining, 3);

    // served on the next visit
    engine.tick(&sample(SessionKind::Race, 4, 0, 150.));
    engine.tick(&sample(SessionKind::Race, 5, 0, 150.));
    engine.tick(&TelemetrySample {
        is_in_pit_lane: true,
        ..sample(SessionKind::Race, 5, 0, 60.)
    });
    assert!(engine.state().ledger.taking_penalty);
    engine.tick(&sample(SessionKind::Race, 5, 0, 150.));
    assert!(!engine.state().ledger.penalty_active);
    assert!(!engine.state().ledger.speeding_penalty_active);
}

#[test]
fn stopping_in_pit_lane_voids_the_drive_through() {
    let mut engine = engine(PenaltyConfig {
        total_warnings: 0,
        ..no_lights()
    });
    engine.tick(&sample(SessionKind::Race, 2, 0, 150.));
    race_cut(&mut engine, 2);

    let in_lane = |speed| TelemetrySample {
        is_in_pit_lane: true,
        ..sample(SessionKind::Race, 2, 0, speed)
    };
    engine.tick(&in_lane(50.));
    let report = engine.tick(&in_lane(0.));
    assert!(engine.state().ledger.penalty_voided);
    assert!(chat_wires(&[report]).contains(&"PLP>re-take penalty|Tester".to_string()));

    engine.tick(&in_lane(50.));
    engine.tick(&sample(SessionKind::Race, 2, 0, 150.));
    assert!(engine.state().ledger.penalty_active);
    assert!(!engine.state().ledger.penalty_voided);
}

#[test]
fn qualifying_cut_invalidates_the_lap() {
    let mut engine = engine(no_lights());
    engine.tick(&sample(SessionKind::Qualify, 2, 0, 150.));
    engine.tick(&sample(SessionKind::Qualify, 2, 4, 150.));
    let report = engine.tick(&sample(SessionKind::Qualify, 2, 0, 150.));

    assert!(report.notifications.contains(&Notification::Warning {
        text: Some("INVALID LAP, SLOW DOWN".to_string()),
        colour: TextColour::Yellow
    }));
    assert!(engine.state().ledger.invalid_qual_lap);
    assert_eq!(engine.state().ledger.warning_count, 1);
    assert!(!engine.state().ledger.penalty_active);

    engine.tick(&sample(SessionKind::Qualify, 3, 0, 150.));
    assert!(!engine.state().ledger.invalid_qual_lap);
}

#[test]
fn jump_start_gives_time_penalty() {
    let mut engine = engine(PenaltyConfig::default());
    let creeping = TelemetrySample {
        lap_time_ms: 400,
        ..sample(SessionKind::Race, 1, 0, 5.)
    };
    let report = engine.tick(&creeping);

    assert!(report.notifications.contains(&Notification::Warning {
        text: Some("JUMP START".to_string()),
        colour: TextColour::Yellow
    }));
    assert!(report.notifications.contains(&Notification::Warning {
        text: Some("0 SECOND PENALTY".to_string()),
        colour: TextColour::Red
    }));
    assert!(
        report
            .notifications
            .iter()
            .any(|n| matches!(n, Notification::StartLights { frame } if frame.visible))
    );
    assert!(
        chat_wires(&[report])
            .contains(&"PLP>GIVEN A 0 SECOND TIME PENALTY FOR JUMP START|on lap 1|Tester".to_string())
    );
    assert!(engine.state().start.jump_start_flagged);

    let report = engine.tick(&creeping);
    assert!(chat_wires(&[report]).is_empty());
}

#[test]
fn start_lights_hidden_on_session_change() {
    let mut engine = engine(PenaltyConfig::default());
    engine.tick(&sample(SessionKind::Race, 1, 0, 0.));
    let report = engine.tick(&sample(SessionKind::Practice, 1, 0, 0.));
    assert!(report.notifications.contains(&Notification::StartLights {
        frame: LightsFrame::hidden()
    }));
}

#[test]
fn race_countup_timer() {
    let mut engine = engine(PenaltyConfig {
        race_countup_timer_days: Some(Vec::new()),
        ..no_lights()
    });
    let report = engine.tick(&TelemetrySample {
        lap_time_ms: 2500,
        ..sample(SessionKind::Race, 1, 0, 0.)
    });
    assert!(
        report
            .notifications
            .contains(&Notification::RaceTimer { seconds: Some(2) })
    );

    let report = engine.tick(&TelemetrySample {
        lap_time_ms: 2600,
        ..sample(SessionKind::Race, 1, 0, 12.)
    });
    assert!(
        report
            .notifications
            .contains(&Notification::RaceTimer { seconds: None })
    );
}

#[test]
fn chat_line_cleared_after_chat_duration() {
    let mut engine = engine(PenaltyConfig {
        total_warnings: 0,
        ..no_lights()
    });
    engine.tick(&sample(SessionKind::Race, 2, 0, 150.));
    engine.tick(&sample(SessionKind::Race, 2, 4, 150.));
    engine.tick(&sample(SessionKind::Race, 2, 0, 150.));

    let report = engine.tick(&TelemetrySample {
        delta_s: 10.5,
        ..sample(SessionKind::Race, 2, 0, 150.)
    });
    assert!(chat_wires(&[report]).contains(&"PLP>|Tester".to_string()));
}
