mod common;

use std::time::Duration;

use common::{count_order, engine, mass_order};
use fillmon_core::{
    AlertLevel, AutonomyProjection, BusyReason, Classification, Format, InboundEvent, Outcome,
    SessionError, SessionStatus, TankId,
};
use rstest::rstest;

const TK3: TankId = TankId(3);
const TK4: TankId = TankId(4);
const TK5: TankId = TankId(5);

#[test]
fn reference_session_classifies_and_reports() {
    let (mut engine, clock, _) = engine();
    engine
        .start(TK3, count_order(Format::TwentyFiveKg, 100, 4.0))
        .unwrap();

    let mut classes = Vec::new();
    for w in [25.0, 25.6, 24.2, 30.0] {
        clock.advance(Duration::from_secs(2));
        match engine.handle(InboundEvent::UnitSample {
            tank: TK3,
            weight_kg: w,
            unit_index: None,
        }) {
            Outcome::Sample(s) => classes.push(s.classification),
            other => panic!("expected a sample, got {other:?}"),
        }
    }
    assert_eq!(
        classes,
        [
            Classification::Within,
            Classification::Alert,
            Classification::Alert,
            Classification::Out
        ]
    );

    let summary = engine.stop(TK3).unwrap().expect("four units recorded");
    assert_eq!(summary.total_units, 4);
    assert_eq!(
        summary.within_tolerance + summary.in_alert + summary.out_of_tolerance,
        summary.total_units
    );
    assert_eq!(summary.quality, 25.0);
    assert_eq!(summary.out_of_tolerance, 1);
    assert_eq!(summary.duration_seconds, 8);
    assert_eq!(summary.performance, Some(100.0));
    assert_eq!(engine.registry().status(TK3), Ok(SessionStatus::Idle));
}

#[test]
fn stop_without_units_yields_no_summary() {
    let (mut engine, clock, _) = engine();
    engine
        .start(TK5, mass_order(Format::FiveKg, 500.0, 10.0))
        .unwrap();
    clock.advance(Duration::from_secs(30));
    assert_eq!(engine.stop(TK5), Ok(None));
    assert_eq!(engine.registry().status(TK5), Ok(SessionStatus::Idle));
}

#[test]
fn paired_tanks_exclude_each_other() {
    let (mut engine, _, _) = engine();
    let order = count_order(Format::TenKg, 50, 5.0);
    engine.start(TK3, order.clone()).unwrap();

    let err = engine.start(TK4, order.clone()).unwrap_err();
    assert_eq!(
        err,
        SessionError::Busy {
            tank: TK4,
            reason: BusyReason::PartnerFilling(TK3)
        }
    );
    assert_eq!(engine.registry().status(TK4), Ok(SessionStatus::Idle));

    engine.stop(TK3).unwrap();
    engine.start(TK4, order.clone()).unwrap();
    // and the other way round
    assert!(matches!(
        engine.start(TK3, order),
        Err(SessionError::Busy {
            reason: BusyReason::PartnerFilling(TK4),
            ..
        })
    ));
}

#[test]
fn restart_on_same_tank_is_busy() {
    let (mut engine, _, _) = engine();
    let order = count_order(Format::TenKg, 50, 5.0);
    engine.start(TK5, order.clone()).unwrap();
    assert!(matches!(
        engine.start(TK5, order),
        Err(SessionError::Busy {
            reason: BusyReason::AlreadyFilling,
            ..
        })
    ));
}

#[rstest]
#[case(TankId(1))]
#[case(TankId(7))]
fn unknown_tanks_are_rejected(#[case] tank: TankId) {
    let (mut engine, _, _) = engine();
    assert_eq!(
        engine.start(tank, count_order(Format::OneLiter, 10, 1.0)),
        Err(SessionError::UnknownTank(tank))
    );
    assert_eq!(engine.stop(tank), Err(SessionError::UnknownTank(tank)));
    assert_eq!(
        engine.project_autonomy(tank),
        Err(SessionError::UnknownTank(tank))
    );
}

#[test]
fn buffer_survives_stop_until_next_start() {
    let (mut engine, clock, _) = engine();
    let order = count_order(Format::FourLiter, 500, 10.0);
    engine.start(TK5, order.clone()).unwrap();
    for i in 0..150 {
        clock.advance(Duration::from_millis(500));
        engine.handle(InboundEvent::UnitSample {
            tank: TK5,
            weight_kg: 4.0,
            unit_index: Some(i),
        });
    }
    let summary = engine.stop(TK5).unwrap().unwrap();
    assert_eq!(summary.total_units, 150);

    let session = engine.registry().session(TK5).unwrap();
    let seqs: Vec<u64> = session.buffer().snapshot().iter().map(|s| s.sequence).collect();
    assert_eq!(seqs.len(), 100);
    assert_eq!(seqs.first(), Some(&51));
    assert_eq!(seqs.last(), Some(&150));
    assert_eq!(session.last_format(), Some(Format::FourLiter));

    engine.start(TK5, order).unwrap();
    assert!(engine.registry().session(TK5).unwrap().buffer().is_empty());
}

#[test]
fn count_projection_reference_case() {
    let (mut engine, clock, _) = engine();
    engine
        .start(TK5, count_order(Format::OneLiter, 1000, 50.0))
        .unwrap();
    for _ in 0..500 {
        engine.handle(InboundEvent::UnitSample {
            tank: TK5,
            weight_kg: 1.0,
            unit_index: None,
        });
    }
    clock.advance(Duration::from_secs(8 * 60));
    match engine.project_autonomy(TK5).unwrap() {
        AutonomyProjection::Count(p) => {
            assert!((p.ideal_remaining_min - 12.0).abs() < 1e-9);
            assert!((p.real_throughput_per_min - 62.5).abs() < 1e-9);
            assert!((p.real_remaining_min - 8.0).abs() < 1e-9);
            assert!((p.efficiency_pct.unwrap() - 125.0).abs() < 1e-9);
            assert_eq!(p.level, AlertLevel::Red);
        }
        other => panic!("expected count projection, got {other:?}"),
    }
}

#[test]
fn mass_projection_uses_latest_tank_weight() {
    let (mut engine, _, _) = engine();
    engine
        .start(TK5, mass_order(Format::TwentyKg, 1950.0, 20.0))
        .unwrap();
    engine.handle(InboundEvent::TankWeight {
        tank: TK5,
        weight_kg: 1500.0,
    });
    match engine.project_autonomy(TK5).unwrap() {
        AutonomyProjection::Mass(m) => {
            assert!((m.autonomy_min - 75.0).abs() < 1e-9);
            assert_eq!(m.level, AlertLevel::Green);
        }
        other => panic!("expected mass projection, got {other:?}"),
    }
}

#[test]
fn idle_tank_projection_is_indeterminate() {
    let (engine, _, _) = engine();
    assert_eq!(
        engine.project_autonomy(TK4),
        Ok(AutonomyProjection::Indeterminate)
    );
}
