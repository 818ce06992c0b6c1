use chrono::{DateTime, TimeZone, Utc};
use covenant_core::config::RenewalConfig;
use covenant_core::models::*;
use proptest::prelude::*;

fn ts_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    // 1990-01-01 .. 2100-01-01
    (631_152_000i64..4_102_444_800i64).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

fn bucket_strategy() -> impl Strategy<Value = BucketType> {
    prop_oneof![
        Just(BucketType::Day),
        Just(BucketType::Week),
        Just(BucketType::Month),
        Just(BucketType::Quarter),
    ]
}

proptest! {
    #[test]
    fn bucket_bounds_contain_the_timestamp(ts in ts_strategy(), bucket in bucket_strategy()) {
        let (start, end) = bucket.bounds(ts).unwrap();
        prop_assert!(start <= ts);
        prop_assert!(ts < end);
    }

    #[test]
    fn bucket_bounds_are_stable_within_a_bucket(ts in ts_strategy(), bucket in bucket_strategy()) {
        let (start, end) = bucket.bounds(ts).unwrap();
        prop_assert_eq!(bucket.bounds(start).unwrap(), (start, end));
        let last = end - chrono::Duration::seconds(1);
        prop_assert_eq!(bucket.bounds(last).unwrap(), (start, end));
    }

    #[test]
    fn tier_is_monotone_in_probability(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let config = RenewalConfig::default();
        let rank = |t: PredictionTier| match t {
            PredictionTier::Low => 0,
            PredictionTier::Medium => 1,
            PredictionTier::High => 2,
        };
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(rank(config.tier_for(lo)) <= rank(config.tier_for(hi)));
    }
}

#[test]
fn obligation_completion_is_not_a_plain_transition() {
    for from in [
        ObligationStatus::Pending,
        ObligationStatus::InProgress,
        ObligationStatus::Overdue,
    ] {
        assert!(!from.can_transition_to(ObligationStatus::Completed));
        assert!(from.can_complete());
    }
    assert!(!ObligationStatus::Waived.can_complete());
}

#[test]
fn terminal_obligations_accept_nothing() {
    let all = [
        ObligationStatus::Pending,
        ObligationStatus::InProgress,
        ObligationStatus::Completed,
        ObligationStatus::Overdue,
        ObligationStatus::Waived,
        ObligationStatus::Cancelled,
    ];
    for from in all.iter().filter(|s| s.is_terminal()) {
        for to in all {
            assert!(!from.can_transition_to(to));
        }
    }
}

#[test]
fn anomaly_severity_maps_onto_alert_severity() {
    assert_eq!(AnomalySeverity::Low.alert_severity(), AlertSeverity::Info);
    assert_eq!(AnomalySeverity::Medium.alert_severity(), AlertSeverity::Warning);
    assert_eq!(AnomalySeverity::Critical.alert_severity(), AlertSeverity::Critical);
}

#[test]
fn quarter_label_uses_calendar_quarters() {
    let ts = Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();
    assert_eq!(quarter_label(ts), "2024-Q4");
}

#[test]
fn batch_report_counts_failures_as_processed() {
    let mut report: BatchReport<u32> = BatchReport::new();
    report.record_success(1);
    report.record_failure("row-2", "bad value");
    report.record_noop();
    assert_eq!(report.processed, 3);
    assert_eq!(report.items, vec![1]);
    assert!(!report.is_clean());
}

#[test]
fn enum_text_round_trips_through_from_str() {
    for status in [
        ObligationStatus::InProgress,
        ObligationStatus::Overdue,
        ObligationStatus::Cancelled,
    ] {
        assert_eq!(status.as_str().parse::<ObligationStatus>().unwrap(), status);
    }
    assert_eq!("one_time".parse::<ObligationFrequency>().unwrap(), ObligationFrequency::OneTime);
}
