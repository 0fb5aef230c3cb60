mod common;

use common::{default_year, indicator, wait_until, FakeSource, Harness};

fn two_indicators() -> FakeSource {
    let year = default_year();
    FakeSource::default()
        .with_years("OLD", &[year.as_str()])
        .with_values("OLD", &year, &[("01", 1.0), ("02", 2.0)])
        .with_years("NEW", &[year.as_str()])
        .with_values("NEW", &year, &[("03", 3.0), ("04", 4.0), ("05", 5.0)])
}

#[tokio::test]
async fn newest_selection_wins_over_late_values() -> anyhow::Result<()> {
    let source = two_indicators();
    let old_gate = source.gate_values("OLD");
    let mut harness = Harness::new(source);

    harness.dashboard.select_indicator(indicator("OLD"));
    // years for OLD arrive and its values fetch starts, then stalls
    harness.step().await?;
    let calls = harness.source.clone();
    wait_until(|| calls.values_calls() == 1).await?;

    harness.dashboard.select_indicator(indicator("NEW"));
    harness.settle().await;
    assert_eq!(harness.dashboard.session().values().len(), 3);
    assert!(harness.scene().is_loading());

    old_gate.open();
    harness.settle().await;

    let session = harness.dashboard.session();
    assert_eq!(session.indicator().map(|i| i.id.as_str()), Some("NEW"));
    assert_eq!(session.values().len(), 3);
    assert_eq!(session.values().get("01"), None);
    assert_eq!(session.values().get("05"), Some(5.0));
    assert!(!harness.scene().is_loading());
    Ok(())
}

#[tokio::test]
async fn late_years_for_previous_indicator_are_ignored() -> anyhow::Result<()> {
    let source = two_indicators().with_years("OLD", &["1999"]);
    let mut harness = Harness::new(source);

    harness.dashboard.select_indicator(indicator("OLD"));
    harness.dashboard.select_indicator(indicator("NEW"));
    harness.settle().await;

    let session = harness.dashboard.session();
    assert_eq!(session.years(), [default_year()]);
    assert_eq!(session.values().len(), 3);
    assert!(!harness.scene().is_loading());
    Ok(())
}

#[tokio::test]
async fn loading_clears_after_failed_years() {
    let mut harness = Harness::new(two_indicators().failing_years());
    harness.dashboard.select_indicator(indicator("OLD"));
    assert!(harness.scene().is_loading());

    harness.settle().await;

    let session = harness.dashboard.session();
    assert!(session.years().is_empty());
    assert!(session.values().is_empty());
    assert!(!session.is_loading());
    assert!(!harness.scene().is_loading());
}

#[tokio::test]
async fn rapid_year_changes_keep_the_last() {
    let source = FakeSource::default()
        .with_years("N1", &["2018", "2019", "2020"])
        .with_values("N1", "2018", &[("01", 1.0)])
        .with_values("N1", "2019", &[("01", 2.0)])
        .with_values("N1", "2020", &[("01", 3.0)]);
    let mut harness = Harness::new(source);
    harness.dashboard.select_indicator(indicator("N1"));
    harness.settle().await;

    for year in ["2018", "2020", "2019"] {
        harness.dashboard.select_year(Some(year.to_string()));
    }
    harness.settle().await;

    let session = harness.dashboard.session();
    assert_eq!(session.year(), Some("2019"));
    assert_eq!(session.values().get("01"), Some(2.0));
    assert!(!harness.scene().is_loading());
}
