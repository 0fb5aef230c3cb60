mod common;

use common::{default_year, indicator, wait_until, FakeSource, Harness};
use kommun_core::{HoverState, InfoPanel};

fn source() -> FakeSource {
    let year = default_year();
    FakeSource::default()
        .with_years("N1", &[year.as_str()])
        .with_values("N1", &year, &[("01", 10.0), ("02", 20.0), ("03", 30.0)])
        .with_history("N1", "01", &[(2021, 3.0), (2019, 1.0), (2020, 2.0)])
        .with_history("N1", "02", &[(2020, 5.0)])
}

async fn ready(source: FakeSource) -> Harness {
    let mut harness = Harness::new(source);
    harness.dashboard.select_indicator(indicator("N1"));
    harness.settle().await;
    harness
}

#[tokio::test]
async fn hovering_shows_value_and_history() {
    let mut harness = ready(source()).await;
    let base = harness.scene().region_style("01").unwrap();

    harness.dashboard.hover_enter("01");
    assert_eq!(
        harness.scene().info(),
        &InfoPanel::Region {
            name: "Ale".to_string(),
            value: Some(10.0),
        }
    );
    let highlighted = harness.scene().region_style("01").unwrap();
    assert_eq!(highlighted.weight, 2.0);
    assert_eq!(highlighted.fill, base.fill);

    harness.settle().await;
    let series = harness.scene().series().unwrap();
    assert_eq!(series.name, "Ale");
    let years: Vec<i32> = series.points.iter().map(|p| p.year).collect();
    assert_eq!(years, [2019, 2020, 2021]);
    assert_eq!(
        harness.dashboard.hover().state(),
        &HoverState::Loaded("01".to_string())
    );
}

#[tokio::test]
async fn same_region_is_fetched_once() -> anyhow::Result<()> {
    let mut harness = ready(source()).await;

    harness.dashboard.hover_enter("01");
    harness.dashboard.hover_enter("01");
    harness.settle().await;
    harness.dashboard.hover_enter("01");
    harness.settle().await;

    assert_eq!(harness.source.history_calls(), ["01"]);
    Ok(())
}

#[tokio::test]
async fn each_entry_fetches_again() -> anyhow::Result<()> {
    let mut harness = ready(source()).await;
    let source = harness.source.clone();

    for (n, region) in ["01", "02", "01"].into_iter().enumerate() {
        harness.dashboard.hover_enter(region);
        wait_until(|| source.history_calls().len() == n + 1).await?;
    }
    harness.settle().await;

    assert_eq!(source.history_calls(), ["01", "02", "01"]);
    let series = harness.scene().series().unwrap();
    assert_eq!(series.region, "01");
    assert_eq!(series.points.len(), 3);
    Ok(())
}

#[tokio::test]
async fn leaving_during_fetch_resets_everything() -> anyhow::Result<()> {
    let source = source();
    let gate = source.gate_history();
    let mut harness = ready(source).await;
    let base = harness.scene().region_style("02").unwrap();

    harness.dashboard.hover_enter("02");
    let calls = harness.source.clone();
    wait_until(|| calls.history_calls().len() == 1).await?;
    assert_eq!(
        harness.dashboard.hover().state(),
        &HoverState::Loading("02".to_string())
    );

    harness.dashboard.hover_leave();
    gate.open();
    harness.settle().await;

    assert_eq!(harness.dashboard.hover().state(), &HoverState::Idle);
    assert_eq!(harness.scene().info(), &InfoPanel::Idle);
    assert!(harness.scene().series().is_none());
    assert_eq!(harness.scene().region_style("02"), Some(base));
    Ok(())
}

#[tokio::test]
async fn leaving_after_failed_fetch_resets() {
    let mut harness = ready(source().failing_history()).await;

    harness.dashboard.hover_enter("01");
    harness.settle().await;
    assert_eq!(
        harness.dashboard.hover().state(),
        &HoverState::Loaded("01".to_string())
    );
    assert!(harness.scene().series().is_none());

    harness.dashboard.hover_leave();
    assert_eq!(harness.dashboard.hover().state(), &HoverState::Idle);
    assert_eq!(harness.scene().info(), &InfoPanel::Idle);
}

#[tokio::test]
async fn moving_between_regions_drops_old_history() -> anyhow::Result<()> {
    let source = source();
    let gate = source.gate_history();
    let mut harness = ready(source).await;
    let calls = harness.source.clone();

    harness.dashboard.hover_enter("01");
    wait_until(|| calls.history_calls().len() == 1).await?;
    harness.dashboard.hover_enter("02");
    wait_until(|| calls.history_calls().len() == 2).await?;
    gate.open();
    harness.settle().await;

    let series = harness.scene().series().unwrap();
    assert_eq!(series.region, "02");
    assert_eq!(
        harness.scene().region_style("01").map(|s| s.weight),
        Some(1.0)
    );
    Ok(())
}

#[tokio::test]
async fn hovering_without_indicator_fetches_nothing() {
    let mut harness = Harness::new(source());
    harness.dashboard.hover_enter("03");
    harness.settle().await;

    assert!(harness.source.history_calls().is_empty());
    assert_eq!(
        harness.scene().info(),
        &InfoPanel::Region {
            name: "Eda".to_string(),
            value: None,
        }
    );
}

#[tokio::test]
async fn unknown_region_is_ignored() {
    let mut harness = ready(source()).await;
    harness.dashboard.hover_enter("99");
    assert_eq!(harness.dashboard.hover().state(), &HoverState::Idle);
    assert!(harness.source.history_calls().is_empty());
}
