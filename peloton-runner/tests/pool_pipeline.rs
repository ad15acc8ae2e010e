//! End-to-end pool runs from files on disk.

use std::fs;
use std::path::Path;

use peloton_core::{Competition, ScoreTemplate, ScoringOptions};
use peloton_runner::export::{export_ledger_csv, import_ledger_csv};
use peloton_runner::{classify_ledgers, run_pool, PoolConfig, PoolError, PriceList, SelectError};

const TEMPLATE: &str = r#"
[event.stage]
key = ["Stage", "General"]
points = [50, 40, 30, 20, 10]
name = "Stage"

[competition.gc]
key = ["GC", "General"]
points = [100, 80, 60, 40, 20]
name = "GC"
"#;

const CONFIG: &str = r#"
[team]
size = 3
budget = 10

[prices]
delimiter = ","
"#;

const PRICES: &str = "Rider,Price\nA,5\nB,4\nC,3\nD,2\nE,1\nF,1\n";

fn stage(order: [&str; 5]) -> String {
    let rows: Vec<String> = order
        .iter()
        .enumerate()
        .map(|(i, r)| format!(r#"{{"Rnk": "{}", "Rider": "{r}", "Team": "T{r}"}}"#, i + 1))
        .collect();
    format!("[{}]", rows.join(","))
}

fn tour() -> String {
    format!(
        r#"{{"name": "Tour", "events": [
            {{"name": "Stage 1", "results": {{"Stage": {{"General": {s1}}}, "GC": {{"General": {s1}}}}}}},
            {{"name": "Stage 2", "results": {{"Stage": {{"General": {s2}}}, "GC": {{"General": {g2}}}}}}}
        ]}}"#,
        s1 = stage(["A", "B", "C", "D", "E"]),
        s2 = stage(["E", "D", "C", "B", "A"]),
        g2 = stage(["C", "A", "E", "B", "D"]),
    )
}

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn load(dir: &Path) -> (Competition, ScoreTemplate, PriceList, PoolConfig) {
    let template = ScoreTemplate::from_file(&write(dir, "template.toml", TEMPLATE)).unwrap();
    let competition = Competition::from_file(&write(dir, "tour.json", &tour())).unwrap();
    let config = PoolConfig::from_file(&write(dir, "pool.toml", CONFIG)).unwrap();
    let prices =
        PriceList::from_path(&write(dir, "prices.csv", PRICES), config.delimiter().unwrap())
            .unwrap();
    (competition, template, prices, config)
}

#[test]
fn pool_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let (tour, template, prices, config) = load(dir.path());

    let report = run_pool(
        &[tour],
        &template,
        &prices,
        &config,
        ScoringOptions::default(),
    )
    .unwrap();

    // Stage points: A 60, B 60, C 60, D 60, E 60. GC: C 100, A 80, E 60, B 40, D 20.
    let totals = report.ledger.totals_by_competitor();
    let total = |r: &str| totals[&peloton_core::CompetitorId::new(r)];
    assert_eq!(total("C"), 160);
    assert_eq!(total("A"), 140);
    assert_eq!(total("E"), 120);

    // F is priced but never scored.
    assert_eq!(report.candidates.len(), 6);
    assert_eq!(report.candidates[5].points, 0.0);

    // Budget 10: A (5) + C (3) + E (1) = 9 beats every other affordable trio.
    let mut picked: Vec<&str> = report.selection.members.iter().map(|c| c.id.as_str()).collect();
    picked.sort_unstable();
    assert_eq!(picked, vec!["A", "C", "E"]);
    assert_eq!(report.selection.objective, 420.0);
    assert!(report.selection.total_price <= config.team.budget);
}

#[test]
fn pool_runs_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let (tour, template, prices, config) = load(dir.path());
    let competitions = [tour];

    let first = run_pool(&competitions, &template, &prices, &config, ScoringOptions::default())
        .unwrap();
    let second = run_pool(&competitions, &template, &prices, &config, ScoringOptions::default())
        .unwrap();

    assert_eq!(first.ledger, second.ledger);
    assert_eq!(first.selection.members, second.selection.members);
    assert_eq!(
        serde_json::to_string(&first.candidates).unwrap(),
        serde_json::to_string(&second.candidates).unwrap()
    );
}

#[test]
fn competition_rules_only() {
    let dir = tempfile::tempdir().unwrap();
    let (tour, template, prices, config) = load(dir.path());

    let report = run_pool(
        &[tour],
        &template,
        &prices,
        &config,
        ScoringOptions { score_events: false },
    )
    .unwrap();
    assert_eq!(report.ledger.columns(), vec!["GC"]);
    assert_eq!(report.ledger.grand_total(), 300);
}

#[test]
fn tight_budget_is_infeasible() {
    let dir = tempfile::tempdir().unwrap();
    let (tour, template, prices, mut config) = load(dir.path());
    config.team.budget = 2.0;

    let err = run_pool(&[tour], &template, &prices, &config, ScoringOptions::default())
        .unwrap_err();
    assert!(matches!(err, PoolError::Select(SelectError::Infeasible { .. })));
}

#[test]
fn exported_ledger_classifies_against_itself() {
    let dir = tempfile::tempdir().unwrap();
    let (tour, template, prices, config) = load(dir.path());
    let report = run_pool(&[tour], &template, &prices, &config, ScoringOptions::default())
        .unwrap();

    let reloaded = import_ledger_csv(&export_ledger_csv(&report.ledger).unwrap()).unwrap();
    assert_eq!(reloaded.totals_by_competitor(), report.ledger.totals_by_competitor());

    let c = classify_ledgers(&report.ledger, &reloaded, 2).unwrap();
    assert_eq!(c.true_positive, 2);
    assert_eq!(c.false_positive + c.false_negative, 0);
    assert_eq!(c.f_score(1.0), 1.0);
}
