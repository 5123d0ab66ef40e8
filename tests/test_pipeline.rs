//! Integration test: Full pipeline (load → eda → train → report)

use datasage::eda::summarize;
use datasage::error::DatasageError;
use datasage::ingest::TabularIngestor;
use datasage::pipeline::{Coordinator, PipelineContext};
use datasage::report::{fallback_report, ModelHandle, ReportGenerator, TextModel};
use datasage::training::{AutomlConfig, AutomlRunner};
use polars::prelude::*;
use std::path::Path;
use std::sync::Arc;

/// 100 rows of [age, income, label]: 60 zeros then 40 ones in the target,
/// three missing values in income.
fn scenario_dataset() -> DataFrame {
    let n = 100;
    let age: Vec<f64> = (0..n).map(|i| 20.0 + (i % 45) as f64).collect();
    let income: Vec<Option<f64>> = (0..n)
        .map(|i| {
            if i == 10 || i == 40 || i == 70 {
                None
            } else if i < 60 {
                Some(30_000.0 + (i * 100) as f64)
            } else {
                Some(58_000.0 + (i * 100) as f64)
            }
        })
        .collect();
    let label: Vec<i64> = (0..n).map(|i| if i < 60 { 0 } else { 1 }).collect();

    df!(
        "age" => &age,
        "income" => &income,
        "label" => &label
    )
    .unwrap()
}

struct CrashyModel;

impl TextModel for CrashyModel {
    fn model_id(&self) -> &str {
        "crashy"
    }

    fn generate(&self, _prompt: &str) -> datasage::Result<String> {
        Err(DatasageError::ReportError("synthetic failure".to_string()))
    }
}

fn offline_coordinator(dir: &Path) -> Coordinator {
    Coordinator::with_components(
        TabularIngestor::new(),
        AutomlRunner::new(AutomlConfig::new().with_models_dir(dir.join("models"))),
        ReportGenerator::with_handle(Arc::new(ModelHandle::unavailable())),
    )
}

#[test]
fn test_scenario_eda_summary() {
    let df = scenario_dataset();
    let summary = summarize(&df, Some("label")).unwrap();

    assert_eq!(summary.shape, (100, 3));
    assert_eq!(summary.columns, vec!["age", "income", "label"]);
    assert_eq!(
        summary.missing_values,
        vec![
            ("age".to_string(), 0),
            ("income".to_string(), 3),
            ("label".to_string(), 0),
        ]
    );

    let balance = summary.target_balance.as_ref().unwrap();
    assert_eq!(balance, &vec![("0".to_string(), 60), ("1".to_string(), 40)]);
    assert_eq!(balance.iter().map(|(_, n)| n).sum::<usize>(), 100);
}

#[test]
fn test_scenario_fallback_report() {
    let df = scenario_dataset();
    let summary = summarize(&df, Some("label")).unwrap();
    let report = fallback_report(Some(&summary), &[]);

    assert!(report.contains("100 rows and 3 columns"));
    assert!(report.contains("income(3)"));
    assert!(report.contains("0: 60, 1: 40"));
}

#[test]
fn test_scenario_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = PipelineContext::from_dataframe(scenario_dataset()).with_target("label");

    let result = offline_coordinator(dir.path()).run_pipeline(ctx).unwrap();

    let eda = result.eda.as_ref().unwrap();
    assert_eq!(eda.shape, (100, 3));

    let automl = result.automl.as_ref().unwrap();
    assert!(automl.model_path.exists());
    assert_eq!(
        automl.model_path.file_name().unwrap().to_str().unwrap(),
        "best_automl_model.json"
    );
    assert!(!automl.comparison.is_empty());
    for row in &automl.comparison {
        assert!(row.metric("accuracy").is_some());
    }

    let report = result.report.as_ref().unwrap();
    assert!(report.contains("100 rows and 3 columns"));
    assert!(report.contains("income(3)"));
}

#[test]
fn test_pipeline_runs_from_uploaded_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let csv = "f1,label\n0.1,0\n0.2,0\n0.3,0\n5.1,1\n5.2,1\n5.3,1\n0.15,0\n5.15,1\n";
    let ctx = PipelineContext::from_bytes(csv.as_bytes().to_vec()).with_target("label");

    let result = offline_coordinator(dir.path()).run_pipeline(ctx).unwrap();
    assert_eq!(result.eda.as_ref().unwrap().shape, (8, 2));
    assert!(result.report.is_some());
}

#[test]
fn test_invalid_target_aborts_run_with_named_error() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = PipelineContext::from_dataframe(scenario_dataset()).with_target("labell");

    let err = offline_coordinator(dir.path()).run_pipeline(ctx).unwrap_err();
    match err {
        DatasageError::TargetNotFound { target, available } => {
            assert_eq!(target, "labell");
            assert_eq!(available, vec!["age", "income", "label"]);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Fail-fast: the artifact of the aborted run was never written
    assert!(!dir.path().join("models").join("best_automl_model.json").exists());
}

#[test]
fn test_generation_crash_degrades_to_fallback_report() {
    let dir = tempfile::tempdir().unwrap();
    let generator =
        ReportGenerator::with_handle(Arc::new(ModelHandle::preloaded(Arc::new(CrashyModel))));
    let coordinator = Coordinator::with_components(
        TabularIngestor::new(),
        AutomlRunner::new(AutomlConfig::new().with_models_dir(dir.path().join("models"))),
        generator,
    );

    let ctx = PipelineContext::from_dataframe(scenario_dataset()).with_target("label");
    let result = coordinator.run_pipeline(ctx).unwrap();

    // The run still succeeded, on the template path
    let report = result.report.unwrap();
    assert!(report.contains("100 rows and 3 columns"));
    assert!(report.contains("Next steps"));
}

#[test]
fn test_failing_model_load_only_happens_once_across_runs() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let handle = Arc::new(ModelHandle::with_loader(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(DatasageError::ReportError("no weights".to_string()))
    }));

    let coordinator = Coordinator::with_components(
        TabularIngestor::new(),
        AutomlRunner::new(AutomlConfig::new().with_models_dir(dir.path().join("models"))),
        ReportGenerator::with_handle(handle.clone()),
    );

    for _ in 0..3 {
        let ctx = PipelineContext::from_dataframe(scenario_dataset()).with_target("label");
        let result = coordinator.run_pipeline(ctx).unwrap();
        assert!(result.report.is_some());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(handle.is_unavailable());
}

#[test]
fn test_reruns_overwrite_the_same_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = offline_coordinator(dir.path());

    let first = coordinator
        .run_pipeline(PipelineContext::from_dataframe(scenario_dataset()).with_target("label"))
        .unwrap();
    let second = coordinator
        .run_pipeline(PipelineContext::from_dataframe(scenario_dataset()).with_target("label"))
        .unwrap();

    assert_eq!(
        first.automl.unwrap().model_path,
        second.automl.unwrap().model_path
    );
}
