use std::path::Path;

use survival_dose_models::{
    GroupObservations, InputError, ModelVariant, NoProgress, OutputConfig, PosteriorAnalysis,
    ResponseError, SummarizeOptions, SurvivalData, SurvivalModelError, Trace, TraceError,
    parameter_names,
};

fn minimal_data() -> SurvivalData {
    SurvivalData::new(
        "robustness".to_owned(),
        vec![0.0, 100.0],
        GroupObservations::new(vec![5, 5], vec![vec![], vec![4.0, 6.0]], vec![5, 3]),
        GroupObservations::new(vec![5, 5], vec![vec![], vec![5.0]], vec![5, 4]),
        30.0,
    )
}

fn trace_for(data: &SurvivalData, variant: ModelVariant, len: usize) -> Trace {
    let mut trace = Trace::default();
    for name in parameter_names(variant, data) {
        let value = if name.starts_with("mean") { 8.0 } else { 0.5 };
        trace.push_chain(&name, vec![value; len]);
    }
    trace
}

#[test]
fn invalid_data_is_rejected_at_construction() {
    let mut data = minimal_data();
    data.doses = vec![100.0, 0.0];
    let result = PosteriorAnalysis::new(data, ModelVariant::Single, OutputConfig::new("/tmp"));
    assert!(matches!(
        result.err(),
        Some(SurvivalModelError::InvalidInput(InputError::UnsortedDoses))
    ));
}

#[test]
fn death_time_beyond_study_end_is_rejected() {
    let mut data = minimal_data();
    data.group1.death_times[1] = vec![4.0, 31.0];
    assert!(matches!(
        data.validate(),
        Err(InputError::InvalidDeathTime { group: 1, .. })
    ));
}

#[test]
fn missing_trace_file_is_a_loud_error() {
    let mut analysis = PosteriorAnalysis::new(
        minimal_data(),
        ModelVariant::Single,
        OutputConfig::new("/tmp"),
    )
    .expect("analysis should build");
    let result = analysis.load_trace(Path::new("/nonexistent/run-trace.json"), 0, 1);
    assert!(matches!(
        result.err(),
        Some(SurvivalModelError::Trace(TraceError::MissingArtifact { .. }))
    ));
}

#[test]
fn incomplete_trace_names_the_missing_parameter() {
    let data = minimal_data();
    let mut trace = Trace::default();
    for name in parameter_names(ModelVariant::Single, &data) {
        if name != "eps" {
            trace.push_chain(&name, vec![0.5; 10]);
        }
    }

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("incomplete-trace.json");
    trace.to_file(&path).expect("persist");

    let mut analysis =
        PosteriorAnalysis::new(data, ModelVariant::Single, OutputConfig::new(dir.path()))
            .expect("analysis should build");
    match analysis.load_trace(&path, 0, 1).err() {
        Some(SurvivalModelError::Trace(TraceError::MissingParameter { name })) => {
            assert_eq!(name, "eps");
        }
        other => panic!("expected MissingParameter, got {other:?}"),
    }
}

#[test]
fn burn_in_must_leave_draws_in_every_chain() {
    let data = minimal_data();
    let trace = trace_for(&data, ModelVariant::Single, 10);
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("short-trace.json");
    trace.to_file(&path).expect("persist");

    let mut analysis =
        PosteriorAnalysis::new(data, ModelVariant::Single, OutputConfig::new(dir.path()))
            .expect("analysis should build");
    assert!(matches!(
        analysis.load_trace(&path, 10, 1).err(),
        Some(SurvivalModelError::Trace(TraceError::ChainMismatch {
            burn_in: 10,
            chain_length: 10,
            ..
        }))
    ));
}

#[test]
fn zero_thinning_is_invalid() {
    let data = minimal_data();
    let trace = trace_for(&data, ModelVariant::Single, 10);
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("thin-trace.json");
    trace.to_file(&path).expect("persist");

    let mut analysis =
        PosteriorAnalysis::new(data, ModelVariant::Single, OutputConfig::new(dir.path()))
            .expect("analysis should build");
    assert!(matches!(
        analysis.load_trace(&path, 0, 0).err(),
        Some(SurvivalModelError::Trace(TraceError::InvalidThinning))
    ));
}

#[test]
fn failed_summarization_keeps_the_loaded_trace() {
    let data = minimal_data();
    // Non-positive beta shape draws make the heterogeneous response
    // unconstructible, failing summarization after a successful load.
    let mut trace = Trace::default();
    for name in parameter_names(ModelVariant::Single, &data) {
        let value = if name == "a" {
            -1.0
        } else if name.starts_with("mean") {
            8.0
        } else {
            0.5
        };
        trace.push_chain(&name, vec![value; 10]);
    }
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bad-shape-trace.json");
    trace.to_file(&path).expect("persist");

    let mut analysis =
        PosteriorAnalysis::new(data, ModelVariant::Single, OutputConfig::new(dir.path()))
            .expect("analysis should build");
    analysis.load_trace(&path, 0, 1).expect("load");

    let first = analysis
        .summarize(SummarizeOptions::default(), &mut NoProgress)
        .err();
    assert!(matches!(
        first,
        Some(SurvivalModelError::Response(ResponseError::InvalidBetaShape))
    ));

    // The trace stays loaded, so a retry reports the same underlying
    // error rather than TraceNotLoaded.
    let second = analysis
        .summarize(SummarizeOptions::default(), &mut NoProgress)
        .err();
    assert!(matches!(
        second,
        Some(SurvivalModelError::Response(ResponseError::InvalidBetaShape))
    ));
}

#[test]
fn summarize_before_loading_a_trace_fails() {
    let mut analysis = PosteriorAnalysis::new(
        minimal_data(),
        ModelVariant::Single,
        OutputConfig::new("/tmp"),
    )
    .expect("analysis should build");
    assert!(matches!(
        analysis
            .summarize(SummarizeOptions::default(), &mut NoProgress)
            .err(),
        Some(SurvivalModelError::TraceNotLoaded)
    ));
}
