use std::sync::Mutex;

use super::*;

#[test]
fn labels_are_stable() {
    assert_eq!(FlowStep::LoadingDepthModel.to_string(), "Loading depth model");
    assert_eq!(FlowStep::PostprocessingDepth.to_string(), "Post-processing depth map");
    assert_eq!(
        FlowStep::ProcessingLayer { index: 1, total: 3 }.to_string(),
        "Processing layer 2/3"
    );
}

#[test]
fn closures_are_sinks() {
    let seen = Mutex::new(Vec::new());
    let sink = |step: &str, percent: Option<f32>| {
        seen.lock().unwrap().push((step.to_owned(), percent));
    };
    FlowStep::LoadingImage.report(&sink);
    FlowStep::ProcessingLayer { index: 1, total: 4 }.report(&sink);
    FlowStep::Done.report(&sink);

    let seen = seen.into_inner().unwrap();
    assert_eq!(
        seen,
        vec![
            ("Loading image".to_owned(), None),
            ("Processing layer 2/4".to_owned(), Some(25.0)),
            ("Done".to_owned(), Some(100.0)),
        ]
    );
}

#[test]
fn no_progress_is_silent() {
    FlowStep::Done.report(&NoProgress);
    LogProgress.report("step", Some(1.0));
}
