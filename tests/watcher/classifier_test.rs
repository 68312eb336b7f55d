//! Tests for line classification and the failure latch.

use std::sync::Arc;

use unity_proxy::status::MemorySink;
use unity_proxy::watcher::{FailureAccumulator, LineClassifier, Signal};

#[test]
fn classification_follows_priority_order() {
    let classifier = LineClassifier::new();
    let cases = [
        ("DisplayProgressbar: Compiling Scripts", "progress"),
        ("DisplayProgressbar: Build failure! in title", "progress"),
        ("Build failure! ERROR: both", "failure"),
        ("ERROR: then Build failure!", "failure"),
        ("Assets/A.cs(3,4): ERROR: CS1002", "error"),
        ("Compilation failed: 1 error(s)", "plain"),
        ("", "plain"),
    ];

    for (line, expected) in cases {
        let kind = match classifier.classify(line) {
            Signal::Plain => "plain",
            Signal::Progress { .. } => "progress",
            Signal::ErrorMarker { .. } => "error",
            Signal::FailureMarker { .. } => "failure",
        };
        assert_eq!(kind, expected, "line: {line:?}");
    }
}

#[test]
fn progress_name_is_text_after_prefix() {
    let classifier = LineClassifier::new();
    assert_eq!(
        classifier.classify("DisplayProgressbar: Compiling Scripts"),
        Signal::Progress {
            name: "Compiling Scripts".to_string()
        }
    );
}

#[test]
fn compiler_error_becomes_reason() {
    let classifier = LineClassifier::new();
    let sink = MemorySink::new();
    let mut failures = FailureAccumulator::new();

    let lines = [
        "Refreshing native plugins compatible for Editor",
        "Assets/Scripts/CommandLine.cs(88,63): ERROR: CS0103: The name 'WebUtility' does not exist in the current context",
        "Aborting batchmode due to failure:",
    ];
    let signals: Vec<Signal> = lines.iter().map(|l| classifier.classify(l)).collect();
    failures.observe(&signals, &sink);

    assert_eq!(
        failures.state().reason(),
        Some("CS0103: The name 'WebUtility' does not exist in the current context")
    );
    assert_eq!(sink.problems().len(), 1);
}

#[test]
fn latched_reason_is_first_problem_across_batches() {
    let classifier = LineClassifier::new();
    let sink = Arc::new(MemorySink::new());
    let mut failures = FailureAccumulator::new();

    let batches: [&[&str]; 4] = [
        &["Loading", "DisplayProgressbar: Importing"],
        &["warning CS0618", "ERROR: first error", "Build failure! first failure"],
        &["Build failure! second failure"],
        &["ERROR: second error"],
    ];

    for batch in batches {
        let signals: Vec<Signal> = batch.iter().map(|l| classifier.classify(l)).collect();
        failures.observe(&signals, sink.as_ref());
    }

    assert!(failures.state().failed());
    assert_eq!(failures.state().reason(), Some("first failure"));
    assert_eq!(sink.problems(), vec!["first failure"]);
}
