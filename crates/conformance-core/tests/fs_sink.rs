//! Publishing verdicts to the filesystem sink.

use conformance_core::sink::PublishedVerdict;
use conformance_core::{
    FsVerdictSink, PublishOutcome, Submission, Verdict, VerdictSink, VerdictState,
};

fn verdict(state: VerdictState, labels: &[&str]) -> Verdict {
    Verdict {
        comment: format!("verdict is {state}"),
        labels: labels.iter().map(|l| l.to_string()).collect(),
        state,
    }
}

fn read_record(sink: &FsVerdictSink, id: u64) -> PublishedVerdict {
    let raw = std::fs::read(sink.submission_dir(id).join(FsVerdictSink::VERDICT_FILE)).unwrap();
    serde_json::from_slice(&raw).unwrap()
}

#[tokio::test]
async fn publish_writes_verdict_and_comment() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FsVerdictSink::new(dir.path());
    let mut submission = Submission::new(12, "Conformance results for v1.30/Acme");
    submission.labels = vec!["not-verifiable".to_string(), "lgtm".to_string()];
    let v = verdict(
        VerdictState::Success,
        &["conformance-product-submission", "release-documents-checked"],
    );

    let outcome = sink.publish(&submission, &v).await.unwrap();

    assert_eq!(outcome, PublishOutcome::Published);
    let comment =
        std::fs::read_to_string(sink.submission_dir(12).join(FsVerdictSink::COMMENT_FILE)).unwrap();
    assert_eq!(comment, v.comment);

    let record = read_record(&sink, 12);
    assert_eq!(record.submission_id, 12);
    assert_eq!(record.digest, v.digest());
    assert_eq!(record.verdict, v);
    assert_eq!(record.labels.add, v.labels);
    assert_eq!(record.labels.remove, vec!["not-verifiable".to_string()]);
}

#[tokio::test]
async fn republishing_same_verdict_is_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FsVerdictSink::new(dir.path());
    let submission = Submission::new(4, "t");
    let v = verdict(VerdictState::Failure, &["not-verifiable"]);

    assert_eq!(sink.publish(&submission, &v).await.unwrap(), PublishOutcome::Published);
    assert_eq!(sink.publish(&submission, &v).await.unwrap(), PublishOutcome::Unchanged);

    let changed = verdict(VerdictState::Success, &["release-documents-checked"]);
    assert_eq!(
        sink.publish(&submission, &changed).await.unwrap(),
        PublishOutcome::Published
    );
    assert_eq!(read_record(&sink, 4).verdict.state, VerdictState::Success);
}

#[tokio::test]
async fn sinks_are_usable_as_trait_objects() {
    let dir = tempfile::tempdir().unwrap();
    let sinks: Vec<Box<dyn VerdictSink>> = vec![
        Box::new(FsVerdictSink::new(dir.path())),
        Box::new(conformance_core::MemoryVerdictSink::new()),
    ];
    let submission = Submission::new(1, "t");
    let v = verdict(VerdictState::Pending, &["unable-to-process"]);

    for sink in &sinks {
        assert_eq!(sink.publish(&submission, &v).await.unwrap(), PublishOutcome::Published);
    }
}
