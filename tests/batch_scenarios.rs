//! End-to-end batch scenarios against the mock provider.

use std::path::{Path, PathBuf};

use sn_batch::batch::{ArtifactDisposition, BatchState, KEY_FILE_NAME, SIGNED_DIR_NAME};
use sn_batch::mock::{FailureConfig, MockOp, MockProvider};
use sn_batch::{
    BatchError, BatchOutput, BatchRequest, BatchSettings, ExitCode, LoggingBatch, Orchestrator,
    ReferenceBatch, Status, TaskItem,
};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    provider: MockProvider,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            provider: MockProvider::new(),
        }
    }

    fn key_path(&self) -> PathBuf {
        self.dir.path().join("tool").join(KEY_FILE_NAME)
    }

    fn output_dir(&self) -> PathBuf {
        self.dir.path().join("bin")
    }

    fn signed_dir(&self) -> PathBuf {
        self.output_dir().join(SIGNED_DIR_NAME)
    }

    fn run(&self, references: &[&str], copy_local: &[&str]) -> BatchOutput<TaskItem> {
        self.try_run(references, copy_local).unwrap()
    }

    fn try_run(
        &self,
        references: &[&str],
        copy_local: &[&str],
    ) -> Result<BatchOutput<TaskItem>, BatchError> {
        let batch = LoggingBatch::new(Orchestrator::new(
            self.provider.clone(),
            BatchSettings::new(self.key_path()),
        ));
        let request = BatchRequest::new(items(references), self.output_dir())
            .with_copy_local(items(copy_local));
        batch.execute(request)
    }
}

fn items(paths: &[&str]) -> Vec<TaskItem> {
    paths.iter().map(|p| TaskItem::new(*p)).collect()
}

fn paths(items: &[TaskItem]) -> Vec<PathBuf> {
    items.iter().map(|i| i.item_spec.clone()).collect()
}

// =============================================================================
// Two unsigned artifacts, A references B
// =============================================================================

#[test]
fn test_unsigned_pair_is_signed_and_relinked() {
    let fx = Fixture::new();
    fx.provider.add_unsigned("/in/A.dll");
    fx.provider.add_unsigned("/in/B.dll");
    fx.provider.add_reference("/in/A.dll", "/in/B.dll");

    let output = fx.run(&["/in/A.dll", "/in/B.dll"], &["/in/B.dll", "/in/readme.txt"]);

    let new_a = fx.signed_dir().join("A.dll");
    let new_b = fx.signed_dir().join("B.dll");
    assert_eq!(paths(&output.references), vec![new_a.clone(), new_b.clone()]);

    // A's stored reference now resolves to B's signed copy
    let reference = fx.provider.reference(&new_a, &new_b).unwrap();
    assert_eq!(reference.target, new_b);
    assert!(reference.signed);

    // Both renames recorded, in input order
    let renames: Vec<_> = output
        .report
        .renames
        .iter()
        .map(|r| (r.from.clone(), r.to.clone()))
        .collect();
    assert_eq!(
        renames,
        vec![
            (PathBuf::from("/in/A.dll"), new_a),
            (PathBuf::from("/in/B.dll"), new_b.clone()),
        ]
    );

    // Auxiliary list follows the rename; unrelated entries untouched
    assert_eq!(
        paths(&output.copy_local),
        vec![new_b, PathBuf::from("/in/readme.txt")]
    );

    assert!(output.success());
    assert_eq!(output.report.status, Status::Success);
    assert_eq!(output.report.signed_count, 2);
    assert_eq!(output.report.exit_code(), ExitCode::Success);
    assert!(fx.key_path().is_file());
}

#[test]
fn test_reconciliation_covers_all_ordered_pairs() {
    let fx = Fixture::new();
    for name in ["/in/A.dll", "/in/B.dll", "/in/C.dll"] {
        fx.provider.add_unsigned(name);
    }
    fx.provider.add_reference("/in/A.dll", "/in/B.dll");
    fx.provider.add_reference("/in/B.dll", "/in/C.dll");
    fx.provider.add_reference("/in/C.dll", "/in/A.dll");

    let output = fx.run(&["/in/A.dll", "/in/B.dll", "/in/C.dll"], &[]);

    let reconciliation = output.report.reconciliation.as_ref().unwrap();
    assert_eq!(reconciliation.pairs_checked, 6);
    assert_eq!(reconciliation.references_fixed, 3);
    assert_eq!(fx.provider.calls_for(MockOp::FixReference), 6);

    for (from, to) in [("A", "B"), ("B", "C"), ("C", "A")] {
        let from = fx.signed_dir().join(format!("{from}.dll"));
        let to = fx.signed_dir().join(format!("{to}.dll"));
        assert_eq!(fx.provider.reference(&from, &to).unwrap().target, to);
    }
}

#[test]
fn test_signed_artifact_referencing_newly_signed_one_is_fixed() {
    let fx = Fixture::new();
    fx.provider.add_signed("/in/A.dll");
    fx.provider.add_unsigned("/in/B.dll");
    fx.provider.add_reference("/in/A.dll", "/in/B.dll");

    let output = fx.run(&["/in/A.dll", "/in/B.dll"], &[]);

    let new_b = fx.signed_dir().join("B.dll");
    assert_eq!(
        paths(&output.references),
        vec![PathBuf::from("/in/A.dll"), new_b.clone()]
    );
    assert_eq!(
        fx.provider.reference("/in/A.dll", &new_b).unwrap().target,
        new_b
    );
    assert_eq!(output.report.renames.len(), 1);
}

// =============================================================================
// Already signed input, no key yet
// =============================================================================

#[test]
fn test_already_signed_creates_key_without_rename() {
    let fx = Fixture::new();
    fx.provider.add_signed("/in/C.dll");
    assert!(!fx.key_path().exists());

    let output = fx.run(&["/in/C.dll"], &["/in/C.dll"]);

    assert!(fx.key_path().is_file());
    assert!(output.report.key.as_ref().unwrap().created);
    assert_eq!(paths(&output.references), vec![PathBuf::from("/in/C.dll")]);
    assert_eq!(paths(&output.copy_local), vec![PathBuf::from("/in/C.dll")]);
    assert!(output.report.renames.is_empty());
    assert_eq!(fx.provider.sign_calls(), 0);
}

#[test]
fn test_no_op_when_everything_is_signed() {
    let fx = Fixture::new();
    fx.provider.add_signed("/in/A.dll");
    fx.provider.add_signed("/in/B.dll");
    fx.provider.add_reference("/in/A.dll", "/in/B.dll");
    fx.provider.add_friend("/in/A.dll", "Tests", None);

    let input = ["/in/A.dll", "/in/B.dll"];
    let output = fx.run(&input, &["/in/B.dll"]);

    assert_eq!(paths(&output.references), paths(&items(&input)));
    assert!(output.report.renames.is_empty());
    assert_eq!(fx.provider.calls_for(MockOp::FixReference), 0);
    assert_eq!(fx.provider.calls_for(MockOp::RemoveInvalidFriends), 0);
    // friend scrub only touches newly signed artifacts
    assert_eq!(fx.provider.friends("/in/A.dll").len(), 1);
}

#[test]
fn test_second_run_on_output_is_stable() {
    let fx = Fixture::new();
    fx.provider.add_unsigned("/in/A.dll");
    fx.provider.add_unsigned("/in/B.dll");
    fx.provider.add_reference("/in/A.dll", "/in/B.dll");

    let first = fx.run(&["/in/A.dll", "/in/B.dll"], &[]);
    let key_fingerprint = first.report.key.as_ref().unwrap().fingerprint.clone();

    fx.provider.reset_calls();
    let second_input: Vec<String> = first
        .references
        .iter()
        .map(|i| i.item_spec.to_string_lossy().into_owned())
        .collect();
    let second_input: Vec<&str> = second_input.iter().map(String::as_str).collect();
    let second = fx.run(&second_input, &[]);

    assert!(second.report.renames.is_empty());
    assert_eq!(paths(&second.references), paths(&first.references));
    assert_eq!(fx.provider.sign_calls(), 0);
    assert_eq!(fx.provider.calls_for(MockOp::GenerateKeyPair), 0);

    let key = second.report.key.as_ref().unwrap();
    assert!(!key.created);
    assert_eq!(key.fingerprint, key_fingerprint);
}

// =============================================================================
// Friend declarations
// =============================================================================

#[test]
fn test_unkeyed_friend_declarations_are_pruned() {
    let fx = Fixture::new();
    fx.provider.add_unsigned("/in/A.dll");
    fx.provider.add_friend("/in/A.dll", "A.Tests", None);
    fx.provider.add_friend("/in/A.dll", "A.Keyed", Some("0024000004800000"));

    let output = fx.run(&["/in/A.dll"], &[]);

    let new_a = fx.signed_dir().join("A.dll");
    let friends = fx.provider.friends(&new_a);
    assert_eq!(friends.len(), 1);
    assert_eq!(friends[0].assembly, "A.Keyed");

    let scrub = output.report.scrub.as_ref().unwrap();
    assert_eq!(scrub.scrubbed, vec![new_a]);
    // the unsigned original is left alone
    assert_eq!(fx.provider.friends("/in/A.dll").len(), 2);
}

// =============================================================================
// Auxiliary list
// =============================================================================

#[test]
fn test_copy_local_keeps_length_and_order() {
    let fx = Fixture::new();
    fx.provider.add_unsigned("/in/A.dll");
    fx.provider.add_signed("/in/B.dll");

    let copy_local = ["/in/x.pdb", "/IN/a.DLL", "/in/B.dll", "/in/A.dll", "/in/y.xml"];
    let output = fx.run(&["/in/A.dll", "/in/B.dll"], &copy_local);

    let new_a = fx.signed_dir().join("A.dll");
    assert_eq!(
        paths(&output.copy_local),
        vec![
            PathBuf::from("/in/x.pdb"),
            new_a.clone(),
            PathBuf::from("/in/B.dll"),
            new_a,
            PathBuf::from("/in/y.xml"),
        ]
    );
}

#[test]
fn test_metadata_survives_rewrite() {
    let fx = Fixture::new();
    fx.provider.add_unsigned("/in/A.dll");

    let batch = Orchestrator::new(fx.provider.clone(), BatchSettings::new(fx.key_path()));
    let request = BatchRequest::new(
        vec![TaskItem::new("/in/A.dll").with_metadata("Private", "true")],
        fx.output_dir(),
    )
    .with_copy_local(vec![TaskItem::new("/in/A.dll").with_metadata("Link", "lib/A.dll")]);

    let output = batch.execute(request).unwrap();

    assert_eq!(output.references[0].metadata["Private"], "true");
    assert_eq!(output.copy_local[0].metadata["Link"], "lib/A.dll");
    assert_eq!(output.copy_local[0].item_spec, fx.signed_dir().join("A.dll"));
}

// =============================================================================
// Degenerate inputs and failures
// =============================================================================

#[test]
fn test_empty_reference_list() {
    let fx = Fixture::new();

    let output = fx.run(&[], &["/in/A.dll"]);

    assert!(output.references.is_empty());
    assert!(output.copy_local.is_empty());
    assert!(output.success());
    assert_eq!(output.report.states, vec![BatchState::Idle, BatchState::Done]);
    assert!(!fx.key_path().exists());
    assert!(!fx.output_dir().exists());
}

#[test]
fn test_missing_output_dir_is_invalid_configuration() {
    let fx = Fixture::new();
    fx.provider.add_unsigned("/in/A.dll");

    let batch = Orchestrator::new(fx.provider.clone(), BatchSettings::new(fx.key_path()));
    let request = BatchRequest {
        references: items(&["/in/A.dll"]),
        output_dir: None,
        copy_local: Vec::new(),
    };

    let err = batch.execute(request).unwrap_err();
    assert!(matches!(err, BatchError::InvalidConfiguration(_)));
    assert_eq!(err.exit_code(), ExitCode::InvalidConfiguration);
    assert!(!fx.key_path().exists());
    assert!(fx.provider.calls().is_empty());
}

#[test]
fn test_unreadable_artifact_is_skipped() {
    let fx = Fixture::new();
    fx.provider.add_unsigned("/in/A.dll");
    fx.provider.add_unsigned("/in/B.dll");
    fx.provider.add_malformed("/in/native.dll");
    fx.provider.add_reference("/in/A.dll", "/in/B.dll");

    let output = fx.run(
        &["/in/native.dll", "/in/A.dll", "/in/missing.dll", "/in/B.dll"],
        &[],
    );

    assert_eq!(
        paths(&output.references),
        vec![
            PathBuf::from("/in/native.dll"),
            fx.signed_dir().join("A.dll"),
            PathBuf::from("/in/missing.dll"),
            fx.signed_dir().join("B.dll"),
        ]
    );
    let dispositions: Vec<_> = output.report.artifacts.iter().map(|a| a.disposition).collect();
    assert_eq!(
        dispositions,
        vec![
            ArtifactDisposition::Unreadable,
            ArtifactDisposition::Signed,
            ArtifactDisposition::Unreadable,
            ArtifactDisposition::Signed,
        ]
    );

    // reconciliation only pairs the two signed artifacts
    let reconciliation = output.report.reconciliation.as_ref().unwrap();
    assert_eq!(reconciliation.pairs_checked, 2);
    let skipped = [Path::new("/in/native.dll"), Path::new("/in/missing.dll")];
    for call in fx.provider.calls() {
        if call.op != MockOp::FixReference && call.op != MockOp::RemoveInvalidFriends {
            continue;
        }
        for path in [&call.artifact, &call.target].into_iter().flatten() {
            assert!(!skipped.contains(&path.as_path()), "{:?} touched {}", call.op, path.display());
        }
    }

    assert!(output.success());
    assert_eq!(output.report.status, Status::Degraded);
    assert_eq!(output.report.exit_code(), ExitCode::Success);
}

#[test]
fn test_same_file_name_in_two_directories_is_not_overwritten() {
    let fx = Fixture::new();
    fx.provider.add_unsigned("/a/X.dll");
    fx.provider.add_unsigned("/b/X.dll");

    let output = fx.run(&["/a/X.dll", "/b/X.dll"], &["/b/X.dll"]);

    assert_eq!(
        paths(&output.references),
        vec![fx.signed_dir().join("X.dll"), PathBuf::from("/b/X.dll")]
    );
    assert_eq!(paths(&output.copy_local), vec![PathBuf::from("/b/X.dll")]);
    assert_eq!(fx.provider.sign_calls(), 1);
    assert_eq!(output.report.signed_count, 1);
    assert_eq!(output.report.renames.len(), 1);

    let second = &output.report.artifacts[1];
    assert_eq!(second.disposition, ArtifactDisposition::SigningFailed);
    assert!(second.reason.as_deref().unwrap().contains("collides with '/a/X.dll'"));
    assert_eq!(output.report.status, Status::Failed);
    assert_eq!(output.report.exit_code(), ExitCode::SigningFailed);
}

#[test]
fn test_signing_failure_is_isolated() {
    let fx = Fixture::new();
    fx.provider.add_unsigned("/in/A.dll");
    fx.provider.add_unsigned("/in/B.dll");
    fx.provider.add_reference("/in/A.dll", "/in/B.dll");
    fx.provider.inject(
        MockOp::Sign,
        Some(Path::new("/in/B.dll")),
        FailureConfig::signing_failed("access denied"),
    );

    let output = fx.run(&["/in/A.dll", "/in/B.dll"], &["/in/B.dll"]);

    let new_a = fx.signed_dir().join("A.dll");
    assert_eq!(
        paths(&output.references),
        vec![new_a.clone(), PathBuf::from("/in/B.dll")]
    );
    // unsigned B stays where it was
    assert_eq!(paths(&output.copy_local), vec![PathBuf::from("/in/B.dll")]);
    assert_eq!(output.report.renames.len(), 1);

    let failed = &output.report.artifacts[1];
    assert_eq!(failed.disposition, ArtifactDisposition::SigningFailed);
    assert!(failed.reason.as_deref().unwrap().contains("access denied"));

    assert!(!output.success());
    assert_eq!(output.report.status, Status::Failed);
    assert_eq!(output.report.exit_code(), ExitCode::SigningFailed);
}

#[test]
fn test_reconciliation_failure_is_a_warning() {
    let fx = Fixture::new();
    fx.provider.add_unsigned("/in/A.dll");
    fx.provider.add_unsigned("/in/B.dll");
    fx.provider.add_reference("/in/A.dll", "/in/B.dll");
    fx.provider.inject(
        MockOp::FixReference,
        Some(fx.signed_dir().join("A.dll").as_path()),
        FailureConfig::error(sn_provider::ErrorCode::OperationFailed, "locked"),
    );

    let output = fx.run(&["/in/A.dll", "/in/B.dll"], &[]);

    assert!(output.success());
    assert_eq!(output.report.status, Status::Degraded);
    let reconciliation = output.report.reconciliation.as_ref().unwrap();
    assert_eq!(reconciliation.failures.len(), 1);
    assert_eq!(output.report.states.last(), Some(&BatchState::Done));
}

#[test]
fn test_duplicate_inputs_signed_once() {
    let fx = Fixture::new();
    fx.provider.add_unsigned("/in/A.dll");

    let output = fx.run(&["/in/A.dll", "/in/a.dll"], &[]);

    assert_eq!(fx.provider.sign_calls(), 1);
    let new_a = fx.signed_dir().join("A.dll");
    assert_eq!(paths(&output.references), vec![new_a.clone(), new_a]);
    assert_eq!(output.report.renames.len(), 1);
}

#[test]
fn test_report_round_trips_through_file() {
    let fx = Fixture::new();
    fx.provider.add_unsigned("/in/A.dll");

    let output = fx.run(&["/in/A.dll"], &[]);
    let path = fx.dir.path().join("batch_report.json");
    output.report.write_to_file(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let parsed = sn_batch::BatchReport::from_json(&text).unwrap();
    assert_eq!(parsed.batch_id, output.report.batch_id);
    assert_eq!(parsed.renames.len(), 1);
    assert_eq!(parsed.states, output.report.states);
}
