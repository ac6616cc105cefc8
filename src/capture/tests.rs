use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};

use super::*;
use crate::notice::Severity;

fn frame() -> RgbImage {
    RgbImage::from_fn(400, 400, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
}

fn session_in(root: &Path) -> CaptureSession<FrameSource> {
    let config = CaptureConfig {
        dataset_root: root.to_path_buf(),
        ..CaptureConfig::default()
    };
    CaptureSession::new(FrameSource::new(frame()), config)
}

fn drag<S: ScreenSource>(
    session: &mut CaptureSession<S>,
    from: (f64, f64),
    to: (f64, f64),
) -> Result<ReleaseOutcome, CaptureError> {
    session.press(Point::new(from.0, from.1));
    session.drag_to(Point::new((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0));
    session.release(Point::new(to.0, to.1))
}

/// Session annotating target (100,100)-(300,300) with class "car".
fn annotating_session(root: &Path) -> CaptureSession<FrameSource> {
    let mut session = session_in(root);
    session.enter_target_selection();
    drag(&mut session, (100.0, 100.0), (300.0, 300.0)).unwrap();
    session.confirm_target().unwrap();
    session.set_active_class("car").unwrap();
    session
}

fn files_in(folder: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(folder)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[test]
fn test_full_capture_flow() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(dir.path());
    assert_eq!(session.state(), CaptureState::Idle);
    assert!(!session.press(Point::new(1.0, 1.0)));

    session.enter_target_selection();
    assert_eq!(session.state(), CaptureState::SelectingTarget);

    // Corners in reverse order are min-maxed
    let outcome = drag(&mut session, (300.0, 300.0), (100.0, 100.0)).unwrap();
    assert_eq!(
        outcome,
        ReleaseOutcome::TargetCandidate(PixelRect::new(100, 100, 300, 300))
    );

    let target = session.confirm_target().unwrap();
    assert_eq!(session.state(), CaptureState::Annotating);
    assert_eq!(target.image_path, dir.path().join("images").join("00001.jpg"));
    assert_eq!(target.label_path, dir.path().join("labels").join("00001.txt"));
    assert_eq!(image::image_dimensions(&target.image_path).unwrap(), (200, 200));

    assert!(!session.set_active_class("car").unwrap());
    let outcome = drag(&mut session, (150.0, 150.0), (250.0, 200.0)).unwrap();
    let ReleaseOutcome::Annotated(committed) = outcome else {
        panic!("expected an annotation");
    };

    assert_eq!(committed.region, PixelRect::new(150, 150, 250, 200));
    assert_eq!(committed.crop_path, dir.path().join("car").join("001.jpg"));
    assert_eq!(image::image_dimensions(&committed.crop_path).unwrap(), (100, 50));
    assert_eq!(
        fs::read_to_string(&target.label_path).unwrap(),
        "car 0.500000 0.375000 0.500000 0.250000\n"
    );
    assert_eq!(session.committed_boxes().len(), 1);

    let pending = session.pending_undo().unwrap();
    assert_eq!(pending.label_line, "car 0.500000 0.375000 0.500000 0.250000\n");
    assert_eq!(pending.handle, committed.handle);
}

#[test]
fn test_second_annotation_numbers_and_appends() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = annotating_session(dir.path());

    drag(&mut session, (110.0, 110.0), (130.0, 130.0)).unwrap();
    drag(&mut session, (200.0, 200.0), (260.0, 280.0)).unwrap();

    assert_eq!(files_in(&dir.path().join("car")), vec!["001.jpg", "002.jpg"]);
    let label = fs::read_to_string(dir.path().join("labels").join("00001.txt")).unwrap();
    assert_eq!(label.lines().count(), 2);
    assert_eq!(session.committed_boxes().len(), 2);
}

#[test]
fn test_confirm_requires_drawn_target() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(dir.path());

    assert!(matches!(
        session.confirm_target(),
        Err(CaptureError::NoTargetDrawn)
    ));

    session.enter_target_selection();
    assert!(matches!(
        session.confirm_target(),
        Err(CaptureError::NoTargetDrawn)
    ));
    assert_eq!(session.state(), CaptureState::SelectingTarget);
    assert!(files_in(&dir.path().join("images")).is_empty());
}

#[test]
fn test_confirm_failure_returns_to_idle() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(dir.path());
    session.enter_target_selection();
    // Extends past the 400x400 frame
    drag(&mut session, (350.0, 350.0), (450.0, 450.0)).unwrap();

    assert!(matches!(
        session.confirm_target(),
        Err(CaptureError::Source(SourceError::OutOfFrame { .. }))
    ));
    assert_eq!(session.state(), CaptureState::Idle);
    assert!(session.active_target().is_none());
}

#[test]
fn test_tiny_drag_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = annotating_session(dir.path());

    let outcome = drag(&mut session, (150.0, 150.0), (150.5, 220.0)).unwrap();
    assert_eq!(outcome, ReleaseOutcome::Discarded);
    assert!(session.committed_boxes().is_empty());
    assert!(files_in(&dir.path().join("car")).is_empty());

    assert_eq!(
        session.release(Point::new(0.0, 0.0)).unwrap(),
        ReleaseOutcome::Ignored
    );
}

#[test]
fn test_clip_rejection_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = annotating_session(dir.path());

    assert!(matches!(
        drag(&mut session, (0.0, 0.0), (50.0, 50.0)),
        Err(CaptureError::OutsideTarget)
    ));
    assert!(files_in(&dir.path().join("car")).is_empty());
    assert!(!dir.path().join("labels").join("00001.txt").exists());
    assert!(session.committed_boxes().is_empty());
    assert!(session.pending_undo().is_none());
}

#[test]
fn test_partial_overlap_is_clipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = annotating_session(dir.path());

    let ReleaseOutcome::Annotated(committed) =
        drag(&mut session, (50.0, 50.0), (150.0, 150.0)).unwrap()
    else {
        panic!("expected an annotation");
    };
    assert_eq!(committed.region, PixelRect::new(100, 100, 150, 150));
    assert!((committed.bbox.x_center - 0.125).abs() < 1e-9);
    assert!((committed.bbox.width - 0.25).abs() < 1e-9);
}

#[test]
fn test_annotation_requires_class() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(dir.path());
    session.enter_target_selection();
    drag(&mut session, (100.0, 100.0), (300.0, 300.0)).unwrap();
    session.confirm_target().unwrap();

    assert!(matches!(
        drag(&mut session, (150.0, 150.0), (250.0, 250.0)),
        Err(CaptureError::NoActiveClass)
    ));
    assert!(!dir.path().join("labels").join("00001.txt").exists());
}

#[test]
fn test_set_active_class_rules() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(dir.path());
    assert!(matches!(
        session.set_active_class("car"),
        Err(CaptureError::InvalidState { .. })
    ));

    let mut session = annotating_session(dir.path());
    assert!(session.set_active_class("  red car ").unwrap());
    assert_eq!(session.active_class(), Some("red_car"));
    assert!(dir.path().join("red_car").is_dir());

    assert!(matches!(
        session.set_active_class("   "),
        Err(CaptureError::EmptyClassName)
    ));
    assert_eq!(session.active_class(), Some("red_car"));
}

#[test]
fn test_class_with_any_whitespace_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = annotating_session(dir.path());

    assert!(session.set_active_class("big\tred\u{a0}car").unwrap());
    assert_eq!(session.active_class(), Some("big_red_car"));

    drag(&mut session, (110.0, 110.0), (130.0, 130.0)).unwrap();
    let boxes = crate::format::load(&dir.path().join("labels").join("00001.txt")).unwrap();
    assert_eq!(boxes.len(), 1);
    assert_eq!(boxes[0].class_id, "big_red_car");
}

#[test]
fn test_undo_reverts_last_commit() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = annotating_session(dir.path());
    let label_path = dir.path().join("labels").join("00001.txt");

    drag(&mut session, (110.0, 110.0), (130.0, 130.0)).unwrap();
    drag(&mut session, (200.0, 200.0), (260.0, 280.0)).unwrap();
    let first_line = fs::read_to_string(&label_path)
        .unwrap()
        .lines()
        .next()
        .unwrap()
        .to_string();

    let report = session.undo_last().unwrap();
    assert!(report.label_line_removed);
    assert!(report.crop_deleted);
    assert_eq!(report.notices.last().unwrap().severity, Severity::Info);

    assert_eq!(fs::read_to_string(&label_path).unwrap(), format!("{}\n", first_line));
    assert_eq!(files_in(&dir.path().join("car")), vec!["001.jpg"]);
    assert_eq!(session.committed_boxes().len(), 1);

    // Only one level of undo
    assert!(matches!(
        session.undo_last(),
        Err(CaptureError::NothingToUndo)
    ));
}

#[test]
fn test_undo_keeps_externally_modified_label_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = annotating_session(dir.path());
    let label_path = dir.path().join("labels").join("00001.txt");

    drag(&mut session, (150.0, 150.0), (250.0, 200.0)).unwrap();
    crate::format::append_line(&label_path, "7 0.1 0.1 0.1 0.1\n").unwrap();

    let report = session.undo_last().unwrap();
    assert!(!report.label_line_removed);
    assert!(report.crop_deleted);
    assert!(report
        .notices
        .iter()
        .any(|n| n.severity == Severity::Warning && n.path.as_deref() == Some(label_path.as_path())));

    let label = fs::read_to_string(&label_path).unwrap();
    assert_eq!(label.lines().count(), 2);
    assert!(files_in(&dir.path().join("car")).is_empty());
    assert!(session.pending_undo().is_none());
}

#[test]
fn test_undo_with_crop_already_gone() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = annotating_session(dir.path());

    let ReleaseOutcome::Annotated(committed) =
        drag(&mut session, (150.0, 150.0), (250.0, 200.0)).unwrap()
    else {
        panic!("expected an annotation");
    };
    fs::remove_file(&committed.crop_path).unwrap();

    let report = session.undo_last().unwrap();
    assert!(report.label_line_removed);
    assert!(!report.crop_deleted);
    assert!(report.reverted_anything());
}

#[test]
fn test_new_target_invalidates_undo() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = annotating_session(dir.path());
    drag(&mut session, (150.0, 150.0), (250.0, 200.0)).unwrap();
    assert!(session.pending_undo().is_some());

    session.enter_target_selection();
    assert!(session.pending_undo().is_none());
    assert!(session.committed_boxes().is_empty());
    assert!(matches!(
        session.undo_last(),
        Err(CaptureError::InvalidState { .. })
    ));

    drag(&mut session, (0.0, 0.0), (100.0, 100.0)).unwrap();
    let target = session.confirm_target().unwrap();
    assert_eq!(target.image_path, dir.path().join("images").join("00002.jpg"));
    // The class carries over to the next target
    assert_eq!(session.active_class(), Some("car"));
    assert!(matches!(
        session.undo_last(),
        Err(CaptureError::NothingToUndo)
    ));
    assert_eq!(files_in(&dir.path().join("car")), vec!["001.jpg"]);
}

#[test]
fn test_label_append_failure_reports_both_paths() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = annotating_session(dir.path());
    drag(&mut session, (110.0, 110.0), (130.0, 130.0)).unwrap();
    assert!(session.pending_undo().is_some());

    // Replace the label file with a directory so the append fails
    let label_path = dir.path().join("labels").join("00001.txt");
    fs::remove_file(&label_path).unwrap();
    fs::create_dir(&label_path).unwrap();

    match drag(&mut session, (150.0, 150.0), (250.0, 200.0)) {
        Err(CaptureError::LabelAppendFailed { crop, label, .. }) => {
            assert!(crop.exists());
            assert_eq!(label, label_path);
        }
        other => panic!("expected LabelAppendFailed, got {:?}", other),
    }
    assert!(session.pending_undo().is_none());
    assert_eq!(session.committed_boxes().len(), 1);
}

/// Source that records the hide/show calls around each grab.
struct RecordingSource {
    inner: FrameSource,
    calls: Vec<&'static str>,
}

impl ScreenSource for RecordingSource {
    fn capture(&mut self, region: PixelRect) -> Result<RgbImage, SourceError> {
        self.calls.push("capture");
        self.inner.capture(region)
    }

    fn before_capture(&mut self, settle: Duration) {
        assert_eq!(settle, Duration::from_millis(200));
        self.calls.push("hide");
    }

    fn after_capture(&mut self) {
        self.calls.push("show");
    }
}

#[test]
fn test_overlay_hidden_around_every_grab() {
    let dir = tempfile::tempdir().unwrap();
    let source = RecordingSource {
        inner: FrameSource::new(frame()),
        calls: Vec::new(),
    };
    let config = CaptureConfig {
        dataset_root: dir.path().to_path_buf(),
        ..CaptureConfig::default()
    };
    let mut session = CaptureSession::new(source, config);

    session.enter_target_selection();
    drag(&mut session, (500.0, 500.0), (600.0, 600.0)).unwrap();
    assert!(session.confirm_target().is_err());
    assert_eq!(session.source().calls, vec!["hide", "capture", "show"]);
}
