use target_follower::detect::{load_backend, BackendOptions, ScriptedBackend};
use target_follower::render::LogRenderer;
use target_follower::{
    BoundingBox, Camera, CameraConfig, Decision, Detection, Follower, FrameBudget, FrameStatus,
    ModelSpec, PipelineSettings, SelectionPolicy, SyntheticCamera,
};

const NET: u32 = 64;

fn camera() -> Camera {
    let config = CameraConfig {
        device: "stub://scenario".to_string(),
        width: 160,
        height: 120,
        target_fps: 0,
    };
    let mut camera = Camera::from_synthetic(SyntheticCamera::new(config));
    camera.connect().expect("connect synthetic camera");
    camera
}

fn settings(policy: SelectionPolicy) -> PipelineSettings {
    PipelineSettings {
        policy,
        print_decisions: false,
        ..PipelineSettings::default()
    }
}

fn follower(
    frames: Vec<Vec<Detection>>,
    policy: SelectionPolicy,
) -> Follower<ScriptedBackend, LogRenderer> {
    let backend = ScriptedBackend::new(NET, NET, 2).with_frames(frames);
    Follower::new(camera(), backend, LogRenderer::new("Main"), settings(policy))
        .expect("valid settings")
}

fn class0(x: f32, y: f32, score: f32) -> Detection {
    Detection::single(BoundingBox::new(x, y, 0.2, 0.2), 2, 0, score)
}

#[test]
fn single_detection_left_of_center_steers_left() {
    let mut follower = follower(vec![vec![class0(0.3, 0.4, 0.9)]], SelectionPolicy::BestMatch);

    let report = follower.step().unwrap();
    assert_eq!(report.status, FrameStatus::Processed);
    assert_eq!(report.decision, Decision::Left);
    assert_eq!(report.suppressed, 0);
    assert_eq!(report.targets.len(), 1);
    assert_eq!(report.targets[0].bbox, BoundingBox::new(0.3, 0.4, 0.2, 0.2));

    let renderer = follower.renderer();
    assert_eq!(renderer.presented(), 1);
    assert_eq!(renderer.last_texts(), vec!["LEFT"]);
}

#[test]
fn overlapping_duplicate_is_suppressed_and_stronger_box_selected() {
    let strong = class0(0.6, 0.5, 0.9);
    let weak = class0(0.61, 0.5, 0.6);
    for policy in [
        SelectionPolicy::FirstMatch,
        SelectionPolicy::BestMatch,
        SelectionPolicy::AllMatches,
    ] {
        // Weaker box first, so first-match only agrees once it is suppressed.
        let mut follower = follower(vec![vec![weak.clone(), strong.clone()]], policy);
        let report = follower.step().unwrap();

        assert_eq!(report.suppressed, 1, "{policy}");
        assert_eq!(report.detections, 2, "{policy}");
        assert_eq!(report.targets.len(), 1, "{policy}");
        assert_eq!(report.targets[0].index, 1, "{policy}");
        assert_eq!(report.targets[0].confidence, 0.9, "{policy}");
        assert_eq!(report.decision, Decision::Right, "{policy}");
        assert_eq!(follower.state().detections[0].score(0), 0.0);
    }
}

#[test]
fn detection_below_threshold_gives_none_and_no_overlay() {
    let mut follower = follower(vec![vec![class0(0.8, 0.5, 0.4)]], SelectionPolicy::BestMatch);

    let report = follower.step().unwrap();
    assert_eq!(report.decision, Decision::None);
    assert!(report.targets.is_empty());
    assert_eq!(follower.renderer().draw_calls(), 0);
    assert_eq!(follower.renderer().presented(), 1);
}

#[test]
fn empty_detection_set_gives_none_and_no_overlay() {
    let mut follower = follower(vec![vec![]], SelectionPolicy::AllMatches);

    let report = follower.step().unwrap();
    assert_eq!(report.decision, Decision::None);
    assert_eq!(report.detections, 0);
    assert_eq!(follower.renderer().draw_calls(), 0);
    assert_eq!(follower.renderer().presented(), 1);
}

#[test]
fn other_classes_are_ignored() {
    let other = Detection::single(BoundingBox::new(0.9, 0.5, 0.2, 0.2), 2, 1, 0.99);
    let mut follower = follower(vec![vec![other]], SelectionPolicy::BestMatch);
    assert_eq!(follower.step().unwrap().decision, Decision::None);
}

#[test]
fn all_matches_reports_every_target_and_last_one_decides() {
    let frame = vec![class0(0.7, 0.5, 0.8), class0(0.2, 0.5, 0.95)];

    let mut all = follower(vec![frame.clone()], SelectionPolicy::AllMatches);
    let report = all.step().unwrap();
    assert_eq!(report.targets.len(), 2);
    assert_eq!(report.decision, Decision::Left);
    assert_eq!(all.renderer().last_texts(), vec!["RIGHT", "LEFT"]);

    let mut first = follower(vec![frame.clone()], SelectionPolicy::FirstMatch);
    assert_eq!(first.step().unwrap().decision, Decision::Right);

    let mut best = follower(vec![frame], SelectionPolicy::BestMatch);
    assert_eq!(best.step().unwrap().decision, Decision::Left);
}

#[test]
fn backend_sees_original_frame_size_and_thresholds() {
    let mut follower = follower(vec![vec![]], SelectionPolicy::BestMatch);
    follower.step().unwrap();

    let request = follower.backend().requests()[0];
    assert_eq!((request.frame_width, request.frame_height), (160, 120));
    assert_eq!(request.confidence, 0.5);
    assert_eq!(request.hierarchy, 0.25);
    assert!(request.letterboxed);
}

#[test]
fn synthetic_run_steers_both_ways() {
    let model = ModelSpec::synthetic(NET, NET, 3);
    let backend = load_backend(&model, "stub://", &BackendOptions::default()).unwrap();
    let mut follower = Follower::new(
        camera(),
        backend,
        LogRenderer::new("Main"),
        settings(SelectionPolicy::BestMatch),
    )
    .unwrap();

    let stats = follower.run(&mut FrameBudget::new(60)).unwrap();
    assert_eq!(stats.iterations, 60);
    assert_eq!(stats.processed, 60);
    assert!(stats.left > 0, "{stats:?}");
    assert!(stats.right > 0, "{stats:?}");
    // The synthetic object is out of view every fifth frame.
    assert!(stats.none >= 12, "{stats:?}");
    assert_eq!(follower.renderer().presented(), 60);
}
