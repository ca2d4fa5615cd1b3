//! Session lifecycle: upload, reopen, replacement and failure handling.

use veil::client::{ClientError, RevealFault};
use veil::{ImageId, Notice, RegionId, RevealState, ViewerError};
use veil_testkit::fixtures::{png_bytes, scenario_image, second_image, TestFixture, REDACTED_COLOR};

fn r1() -> RegionId {
    RegionId::new("r1")
}

#[tokio::test]
async fn test_upload_installs_session_with_dimensions() {
    let fixture = TestFixture::new();
    let epoch = fixture.load_scenario().await.unwrap();

    assert_eq!(fixture.viewer.epoch().await, epoch);
    let session = fixture.viewer.session().await.unwrap();
    assert_eq!(session.image_id.as_str(), "img-1");
    assert_eq!(session.redacted_url, "http://localhost:8000/images/img-1/redacted");
    let dims = session.dimensions.unwrap();
    assert_eq!((dims.width(), dims.height()), (100, 100));
}

#[tokio::test]
async fn test_new_upload_clears_revealed_regions() {
    let fixture = TestFixture::new();
    let first = fixture.load_scenario().await.unwrap();
    fixture.viewer.set_reviewer(true).await;
    assert!(fixture.viewer.reveal(&r1()).await.is_revealed());

    let second = fixture.upload(second_image()).await.unwrap();

    assert!(second > first);
    assert_eq!(fixture.viewer.revealed_count().await, 0);
    assert_eq!(fixture.viewer.state(&r1()).await, Some(RevealState::Redacted));
    let scene = fixture.viewer.render().await.unwrap();
    assert_eq!(scene.image_id.as_str(), "img-2");
    assert_eq!(scene.overlays.len(), 1);
    assert!(scene.overlays[0].content.is_none());
}

#[tokio::test]
async fn test_reupload_of_same_image_is_a_new_session() {
    let fixture = TestFixture::new();
    let first = fixture.load_scenario().await.unwrap();
    fixture.viewer.set_reviewer(true).await;
    fixture.viewer.reveal(&r1()).await;

    let second = fixture.load_scenario().await.unwrap();

    assert_ne!(first, second);
    assert_eq!(fixture.viewer.revealed_count().await, 0);
}

#[tokio::test]
async fn test_failed_upload_keeps_current_session() {
    let fixture = TestFixture::new();
    let epoch = fixture.load_scenario().await.unwrap();
    fixture.viewer.set_reviewer(true).await;
    fixture.viewer.reveal(&r1()).await;

    fixture
        .backend
        .fail_next_ingest(ClientError::Status {
            status: 400,
            message: "Unsupported image format".into(),
        })
        .await;
    let err = fixture.upload(second_image()).await.unwrap_err();

    assert!(matches!(err, ViewerError::Client(ClientError::Status { status: 400, .. })));
    assert_eq!(fixture.viewer.epoch().await, epoch);
    assert_eq!(fixture.viewer.session().await.unwrap().image_id.as_str(), "img-1");
    assert_eq!(fixture.viewer.state(&r1()).await, Some(RevealState::Revealed));

    let notices = fixture.viewer.notices().await;
    assert_eq!(notices.len(), 1);
    assert!(matches!(notices[0], Notice::UploadFailed { .. }));
    assert_eq!(notices[0].message(), "Upload failed");
}

#[tokio::test]
async fn test_upload_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photo.png");
    std::fs::write(&path, png_bytes(4, 4, REDACTED_COLOR)).unwrap();

    let fixture = TestFixture::new();
    fixture.backend.stage(scenario_image()).await;

    fixture.viewer.upload_path(&path).await.unwrap();
    assert_eq!(fixture.viewer.session().await.unwrap().regions.len(), 3);
}

#[tokio::test]
async fn test_upload_from_missing_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = TestFixture::new();

    let err = fixture
        .viewer
        .upload_path(dir.path().join("missing.png"))
        .await
        .unwrap_err();

    assert!(matches!(err, ViewerError::Io(_)));
    assert!(fixture.viewer.session().await.is_none());
    assert_eq!(fixture.viewer.notices().await[0].message(), "Upload failed");
}

#[tokio::test]
async fn test_open_from_manifest() {
    let fixture = TestFixture::new();
    fixture.backend.insert(scenario_image()).await;

    fixture.viewer.open(&ImageId::new("img-1")).await.unwrap();

    let session = fixture.viewer.session().await.unwrap();
    // The manifest lists only regions that can be revealed.
    assert_eq!(session.regions.len(), 2);
    assert!(session.regions.iter().all(|r| r.id.is_some()));
    assert!(session.dimensions.is_some());

    fixture.viewer.set_reviewer(true).await;
    assert!(fixture.viewer.reveal(&r1()).await.is_revealed());
}

#[tokio::test]
async fn test_open_unknown_image_fails() {
    let fixture = TestFixture::new();

    let err = fixture.viewer.open(&ImageId::new("ghost")).await.unwrap_err();

    assert!(matches!(err, ViewerError::Client(ClientError::Status { status: 404, .. })));
    let notices = fixture.viewer.notices().await;
    assert!(matches!(notices[0], Notice::OpenFailed { .. }));
}

#[tokio::test]
async fn test_stale_base_image_load_is_rejected() {
    let config = veil::ViewerConfig {
        load_base_image: false,
        ..veil::ViewerConfig::default()
    };
    let fixture = TestFixture::with_config(config);
    let old = fixture.load_scenario().await.unwrap();
    let new = fixture.upload(second_image()).await.unwrap();

    let err = fixture.viewer.load_base_image(old).await.unwrap_err();
    assert!(matches!(err, ViewerError::Store(_)));
    assert!(fixture.viewer.session().await.unwrap().dimensions.is_none());

    fixture.viewer.load_base_image(new).await.unwrap();
    assert!(fixture.viewer.session().await.unwrap().dimensions.is_some());
}

#[tokio::test]
async fn test_denial_does_not_consume_injected_fault() {
    let fixture = TestFixture::new();
    fixture.load_scenario().await.unwrap();
    fixture.backend.inject(RevealFault::Status(500)).await;

    // Denied before the backend gets to the fault.
    assert!(!fixture.viewer.reveal(&r1()).await.is_revealed());
    fixture.viewer.set_reviewer(true).await;
    assert!(!fixture.viewer.reveal(&r1()).await.is_revealed());
    assert!(fixture.viewer.reveal(&r1()).await.is_revealed());

    let messages: Vec<_> = fixture
        .viewer
        .notices()
        .await
        .iter()
        .map(|n| n.message())
        .collect();
    assert_eq!(
        messages,
        vec!["Reviewer role required. Toggle Reviewer.", "Decrypt failed"]
    );
}
