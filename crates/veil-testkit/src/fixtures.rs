//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::io::Cursor;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, Rgba, RgbaImage};

use veil::{Viewer, ViewerConfig};
use veil_client::{MemoryBackend, StagedImage, Upload};
use veil_core::{Polygon, Region};

/// Image id of [`scenario_image`].
pub const SCENARIO_IMAGE_ID: &str = "img-1";
/// Side length of the square scenario image.
pub const SCENARIO_SIZE: u32 = 100;
/// Colour of the redacted base image.
pub const REDACTED_COLOR: [u8; 4] = [0, 0, 0, 255];
/// Colour of every revealed patch in the scenario images.
pub const PATCH_COLOR: [u8; 4] = [200, 40, 40, 255];

/// Encode a solid-colour PNG.
pub fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .expect("encoding an in-memory PNG cannot fail");
    out.into_inner()
}

/// A solid-colour PNG as a `data:image/png;base64,` URL.
pub fn png_data_url(width: u32, height: u32, color: [u8; 4]) -> String {
    format!(
        "data:image/png;base64,{}",
        STANDARD.encode(png_bytes(width, height, color))
    )
}

/// The canonical 100x100 image:
///
/// - `r1`: face, (10,10)-(50,50), confidence 0.92, revealable
/// - `r2`: email, (60,20)-(90,30), confidence 0.75, revealable
/// - third region: name, (20,70)-(80,90), confidence 0.6, no id (view-only)
pub fn scenario_image() -> StagedImage {
    StagedImage::new(
        SCENARIO_IMAGE_ID,
        png_bytes(SCENARIO_SIZE, SCENARIO_SIZE, REDACTED_COLOR),
    )
    .with_region(
        Region::new("face", Polygon::rect(10.0, 10.0, 50.0, 50.0), 0.92).with_id("r1"),
        png_data_url(40, 40, PATCH_COLOR),
    )
    .with_region(
        Region::new("email", Polygon::rect(60.0, 20.0, 90.0, 30.0), 0.75).with_id("r2"),
        png_data_url(30, 10, PATCH_COLOR),
    )
    .with_region(
        Region::new("name", Polygon::rect(20.0, 70.0, 80.0, 90.0), 0.6),
        "",
    )
}

/// A second image reusing region id `r1`, with different geometry.
pub fn second_image() -> StagedImage {
    StagedImage::new("img-2", png_bytes(50, 50, REDACTED_COLOR)).with_region(
        Region::new("face", Polygon::rect(5.0, 5.0, 25.0, 25.0), 0.8).with_id("r1"),
        png_data_url(20, 20, [10, 200, 10, 255]),
    )
}

/// A viewer over an in-memory backend.
pub struct TestFixture {
    pub backend: Arc<MemoryBackend>,
    pub viewer: Viewer<MemoryBackend>,
}

impl TestFixture {
    /// Create a fixture with the default viewer configuration.
    pub fn new() -> Self {
        Self::with_config(ViewerConfig::default())
    }

    pub fn with_config(config: ViewerConfig) -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let viewer = Viewer::with_backend(Arc::clone(&backend), config);
        Self { backend, viewer }
    }

    /// Stage `image` and upload it through the viewer.
    pub async fn upload(&self, image: StagedImage) -> veil::Result<veil::SessionEpoch> {
        self.backend.stage(image).await;
        self.viewer
            .upload(Upload::new("upload.png", Vec::new()).with_media_type("image/png"))
            .await
    }

    /// Upload [`scenario_image`].
    pub async fn load_scenario(&self) -> veil::Result<veil::SessionEpoch> {
        self.upload(scenario_image()).await
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
