//! Stand-in analyzer for tests: faces are keyed by an image's top-left colour.

use facematch_core::detector::DetectorError;
use facematch_core::{AnalyzerError, CapabilityReport, Descriptor, FaceAnalyzer};
use image::{ImageFormat, Rgb, RgbImage};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub struct FakeAnalyzer {
    faces: HashMap<[u8; 3], Vec<Descriptor>>,
    failing: HashSet<[u8; 3]>,
    slow: HashMap<[u8; 3], Duration>,
    capabilities: CapabilityReport,
}

impl FakeAnalyzer {
    pub fn new() -> Self {
        Self {
            faces: HashMap::new(),
            failing: HashSet::new(),
            slow: HashMap::new(),
            capabilities: CapabilityReport::all_ready(),
        }
    }

    /// Add one face with the given descriptor to images of `color`.
    pub fn face(mut self, color: [u8; 3], values: &[f32]) -> Self {
        self.faces
            .entry(color)
            .or_default()
            .push(Descriptor::new(values.to_vec()));
        self
    }

    pub fn failing(mut self, color: [u8; 3]) -> Self {
        self.failing.insert(color);
        self
    }

    pub fn slow(mut self, color: [u8; 3], delay: Duration) -> Self {
        self.slow.insert(color, delay);
        self
    }

    pub fn with_capabilities(mut self, capabilities: CapabilityReport) -> Self {
        self.capabilities = capabilities;
        self
    }
}

impl FaceAnalyzer for FakeAnalyzer {
    fn describe(&mut self, image: &RgbImage) -> Result<Vec<Descriptor>, AnalyzerError> {
        let color = image.get_pixel(0, 0).0;
        if let Some(delay) = self.slow.get(&color) {
            std::thread::sleep(*delay);
        }
        if self.failing.contains(&color) {
            return Err(DetectorError::InferenceFailed("fake inference failure".into()).into());
        }
        Ok(self.faces.get(&color).cloned().unwrap_or_default())
    }

    fn capabilities(&self) -> CapabilityReport {
        self.capabilities
    }
}

/// A small solid-colour image.
pub fn swatch(color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(4, 4, Rgb(color))
}

/// Write a solid-colour PNG into `dir` and return its file name.
pub fn write_swatch(dir: &Path, name: &str, color: [u8; 3]) -> String {
    let file = format!("{name}.png");
    swatch(color).save(dir.join(&file)).unwrap();
    file
}

/// Serve one solid-colour PNG over HTTP on a local port, answering only after
/// `delay`. Returns the URL.
pub async fn serve_swatch_after(color: [u8; 3], delay: Duration) -> String {
    let mut body = Cursor::new(Vec::new());
    swatch(color).write_to(&mut body, ImageFormat::Png).unwrap();
    let body = body.into_inner();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = sock.read(&mut buf).await;
        tokio::time::sleep(delay).await;
        let header = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        sock.write_all(header.as_bytes()).await.unwrap();
        sock.write_all(&body).await.unwrap();
        sock.flush().await.unwrap();
    });
    format!("http://{addr}/swatch.png")
}
