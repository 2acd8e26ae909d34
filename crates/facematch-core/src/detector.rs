//! SCRFD face detector via ONNX Runtime.
//!
//! Anchor-free decoding over three strides followed by NMS. Exports that
//! carry the keypoint head (nine outputs) also yield five landmarks per face,
//! which the alignment stage needs; six-output exports detect boxes only.

use crate::types::BoundingBox;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const SCRFD_INPUT_SIZE: u32 = 640;
const SCRFD_MEAN: f32 = 127.5;
const SCRFD_STD: f32 = 128.0;
const SCRFD_CONFIDENCE_THRESHOLD: f32 = 0.5;
const SCRFD_NMS_THRESHOLD: f32 = 0.4;
const SCRFD_STRIDES: [usize; 3] = [8, 16, 32];
const SCRFD_ANCHORS_PER_CELL: usize = 2;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0}; fetch it from insightface into the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Scale and padding applied when fitting an image into the square input.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
    new_w: u32,
    new_h: u32,
}

impl Letterbox {
    fn fit(width: u32, height: u32, target: u32) -> Self {
        let scale = (target as f32 / width as f32).min(target as f32 / height as f32);
        let new_w = ((width as f32 * scale).round() as u32).clamp(1, target);
        let new_h = ((height as f32 * scale).round() as u32).clamp(1, target);
        Self {
            scale,
            pad_x: (target - new_w) as f32 / 2.0,
            pad_y: (target - new_h) as f32 / 2.0,
            new_w,
            new_h,
        }
    }

    /// Map a point from letterboxed input space back to the original image.
    fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Output tensor indices for one stride: score, bbox and optional keypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StrideOutputs {
    score: usize,
    bbox: usize,
    kps: Option<usize>,
}

/// SCRFD-based face detector.
pub struct FaceDetector {
    session: Session,
    strides: [StrideOutputs; 3],
}

impl FaceDetector {
    /// Load the SCRFD ONNX model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, DetectorError> {
        if !model_path.exists() {
            return Err(DetectorError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();

        tracing::info!(
            path = %model_path.display(),
            outputs = ?output_names,
            "loaded SCRFD model"
        );

        let strides = discover_outputs(&output_names).ok_or_else(|| {
            DetectorError::InferenceFailed(format!(
                "SCRFD model needs 6 or 9 outputs (score/bbox[/kps] × 3 strides), got {}",
                output_names.len()
            ))
        })?;
        tracing::debug!(?strides, "SCRFD output tensor mapping");

        Ok(Self { session, strides })
    }

    /// Whether the model exports the five-point keypoint head.
    pub fn has_landmarks(&self) -> bool {
        self.strides.iter().all(|s| s.kps.is_some())
    }

    /// Detect faces, sorted by descending confidence.
    pub fn detect(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, DetectorError> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }

        let (input, letterbox) = preprocess(image);
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut detections = Vec::new();
        for (slot, &stride) in self.strides.iter().zip(SCRFD_STRIDES.iter()) {
            let extract = |idx: usize, what: &str| {
                outputs[idx]
                    .try_extract_tensor::<f32>()
                    .map(|(_, data)| data)
                    .map_err(|e| {
                        DetectorError::InferenceFailed(format!("{what} stride {stride}: {e}"))
                    })
            };
            let scores = extract(slot.score, "scores")?;
            let bboxes = extract(slot.bbox, "bboxes")?;
            let kps = slot.kps.map(|idx| extract(idx, "kps")).transpose()?;

            detections.extend(decode_stride(
                scores,
                bboxes,
                kps,
                stride,
                &letterbox,
                SCRFD_CONFIDENCE_THRESHOLD,
            ));
        }

        Ok(nms(detections, SCRFD_NMS_THRESHOLD))
    }
}

/// Letterbox an RGB image into a normalized NCHW tensor.
fn preprocess(image: &RgbImage) -> (Array4<f32>, Letterbox) {
    let size = SCRFD_INPUT_SIZE as usize;
    let letterbox = Letterbox::fit(image.width(), image.height(), SCRFD_INPUT_SIZE);
    let resized = imageops::resize(image, letterbox.new_w, letterbox.new_h, FilterType::Triangle);

    // Padding is zero after normalization, which is what the zeroed tensor holds.
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    let x0 = letterbox.pad_x.floor() as usize;
    let y0 = letterbox.pad_y.floor() as usize;

    for (x, y, pixel) in resized.enumerate_pixels() {
        let (tx, ty) = (x0 + x as usize, y0 + y as usize);
        for c in 0..3 {
            tensor[[0, c, ty, tx]] = (pixel.0[c] as f32 - SCRFD_MEAN) / SCRFD_STD;
        }
    }

    (tensor, letterbox)
}

/// Discover output ordering by name ("score_8", "bbox_16", "kps_32", ...),
/// falling back to the standard positional layout:
///   6 outputs: [scores 8/16/32, bboxes 8/16/32]
///   9 outputs: [scores 8/16/32, bboxes 8/16/32, kps 8/16/32]
fn discover_outputs(names: &[String]) -> Option<[StrideOutputs; 3]> {
    let find = |prefix: &str, stride: usize| -> Option<usize> {
        let target = format!("{prefix}_{stride}");
        names.iter().position(|n| n == &target)
    };

    let named: Option<Vec<StrideOutputs>> = SCRFD_STRIDES
        .iter()
        .map(|&stride| {
            Some(StrideOutputs {
                score: find("score", stride)?,
                bbox: find("bbox", stride)?,
                kps: find("kps", stride),
            })
        })
        .collect();

    if let Some(named) = named {
        tracing::info!("SCRFD: using name-based output tensor mapping");
        return named.try_into().ok();
    }

    let with_kps = match names.len() {
        n if n >= 9 => true,
        n if n >= 6 => false,
        _ => return None,
    };
    tracing::info!(
        ?names,
        with_kps,
        "SCRFD: output names not recognized, using positional mapping"
    );
    Some(std::array::from_fn(|i| StrideOutputs {
        score: i,
        bbox: 3 + i,
        kps: with_kps.then_some(6 + i),
    }))
}

/// Decode detections for a single stride level.
fn decode_stride(
    scores: &[f32],
    bboxes: &[f32],
    kps: Option<&[f32]>,
    stride: usize,
    letterbox: &Letterbox,
    threshold: f32,
) -> Vec<BoundingBox> {
    let grid_w = SCRFD_INPUT_SIZE as usize / stride;
    let grid_h = SCRFD_INPUT_SIZE as usize / stride;
    let num_anchors = grid_w * grid_h * SCRFD_ANCHORS_PER_CELL;
    let step = stride as f32;

    let mut detections = Vec::new();

    for idx in 0..num_anchors {
        let score = scores.get(idx).copied().unwrap_or(0.0);
        if score <= threshold {
            continue;
        }

        let cell = idx / SCRFD_ANCHORS_PER_CELL;
        let anchor_x = (cell % grid_w) as f32 * step;
        let anchor_y = (cell / grid_w) as f32 * step;

        let Some(offsets) = bboxes.get(idx * 4..idx * 4 + 4) else {
            continue;
        };
        let (x1, y1) = letterbox.unmap(anchor_x - offsets[0] * step, anchor_y - offsets[1] * step);
        let (x2, y2) = letterbox.unmap(anchor_x + offsets[2] * step, anchor_y + offsets[3] * step);

        let landmarks: Option<[(f32, f32); 5]> = kps
            .and_then(|kps| kps.get(idx * 10..idx * 10 + 10))
            .map(|points| {
                std::array::from_fn(|i| {
                    letterbox.unmap(
                        anchor_x + points[i * 2] * step,
                        anchor_y + points[i * 2 + 1] * step,
                    )
                })
            });

        detections.push(BoundingBox {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            confidence: score,
            landmarks,
        });
    }

    detections
}

/// Non-Maximum Suppression. Output is sorted by descending confidence.
fn nms(mut detections: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<BoundingBox> = Vec::new();
    for det in detections {
        if keep.iter().all(|kept| iou(kept, &det) <= iou_threshold) {
            keep.push(det);
        }
    }
    keep
}

/// Intersection-over-Union between two bounding boxes.
fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let inter_w = ((a.x + a.width).min(b.x + b.width) - a.x.max(b.x)).max(0.0);
    let inter_h = ((a.y + a.height).min(b.y + b.height) - a.y.max(b.y)).max(0.0);
    let inter = inter_w * inter_h;
    let union = a.width * a.height + b.width * b.height - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn make_bbox(x: f32, y: f32, w: f32, h: f32, conf: f32) -> BoundingBox {
        BoundingBox {
            x, y, width: w, height: h, confidence: conf, landmarks: None,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_iou_identical() {
        let a = make_bbox(0.0, 0.0, 100.0, 100.0, 1.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_partial() {
        let a = make_bbox(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = make_bbox(5.0, 0.0, 10.0, 10.0, 1.0);
        assert!((iou(&a, &b) - 50.0 / 150.0).abs() < 1e-6);
        let c = make_bbox(20.0, 20.0, 10.0, 10.0, 1.0);
        assert_eq!(iou(&a, &c), 0.0);
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let detections = vec![
            make_bbox(5.0, 5.0, 100.0, 100.0, 0.8),
            make_bbox(200.0, 200.0, 50.0, 50.0, 0.7),
            make_bbox(0.0, 0.0, 100.0, 100.0, 0.9),
        ];
        let result = nms(detections, 0.4);
        assert_eq!(result.len(), 2);
        assert!((result[0].confidence - 0.9).abs() < 1e-6);
        assert!((result[1].confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_nms_empty() {
        assert!(nms(vec![], 0.4).is_empty());
    }

    #[test]
    fn test_letterbox_wide_image() {
        let lb = Letterbox::fit(320, 240, 640);
        assert!((lb.scale - 2.0).abs() < 1e-6);
        assert_eq!((lb.new_w, lb.new_h), (640, 480));
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 80.0);

        let (x, y) = lb.unmap(100.0 * 2.0, 50.0 * 2.0 + 80.0);
        assert!((x - 100.0).abs() < 1e-4 && (y - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_preprocess_pads_with_zero() {
        let image = RgbImage::from_pixel(320, 160, Rgb([255, 0, 127]));
        let (tensor, lb) = preprocess(&image);
        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        // Top padding rows are exactly zero.
        assert_eq!(tensor[[0, 0, 0, 320]], 0.0);
        // Content rows carry the normalized channel values.
        let row = lb.pad_y as usize + 10;
        assert!((tensor[[0, 0, row, 320]] - (255.0 - SCRFD_MEAN) / SCRFD_STD).abs() < 1e-6);
        assert!((tensor[[0, 1, row, 320]] - (0.0 - SCRFD_MEAN) / SCRFD_STD).abs() < 1e-6);
    }

    #[test]
    fn test_discover_outputs_named_shuffled() {
        let list = names(&[
            "bbox_8", "kps_8", "score_8",
            "bbox_16", "kps_16", "score_16",
            "bbox_32", "kps_32", "score_32",
        ]);
        let strides = discover_outputs(&list).unwrap();
        assert_eq!(strides[0], StrideOutputs { score: 2, bbox: 0, kps: Some(1) });
        assert_eq!(strides[2], StrideOutputs { score: 8, bbox: 6, kps: Some(7) });
    }

    #[test]
    fn test_discover_outputs_positional() {
        let nine: Vec<String> = (0..9).map(|i: usize| i.to_string()).collect();
        let strides = discover_outputs(&nine).unwrap();
        assert_eq!(strides[1], StrideOutputs { score: 1, bbox: 4, kps: Some(7) });

        let six: Vec<String> = (0..6).map(|i: usize| i.to_string()).collect();
        let strides = discover_outputs(&six).unwrap();
        assert!(strides.iter().all(|s| s.kps.is_none()));

        let four: Vec<String> = (0..4).map(|i: usize| i.to_string()).collect();
        assert!(discover_outputs(&four).is_none());
    }

    #[test]
    fn test_decode_stride_single_anchor() {
        let stride = 32;
        let cells = (640 / stride) * (640 / stride) * SCRFD_ANCHORS_PER_CELL;
        let mut scores = vec![0.0f32; cells];
        let mut bboxes = vec![0.0f32; cells * 4];
        let mut kps = vec![0.0f32; cells * 10];

        // Anchor 2 → cell 1 → anchor centre (32, 0).
        scores[2] = 0.9;
        bboxes[8..12].copy_from_slice(&[0.5, 0.0, 0.5, 1.0]);
        kps[20..30].copy_from_slice(&[0.0, 0.5, 0.1, 0.5, 0.0, 0.6, 0.0, 0.7, 0.1, 0.7]);

        let lb = Letterbox::fit(640, 640, 640);
        let dets = decode_stride(&scores, &bboxes, Some(&kps), stride, &lb, 0.5);
        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert!((d.x - 16.0).abs() < 1e-4);
        assert!((d.width - 32.0).abs() < 1e-4);
        assert!((d.height - 32.0).abs() < 1e-4);
        let lms = d.landmarks.unwrap();
        assert!((lms[0].1 - 16.0).abs() < 1e-4);

        let boxes_only = decode_stride(&scores, &bboxes, None, stride, &lb, 0.5);
        assert!(boxes_only[0].landmarks.is_none());
    }
}
