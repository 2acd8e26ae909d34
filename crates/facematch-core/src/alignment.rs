//! Landmark alignment: warps a detected face onto the canonical ArcFace crop.
//!
//! A 4-DOF similarity transform (scale, rotation, translation) is fitted from
//! the five detected landmarks to the reference positions by least squares,
//! then the colour image is resampled into a 112×112 crop.

use image::{Rgb, RgbImage};

/// ArcFace reference landmarks for a 112×112 output.
pub const REFERENCE_LANDMARKS: [(f32, f32); 5] = [
    (38.2946, 51.6963), // left eye
    (73.5318, 51.5014), // right eye
    (56.0252, 71.7366), // nose
    (41.5493, 92.3655), // left mouth
    (70.7299, 92.2041), // right mouth
];

pub const ALIGNED_SIZE: u32 = 112;

/// Similarity transform `dst = [[a, -b], [b, a]] * src + [tx, ty]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub a: f32,
    pub b: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Similarity {
    /// Least-squares fit mapping `src` points onto `dst` points.
    pub fn estimate(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> Self {
        // Normal equations for the unknowns [a, b, tx, ty]. Each pair contributes
        //   sx * a - sy * b + tx = dx
        //   sy * a + sx * b + ty = dy
        let mut ata = [[0.0f32; 4]; 4];
        let mut atb = [0.0f32; 4];

        for (&(sx, sy), &(dx, dy)) in src.iter().zip(dst.iter()) {
            let rows = [([sx, -sy, 1.0, 0.0], dx), ([sy, sx, 0.0, 1.0], dy)];
            for (row, rhs) in rows {
                for j in 0..4 {
                    for k in 0..4 {
                        ata[j][k] += row[j] * row[k];
                    }
                    atb[j] += row[j] * rhs;
                }
            }
        }

        match solve_4x4(ata, atb) {
            Some([a, b, tx, ty]) => Self { a, b, tx, ty },
            None => {
                tracing::warn!("degenerate landmarks; falling back to identity alignment");
                Self::identity()
            }
        }
    }

    pub fn identity() -> Self {
        Self { a: 1.0, b: 0.0, tx: 0.0, ty: 0.0 }
    }

    pub fn apply(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (
            self.a * x - self.b * y + self.tx,
            self.b * x + self.a * y + self.ty,
        )
    }

    /// Map an output-space point back into the source image.
    fn invert(&self, (x, y): (f32, f32)) -> Option<(f32, f32)> {
        let det = self.a * self.a + self.b * self.b;
        if det.abs() < 1e-12 {
            return None;
        }
        let dx = x - self.tx;
        let dy = y - self.ty;
        Some((
            (self.a * dx + self.b * dy) / det,
            (-self.b * dx + self.a * dy) / det,
        ))
    }
}

/// Gaussian elimination with partial pivoting. `None` for a singular system.
#[allow(clippy::needless_range_loop)]
fn solve_4x4(a: [[f32; 4]; 4], b: [f32; 4]) -> Option<[f32; 4]> {
    let mut m = [[0.0f32; 5]; 4];
    for i in 0..4 {
        m[i][..4].copy_from_slice(&a[i]);
        m[i][4] = b[i];
    }

    for col in 0..4 {
        let pivot_row = (col..4)
            .max_by(|&r1, &r2| m[r1][col].abs().total_cmp(&m[r2][col].abs()))
            .unwrap_or(col);
        m.swap(col, pivot_row);

        let pivot = m[col][col];
        if pivot.abs() < 1e-12 {
            return None;
        }
        for row in (col + 1)..4 {
            let factor = m[row][col] / pivot;
            for j in col..5 {
                m[row][j] -= factor * m[col][j];
            }
        }
    }

    let mut x = [0.0f32; 4];
    for i in (0..4).rev() {
        let tail: f32 = ((i + 1)..4).map(|j| m[i][j] * x[j]).sum();
        x[i] = (m[i][4] - tail) / m[i][i];
    }
    Some(x)
}

/// Bilinear sample of one pixel; out-of-bounds neighbours read as black.
fn sample_bilinear(image: &RgbImage, sx: f32, sy: f32) -> Rgb<u8> {
    let x0 = sx.floor() as i64;
    let y0 = sy.floor() as i64;
    let fx = sx - x0 as f32;
    let fy = sy - y0 as f32;

    let (w, h) = (image.width() as i64, image.height() as i64);
    let texel = |x: i64, y: i64| -> [f32; 3] {
        if x >= 0 && x < w && y >= 0 && y < h {
            let p = image.get_pixel(x as u32, y as u32).0;
            [p[0] as f32, p[1] as f32, p[2] as f32]
        } else {
            [0.0; 3]
        }
    };

    let tl = texel(x0, y0);
    let tr = texel(x0 + 1, y0);
    let bl = texel(x0, y0 + 1);
    let br = texel(x0 + 1, y0 + 1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let v = tl[c] * (1.0 - fx) * (1.0 - fy)
            + tr[c] * fx * (1.0 - fy)
            + bl[c] * (1.0 - fx) * fy
            + br[c] * fx * fy;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

/// Resample `image` through `transform` into a square `size`×`size` crop.
pub fn warp(image: &RgbImage, transform: &Similarity, size: u32) -> RgbImage {
    RgbImage::from_fn(size, size, |ox, oy| {
        match transform.invert((ox as f32, oy as f32)) {
            Some((sx, sy)) => sample_bilinear(image, sx, sy),
            None => Rgb([0, 0, 0]),
        }
    })
}

/// Align a detected face to the canonical 112×112 crop using its landmarks.
pub fn align_face(image: &RgbImage, landmarks: &[(f32, f32); 5]) -> RgbImage {
    let transform = Similarity::estimate(landmarks, &REFERENCE_LANDMARKS);
    warp(image, &transform, ALIGNED_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_transform() {
        let t = Similarity::estimate(&REFERENCE_LANDMARKS, &REFERENCE_LANDMARKS);
        assert!((t.a - 1.0).abs() < 1e-4, "a = {}", t.a);
        assert!(t.b.abs() < 1e-4, "b = {}", t.b);
        assert!(t.tx.abs() < 1e-3, "tx = {}", t.tx);
        assert!(t.ty.abs() < 1e-3, "ty = {}", t.ty);
    }

    #[test]
    fn test_scaled_transform() {
        // Landmarks at twice the reference scale → a ≈ 0.5
        let src = REFERENCE_LANDMARKS.map(|(x, y)| (x * 2.0, y * 2.0));
        let t = Similarity::estimate(&src, &REFERENCE_LANDMARKS);
        assert!((t.a - 0.5).abs() < 0.01, "a = {}", t.a);
        let (x, y) = t.apply(src[2]);
        assert!((x - REFERENCE_LANDMARKS[2].0).abs() < 0.05);
        assert!((y - REFERENCE_LANDMARKS[2].1).abs() < 0.05);
    }

    #[test]
    fn test_degenerate_landmarks_fall_back_to_identity() {
        let src = [(0.0, 0.0); 5];
        assert_eq!(Similarity::estimate(&src, &REFERENCE_LANDMARKS), Similarity::identity());
    }

    #[test]
    fn test_align_face_output_size() {
        let frame = RgbImage::from_pixel(640, 480, Rgb([128, 64, 32]));
        let aligned = align_face(&frame, &REFERENCE_LANDMARKS);
        assert_eq!(aligned.dimensions(), (ALIGNED_SIZE, ALIGNED_SIZE));
        // Identity alignment over a uniform frame keeps the colour.
        assert_eq!(aligned.get_pixel(56, 56), &Rgb([128, 64, 32]));
    }

    #[test]
    fn test_out_of_bounds_is_black() {
        let frame = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        let shift = Similarity { a: 1.0, b: 0.0, tx: 50.0, ty: 50.0 };
        let out = warp(&frame, &shift, 20);
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_landmark_roundtrip() {
        // A bright patch at the left eye lands near the reference left eye.
        let mut frame = RgbImage::new(200, 200);
        let src: [(f32, f32); 5] = [
            (80.0, 60.0),
            (120.0, 60.0),
            (100.0, 85.0),
            (85.0, 110.0),
            (115.0, 110.0),
        ];
        for dy in 0..5 {
            for dx in 0..5 {
                frame.put_pixel(78 + dx, 58 + dy, Rgb([255, 0, 0]));
            }
        }

        let aligned = align_face(&frame, &src);
        let rx = REFERENCE_LANDMARKS[0].0.round() as u32;
        let ry = REFERENCE_LANDMARKS[0].1.round() as u32;
        let mut max_red = 0u8;
        for y in ry - 1..=ry + 1 {
            for x in rx - 1..=rx + 1 {
                max_red = max_red.max(aligned.get_pixel(x, y).0[0]);
            }
        }
        assert!(max_red > 100, "expected red patch near ({rx}, {ry}), max={max_red}");
    }
}
