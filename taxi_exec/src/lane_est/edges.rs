//! Edge detection and region of interest masking

use image::{GrayImage, Luma};
use imageproc::{drawing::draw_polygon_mut, edges, filter::gaussian_blur_f32, point::Point};

/// Blur the image and run the Canny edge detector on it.
///
/// A non-positive `blur_sigma` skips the blur. Edge pixels are 255 in the output, all others 0.
/// Thresholds given the wrong way round are swapped.
pub fn edge_image(gray: &GrayImage, blur_sigma: f32, low: f32, high: f32) -> GrayImage {
    let blurred = if blur_sigma > 0.0 && blur_sigma.is_finite() {
        gaussian_blur_f32(gray, blur_sigma)
    } else {
        gray.clone()
    };

    edges::canny(&blurred, low.min(high), low.max(high))
}

/// Row at which the region of interest starts for a frame of the given height.
pub fn roi_top_row(height: u32, roi_top_frac: f64) -> u32 {
    let row = (height as f64 * roi_top_frac).round();

    if row <= 0.0 {
        0
    } else {
        (row as u32).min(height)
    }
}

/// Mask of the region of interest: the full width band from `top_row` down to the bottom of the
/// frame is 255, everything else 0.
pub fn roi_mask(width: u32, height: u32, top_row: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);

    if width == 0 || top_row >= height {
        return mask;
    }

    let (left, right) = (0, width as i32 - 1);
    let (top, bottom) = (top_row as i32, height as i32 - 1);

    // Collapse to a line when the band is a single row or column, the polygon must not close on
    // itself
    if left == right || top == bottom {
        for y in top_row..height {
            for x in 0..width {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        return mask;
    }

    draw_polygon_mut(
        &mut mask,
        &[
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        ],
        Luma([255]),
    );

    mask
}

/// Clear every pixel of `img` which lies outside `mask`.
pub fn apply_mask(img: &mut GrayImage, mask: &GrayImage) {
    for (p, m) in img.pixels_mut().zip(mask.pixels()) {
        if m[0] == 0 {
            *p = Luma([0]);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_edges_blank() {
        let img = GrayImage::from_pixel(32, 32, Luma([128]));
        let edges = edge_image(&img, 1.1, 50.0, 150.0);

        assert!(edges.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_edges_vertical_step() {
        // Dark left half, bright right half
        let img = GrayImage::from_fn(32, 16, |x, _| if x < 16 { Luma([0]) } else { Luma([200]) });

        // Swapped thresholds are tolerated
        let edges = edge_image(&img, 1.1, 150.0, 50.0);

        for y in 4..12 {
            let row: Vec<u32> = (0..32).filter(|x| edges.get_pixel(*x, y)[0] > 0).collect();
            assert!(!row.is_empty(), "row {} has no edge", y);
            assert!(row.iter().all(|x| (13..=18).contains(x)), "row {}: {:?}", y, row);
        }
    }

    #[test]
    fn test_roi() {
        assert_eq!(roi_top_row(240, 2.0 / 3.0), 160);
        assert_eq!(roi_top_row(480, 2.0 / 3.0), 320);
        assert_eq!(roi_top_row(10, 2.0), 10);

        let mask = roi_mask(8, 6, 4);
        assert_eq!(mask.get_pixel(7, 3)[0], 0);
        assert_eq!(mask.get_pixel(0, 4)[0], 255);
        assert_eq!(mask.get_pixel(7, 4)[0], 255);
        assert_eq!(mask.get_pixel(3, 5)[0], 255);

        let mut img = GrayImage::from_pixel(8, 6, Luma([255]));
        apply_mask(&mut img, &mask);
        assert_eq!(img.get_pixel(3, 3)[0], 0);
        assert_eq!(img.get_pixel(3, 4)[0], 255);

        // Empty region of interest
        assert!(roi_mask(8, 6, 6).pixels().all(|p| p[0] == 0));
    }
}
