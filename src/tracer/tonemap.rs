use nalgebra::Vector4;

/// Narkowicz's ACES fit applied per channel, output clamped to `[0, 1]` with
/// alpha forced opaque.
pub fn aces_filter(color: &Vector4<f32>) -> Vector4<f32> {
    fn fit(x: f32) -> f32 {
        ((x * (2.51 * x + 0.03)) / (x * (2.43 * x + 0.59) + 0.14)).clamp(0.0, 1.0)
    }
    Vector4::new(fit(color.x), fit(color.y), fit(color.z), 1.0)
}

/// Quantizes a tone-mapped buffer to tightly packed RGBA8.
pub fn to_rgba8(pixels: &[Vector4<f32>]) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels.len() * 4);
    for pixel in pixels {
        for channel in 0..4 {
            out.push((pixel[channel].clamp(0.0, 1.0) * 255.0) as u8);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Vector4;

    use super::{aces_filter, to_rgba8};

    #[test]
    fn unit_input_maps_to_the_known_fit_value() {
        let mapped = aces_filter(&Vector4::new(1.0, 1.0, 1.0, 0.3));
        // 2.54 / 3.16
        assert_relative_eq!(mapped.x, 0.80379, epsilon = 1e-4);
        assert_relative_eq!(mapped.w, 1.0);
    }

    #[test]
    fn zero_stays_black_and_highlights_clamp() {
        let black = aces_filter(&Vector4::new(0.0, 0.0, 0.0, 1.0));
        assert_eq!(black, Vector4::new(0.0, 0.0, 0.0, 1.0));

        let blown = aces_filter(&Vector4::new(100.0, 100.0, 100.0, 1.0));
        assert_eq!(blown.x, 1.0);
        assert_eq!(blown.y, 1.0);
        assert_eq!(blown.z, 1.0);
    }

    #[test]
    fn curve_is_monotonic_over_the_working_range() {
        let mut previous = -1.0;
        for i in 0..100 {
            let x = i as f32 * 0.05;
            let y = aces_filter(&Vector4::new(x, x, x, 1.0)).x;
            assert!(y >= previous);
            previous = y;
        }
    }

    #[test]
    fn quantization_packs_four_bytes_per_pixel() {
        let bytes = to_rgba8(&[
            Vector4::new(0.0, 0.5, 1.0, 1.0),
            Vector4::new(2.0, -1.0, 0.25, 1.0),
        ]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[1], 127);
        assert_eq!(bytes[2], 255);
        assert_eq!(bytes[3], 255);
        assert_eq!(bytes[4], 255);
        assert_eq!(bytes[5], 0);
    }
}
