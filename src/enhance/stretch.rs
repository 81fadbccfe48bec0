use crate::error::EnhanceError;
use crate::raster::Plane;
use image::Luma;

/// Linearly map `[down, up]` onto `[0, 1]`, clamping everything outside
///
/// Returns a new plane; the input is left untouched. A collapsed or inverted
/// range (`up <= down`) or a non-finite bound is reported as `DegenerateRange`
/// instead of producing NaN/Inf samples.
pub fn stretch(plane: &Plane, down: f32, up: f32) -> Result<Plane, EnhanceError> {
    if !down.is_finite() || !up.is_finite() || up <= down {
        return Err(EnhanceError::DegenerateRange { down, up });
    }

    let scale = 1.0 / (up - down);
    let mut out = plane.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = ((pixel.0[0] - down) * scale).clamp(0.0, 1.0);
    }
    Ok(out)
}

/// Clamp every sample into [0, 1]
pub fn clamp_unit(plane: &Plane) -> Plane {
    Plane::from_fn(plane.width(), plane.height(), |x, y| {
        Luma([plane.get_pixel(x, y).0[0].clamp(0.0, 1.0)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane_from(width: u32, height: u32, values: &[f32]) -> Plane {
        Plane::from_raw(width, height, values.to_vec()).unwrap()
    }

    #[test]
    fn test_unit_bounds_equal_clamp() {
        let plane = plane_from(3, 2, &[0.0, 0.25, 0.5, 0.75, 1.0, 0.33]);
        let result = stretch(&plane, 0.0, 1.0).unwrap();
        for (a, b) in plane.pixels().zip(result.pixels()) {
            assert!((a.0[0] - b.0[0]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_output_always_in_unit_range() {
        let plane = plane_from(4, 1, &[-3.0, 0.2, 0.6, 7.5]);
        for (down, up) in [(0.0, 1.0), (0.2, 0.6), (-1.0, 0.1), (0.59, 0.6)] {
            let result = stretch(&plane, down, up).unwrap();
            assert!(result.pixels().all(|p| (0.0..=1.0).contains(&p.0[0])));
        }
    }

    #[test]
    fn test_maps_bounds_to_ends() {
        let plane = plane_from(3, 1, &[0.2, 0.4, 0.6]);
        let result = stretch(&plane, 0.2, 0.6).unwrap();
        assert_eq!(result.get_pixel(0, 0).0[0], 0.0);
        assert!((result.get_pixel(1, 0).0[0] - 0.5).abs() < 1e-6);
        assert_eq!(result.get_pixel(2, 0).0[0], 1.0);
    }

    #[test]
    fn test_does_not_mutate_input() {
        let plane = plane_from(2, 1, &[0.3, 0.9]);
        let before = plane.clone();
        let _ = stretch(&plane, 0.3, 0.5).unwrap();
        assert_eq!(plane.as_raw(), before.as_raw());
    }

    #[test]
    fn test_degenerate_range_is_reported() {
        let plane = plane_from(2, 1, &[0.5, 0.5]);
        assert_eq!(
            stretch(&plane, 0.5, 0.5).unwrap_err(),
            EnhanceError::DegenerateRange { down: 0.5, up: 0.5 }
        );
        assert!(stretch(&plane, 0.8, 0.2).is_err());
        assert!(stretch(&plane, 0.0, f32::NAN).is_err());
    }

    #[test]
    fn test_clamp_unit() {
        let plane = plane_from(3, 1, &[-0.5, 0.5, 1.5]);
        let clamped = clamp_unit(&plane);
        assert_eq!(clamped.as_raw(), &vec![0.0, 0.5, 1.0]);
    }
}
