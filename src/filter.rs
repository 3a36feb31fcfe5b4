/// The subset of CSS filter functions a region can ask for, applied in
/// the order `saturate contrast hue-rotate brightness`.
pub mod filter {
    use crate::city::city::Region;
    use palette::Srgb;

    type Matrix = [[f32; 3]; 3];

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct FilterChain {
        saturate: Matrix,
        contrast: f32,
        hue_rotate: Matrix,
        brightness: f32,
        identity: bool,
    }

    fn saturate_matrix(amount: f32) -> Matrix {
        let s = amount;
        [
            [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
            [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
            [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
        ]
    }

    fn hue_rotate_matrix(degrees: f32) -> Matrix {
        let (sin, cos) = degrees.to_radians().sin_cos();
        [
            [
                0.213 + cos * 0.787 - sin * 0.213,
                0.715 - cos * 0.715 - sin * 0.715,
                0.072 - cos * 0.072 + sin * 0.928,
            ],
            [
                0.213 - cos * 0.213 + sin * 0.143,
                0.715 + cos * 0.285 + sin * 0.140,
                0.072 - cos * 0.072 - sin * 0.283,
            ],
            [
                0.213 - cos * 0.213 - sin * 0.787,
                0.715 - cos * 0.715 + sin * 0.715,
                0.072 + cos * 0.928 + sin * 0.072,
            ],
        ]
    }

    fn apply_matrix(m: &Matrix, c: [f32; 3]) -> [f32; 3] {
        let mut out = [0.0; 3];
        for (row, o) in m.iter().zip(out.iter_mut()) {
            *o = (row[0] * c[0] + row[1] * c[1] + row[2] * c[2]).clamp(0.0, 1.0);
        }
        out
    }

    impl FilterChain {
        pub fn new(saturate_percent: f32, contrast: f32, hue_degrees: f32, brightness: f32) -> Self {
            let identity = saturate_percent == 100.0
                && contrast == 1.0
                && hue_degrees.rem_euclid(360.0) == 0.0
                && brightness == 1.0;
            FilterChain {
                saturate: saturate_matrix(saturate_percent.max(0.0) / 100.0),
                contrast: contrast.max(0.0),
                hue_rotate: hue_rotate_matrix(hue_degrees),
                brightness: brightness.max(0.0),
                identity,
            }
        }

        pub fn for_region(region: &Region) -> Self {
            Self::new(region.sat, region.con, region.hue, region.br)
        }

        pub fn is_identity(&self) -> bool {
            self.identity
        }

        pub fn apply(&self, color: Srgb<f32>) -> Srgb<f32> {
            if self.identity {
                return color;
            }
            let mut c = apply_matrix(&self.saturate, [color.red, color.green, color.blue]);
            let intercept = 0.5 - 0.5 * self.contrast;
            for v in c.iter_mut() {
                *v = (*v * self.contrast + intercept).clamp(0.0, 1.0);
            }
            c = apply_matrix(&self.hue_rotate, c);
            for v in c.iter_mut() {
                *v = (*v * self.brightness).clamp(0.0, 1.0);
            }
            Srgb::new(c[0], c[1], c[2])
        }

        /// Filter a straight (non-premultiplied) RGBA buffer in place.
        /// Alpha is left alone.
        pub fn apply_rgba(&self, rgba: &mut [u8]) {
            if self.identity {
                return;
            }
            for px in rgba.chunks_exact_mut(4) {
                let color: Srgb<f32> = Srgb::new(px[0], px[1], px[2]).into_format();
                let out: Srgb<u8> = self.apply(color).into_format();
                px[0] = out.red;
                px[1] = out.green;
                px[2] = out.blue;
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn run(chain: &FilterChain, rgb: (u8, u8, u8)) -> (u8, u8, u8) {
            let mut buf = [rgb.0, rgb.1, rgb.2, 255];
            chain.apply_rgba(&mut buf);
            (buf[0], buf[1], buf[2])
        }

        #[test]
        fn neutral_settings_leave_pixels_alone() {
            let chain = FilterChain::for_region(&Region::new(0, 0, 1, 1));
            assert!(chain.is_identity());
            assert_eq!(run(&chain, (12, 200, 99)), (12, 200, 99));
        }

        #[test]
        fn zero_saturation_is_grey() {
            let chain = FilterChain::new(0.0, 1.0, 0.0, 1.0);
            let (r, g, b) = run(&chain, (255, 0, 0));
            assert_eq!(r, g);
            assert_eq!(g, b);
            // luminance weight of red
            assert_eq!(r, (0.213f32 * 255.0).round() as u8);
        }

        #[test]
        fn zero_contrast_is_mid_grey() {
            let chain = FilterChain::new(100.0, 0.0, 0.0, 1.0);
            assert_eq!(run(&chain, (10, 240, 77)), (128, 128, 128));
        }

        #[test]
        fn brightness_scales_and_clamps() {
            let chain = FilterChain::new(100.0, 1.0, 0.0, 2.0);
            assert_eq!(run(&chain, (100, 200, 0)), (200, 255, 0));
            let dark = FilterChain::new(100.0, 1.0, 0.0, 0.0);
            assert_eq!(run(&dark, (100, 200, 50)), (0, 0, 0));
        }

        #[test]
        fn full_turn_hue_rotation_is_identity() {
            let chain = FilterChain::new(100.0, 1.0, 360.0, 1.0);
            assert!(chain.is_identity());
        }

        #[test]
        fn hue_rotation_keeps_greys() {
            let chain = FilterChain::new(100.0, 1.0, 90.0, 1.0);
            let (r, g, b) = run(&chain, (128, 128, 128));
            assert!(r.abs_diff(128) <= 1 && g.abs_diff(128) <= 1 && b.abs_diff(128) <= 1);
        }

        #[test]
        fn white_stays_white_under_saturation() {
            let chain = FilterChain::new(180.0, 1.0, 0.0, 1.0);
            assert_eq!(run(&chain, (255, 255, 255)), (255, 255, 255));
        }
    }
}
