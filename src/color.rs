pub mod color {
    use palette::{LinSrgb, Mix, Srgb};

    /// The two colors a gradient is made of, top stop first.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GradientColors {
        pub top: Srgb<u8>,
        pub bot: Srgb<u8>,
    }

    impl GradientColors {
        pub fn new(top: Srgb<u8>, bot: Srgb<u8>) -> Self {
            GradientColors { top, bot }
        }

        /// `linear-gradient(to bottom, rgb(..), rgb(..))`
        pub fn css(&self) -> String {
            format!(
                "linear-gradient(to bottom, {}, {})",
                css_rgb(self.top),
                css_rgb(self.bot)
            )
        }

        /// Blend towards `other` in linear light. `factor` 0 is `self`.
        pub fn mix(&self, other: &GradientColors, factor: f32) -> GradientColors {
            if factor <= 0.0 {
                return *self;
            }
            if factor >= 1.0 {
                return *other;
            }
            GradientColors {
                top: mix_srgb(self.top, other.top, factor),
                bot: mix_srgb(self.bot, other.bot, factor),
            }
        }
    }

    pub fn css_rgb(color: Srgb<u8>) -> String {
        format!("rgb({},{},{})", color.red, color.green, color.blue)
    }

    fn mix_srgb(from: Srgb<u8>, to: Srgb<u8>, factor: f32) -> Srgb<u8> {
        let a: LinSrgb<f32> = from.into_format::<f32>().into_linear();
        let b: LinSrgb<f32> = to.into_format::<f32>().into_linear();
        Srgb::<f32>::from_linear(a.mix(b, factor)).into_format()
    }

}
