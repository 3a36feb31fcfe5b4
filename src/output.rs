/// Where the sampled colors end up: a two-layer cross-fade, rendered as
/// a small gradient image and written to a file and/or pushed to a
/// Tidbyt.
pub mod output {
    use crate::color::color::GradientColors;
    use crate::draw_buffer::draw_buffer::get_rgba;
    use crate::pusher::pusher::{push, TidbytDevice};
    use anyhow::{anyhow, Context, Result};
    use async_trait::async_trait;
    use palette::Srgb;
    use raqote::{Color, DrawOptions, DrawTarget, Gradient, GradientStop, Point, Source, Spread};
    use std::path::PathBuf;
    use webp::{AnimEncoder, AnimFrame, WebPConfig};

    // Tidbyt resolution
    pub const WIDTH: i32 = 64;
    pub const HEIGHT: i32 = 32;
    /// Delay between two frames of a cross-fade.
    pub const FRAME_MS: i32 = 120;

    /// Receives every successfully sampled color pair, in order.
    #[async_trait]
    pub trait GradientSink: Send {
        async fn apply(&mut self, colors: GradientColors) -> Result<()>;
    }

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct Layer {
        pub colors: Option<GradientColors>,
        pub active: bool,
    }

    /// Two alternating layers. A new gradient always goes into the hidden
    /// one, which is shown before the old one is hidden.
    #[derive(Debug, Clone, Default)]
    pub struct Crossfade {
        layers: [Layer; 2],
        front: usize,
    }

    impl Crossfade {
        pub fn new() -> Self {
            Self::default()
        }

        /// Show `colors`. Returns what was showing before, if anything.
        pub fn apply(&mut self, colors: GradientColors) -> Option<GradientColors> {
            let previous = self.front;
            let shown_before = self.active();
            let next = 1 - previous;

            self.layers[next].colors = Some(colors);
            self.layers[next].active = true;
            self.front = next;
            self.layers[previous].active = false;

            shown_before
        }

        pub fn active(&self) -> Option<GradientColors> {
            let layer = &self.layers[self.front];
            if layer.active {
                layer.colors
            } else {
                None
            }
        }

        pub fn layers(&self) -> &[Layer; 2] {
            &self.layers
        }

        /// CSS description of the gradient currently shown.
        pub fn describe(&self) -> Option<String> {
            self.active().map(|c| c.css())
        }
    }

    fn raqote_color(c: Srgb<u8>) -> Color {
        Color::new(255, c.red, c.green, c.blue)
    }

    /// Vertical two-stop gradient, as straight RGBA bytes.
    pub fn render_frame(colors: &GradientColors, width: i32, height: i32) -> Vec<u8> {
        let mut dt = DrawTarget::new(width, height);
        let gradient = Source::new_linear_gradient(
            Gradient {
                stops: vec![
                    GradientStop {
                        position: 0.0,
                        color: raqote_color(colors.top),
                    },
                    GradientStop {
                        position: 1.0,
                        color: raqote_color(colors.bot),
                    },
                ],
            },
            Point::new(0., 0.),
            Point::new(0., height as f32),
            Spread::Pad,
        );
        dt.fill_rect(
            0.,
            0.,
            width as f32,
            height as f32,
            &gradient,
            &DrawOptions::new(),
        );
        get_rgba(&dt)
    }

    /// Steps from `from` to `to`. Always ends on `to`; a single step when
    /// there is nothing to fade from or fading is off.
    pub fn crossfade_steps(
        from: Option<GradientColors>,
        to: GradientColors,
        frames: usize,
    ) -> Vec<GradientColors> {
        match from {
            Some(from) if frames > 1 && from != to => (1..=frames)
                .map(|i| from.mix(&to, i as f32 / frames as f32))
                .collect(),
            _ => vec![to],
        }
    }

    /// Lossless animated WebP of the given steps.
    pub fn encode_webp(steps: &[GradientColors]) -> Result<Vec<u8>> {
        let mut config = WebPConfig::new().map_err(|_s| anyhow!("WebPConfig failed"))?;
        config.lossless = 1;

        let frames: Vec<Vec<u8>> = steps
            .iter()
            .map(|colors| render_frame(colors, WIDTH, HEIGHT))
            .collect();

        let mut encoder = AnimEncoder::new(WIDTH as u32, HEIGHT as u32, &config);
        for (i, rgba) in frames.iter().enumerate() {
            encoder.add_frame(AnimFrame::from_rgba(
                rgba,
                WIDTH as u32,
                HEIGHT as u32,
                i as i32 * FRAME_MS,
            ));
        }
        Ok(encoder.encode().to_vec())
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Target {
        File(PathBuf),
        Tidbyt(TidbytDevice),
    }

    /// The real sink used by the binary.
    pub struct DisplaySink {
        crossfade: Crossfade,
        targets: Vec<Target>,
        fade_frames: usize,
        client: reqwest::Client,
    }

    impl DisplaySink {
        /// `fade_frames` of 0 or 1 turns the cross-fade animation off.
        pub fn new(client: reqwest::Client, targets: Vec<Target>, fade_frames: usize) -> Self {
            DisplaySink {
                crossfade: Crossfade::new(),
                targets,
                fade_frames,
                client,
            }
        }

        pub fn describe(&self) -> Option<String> {
            self.crossfade.describe()
        }

        async fn deliver(&self, target: &Target, file_contents: &[u8]) -> Result<()> {
            match target {
                Target::File(path) => tokio::fs::write(path, file_contents)
                    .await
                    .with_context(|| format!("Could not write {}", path.display())),
                Target::Tidbyt(device) => push(&self.client, device, file_contents).await,
            }
        }
    }

    #[async_trait]
    impl GradientSink for DisplaySink {
        async fn apply(&mut self, colors: GradientColors) -> Result<()> {
            let previous = self.crossfade.apply(colors);
            tracing::info!(gradient = %colors.css(), "applying gradient");
            if self.targets.is_empty() {
                return Ok(());
            }

            let steps = crossfade_steps(previous, colors, self.fade_frames);
            let file_contents = encode_webp(&steps)?;
            for target in &self.targets {
                self.deliver(target, &file_contents).await?;
            }
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn pair(top: (u8, u8, u8), bot: (u8, u8, u8)) -> GradientColors {
            GradientColors::new(Srgb::new(top.0, top.1, top.2), Srgb::new(bot.0, bot.1, bot.2))
        }

        #[test]
        fn new_layer_is_shown_before_old_is_hidden() {
            let mut fade = Crossfade::new();
            assert_eq!(fade.describe(), None);

            let first = pair((10, 20, 30), (40, 50, 60));
            assert_eq!(fade.apply(first), None);
            let active: Vec<_> = fade.layers().iter().filter(|l| l.active).collect();
            assert_eq!(active.len(), 1);

            let second = pair((1, 2, 3), (4, 5, 6));
            assert_eq!(fade.apply(second), Some(first));
            assert_eq!(fade.active(), Some(second));
            // the old gradient stays parked in the hidden layer
            assert!(fade.layers().iter().any(|l| !l.active && l.colors == Some(first)));
        }

        #[test]
        fn describe_round_trips_colors_top_then_bottom() {
            let mut fade = Crossfade::new();
            fade.apply(pair((10, 20, 30), (40, 50, 60)));
            let css = fade.describe().unwrap();
            let top = css.find("rgb(10,20,30)").unwrap();
            let bot = css.find("rgb(40,50,60)").unwrap();
            assert!(top < bot, "{css}");
        }

        #[test]
        fn frame_runs_from_top_to_bottom_color() {
            let rgba = render_frame(&pair((255, 0, 0), (0, 0, 255)), WIDTH, HEIGHT);
            let row = |y: i32| {
                let i = (y * WIDTH * 4) as usize;
                (rgba[i], rgba[i + 1], rgba[i + 2])
            };
            let (r, _, b) = row(0);
            assert!(r > 240 && b < 15, "{:?}", row(0));
            let (r, _, b) = row(HEIGHT - 1);
            assert!(b > 240 && r < 15, "{:?}", row(HEIGHT - 1));
        }

        #[test]
        fn crossfade_steps_end_on_target() {
            let a = pair((0, 0, 0), (0, 0, 0));
            let b = pair((255, 255, 255), (255, 255, 255));
            assert_eq!(crossfade_steps(None, b, 8), vec![b]);
            assert_eq!(crossfade_steps(Some(a), b, 0), vec![b]);
            assert_eq!(crossfade_steps(Some(b), b, 8), vec![b]);
            let steps = crossfade_steps(Some(a), b, 4);
            assert_eq!(steps.len(), 4);
            assert_eq!(*steps.last().unwrap(), b);
            assert!(steps[0].top.red > 0 && steps[0].top.red < 255);
        }

        #[test]
        fn encodes_a_webp() {
            let bytes = encode_webp(&[pair((255, 120, 0), (30, 0, 90))]).unwrap();
            assert_eq!(&bytes[0..4], b"RIFF");
            assert_eq!(&bytes[8..12], b"WEBP");
        }

        #[tokio::test]
        async fn sink_writes_file_target() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("sky.webp");
            let mut sink = DisplaySink::new(reqwest::Client::new(), vec![Target::File(path.clone())], 4);
            sink.apply(pair((200, 100, 50), (20, 30, 90))).await.unwrap();
            sink.apply(pair((180, 90, 60), (25, 35, 95))).await.unwrap();
            let bytes = std::fs::read(&path).unwrap();
            assert_eq!(&bytes[8..12], b"WEBP");
            assert!(sink.describe().unwrap().contains("rgb(180,90,60)"));
        }
    }
}
