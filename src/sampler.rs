/// Turns one region of a webcam frame into a single representative color.
pub mod sampler {
    use crate::city::city::Region;
    use crate::draw_buffer::draw_buffer::{get_rgba, to_argb};
    use crate::filter::filter::FilterChain;
    use crate::quantize::quantize::dominant_color;
    use image::DynamicImage;
    use palette::Srgb;
    use raqote::{DrawOptions, DrawTarget};

    /// Side of the square surface every region is scaled onto.
    pub const SURFACE_SIZE: i32 = 100;

    /// Substituted when quantization finds nothing to work with. A blown
    /// out or white sky is exactly what produces that.
    pub const FALLBACK_COLOR: Srgb<u8> = Srgb::new(255, 255, 255);

    /// Draw `region` of `image` scaled onto a fresh surface and return
    /// the filtered straight RGBA pixels.
    pub fn render_region(image: &DynamicImage, region: &Region) -> Vec<u8> {
        let mut dt = DrawTarget::new(SURFACE_SIZE, SURFACE_SIZE);
        let crop = image.crop_imm(region.x, region.y, region.w, region.h).to_rgba8();
        if crop.width() > 0 && crop.height() > 0 {
            let data = to_argb(crop.as_raw());
            let source = raqote::Image {
                width: crop.width() as i32,
                height: crop.height() as i32,
                data: &data,
            };
            dt.draw_image_with_size_at(
                SURFACE_SIZE as f32,
                SURFACE_SIZE as f32,
                0.,
                0.,
                &source,
                &DrawOptions::new(),
            );
        }
        let mut rgba = get_rgba(&dt);
        FilterChain::for_region(region).apply_rgba(&mut rgba);
        rgba
    }

    /// Dominant color of a region. Never fails.
    pub fn sample_region(image: &DynamicImage, region: &Region) -> Srgb<u8> {
        let rgba = render_region(image, region);
        match dominant_color(&rgba) {
            Ok(color) => color,
            Err(err) => {
                tracing::debug!(error = %err, ?region, "no dominant color, using white");
                FALLBACK_COLOR
            }
        }
    }

}
