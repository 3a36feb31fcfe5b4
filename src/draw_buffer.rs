pub mod draw_buffer {
    use raqote::DrawTarget;

    /// Straight RGBA bytes out of a raqote surface, which stores
    /// premultiplied ARGB words.
    pub fn get_rgba(dt: &DrawTarget) -> Vec<u8> {
        let buf = dt.get_data();
        let mut output = Vec::with_capacity(buf.len() * 4);

        for pixel in buf {
            let a = (pixel >> 24) & 0xffu32;
            let mut r = (pixel >> 16) & 0xffu32;
            let mut g = (pixel >> 8) & 0xffu32;
            let mut b = pixel & 0xffu32;

            if a > 0u32 {
                r = r * 255u32 / a;
                g = g * 255u32 / a;
                b = b * 255u32 / a;
            }

            output.push(r.min(255) as u8);
            output.push(g.min(255) as u8);
            output.push(b.min(255) as u8);
            output.push(a as u8);
        }

        output
    }

    /// The reverse of `get_rgba`: pack straight RGBA bytes into
    /// premultiplied ARGB words that `raqote::Image` can draw.
    pub fn to_argb(rgba: &[u8]) -> Vec<u32> {
        rgba.chunks_exact(4)
            .map(|px| {
                let a = px[3] as u32;
                let premultiply = |c: u8| (c as u32 * a + 127) / 255;
                (a << 24) | (premultiply(px[0]) << 16) | (premultiply(px[1]) << 8) | premultiply(px[2])
            })
            .collect()
    }

}
