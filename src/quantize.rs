/// Modified median cut quantization. Builds a small palette out of an
/// RGBA buffer; the first entry is the dominant color.
pub mod quantize {
    use crate::error::error::QuantizeError;
    use palette::Srgb;

    const SIGBITS: u32 = 5;
    const RSHIFT: u32 = 8 - SIGBITS;
    const HISTO_SIZE: usize = 1 << (3 * SIGBITS);
    const MAX_ITERATIONS: usize = 1000;
    const FRACT_BY_POPULATIONS: f64 = 0.75;

    /// Colors in the palette used to pick the dominant one.
    pub const DOMINANT_PALETTE_SIZE: usize = 5;
    /// Only every n-th pixel is looked at.
    pub const DEFAULT_QUALITY: usize = 10;

    fn color_index(r: usize, g: usize, b: usize) -> usize {
        (r << (2 * SIGBITS)) + (g << SIGBITS) + b
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Channel {
        Red,
        Green,
        Blue,
    }

    #[derive(Debug, Clone)]
    struct VBox {
        r1: i32,
        r2: i32,
        g1: i32,
        g2: i32,
        b1: i32,
        b2: i32,
        count: u64,
        volume: u64,
    }

    impl VBox {
        fn new(r1: i32, r2: i32, g1: i32, g2: i32, b1: i32, b2: i32, histo: &[u32]) -> Self {
            let mut vbox = VBox {
                r1,
                r2,
                g1,
                g2,
                b1,
                b2,
                count: 0,
                volume: 0,
            };
            vbox.refresh(histo);
            vbox
        }

        fn refresh(&mut self, histo: &[u32]) {
            let span = |lo: i32, hi: i32| (hi - lo + 1).max(0) as u64;
            self.volume = span(self.r1, self.r2) * span(self.g1, self.g2) * span(self.b1, self.b2);
            let mut count = 0u64;
            for r in self.r1..=self.r2 {
                for g in self.g1..=self.g2 {
                    for b in self.b1..=self.b2 {
                        count += histo[color_index(r as usize, g as usize, b as usize)] as u64;
                    }
                }
            }
            self.count = count;
        }

        fn range(&self, channel: Channel) -> (i32, i32) {
            match channel {
                Channel::Red => (self.r1, self.r2),
                Channel::Green => (self.g1, self.g2),
                Channel::Blue => (self.b1, self.b2),
            }
        }

        fn set_range(&mut self, channel: Channel, lo: i32, hi: i32) {
            match channel {
                Channel::Red => (self.r1, self.r2) = (lo, hi),
                Channel::Green => (self.g1, self.g2) = (lo, hi),
                Channel::Blue => (self.b1, self.b2) = (lo, hi),
            }
        }

        /// Population-weighted mean color, or the box center when empty.
        fn average(&self, histo: &[u32]) -> Srgb<u8> {
            let mult = (1u32 << RSHIFT) as f64;
            let (mut total, mut rsum, mut gsum, mut bsum) = (0f64, 0f64, 0f64, 0f64);
            for r in self.r1..=self.r2 {
                for g in self.g1..=self.g2 {
                    for b in self.b1..=self.b2 {
                        let h = histo[color_index(r as usize, g as usize, b as usize)] as f64;
                        total += h;
                        rsum += h * (r as f64 + 0.5) * mult;
                        gsum += h * (g as f64 + 0.5) * mult;
                        bsum += h * (b as f64 + 0.5) * mult;
                    }
                }
            }
            if total > 0.0 {
                Srgb::new(
                    (rsum / total) as u8,
                    (gsum / total) as u8,
                    (bsum / total) as u8,
                )
            } else {
                let mid = |lo: i32, hi: i32| (mult * (lo + hi + 1) as f64 / 2.0).min(255.0) as u8;
                Srgb::new(
                    mid(self.r1, self.r2),
                    mid(self.g1, self.g2),
                    mid(self.b1, self.b2),
                )
            }
        }
    }

    fn build_histogram(rgba: &[u8], quality: usize) -> (Vec<u32>, usize) {
        let mut histo = vec![0u32; HISTO_SIZE];
        let mut used = 0;
        for px in rgba.chunks_exact(4).step_by(quality.max(1)) {
            let (r, g, b, a) = (px[0], px[1], px[2], px[3]);
            // transparent and near-white pixels carry no color
            if a < 125 || (r > 250 && g > 250 && b > 250) {
                continue;
            }
            let idx = color_index(
                (r >> RSHIFT) as usize,
                (g >> RSHIFT) as usize,
                (b >> RSHIFT) as usize,
            );
            histo[idx] += 1;
            used += 1;
        }
        (histo, used)
    }

    fn bounding_box(histo: &[u32]) -> VBox {
        let max = (1i32 << SIGBITS) - 1;
        let (mut rmin, mut rmax, mut gmin, mut gmax, mut bmin, mut bmax) = (max, 0, max, 0, max, 0);
        for r in 0..=max {
            for g in 0..=max {
                for b in 0..=max {
                    if histo[color_index(r as usize, g as usize, b as usize)] == 0 {
                        continue;
                    }
                    rmin = rmin.min(r);
                    rmax = rmax.max(r);
                    gmin = gmin.min(g);
                    gmax = gmax.max(g);
                    bmin = bmin.min(b);
                    bmax = bmax.max(b);
                }
            }
        }
        VBox::new(rmin, rmax, gmin, gmax, bmin, bmax, histo)
    }

    /// Split a box at the median of its widest channel.
    fn median_cut(histo: &[u32], vbox: &VBox) -> Option<(VBox, Option<VBox>)> {
        if vbox.count == 0 {
            return None;
        }
        if vbox.count == 1 {
            return Some((vbox.clone(), None));
        }

        let widths = [
            (Channel::Red, vbox.r2 - vbox.r1 + 1),
            (Channel::Green, vbox.g2 - vbox.g1 + 1),
            (Channel::Blue, vbox.b2 - vbox.b1 + 1),
        ];
        let max_width = widths.iter().map(|w| w.1).max().unwrap_or(0);
        let channel = widths
            .iter()
            .find(|w| w.1 == max_width)
            .map(|w| w.0)
            .unwrap_or(Channel::Red);
        let (lo, hi) = vbox.range(channel);

        // partial[i]: population of slices lo..=i along the cut channel
        let mut partial = vec![0u64; (1 << SIGBITS) as usize];
        let mut total = 0u64;
        for i in lo..=hi {
            let mut slice = vbox.clone();
            slice.set_range(channel, i, i);
            slice.refresh(histo);
            total += slice.count;
            partial[i as usize] = total;
        }
        let lookahead = |i: i32| total - partial[i as usize];
        let filled = |i: i32| i >= lo && i <= hi && partial[i as usize] > 0;

        for i in lo..=hi {
            if partial[i as usize] <= total / 2 {
                continue;
            }
            let left = i - lo;
            let right = hi - i;
            let mut d2 = if left <= right {
                (hi - 1).min(i + right / 2)
            } else {
                lo.max(i - 1 - left / 2)
            };
            while !filled(d2) {
                d2 += 1;
            }
            let mut count2 = lookahead(d2);
            while count2 == 0 && filled(d2 - 1) {
                d2 -= 1;
                count2 = lookahead(d2);
            }

            let mut first = vbox.clone();
            let mut second = vbox.clone();
            first.set_range(channel, lo, d2);
            second.set_range(channel, d2 + 1, hi);
            first.refresh(histo);
            second.refresh(histo);
            return Some((first, Some(second)));
        }
        None
    }

    /// Pop-largest queue: sorted ascending by `key`, popped from the end.
    struct BoxQueue<F: Fn(&VBox) -> u64> {
        boxes: Vec<VBox>,
        key: F,
    }

    impl<F: Fn(&VBox) -> u64> BoxQueue<F> {
        fn new(key: F) -> Self {
            BoxQueue {
                boxes: Vec::new(),
                key,
            }
        }

        fn push(&mut self, vbox: VBox) {
            self.boxes.push(vbox);
        }

        fn pop(&mut self) -> Option<VBox> {
            let key = &self.key;
            self.boxes.sort_by_key(|b| key(b));
            self.boxes.pop()
        }

        fn len(&self) -> usize {
            self.boxes.len()
        }
    }

    fn split_until<F: Fn(&VBox) -> u64>(queue: &mut BoxQueue<F>, histo: &[u32], target: usize) {
        let mut colors = queue.len();
        let mut iterations = 0;
        while iterations < MAX_ITERATIONS {
            if colors >= target {
                return;
            }
            iterations += 1;
            let Some(vbox) = queue.pop() else {
                return;
            };
            if vbox.count == 0 {
                queue.push(vbox);
                iterations += 1;
                continue;
            }
            let Some((first, second)) = median_cut(histo, &vbox) else {
                return;
            };
            queue.push(first);
            if let Some(second) = second {
                queue.push(second);
                colors += 1;
            }
        }
    }

    /// Reduce the buffer to at most `max_colors` colors, most populated
    /// first.
    pub fn palette(rgba: &[u8], max_colors: usize, quality: usize) -> Result<Vec<Srgb<u8>>, QuantizeError> {
        let (histo, used) = build_histogram(rgba, quality);
        if used == 0 {
            return Err(QuantizeError::NoPixels);
        }
        let max_colors = max_colors.clamp(2, 256);

        let mut by_count = BoxQueue::new(|b: &VBox| b.count);
        by_count.push(bounding_box(&histo));
        let target = (FRACT_BY_POPULATIONS * max_colors as f64).ceil() as usize;
        split_until(&mut by_count, &histo, target);

        let mut by_volume = BoxQueue::new(|b: &VBox| b.count * b.volume);
        while let Some(vbox) = by_count.pop() {
            by_volume.push(vbox);
        }
        split_until(&mut by_volume, &histo, max_colors);

        // most populated box first; ties keep the count * volume order
        let mut boxes = Vec::with_capacity(by_volume.len());
        while let Some(vbox) = by_volume.pop() {
            boxes.push(vbox);
        }
        boxes.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(boxes.iter().map(|b| b.average(&histo)).collect())
    }

    pub fn dominant_color(rgba: &[u8]) -> Result<Srgb<u8>, QuantizeError> {
        palette(rgba, DOMINANT_PALETTE_SIZE, DEFAULT_QUALITY)?
            .into_iter()
            .next()
            .ok_or(QuantizeError::NoPixels)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn solid(rgb: (u8, u8, u8), pixels: usize) -> Vec<u8> {
            std::iter::repeat([rgb.0, rgb.1, rgb.2, 255])
                .take(pixels)
                .flatten()
                .collect()
        }

        fn close(a: Srgb<u8>, b: (u8, u8, u8)) -> bool {
            a.red.abs_diff(b.0) <= 8 && a.green.abs_diff(b.1) <= 8 && a.blue.abs_diff(b.2) <= 8
        }

        #[test]
        fn single_color_is_dominant() {
            let buf = solid((200, 90, 30), 1000);
            let color = dominant_color(&buf).unwrap();
            assert!(close(color, (200, 90, 30)), "{color:?}");
        }

        #[test]
        fn majority_color_wins() {
            let mut buf = solid((250, 120, 40), 3000);
            buf.extend(solid((20, 30, 120), 1000));
            let color = dominant_color(&buf).unwrap();
            assert!(close(color, (250, 120, 40)), "{color:?}");
        }

        #[test]
        fn pure_white_has_no_pixels() {
            let buf = solid((255, 255, 255), 500);
            assert_eq!(dominant_color(&buf), Err(QuantizeError::NoPixels));
        }

        #[test]
        fn transparent_pixels_are_ignored() {
            let buf: Vec<u8> = std::iter::repeat([10, 10, 10, 0]).take(200).flatten().collect();
            assert_eq!(palette(&buf, 5, 1), Err(QuantizeError::NoPixels));
        }

        #[test]
        fn palette_has_at_most_requested_colors() {
            let mut buf = Vec::new();
            for i in 0..64u8 {
                buf.extend(solid((i * 4, 255 - i * 4, i.wrapping_mul(7)), 50));
            }
            let colors = palette(&buf, 5, 1).unwrap();
            assert!(!colors.is_empty());
            assert!(colors.len() <= 5, "{}", colors.len());
        }
    }
}
