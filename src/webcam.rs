/// Grabbing one frame from a city's webcam and reducing it to two colors.
pub mod webcam {
    use crate::city::city::{City, Region};
    use crate::color::color::GradientColors;
    use crate::error::error::FetchError;
    use crate::sampler::sampler::sample_region;
    use async_trait::async_trait;
    use image::DynamicImage;
    use palette::Srgb;
    use reqwest::header::USER_AGENT;
    use std::ops::Range;
    use std::sync::Arc;

    /// Give up on a body that has not produced a frame by this size.
    const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

    /// Anything that can hand over a single decoded webcam frame.
    #[async_trait]
    pub trait FrameSource: Send + Sync {
        async fn fetch_frame(&self, url: &str) -> Result<DynamicImage, FetchError>;
    }

    /// What the scheduler needs: a city in, a color pair out.
    #[async_trait]
    pub trait ColorFetcher: Send + Sync {
        async fn fetch_colors(&self, city: &City) -> Result<GradientColors, FetchError>;
    }

    enum Scan {
        Complete(usize),
        Incomplete,
        Corrupt,
    }

    /// Position of the first real marker after entropy-coded data starting
    /// at `pos`. Stuffed zeros, restart markers and fill bytes are data.
    fn entropy_end(buf: &[u8], mut pos: usize) -> Option<usize> {
        while pos + 1 < buf.len() {
            if buf[pos] == 0xFF {
                match buf[pos + 1] {
                    0x00 | 0xD0..=0xD7 => {
                        pos += 2;
                        continue;
                    }
                    0xFF => {
                        pos += 1;
                        continue;
                    }
                    _ => return Some(pos),
                }
            }
            pos += 1;
        }
        None
    }

    /// Walk marker segments by their lengths from just after an SOI.
    /// Segment payloads (COM, APPn, DQT) are skipped whole, so stray
    /// `FF D9` bytes inside them do not end the frame.
    fn frame_end(buf: &[u8], mut pos: usize) -> Scan {
        loop {
            if pos + 1 >= buf.len() {
                return Scan::Incomplete;
            }
            if buf[pos] != 0xFF {
                return Scan::Corrupt;
            }
            let marker = buf[pos + 1];
            match marker {
                0xFF => pos += 1,
                0xD9 => return Scan::Complete(pos + 2),
                0x01 | 0xD0..=0xD7 => pos += 2,
                0x00 | 0xD8 => return Scan::Corrupt,
                _ => {
                    let Some(len) = buf.get(pos + 2..pos + 4) else {
                        return Scan::Incomplete;
                    };
                    let len = usize::from(u16::from_be_bytes([len[0], len[1]]));
                    if len < 2 {
                        return Scan::Corrupt;
                    }
                    pos += 2 + len;
                    if marker == 0xDA {
                        match entropy_end(buf, pos) {
                            Some(next) => pos = next,
                            None => return Scan::Incomplete,
                        }
                    }
                }
            }
        }
    }

    /// Byte range of the first complete JPEG in `buf`, or `None` until
    /// enough of it has arrived. Anything before a well-formed SOI (MJPEG
    /// part headers, broken frames) is skipped.
    pub fn first_jpeg(buf: &[u8]) -> Option<Range<usize>> {
        let mut from = 0;
        while let Some(offset) = buf[from..].windows(2).position(|w| w == [0xFF, 0xD8]) {
            let start = from + offset;
            match frame_end(buf, start + 2) {
                Scan::Complete(end) => return Some(start..end),
                Scan::Incomplete => return None,
                Scan::Corrupt => from = start + 2,
            }
        }
        None
    }

    /// Fetches `proxy + city.url` over HTTP.
    pub struct ProxyFrameSource {
        client: reqwest::Client,
        proxy: String,
    }

    impl ProxyFrameSource {
        pub fn new(client: reqwest::Client, proxy: &str) -> Self {
            ProxyFrameSource {
                client,
                proxy: proxy.to_string(),
            }
        }

        pub fn frame_url(&self, path: &str) -> String {
            format!("{}{}", self.proxy, path)
        }
    }

    /// Consume the response until one frame is buffered. The response is
    /// owned here, so returning closes the connection and a live MJPEG
    /// stream stops downloading.
    async fn read_first_frame(mut resp: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        let mut buf = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(FetchError::load)? {
            buf.extend_from_slice(&chunk);
            if let Some(range) = first_jpeg(&buf) {
                buf.truncate(range.end);
                buf.drain(..range.start);
                return Ok(buf);
            }
            if buf.len() > MAX_FRAME_BYTES {
                return Err(FetchError::load("no frame within size limit"));
            }
        }
        if buf.is_empty() {
            return Err(FetchError::load("empty body"));
        }
        Ok(buf)
    }

    #[async_trait]
    impl FrameSource for ProxyFrameSource {
        async fn fetch_frame(&self, path: &str) -> Result<DynamicImage, FetchError> {
            let url = self.frame_url(path);
            let resp = self
                .client
                .get(&url)
                .header(USER_AGENT, "sunset-sky")
                .send()
                .await
                .map_err(FetchError::load)?;
            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::load(format!("HTTP {status} from {url}")));
            }
            let bytes = read_first_frame(resp).await?;
            tracing::debug!(%url, bytes = bytes.len(), "got frame");
            Ok(image::load_from_memory(&bytes)?)
        }
    }

    async fn sample_on_blocking_pool(
        frame: Arc<DynamicImage>,
        region: Region,
    ) -> Result<Srgb<u8>, FetchError> {
        tokio::task::spawn_blocking(move || sample_region(&frame, &region))
            .await
            .map_err(|e| FetchError::Sampling(e.to_string()))
    }

    /// Sample both regions at once. Resolves only when both are done.
    pub async fn sample_pair(
        frame: DynamicImage,
        top: &Region,
        bot: &Region,
    ) -> Result<GradientColors, FetchError> {
        let frame = Arc::new(frame);
        let (top, bot) = tokio::join!(
            sample_on_blocking_pool(frame.clone(), top.clone()),
            sample_on_blocking_pool(frame, bot.clone()),
        );
        Ok(GradientColors::new(top?, bot?))
    }

    pub struct WebcamFetcher<S: FrameSource> {
        source: S,
    }

    impl<S: FrameSource> WebcamFetcher<S> {
        pub fn new(source: S) -> Self {
            WebcamFetcher { source }
        }
    }

    impl WebcamFetcher<ProxyFrameSource> {
        pub fn with_proxy(client: reqwest::Client, proxy: &str) -> Self {
            WebcamFetcher::new(ProxyFrameSource::new(client, proxy))
        }
    }

    #[async_trait]
    impl<S: FrameSource> ColorFetcher for WebcamFetcher<S> {
        async fn fetch_colors(&self, city: &City) -> Result<GradientColors, FetchError> {
            let frame = self.source.fetch_frame(&city.url).await?;
            sample_pair(frame, &city.top, &city.bot).await
        }
    }

}
