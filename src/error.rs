/// Error taxonomy shared by the registry, the fetcher and the sampler.
pub mod error {
    use thiserror::Error;

    /// The city list could not be obtained. Fatal for the scheduler.
    #[derive(Debug, Error)]
    pub enum RegistryLoadError {
        #[error("could not request city list: {0}")]
        Transport(#[from] reqwest::Error),
        #[error("city list request returned HTTP {0}")]
        Status(u16),
        #[error("could not read city list file: {0}")]
        Io(#[from] std::io::Error),
        #[error("could not parse city list: {0}")]
        Parse(#[from] serde_json::Error),
    }

    /// A webcam frame could not be turned into a color pair.
    #[derive(Debug, Error)]
    pub enum FetchError {
        #[error("load failed")]
        LoadFailed(String),
        #[error("could not decode frame: {0}")]
        Decode(#[from] image::ImageError),
        #[error("sampling task failed: {0}")]
        Sampling(String),
    }

    impl FetchError {
        pub fn load(reason: impl ToString) -> Self {
            FetchError::LoadFailed(reason.to_string())
        }
    }

    #[derive(Debug, Error, PartialEq, Eq)]
    pub enum QuantizeError {
        #[error("no usable pixels to quantize")]
        NoPixels,
    }

    #[derive(Debug, Error, PartialEq)]
    pub enum ConfigError {
        #[error("waiting interval ({waiting}s) must be longer than live interval ({live}s)")]
        IntervalOrdering { live: f64, waiting: f64 },
        #[error("{0} is not a usable interval in seconds")]
        InvalidInterval(f64),
        #[error("pushing to a Tidbyt needs both a device id and a key")]
        IncompleteTidbyt,
    }

}
