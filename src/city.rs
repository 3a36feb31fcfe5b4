pub mod city {
    use crate::error::error::RegistryLoadError;
    use reqwest::header::USER_AGENT;
    use serde::Deserialize;
    use std::fmt;
    use std::path::PathBuf;

    /// Failures after which a city is never selected again.
    pub const BLACKLIST_THRESHOLD: u32 = 2;

    /// Crop rectangle (in source pixels) plus the filter settings used
    /// when sampling it.
    #[derive(Debug, Clone, PartialEq, Deserialize)]
    pub struct Region {
        pub x: u32,
        pub y: u32,
        pub w: u32,
        pub h: u32,
        /// Saturation in percent, 100 leaves the color unchanged.
        #[serde(default = "default_saturation")]
        pub sat: f32,
        #[serde(default = "unit")]
        pub con: f32,
        /// Hue rotation in degrees.
        #[serde(default)]
        pub hue: f32,
        #[serde(default = "unit")]
        pub br: f32,
    }

    fn default_saturation() -> f32 {
        100.0
    }

    fn unit() -> f32 {
        1.0
    }

    impl Region {
        /// A region with neutral filters.
        pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
            Region {
                x,
                y,
                w,
                h,
                sat: default_saturation(),
                con: unit(),
                hue: 0.0,
                br: unit(),
            }
        }
    }

    /// Minutes added to the computed sunset start and dusk end.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
    pub struct MinuteOffset(pub f64, pub f64);

    /// Per-city failure bookkeeping. Only the registry mutates it.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct CityHealth {
        failures: u32,
        blacklisted: bool,
    }

    impl CityHealth {
        pub fn failures(&self) -> u32 {
            self.failures
        }

        pub fn is_blacklisted(&self) -> bool {
            self.blacklisted
        }
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct City {
        pub name: String,
        pub lat: f64,
        pub lon: f64,
        pub url: String,
        #[serde(default)]
        pub offset: MinuteOffset,
        pub top: Region,
        pub bot: Region,
        #[serde(skip)]
        health: CityHealth,
    }

    impl City {
        pub fn new(name: &str, lat: f64, lon: f64, url: &str, top: Region, bot: Region) -> Self {
            City {
                name: name.to_string(),
                lat,
                lon,
                url: url.to_string(),
                offset: MinuteOffset::default(),
                top,
                bot,
                health: CityHealth::default(),
            }
        }

        pub fn with_offset(mut self, offset: MinuteOffset) -> Self {
            self.offset = offset;
            self
        }

        pub fn health(&self) -> &CityHealth {
            &self.health
        }

        pub fn failures(&self) -> u32 {
            self.health.failures
        }

        pub fn is_blacklisted(&self) -> bool {
            self.health.blacklisted
        }
    }

    /// Stable handle into a `CityRegistry`. Two handles are equal only if
    /// they point at the same record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CityId(usize);

    impl CityId {
        pub fn index(self) -> usize {
            self.0
        }
    }

    impl fmt::Display for CityId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "#{}", self.0)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RegistryDocument {
        List(Vec<City>),
        Wrapped { cities: Vec<City> },
    }

    /// Where the city list comes from.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RegistrySource {
        Url(String),
        File(PathBuf),
    }

    impl RegistrySource {
        pub fn parse(raw: &str) -> Self {
            if raw.starts_with("http://") || raw.starts_with("https://") {
                RegistrySource::Url(raw.to_string())
            } else {
                RegistrySource::File(PathBuf::from(raw))
            }
        }
    }

    impl fmt::Display for RegistrySource {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                RegistrySource::Url(url) => f.write_str(url),
                RegistrySource::File(path) => write!(f, "{}", path.display()),
            }
        }
    }

    /// The ordered list of cities, in document order. Order matters: it
    /// is the tie-break for selection.
    #[derive(Debug, Clone, Default)]
    pub struct CityRegistry {
        cities: Vec<City>,
    }

    impl CityRegistry {
        pub fn new(cities: Vec<City>) -> Self {
            CityRegistry { cities }
        }

        pub fn from_json(body: &str) -> Result<Self, RegistryLoadError> {
            let cities = match serde_json::from_str::<RegistryDocument>(body)? {
                RegistryDocument::List(cities) => cities,
                RegistryDocument::Wrapped { cities } => cities,
            };
            Ok(CityRegistry::new(cities))
        }

        pub async fn load(
            source: &RegistrySource,
            client: &reqwest::Client,
        ) -> Result<Self, RegistryLoadError> {
            let body = match source {
                RegistrySource::Url(url) => {
                    let resp = client
                        .get(url)
                        .header(USER_AGENT, "sunset-sky")
                        .send()
                        .await?;
                    if !resp.status().is_success() {
                        return Err(RegistryLoadError::Status(resp.status().as_u16()));
                    }
                    resp.text().await?
                }
                RegistrySource::File(path) => tokio::fs::read_to_string(path).await?,
            };
            Self::from_json(&body)
        }

        pub fn len(&self) -> usize {
            self.cities.len()
        }

        pub fn is_empty(&self) -> bool {
            self.cities.is_empty()
        }

        pub fn get(&self, id: CityId) -> Option<&City> {
            self.cities.get(id.0)
        }

        pub fn id_of(&self, name: &str) -> Option<CityId> {
            self.cities.iter().position(|c| c.name == name).map(CityId)
        }

        pub fn iter(&self) -> impl Iterator<Item = (CityId, &City)> {
            self.cities.iter().enumerate().map(|(i, c)| (CityId(i), c))
        }

        pub(crate) fn record_success(&mut self, id: CityId) {
            if let Some(city) = self.cities.get_mut(id.0) {
                city.health.failures = 0;
            }
        }

        /// Counts one failed fetch. Returns true if this failure put the
        /// city on the blacklist.
        pub(crate) fn record_failure(&mut self, id: CityId) -> bool {
            let Some(city) = self.cities.get_mut(id.0) else {
                return false;
            };
            if city.health.blacklisted {
                return false;
            }
            city.health.failures += 1;
            if city.health.failures >= BLACKLIST_THRESHOLD {
                city.health.blacklisted = true;
                return true;
            }
            false
        }
    }

}
