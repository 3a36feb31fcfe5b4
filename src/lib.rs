//! Paints a two-color sky gradient sampled from the webcam of whichever
//! city is watching the sun go down right now.

pub mod city;
pub mod color;
pub mod config;
pub mod draw_buffer;
pub mod error;
pub mod filter;
pub mod geo_clock;
pub mod logging;
pub mod output;
pub mod pusher;
pub mod quantize;
pub mod sampler;
pub mod scheduler;
pub mod selector;
pub mod webcam;

pub use city::city::{City, CityHealth, CityId, CityRegistry, MinuteOffset, Region, RegistrySource};
pub use color::color::GradientColors;
pub use config::config::{Args, Config, Intervals};
pub use error::error::{ConfigError, FetchError, QuantizeError, RegistryLoadError};
pub use geo_clock::geo_clock::{compute_window, SunCalcClock, SunClock, SunsetWindow};
pub use output::output::{Crossfade, DisplaySink, GradientSink, Target};
pub use sampler::sampler::sample_region;
pub use scheduler::scheduler::{ChangeListener, Scheduler, SchedulerState, TickOutcome};
pub use selector::selector::{is_sunset_city, select, Selection};
pub use webcam::webcam::{ColorFetcher, FrameSource, ProxyFrameSource, WebcamFetcher};
