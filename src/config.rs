pub mod config {
    use crate::city::city::RegistrySource;
    use crate::error::error::ConfigError;
    use crate::output::output::Target;
    use crate::pusher::pusher::TidbytDevice;
    use clap::Parser;
    use std::path::PathBuf;
    use std::time::Duration;

    pub const DEFAULT_LIVE_SECS: f64 = 5.0;
    pub const DEFAULT_WAITING_SECS: f64 = 60.0;
    pub const DEFAULT_FADE_FRAMES: usize = 8;

    #[derive(Parser, Debug)]
    #[command(author, version, about, long_about = None)]
    pub struct Args {
        /// City list: an http(s) URL or a path to a JSON file
        #[arg(long, env = "SUNSET_CITIES")]
        pub cities: String,

        /// Prepended to every city's webcam url
        #[arg(long, env = "SUNSET_PROXY", default_value = "")]
        pub proxy: String,

        /// Seconds to wait after painting a fresh gradient
        #[arg(long, default_value_t = DEFAULT_LIVE_SECS)]
        pub live_interval: f64,

        /// Seconds to wait when no city is watching a sunset
        #[arg(long, default_value_t = DEFAULT_WAITING_SECS)]
        pub waiting_interval: f64,

        /// Jump straight to new colors instead of fading
        #[arg(long)]
        pub no_crossfade: bool,

        #[arg(long, default_value_t = DEFAULT_FADE_FRAMES)]
        pub crossfade_frames: usize,

        /// Filename of the debug file. Runs a single tick.
        #[arg(short, long)]
        pub debug: Option<PathBuf>,

        /// Keep writing the latest gradient to this file
        #[arg(short, long)]
        pub output: Option<PathBuf>,

        #[arg(long, env = "TIDBYT_ID")]
        pub tidbyt_id: Option<String>,

        #[arg(long, env = "TIDBYT_KEY", hide_env_values = true)]
        pub tidbyt_key: Option<String>,

        /// Debug level logging
        #[arg(short, long)]
        pub verbose: bool,
    }

    /// How long the scheduler sleeps between ticks. Waiting is always
    /// the slower of the two.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Intervals {
        live: Duration,
        waiting: Duration,
    }

    impl Intervals {
        pub fn new(live_secs: f64, waiting_secs: f64) -> Result<Self, ConfigError> {
            let live = Duration::try_from_secs_f64(live_secs)
                .map_err(|_| ConfigError::InvalidInterval(live_secs))?;
            let waiting = Duration::try_from_secs_f64(waiting_secs)
                .map_err(|_| ConfigError::InvalidInterval(waiting_secs))?;
            if waiting <= live {
                return Err(ConfigError::IntervalOrdering {
                    live: live_secs,
                    waiting: waiting_secs,
                });
            }
            Ok(Intervals { live, waiting })
        }

        pub fn live(&self) -> Duration {
            self.live
        }

        pub fn waiting(&self) -> Duration {
            self.waiting
        }
    }

    impl Default for Intervals {
        fn default() -> Self {
            Intervals {
                live: Duration::from_secs_f64(DEFAULT_LIVE_SECS),
                waiting: Duration::from_secs_f64(DEFAULT_WAITING_SECS),
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct Config {
        pub source: RegistrySource,
        pub proxy: String,
        pub intervals: Intervals,
        /// 0 disables the cross-fade animation.
        pub fade_frames: usize,
        pub targets: Vec<Target>,
        /// Stop after the first tick.
        pub once: bool,
        pub verbose: bool,
    }

    impl Config {
        pub fn from_args(args: Args) -> Result<Self, ConfigError> {
            let intervals = Intervals::new(args.live_interval, args.waiting_interval)?;

            let mut targets = Vec::new();
            if let Some(path) = &args.debug {
                targets.push(Target::File(path.clone()));
            }
            if let Some(path) = args.output {
                targets.push(Target::File(path));
            }
            match (args.tidbyt_id, args.tidbyt_key) {
                (Some(id), Some(key)) => targets.push(Target::Tidbyt(TidbytDevice { id, key })),
                (None, None) => {}
                _ => return Err(ConfigError::IncompleteTidbyt),
            }

            Ok(Config {
                source: RegistrySource::parse(&args.cities),
                proxy: args.proxy,
                intervals,
                fade_frames: if args.no_crossfade { 0 } else { args.crossfade_frames },
                targets,
                once: args.debug.is_some(),
                verbose: args.verbose,
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn parse(argv: &[&str]) -> Args {
            let mut full = vec!["sunset-sky"];
            full.extend_from_slice(argv);
            Args::try_parse_from(full).unwrap()
        }

        #[test]
        fn defaults_poll_slower_while_waiting() {
            let config = Config::from_args(parse(&["--cities", "cities.json"])).unwrap();
            assert!(config.intervals.waiting() > config.intervals.live());
            assert_eq!(config.intervals, Intervals::default());
            assert_eq!(config.source, RegistrySource::File("cities.json".into()));
            assert_eq!(config.fade_frames, DEFAULT_FADE_FRAMES);
            assert!(!config.once);
        }

        #[test]
        fn rejects_waiting_not_longer_than_live() {
            let err = Intervals::new(30.0, 30.0).unwrap_err();
            assert_eq!(err, ConfigError::IntervalOrdering { live: 30.0, waiting: 30.0 });
            assert_eq!(Intervals::new(-1.0, 30.0).unwrap_err(), ConfigError::InvalidInterval(-1.0));
        }

        #[test]
        fn debug_file_means_single_tick() {
            let config = Config::from_args(parse(&[
                "--cities",
                "https://example.org/c.json",
                "--debug",
                "out.webp",
                "--no-crossfade",
            ]))
            .unwrap();
            assert!(config.once);
            assert_eq!(config.fade_frames, 0);
            assert_eq!(config.targets, vec![Target::File("out.webp".into())]);
            assert!(matches!(config.source, RegistrySource::Url(_)));
        }

        #[test]
        fn tidbyt_needs_both_halves() {
            // flags win over the environment, so this holds with TIDBYT_* set
            let mut args = parse(&["--cities", "c.json", "--tidbyt-id", "dev", "--tidbyt-key", "k"]);
            args.tidbyt_key = None;
            assert_eq!(Config::from_args(args).unwrap_err(), ConfigError::IncompleteTidbyt);

            let mut args = parse(&["--cities", "c.json", "--tidbyt-id", "dev", "--tidbyt-key", "k"]);
            args.tidbyt_id = None;
            assert_eq!(Config::from_args(args).unwrap_err(), ConfigError::IncompleteTidbyt);

            let args = parse(&["--cities", "c.json", "--tidbyt-id", "dev", "--tidbyt-key", "k"]);
            let config = Config::from_args(args).unwrap();
            assert_eq!(
                config.targets,
                vec![Target::Tidbyt(TidbytDevice {
                    id: "dev".into(),
                    key: "k".into()
                })]
            );
        }
    }
}
