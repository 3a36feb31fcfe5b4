/// The refresh loop: pick a city, sample its webcam, paint, sleep.
pub mod scheduler {
    use crate::city::city::{City, CityId, CityRegistry, RegistrySource};
    use crate::config::config::Intervals;
    use crate::error::error::RegistryLoadError;
    use crate::geo_clock::geo_clock::SunClock;
    use crate::output::output::GradientSink;
    use crate::selector::selector::select;
    use crate::webcam::webcam::ColorFetcher;
    use std::fmt;
    use std::time::Duration;
    use tokio::time::sleep;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum SchedulerState {
        Loading,
        Live,
        Waiting,
        /// The city list could not be loaded. Nothing runs after this.
        Error,
    }

    impl fmt::Display for SchedulerState {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(match self {
                SchedulerState::Loading => "loading",
                SchedulerState::Live => "live",
                SchedulerState::Waiting => "waiting",
                SchedulerState::Error => "error",
            })
        }
    }

    /// How a whole tick ended. Failed fetches never end a tick, they
    /// start another attempt right away.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TickOutcome {
        Live(CityId),
        Waiting,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Attempt {
        Applied(CityId),
        Failed(CityId),
        NoneChosen,
    }

    /// Called with the newly selected city (or `None`) whenever the
    /// selection changes.
    pub type ChangeListener = Box<dyn FnMut(Option<&City>) + Send>;

    pub struct Scheduler<C, F, S> {
        clock: C,
        fetcher: F,
        sink: S,
        intervals: Intervals,
        registry: CityRegistry,
        current: Option<CityId>,
        state: SchedulerState,
        on_change: Option<ChangeListener>,
    }

    impl<C, F, S> Scheduler<C, F, S>
    where
        C: SunClock,
        F: ColorFetcher,
        S: GradientSink,
    {
        pub fn new(clock: C, fetcher: F, sink: S, intervals: Intervals) -> Self {
            Scheduler {
                clock,
                fetcher,
                sink,
                intervals,
                registry: CityRegistry::default(),
                current: None,
                state: SchedulerState::Loading,
                on_change: None,
            }
        }

        /// Skip loading and use this registry.
        pub fn with_registry(mut self, registry: CityRegistry) -> Self {
            self.registry = registry;
            self
        }

        pub fn on_change(mut self, listener: ChangeListener) -> Self {
            self.on_change = Some(listener);
            self
        }

        pub fn state(&self) -> SchedulerState {
            self.state
        }

        pub fn registry(&self) -> &CityRegistry {
            &self.registry
        }

        pub fn current(&self) -> Option<CityId> {
            self.current
        }

        pub fn current_city(&self) -> Option<&City> {
            self.current.and_then(|id| self.registry.get(id))
        }

        pub fn sink(&self) -> &S {
            &self.sink
        }

        fn set_state(&mut self, state: SchedulerState) {
            if self.state != state {
                tracing::info!(from = %self.state, to = %state, "state change");
            }
            self.state = state;
        }

        pub async fn load(
            &mut self,
            source: &RegistrySource,
            client: &reqwest::Client,
        ) -> Result<(), RegistryLoadError> {
            match CityRegistry::load(source, client).await {
                Ok(registry) => {
                    tracing::info!(%source, cities = registry.len(), "city list loaded");
                    self.registry = registry;
                    Ok(())
                }
                Err(err) => {
                    tracing::error!(%source, error = %err, "could not load city list");
                    self.set_state(SchedulerState::Error);
                    Err(err)
                }
            }
        }

        fn notify_change(&mut self) {
            let city = self.current.and_then(|id| self.registry.get(id));
            match city {
                Some(city) => tracing::info!(city = %city.name, "sunset city changed"),
                None => tracing::info!("no sunset city"),
            }
            if let Some(listener) = self.on_change.as_mut() {
                listener(city);
            }
        }

        async fn attempt(&mut self) -> Attempt {
            let now = self.clock.now();
            let selection = select(&self.registry, self.current, now, &self.clock);
            self.current = selection.chosen;
            if selection.changed {
                self.notify_change();
            }

            let Some(id) = selection.chosen else {
                return Attempt::NoneChosen;
            };
            let Some(city) = self.registry.get(id) else {
                return Attempt::NoneChosen;
            };

            match self.fetcher.fetch_colors(city).await {
                Ok(colors) => {
                    self.registry.record_success(id);
                    self.set_state(SchedulerState::Live);
                    if let Err(err) = self.sink.apply(colors).await {
                        tracing::warn!(error = ?err, "could not apply gradient");
                    }
                    Attempt::Applied(id)
                }
                Err(err) => {
                    let blacklisted = self.registry.record_failure(id);
                    if let Some(city) = self.registry.get(id) {
                        tracing::warn!(
                            city = %city.name,
                            failures = city.failures(),
                            error = ?err,
                            "webcam fetch failed"
                        );
                        if blacklisted {
                            tracing::warn!(city = %city.name, "city blacklisted");
                        }
                    }
                    Attempt::Failed(id)
                }
            }
        }

        /// One full tick. Retries immediately on fetch failure; each retry
        /// either blacklists a city or moves towards it, so this ends.
        pub async fn tick(&mut self) -> TickOutcome {
            loop {
                match self.attempt().await {
                    Attempt::Applied(id) => return TickOutcome::Live(id),
                    Attempt::Failed(_) => continue,
                    Attempt::NoneChosen => {
                        self.set_state(SchedulerState::Waiting);
                        return TickOutcome::Waiting;
                    }
                }
            }
        }

        pub fn delay_after(&self, outcome: TickOutcome) -> Duration {
            match outcome {
                TickOutcome::Live(_) => self.intervals.live(),
                TickOutcome::Waiting => self.intervals.waiting(),
            }
        }

        /// Load the city list and run a single tick.
        pub async fn run_once(
            &mut self,
            source: &RegistrySource,
            client: &reqwest::Client,
        ) -> Result<TickOutcome, RegistryLoadError> {
            self.load(source, client).await?;
            Ok(self.tick().await)
        }

        /// Load the city list and tick forever. Only returns if loading
        /// fails.
        pub async fn run(
            &mut self,
            source: &RegistrySource,
            client: &reqwest::Client,
        ) -> Result<(), RegistryLoadError> {
            self.load(source, client).await?;
            loop {
                let outcome = self.tick().await;
                let delay = self.delay_after(outcome);
                tracing::debug!(state = %self.state, ?delay, "next tick scheduled");
                sleep(delay).await;
            }
        }
    }

}
