/// Decides which city's webcam the sky is painted from.
pub mod selector {
    use crate::city::city::{City, CityId, CityRegistry};
    use crate::geo_clock::geo_clock::{SunClock, SunsetWindow};
    use chrono::{DateTime, Utc};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Selection {
        pub chosen: Option<CityId>,
        /// True when `chosen` is not the city that was passed in.
        pub changed: bool,
    }

    fn window_for(city: &City, now: DateTime<Utc>, clock: &impl SunClock) -> SunsetWindow {
        clock.sunset_window(city.lat, city.lon, now, city.offset)
    }

    /// Usable and currently between sunset start and end of dusk.
    pub fn is_sunset_city(city: &City, now: DateTime<Utc>, clock: &impl SunClock) -> bool {
        !city.is_blacklisted() && window_for(city, now, clock).contains(now)
    }

    /// Usable city whose sunset starts soonest after `now`. Equal start
    /// times resolve to the earlier city in the registry.
    pub fn next_sunset_city(
        registry: &CityRegistry,
        now: DateTime<Utc>,
        clock: &impl SunClock,
    ) -> Option<CityId> {
        let mut best: Option<(DateTime<Utc>, CityId)> = None;
        for (id, city) in registry.iter() {
            if city.is_blacklisted() {
                continue;
            }
            let Some(start) = window_for(city, now, clock).sunset_start else {
                continue;
            };
            if start <= now {
                continue;
            }
            if best.map_or(true, |(best_start, _)| start < best_start) {
                best = Some((start, id));
            }
        }
        best.map(|(_, id)| id)
    }

    pub fn select(
        registry: &CityRegistry,
        current: Option<CityId>,
        now: DateTime<Utc>,
        clock: &impl SunClock,
    ) -> Selection {
        let sticky = current.filter(|id| {
            registry
                .get(*id)
                .is_some_and(|city| is_sunset_city(city, now, clock))
        });

        let chosen = sticky
            .or_else(|| {
                registry
                    .iter()
                    .find(|(_, city)| is_sunset_city(city, now, clock))
                    .map(|(id, _)| id)
            })
            .or_else(|| next_sunset_city(registry, now, clock));

        Selection {
            chosen,
            changed: chosen != current,
        }
    }

}
