pub mod geo_clock {
    use crate::city::city::MinuteOffset;
    use chrono::{DateTime, Duration, Utc};
    use suncalc::Timestamp;

    /// suncalc reports sun events that never happen (polar day or night)
    /// as garbage instants far from the requested date.
    const MAX_EVENT_DISTANCE_HOURS: i64 = 48;

    /// Start of sunset and end of civil dusk for one location and day.
    /// Either end is `None` when the sun never crosses that threshold.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SunsetWindow {
        pub sunset_start: Option<DateTime<Utc>>,
        pub dusk_end: Option<DateTime<Utc>>,
    }

    impl SunsetWindow {
        pub fn new(sunset_start: DateTime<Utc>, dusk_end: DateTime<Utc>) -> Self {
            SunsetWindow {
                sunset_start: Some(sunset_start),
                dusk_end: Some(dusk_end),
            }
        }

        pub fn contains(&self, now: DateTime<Utc>) -> bool {
            match (self.sunset_start, self.dusk_end) {
                (Some(start), Some(end)) => start <= now && now <= end,
                _ => false,
            }
        }
    }

    fn from_suncalc(ts: Timestamp, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let instant = DateTime::<Utc>::from_timestamp_millis(ts.0)?;
        if (instant - now).num_hours().abs() > MAX_EVENT_DISTANCE_HOURS {
            return None;
        }
        Some(instant)
    }

    /// Offsets come straight from the city document. One too large to
    /// represent leaves that end of the window undefined.
    fn shifted(instant: Option<DateTime<Utc>>, minutes: f64) -> Option<DateTime<Utc>> {
        let seconds = minutes * 60.0;
        if !seconds.is_finite() {
            return None;
        }
        let delta = Duration::try_seconds(seconds.round() as i64)?;
        instant?.checked_add_signed(delta)
    }

    /// Compute the sunset window for the day containing `now`.
    pub fn compute_window(
        lat: f64,
        lon: f64,
        now: DateTime<Utc>,
        offset: MinuteOffset,
    ) -> SunsetWindow {
        let times = suncalc::get_times(Timestamp(now.timestamp_millis()), lat, lon, None);
        SunsetWindow {
            sunset_start: shifted(from_suncalc(times.sunset_start, now), offset.0),
            dusk_end: shifted(from_suncalc(times.dusk, now), offset.1),
        }
    }

    /// Source of "now" and of sunset windows. The scheduler only talks to
    /// the sky through this, so tests can pin both.
    pub trait SunClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }

        fn sunset_window(
            &self,
            lat: f64,
            lon: f64,
            now: DateTime<Utc>,
            offset: MinuteOffset,
        ) -> SunsetWindow;
    }

    /// Wall clock plus suncalc.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SunCalcClock;

    impl SunClock for SunCalcClock {
        fn sunset_window(
            &self,
            lat: f64,
            lon: f64,
            now: DateTime<Utc>,
            offset: MinuteOffset,
        ) -> SunsetWindow {
            compute_window(lat, lon, now, offset)
        }
    }

}
