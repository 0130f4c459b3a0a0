//! Calendrier discret : fenêtre, fuseau et heures calmes ramenés à une suite
//! de slots de durée fixe.
//!
//! Tout est calculé en UTC ; seules les heures calmes sont évaluées en heure
//! locale du fuseau demandé, jour par jour.

use crate::error::ConfigurationError;
use crate::model::{QuietHours, ScheduleWindow};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use chrono_tz::Tz;
use tracing::debug;

/// Garde-fous contre l'explosion combinatoire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarLimits {
    pub max_horizon_days: u32,
    pub max_slots: usize,
}

/// Unité atomique de l'horizon, immuable une fois construite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineSlot {
    pub index: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub quiet: bool,
}

impl TimelineSlot {
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Horizon discrétisé, ordonné par début de slot.
#[derive(Debug, Clone)]
pub struct Timeline {
    slots: Vec<TimelineSlot>,
    granularity_minutes: u32,
    timezone: Tz,
    quiet_hours: Vec<QuietHours>,
}

impl Timeline {
    pub fn slots(&self) -> &[TimelineSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn granularity_minutes(&self) -> u32 {
        self.granularity_minutes
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn quiet_hours(&self) -> &[QuietHours] {
        &self.quiet_hours
    }

    pub fn non_quiet_count(&self) -> usize {
        self.slots.iter().filter(|s| !s.quiet).count()
    }

    /// Instant exprimé dans le fuseau du calendrier.
    pub fn local(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        at.with_timezone(&self.timezone).fixed_offset()
    }

    /// Plages calmes qui recoupent le slot `index`.
    pub fn quiet_ranges_at(&self, index: usize) -> Vec<QuietHours> {
        let Some(slot) = self.slots.get(index) else {
            return Vec::new();
        };
        self.quiet_hours
            .iter()
            .filter(|q| intersects_quiet(&self.timezone, slot.start, slot.end, q))
            .copied()
            .collect()
    }
}

/// Construit la timeline d'une requête ; fonction pure de ses entrées.
#[derive(Debug, Clone, Copy)]
pub struct IntervalCalendar {
    limits: CalendarLimits,
}

impl IntervalCalendar {
    pub fn new(limits: CalendarLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> CalendarLimits {
        self.limits
    }

    pub fn build(
        &self,
        window: &ScheduleWindow,
        quiet_hours: &[QuietHours],
        timezone: Tz,
        granularity_minutes: u32,
    ) -> Result<Timeline, ConfigurationError> {
        if window.end <= window.start {
            return Err(ConfigurationError::InvalidWindow);
        }
        for q in quiet_hours {
            q.validate()?;
        }
        if granularity_minutes == 0 {
            return Err(ConfigurationError::InvalidGranularity);
        }

        let span = window.duration();
        if span > Duration::days(i64::from(self.limits.max_horizon_days)) {
            let minutes = span.num_minutes();
            return Err(ConfigurationError::HorizonTooLong {
                days: (minutes + 1439) / 1440,
                max_days: self.limits.max_horizon_days,
            });
        }

        let step_secs = i64::from(granularity_minutes) * 60;
        if span.num_seconds() % step_secs != 0 {
            return Err(ConfigurationError::UnevenGranularity {
                granularity: granularity_minutes,
                window_minutes: span.num_minutes(),
            });
        }
        let count = span.num_seconds() / step_secs;
        if count > self.limits.max_slots as i64 {
            return Err(ConfigurationError::TooManySlots {
                slots: count,
                max_slots: self.limits.max_slots,
            });
        }

        let origin = window.start.with_timezone(&Utc);
        let slots: Vec<TimelineSlot> = (0..count)
            .map(|i| {
                let start = origin + Duration::seconds(step_secs * i);
                let end = start + Duration::seconds(step_secs);
                let quiet = quiet_hours
                    .iter()
                    .any(|q| intersects_quiet(&timezone, start, end, q));
                TimelineSlot {
                    index: i as usize,
                    start,
                    end,
                    quiet,
                }
            })
            .collect();

        debug!(
            slots = slots.len(),
            quiet = slots.iter().filter(|s| s.quiet).count(),
            granularity_minutes,
            timezone = %timezone,
            "timeline built"
        );

        Ok(Timeline {
            slots,
            granularity_minutes,
            timezone,
            quiet_hours: quiet_hours.to_vec(),
        })
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz, ConfigurationError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ConfigurationError::UnknownTimezone(name.to_string()))
}

/// Intersection en heure locale entre `[start, end)` et la plage calme
/// projetée sur chaque jour touché (veille comprise, pour les plages qui
/// traversent minuit).
fn intersects_quiet(tz: &Tz, start: DateTime<Utc>, end: DateTime<Utc>, q: &QuietHours) -> bool {
    let lo = start.with_timezone(tz).naive_local();
    let mut hi = end.with_timezone(tz).naive_local();
    // recul d'heure (DST) : l'heure locale de fin peut précéder le début
    if hi <= lo {
        hi = lo + (end - start);
    }

    let mut day = lo.date().pred_opt().unwrap_or(lo.date());
    let last = hi.date();
    while day <= last {
        let (qs, qe) = q.on(day);
        if qs < hi && lo < qe {
            return true;
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    false
}
