use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use eyre::{Result, WrapErr, eyre};
use serde_json::Value;

use crate::logging;
use crate::provider::{fetch_json, http_client};
use crate::settings::Settings;

/// Timings the service reports that are not prayers.
pub const SKIPPED_TIMINGS: &[&str] = &["Sunset", "Imsak", "Midnight", "Firstthird", "Lastthird"];

pub const REMINDER_TITLE_PREFIX: &str = "اقتربت صلاة ";

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub ip: String,
    pub address: String,
}

pub trait PrayerTimesProvider {
    fn locate(&self) -> Result<Location>;
    /// `(name, "HH:MM")` pairs for today at the given coordinates.
    fn timings(&self, latitude: f64, longitude: f64) -> Result<Vec<(String, String)>>;
}

/// IP geolocation (`{"loc": "lat,lon", "ip", "city", "country"}`) followed by
/// an Aladhan-style timings lookup (`{"data": {"timings": {...}}}`).
pub struct HttpPrayerTimes {
    client: reqwest::blocking::Client,
    location_url: String,
    timings_url: String,
}

impl HttpPrayerTimes {
    pub fn new(location_url: impl Into<String>, timings_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            location_url: location_url.into(),
            timings_url: timings_url.into(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.location_url.clone(), settings.prayer_times_url.clone())
    }
}

impl PrayerTimesProvider for HttpPrayerTimes {
    fn locate(&self) -> Result<Location> {
        let payload = fetch_json(&self.client, &self.location_url).wrap_err("location lookup failed")?;
        parse_location(&payload)
    }

    fn timings(&self, latitude: f64, longitude: f64) -> Result<Vec<(String, String)>> {
        let url = format!("{}?latitude={latitude}&longitude={longitude}", self.timings_url);
        let payload = fetch_json(&self.client, &url).wrap_err("prayer times lookup failed")?;
        parse_timings(&payload)
    }
}

pub fn parse_location(payload: &Value) -> Result<Location> {
    let loc = payload
        .get("loc")
        .and_then(Value::as_str)
        .ok_or_else(|| eyre!("location payload has no loc field"))?;
    let (lat, lon) = loc
        .split_once(',')
        .ok_or_else(|| eyre!("malformed loc `{loc}`"))?;
    let text = |name: &str| payload.get(name).and_then(Value::as_str).unwrap_or_default();
    Ok(Location {
        latitude: lat.trim().parse().wrap_err_with(|| format!("bad latitude `{lat}`"))?,
        longitude: lon.trim().parse().wrap_err_with(|| format!("bad longitude `{lon}`"))?,
        ip: text("ip").to_string(),
        address: format!("{} {}", text("city"), text("country")).trim().to_string(),
    })
}

pub fn parse_timings(payload: &Value) -> Result<Vec<(String, String)>> {
    let timings = payload
        .get("data")
        .and_then(|d| d.get("timings"))
        .and_then(Value::as_object)
        .ok_or_else(|| eyre!("prayer payload has no data.timings object"))?;
    Ok(timings
        .iter()
        .filter_map(|(name, time)| time.as_str().map(|t| (name.clone(), t.to_string())))
        .collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrayerTime {
    pub name: String,
    pub time: NaiveTime,
    /// `HH:MM` as reported, without any timezone suffix.
    pub clock: String,
}

/// Prayers of the day in time order, non-prayer timings removed.
pub fn prayer_schedule(timings: &[(String, String)]) -> Vec<PrayerTime> {
    let mut schedule: Vec<PrayerTime> = timings
        .iter()
        .filter(|(name, _)| !SKIPPED_TIMINGS.contains(&name.as_str()))
        .filter_map(|(name, raw)| {
            // "05:12 (EET)" → "05:12"
            let clock = raw.split_whitespace().next().unwrap_or_default();
            match NaiveTime::parse_from_str(clock, "%H:%M") {
                Ok(time) => Some(PrayerTime {
                    name: name.clone(),
                    time,
                    clock: clock.to_string(),
                }),
                Err(err) => {
                    logging::warn(format!("skipping {name}: bad time `{raw}`: {err}"));
                    None
                }
            }
        })
        .collect();
    schedule.sort_by_key(|p| p.time);
    schedule
}

/// Where the user is and the prayers of the day there.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySchedule {
    pub location: Location,
    pub prayers: Vec<PrayerTime>,
}

pub fn fetch_today(provider: &dyn PrayerTimesProvider) -> Result<DaySchedule> {
    let location = provider.locate()?;
    logging::info(format!(
        "locating prayer times for {} ({}, {})",
        location.address, location.latitude, location.longitude
    ));
    let timings = provider.timings(location.latitude, location.longitude)?;
    Ok(DaySchedule {
        location,
        prayers: prayer_schedule(&timings),
    })
}

pub fn arabic_prayer_name(name: &str) -> &str {
    match name {
        "Fajr" => "الفجر",
        "Sunrise" => "الشروق",
        "Dhuhr" => "الظهر",
        "Asr" => "العصر",
        "Maghrib" => "المغرب",
        "Isha" => "العشاء",
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub prayer: String,
    pub title: String,
    pub at: NaiveDateTime,
}

/// One reminder per prayer, `lead_minutes` before it.
pub fn plan_reminders(date: NaiveDate, schedule: &[PrayerTime], lead_minutes: i64) -> Vec<Reminder> {
    schedule
        .iter()
        .map(|prayer| Reminder {
            prayer: prayer.name.clone(),
            title: format!("{REMINDER_TITLE_PREFIX}{}", arabic_prayer_name(&prayer.name)),
            at: date.and_time(prayer.time) - Duration::minutes(lead_minutes),
        })
        .collect()
}

pub trait NotificationScheduler {
    fn schedule(&mut self, reminder: &Reminder) -> Result<()>;
}

/// Prints reminders instead of handing them to a notification daemon.
#[derive(Debug, Default)]
pub struct StdoutScheduler;

impl NotificationScheduler for StdoutScheduler {
    fn schedule(&mut self, reminder: &Reminder) -> Result<()> {
        println!("reminder {} at {}", reminder.title, reminder.at.format("%Y-%m-%d %H:%M"));
        Ok(())
    }
}

/// Hand every reminder to `scheduler`; failures are logged and skipped.
pub fn schedule_all(scheduler: &mut dyn NotificationScheduler, reminders: &[Reminder]) -> usize {
    reminders
        .iter()
        .filter(|reminder| match scheduler.schedule(reminder) {
            Ok(()) => true,
            Err(err) => {
                logging::warn(format!("could not schedule {}: {err:#}", reminder.prayer));
                false
            }
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn timings() -> Vec<(String, String)> {
        [
            ("Asr", "15:20"),
            ("Fajr", "04:30 (EET)"),
            ("Imsak", "04:20"),
            ("Sunset", "18:01"),
            ("Isha", "19:30"),
            ("Midnight", "23:40"),
            ("Dhuhr", "12:05"),
            ("Maghrib", "18:01"),
            ("Sunrise", "05:55"),
        ]
        .iter()
        .map(|(n, t)| (n.to_string(), t.to_string()))
        .collect()
    }

    #[test]
    fn test_schedule_filters_and_orders() {
        let schedule = prayer_schedule(&timings());
        let names: Vec<&str> = schedule.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Fajr", "Sunrise", "Dhuhr", "Asr", "Maghrib", "Isha"]);
        assert_eq!(schedule[0].clock, "04:30");
    }

    #[test]
    fn test_schedule_skips_bad_times() {
        let bad = vec![("Fajr".to_string(), "soon".to_string())];
        assert!(prayer_schedule(&bad).is_empty());
    }

    #[test]
    fn test_plan_reminders() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let schedule = prayer_schedule(&timings());
        let reminders = plan_reminders(date, &schedule, 30);
        assert_eq!(reminders.len(), 6);
        assert_eq!(reminders[0].title, "اقتربت صلاة الفجر");
        assert_eq!(
            reminders[0].at,
            date.and_hms_opt(4, 0, 0).unwrap()
        );
        assert_eq!(reminders[2].at, date.and_hms_opt(11, 35, 0).unwrap());
    }

    #[test]
    fn test_reminder_before_midnight_rolls_back_a_day() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let schedule = prayer_schedule(&[("Fajr".to_string(), "00:10".to_string())]);
        let reminders = plan_reminders(date, &schedule, 30);
        assert_eq!(
            reminders[0].at,
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap().and_hms_opt(23, 40, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_location() {
        let payload = json!({"ip": "1.2.3.4", "loc": "30.0444,31.2357", "city": "Cairo", "country": "EG"});
        let location = parse_location(&payload).unwrap();
        assert_eq!(location.latitude, 30.0444);
        assert_eq!(location.longitude, 31.2357);
        assert_eq!(location.address, "Cairo EG");
        assert!(parse_location(&json!({"loc": "nowhere"})).is_err());
        assert!(parse_location(&json!({})).is_err());
    }

    #[test]
    fn test_parse_timings() {
        let payload = json!({"data": {"timings": {"Fajr": "04:30", "Isha": "19:30", "bogus": 3}}});
        let mut pairs = parse_timings(&payload).unwrap();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("Fajr".to_string(), "04:30".to_string()),
                ("Isha".to_string(), "19:30".to_string())
            ]
        );
        assert!(parse_timings(&json!({"data": {}})).is_err());
    }

    struct FixedTimes;

    impl PrayerTimesProvider for FixedTimes {
        fn locate(&self) -> Result<Location> {
            Ok(Location {
                latitude: 21.4,
                longitude: 39.8,
                ip: String::new(),
                address: "Makkah SA".to_string(),
            })
        }

        fn timings(&self, latitude: f64, _longitude: f64) -> Result<Vec<(String, String)>> {
            assert_eq!(latitude, 21.4);
            Ok(timings())
        }
    }

    #[test]
    fn test_fetch_today() {
        let today = fetch_today(&FixedTimes).unwrap();
        assert_eq!(today.location.address, "Makkah SA");
        assert_eq!(today.prayers.len(), 6);
        assert_eq!(today.prayers[5].name, "Isha");
    }

    struct FailingScheduler {
        accepted: Vec<String>,
    }

    impl NotificationScheduler for FailingScheduler {
        fn schedule(&mut self, reminder: &Reminder) -> Result<()> {
            if reminder.prayer == "Asr" {
                return Err(eyre!("permission denied"));
            }
            self.accepted.push(reminder.prayer.clone());
            Ok(())
        }
    }

    #[test]
    fn test_schedule_all_skips_failures() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let reminders = plan_reminders(date, &prayer_schedule(&timings()), 30);
        let mut scheduler = FailingScheduler { accepted: Vec::new() };
        assert_eq!(schedule_all(&mut scheduler, &reminders), 5);
        assert!(!scheduler.accepted.contains(&"Asr".to_string()));
    }
}
