/// Arabic 12-hour rendering of an `HH:MM` string: `"13:05"` → `"1:05 م"`.
///
/// Hours after noon lose twelve and their padding; morning hours and noon are
/// kept as written (`"09:30"` → `"09:30 ص"`). Anything after the minutes is
/// ignored. `None` when the hour is not a number or there is no minute part.
pub fn arabic_time(value: &str) -> Option<String> {
    let mut parts = value.split(':');
    let hour = parts.next()?.trim();
    let minute = parts.next()?.trim();
    let hour_number: u32 = hour.parse().ok()?;

    let day_part = if hour_number >= 12 { "م" } else { "ص" };
    let hour_text = if hour_number > 12 {
        (hour_number - 12).to_string()
    } else {
        hour.to_string()
    };
    Some(format!("{hour_text}:{minute} {day_part}"))
}

/// Append an AM/PM marker to a 24-hour time, keeping the time as written.
pub fn day_time(time: &str) -> String {
    let is_pm = time
        .split(':')
        .next()
        .and_then(|hour| hour.trim().parse::<u32>().ok())
        .is_some_and(|hour| hour >= 12);
    format!("{time} {}", if is_pm { "PM" } else { "AM" })
}
