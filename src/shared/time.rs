use std::fmt;

/// Seconds since midnight of the service day.
/// GTFS allows values past 24:00:00 for trips that run over midnight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(u32);

impl From<u32> for Time {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hms_string())
    }
}

impl Time {
    pub const fn from_seconds(secs: u32) -> Self {
        Self(secs)
    }

    pub const fn as_seconds(&self) -> u32 {
        self.0
    }

    pub fn to_hms_string(&self) -> String {
        let h = self.0 / 3600;
        let m = (self.0 % 3600) / 60;
        let s = self.0 % 60;
        format!("{:02}:{:02}:{:02}", h, m, s)
    }

    pub fn from_hms(time: &str) -> Option<Self> {
        const HOUR_TO_SEC: u32 = 60 * 60;
        const MINUTE_TO_SEC: u32 = 60;
        let mut split = time.trim().split(':');
        let hours: u32 = split.next()?.parse().ok()?;
        let minutes: u32 = split.next()?.parse().ok()?;
        let seconds: u32 = split.next()?.parse().ok()?;
        if split.next().is_some() || minutes >= 60 || seconds >= 60 {
            return None;
        }
        Some(Self(hours * HOUR_TO_SEC + minutes * MINUTE_TO_SEC + seconds))
    }
}

#[test]
fn parse_unparse_1() {
    let time = "00:00:00";
    let stime = Time::from_hms(time).unwrap();
    assert_eq!(time, stime.to_hms_string())
}

#[test]
fn parse_unparse_2() {
    let time = "12:30:30";
    let stime = Time::from_hms(time).unwrap();
    assert_eq!(time, stime.to_hms_string())
}

#[test]
fn parse_past_midnight() {
    let stime = Time::from_hms("25:10:00").unwrap();
    assert_eq!(stime.as_seconds(), 25 * 3600 + 600);
    assert_eq!(stime.to_string(), "25:10:00");
}

#[test]
fn reject_out_of_range_minutes() {
    assert!(Time::from_hms("08:61:00").is_none());
    assert!(Time::from_hms("08:00:00:00").is_none());
}
