use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// An ordered sequence of (timestamp, value) pairs.
///
/// Construction sorts by timestamp. Loaders are responsible for rejecting
/// duplicate timestamps before a series is built.
#[derive(Debug, Clone, Default)]
pub struct TimeSeries {
    points: Vec<(DateTime<Utc>, f64)>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Build a series from (timestamp, value) pairs, sorting ascending.
    pub fn from_points(mut points: Vec<(DateTime<Utc>, f64)>) -> Self {
        points.sort_by_key(|(ts, _)| *ts);
        Self { points }
    }

    pub fn points(&self) -> &[(DateTime<Utc>, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|(_, value)| *value)
    }
}

/// Three series reduced to their shared timestamp axis, ascending.
///
/// The four vectors always have equal lengths; index i across them describes
/// one interval.
#[derive(Debug, Clone, Default)]
pub struct AlignedWindow {
    pub timestamps: Vec<DateTime<Utc>>,
    pub charge: Vec<f64>,
    pub discharge: Vec<f64>,
    pub price: Vec<f64>,
}

impl AlignedWindow {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Intersect the three timestamp axes and collect the values at each shared
/// timestamp. An empty intersection yields an empty window, not an error.
pub fn align(charge: &TimeSeries, discharge: &TimeSeries, price: &TimeSeries) -> AlignedWindow {
    let mut window = AlignedWindow::default();
    let (a, b, c) = (charge.points(), discharge.points(), price.points());
    let (mut i, mut j, mut k) = (0, 0, 0);

    while i < a.len() && j < b.len() && k < c.len() {
        let (ta, tb, tc) = (a[i].0, b[j].0, c[k].0);
        if ta == tb && tb == tc {
            window.timestamps.push(ta);
            window.charge.push(a[i].1);
            window.discharge.push(b[j].1);
            window.price.push(c[k].1);
            i += 1;
            j += 1;
            k += 1;
        } else {
            // Advance whichever axes sit at the earliest timestamp.
            let min = ta.min(tb).min(tc);
            if ta == min {
                i += 1;
            }
            if tb == min {
                j += 1;
            }
            if tc == min {
                k += 1;
            }
        }
    }
    window
}

/// Half-open UTC bounds of the calendar month containing `date`:
/// the 1st at midnight through the 1st of the following month at midnight.
pub fn month_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.with_day(1).unwrap();
    let end = if start.month() == 12 {
        NaiveDate::from_ymd_opt(start.year() + 1, 1, 1).unwrap()
    } else {
        NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1).unwrap()
    };
    (
        Utc.from_utc_datetime(&start.and_hms_opt(0, 0, 0).unwrap()),
        Utc.from_utc_datetime(&end.and_hms_opt(0, 0, 0).unwrap()),
    )
}

/// Parse a telemetry timestamp. Accepts RFC 3339 with offset, falling back to
/// naive `YYYY-MM-DD HH:MM:SS` interpreted as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
}
