use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of one series as reported by one instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    pub series: String,
    pub instance: String,
}

impl SeriesKey {
    pub fn new(series: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            instance: instance.into(),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.series, self.instance)
    }
}

/// A single raw measurement. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub time: i64,
    pub value: i64,
}

impl Point {
    pub fn new(time: i64, value: i64) -> Self {
        Self { time, value }
    }
}

/// Alert level of a watched series, ordered from healthy to critical.
///
/// # Examples
///
/// ```
/// use monwatch_common::types::Level;
///
/// let level: Level = "amber".parse().unwrap();
/// assert_eq!(level, Level::Amber);
/// assert_eq!(level.to_string(), "amber");
/// assert!(Level::Red > Level::Amber);
/// assert_eq!(Level::Red.step_down(), Level::Amber);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Green,
    Amber,
    Red,
}

impl Level {
    pub fn is_alerting(self) -> bool {
        self != Level::Green
    }

    /// The next lower rank; GREEN stays GREEN.
    pub fn step_down(self) -> Level {
        match self {
            Level::Red => Level::Amber,
            Level::Amber | Level::Green => Level::Green,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Green => write!(f, "green"),
            Level::Amber => write!(f, "amber"),
            Level::Red => write!(f, "red"),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "green" => Ok(Level::Green),
            "amber" => Ok(Level::Amber),
            "red" => Ok(Level::Red),
            _ => Err(format!("unknown level: {s}")),
        }
    }
}

/// Unit a series is measured in. Part of a watch's identity next to the series name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Count,
    Percent,
    Bytes,
    Sec,
    Ms,
    Ns,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::Count => "count",
            Unit::Percent => "percent",
            Unit::Bytes => "bytes",
            Unit::Sec => "sec",
            Unit::Ms => "ms",
            Unit::Ns => "ns",
        };
        f.write_str(s)
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "count" => Ok(Unit::Count),
            "percent" | "%" => Ok(Unit::Percent),
            "bytes" => Ok(Unit::Bytes),
            "sec" | "s" => Ok(Unit::Sec),
            "ms" => Ok(Unit::Ms),
            "ns" => Ok(Unit::Ns),
            _ => Err(format!("unknown unit: {s}")),
        }
    }
}

/// Comparison operator of a threshold condition. Equality is literal, no epsilon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
    Equal,
    NotEqual,
}

impl FromStr for Comparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" | "gt" | "greater_than" => Ok(Self::GreaterThan),
            "<" | "lt" | "less_than" => Ok(Self::LessThan),
            ">=" | "gte" | "greater_equal" => Ok(Self::GreaterEqual),
            "<=" | "lte" | "less_equal" => Ok(Self::LessEqual),
            "=" | "==" | "eq" | "equal" => Ok(Self::Equal),
            "!=" | "<>" | "ne" | "not_equal" => Ok(Self::NotEqual),
            _ => Err(format!("unknown compare operator: {s}")),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterEqual => ">=",
            Self::LessEqual => "<=",
            Self::Equal => "=",
            Self::NotEqual => "!=",
        };
        f.write_str(s)
    }
}

impl Comparison {
    pub fn holds(self, value: i64, threshold: i64) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::LessThan => value < threshold,
            Self::GreaterEqual => value >= threshold,
            Self::LessEqual => value <= threshold,
            Self::Equal => value == threshold,
            Self::NotEqual => value != threshold,
        }
    }

    /// Same as [`Comparison::holds`] for averaged values.
    #[allow(clippy::float_cmp)]
    pub fn holds_avg(self, value: f64, threshold: i64) -> bool {
        let threshold = threshold as f64;
        match self {
            Self::GreaterThan => value > threshold,
            Self::LessThan => value < threshold,
            Self::GreaterEqual => value >= threshold,
            Self::LessEqual => value <= threshold,
            Self::Equal => value == threshold,
            Self::NotEqual => value != threshold,
        }
    }
}

// serde goes through the string forms so config files can use `">"` or `"gt"` alike.
impl Serialize for Comparison {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Comparison {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_is_literal_at_threshold() {
        assert!(!Comparison::GreaterThan.holds(90, 90));
        assert!(Comparison::GreaterEqual.holds(90, 90));
        assert!(Comparison::Equal.holds(90, 90));
        assert!(!Comparison::NotEqual.holds(90, 90));
        assert!(Comparison::LessThan.holds_avg(89.999, 90));
        assert!(!Comparison::LessEqual.holds_avg(90.001, 90));
    }

    #[test]
    fn comparison_parses_symbols_and_names() {
        assert_eq!(">".parse::<Comparison>().unwrap(), Comparison::GreaterThan);
        assert_eq!("lte".parse::<Comparison>().unwrap(), Comparison::LessEqual);
        assert_eq!("!=".parse::<Comparison>().unwrap(), Comparison::NotEqual);
        assert!("~".parse::<Comparison>().is_err());
    }

    #[test]
    fn series_key_display() {
        assert_eq!(SeriesKey::new("cpu", "server1").to_string(), "cpu@server1");
    }
}
