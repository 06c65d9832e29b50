//! SBS-1 "Base Station" message format.
//!
//! One ASCII message per line, exactly 22 comma-separated fields, as
//! documented on <http://woodair.net/sbs/article/barebones42_socket_data.htm>
//!
//! Example line:
//! `MSG,8,1,1,400BE5,1,2019/10/16,20:48:00.473,2019/10/16,20:48:00.473,,,,,,,,,,,,0`
//!
//! Fields (0-indexed):
//! - 0: message category (MSG, SEL, ID, AIR, STA, CLK)
//! - 1: transmission type (MSG only: 1-8)
//! - 2/3: session id / aircraft-session id
//! - 4: ICAO 24-bit address (upper-case hex, our primary key)
//! - 5: flight id
//! - 6/7: message generated date & time
//! - 8/9: message logged date & time
//! - 10: callsign
//! - 11: altitude in feet
//! - 12: ground speed in knots
//! - 13: track in degrees
//! - 14/15: latitude / longitude
//! - 16: vertical rate in ft/min
//! - 17: squawk
//! - 18-21: alert, emergency, spi, onground flags ("-1" is true)
//!
//! Only the MSG category carries telemetry.  Which of the optional fields are
//! populated depends on the transmission type, see the table in `Flight`.
//!

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use regex::{Captures, Regex};
use strum::EnumString;
use thiserror::Error;

/// Number of comma-separated fields in every Base Station line.
pub const MSG_FIELDS: usize = 22;

/// Fixed schema for the transmission (MSG) category.  A line that does not
/// match in full is dropped, never partially decoded.
///
static RE_MSG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^MSG,
        (?P<transmission_type>\d),
        (?P<session>\d+),
        (?P<aircraft>\d+),
        (?P<hexident>[0-9A-F]+),
        (?P<flight>\d+),
        (?P<gen_date>[0-9/]+),
        (?P<gen_time>[0-9:.]+),
        (?P<log_date>[0-9/]+),
        (?P<log_time>[0-9:.]+),
        (?P<callsign>[\w\s]*),
        (?P<altitude>\d*),
        (?P<speed>\d*),
        (?P<track>[\d\-]*),
        (?P<latitude>[\d\-.]*),
        (?P<longitude>[\d\-.]*),
        (?P<verticalrate>[\d\-]*),
        (?P<squawk>\d*),
        (?P<alert>[\d\-]*),
        (?P<emergency>[\d\-]*),
        (?P<spi>[\d\-]*),
        (?P<onground>[\d\-]*)$",
    )
    .unwrap()
});

/// Decoding errors.  All of them are absorbed by the caller with a log entry,
/// a bad line never takes the stream down.
///
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("wrong message length ({0}/{MSG_FIELDS})")]
    FieldCount(usize),
    #[error("not a transmission message: {0}")]
    Category(String),
    #[error("unsupported transmission type {0}")]
    Transmission(u8),
    #[error("could not identify all fields in '{0}'")]
    Pattern(String),
}

/// Message categories of the Base Station protocol.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumString, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum MessageCategory {
    /// Selection change
    Sel,
    /// New id
    Id,
    /// New aircraft
    Air,
    /// Status change
    Sta,
    /// Click
    Clk,
    /// Transmission, the only one carrying telemetry
    Msg,
}

/// One decoded transmission message.
///
/// Everything the wire does not guarantee is an `Option`: a blank numeric
/// field is an explicit unknown, never zero.  Boolean flags are "-1" for
/// true, any other non-blank value for false.
///
#[derive(Clone, Debug, PartialEq)]
pub struct AdsbEvent {
    /// Transmission type, 1 to 8
    pub transmission_type: u8,
    /// Session id
    pub session: Option<u32>,
    /// Aircraft-session id
    pub aircraft: Option<u32>,
    /// ICAO 24-bit address, stable key of an aircraft
    pub hexident: String,
    /// Flight id
    pub flight: Option<u32>,
    /// When the message was generated
    pub generated: Option<DateTime<Utc>>,
    /// When the message was logged
    pub logged: Option<DateTime<Utc>>,
    /// Callsign, trimmed
    pub callsign: Option<String>,
    /// Altitude in feet
    pub altitude: Option<i32>,
    /// Ground speed in knots
    pub speed: Option<i32>,
    /// Track in degrees
    pub track: Option<i32>,
    /// Latitude in degrees
    pub latitude: Option<f64>,
    /// Longitude in degrees
    pub longitude: Option<f64>,
    /// Vertical rate in ft/min
    pub vertical_rate: Option<i32>,
    /// Mode-A squawk code
    pub squawk: Option<u16>,
    pub alert: Option<bool>,
    pub emergency: Option<bool>,
    pub spi: Option<bool>,
    pub onground: Option<bool>,
}

impl AdsbEvent {
    /// Decode one wire line.
    ///
    /// The line must have exactly [MSG_FIELDS] comma-separated fields, be of
    /// the MSG category and match the full schema.  Individual field values
    /// that fail coercion degrade to `None` instead of rejecting the line.
    ///
    pub fn from_line(line: &str) -> Result<AdsbEvent, DecodeError> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != MSG_FIELDS {
            return Err(DecodeError::FieldCount(fields.len()));
        }

        match MessageCategory::from_str(fields[0]) {
            Ok(MessageCategory::Msg) => (),
            _ => return Err(DecodeError::Category(fields[0].to_owned())),
        }

        let caps = RE_MSG
            .captures(line)
            .ok_or_else(|| DecodeError::Pattern(line.to_owned()))?;

        let tt = caps["transmission_type"]
            .parse::<u8>()
            .map_err(|_| DecodeError::Pattern(line.to_owned()))?;
        if !(1..=8).contains(&tt) {
            return Err(DecodeError::Transmission(tt));
        }

        Ok(AdsbEvent {
            transmission_type: tt,
            session: number(&caps, "session"),
            aircraft: number(&caps, "aircraft"),
            hexident: caps["hexident"].to_owned(),
            flight: number(&caps, "flight"),
            generated: datetime(&caps, "gen_date", "gen_time"),
            logged: datetime(&caps, "log_date", "log_time"),
            callsign: callsign(&caps),
            altitude: number(&caps, "altitude"),
            speed: number(&caps, "speed"),
            track: number(&caps, "track"),
            latitude: number(&caps, "latitude"),
            longitude: number(&caps, "longitude"),
            vertical_rate: number(&caps, "verticalrate"),
            squawk: number(&caps, "squawk"),
            alert: flag(&caps, "alert"),
            emergency: flag(&caps, "emergency"),
            spi: flag(&caps, "spi"),
            onground: flag(&caps, "onground"),
        })
    }

    /// True when the message carries a usable position for its type.
    ///
    pub fn has_position(&self) -> bool {
        match self.transmission_type {
            2 => self.latitude.is_some() && self.longitude.is_some(),
            3 => self.latitude.is_some() && self.longitude.is_some() && self.altitude.is_some(),
            _ => false,
        }
    }
}

impl FromStr for AdsbEvent {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdsbEvent::from_line(s)
    }
}

/// Blank numeric fields and failed coercions both degrade to `None`.
///
fn number<T: FromStr>(caps: &Captures, name: &str) -> Option<T> {
    let v = &caps[name];
    if v.is_empty() {
        None
    } else {
        v.parse().ok()
    }
}

fn flag(caps: &Captures, name: &str) -> Option<bool> {
    match &caps[name] {
        "" => None,
        "-1" => Some(true),
        _ => Some(false),
    }
}

fn callsign(caps: &Captures) -> Option<String> {
    let v = caps["callsign"].trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_owned())
    }
}

fn datetime(caps: &Captures, date: &str, time: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(&caps[date], "%Y/%m/%d").ok()?;
    let time = NaiveTime::parse_from_str(&caps[time], "%H:%M:%S%.3f").ok()?;
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}
