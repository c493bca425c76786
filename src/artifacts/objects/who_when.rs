//! Author, committer and tagger identity with a timestamp
//!
//! ## Format
//!
//! `<name> <<email>> <seconds> <sign><HH><MM>`, e.g.
//! `Jane Doe <jane@example.com> 1700000000 +0130`

use crate::errors::{Error, Result};
use chrono::{DateTime, FixedOffset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OffsetSign {
    #[default]
    Plus,
    Minus,
}

impl OffsetSign {
    fn as_char(&self) -> char {
        match self {
            OffsetSign::Plus => '+',
            OffsetSign::Minus => '-',
        }
    }
}

/// Identity plus timestamp
///
/// The UTC offset keeps its sign apart from its magnitude so that `-0000`
/// survives a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WhoWhen {
    name: String,
    email: String,
    seconds: i64,
    sign: OffsetSign,
    /// Offset magnitude in minutes
    offset: u16,
}

impl WhoWhen {
    pub fn new(name: &str, email: &str, seconds: i64, offset_minutes: i32) -> Result<Self> {
        let sign = if offset_minutes < 0 {
            OffsetSign::Minus
        } else {
            OffsetSign::Plus
        };
        let offset = u16::try_from(offset_minutes.unsigned_abs())
            .ok()
            .filter(|offset| offset / 60 < 100)
            .ok_or_else(|| Error::corrupt(format!("timezone offset out of range: {offset_minutes}")))?;

        Ok(WhoWhen {
            name: name.trim().to_string(),
            email: email.to_string(),
            seconds,
            sign,
            offset,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Seconds since the Unix epoch
    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn sign(&self) -> OffsetSign {
        self.sign
    }

    /// Signed UTC offset in minutes
    pub fn offset_minutes(&self) -> i32 {
        match self.sign {
            OffsetSign::Plus => i32::from(self.offset),
            OffsetSign::Minus => -i32::from(self.offset),
        }
    }

    pub fn datetime(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.offset_minutes() * 60)?;
        DateTime::from_timestamp(self.seconds, 0).map(|utc| utc.with_timezone(&offset))
    }

    pub fn parse(value: &str) -> Result<Self> {
        Self::parse_fields(value).map_err(|e| e.within(format!("identity {value:?}")))
    }

    fn parse_fields(value: &str) -> Result<Self> {
        let email_start = value
            .find('<')
            .ok_or_else(|| Error::corrupt("missing '<'"))?;
        let email_end = value[email_start..]
            .find('>')
            .map(|end| email_start + end)
            .ok_or_else(|| Error::corrupt("missing '>'"))?;

        let name = value[..email_start].trim_matches(' ');
        let email = &value[email_start + 1..email_end];

        let (seconds, timezone) = value[email_end + 1..]
            .trim_start_matches(' ')
            .split_once(' ')
            .ok_or_else(|| Error::corrupt("missing timestamp"))?;
        let seconds = seconds
            .parse::<i64>()
            .map_err(|_| Error::corrupt(format!("invalid timestamp {seconds:?}")))?;
        let (sign, offset) = Self::parse_timezone(timezone)?;

        Ok(WhoWhen {
            name: name.to_string(),
            email: email.to_string(),
            seconds,
            sign,
            offset,
        })
    }

    fn parse_timezone(timezone: &str) -> Result<(OffsetSign, u16)> {
        let bytes = timezone.as_bytes();
        if bytes.len() != 5 || !bytes[1..].iter().all(u8::is_ascii_digit) {
            return Err(Error::corrupt(format!("malformed timezone {timezone:?}")));
        }

        let sign = match bytes[0] {
            b'+' => OffsetSign::Plus,
            b'-' => OffsetSign::Minus,
            _ => return Err(Error::corrupt(format!("malformed timezone {timezone:?}"))),
        };
        let digit = |i: usize| u16::from(bytes[i] - b'0');
        let hours = digit(1) * 10 + digit(2);
        let minutes = digit(3) * 10 + digit(4);

        if minutes > 59 {
            return Err(Error::corrupt(format!(
                "timezone minutes out of range {timezone:?}"
            )));
        }

        Ok((sign, hours * 60 + minutes))
    }
}

impl std::fmt::Display for WhoWhen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} <{}> {} {}{:02}{:02}",
            self.name,
            self.email,
            self.seconds,
            self.sign.as_char(),
            self.offset / 60,
            self.offset % 60
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::proptest;

    #[test]
    fn parses_identity_line() {
        let who = WhoWhen::parse("  Jane Doe  <jane@example.com> 1700000000 +0130").unwrap();

        assert_eq!(who.name(), "Jane Doe");
        assert_eq!(who.email(), "jane@example.com");
        assert_eq!(who.seconds(), 1_700_000_000);
        assert_eq!(who.offset_minutes(), 90);
        assert_eq!(
            who.datetime().unwrap().to_rfc3339(),
            "2023-11-14T23:43:20+01:30"
        );
    }

    #[test]
    fn keeps_negative_zero_offset() {
        let who = WhoWhen::parse("A <a@b> 0 -0000").unwrap();

        assert_eq!(who.sign(), OffsetSign::Minus);
        assert_eq!(who.offset_minutes(), 0);
        assert_eq!(who.to_string(), "A <a@b> 0 -0000");
    }

    #[test]
    fn rejects_malformed_timezones() {
        assert!(WhoWhen::parse("A <a@b> 0 +0160").is_err());
        assert!(WhoWhen::parse("A <a@b> 0 0100").is_err());
        assert!(WhoWhen::parse("A <a@b> 0 +100").is_err());
        assert!(WhoWhen::parse("A <a@b> 0 *0100").is_err());
        assert!(WhoWhen::parse("A a@b 0 +0100").is_err());
        assert!(WhoWhen::parse("A <a@b> now +0100").is_err());
    }

    proptest! {
        #[test]
        fn text_form_round_trips(
            name in "[A-Za-z][A-Za-z ]{0,20}[A-Za-z]",
            email in "[a-z]{1,10}@[a-z]{1,10}\\.com",
            seconds in 0i64..4_000_000_000,
            offset in -(99 * 60 + 59)..(99 * 60 + 59),
        ) {
            let who = WhoWhen::new(&name, &email, seconds, offset).unwrap();
            let parsed = WhoWhen::parse(&who.to_string()).unwrap();
            assert_eq!(parsed.name(), name.as_str());
            assert_eq!(parsed.email(), email.as_str());
            assert_eq!(parsed.seconds(), seconds);
            assert_eq!(parsed.offset_minutes(), offset);
        }
    }
}
