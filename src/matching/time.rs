//! Generalized-time normalization and the time-based matching rules.
//!
//! Stored values use the LDAP generalized time syntax
//! (`YYYYMMDDHH[MM[SS]][.fff][Z|±hhmm]`). Normalization converts them to
//! epoch milliseconds rendered through the order-preserving integer codec,
//! so equality, ordering, and relative-time ranges all share one index.
//!
//! Two assertion grammars layer on top: relative offsets from "now"
//! (`-5d`, `1w2d`, `90`) answered with half-open range queries, and
//! partial date/time assertions (`30m12h3D`) that compare only the
//! calendar components present in the assertion.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Timelike, Utc};

use crate::error::{DecodeError, DecodeResult};
use crate::index::{Indexer, IndexingOptions};
use crate::matching::integer::{decode_i64, encode_i64};
use crate::matching::rule::{
    Assertion, ConditionResult, MatchingRuleImpl, NormalizedKeyIndexer, OrderingAssertion,
    OrderingOp, hex_string, utf8,
};
use crate::schema::Schema;

const MILLIS_PER_SECOND: i64 = 1_000;
const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;
const MILLIS_PER_WEEK: i64 = 7 * MILLIS_PER_DAY;

/// Index shared by the generalized time equality, ordering, and relative
/// time rules.
const TIME_INDEX_ID: &str = "generalizedTimeMatch";

/// Clock used when an assertion is anchored to "now"; injectable so tests
/// are deterministic.
pub type TimeSource = fn() -> DateTime<Utc>;

/// Parse a generalized time string to epoch milliseconds.
pub fn parse_generalized_time(text: &str) -> DecodeResult<i64> {
    let fail = |reason: &str| DecodeError::invalid_time(text, reason);

    let bytes = text.as_bytes();
    let digits = |from: usize, len: usize| -> DecodeResult<u32> {
        let slice = bytes
            .get(from..from + len)
            .ok_or_else(|| fail("value is truncated"))?;
        let mut out = 0u32;
        for &b in slice {
            if !b.is_ascii_digit() {
                return Err(fail("expected a digit"));
            }
            out = out * 10 + (b - b'0') as u32;
        }
        Ok(out)
    };

    if bytes.len() < 11 {
        return Err(fail("shorter than the minimum YYYYMMDDHH with time zone"));
    }
    let year = digits(0, 4)? as i32;
    let month = digits(4, 2)?;
    let day = digits(6, 2)?;
    let hour = digits(8, 2)?;
    let mut pos = 10;

    let mut minute = 0;
    let mut second = 0;
    let mut minute_present = false;
    let mut second_present = false;
    if bytes.get(pos).is_some_and(u8::is_ascii_digit) {
        minute = digits(pos, 2)?;
        minute_present = true;
        pos += 2;
        if bytes.get(pos).is_some_and(u8::is_ascii_digit) {
            second = digits(pos, 2)?;
            second_present = true;
            pos += 2;
        }
    }

    // A fraction applies to the smallest component present.
    let mut fraction_millis = 0i64;
    if matches!(bytes.get(pos), Some(b'.' | b',')) {
        pos += 1;
        let start = pos;
        let mut fraction = 0f64;
        let mut scale = 0.1f64;
        while bytes.get(pos).is_some_and(u8::is_ascii_digit) {
            fraction += (bytes[pos] - b'0') as f64 * scale;
            scale /= 10.0;
            pos += 1;
        }
        if pos == start {
            return Err(fail("fraction has no digits"));
        }
        let unit = if second_present {
            MILLIS_PER_SECOND
        } else if minute_present {
            MILLIS_PER_MINUTE
        } else {
            MILLIS_PER_HOUR
        };
        fraction_millis = (fraction * unit as f64).round() as i64;
    }

    let offset_seconds = match bytes.get(pos) {
        Some(b'Z') if pos + 1 == bytes.len() => 0,
        Some(sign @ (b'+' | b'-')) => {
            pos += 1;
            let oh = digits(pos, 2)?;
            pos += 2;
            let om = if pos < bytes.len() {
                let m = digits(pos, 2)?;
                pos += 2;
                m
            } else {
                0
            };
            if pos != bytes.len() {
                return Err(fail("trailing characters after time zone offset"));
            }
            if oh > 23 || om > 59 {
                return Err(fail("time zone offset out of range"));
            }
            let total = (oh * 3600 + om * 60) as i32;
            if *sign == b'-' { -total } else { total }
        }
        _ => return Err(fail("missing time zone")),
    };

    if !(1..=12).contains(&month) {
        return Err(fail("month out of range"));
    }
    if hour > 23 {
        return Err(fail("hour out of range"));
    }
    if minute > 59 {
        return Err(fail("minute out of range"));
    }
    if second > 60 {
        return Err(fail("second out of range"));
    }
    // Fold a leap second onto the next minute for arithmetic.
    let (second, leap_millis) = if second == 60 {
        (59, MILLIS_PER_SECOND)
    } else {
        (second, 0)
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| fail("day is not valid for the month"))?;
    let time = date
        .and_hms_opt(hour, minute, second)
        .ok_or_else(|| fail("time of day out of range"))?;
    let offset = FixedOffset::east_opt(offset_seconds).ok_or_else(|| fail("bad offset"))?;
    let datetime = offset
        .from_local_datetime(&time)
        .single()
        .ok_or_else(|| fail("ambiguous local time"))?;

    Ok(datetime.timestamp_millis() + fraction_millis + leap_millis)
}

/// Normalize a generalized time value to the sortable epoch encoding.
pub(crate) fn normalize_generalized_time(value: &[u8]) -> DecodeResult<Vec<u8>> {
    Ok(encode_i64(parse_generalized_time(utf8(value)?.trim())?))
}

/// `generalizedTimeMatch` (2.5.13.27).
pub fn generalized_time_equality_rule() -> crate::matching::rule::DefaultEqualityRule {
    crate::matching::rule::DefaultEqualityRule::new(TIME_INDEX_ID, normalize_generalized_time)
}

/// `generalizedTimeOrderingMatch` (2.5.13.28). Shares the equality index;
/// the epoch encoding already sorts chronologically.
pub fn generalized_time_ordering_rule() -> crate::matching::rule::DefaultOrderingRule {
    crate::matching::rule::DefaultOrderingRule::sharing_equality_index(
        TIME_INDEX_ID,
        normalize_generalized_time,
    )
}

/// Parse a relative time assertion to a signed millisecond offset.
///
/// Grammar: optional sign, then `{number}{unit}` pairs with units
/// `s m h d w`; a trailing bare number counts as seconds. A repeated unit
/// overrides its previous occurrence.
fn parse_relative_offset(text: &str) -> DecodeResult<i64> {
    let fail = |reason: &str| DecodeError::invalid_relative_time(text, reason);

    let trimmed = text.trim();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    if rest.is_empty() {
        return Err(fail("no duration given"));
    }

    // One slot per unit; a later occurrence of the same unit wins.
    let mut seconds = 0i64;
    let mut minutes = 0i64;
    let mut hours = 0i64;
    let mut days = 0i64;
    let mut weeks = 0i64;

    let mut number: Option<i64> = None;
    for c in rest.chars() {
        match c {
            '0'..='9' => {
                let digit = (c as u8 - b'0') as i64;
                let current = number.unwrap_or(0);
                number = Some(
                    current
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(digit))
                        .ok_or_else(|| fail("duration too large"))?,
                );
            }
            's' | 'm' | 'h' | 'd' | 'w' => {
                let value = number.take().ok_or_else(|| fail("unit with no number"))?;
                match c {
                    's' => seconds = value,
                    'm' => minutes = value,
                    'h' => hours = value,
                    'd' => days = value,
                    _ => weeks = value,
                }
            }
            _ => return Err(fail("unrecognized character")),
        }
    }
    if let Some(value) = number {
        // Trailing bare number: seconds.
        seconds = value;
    }

    let millis = weeks
        .checked_mul(MILLIS_PER_WEEK)
        .and_then(|t| t.checked_add(days.checked_mul(MILLIS_PER_DAY)?))
        .and_then(|t| t.checked_add(hours.checked_mul(MILLIS_PER_HOUR)?))
        .and_then(|t| t.checked_add(minutes.checked_mul(MILLIS_PER_MINUTE)?))
        .and_then(|t| t.checked_add(seconds.checked_mul(MILLIS_PER_SECOND)?))
        .ok_or_else(|| fail("duration too large"))?;
    Ok(if negative { -millis } else { millis })
}

/// `relativeTimeGTOrderingMatch` / `relativeTimeLTOrderingMatch`
/// (1.3.6.1.4.1.26027.1.4.5 / .6).
///
/// The assertion offset is applied to "now" at assertion-build time; the
/// resulting instant becomes a half-open range query on the shared time
/// index.
#[derive(Debug)]
pub struct RelativeTimeOrderingRule {
    op: OrderingOp,
    now: TimeSource,
}

impl RelativeTimeOrderingRule {
    /// Matches values after now + offset.
    pub fn greater_than() -> Self {
        Self {
            op: OrderingOp::GreaterThan,
            now: Utc::now,
        }
    }

    /// Matches values before now + offset.
    pub fn less_than() -> Self {
        Self {
            op: OrderingOp::LessThan,
            now: Utc::now,
        }
    }

    /// Replace the clock, for deterministic tests.
    pub fn with_time_source(mut self, now: TimeSource) -> Self {
        self.now = now;
        self
    }
}

impl MatchingRuleImpl for RelativeTimeOrderingRule {
    fn normalize_attribute_value(&self, _schema: &Schema, value: &[u8]) -> DecodeResult<Vec<u8>> {
        normalize_generalized_time(value)
    }

    fn get_assertion(&self, _schema: &Schema, value: &[u8]) -> DecodeResult<Assertion> {
        let offset = parse_relative_offset(utf8(value)?)?;
        let target = (self.now)().timestamp_millis() + offset;
        Ok(Assertion::Ordering(OrderingAssertion::new(
            TIME_INDEX_ID,
            encode_i64(target),
            self.op,
        )))
    }

    fn create_indexers(&self, _options: &IndexingOptions) -> Vec<Box<dyn Indexer>> {
        // Shares the generalized time index; storage engines deduplicate
        // indexers by id.
        vec![Box::new(NormalizedKeyIndexer::new(
            TIME_INDEX_ID.to_string(),
            normalize_generalized_time,
        ))]
    }
}

const PARTIAL_TIME_INDEX_ID: &str = "partialDateAndTimeMatchingRule";

/// The calendar components of a partial date/time assertion. Unset
/// components are sentineled: `-1` for second/minute/hour/month, `0` for
/// day and year. Month is 0-based once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialDateTimeAssertion {
    second: i8,
    minute: i8,
    hour: i8,
    day: u8,
    month: i8,
    year: u32,
}

impl PartialDateTimeAssertion {
    /// Parse the `{number}{letter}` assertion grammar over
    /// `s m h D M Y`, rejecting duplicates and out-of-range components.
    pub fn parse(text: &str) -> DecodeResult<Self> {
        let fail = |reason: &str| DecodeError::invalid_partial_date_time(text, reason);

        let mut assertion = Self {
            second: -1,
            minute: -1,
            hour: -1,
            day: 0,
            month: -1,
            year: 0,
        };
        let mut seen = [false; 6];
        let mut number: Option<u64> = None;
        let mut any = false;

        for c in text.trim().chars() {
            match c {
                '0'..='9' => {
                    let digit = (c as u8 - b'0') as u64;
                    let current = number.unwrap_or(0);
                    number = Some(
                        current
                            .checked_mul(10)
                            .and_then(|v| v.checked_add(digit))
                            .ok_or_else(|| fail("component value too large"))?,
                    );
                }
                's' | 'm' | 'h' | 'D' | 'M' | 'Y' => {
                    let value = number.take().ok_or_else(|| fail("letter with no number"))?;
                    let slot = match c {
                        's' => 0,
                        'm' => 1,
                        'h' => 2,
                        'D' => 3,
                        'M' => 4,
                        _ => 5,
                    };
                    if seen[slot] {
                        return Err(fail("duplicate component"));
                    }
                    seen[slot] = true;
                    any = true;
                    match c {
                        // 60 tolerated for leap seconds.
                        's' if value <= 60 => assertion.second = value as i8,
                        's' => return Err(fail("second out of range")),
                        'm' if value <= 59 => assertion.minute = value as i8,
                        'm' => return Err(fail("minute out of range")),
                        'h' if value <= 23 => assertion.hour = value as i8,
                        'h' => return Err(fail("hour out of range")),
                        'D' if (1..=31).contains(&value) => assertion.day = value as u8,
                        'D' => return Err(fail("day out of range")),
                        'M' if (1..=12).contains(&value) => assertion.month = value as i8 - 1,
                        'M' => return Err(fail("month out of range")),
                        'Y' if (1..=9999).contains(&value) => assertion.year = value as u32,
                        _ => return Err(fail("year out of range")),
                    }
                }
                _ => return Err(fail("unrecognized character")),
            }
        }
        if number.is_some() {
            return Err(fail("trailing number with no component letter"));
        }
        if !any {
            return Err(fail("no components given"));
        }

        if assertion.day != 0 && assertion.month >= 0 {
            let month = assertion.month as u32 + 1;
            let max = days_in_month(month, assertion.year);
            if assertion.day as u32 > max {
                return Err(fail("day is not valid for the month"));
            }
        }
        Ok(assertion)
    }

    /// Encode as the fixed record: five component bytes followed by the
    /// year as a compact unsigned integer.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![
            self.second as u8,
            self.minute as u8,
            self.hour as u8,
            self.day,
            self.month as u8,
        ];
        let mut year = self.year;
        while year >= 0x80 {
            out.push((year & 0x7F) as u8 | 0x80);
            year >>= 7;
        }
        out.push(year as u8);
        out
    }

    /// Decode an [`encode`](Self::encode)d record.
    pub fn decode(bytes: &[u8]) -> DecodeResult<Self> {
        let fail = || DecodeError::invalid_partial_date_time(hex_string(bytes), "truncated record");
        if bytes.len() < 6 {
            return Err(fail());
        }
        let mut year = 0u32;
        let mut shift = 0;
        let mut terminated = false;
        for (n, &byte) in bytes[5..].iter().enumerate() {
            year |= ((byte & 0x7F) as u32) << shift;
            if byte & 0x80 == 0 {
                if n + 6 != bytes.len() {
                    return Err(fail());
                }
                terminated = true;
                break;
            }
            shift += 7;
        }
        if !terminated {
            return Err(fail());
        }
        Ok(Self {
            second: bytes[0] as i8,
            minute: bytes[1] as i8,
            hour: bytes[2] as i8,
            day: bytes[3],
            month: bytes[4] as i8,
            year,
        })
    }

    /// Compare present components against the stored timestamp; absent
    /// components always match. The candidate is the normalized epoch
    /// encoding of the stored generalized time value.
    pub(crate) fn matches(&self, normalized_value: &[u8]) -> ConditionResult {
        let Ok(millis) = decode_i64(normalized_value) else {
            return ConditionResult::Undefined;
        };
        let Some(datetime) = Utc.timestamp_millis_opt(millis).single() else {
            return ConditionResult::Undefined;
        };
        let fields = CalendarFields::of(&datetime);

        let ok = (self.second < 0 || fields.second == self.second as u32)
            && (self.minute < 0 || fields.minute == self.minute as u32)
            && (self.hour < 0 || fields.hour == self.hour as u32)
            && (self.day == 0 || fields.day == self.day as u32)
            && (self.month < 0 || fields.month0 == self.month as u32)
            && (self.year == 0 || fields.year == self.year);
        ConditionResult::from_bool(ok)
    }

    /// Conjunction of one exact probe per present component.
    pub(crate) fn create_index_query<F: crate::index::IndexQueryFactory>(
        &self,
        factory: &F,
    ) -> F::Query {
        let mut subqueries = Vec::new();
        let mut probe = |tag: u8, value: u32| {
            subqueries
                .push(factory.create_exact_match_query(PARTIAL_TIME_INDEX_ID, &component_key(tag, value)));
        };
        if self.second >= 0 {
            probe(b's', self.second as u32);
        }
        if self.minute >= 0 {
            probe(b'm', self.minute as u32);
        }
        if self.hour >= 0 {
            probe(b'h', self.hour as u32);
        }
        if self.day != 0 {
            probe(b'D', self.day as u32);
        }
        if self.month >= 0 {
            probe(b'M', self.month as u32);
        }
        if self.year != 0 {
            probe(b'Y', self.year);
        }
        match subqueries.len() {
            0 => factory.create_match_all_query(),
            1 => subqueries.pop().unwrap(),
            _ => factory.create_intersection_query(subqueries),
        }
    }
}

struct CalendarFields {
    second: u32,
    minute: u32,
    hour: u32,
    day: u32,
    month0: u32,
    year: u32,
}

impl CalendarFields {
    fn of(datetime: &DateTime<Utc>) -> Self {
        // A folded leap second reads as second 60.
        let leap = u32::from(datetime.nanosecond() >= 1_000_000_000);
        Self {
            second: datetime.second() + leap,
            minute: datetime.minute(),
            hour: datetime.hour(),
            day: datetime.day(),
            month0: datetime.month0(),
            year: datetime.year().max(0) as u32,
        }
    }
}

fn component_key(tag: u8, value: u32) -> Vec<u8> {
    let mut key = vec![tag];
    key.extend_from_slice(&value.to_be_bytes());
    key
}

fn days_in_month(month: u32, year: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        // Without a year, allow the leap day.
        _ if year == 0 => 29,
        _ => {
            let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
            if leap { 29 } else { 28 }
        }
    }
}

/// `partialDateAndTimeMatchingRule` (1.3.6.1.4.1.26027.1.4.7).
#[derive(Debug)]
pub struct PartialDateTimeRule;

impl MatchingRuleImpl for PartialDateTimeRule {
    fn normalize_attribute_value(&self, _schema: &Schema, value: &[u8]) -> DecodeResult<Vec<u8>> {
        normalize_generalized_time(value)
    }

    fn get_assertion(&self, _schema: &Schema, value: &[u8]) -> DecodeResult<Assertion> {
        Ok(Assertion::PartialDateTime(PartialDateTimeAssertion::parse(
            utf8(value)?,
        )?))
    }

    fn create_indexers(&self, _options: &IndexingOptions) -> Vec<Box<dyn Indexer>> {
        vec![Box::new(PartialDateTimeIndexer)]
    }
}

/// One tagged key per present, non-zero calendar component of the stored
/// value.
struct PartialDateTimeIndexer;

impl Indexer for PartialDateTimeIndexer {
    fn index_id(&self) -> &str {
        PARTIAL_TIME_INDEX_ID
    }

    fn create_keys(
        &self,
        _schema: &Schema,
        value: &[u8],
        keys: &mut Vec<Vec<u8>>,
    ) -> DecodeResult<()> {
        let text = utf8(value)?;
        let millis = parse_generalized_time(text.trim())?;
        let datetime = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| DecodeError::invalid_time(text, "out of range"))?;
        let fields = CalendarFields::of(&datetime);

        for (tag, component) in [
            (b's', fields.second),
            (b'm', fields.minute),
            (b'h', fields.hour),
            (b'D', fields.day),
            (b'M', fields.month0),
            (b'Y', fields.year),
        ] {
            if component != 0 {
                keys.push(component_key(tag, component));
            }
        }
        Ok(())
    }

    fn key_to_human_readable_string(&self, key: &[u8]) -> String {
        match key.split_first() {
            Some((tag, rest)) if rest.len() == 4 => {
                let value = u32::from_be_bytes(rest.try_into().unwrap());
                format!("{}={}", *tag as char, value)
            }
            _ => hex_string(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::testing::{TestQuery, TestQueryFactory};
    use crate::schema::Schema;

    fn schema() -> Schema {
        crate::schema::core::core_schema()
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2010, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_generalized_time_forms() {
        let full = parse_generalized_time("20100615120000Z").unwrap();
        assert_eq!(full, fixed_now().timestamp_millis());

        // Minute precision, second precision omitted.
        assert_eq!(
            parse_generalized_time("201006151200Z").unwrap(),
            full
        );
        // Hour precision.
        assert_eq!(parse_generalized_time("2010061512Z").unwrap(), full);
        // Offset form.
        assert_eq!(
            parse_generalized_time("20100615140000+0200").unwrap(),
            full
        );
        // Fractional seconds.
        assert_eq!(
            parse_generalized_time("20100615120000.250Z").unwrap(),
            full + 250
        );
    }

    #[test]
    fn test_parse_generalized_time_rejects_malformed() {
        for bad in [
            "",
            "2010",
            "20100615120000",      // no time zone
            "20101315120000Z",     // month 13
            "20100230120000Z",     // Feb 30
            "20100615127000Z",      // minute 70
            "20100615120000X",
        ] {
            assert!(
                parse_generalized_time(bad).is_err(),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_time_ordering_shares_equality_encoding() {
        let earlier = normalize_generalized_time(b"20100101000000Z").unwrap();
        let later = normalize_generalized_time(b"20100102000000Z").unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn test_parse_relative_offset() {
        assert_eq!(parse_relative_offset("90").unwrap(), 90 * MILLIS_PER_SECOND);
        assert_eq!(parse_relative_offset("5d").unwrap(), 5 * MILLIS_PER_DAY);
        assert_eq!(
            parse_relative_offset("-1w2d").unwrap(),
            -(MILLIS_PER_WEEK + 2 * MILLIS_PER_DAY)
        );
        assert_eq!(
            parse_relative_offset("1h30m").unwrap(),
            MILLIS_PER_HOUR + 30 * MILLIS_PER_MINUTE
        );
        // A repeated unit overrides, not accumulates.
        assert_eq!(parse_relative_offset("1d2d").unwrap(), 2 * MILLIS_PER_DAY);

        assert!(parse_relative_offset("").is_err());
        assert!(parse_relative_offset("d").is_err());
        assert!(parse_relative_offset("5x").is_err());
    }

    #[test]
    fn test_relative_time_matching() {
        let schema = schema();
        let rule = RelativeTimeOrderingRule::greater_than().with_time_source(fixed_now);

        // Values more recent than now - 1 day.
        let assertion = rule.get_assertion(&schema, b"-1d").unwrap();
        let yesterday_evening = rule
            .normalize_attribute_value(&schema, b"20100615000000Z")
            .unwrap();
        let last_week = rule
            .normalize_attribute_value(&schema, b"20100608000000Z")
            .unwrap();
        assert_eq!(assertion.matches(&yesterday_evening), ConditionResult::True);
        assert_eq!(assertion.matches(&last_week), ConditionResult::False);

        let factory = TestQueryFactory::new(6);
        let expected_bound = encode_i64(fixed_now().timestamp_millis() - MILLIS_PER_DAY);
        assert_eq!(
            assertion.create_index_query(&factory),
            TestQuery::Range {
                index_id: TIME_INDEX_ID.to_string(),
                lower: expected_bound,
                upper: Vec::new(),
                lower_inclusive: false,
                upper_inclusive: false,
            }
        );
    }

    #[test]
    fn test_relative_time_less_than() {
        let schema = schema();
        let rule = RelativeTimeOrderingRule::less_than().with_time_source(fixed_now);
        let assertion = rule.get_assertion(&schema, b"1h").unwrap();
        let soon = rule
            .normalize_attribute_value(&schema, b"20100615123000Z")
            .unwrap();
        let tomorrow = rule
            .normalize_attribute_value(&schema, b"20100616120000Z")
            .unwrap();
        assert_eq!(assertion.matches(&soon), ConditionResult::True);
        assert_eq!(assertion.matches(&tomorrow), ConditionResult::False);
    }

    #[test]
    fn test_partial_assertion_parse() {
        let assertion = PartialDateTimeAssertion::parse("30m12h3D").unwrap();
        assert_eq!(
            assertion,
            PartialDateTimeAssertion {
                second: -1,
                minute: 30,
                hour: 12,
                day: 3,
                month: -1,
                year: 0,
            }
        );

        assert!(PartialDateTimeAssertion::parse("61s").is_err());
        assert!(PartialDateTimeAssertion::parse("60s").is_ok());
        assert!(PartialDateTimeAssertion::parse("24h").is_err());
        assert!(PartialDateTimeAssertion::parse("13M").is_err());
        assert!(PartialDateTimeAssertion::parse("5m5m").is_err());
        assert!(PartialDateTimeAssertion::parse("").is_err());
        assert!(PartialDateTimeAssertion::parse("12").is_err());
        // Feb 30 is impossible regardless of year.
        assert!(PartialDateTimeAssertion::parse("30D2M").is_err());
        // Feb 29 needs a leap year only when a year is present.
        assert!(PartialDateTimeAssertion::parse("29D2M").is_ok());
        assert!(PartialDateTimeAssertion::parse("29D2M2011Y").is_err());
        assert!(PartialDateTimeAssertion::parse("29D2M2012Y").is_ok());
    }

    #[test]
    fn test_partial_record_round_trip() {
        for text in ["30m12h3D", "45s", "2012Y", "31D12M2020Y"] {
            let assertion = PartialDateTimeAssertion::parse(text).unwrap();
            let decoded = PartialDateTimeAssertion::decode(&assertion.encode()).unwrap();
            assert_eq!(decoded, assertion);
        }
    }

    #[test]
    fn test_partial_matching() {
        let schema = schema();
        let rule = PartialDateTimeRule;
        let stored = rule
            .normalize_attribute_value(&schema, b"20100615123045Z")
            .unwrap();

        let assertion = rule.get_assertion(&schema, b"30m12h").unwrap();
        assert_eq!(assertion.matches(&stored), ConditionResult::True);

        let wrong_hour = rule.get_assertion(&schema, b"30m13h").unwrap();
        assert_eq!(wrong_hour.matches(&stored), ConditionResult::False);

        // Absent components are wildcards: year-only matches.
        let year_only = rule.get_assertion(&schema, b"2010Y").unwrap();
        assert_eq!(year_only.matches(&stored), ConditionResult::True);
    }

    #[test]
    fn test_partial_index_keys_and_query_agree() {
        let schema = schema();
        let rule = PartialDateTimeRule;
        let indexers = rule.create_indexers(&crate::index::IndexingOptions::default());

        let mut keys = Vec::new();
        indexers[0]
            .create_keys(&schema, b"20100615123045Z", &mut keys)
            .unwrap();
        // June is month0 5; all components non-zero here.
        assert!(keys.contains(&component_key(b'Y', 2010)));
        assert!(keys.contains(&component_key(b'M', 5)));
        assert!(keys.contains(&component_key(b'D', 15)));
        assert!(keys.contains(&component_key(b'h', 12)));
        assert!(keys.contains(&component_key(b'm', 30)));
        assert!(keys.contains(&component_key(b's', 45)));

        let factory = TestQueryFactory::new(6);
        let assertion = rule.get_assertion(&schema, b"15D6M2010Y").unwrap();
        let query = assertion.create_index_query(&factory);
        let TestQuery::Intersection(subqueries) = query else {
            panic!("expected an intersection");
        };
        assert_eq!(subqueries.len(), 3);
        for subquery in &subqueries {
            let TestQuery::Exact { key, .. } = subquery else {
                panic!("expected exact probes");
            };
            assert!(keys.contains(key), "query key missing from index keys");
        }
    }

    #[test]
    fn test_indexer_key_rendering() {
        let indexer = PartialDateTimeIndexer;
        assert_eq!(
            indexer.key_to_human_readable_string(&component_key(b'Y', 2010)),
            "Y=2010"
        );
    }
}
