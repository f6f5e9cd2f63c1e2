use regex::Regex;
use serde_json::Value;

#[inline]
pub fn capture_group_1<'a>(re: &Regex, input: &'a str) -> Option<&'a str> {
    re.captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[inline]
pub fn capture_group_1_owned(re: &Regex, input: &str) -> Option<String> {
    capture_group_1(re, input).map(ToOwned::to_owned)
}

/// First capture group parsed as an unsigned integer, `0` when absent.
#[inline]
pub fn capture_u64_or_zero(re: &Regex, input: &str) -> u64 {
    capture_group_1(re, input)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0)
}

/// Read a JSON number that may also be encoded as a string.
#[inline]
pub fn json_u64(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    }
}
