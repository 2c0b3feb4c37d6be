// src/types.rs

use std::time::Duration;

/// Parse a human duration for `--timeout` and `[runner].grace_period`.
///
/// Accepts one or more `<digits><unit>` parts with units `ms`, `s`, `m` and
/// `h`, e.g. `"250ms"`, `"3s"`, `"1m30s"`. Every part needs a unit.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let text = input.trim();
    if text.is_empty() {
        return Err("empty duration string".to_string());
    }

    let mut total = Duration::ZERO;
    let mut rest = text;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(format!("duration '{text}' has a unit without a number"));
        }
        let (number, tail) = rest.split_at(digits);
        let value: u64 = number
            .parse()
            .map_err(|e| format!("invalid number '{number}' in duration '{text}': {e}"))?;

        let unit_len = tail.find(|c: char| c.is_ascii_digit()).unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        let part = match unit.trim().to_lowercase().as_str() {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value.saturating_mul(60)),
            "h" => Duration::from_secs(value.saturating_mul(3600)),
            "" => return Err(format!("duration '{text}' is missing a unit suffix")),
            other => {
                return Err(format!(
                    "unsupported duration unit '{other}' in '{text}'; expected ms, s, m or h"
                ));
            }
        };

        total = total.saturating_add(part);
        rest = next;
    }

    Ok(total)
}
