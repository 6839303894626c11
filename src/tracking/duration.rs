use std::sync::LazyLock;

use chrono::Duration;
use regex::Regex;

static COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)(ms|h|m|s)").expect("Duration component pattern should compile")
});

/// Rounds to the closest second, halves away from zero.
pub fn round_to_seconds(duration: Duration) -> Duration {
    let millis = duration.num_milliseconds();
    let seconds = if millis >= 0 {
        (millis + 500) / 1000
    } else {
        (millis - 500) / 1000
    };
    Duration::seconds(seconds)
}

/// Renders a duration like `1h2m3s`, `4m0s` or `5s`. Negative durations render as `0s`.
pub fn render_duration(duration: Duration) -> String {
    let v = round_to_seconds(duration).max(Duration::zero());
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

/// Parses anything [render_duration] produces, along with hand edited variants such as `2h`,
/// `1h30s` or `1.5m`. Fragments that can't be understood count as zero, so the result is always
/// a duration rounded to seconds.
pub fn parse_duration(text: &str) -> Duration {
    let mut total = Duration::zero();
    for capture in COMPONENT.captures_iter(text) {
        let Ok(value) = capture[1].parse::<f64>() else {
            continue;
        };
        let unit_ms = match &capture[2] {
            "h" => 3_600_000.,
            "m" => 60_000.,
            "s" => 1_000.,
            _ => 1.,
        };
        let millis = value * unit_ms;
        if !millis.is_finite() || millis >= i64::MAX as f64 {
            continue;
        }
        let Some(component) = Duration::try_milliseconds(millis as i64) else {
            continue;
        };
        total = total.checked_add(&component).unwrap_or(total);
    }
    round_to_seconds(total)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_render() {
        assert_eq!(render_duration(Duration::zero()), "0s");
        assert_eq!(render_duration(Duration::seconds(45)), "45s");
        assert_eq!(render_duration(Duration::seconds(45 * 60)), "45m0s");
        assert_eq!(render_duration(Duration::seconds(3600)), "1h0m0s");
        assert_eq!(render_duration(Duration::seconds(3 * 3600 + 5 * 60 + 2)), "3h5m2s");
        assert_eq!(render_duration(Duration::seconds(-3)), "0s");
    }

    #[test]
    fn test_render_rounds_sub_seconds() {
        assert_eq!(render_duration(Duration::milliseconds(1499)), "1s");
        assert_eq!(render_duration(Duration::milliseconds(1500)), "2s");
        assert_eq!(render_duration(Duration::milliseconds(59_600)), "1m0s");
    }

    #[test]
    fn test_parse_rendered() {
        for seconds in [0, 1, 59, 60, 61, 3599, 3600, 3661, 90_000, 1_000_000] {
            let duration = Duration::seconds(seconds);
            assert_eq!(parse_duration(&render_duration(duration)), duration);
        }
    }

    #[test]
    fn test_parse_partial_forms() {
        assert_eq!(parse_duration("2h"), Duration::hours(2));
        assert_eq!(parse_duration("1h30s"), Duration::seconds(3630));
        assert_eq!(parse_duration("7m"), Duration::minutes(7));
        assert_eq!(parse_duration("1.5m"), Duration::seconds(90));
        assert_eq!(parse_duration("300ms"), Duration::zero());
        assert_eq!(parse_duration("1m1500ms"), Duration::seconds(62));
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(parse_duration(""), Duration::zero());
        assert_eq!(parse_duration("soon"), Duration::zero());
        assert_eq!(parse_duration("xh5m"), Duration::minutes(5));
    }
}
