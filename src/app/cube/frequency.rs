//! Time axis contiguity checks against a declared frequency

use super::Coord;
use crate::error::{DrsError, Result};

const STEP_TOLERANCE: f64 = 1e-3;

fn fixed_step_days(frequency: &str) -> Option<f64> {
    match frequency {
        "day" => Some(1.0),
        "6hr" => Some(0.25),
        "3hr" => Some(0.125),
        "1hr" => Some(1.0 / 24.0),
        _ => None,
    }
}

/// Check that consecutive time points advance by exactly one step of
/// `frequency`
///
/// Returns a description of the first gap found, or `None` when the axis
/// is contiguous. `fx` and `subhr` axes always pass.
pub fn check_frequency(time: &Coord, frequency: &str) -> Result<Option<String>> {
    if matches!(frequency, "fx" | "subhr") || time.len() < 2 {
        return Ok(None);
    }

    if let Some(step) = fixed_step_days(frequency) {
        let days_per_unit = time.time_unit()?.days_per_step();
        let values = time.values();
        for pair in values.windows(2) {
            let delta = (pair[1] - pair[0]) * days_per_unit;
            if (delta - step).abs() > STEP_TOLERANCE {
                return Ok(Some(format!(
                    "step of {:.4} days between {} and {} where {} expects {:.4}",
                    delta, pair[0], pair[1], frequency, step
                )));
            }
        }
        return Ok(None);
    }

    let months_per_step: i64 = match frequency {
        "mon" => 1,
        "yr" => 12,
        "dec" => 120,
        other => {
            return Err(DrsError::cube(format!(
                "Unknown frequency '{}' for time coordinate",
                other
            )));
        }
    };
    let dates = time.dates()?;
    for pair in dates.windows(2) {
        let first = pair[0].year as i64 * 12 + pair[0].month as i64;
        let second = pair[1].year as i64 * 12 + pair[1].month as i64;
        if second - first != months_per_step {
            return Ok(Some(format!(
                "{} follows {} at frequency {}",
                pair[1], pair[0], frequency
            )));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monthly_axis_is_contiguous() {
        let time = Coord::time("days since 2000-01-01", "standard", vec![15.5, 45.0, 74.5, 105.0]);
        assert_eq!(check_frequency(&time, "mon").unwrap(), None);
    }

    #[test]
    fn test_monthly_axis_with_missing_month() {
        let time = Coord::time("days since 2000-01-01", "standard", vec![15.5, 45.0, 105.0]);
        let gap = check_frequency(&time, "mon").unwrap();
        assert!(gap.is_some());
    }

    #[test]
    fn test_daily_axis_in_hours() {
        let time = Coord::time("hours since 2000-01-01", "noleap", vec![12.0, 36.0, 60.0]);
        assert_eq!(check_frequency(&time, "day").unwrap(), None);
        assert!(check_frequency(&time, "6hr").unwrap().is_some());
    }

    #[test]
    fn test_yearly_and_fx() {
        let time = Coord::time("days since 2000-01-01", "360_day", vec![180.0, 540.0, 1260.0]);
        assert!(check_frequency(&time, "yr").unwrap().is_some());
        assert_eq!(check_frequency(&time, "fx").unwrap(), None);
        assert!(check_frequency(&time, "weekly").is_err());
    }
}
