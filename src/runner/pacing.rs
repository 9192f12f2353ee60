use std::time::Duration;

/// Start delay for `user_id` (1-based): `ramp_up * user_id / num_users`.
/// The last user starts at the end of the ramp-up window.
#[must_use]
pub fn ramp_delay(ramp_up: Duration, user_id: u64, num_users: usize) -> Duration {
    let users = u128::from(u64::try_from(num_users).unwrap_or(u64::MAX).max(1));
    let nanos = ramp_up
        .as_nanos()
        .saturating_mul(u128::from(user_id))
        .checked_div(users)
        .unwrap_or(0);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Damping delay applied when the instantaneous rate exceeds `limit`:
/// `(current - limit) / limit` seconds. Best-effort only; bursts can overshoot
/// and quiet periods can undershoot.
#[must_use]
pub fn rate_limit_delay(current_rps: f64, limit: Option<f64>) -> Option<Duration> {
    let limit = limit.filter(|limit| limit.is_finite() && *limit > 0.0)?;
    if !(current_rps > limit) {
        return None;
    }
    Duration::try_from_secs_f64((current_rps - limit) / limit).ok()
}

/// Clips `pause` so it never runs past `deadline_in`.
#[must_use]
pub fn clip_to_deadline(pause: Duration, deadline_in: Duration) -> Duration {
    pause.min(deadline_in)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_delays_span_the_window() -> Result<(), String> {
        let ramp = Duration::from_secs(8);
        let delays: Vec<Duration> = (1..=4).map(|user| ramp_delay(ramp, user, 4)).collect();
        let expected: Vec<Duration> = [2, 4, 6, 8].into_iter().map(Duration::from_secs).collect();
        if delays != expected {
            return Err(format!("Unexpected delays: {:?}", delays));
        }
        if !delays.windows(2).all(|pair| pair.first() < pair.get(1)) {
            return Err("Delays must increase with user id".to_owned());
        }
        if ramp_delay(Duration::ZERO, 3, 4) != Duration::ZERO {
            return Err("No ramp-up means no delay".to_owned());
        }
        Ok(())
    }

    #[test]
    fn rate_limit_only_delays_when_over_limit() -> Result<(), String> {
        let cases = [
            (rate_limit_delay(15.0, Some(10.0)), Some(Duration::from_millis(500))),
            (rate_limit_delay(10.0, Some(10.0)), None),
            (rate_limit_delay(4.0, Some(10.0)), None),
            (rate_limit_delay(50.0, None), None),
            (rate_limit_delay(f64::NAN, Some(10.0)), None),
        ];
        for (actual, expected) in cases {
            if actual != expected {
                return Err(format!("Expected {:?}, got {:?}", expected, actual));
            }
        }
        Ok(())
    }

    #[test]
    fn pauses_never_cross_the_deadline() -> Result<(), String> {
        let clipped = clip_to_deadline(Duration::from_secs(4), Duration::from_millis(300));
        if clipped != Duration::from_millis(300) {
            return Err(format!("Unexpected clip: {:?}", clipped));
        }
        Ok(())
    }
}
