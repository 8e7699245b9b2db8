use self::error::{FluteError, Result};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Handle errors
pub mod error;
/// 128-bit transport identifiers
pub mod uint128;

const NTP_UNIX_DELTA: u64 = 2_208_988_800;

/// Convert a `SystemTime` into a 64-bit NTP timestamp.
///
/// High 32 bits are seconds since 1900-01-01 UTC, low 32 bits the fraction
/// of a second in units of 2^-32.
pub fn system_time_to_ntp(time: SystemTime) -> Result<u64> {
    let duration = time
        .duration_since(UNIX_EPOCH)
        .map_err(|_| FluteError::invalid("Fail to get UNIX time"))?;
    let seconds_ntp = (duration.as_secs() + NTP_UNIX_DELTA) & 0xFFFF_FFFF;
    let fraction = ((duration.subsec_nanos() as u64) << 32) / 1_000_000_000;
    Ok((seconds_ntp << 32) | fraction)
}

/// Convert a 64-bit NTP timestamp back into a `SystemTime`.
pub fn ntp_to_system_time(ntp: u64) -> Result<SystemTime> {
    let seconds = ntp >> 32;
    let fraction = ntp & 0xFFFF_FFFF;
    let unix_seconds = seconds
        .checked_sub(NTP_UNIX_DELTA)
        .ok_or_else(|| FluteError::malformed("NTP time is before the UNIX epoch"))?;
    let nanos = (fraction * 1_000_000_000) >> 32;
    Ok(UNIX_EPOCH + Duration::new(unix_seconds, nanos as u32))
}
