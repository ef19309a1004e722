//! Perceptual volume curve and dB helpers
//!
//! Maps a linear slider position onto an exponential gain curve so that most
//! of the slider's travel stays audible. The curve follows the usual
//! `a * e^(b * x)` loudness approximation, anchored at 0 dB for full scale and
//! at `-range_db` for an empty slider.

use crate::constants::volume::LINEAR_KNEE;

/// Convert a mixer percentage to a dB value for the given dynamic range
///
/// Below 10% the exponential tail is replaced with a linear ramp that meets
/// the curve at the knee, since the exponential is almost silent there. The
/// ramp falls through the bottom of the range before reaching zero, so the
/// result is clamped to `-range_db`.
pub fn percent_to_db(percent: u8, range_db: f64) -> f64 {
    if percent >= 100 {
        // exp/ln rounding can land a hair away from unity gain
        return 0.0;
    }

    let x = f64::from(percent) / 100.0;
    let y_max = db_to_gain(range_db);
    let a = 1.0 / y_max;
    let b = y_max.ln();

    let gain = if x < LINEAR_KNEE {
        x / LINEAR_KNEE * a * (LINEAR_KNEE * b).exp()
    } else {
        a * (b * x).exp()
    };
    if gain == 0.0 {
        // Silence is the bottom of the range, whatever the range
        return -range_db;
    }

    gain_to_db(gain).max(-range_db)
}

/// Whether a computed volume has reached the bottom of the range
pub fn is_muted(db: f64, range_db: f64) -> bool {
    db.abs() >= range_db
}

/// Convert linear gain ratio to decibels
pub fn gain_to_db(gain: f64) -> f64 {
    20.0 * gain.log10()
}

/// Convert decibels to linear gain ratio
pub fn db_to_gain(db: f64) -> f64 {
    10.0f64.powf(db / 20.0)
}
