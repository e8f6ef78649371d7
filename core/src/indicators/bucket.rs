//! Fixed categorical bucketing tables for numeric features.
//!
//! Bucketing tables are part of the versioned schema: changing a threshold
//! is a schema-affecting change, not a tuning knob.

/// RSI buckets: overbought/strong/neutral/weak/oversold.
pub fn bucket_rsi(rsi: f64) -> &'static str {
    if rsi >= 70.0 {
        "overbought"
    } else if rsi >= 60.0 {
        "strong"
    } else if rsi >= 40.0 {
        "neutral"
    } else if rsi >= 30.0 {
        "weak"
    } else {
        "oversold"
    }
}

/// ADX buckets: trend strength classification.
pub fn bucket_adx(adx: f64) -> &'static str {
    if adx >= 40.0 {
        "very_strong_trend"
    } else if adx >= 25.0 {
        "strong_trend"
    } else if adx >= 20.0 {
        "developing_trend"
    } else {
        "no_trend"
    }
}

/// Volume z-score buckets.
pub fn bucket_volume_z(z: f64) -> &'static str {
    if z >= 2.0 {
        "extreme_high"
    } else if z >= 1.0 {
        "elevated"
    } else if z > -1.0 {
        "normal"
    } else {
        "low"
    }
}

/// MACD histogram sign bucket.
pub fn bucket_macd_histogram(histogram: f64) -> &'static str {
    if histogram > 0.0 {
        "bullish"
    } else if histogram < 0.0 {
        "bearish"
    } else {
        "flat"
    }
}

/// Bollinger %B-style position bucket: where close sits relative to the bands.
pub fn bucket_bollinger_position(close: f64, upper: f64, lower: f64) -> &'static str {
    if close >= upper {
        "above_upper"
    } else if close <= lower {
        "below_lower"
    } else {
        "inside_bands"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_buckets_cover_full_range() {
        assert_eq!(bucket_rsi(75.0), "overbought");
        assert_eq!(bucket_rsi(65.0), "strong");
        assert_eq!(bucket_rsi(50.0), "neutral");
        assert_eq!(bucket_rsi(35.0), "weak");
        assert_eq!(bucket_rsi(10.0), "oversold");
    }

    #[test]
    fn adx_buckets() {
        assert_eq!(bucket_adx(45.0), "very_strong_trend");
        assert_eq!(bucket_adx(30.0), "strong_trend");
        assert_eq!(bucket_adx(22.0), "developing_trend");
        assert_eq!(bucket_adx(5.0), "no_trend");
    }

    #[test]
    fn volume_z_buckets() {
        assert_eq!(bucket_volume_z(2.5), "extreme_high");
        assert_eq!(bucket_volume_z(1.5), "elevated");
        assert_eq!(bucket_volume_z(0.0), "normal");
        assert_eq!(bucket_volume_z(-2.0), "low");
    }

    #[test]
    fn bollinger_position_buckets() {
        assert_eq!(bucket_bollinger_position(110.0, 105.0, 95.0), "above_upper");
        assert_eq!(bucket_bollinger_position(90.0, 105.0, 95.0), "below_lower");
        assert_eq!(bucket_bollinger_position(100.0, 105.0, 95.0), "inside_bands");
    }
}
