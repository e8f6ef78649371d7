//! Incremental indicator accumulators.
//!
//! Each type exposes an `update(...)` method that folds in one bar's worth
//! of input and returns the indicator's new value in O(1), replacing a
//! whole-history recompute per bar. Values requiring a warmup window return
//! `Option` until that window fills; EMA/ATR/RSI/ADX seed on the first
//! sample instead and so return a bare value from the first call.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod bucket;
pub mod donchian;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod volume;

pub use adx::{Adx, AdxValue};
pub use atr::Atr;
pub use bollinger::{Bollinger, BollingerValue};
pub use donchian::{Donchian, DonchianValue};
pub use ema::Ema;
pub use macd::{Macd, MacdValue};
pub use rsi::Rsi;
pub use volume::{VolumeStats, VolumeValue};
