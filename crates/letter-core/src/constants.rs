/// Quota and letter generation constants

/// Window after a quota error during which new requests are throttled
pub const THROTTLE_WINDOW_SECS: f64 = 3600.0;

/// Preventive delay applied right after a quota error, decaying linearly over the window
pub const THROTTLE_MAX_DELAY_SECS: f64 = 60.0;

/// Lower bound for the preventive delay while inside the window
pub const THROTTLE_MIN_DELAY_SECS: f64 = 1.0;

/// Number of most recent days kept in `daily_usage`
pub const USAGE_HISTORY_DAYS: usize = 30;

/// Date format of `daily_usage` keys; lexicographic order is chronological
pub const USAGE_DAY_FORMAT: &str = "%Y-%m-%d";

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_SECS: f64 = 2.0;

/// Target letter size in characters, spaces included
pub const DEFAULT_TARGET_LENGTH: usize = 1490;
pub const DEFAULT_LENGTH_TOLERANCE: usize = 30;

pub const FORMAL_TEMPERATURE: f32 = 0.7;
pub const CREATIVE_TEMPERATURE: f32 = 0.9;
pub const FUSION_TEMPERATURE: f32 = 0.7;
pub const CORRECTION_TEMPERATURE: f32 = 0.4;
pub const ENRICHMENT_TEMPERATURE: f32 = 0.3;

/// Character used to pad letters that stay too short after correction
pub const PADDING_CHAR: char = '.';

/// Quota errors younger than this trigger a warning before a new run
pub const RECENT_QUOTA_WARNING_HOURS: i64 = 24;
