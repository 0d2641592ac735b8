/// Platform id of the resale marketplace adapter
pub const PLATFORM_VINTED: &str = "vinted";

/// Platform id of the logistics carrier adapter
pub const PLATFORM_MAERSK: &str = "maersk";

/// Platform id of the short-term rental adapter
pub const PLATFORM_AIRBNB: &str = "airbnb";

/// Default currency when a platform payload omits one
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Decimal precision for stored money amounts
pub const MONEY_DECIMAL_PRECISION: u32 = 2;
