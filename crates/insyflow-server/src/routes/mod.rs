pub mod ai;
pub mod ga4;
pub mod gsc;
pub mod health;
pub mod preferences;

/// Report routes: cacheable at the edge, revalidated in the background.
pub const REPORT_CACHE_CONTROL: &str = "public, s-maxage=300, stale-while-revalidate=600";

/// Realtime numbers go stale quickly, but a short window still spares the quota.
pub const REALTIME_CACHE_CONTROL: &str = "public, s-maxage=10, stale-while-revalidate=20";

pub const NO_STORE: &str = "no-store";
