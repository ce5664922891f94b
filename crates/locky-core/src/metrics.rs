// Metrics for lock coordination
// Counters are recorded through the `metrics` facade; installing an exporter is up to the host

use metrics::describe_counter;

pub const LOCK_ACQUIRE_TOTAL: &str = "locky_lock_acquire_total";
pub const LOCK_REFRESH_TOTAL: &str = "locky_lock_refresh_total";
pub const COORDINATOR_ERRORS_TOTAL: &str = "locky_coordinator_errors_total";
pub const ROOM_BROADCAST_TOTAL: &str = "locky_room_broadcast_total";
pub const HEARTBEAT_TICKS_TOTAL: &str = "locky_heartbeat_ticks_total";

/// Initialize all metric descriptions
/// Should be called once at application startup
pub fn init_metrics() {
    describe_counter!(
        LOCK_ACQUIRE_TOTAL,
        "Total number of locks claimed on join"
    );
    describe_counter!(
        LOCK_REFRESH_TOTAL,
        "Total number of lock refreshes issued"
    );
    describe_counter!(
        COORDINATOR_ERRORS_TOTAL,
        "Total number of collaborator errors surfaced by the coordinator"
    );
    describe_counter!(
        ROOM_BROADCAST_TOTAL,
        "Total number of lock lifecycle events broadcast to rooms"
    );
    describe_counter!(HEARTBEAT_TICKS_TOTAL, "Total number of heartbeat ticks");
}
