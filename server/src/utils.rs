use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn since_epoch() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
}

// Wall-clock seconds with sub-second precision, for snapshots
pub fn unix_timestamp() -> f64 {
    since_epoch().as_secs_f64()
}

// Game ids are creation times in whole seconds, bumped so that two games
// started within the same second still get distinct files
pub fn next_game_id(previous: Option<u64>) -> u64 {
    let now = since_epoch().as_secs();
    match previous {
        Some(prev) if prev >= now => prev + 1,
        _ => now,
    }
}
