pub mod connection_arbiter;
pub mod disambiguation;
pub mod embedded_messages;
pub mod local_index;
pub mod local_player;
pub mod music_manager;
pub mod playback_engine;
pub mod query_resolver;
pub mod remote_node;

use std::time::Duration;

/// Format a duration into a human-readable string
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    let minutes = seconds / 60;
    let seconds = seconds % 60;

    if minutes >= 60 {
        let hours = minutes / 60;
        let minutes = minutes % 60;
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_format_as_expected() {
        assert_eq!(format_duration(Duration::from_secs(59)), "0:59");
        assert_eq!(format_duration(Duration::from_secs(212)), "3:32");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1:01:01");
    }
}
