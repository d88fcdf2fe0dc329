/// Format milliseconds as "MM:SS:CC" (centiseconds). Truncates, never rounds.
/// Minutes are not wrapped into hours.
pub fn format_elapsed(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms / 1000) % 60;
    let centis = (ms % 1000) / 10;
    format!("{:02}:{:02}:{:02}", minutes, seconds, centis)
}
