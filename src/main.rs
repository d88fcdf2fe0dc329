fn main() {
    if let Err(err) = speedrun_timer_lib::run() {
        eprintln!("speedrun-timer: {err:#}");
        std::process::exit(1);
    }
}
