fn main() {
    if let Err(err) = ev_console::app::run() {
        eprintln!("api startup failed: {err}");
        std::process::exit(1);
    }
}
