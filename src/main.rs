fn main() {
    if let Err(err) = beacon_recorder::run() {
        eprintln!("beacon-recorder: {err:#}");
        std::process::exit(1);
    }
}
