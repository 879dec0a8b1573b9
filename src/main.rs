fn main() {
    if let Err(err) = chartfit::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
