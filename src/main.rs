fn main() {
    if let Err(err) = flowmap::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
