fn main() {
    if let Err(err) = tabi_map::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
