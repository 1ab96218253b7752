fn main() {
    if let Err(err) = csv_loadprep::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
