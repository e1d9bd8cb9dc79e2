fn main() {
    if let Err(err) = fwf_loader::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
