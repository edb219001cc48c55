fn main() {
    if let Err(err) = vistagraph_cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
