fn main() {
    if let Err(error) = shoplist_cli::run() {
        eprintln!("Error: {error:#}");
        std::process::exit(1);
    }
}
