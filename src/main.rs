fn main() {
    if let Err(e) = ultron_console::cli::main() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
