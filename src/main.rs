fn main() {
    let config = match qtc::cli::RuntimeConfig::from_cli() {
        Ok(config) => config,
        Err(message) => {
            println!("{message}");
            std::process::exit(1);
        }
    };
    std::process::exit(qtc::work::run(&config));
}
