fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    skiff_cli::runner::main(std::env::args().collect())
}
