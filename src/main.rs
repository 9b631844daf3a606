use spectron::cli::CommandLineInterface;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let command_line_interface = CommandLineInterface::load();
    let default_level = match command_line_interface.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();
    command_line_interface.run()
}
