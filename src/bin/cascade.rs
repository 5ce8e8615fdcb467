use cascade_builder::cli;
use cascade_builder::shared::logging::init_tracing;

fn run() -> Result<(), String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    init_tracing(cli::is_verbose(&args))?;
    let output = cli::run_cli(args)?;
    println!("{output}");
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
