use tracing_subscriber::EnvFilter;

fn main() {
    if handle_cli_flags() {
        return;
    }
    init_tracing();

    let command = match blogview::Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = blogview::run(command) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn handle_cli_flags() -> bool {
    let mut saw_flag = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("blogview {}", blogview::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!("{}", blogview::app::USAGE);
                saw_flag = true;
            }
            _ => {}
        }
    }
    saw_flag
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("blogview=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
