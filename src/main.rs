use clap::Parser;

use rackplan::cli::{run, Cli};
use rackplan::init_logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs)?;
    tracing::debug!("rackplan {} built {}", rackplan::VERSION, rackplan::BUILD_DATE);

    let code = run(cli)?;
    std::process::exit(code);
}
