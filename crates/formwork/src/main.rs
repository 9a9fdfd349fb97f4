use clap::Parser;

use formwork::{app, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();
    app::run(&cli, &mut stdout)?;
    Ok(())
}
