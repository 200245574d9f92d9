//! Renders `agentlink.1` from the `listen`/`probe` command line.

use std::{fs, path::Path};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli.rs"]
mod cli;

const MAN_DIR: &str = "target/generated-man";
const MAN_PAGE: &str = "agentlink.1";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=src/cli.rs");

    let dir = Path::new(MAN_DIR);
    fs::create_dir_all(dir)?;

    let mut page = Vec::new();
    Man::new(cli::Cli::command()).render(&mut page)?;
    fs::write(dir.join(MAN_PAGE), page)?;
    Ok(())
}
