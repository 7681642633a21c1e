use anyhow::Result;

pub fn run() -> Result<()> {
    println!("tracedeck {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
