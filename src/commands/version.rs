use anyhow::Result;

pub fn execute() -> Result<()> {
    println!("perfmon version {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
