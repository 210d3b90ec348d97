use anyhow::Result;

fn main() -> Result<()> {
    qber_cli::run()
}
