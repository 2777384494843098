fn main() -> anyhow::Result<()> {
    anonikki::cli::run()
}
