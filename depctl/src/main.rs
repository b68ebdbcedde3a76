fn main() -> anyhow::Result<()> {
    depctl::run()
}
