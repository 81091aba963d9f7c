fn main() -> anyhow::Result<()> {
    rpgworld_rust::run()
}
