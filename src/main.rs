fn main() -> anyhow::Result<()> {
    rest_filter::run()
}
