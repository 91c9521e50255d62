fn main() -> anyhow::Result<()> {
    fxscript::run()
}
