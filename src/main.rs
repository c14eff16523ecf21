fn main() -> anyhow::Result<()>
{
        #[cfg(not(target_arch = "wasm32"))]
        scenemount::run()?;

        Ok(())
}
