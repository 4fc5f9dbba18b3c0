#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    texswap::run(texswap::ViewerConfig::default())
}

// The browser build starts from `texswap::run_web`
#[cfg(target_arch = "wasm32")]
fn main() {}
