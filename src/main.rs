#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    floor_ngin::run(floor_ngin::Config::default())
}

// On the web the library's `#[wasm_bindgen(start)]` function drives the walkthrough.
#[cfg(target_arch = "wasm32")]
fn main() {}
