//! Generates the wrappers the integration tests include from
//! `tests/fixtures/api.rs`.

use std::path::Path;

const FIXTURE: &str = "tests/fixtures/api.rs";

fn main() -> anyhow::Result<()> {
    println!("cargo:rerun-if-changed=build.rs");
    if !Path::new(FIXTURE).exists() {
        return Ok(());
    }
    recast_codegen::cargo::Build::new()
        .source(FIXTURE, "crate::api")
        .fail_on_error(true)
        .run()?;
    Ok(())
}
