use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

// Ships the sample assets next to the build output so binaries started from
// the target directory find them too.
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");
    println!("cargo:rerun-if-changed=src/pipelines/geometry.wgsl");
    println!("cargo:rerun-if-changed=src/pipelines/screen.wgsl");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets = manifest_dir.join("assets");
    if !assets.is_dir() {
        println!("cargo:warning=no assets directory, skipping copy");
        return Ok(());
    }

    let out_dir = env::var("OUT_DIR")?;
    let mut options = CopyOptions::new();
    options.overwrite = true;
    copy_items(&[assets], out_dir, &options)
        .with_context(|| "copying assets into OUT_DIR")?;
    Ok(())
}
