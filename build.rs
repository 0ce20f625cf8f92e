use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

// Copies `assets/` next to the compiled binary so the demo also runs when
// started from outside the crate directory.
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets_src = manifest_dir.join("assets");
    if !assets_src.exists() {
        println!("cargo:warning=no assets directory, the demo will log missing files");
        return Ok(());
    }

    // OUT_DIR is target/<profile>/build/<crate>-<hash>/out
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let profile_dir = out_dir
        .ancestors()
        .nth(3)
        .context("unexpected OUT_DIR layout")?
        .to_path_buf();

    let mut copy_options = CopyOptions::new();
    copy_options.overwrite = true;
    copy_items(&[assets_src], profile_dir, &copy_options)?;

    Ok(())
}
