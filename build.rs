fn main() {
    // ── macOS: embed Info.plist so CoreBluetooth lets the CLI scan ────────────
    //
    // A bare command-line binary has no app bundle, and CBCentralManager stays
    // "unauthorised" unless the running executable carries an Info.plist with
    // NSBluetoothAlwaysUsageDescription.  Linking the plist into the
    // __TEXT,__info_plist section of the Mach-O is read the same way.
    //
    // CARGO_CFG_TARGET_OS is the target, not the host, so this also applies
    // when cross-compiling for macOS.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("macos") {
        return;
    }

    let Ok(dir) = std::env::var("CARGO_MANIFEST_DIR") else {
        println!("cargo:warning=CARGO_MANIFEST_DIR unset, Info.plist not embedded");
        return;
    };
    let plist = format!("{dir}/Info.plist");

    for arg in ["-sectcreate", "__TEXT", "__info_plist", plist.as_str()] {
        println!("cargo:rustc-link-arg-bins={arg}");
    }
    println!("cargo:rerun-if-changed=Info.plist");
}
