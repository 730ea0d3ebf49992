use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/c_api.rs");

    if env::var_os("CARGO_FEATURE_C_API").is_none() {
        return;
    }

    let crate_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => dir,
        Err(_) => return,
    };
    let include_dir = PathBuf::from(&crate_dir).join("include");
    let header_path = include_dir.join("repack_core.h");

    if let Err(e) = std::fs::create_dir_all(&include_dir) {
        println!("cargo:warning=Couldn't create {}: {}", include_dir.display(), e);
        return;
    }

    let bindings = match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_include_guard("REPACK_CORE_H")
        .with_header("// GENERATED FILE -- DO NOT EDIT")
        .with_sys_include("stddef.h")
        .with_sys_include("stdint.h")
        .with_language(cbindgen::Language::C)
        .generate()
    {
        Ok(bindings) => bindings,
        Err(e) => {
            println!("cargo:warning=C header not generated: {}", e);
            return;
        }
    };

    bindings.write_to_file(&header_path);

    // Emit the include directory for other crates
    println!("cargo:include={}", include_dir.display());
}
