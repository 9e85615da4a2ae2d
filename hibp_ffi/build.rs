//! 生成 C 头文件

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");

    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let out_dir = match env::var("OUT_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => return,
    };

    match cbindgen::Builder::new()
        .with_crate(crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("HIBP_FFI_H")
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(out_dir.join("hibp_ffi.h"));
        }
        Err(e) => println!("cargo:warning=failed to generate C header: {}", e),
    }
}
