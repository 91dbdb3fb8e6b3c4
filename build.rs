fn main() {
    let result = tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .emit_rerun_if_changed(false)
        .compile(&["proto/auth.proto"], &["proto"]);
    if result.is_err() {
        // `protoc` is unavailable; fall back to the checked-in generated code.
        let out_dir = std::path::PathBuf::from(std::env::var("OUT_DIR").unwrap());
        std::fs::copy("proto/zkauth.rs", out_dir.join("zkauth.rs")).unwrap();
    }
}
