fn main() {
    // Declaring the app's commands makes each one require an explicit
    // permission in a capability file.
    tauri_build::try_build(
        tauri_build::Attributes::new()
            .app_manifest(tauri_build::AppManifest::new().commands(&["predict"])),
    )
    .expect("failed to run tauri-build");
}
