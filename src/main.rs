fn main() {
    if let Err(e) = depth_preview_lib::run() {
        tracing::error!("depth preview failed: {e}");
        std::process::exit(1);
    }
}
