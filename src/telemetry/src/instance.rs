use once_cell::sync::OnceCell;

static BATCHER_INSTANCE_ID: OnceCell<String> = OnceCell::new();

/// Label attached to every exported gauge. Only the first call takes effect,
/// and it must happen before any gauge is touched.
pub fn set_batcher_instance_id(id: impl Into<String>) {
    let _ = BATCHER_INSTANCE_ID.set(id.into());
}

pub fn batcher_instance_id() -> &'static str {
    BATCHER_INSTANCE_ID
        .get()
        .map(String::as_str)
        .unwrap_or("default")
}
