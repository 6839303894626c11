use anyhow::Result;

/// The tracker does little work per tick, so one thread is enough.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .thread_name("focus-tracker")
        .enable_all()
        .build()?)
}
