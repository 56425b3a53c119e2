/// Read-through helper for values cached in the [`Store`](crate::store::Store).
///
/// Returns the stored value when present. Otherwise awaits `$block`, writes its
/// result under `$key` and returns it. Store and fetch errors propagate with `?`,
/// so the macro must be used inside a function returning `AppResult`.
///
/// # Example
/// ```rust,ignore
/// let genres: Vec<Genre> = stored!(self.store, StoreKey::Genres, async {
///     self.provider.genres().await
/// })?;
/// ```
#[macro_export]
macro_rules! stored {
    ($store:expr, $key:expr, $block:expr) => {{
        if let Some(stored) = $store.get_json(&$key).await? {
            Ok(stored)
        } else {
            let value = $block.await?;
            $store.set_json(&$key, &value).await?;
            Ok(value)
        }
    }};
}
