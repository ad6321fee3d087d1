/// Read-through caching around an async computation.
///
/// Returns the value cached under `$key` when present. Otherwise awaits
/// `$block`, queues its result for caching with `$ttl` seconds to live and
/// returns it. Cache read failures and errors from `$block` are propagated
/// with `?`, so the enclosing function must return an `AppResult`.
///
/// # Example
/// ```rust,ignore
/// let ratings: RatingVector = cached!(cache, CacheKey::UserRatings(id), 3600, async move {
///     fetch_ratings(id).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.get_from_cache(&key).await? {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
