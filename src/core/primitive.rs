//! Load primitive abstraction consumed by the bounded loader.

use async_trait::async_trait;

/// Abstraction for loading a single external resource.
///
/// The primitive owns the actual I/O (decoding an image, fetching a blob).
/// It receives the resource identifier and yields either an opaque resource
/// handle `R` or a failure reason.
///
/// Early abort is best-effort: when a load is cancelled the loader drops the
/// future returned by [`LoadPrimitive::load`], so any cleanup the primitive
/// needs on abort belongs in `Drop` impls held by that future.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_coordination::core::LoadPrimitive;
///
/// #[derive(Clone)]
/// struct HttpImageLoader {
///     client: reqwest::Client,
/// }
///
/// #[async_trait]
/// impl LoadPrimitive<Vec<u8>> for HttpImageLoader {
///     async fn load(&self, identifier: &str) -> Result<Vec<u8>, String> {
///         let response = self.client.get(identifier).send().await.map_err(|e| e.to_string())?;
///         let bytes = response.bytes().await.map_err(|e| e.to_string())?;
///         Ok(bytes.to_vec())
///     }
/// }
/// ```
#[async_trait]
pub trait LoadPrimitive<R>: Send + Sync + Clone + 'static
where
    R: Send + 'static,
{
    /// Load the resource named by `identifier`.
    ///
    /// # Errors
    ///
    /// Returns the failure reason when the resource cannot be loaded.
    async fn load(&self, identifier: &str) -> Result<R, String>;
}
