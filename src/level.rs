/// the contracts the coordinator consumes: cache levels and the compute source
///
use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

/// One tier in the ordered list of caches, e.g., an in-process map, a hosted redis
/// or a sql table.  Any store that can answer `get` and accept `set` is usable.
///
/// `options` is the caller's call-scoped context, passed through untouched.
#[async_trait]
pub trait CacheLevel<K, V, O = ()>: Send + Sync {
    /// return the stored value, or None when the key is absent
    async fn get(&self, key: &K, options: &O) -> Result<Option<V>>;

    /// store the value for this key; None records that the source has no value
    async fn set(&self, key: &K, value: Option<&V>, options: &O) -> Result<()>;

    /// invoked with the error when `get` fails; the probe is then treated as a miss
    fn on_get_error(&self, _error: &anyhow::Error) {}

    /// invoked with the error when `set` fails; remaining writes continue
    fn on_set_error(&self, _error: &anyhow::Error) {}
}

/// The fallback source of truth, invoked when no level has a usable value.
#[async_trait]
pub trait Compute<Q, V, O = ()>: Send + Sync {
    async fn compute(&self, query: &Q, options: &O) -> Result<Option<V>>;
}

/// the default compute; always resolves to the absent value
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCompute;

#[async_trait]
impl<Q, V, O> Compute<Q, V, O> for NoCompute
where
    Q: Send + Sync,
    V: Send + Sync,
    O: Send + Sync,
{
    async fn compute(&self, _query: &Q, _options: &O) -> Result<Option<V>> {
        Ok(None)
    }
}

/// Adapts an async closure to `Compute`.  The closure receives owned clones of the
/// query and options so the returned future does not borrow from the coordinator.
pub struct ComputeFn<F, Fut> {
    func: F,
    _fut: PhantomData<fn() -> Fut>,
}

impl<F, Fut> ComputeFn<F, Fut> {
    pub fn new(func: F) -> ComputeFn<F, Fut> {
        ComputeFn {
            func,
            _fut: PhantomData,
        }
    }
}

#[async_trait]
impl<Q, V, O, F, Fut> Compute<Q, V, O> for ComputeFn<F, Fut>
where
    Q: Clone + Send + Sync,
    V: Send + Sync,
    O: Clone + Send + Sync,
    F: Fn(Q, O) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<V>>> + Send,
{
    async fn compute(&self, query: &Q, options: &O) -> Result<Option<V>> {
        (self.func)(query.clone(), options.clone()).await
    }
}
