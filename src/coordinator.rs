/// The coordinator: reads through an ordered list of cache levels, nearest first,
/// falls back to compute on a full miss and writes the value back into the levels
/// that did not have it.
///
/// * read: probe level 0, 1, .. until one returns a usable value
/// * partial hit at level i: hydrate levels 0..i, nearest to farthest
/// * full miss: compute, then write every level, farthest to nearest
///
/// Level errors are isolated: a failed `get` is a miss, a failed `set` is skipped.
/// Only a compute failure reaches the caller.
///
use anyhow::Result;
use log::*;
use std::future::Future;
use std::sync::Arc;

use crate::config::CoordinatorSettings;
use crate::level::{CacheLevel, Compute, ComputeFn, NoCompute};
use crate::value::CacheValue;

pub type SharedLevel<K, V, O> = Arc<dyn CacheLevel<K, V, O>>;
pub type KeyFn<Q, K> = Box<dyn Fn(&Q) -> K + Send + Sync>;
pub type ValueFn<V> = Box<dyn Fn(&V) -> bool + Send + Sync>;
pub type WriteFn<V> = Box<dyn Fn(&CacheValue<V>) -> bool + Send + Sync>;

pub struct Coordinator<Q, K, V, O = ()> {
    levels: Vec<SharedLevel<K, V, O>>,
    compute: Box<dyn Compute<Q, V, O>>,
    key_for_query: KeyFn<Q, K>,
    is_value: ValueFn<V>,
    should_write: WriteFn<V>,
    hydrate: bool,
}

impl<Q, K, V, O> Coordinator<Q, K, V, O>
where
    Q: Clone + Send + Sync + 'static,
    K: From<Q> + Send + Sync + 'static,
    V: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    /// a builder that uses the query itself as the key
    pub fn builder() -> CoordinatorBuilder<Q, K, V, O> {
        CoordinatorBuilder::new()
    }
}

impl<Q, K, V, O> Coordinator<Q, K, V, O>
where
    Q: Send + Sync + 'static,
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    pub fn builder_with_key<F>(key_for_query: F) -> CoordinatorBuilder<Q, K, V, O>
    where
        F: Fn(&Q) -> K + Send + Sync + 'static,
    {
        CoordinatorBuilder::with_key(key_for_query)
    }

    /// the number of configured levels
    pub fn levels(&self) -> usize {
        self.levels.len()
    }

    pub fn hydrate(&self) -> bool {
        self.hydrate
    }

    /// Resolve the query and return the value tagged with the index of the level that
    /// answered, or untagged when it was computed.  The payload is absent only when
    /// nothing was found and compute produced nothing.
    pub async fn resolve(&self, query: &Q, options: &O) -> Result<CacheValue<V>> {
        let key = (self.key_for_query)(query);

        match self.read(&key, options).await {
            Some(found) if self.hydrate => {
                self.store(query, options, Some(&key), Some(found)).await
            }
            Some(found) => Ok(found),
            None => self.store(query, options, Some(&key), None).await,
        }
    }

    /// resolve the query and return the payload
    pub async fn get(&self, query: &Q, options: &O) -> Result<Option<V>> {
        let value = self.resolve(query, options).await?;
        Ok(value.into_payload())
    }

    /// Compute the value for this query and write it to every level, farthest first,
    /// without reading any level.  An absent result is written as absent.
    pub async fn set(&self, query: &Q, options: &O) -> Result<Option<V>> {
        let value = self.store(query, options, None, None).await?;
        Ok(value.into_payload())
    }

    // compute unless a value resolved from a level is supplied, then write it back to
    // the levels its tag selects
    async fn store(
        &self,
        query: &Q,
        options: &O,
        key: Option<&K>,
        resolved: Option<CacheValue<V>>,
    ) -> Result<CacheValue<V>> {
        let value = match resolved {
            Some(value) => value,
            None => CacheValue::computed(self.compute.compute(query, options).await?),
        };

        let failed = match key {
            Some(key) => self.write_back(key, &value, options).await,
            None => {
                let key = (self.key_for_query)(query);
                self.write_back(&key, &value, options).await
            }
        };

        if failed > 0 {
            info!("{} of the level writes failed", failed);
        }

        Ok(value)
    }

    async fn read(&self, key: &K, options: &O) -> Option<CacheValue<V>> {
        for (index, level) in self.levels.iter().enumerate() {
            match level.get(key, options).await {
                Ok(Some(payload)) if (self.is_value)(&payload) => {
                    debug!("hit at level {}", index);
                    return Some(CacheValue::from_level(payload, index));
                }
                Ok(_) => debug!("miss at level {}", index),
                Err(e) => {
                    warn!("level {} get error, treated as a miss: {:?}", index, e);
                    level.on_get_error(&e);
                }
            }
        }

        None
    }

    // returns the number of failed writes
    async fn write_back(&self, key: &K, value: &CacheValue<V>, options: &O) -> usize {
        if !(self.should_write)(value) {
            debug!("write-back suppressed for value from {:?}", value.found_at());
            return 0;
        }

        let range = value.write_range(self.levels.len());
        let indices: Vec<usize> = if value.is_computed() {
            range.rev().collect()
        } else {
            range.collect()
        };

        let mut error_count = 0;
        for index in indices {
            let level = &self.levels[index];
            if let Err(e) = level.set(key, value.payload(), options).await {
                error_count += 1;
                warn!("level {} set error: {:?}", index, e);
                level.on_set_error(&e);
            } else {
                debug!("wrote level {}", index);
            }
        }

        error_count
    }
}

/// Collects the levels, compute source and policy hooks for a `Coordinator`.
pub struct CoordinatorBuilder<Q, K, V, O = ()> {
    levels: Vec<SharedLevel<K, V, O>>,
    compute: Option<Box<dyn Compute<Q, V, O>>>,
    key_for_query: KeyFn<Q, K>,
    is_value: Option<ValueFn<V>>,
    should_write: Option<WriteFn<V>>,
    hydrate: bool,
}

impl<Q, K, V, O> CoordinatorBuilder<Q, K, V, O>
where
    Q: Clone + Send + Sync + 'static,
    K: From<Q> + Send + Sync + 'static,
    V: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    pub fn new() -> CoordinatorBuilder<Q, K, V, O> {
        CoordinatorBuilder::with_key(|query: &Q| K::from(query.clone()))
    }
}

impl<Q, K, V, O> Default for CoordinatorBuilder<Q, K, V, O>
where
    Q: Clone + Send + Sync + 'static,
    K: From<Q> + Send + Sync + 'static,
    V: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    fn default() -> Self {
        CoordinatorBuilder::new()
    }
}

impl<Q, K, V, O> CoordinatorBuilder<Q, K, V, O>
where
    Q: Send + Sync + 'static,
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    pub fn with_key<F>(key_for_query: F) -> CoordinatorBuilder<Q, K, V, O>
    where
        F: Fn(&Q) -> K + Send + Sync + 'static,
    {
        CoordinatorBuilder {
            levels: vec![],
            compute: None,
            key_for_query: Box::new(key_for_query),
            is_value: None,
            should_write: None,
            hydrate: true,
        }
    }

    /// append a level; the first level added is the nearest
    pub fn level<L>(mut self, level: L) -> Self
    where
        L: CacheLevel<K, V, O> + 'static,
    {
        self.levels.push(Arc::new(level));
        self
    }

    /// append a level the caller keeps a handle to
    pub fn shared_level(mut self, level: SharedLevel<K, V, O>) -> Self {
        self.levels.push(level);
        self
    }

    pub fn compute<C>(mut self, compute: C) -> Self
    where
        C: Compute<Q, V, O> + 'static,
    {
        self.compute = Some(Box::new(compute));
        self
    }

    /// derive the key from each query instead of using the query itself
    pub fn key_for_query<F>(mut self, key_for_query: F) -> Self
    where
        F: Fn(&Q) -> K + Send + Sync + 'static,
    {
        self.key_for_query = Box::new(key_for_query);
        self
    }

    /// decides whether a value returned by a level counts as a hit
    pub fn is_value<F>(mut self, is_value: F) -> Self
    where
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        self.is_value = Some(Box::new(is_value));
        self
    }

    /// decides whether a resolved value is written back at all
    pub fn should_write<F>(mut self, should_write: F) -> Self
    where
        F: Fn(&CacheValue<V>) -> bool + Send + Sync + 'static,
    {
        self.should_write = Some(Box::new(should_write));
        self
    }

    pub fn hydrate(mut self, hydrate: bool) -> Self {
        self.hydrate = hydrate;
        self
    }

    pub fn settings(self, settings: &CoordinatorSettings) -> Self {
        self.hydrate(settings.hydrate)
    }

    pub fn build(self) -> Coordinator<Q, K, V, O> {
        info!(
            "coordinator created with {} levels, hydrate: {}",
            self.levels.len(),
            self.hydrate
        );

        Coordinator {
            levels: self.levels,
            compute: self.compute.unwrap_or_else(|| Box::new(NoCompute)),
            key_for_query: self.key_for_query,
            is_value: self.is_value.unwrap_or_else(|| Box::new(|_: &V| true)),
            should_write: self
                .should_write
                .unwrap_or_else(|| Box::new(|_: &CacheValue<V>| true)),
            hydrate: self.hydrate,
        }
    }
}

impl<Q, K, V, O> CoordinatorBuilder<Q, K, V, O>
where
    Q: Clone + Send + Sync + 'static,
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    /// use an async closure over owned query and options as the compute source
    pub fn compute_fn<F, Fut>(self, func: F) -> Self
    where
        F: Fn(Q, O) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<V>>> + Send + 'static,
    {
        self.compute(ComputeFn::new(func))
    }
}
