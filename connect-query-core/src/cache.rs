//! # Query Cache
//!
//! A minimal in-memory cache of query results, keyed by [`ConnectQueryKey`].
//!
//! Writes only go through the Protobuf-safe updaters, so every stored response is a valid
//! instance of its method's output message. Lookups by filter use
//! [`ConnectQueryKey::matches`], e.g. a key built from a service descriptor selects every
//! cached query of that service.
//!
//! An entry holds either a single response or paginated data, whichever was written last.
//! Writing one kind to a key holding the other kind replaces it, and the updater sees no
//! previous value.
use crate::{
    message::MessageInitError,
    query_key::ConnectQueryKey,
    updater::{
        InfiniteData, InfiniteUpdateError, InfiniteUpdater, Updater,
        create_protobuf_safe_infinite_updater, create_protobuf_safe_updater,
    },
};
use prost_reflect::{DynamicMessage, MessageDescriptor};
use std::collections::HashMap;

/// Data held by a cache entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedData {
    Message(DynamicMessage),
    Infinite(InfiniteData),
}

impl CachedData {
    pub fn as_message(&self) -> Option<&DynamicMessage> {
        match self {
            CachedData::Message(message) => Some(message),
            CachedData::Infinite(_) => None,
        }
    }

    pub fn as_infinite(&self) -> Option<&InfiniteData> {
        match self {
            CachedData::Infinite(data) => Some(data),
            CachedData::Message(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    key: ConnectQueryKey,
    data: CachedData,
}

#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    entries: HashMap<String, CacheEntry>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the response stored under `key`, if it holds a single response.
    pub fn get_query_data(&self, key: &ConnectQueryKey) -> Option<&DynamicMessage> {
        self.entries.get(&key.hash_key())?.data.as_message()
    }

    /// Returns the pages stored under `key`, if it holds a paginated query.
    pub fn get_infinite_query_data(&self, key: &ConnectQueryKey) -> Option<&InfiniteData> {
        self.entries.get(&key.hash_key())?.data.as_infinite()
    }

    /// Updates the response stored under `key`, `schema` being the method's output message.
    ///
    /// Returns the new value. When the updater clears the value, the entry is removed. Paginated
    /// data stored under `key` is not a previous value: the updater gets `None` and its result
    /// replaces the pages.
    pub fn set_query_data(
        &mut self,
        key: &ConnectQueryKey,
        schema: &MessageDescriptor,
        updater: Updater<'_>,
    ) -> Result<Option<&DynamicMessage>, MessageInitError> {
        let hash = key.hash_key();
        let next = create_protobuf_safe_updater(schema, updater)(self.get_query_data(key))?;

        let Some(next) = next else {
            self.remove(&hash);
            return Ok(None);
        };

        tracing::debug!(key = %hash, "set query data");
        let entry = self.insert(hash, key, CachedData::Message(next));
        Ok(entry.data.as_message())
    }

    /// Updates the pages stored under `key`, `schema` being the method's output message.
    ///
    /// Returns the new value. When the updater clears the value, the entry is removed. A single
    /// response stored under `key` is replaced the same way [`QueryCache::set_query_data`]
    /// replaces pages.
    pub fn set_infinite_query_data(
        &mut self,
        key: &ConnectQueryKey,
        schema: &MessageDescriptor,
        updater: InfiniteUpdater<'_>,
    ) -> Result<Option<&InfiniteData>, InfiniteUpdateError> {
        let hash = key.hash_key();
        let prev = self.get_infinite_query_data(key);
        let next = create_protobuf_safe_infinite_updater(schema, updater)(prev)?;

        let Some(next) = next else {
            self.remove(&hash);
            return Ok(None);
        };

        tracing::debug!(key = %hash, pages = next.pages.len(), "set infinite query data");
        let entry = self.insert(hash, key, CachedData::Infinite(next));
        Ok(entry.data.as_infinite())
    }

    /// Returns every entry whose key is matched by `filter`.
    pub fn find_all<'a>(
        &'a self,
        filter: &'a ConnectQueryKey,
    ) -> impl Iterator<Item = (&'a ConnectQueryKey, &'a CachedData)> + 'a {
        self.entries
            .values()
            .filter(move |entry| entry.key.matches(filter))
            .map(|entry| (&entry.key, &entry.data))
    }

    /// Removes every entry whose key is matched by `filter` and returns how many were removed.
    pub fn remove_queries(&mut self, filter: &ConnectQueryKey) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.key.matches(filter));
        let removed = before - self.entries.len();

        tracing::debug!(filter = %filter.hash_key(), removed, "removed queries");

        removed
    }

    fn insert(&mut self, hash: String, key: &ConnectQueryKey, data: CachedData) -> &CacheEntry {
        let entry = CacheEntry {
            key: key.clone(),
            data,
        };
        self.entries.entry(hash).insert_entry(entry).into_mut()
    }

    fn remove(&mut self, hash: &str) {
        if self.entries.remove(hash).is_some() {
            tracing::debug!(key = hash, "cleared query data");
        }
    }
}
