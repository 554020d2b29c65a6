//! # Protobuf-Safe Updaters
//!
//! A cache slot holding the response of a method must always contain a valid instance of the
//! method's output message. Callers writing to the cache, however, often have a plain JSON
//! partial at hand. The updaters built here sit between the two: whatever the caller provides
//! is turned into a proper message before it reaches the cache.
//!
//! ## Merge policy
//!
//! A partial value is layered over the schema's defaults, **not** over the previous value.
//! Fields it leaves out take their default. Callers wanting to keep previous fields read them
//! from `prev` in an [`Updater::Fn`].
//!
//! ## Paginated data
//!
//! [`InfiniteData`] holds two parallel lists: the pages and the page params they were fetched
//! with. An update leaving the page params out keeps the previous ones, which is only valid
//! while the number of pages stays the same. Any update ending with as many page params as
//! pages is accepted; anything else is rejected with [`InfiniteUpdateError::PageParamsMismatch`].
use crate::message::{MessageInit, MessageInitError};
use prost_reflect::{DynamicMessage, MessageDescriptor, Value};
use std::fmt;

type UpdateFn<'a> = Box<dyn FnOnce(Option<&DynamicMessage>) -> Option<MessageInit> + 'a>;
type InfiniteUpdateFn<'a> = Box<dyn FnOnce(Option<&InfiniteData>) -> Option<InfiniteUpdate> + 'a>;

/// A request to change the value of a cache slot.
pub enum Updater<'a> {
    /// Remove the value.
    Clear,
    /// Replace the value.
    Value(MessageInit),
    /// Compute the value from the previous one (`None` on first population). Returning `None`
    /// removes the value.
    Fn(UpdateFn<'a>),
}

impl<'a> Updater<'a> {
    pub fn from_fn(
        f: impl FnOnce(Option<&DynamicMessage>) -> Option<MessageInit> + 'a,
    ) -> Self {
        Updater::Fn(Box::new(f))
    }
}

impl fmt::Debug for Updater<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Updater::Clear => f.write_str("Clear"),
            Updater::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Updater::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}

impl From<MessageInit> for Updater<'_> {
    fn from(value: MessageInit) -> Self {
        Updater::Value(value)
    }
}

impl From<DynamicMessage> for Updater<'_> {
    fn from(value: DynamicMessage) -> Self {
        Updater::Value(value.into())
    }
}

impl From<serde_json::Value> for Updater<'_> {
    fn from(value: serde_json::Value) -> Self {
        Updater::Value(value.into())
    }
}

/// Wraps `updater` so it only ever produces `None` or a valid instance of `schema`.
///
/// # Returns
///
/// A function taking the previous value of the slot and returning:
/// * `Ok(Some(message))` - The new value, an instance of `schema`.
/// * `Ok(None)` - The slot must be cleared.
/// * `Err(MessageInitError)` - The provided value cannot be turned into an instance of `schema`.
pub fn create_protobuf_safe_updater<'a>(
    schema: &MessageDescriptor,
    updater: Updater<'a>,
) -> impl FnOnce(Option<&DynamicMessage>) -> Result<Option<DynamicMessage>, MessageInitError> + use<'a>
{
    let schema = schema.clone();
    move |prev| {
        let next = match updater {
            Updater::Clear => None,
            Updater::Value(value) => Some(value),
            Updater::Fn(f) => f(prev),
        };

        next.map(|value| into_valid_message(value, &schema))
            .transpose()
    }
}

/// Pages of a paginated query along with the page params they were fetched with.
///
/// `pages[i]` was fetched with `page_params[i]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InfiniteData {
    pub pages: Vec<DynamicMessage>,
    pub page_params: Vec<Value>,
}

/// New content for a paginated query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InfiniteUpdate {
    pub pages: Vec<MessageInit>,
    /// `None` keeps the previous page params.
    pub page_params: Option<Vec<Value>>,
}

impl InfiniteUpdate {
    /// Replaces both the pages and their page params.
    pub fn new(
        pages: impl IntoIterator<Item = impl Into<MessageInit>>,
        page_params: impl IntoIterator<Item = Value>,
    ) -> Self {
        Self {
            pages: pages.into_iter().map(Into::into).collect(),
            page_params: Some(page_params.into_iter().collect()),
        }
    }

    /// Replaces the pages, keeping the previous page params.
    pub fn pages(pages: impl IntoIterator<Item = impl Into<MessageInit>>) -> Self {
        Self {
            pages: pages.into_iter().map(Into::into).collect(),
            page_params: None,
        }
    }
}

/// Errors that can occur when updating a paginated query.
#[derive(Debug, thiserror::Error)]
pub enum InfiniteUpdateError {
    #[error(transparent)]
    InvalidPage(#[from] MessageInitError),
    #[error("Paginated data must have one page param per page, got {pages} pages and {page_params} page params")]
    PageParamsMismatch { pages: usize, page_params: usize },
}

/// A request to change the value of a paginated cache slot. See [`Updater`].
pub enum InfiniteUpdater<'a> {
    Clear,
    Value(InfiniteUpdate),
    Fn(InfiniteUpdateFn<'a>),
}

impl<'a> InfiniteUpdater<'a> {
    pub fn from_fn(f: impl FnOnce(Option<&InfiniteData>) -> Option<InfiniteUpdate> + 'a) -> Self {
        InfiniteUpdater::Fn(Box::new(f))
    }
}

impl fmt::Debug for InfiniteUpdater<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfiniteUpdater::Clear => f.write_str("Clear"),
            InfiniteUpdater::Value(value) => f.debug_tuple("Value").field(value).finish(),
            InfiniteUpdater::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}

impl From<InfiniteUpdate> for InfiniteUpdater<'_> {
    fn from(value: InfiniteUpdate) -> Self {
        InfiniteUpdater::Value(value)
    }
}

/// Paginated counterpart of [`create_protobuf_safe_updater`]: every page of the result is an
/// instance of `schema`, and there is exactly one page param per page.
pub fn create_protobuf_safe_infinite_updater<'a>(
    schema: &MessageDescriptor,
    updater: InfiniteUpdater<'a>,
) -> impl FnOnce(Option<&InfiniteData>) -> Result<Option<InfiniteData>, InfiniteUpdateError> + use<'a>
{
    let schema = schema.clone();
    move |prev| {
        let next = match updater {
            InfiniteUpdater::Clear => None,
            InfiniteUpdater::Value(value) => Some(value),
            InfiniteUpdater::Fn(f) => f(prev),
        };
        let Some(next) = next else {
            return Ok(None);
        };

        let pages = next
            .pages
            .into_iter()
            .map(|page| into_valid_message(page, &schema))
            .collect::<Result<Vec<_>, _>>()?;
        let page_params = match next.page_params {
            Some(page_params) => page_params,
            None => prev.map(|prev| prev.page_params.clone()).unwrap_or_default(),
        };
        if pages.len() != page_params.len() {
            tracing::warn!(
                schema = schema.full_name(),
                pages = pages.len(),
                page_params = page_params.len(),
                "rejected paginated cache update"
            );
            return Err(InfiniteUpdateError::PageParamsMismatch {
                pages: pages.len(),
                page_params: page_params.len(),
            });
        }

        Ok(Some(InfiniteData { pages, page_params }))
    }
}

fn into_valid_message(
    value: MessageInit,
    schema: &MessageDescriptor,
) -> Result<DynamicMessage, MessageInitError> {
    value.into_message(schema).inspect_err(|err| {
        tracing::warn!(schema = schema.full_name(), %err, "rejected cache update");
    })
}
