//! # Query Options
//!
//! Pairs the key of a query with the function fetching its data, ready to be handed over to a
//! caching layer.
//!
//! * [`QueryOptions`] describe a single response (`finite` cardinality).
//! * [`InfiniteQueryOptions`] describe a list of pages (`infinite` cardinality). One input field,
//!   the page param, changes from page to page. It is excluded from the key so that every page
//!   of the query lives under the same cache entry.
use crate::{
    BoxError,
    call::{CallError, CallOptions, call_unary_method},
    message::{MessageInit, MessageInitError},
    method::{UnsupportedMethodKind, assert_unary},
    query_key::{Cardinality, ConnectQueryKey, KeyParams, QueryInput, create_connect_query_key},
    transport::Transport,
};
use futures_util::{Stream, stream};
use http_body::Body as HttpBody;
use prost_reflect::{DynamicMessage, FieldDescriptor, MethodDescriptor, Value};
use std::{fmt, sync::Arc};

/// Errors that can occur when building query options.
#[derive(Debug, thiserror::Error)]
pub enum QueryOptionsError {
    #[error(transparent)]
    UnsupportedMethodKind(#[from] UnsupportedMethodKind),
    #[error("Invalid input: '{0}'")]
    InvalidInput(#[from] MessageInitError),
    #[error("Page param field '{field}' not found in message '{message}'")]
    PageParamNotFound { field: String, message: String },
}

/// Options of a query returning a single response.
#[derive(Debug, Clone)]
pub struct QueryOptions<S> {
    pub query_key: ConnectQueryKey,
    /// `false` when the input is disabled. The query must not be fetched then.
    pub enabled: bool,
    method: MethodDescriptor,
    input: QueryInput<DynamicMessage>,
    transport: Transport<S>,
    call_options: CallOptions,
}

/// Builds the options of a query on the unary `method`.
///
/// The input is validated against the method's input message right away.
pub fn create_query_options<S>(
    method: &MethodDescriptor,
    input: QueryInput<MessageInit>,
    transport: &Transport<S>,
    call_options: CallOptions,
) -> Result<QueryOptions<S>, QueryOptionsError>
where
    S: Clone,
{
    assert_unary(method)?;

    let input = match input {
        QueryInput::Active(input) => QueryInput::Active(input.into_message(&method.input())?),
        QueryInput::Disabled => QueryInput::Disabled,
    };

    let query_key = create_connect_query_key(KeyParams {
        schema: method.clone().into(),
        input: Some(input.as_ref()),
        transport: Some(transport),
        cardinality: Some(Cardinality::Finite),
        page_param_key: None,
    });

    Ok(QueryOptions {
        query_key,
        enabled: !input.is_disabled(),
        method: method.clone(),
        input,
        transport: transport.clone(),
        call_options,
    })
}

impl<S> QueryOptions<S>
where
    S: tonic::client::GrpcService<tonic::body::Body> + Clone,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    /// Fetches the response of the query.
    pub async fn fetch(&self) -> Result<DynamicMessage, CallError> {
        call_unary_method(
            &self.transport,
            &self.method,
            self.input.clone().map(MessageInit::Message),
            &self.call_options,
        )
        .await
    }
}

type NextPageParamFn = Arc<dyn Fn(&DynamicMessage) -> Option<Value> + Send + Sync>;

/// Settings of a paginated query.
#[derive(Clone)]
pub struct InfiniteOptions {
    /// Input field (JSON or proto name) holding the page param.
    pub page_param_key: String,
    /// Computes the page param of the page following the given one, `None` when it was the last.
    pub get_next_page_param: NextPageParamFn,
    pub call_options: CallOptions,
}

impl InfiniteOptions {
    pub fn new(
        page_param_key: impl Into<String>,
        get_next_page_param: impl Fn(&DynamicMessage) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            page_param_key: page_param_key.into(),
            get_next_page_param: Arc::new(get_next_page_param),
            call_options: CallOptions::default(),
        }
    }

    pub fn with_call_options(mut self, call_options: CallOptions) -> Self {
        self.call_options = call_options;
        self
    }
}

impl fmt::Debug for InfiniteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfiniteOptions")
            .field("page_param_key", &self.page_param_key)
            .field("call_options", &self.call_options)
            .finish_non_exhaustive()
    }
}

/// Options of a paginated query.
#[derive(Debug, Clone)]
pub struct InfiniteQueryOptions<S> {
    pub query_key: ConnectQueryKey,
    /// `false` when the input is disabled. The query must not be fetched then.
    pub enabled: bool,
    /// Page param of the first page: the value of the page field in the input.
    pub initial_page_param: Value,
    method: MethodDescriptor,
    input: QueryInput<DynamicMessage>,
    page_param_field: FieldDescriptor,
    transport: Transport<S>,
    options: InfiniteOptions,
}

/// Builds the options of a paginated query on the unary `method`.
pub fn create_infinite_query_options<S>(
    method: &MethodDescriptor,
    input: QueryInput<MessageInit>,
    transport: &Transport<S>,
    options: InfiniteOptions,
) -> Result<InfiniteQueryOptions<S>, QueryOptionsError>
where
    S: Clone,
{
    assert_unary(method)?;

    let input_desc = method.input();
    let page_param_field = input_desc
        .fields()
        .find(|field| {
            field.json_name() == options.page_param_key || field.name() == options.page_param_key
        })
        .ok_or_else(|| QueryOptionsError::PageParamNotFound {
            field: options.page_param_key.clone(),
            message: input_desc.full_name().to_string(),
        })?;

    let input = match input {
        QueryInput::Active(input) => QueryInput::Active(input.into_message(&input_desc)?),
        QueryInput::Disabled => QueryInput::Disabled,
    };

    let initial_page_param = match &input {
        QueryInput::Active(input) => input.get_field(&page_param_field).into_owned(),
        QueryInput::Disabled => Value::default_value_for_field(&page_param_field),
    };

    let query_key = create_connect_query_key(KeyParams {
        schema: method.clone().into(),
        input: Some(input.as_ref()),
        transport: Some(transport),
        cardinality: Some(Cardinality::Infinite),
        page_param_key: Some(&options.page_param_key),
    });

    Ok(InfiniteQueryOptions {
        query_key,
        enabled: !input.is_disabled(),
        initial_page_param,
        method: method.clone(),
        input,
        page_param_field,
        transport: transport.clone(),
        options,
    })
}

impl<S> InfiniteQueryOptions<S> {
    /// Page param of the page following `last_page`, `None` when there is none.
    pub fn get_next_page_param(&self, last_page: &DynamicMessage) -> Option<Value> {
        (self.options.get_next_page_param)(last_page)
    }
}

impl<S> InfiniteQueryOptions<S>
where
    S: tonic::client::GrpcService<tonic::body::Body> + Clone,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    /// Fetches the page for `page_param`: the input with its page field set to `page_param`.
    pub async fn fetch_page(&self, page_param: Value) -> Result<DynamicMessage, CallError> {
        let input = match &self.input {
            QueryInput::Active(input) => {
                let mut input = input.clone();
                input
                    .try_set_field(&self.page_param_field, page_param)
                    .map_err(|err| CallError::InvalidPageParam {
                        field: self.page_param_field.name().to_string(),
                        reason: err.to_string(),
                    })?;
                QueryInput::Active(MessageInit::Message(input))
            }
            QueryInput::Disabled => QueryInput::Disabled,
        };

        tracing::debug!(
            method = self.method.full_name(),
            page_param = self.page_param_field.name(),
            "fetching page"
        );

        call_unary_method(&self.transport, &self.method, input, &self.options.call_options).await
    }

    /// Fetches every page, starting with [`Self::initial_page_param`].
    ///
    /// The stream ends after the last page (see [`Self::get_next_page_param`]) or after the first
    /// error.
    pub fn pages(&self) -> impl Stream<Item = Result<DynamicMessage, CallError>> + '_ {
        stream::unfold(Some(self.initial_page_param.clone()), move |page_param| async move {
            let Some(page_param) = page_param else {
                return None;
            };
            match self.fetch_page(page_param).await {
                Ok(page) => {
                    let next = self.get_next_page_param(&page);
                    Some((Ok(page), next))
                }
                Err(err) => Some((Err(err), None)),
            }
        })
    }
}
