//! gRPC server answering the unary methods of the test schemas.
//!
//! | Method              | Behaviour                                                            |
//! |---------------------|----------------------------------------------------------------------|
//! | `ElizaService/Say`  | Replies `You said: {sentence}`, greeting the `x-user-name` header    |
//! |                     | when present. An empty sentence is `INVALID_ARGUMENT`.               |
//! | `ListService/List`  | Two items per page, pages `0..=2`. No `next_page` on the last page.  |
//! | `ListService/Count` | The length of `query`.                                               |
//!
//! The streaming methods of `ElizaService` answer `UNIMPLEMENTED`.
use crate::pb::{
    eliza::{
        ConverseRequest, ConverseResponse, IntroduceRequest, IntroduceResponse, SayRequest,
        SayResponse,
        eliza_service_server::{ElizaService, ElizaServiceServer},
    },
    pagination::{
        CountRequest, CountResponse, ListRequest, ListResponse,
        list_service_server::{ListService, ListServiceServer},
    },
};
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tonic::{Request, Response, Status, Streaming, service::Routes, transport::Server};

/// Index of the last page served by `ListService/List`.
pub const LAST_PAGE: i64 = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct Eliza;

#[tonic::async_trait]
impl ElizaService for Eliza {
    type ConverseStream = ReceiverStream<Result<ConverseResponse, Status>>;
    type IntroduceStream = ReceiverStream<Result<IntroduceResponse, Status>>;

    async fn say(&self, request: Request<SayRequest>) -> Result<Response<SayResponse>, Status> {
        let name = request
            .metadata()
            .get("x-user-name")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let sentence = request.into_inner().sentence;
        if sentence.is_empty() {
            return Err(Status::invalid_argument("sentence must not be empty"));
        }

        let sentence = match name {
            Some(name) => format!("Hello {name}, you said: {sentence}"),
            None => format!("You said: {sentence}"),
        };
        Ok(Response::new(SayResponse { sentence }))
    }

    async fn converse(
        &self,
        _request: Request<Streaming<ConverseRequest>>,
    ) -> Result<Response<Self::ConverseStream>, Status> {
        Err(Status::unimplemented("Converse is not served by the test server"))
    }

    async fn introduce(
        &self,
        _request: Request<IntroduceRequest>,
    ) -> Result<Response<Self::IntroduceStream>, Status> {
        Err(Status::unimplemented("Introduce is not served by the test server"))
    }

    async fn reflect(
        &self,
        _request: Request<Streaming<SayRequest>>,
    ) -> Result<Response<SayResponse>, Status> {
        Err(Status::unimplemented("Reflect is not served by the test server"))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Pager;

#[tonic::async_trait]
impl ListService for Pager {
    async fn list(&self, request: Request<ListRequest>) -> Result<Response<ListResponse>, Status> {
        let ListRequest { page, query } = request.into_inner();
        if !(0..=LAST_PAGE).contains(&page) {
            return Err(Status::out_of_range(format!("page {page} does not exist")));
        }

        Ok(Response::new(ListResponse {
            page,
            items: (0..2).map(|i| format!("{query}-{page}-{i}")).collect(),
            next_page: (page < LAST_PAGE).then_some(page + 1),
        }))
    }

    async fn count(
        &self,
        request: Request<CountRequest>,
    ) -> Result<Response<CountResponse>, Status> {
        let count = request.into_inner().query.len() as i64;
        Ok(Response::new(CountResponse { count }))
    }
}

/// Both test services, callable in-process without a socket.
pub fn test_server() -> Routes {
    Routes::new(ElizaServiceServer::new(Eliza)).add_service(ListServiceServer::new(Pager))
}

/// Serves [`test_server`] on a free local port and returns its URL.
///
/// # Panics
///
/// If no port can be bound.
pub async fn spawn_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();

    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        Server::builder()
            .add_routes(test_server())
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    format!("http://{}", addr)
}
