//! channel 流适配器测试

mod common;

use common::*;
use flare_grpc_logger::{
    ChannelClientStream, ChannelServerStream, ClientStream, ClientStreamInterceptor, Level,
    MemoryLogger, RpcContext, ServerStream, StreamDesc,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};
use tonic::metadata::{MetadataMap, MetadataValue};
use tonic::{Code, Request, Response, Status};

type Responses = tokio_stream::Iter<std::vec::IntoIter<Result<PingResponse, Status>>>;

fn responses(values: &[&str]) -> Responses {
    let items: Vec<Result<PingResponse, Status>> = values
        .iter()
        .map(|v| {
            Ok(PingResponse {
                value: v.to_string(),
                counter: 0,
            })
        })
        .collect();
    tokio_stream::iter(items)
}

#[test]
fn client_stream_sends_and_receives() {
    tokio_test::block_on(async {
        let (tx, mut rx) = mpsc::channel::<PingRequest>(2);
        let mut stream = ChannelClientStream::new(RpcContext::new(), tx, responses(&["pong"]));

        assert_ok!(stream.send(PingRequest::new("ping")).await);
        assert_eq!(rx.recv().await, Some(PingRequest::new("ping")));

        let first = assert_ok!(stream.recv().await);
        assert_eq!(first.map(|r| r.value), Some("pong".to_string()));
        assert!(assert_ok!(stream.recv().await).is_none());
    });
}

#[test]
fn client_stream_rejects_send_after_close() {
    tokio_test::block_on(async {
        let (tx, mut rx) = mpsc::channel::<PingRequest>(1);
        let mut stream = ChannelClientStream::new(RpcContext::new(), tx, responses(&[]));

        assert_ok!(stream.close_send().await);
        let status = assert_err!(stream.send(PingRequest::new("late")).await);
        assert_eq!(status.code(), Code::FailedPrecondition);
        // 关闭发送端后对端能读到结束
        assert!(rx.recv().await.is_none());
    });
}

#[test]
fn client_stream_reports_closed_peer() {
    tokio_test::block_on(async {
        let (tx, rx) = mpsc::channel::<PingRequest>(1);
        drop(rx);
        let mut stream = ChannelClientStream::new(RpcContext::new(), tx, responses(&[]));

        let status = assert_err!(stream.send(PingRequest::new("lost")).await);
        assert_eq!(status.code(), Code::Unavailable);
    });
}

#[test]
fn client_stream_takes_header_from_response() {
    let (tx, _rx) = mpsc::channel::<PingRequest>(1);
    let mut response = Response::new(responses(&[]));
    response
        .metadata_mut()
        .insert("x-server", MetadataValue::from_static("edge-1"));

    let stream = ChannelClientStream::from_response(RpcContext::new(), tx, response);
    assert_eq!(
        stream.header().get("x-server").and_then(|v| v.to_str().ok()),
        Some("edge-1")
    );
}

#[test]
fn server_stream_header_rules() {
    tokio_test::block_on(async {
        let (tx, mut rx) = mpsc::channel::<Result<PingResponse, Status>>(1);
        let incoming = tokio_stream::iter(Vec::<Result<PingRequest, Status>>::new());
        let mut stream = ChannelServerStream::new(RpcContext::new(), incoming, tx);

        let mut first = MetadataMap::new();
        first.insert("x-a", MetadataValue::from_static("1"));
        let mut second = MetadataMap::new();
        second.insert("x-b", MetadataValue::from_static("2"));

        assert_ok!(stream.set_header(first));
        assert_ok!(stream.send_header(second).await);
        assert!(stream.header_sent());
        assert_eq!(stream.header().len(), 2);

        let mut late = MetadataMap::new();
        late.insert("x-c", MetadataValue::from_static("3"));
        let status = assert_err!(stream.set_header(late));
        assert_eq!(status.code(), Code::Internal);

        let mut trailer = MetadataMap::new();
        trailer.insert("x-t", MetadataValue::from_static("done"));
        stream.set_trailer(trailer);
        assert_eq!(
            stream.trailer().get("x-t").and_then(|v| v.to_str().ok()),
            Some("done")
        );

        assert_ok!(
            stream
                .send(PingResponse {
                    value: "v".to_string(),
                    counter: 1,
                })
                .await
        );
        let sent = rx.recv().await.and_then(|r| r.ok()).map(|r| r.counter);
        assert_eq!(sent, Some(1));
        assert!(assert_ok!(stream.recv().await).is_none());
    });
}

#[test]
fn server_stream_send_marks_header_sent() {
    tokio_test::block_on(async {
        let (tx, _rx) = mpsc::channel::<Result<PingResponse, Status>>(1);
        let incoming = tokio_stream::iter(Vec::<Result<PingRequest, Status>>::new());
        let mut stream = ChannelServerStream::new(RpcContext::new(), incoming, tx);

        assert!(!stream.header_sent());
        assert_ok!(
            stream
                .send(PingResponse {
                    value: "v".to_string(),
                    counter: 0,
                })
                .await
        );
        assert!(stream.header_sent());
    });
}

#[test]
fn server_stream_from_request_builds_context() {
    let (tx, _rx) = mpsc::channel::<Result<PingResponse, Status>>(1);
    let mut request = Request::new(tokio_stream::iter(Vec::<Result<PingRequest, Status>>::new()));
    request.set_timeout(Duration::from_secs(4));

    let stream = ChannelServerStream::from_request(request, tx);
    assert!(stream.context().deadline().is_some());
}

#[tokio::test]
async fn intercepted_channel_stream_logs_full_exchange() {
    let sink = Arc::new(MemoryLogger::new());
    let interceptor = ClientStreamInterceptor::new(sink.clone(), []);
    let desc = StreamDesc::new("PingStream");

    let (tx, mut rx) = mpsc::channel::<PingRequest>(4);
    let mut stream = interceptor
        .intercept(simple_ctx(), &desc, PING_STREAM, |ctx, _desc| async move {
            Ok::<_, Status>(ChannelClientStream::new(ctx, tx, responses(&["a", "b"])))
        })
        .await
        .unwrap();

    stream.send(PingRequest::new("a")).await.unwrap();
    stream.close_send().await.unwrap();
    while stream.recv().await.unwrap().is_some() {}
    assert!(stream.is_finished());
    assert_eq!(rx.recv().await, Some(PingRequest::new("a")));

    let entries = sink.entries();
    let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages.len(), 6);
    assert_eq!(messages[1], "grpc client stream send message");
    assert_eq!(messages[2], "grpc client stream receive message");
    assert_eq!(messages[3], "grpc client stream receive message");
    assert_eq!(messages[4], "grpc client stream receive EOF");
    assert_eq!(entries[5].level, Level::Info);
}
