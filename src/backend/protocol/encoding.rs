/**
 * Response Encoding
 *
 * The default way of writing an endpoint's outcome back to the client. The
 * request ID becomes the `ack` of the response and the request's callback
 * becomes its `rpc`, so the client can match the frame to the call it made.
 */

use serde::Serialize;

use crate::backend::error::BackendError;
use crate::backend::protocol::context::RequestContext;
use crate::backend::protocol::push_writer::PushWriter;
use crate::shared::Envelope;

/// Encode `result` as a response frame and write it to `writer`.
///
/// # Arguments
///
/// * `ctx` - Request context seeded by the router
/// * `result` - Endpoint outcome; `Ok` becomes `data`, `Err` becomes `error`
/// * `writer` - Writer of the requesting connection
///
/// # Errors
///
/// - Protocol error when `ctx` was never seeded with a request ID or callback;
///   nothing is written in that case
/// - Transport error when the frame could not be written
pub async fn encode<T: Serialize>(
    ctx: &RequestContext,
    result: Result<T, BackendError>,
    writer: &PushWriter,
) -> Result<(), BackendError> {
    let request_id = ctx.request_id.as_deref().ok_or_else(|| {
        BackendError::protocol(format!("invalid request ID in context: {:?}", ctx.request_id))
    })?;
    let callback = ctx.callback.as_deref().ok_or_else(|| {
        BackendError::protocol(format!("invalid callback in context: {:?}", ctx.callback))
    })?;

    let message = match result.and_then(|data| serde_json::to_value(data).map_err(BackendError::from)) {
        Ok(data) => {
            tracing::info!(rpc = callback, ack = request_id, response = %data, "sending response");
            Envelope::response(callback, request_id, data)
        }
        Err(err) => {
            let text = err.message();
            tracing::info!(rpc = callback, ack = request_id, error = %text, "sending error response");
            Envelope::error_response(callback, request_id, text)
        }
    };
    writer.encode(&message).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::protocol::connection::Connection;
    use crate::backend::protocol::push_writer::ChannelSink;
    use pretty_assertions::assert_eq;
    use serde::ser::Error as _;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn writer() -> (PushWriter, UnboundedReceiver<String>) {
        let (sink, rx) = ChannelSink::new();
        let ctx = RequestContext::connection("127.0.0.1", "test");
        (PushWriter::new(Connection::from_context(&ctx).unwrap(), Box::new(sink)), rx)
    }

    fn seeded(request_id: &str, callback: &str) -> RequestContext {
        RequestContext {
            request_id: Some(request_id.into()),
            callback: Some(callback.into()),
            ..Default::default()
        }
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot serialize"))
        }
    }

    #[tokio::test]
    async fn test_success_frame() {
        let (writer, mut rx) = writer();
        encode(&seeded("X", "C"), Ok(vec![1, 2]), &writer).await.unwrap();
        let frame = Envelope::parse(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame.ack, "X");
        assert_eq!(frame.rpc, "C");
        assert_eq!(frame.data, Some(serde_json::json!([1, 2])));
        assert_eq!(frame.error, "");
    }

    #[tokio::test]
    async fn test_error_frame_omits_data() {
        let (writer, mut rx) = writer();
        encode::<()>(&seeded("X", "C"), Err(BackendError::handler("boom!")), &writer)
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), r#"{"rpc":"C","ack":"X","error":"boom!"}"#);
    }

    #[tokio::test]
    async fn test_unit_result_is_null_data() {
        let (writer, mut rx) = writer();
        encode(&seeded("X", ""), Ok(()), &writer).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), r#"{"ack":"X","data":null}"#);
    }

    #[tokio::test]
    async fn test_serialization_failure_becomes_error_frame() {
        let (writer, mut rx) = writer();
        encode(&seeded("X", "C"), Ok(Unserializable), &writer).await.unwrap();
        let frame = Envelope::parse(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame.ack, "X");
        assert!(frame.data.is_none());
        assert!(frame.error.contains("cannot serialize"));
    }

    #[tokio::test]
    async fn test_missing_context_values() {
        let (writer, mut rx) = writer();
        let ctx = RequestContext {
            callback: Some(String::new()),
            ..Default::default()
        };
        let err = encode(&ctx, Ok(()), &writer).await.unwrap_err();
        assert_eq!(err.kind(), crate::backend::error::ErrorKind::Protocol);

        let ctx = RequestContext {
            request_id: Some("X".into()),
            ..Default::default()
        };
        assert!(encode(&ctx, Ok(()), &writer).await.is_err());

        drop(writer);
        assert!(rx.recv().await.is_none());
    }
}
