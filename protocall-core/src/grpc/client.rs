//! # Generic gRPC Client
//!
//! This module wraps a standard `tonic` client to provide a generic interface
//! for gRPC communication. It is agnostic to the specific Protobuf messages
//! being exchanged.
//!
//! ## How it works
//!
//! The [`GrpcClient`] utilizes the [`super::codec::JsonCodec`] to handle
//! serialization. It does not need to know the structure of the data it is
//! sending; it simply ensures the connection is established and passes the
//! `serde_json::Value` and `MethodDescriptor` to the codec.
//!
//! ## Features
//!
//! * **Dynamic Pathing**: Constructs the HTTP/2 path (e.g., `/package.Service/Method`) at runtime.
//! * **Metadata Handling**: Sanitizes and converts string tuples into Tonic's `MetadataMap`.
//! * **Deadlines**: Propagates a per-call timeout as the `grpc-timeout` request header.
use super::codec::JsonCodec;
use super::transcode::DecodeMode;
use crate::BoxError;
use futures_util::Stream;
use http_body::Body as HttpBody;
use prost_reflect::MethodDescriptor;
use std::str::FromStr;
use std::time::Duration;
use tonic::{
    client::GrpcService,
    metadata::{
        MetadataKey, MetadataValue,
        errors::{InvalidMetadataKey, InvalidMetadataValue},
    },
    transport::Channel,
};

#[derive(thiserror::Error, Debug)]
pub enum GrpcRequestError {
    #[error("Internal error, the client was not ready: '{0}'")]
    ClientNotReady(#[source] BoxError),
    #[error("Invalid metadata (header) key '{key}': '{source}'")]
    InvalidMetadataKey {
        key: String,
        source: InvalidMetadataKey,
    },
    #[error("Invalid metadata (header) value for key '{key}': '{source}'")]
    InvalidMetadataValue {
        key: String,
        source: InvalidMetadataValue,
    },
}

/// A schema-agnostic gRPC client speaking JSON at the call boundary.
pub struct GrpcClient<S = Channel> {
    client: tonic::client::Grpc<S>,
}

impl<S> GrpcClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        let client = tonic::client::Grpc::new(service);
        Self { client }
    }

    /// Performs a Unary gRPC call (Single Request -> Single Response).
    ///
    /// # Returns
    /// * `Ok(Ok(Value))` - Successful RPC execution.
    /// * `Ok(Err(Status))` - RPC executed, but server returned an error.
    /// * `Err(GrpcRequestError)` - Failed to send the request.
    pub async fn unary(
        &mut self,
        method: MethodDescriptor,
        payload: serde_json::Value,
        headers: &[(String, String)],
        timeout: Option<Duration>,
        mode: DecodeMode,
    ) -> Result<Result<serde_json::Value, tonic::Status>, GrpcRequestError> {
        self.client
            .ready()
            .await
            .map_err(|e| GrpcRequestError::ClientNotReady(e.into()))?;

        let codec = JsonCodec::new(method.input(), method.output(), mode);
        let path = http_path(&method);
        let request = build_request(payload, headers, timeout)?;

        match self.client.unary(request, path, codec).await {
            Ok(response) => Ok(Ok(response.into_inner())),
            Err(status) => Ok(Err(status)),
        }
    }

    /// Performs a Server Streaming gRPC call (Single Request -> Stream of Responses).
    ///
    /// # Returns
    ///
    /// * `Ok(Ok(Stream))` - Successful RPC execution.
    /// * `Ok(Err(Status))` - RPC executed, but server returned an error.
    /// * `Err(GrpcRequestError)` - Failed to send the request.
    pub async fn server_streaming(
        &mut self,
        method: MethodDescriptor,
        payload: serde_json::Value,
        headers: &[(String, String)],
        timeout: Option<Duration>,
        mode: DecodeMode,
    ) -> Result<
        Result<impl Stream<Item = Result<serde_json::Value, tonic::Status>>, tonic::Status>,
        GrpcRequestError,
    > {
        self.client
            .ready()
            .await
            .map_err(|e| GrpcRequestError::ClientNotReady(e.into()))?;

        let codec = JsonCodec::new(method.input(), method.output(), mode);
        let path = http_path(&method);
        let request = build_request(payload, headers, timeout)?;

        match self.client.server_streaming(request, path, codec).await {
            Ok(response) => Ok(Ok(response.into_inner())),
            Err(status) => Ok(Err(status)),
        }
    }
}

/// Normalizes user-supplied metadata before transmission: keys are trimmed
/// and lowercased, values are trimmed, and pairs left with an empty key or
/// value are dropped.
pub(crate) fn sanitize_metadata(pairs: &[(String, String)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .filter_map(|(key, value)| {
            let key = key.trim().to_lowercase();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                None
            } else {
                Some((key, value.to_string()))
            }
        })
        .collect()
}

fn http_path(method: &MethodDescriptor) -> http::uri::PathAndQuery {
    let path = format!("/{}/{}", method.parent_service().full_name(), method.name());
    http::uri::PathAndQuery::from_str(&path).expect("valid gRPC path")
}

fn build_request<T>(
    payload: T,
    headers: &[(String, String)],
    timeout: Option<Duration>,
) -> Result<tonic::Request<T>, GrpcRequestError> {
    let mut request = tonic::Request::new(payload);
    for (k, v) in headers {
        let key =
            MetadataKey::from_str(k).map_err(|source| GrpcRequestError::InvalidMetadataKey {
                key: k.clone(),
                source,
            })?;
        let val = MetadataValue::from_str(v).map_err(|source| {
            GrpcRequestError::InvalidMetadataValue {
                key: k.clone(),
                source,
            }
        })?;
        request.metadata_mut().insert(key, val);
    }
    if let Some(timeout) = timeout {
        request.set_timeout(timeout);
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn metadata_keys_are_lowercased_and_trimmed() {
        let sanitized = sanitize_metadata(&[pair(" X-Trace-Id ", " abc "), pair("ok", "1")]);
        assert_eq!(sanitized, vec![pair("x-trace-id", "abc"), pair("ok", "1")]);
    }

    #[test]
    fn empty_keys_or_values_are_dropped() {
        let sanitized = sanitize_metadata(&[
            pair("", "value"),
            pair("  ", "value"),
            pair("key", ""),
            pair("key", "   "),
            pair("keep", "yes"),
        ]);
        assert_eq!(sanitized, vec![pair("keep", "yes")]);
    }

    #[test]
    fn invalid_metadata_key_is_reported_with_its_key() {
        let err = build_request((), &[pair("bad key", "v")], None).unwrap_err();
        match err {
            GrpcRequestError::InvalidMetadataKey { key, .. } => assert_eq!(key, "bad key"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn valid_headers_land_in_request_metadata() {
        let request = build_request((), &[pair("x-trace-id", "abc")], None).unwrap();
        assert_eq!(
            request.metadata().get("x-trace-id").map(|v| v.as_bytes()),
            Some(&b"abc"[..])
        );
    }
}
