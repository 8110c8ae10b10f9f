use relay_service::Relay;
use relay_service::pb::{Envelope, Event, ProbeReply, ProbeRequest, Receipt, SubscribeRequest};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};

/// Test behavior for the relay fixture:
/// * `Deliver` echoes the envelope back as a receipt.
/// * `Subscribe` emits `count` ordered events, optionally failing midway.
/// * `Probe` sleeps, echoes request metadata, and can attach a payload of a
///   type the client schema does not know.
pub struct RelayImpl;

#[tonic::async_trait]
impl Relay for RelayImpl {
    type SubscribeStream = ReceiverStream<Result<Event, Status>>;

    async fn deliver(&self, request: Request<Envelope>) -> Result<Response<Receipt>, Status> {
        let envelope = request.into_inner();
        Ok(Response::new(Receipt {
            id: envelope.id,
            payload: envelope.payload,
        }))
    }

    async fn subscribe(
        &self,
        request: Request<SubscribeRequest>,
    ) -> Result<Response<Self::SubscribeStream>, Status> {
        let req = request.into_inner();
        let (tx, rx) = mpsc::channel(4);

        tokio::spawn(async move {
            for sequence in 0..req.count {
                if req.fail_after > 0 && sequence >= req.fail_after {
                    tx.send(Err(Status::aborted("subscription interrupted")))
                        .await
                        .ok();
                    return;
                }
                let event = Event {
                    topic: req.topic.clone(),
                    sequence,
                };
                if tx.send(Ok(event)).await.is_err() {
                    return;
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn probe(&self, request: Request<ProbeRequest>) -> Result<Response<ProbeReply>, Status> {
        let incoming = request.metadata().clone();
        let req = request.into_inner();

        if req.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(u64::from(req.delay_ms))).await;
        }

        let mut metadata = HashMap::new();
        for key in &req.echo_keys {
            if let Some(value) = incoming.get(key.as_str())
                && let Ok(value) = value.to_str()
            {
                metadata.insert(key.clone(), value.to_string());
            }
        }

        let mystery = req.include_mystery.then(|| prost_types::Any {
            type_url: "type.googleapis.com/relay.Phantom".to_string(),
            value: b"spooky".to_vec(),
        });

        Ok(Response::new(ProbeReply { metadata, mystery }))
    }
}
