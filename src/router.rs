//! Subject-keyed dispatch between encoded messages and [`ExperimentService`].
//!
//! ## Contract
//!
//! | Subject                 | Body                       | Reply `result`              |
//! |-------------------------|----------------------------|-----------------------------|
//! | `get_experiment`        | `GetExperimentRequest`     | `GetExperimentResponse`     |
//! | `start_experiment`      | `StartExperimentRequest`   | `StartExperimentResponse`   |
//! | `finish_experiment`     | `FinishExperimentRequest`  | *(none)*                    |
//! | `start_episode`         | `StartEpisodeRequest`      | `StartEpisodeResponse`      |
//! | `finish_episode`        | `FinishEpisodeRequest`     | `FinishEpisodeResponse`     |
//! | `update_ghost_movement` | `UpdateGhostMovement`      | *(none)*                    |
//! | `record_step`           | `RecordStep`               | *(none)*                    |
//!
//! Transport (HTTP, IPC, stdin…) is the caller's business; the router only
//! sees a subject and a text body.

use crate::error::{ProtocolError, Result};
use crate::protocol::{self, subjects, Reply, Request};
use crate::service::ExperimentService;
use bytes::Bytes;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct Router {
    service: Arc<ExperimentService>,
}

impl Router {
    pub fn new(service: Arc<ExperimentService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<ExperimentService> {
        &self.service
    }

    /// Typed dispatch for in-process callers.
    pub fn dispatch(&self, subject: &str, body: &str) -> Result<Option<Value>> {
        let body: Value = protocol::decode(body)?;
        self.route(subject, body)
    }

    /// Dispatch and wrap the outcome in an encoded [`Reply`].
    pub fn handle(&self, subject: &str, body: &str) -> Bytes {
        let reply = match self.dispatch(subject, body) {
            Ok(result) => Reply::ok(subject, result),
            Err(e) => {
                warn!("Rejected {}: {}", subject, e);
                Reply::failed(subject, e)
            }
        };
        encode_reply(&reply)
    }

    /// Handle one encoded [`Request`] envelope.
    pub fn handle_request(&self, line: &str) -> Bytes {
        let request: Request = match protocol::decode(line) {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejected request envelope: {}", e);
                return encode_reply(&Reply::failed("", e));
            }
        };
        let reply = match self.route(&request.subject, request.body) {
            Ok(result) => Reply::ok(&request.subject, result),
            Err(e) => {
                warn!("Rejected {}: {}", request.subject, e);
                Reply::failed(&request.subject, e)
            }
        };
        encode_reply(&reply)
    }

    fn route(&self, subject: &str, body: Value) -> Result<Option<Value>> {
        let svc = &self.service;
        match subject {
            subjects::GET_EXPERIMENT => respond(svc.get_experiment(&parse(body)?)?),
            subjects::START_EXPERIMENT => respond(svc.start_experiment(&parse(body)?)?),
            subjects::FINISH_EXPERIMENT => {
                svc.finish_experiment(&parse(body)?)?;
                Ok(None)
            }
            subjects::START_EPISODE => respond(svc.start_episode(&parse(body)?)?),
            subjects::FINISH_EPISODE => respond(svc.finish_episode(&parse(body)?)?),
            subjects::UPDATE_GHOST_MOVEMENT => {
                svc.update_ghost(&parse(body)?);
                Ok(None)
            }
            subjects::RECORD_STEP => {
                svc.record_step(parse(body)?)?;
                Ok(None)
            }
            other => Err(ProtocolError::UnknownSubject(other.to_string())),
        }
    }
}

fn parse<T: DeserializeOwned>(body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(ProtocolError::Decode)
}

fn respond<T: Serialize>(value: T) -> Result<Option<Value>> {
    serde_json::to_value(value)
        .map(Some)
        .map_err(ProtocolError::Encode)
}

fn encode_reply(reply: &Reply) -> Bytes {
    match serde_json::to_vec(reply) {
        Ok(payload) => Bytes::from(payload),
        Err(e) => {
            warn!("Failed to serialise reply for {}: {}", reply.subject, e);
            Bytes::new()
        }
    }
}
