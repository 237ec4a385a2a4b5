//! The tagged envelopes every operation answers with.

use std::error::Error;

use csw_catalog::DiscoveryError;
use serde::Serialize;
use serde_json::Value;

pub const SERVICE_NAME: &str = "data";

/// The operations a failure can be attributed to, used for documentation
/// links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Products,
    ProductDetail,
    Records,
    Query,
    MutationState,
}

impl Operation {
    fn links(&self) -> Vec<String> {
        let link = match self {
            Operation::Products => "#tag/EO-Data-Discovery/paths/~1data/get",
            Operation::ProductDetail => "#tag/EO-Data-Discovery/paths/~1collections~1{name}/get",
            Operation::Records | Operation::Query => {
                "#tag/EO-Data-Discovery/paths/~1data~1{name}~1records/get"
            },
            Operation::MutationState => return Vec::new(),
        };
        vec![link.to_string()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub service: String,
    pub code: u16,
    pub user_id: String,
    pub msg: String,
    pub internal: bool,
    pub links: Vec<String>,
}

/// The serialized answer of an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope {
    Success { code: u16, data: Value },
    Error(Failure),
}

impl Envelope {
    pub fn success(data: impl Serialize, operation: Operation, user_id: &str) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Envelope::Success { code: 200, data },
            Err(err) => Envelope::Error(Failure {
                service: SERVICE_NAME.to_string(),
                code: 500,
                user_id: user_id.to_string(),
                msg: format!("failed to serialize response: {err}"),
                internal: true,
                links: operation.links(),
            }),
        }
    }

    pub fn error(err: &DiscoveryError, operation: Operation, user_id: &str) -> Self {
        Envelope::Error(Failure {
            service: SERVICE_NAME.to_string(),
            code: err.status_code().as_u16(),
            user_id: user_id.to_string(),
            msg: error_chain(err),
            internal: err.is_internal(),
            links: operation.links(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success { .. })
    }

    pub fn code(&self) -> u16 {
        match self {
            Envelope::Success { code, .. } => *code,
            Envelope::Error(failure) => failure.code,
        }
    }
}

/// Render an error and its sources as a single message.
fn error_chain(err: &dyn Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
