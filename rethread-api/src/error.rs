use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde_json::json;
use uuid::Uuid;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Thread not found {0}")]
    ThreadNotFound(Uuid),

    #[error("Post not found {0}")]
    PostNotFound(Uuid),

    #[error("Comment not found {0}")]
    CommentNotFound(Uuid),

    #[error("Uuid already used {0}")]
    UuidAlreadyUsed(Uuid),

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),
}

impl Error {
    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::PermissionDenied => json!({
                "message": "permission denied",
                "type": "permission-denied",
            }),
            Error::ThreadNotFound(u) => json!({
                "message": "thread not found",
                "type": "thread-not-found",
                "uuid": u,
            }),
            Error::PostNotFound(u) => json!({
                "message": "post not found",
                "type": "post-not-found",
                "uuid": u,
            }),
            Error::CommentNotFound(u) => json!({
                "message": "comment not found",
                "type": "comment-not-found",
                "uuid": u,
            }),
            Error::UuidAlreadyUsed(u) => json!({
                "message": "uuid conflict",
                "type": "conflict-uuid",
                "uuid": u,
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let uuid = || -> anyhow::Result<Uuid> {
            data.get("uuid")
                .and_then(|uuid| uuid.as_str())
                .and_then(|uuid| Uuid::from_str(uuid).ok())
                .ok_or_else(|| anyhow!("error is expected to carry a uuid but has none"))
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(String::from(
                    data.get("message")
                        .and_then(|msg| msg.as_str())
                        .unwrap_or(""),
                )),
                "permission-denied" => Error::PermissionDenied,
                "thread-not-found" => Error::ThreadNotFound(uuid()?),
                "post-not-found" => Error::PostNotFound(uuid()?),
                "comment-not-found" => Error::CommentNotFound(uuid()?),
                "conflict-uuid" => Error::UuidAlreadyUsed(uuid()?),
                "null-byte" => Error::NullByteInString(String::from(
                    data.get("string").and_then(|s| s.as_str()).ok_or_else(|| {
                        anyhow!("error is a null-byte-in-string without a string")
                    })?,
                )),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}
