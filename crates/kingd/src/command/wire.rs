//! JSON wire form of commands.
//!
//! Every command and procedure travels as a two-element array whose head is
//! a string tag: `["pier", "/ships/zod"]`, `["boot", {...}]`. The shape is
//! checked before the tag, and the tag before the payload.

use camino::Utf8PathBuf;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::identity::Identity;
use crate::seed::{SeedError, decode_seed};

use super::{
    BootCommand, BootProcedure, Command, CompletePill, CredentialSet, Event, IncompletePill,
    PillSpec,
};

/// Protocol violations in an incoming directive.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The value was not a `[tag, payload]` pair.
    #[error("malformed {context}: expected a [tag, payload] pair")]
    Malformed {
        /// What was being decoded.
        context: &'static str,
    },
    /// The tag was not one of the known atoms.
    #[error("unknown {context} tag '{tag}'")]
    UnknownTag {
        /// What was being decoded.
        context: &'static str,
        /// Offending tag.
        tag: String,
    },
    /// The payload did not match the tag's shape.
    #[error("invalid {context} payload: {message}")]
    Payload {
        /// What was being decoded.
        context: &'static str,
        /// Deserializer failure description.
        message: String,
    },
    /// A dawn seed failed validation.
    #[error(transparent)]
    Seed(#[from] SeedError),
    /// The command is declared but not handled by this daemon.
    #[error("command '{0}' is not supported")]
    Unsupported(&'static str),
    /// A resume command carried no pier path.
    #[error("pier command requires a pier path")]
    MissingPierPath,
}

#[derive(Deserialize)]
struct BootPayload {
    procedure: Value,
    pill: Value,
    pier: Utf8PathBuf,
}

#[derive(Deserialize)]
struct RootPayload {
    ship: Identity,
    #[serde(default)]
    credentials: CredentialSet,
}

#[derive(Deserialize)]
struct CompletePayload {
    payload: Vec<u8>,
    #[serde(default)]
    override_event: Option<Event>,
}

#[derive(Deserialize)]
struct IncompletePayload {
    payload: Vec<u8>,
    #[serde(default)]
    module_events: Vec<Event>,
    #[serde(default)]
    userspace_events: Vec<Event>,
}

/// Decodes a command from its JSON wire form.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] for a value that is not a tagged
/// pair, [`ProtocolError::UnknownTag`] for an unrecognised tag, and
/// [`ProtocolError::Payload`] or [`ProtocolError::Seed`] when the payload is
/// invalid.
pub fn decode_command(value: Value) -> Result<Command, ProtocolError> {
    const CONTEXT: &str = "command";
    let (tag, payload) = tagged_pair(value, CONTEXT)?;
    match tag.as_str() {
        "boot" => {
            let boot: BootPayload = payload_as(payload, CONTEXT)?;
            Ok(Command::Boot(BootCommand {
                procedure: decode_procedure(boot.procedure)?,
                pill: decode_pill(boot.pill)?,
                pier: boot.pier,
            }))
        }
        "exit" => Ok(Command::Exit),
        "pier" => Ok(Command::AcquirePier {
            path: payload_as(payload, CONTEXT)?,
        }),
        "root" => {
            let root: RootPayload = payload_as(payload, CONTEXT)?;
            Ok(Command::RootAction {
                identity: root.ship,
                credentials: root.credentials,
            })
        }
        _ => Err(ProtocolError::UnknownTag {
            context: CONTEXT,
            tag,
        }),
    }
}

fn decode_procedure(value: Value) -> Result<BootProcedure, ProtocolError> {
    const CONTEXT: &str = "boot procedure";
    let (tag, payload) = tagged_pair(value, CONTEXT)?;
    match tag.as_str() {
        "come" => Ok(BootProcedure::Comet {
            parent: payload_as(payload, CONTEXT)?,
        }),
        "dawn" => {
            let encoded: String = payload_as(payload, CONTEXT)?;
            Ok(BootProcedure::Dawn {
                seed: decode_seed(encoded, None)?,
            })
        }
        "fake" => Ok(BootProcedure::Fake {
            identity: payload_as(payload, CONTEXT)?,
        }),
        _ => Err(ProtocolError::UnknownTag {
            context: CONTEXT,
            tag,
        }),
    }
}

fn decode_pill(value: Value) -> Result<PillSpec, ProtocolError> {
    const CONTEXT: &str = "pill";
    let (tag, payload) = tagged_pair(value, CONTEXT)?;
    match tag.as_str() {
        "complete" => {
            let pill: CompletePayload = payload_as(payload, CONTEXT)?;
            Ok(PillSpec::Complete(CompletePill {
                payload: pill.payload,
                override_event: pill.override_event,
            }))
        }
        "incomplete" => {
            let pill: IncompletePayload = payload_as(payload, CONTEXT)?;
            Ok(PillSpec::Incomplete(IncompletePill {
                payload: pill.payload,
                module_events: pill.module_events,
                userspace_events: pill.userspace_events,
            }))
        }
        _ => Err(ProtocolError::UnknownTag {
            context: CONTEXT,
            tag,
        }),
    }
}

fn tagged_pair(value: Value, context: &'static str) -> Result<(String, Value), ProtocolError> {
    let malformed = || ProtocolError::Malformed { context };
    let Value::Array(items) = value else {
        return Err(malformed());
    };
    let Ok([head, payload]) = <[Value; 2]>::try_from(items) else {
        return Err(malformed());
    };
    match head {
        Value::String(tag) => Ok((tag, payload)),
        _ => Err(malformed()),
    }
}

fn payload_as<T: DeserializeOwned>(payload: Value, context: &'static str) -> Result<T, ProtocolError> {
    serde_json::from_value(payload).map_err(|error| ProtocolError::Payload {
        context,
        message: error.to_string(),
    })
}
