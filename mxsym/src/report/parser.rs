//! JSON → `DiagnosticReport`.
//!
//! The payload may arrive bare or wrapped in an envelope object carrying a
//! `payload` key next to arbitrary metadata. Both forms end up as the same
//! list of diagnostics, so nothing downstream needs to care.

use std::path::Path;

use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::metadata::DiagnosticMetadata;
use super::model::{
    CallStack, CallStackTree, Diagnostic, DiagnosticKind, DiagnosticReport, Frame, ReportEnvelope,
};
use crate::domain::ReportError;

impl DiagnosticReport {
    /// Read and parse a report file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not JSON, or is missing
    /// required structure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|source| ReportError::Read { path: path.to_path_buf(), source })?;
        Self::from_json(&content)
    }

    /// Parse a report from its JSON text.
    ///
    /// # Errors
    /// Returns an error if the text is not JSON or is missing required structure.
    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        // Every frame nests two levels deep, so deep stacks exceed serde_json's
        // default limit of 128. The stacker grows the stack on demand instead.
        let mut deserializer = serde_json::Deserializer::from_str(json);
        deserializer.disable_recursion_limit();
        let value = Value::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
        deserializer.end()?;
        Self::from_value(&value)
    }

    /// Parse a report from an already decoded JSON value.
    ///
    /// # Errors
    /// Returns an error if a required key is absent or has the wrong type.
    pub fn from_value(root: &Value) -> Result<Self, ReportError> {
        let root = as_object(root, "payload", "report")?;

        let (envelope, payload) = match root.get("payload") {
            Some(payload) => {
                debug!("Report is wrapped in an envelope");
                (Some(parse_envelope(root)), as_object(payload, "payload", "report")?)
            }
            None => (None, root),
        };

        let time_range = match (
            payload.get("timeStampBegin").and_then(Value::as_str),
            payload.get("timeStampEnd").and_then(Value::as_str),
        ) {
            (Some(begin), Some(end)) => Some((begin.to_string(), end.to_string())),
            _ => None,
        };

        let mut diagnostics = Vec::new();
        for kind in DiagnosticKind::ALL {
            let key = kind.payload_key();
            let Some(entries) = payload.get(key) else {
                continue;
            };
            let entries = as_array(entries, key, "payload")?;
            if kind == DiagnosticKind::Crash && entries.len() > 1 {
                warn!("Report contains {} crash diagnostics", entries.len());
            }
            for (idx, entry) in entries.iter().enumerate() {
                let location = format!("{key}[{idx}]");
                diagnostics.push(parse_diagnostic(kind, entry, &location)?);
            }
        }

        Ok(Self { envelope, time_range, diagnostics })
    }
}

fn parse_envelope(root: &Map<String, Value>) -> ReportEnvelope {
    let text = |key: &str| -> Option<String> {
        match root.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    };

    ReportEnvelope {
        customer_id: text("customer_id"),
        timestamp: root.get("timestamp").and_then(Value::as_f64),
        os_version: text("os_version"),
        device_model: text("device_model"),
    }
}

fn parse_diagnostic(
    kind: DiagnosticKind,
    value: &Value,
    location: &str,
) -> Result<Diagnostic, ReportError> {
    let diag = as_object(value, kind.payload_key(), location)?;

    let metadata = match diag.get("diagnosticMetaData") {
        Some(meta) => DiagnosticMetadata::deserialize(meta).map_err(|_| {
            ReportError::InvalidField {
                field: "diagnosticMetaData",
                location: location.to_string(),
                expected: "an object of metadata values",
            }
        })?,
        None => DiagnosticMetadata::default(),
    };

    let tree = diag.get("callStackTree").ok_or_else(|| ReportError::MissingField {
        field: "callStackTree",
        location: location.to_string(),
    })?;
    let tree_location = format!("{location}.callStackTree");
    let call_stack_tree = parse_call_stack_tree(tree, &tree_location)?;

    Ok(Diagnostic { kind, metadata, call_stack_tree })
}

fn parse_call_stack_tree(value: &Value, location: &str) -> Result<CallStackTree, ReportError> {
    let tree = as_object(value, "callStackTree", location)?;

    let call_stack_per_thread =
        tree.get("callStackPerThread").and_then(Value::as_bool).unwrap_or(false);

    let stacks = tree.get("callStacks").ok_or_else(|| ReportError::MissingField {
        field: "callStacks",
        location: location.to_string(),
    })?;

    let call_stacks = as_array(stacks, "callStacks", location)?
        .iter()
        .enumerate()
        .map(|(idx, stack)| parse_call_stack(stack, &format!("{location}.callStacks[{idx}]")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CallStackTree { call_stack_per_thread, call_stacks })
}

fn parse_call_stack(value: &Value, location: &str) -> Result<CallStack, ReportError> {
    let stack = as_object(value, "callStacks", location)?;

    let thread_attributed =
        stack.get("threadAttributed").and_then(Value::as_bool).unwrap_or(false);

    let roots = stack.get("callStackRootFrames").ok_or_else(|| ReportError::MissingField {
        field: "callStackRootFrames",
        location: location.to_string(),
    })?;

    let root_frames = as_array(roots, "callStackRootFrames", location)?
        .iter()
        .enumerate()
        .map(|(idx, frame)| {
            parse_frame(frame, &format!("{location}.callStackRootFrames[{idx}]"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CallStack { thread_attributed, root_frames })
}

fn parse_frame(value: &Value, location: &str) -> Result<Frame, ReportError> {
    let frame = as_object(value, "subFrames", location)?;

    let binary_name = frame.get("binaryName").and_then(Value::as_str).map(str::to_string);

    let binary_uuid = frame.get("binaryUUID").and_then(Value::as_str).and_then(|raw| {
        Uuid::parse_str(raw)
            .map_err(|e| warn!("Ignoring unparsable binaryUUID '{raw}' at {location}: {e}"))
            .ok()
    });

    let sub_frames = match frame.get("subFrames") {
        Some(children) => as_array(children, "subFrames", location)?
            .iter()
            .enumerate()
            .map(|(idx, child)| parse_frame(child, &format!("{location}.subFrames[{idx}]")))
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    Ok(Frame {
        binary_name,
        binary_uuid,
        load_address: frame.get("offsetIntoBinaryTextSegment").and_then(Value::as_u64),
        address: frame.get("address").and_then(Value::as_u64),
        sample_count: frame.get("sampleCount").and_then(Value::as_u64),
        sub_frames,
    })
}

fn as_object<'a>(
    value: &'a Value,
    field: &'static str,
    location: &str,
) -> Result<&'a Map<String, Value>, ReportError> {
    value.as_object().ok_or_else(|| ReportError::InvalidField {
        field,
        location: location.to_string(),
        expected: "an object",
    })
}

fn as_array<'a>(
    value: &'a Value,
    field: &'static str,
    location: &str,
) -> Result<&'a Vec<Value>, ReportError> {
    value.as_array().ok_or_else(|| ReportError::InvalidField {
        field,
        location: location.to_string(),
        expected: "an array",
    })
}
