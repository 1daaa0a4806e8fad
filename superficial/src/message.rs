// SPDX-FileCopyrightText: 2025 2025 Contributors to the superficial project.
// SPDX-License-Identifier: Apache-2.0

//! Decoding of bus messages into [`BusEvent`]s.
//!
//! A `BusEvent` is a fixed header (kind, origin element, sequence number) plus
//! an open field map. The map is filled from the message structure verbatim,
//! so fields added by newer GStreamer versions pass through untouched.
//!
//! ## Decoding policy
//! - Every message decodes; unrecognized types become [`EventKind::Unknown`]
//!   keeping their type name and every field.
//! - `state-changed` additionally carries typed old/new/pending states.
//! - `error`, `warning` and `info` expose `message` and `debug`, plus the
//!   fields of their details structure (e.g. `redirect-location`).
//! - Values with a natural scalar form become typed [`FieldValue`]s; anything
//!   else is kept in its GStreamer serialized string form.

use std::collections::BTreeMap;

use glib::translate::IntoGlib;
use gst::MessageView;
use gst::prelude::*;
use gstreamer as gst;
use serde::Serialize;

use crate::state::PipelineState;

/// Open field mapping of a bus event, ordered by key.
pub type Fields = BTreeMap<String, FieldValue>;

/// A single field value copied out of a message structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean.
    Bool(bool),
    /// Any signed integer type.
    Int(i64),
    /// Any unsigned integer type.
    UInt(u64),
    /// Any floating point type.
    Float(f64),
    /// String.
    Str(String),
    /// A value with no scalar mapping, kept in its serialized form.
    Serialized {
        /// GLib type name of the original value.
        #[serde(rename = "type")]
        type_name: String,
        /// GStreamer serialization of the value.
        value: String,
    },
}

impl FieldValue {
    /// Copies a GLib value into a `FieldValue`.
    pub fn from_value(value: &glib::Value) -> FieldValue {
        let type_ = value.type_();
        let scalar = if type_ == glib::Type::BOOL {
            value.get::<bool>().ok().map(FieldValue::Bool)
        } else if type_ == glib::Type::I8 {
            value.get::<i8>().ok().map(|v| FieldValue::Int(v.into()))
        } else if type_ == glib::Type::U8 {
            value.get::<u8>().ok().map(|v| FieldValue::UInt(v.into()))
        } else if type_ == glib::Type::I32 {
            value.get::<i32>().ok().map(|v| FieldValue::Int(v.into()))
        } else if type_ == glib::Type::I64 {
            value.get::<i64>().ok().map(FieldValue::Int)
        } else if type_ == glib::Type::U32 {
            value.get::<u32>().ok().map(|v| FieldValue::UInt(v.into()))
        } else if type_ == glib::Type::U64 {
            value.get::<u64>().ok().map(FieldValue::UInt)
        } else if type_ == glib::Type::I_LONG {
            value
                .get::<glib::ILong>()
                .ok()
                .map(|v| FieldValue::Int(i64::from(v.0)))
        } else if type_ == glib::Type::U_LONG {
            value
                .get::<glib::ULong>()
                .ok()
                .map(|v| FieldValue::UInt(u64::from(v.0)))
        } else if type_ == glib::Type::F32 {
            value.get::<f32>().ok().map(|v| FieldValue::Float(v.into()))
        } else if type_ == glib::Type::F64 {
            value.get::<f64>().ok().map(FieldValue::Float)
        } else if type_ == glib::Type::STRING {
            value
                .get::<Option<String>>()
                .ok()
                .map(|v| FieldValue::Str(v.unwrap_or_default()))
        } else {
            None
        };

        scalar.unwrap_or_else(|| FieldValue::Serialized {
            type_name: type_.name().to_string(),
            value: value
                .serialize()
                .map(|s| s.to_string())
                .or_else(|_| {
                    value
                        .transform::<String>()
                        .map(|v| v.get::<String>().unwrap_or_default())
                })
                .unwrap_or_default(),
        })
    }

    /// String content, if this is a string field.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content, widening unsigned values that fit.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            FieldValue::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}

/// Kind of a bus event, with typed data where the kind carries some.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// End of stream reached by all sinks.
    Eos,
    /// Fatal error; playback should be considered over.
    Error,
    /// Non-fatal problem.
    Warning,
    /// Informational notice.
    Info,
    /// Stream metadata tags.
    Tag,
    /// Buffering progress (`buffer-percent` field).
    Buffering,
    /// An element changed state.
    StateChanged {
        /// State before the change.
        old: PipelineState,
        /// State reached.
        new: PipelineState,
        /// State still to be reached, or `VoidPending`.
        pending: PipelineState,
    },
    /// Streaming thread status.
    StreamStatus,
    /// Element-specific message.
    Element,
    /// Duration may have changed; query again.
    DurationChanged,
    /// Latency must be recalculated.
    Latency,
    /// An asynchronous state change (preroll, flushing seek) completed.
    AsyncDone,
    /// Quality-of-service report.
    Qos,
    /// Progress of a network or other long operation.
    Progress,
    /// Table of contents.
    Toc,
    /// A new stream started.
    StreamStart,
    /// A device appeared.
    DeviceAdded,
    /// A device disappeared.
    DeviceRemoved,
    /// A device changed.
    DeviceChanged,
    /// A watched property changed.
    PropertyNotify,
    /// Redirect to other locations.
    Redirect,
    /// Request for an instant rate change from a sink.
    InstantRateRequest,
    /// Anything else, identified by its type name.
    Unknown {
        /// GStreamer message type name or structure name.
        type_name: String,
    },
}

impl EventKind {
    /// Type tag as GStreamer names it (`"state-changed"`, `"async-done"`, ...).
    pub fn name(&self) -> &str {
        match self {
            EventKind::Eos => "eos",
            EventKind::Error => "error",
            EventKind::Warning => "warning",
            EventKind::Info => "info",
            EventKind::Tag => "tag",
            EventKind::Buffering => "buffering",
            EventKind::StateChanged { .. } => "state-changed",
            EventKind::StreamStatus => "stream-status",
            EventKind::Element => "element",
            EventKind::DurationChanged => "duration-changed",
            EventKind::Latency => "latency",
            EventKind::AsyncDone => "async-done",
            EventKind::Qos => "qos",
            EventKind::Progress => "progress",
            EventKind::Toc => "toc",
            EventKind::StreamStart => "stream-start",
            EventKind::DeviceAdded => "device-added",
            EventKind::DeviceRemoved => "device-removed",
            EventKind::DeviceChanged => "device-changed",
            EventKind::PropertyNotify => "property-notify",
            EventKind::Redirect => "redirect",
            EventKind::InstantRateRequest => "instant-rate-request",
            EventKind::Unknown { type_name } => type_name,
        }
    }

    /// True for kinds this layer has no typed variant for.
    pub fn is_unknown(&self) -> bool {
        matches!(self, EventKind::Unknown { .. })
    }
}

/// An immutable snapshot of one bus message.
#[derive(Debug, Clone, PartialEq)]
pub struct BusEvent {
    /// Type tag and typed payload.
    pub kind: EventKind,
    /// Name of the object that posted the message.
    pub source: Option<String>,
    /// Message sequence number.
    pub seqnum: u32,
    /// Engine-specific named fields.
    pub fields: Fields,
}

impl BusEvent {
    /// Decodes a bus message. Never fails.
    pub fn from_message(msg: &gst::Message) -> BusEvent {
        let mut fields = Fields::new();
        if let Some(structure) = msg.structure() {
            copy_fields(structure, &mut fields);
        }

        let kind = match msg.view() {
            MessageView::Eos(_) => EventKind::Eos,
            MessageView::Error(err) => {
                report_fields(
                    &mut fields,
                    err.error().to_string(),
                    err.debug().map(|d| d.to_string()),
                    err.details(),
                );
                EventKind::Error
            }
            MessageView::Warning(warning) => {
                report_fields(
                    &mut fields,
                    warning.error().to_string(),
                    warning.debug().map(|d| d.to_string()),
                    warning.details(),
                );
                EventKind::Warning
            }
            MessageView::Info(info) => {
                report_fields(
                    &mut fields,
                    info.error().to_string(),
                    info.debug().map(|d| d.to_string()),
                    info.details(),
                );
                EventKind::Info
            }
            MessageView::Tag(_) => EventKind::Tag,
            MessageView::Buffering(_) => EventKind::Buffering,
            MessageView::StateChanged(changed) => EventKind::StateChanged {
                old: changed.old().into(),
                new: changed.current().into(),
                pending: changed.pending().into(),
            },
            MessageView::StreamStatus(_) => EventKind::StreamStatus,
            MessageView::Element(_) => EventKind::Element,
            MessageView::DurationChanged(_) => EventKind::DurationChanged,
            MessageView::Latency(_) => EventKind::Latency,
            MessageView::AsyncDone(_) => EventKind::AsyncDone,
            MessageView::Qos(_) => EventKind::Qos,
            MessageView::Progress(_) => EventKind::Progress,
            MessageView::Toc(_) => EventKind::Toc,
            MessageView::StreamStart(_) => EventKind::StreamStart,
            MessageView::DeviceAdded(_) => EventKind::DeviceAdded,
            MessageView::DeviceRemoved(_) => EventKind::DeviceRemoved,
            MessageView::DeviceChanged(_) => EventKind::DeviceChanged,
            MessageView::PropertyNotify(_) => EventKind::PropertyNotify,
            MessageView::Redirect(_) => EventKind::Redirect,
            MessageView::InstantRateRequest(_) => EventKind::InstantRateRequest,
            other => EventKind::Unknown {
                type_name: unknown_type_name(&other, msg),
            },
        };

        BusEvent {
            kind,
            source: msg.src().map(|src| src.name().to_string()),
            seqnum: msg.seqnum().into_glib(),
            fields,
        }
    }

    /// Type tag of this event.
    pub fn type_name(&self) -> &str {
        self.kind.name()
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Renders the event as one flat JSON object.
    ///
    /// The object holds `type`, `src` and `seqnum`, then every field. A
    /// `state-changed` event also gets `old-state`, `new-state` and
    /// `pending-state` as GStreamer state names.
    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        for (name, value) in &self.fields {
            object.insert(
                name.clone(),
                serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
            );
        }
        object.insert("type".into(), self.type_name().into());
        object.insert(
            "src".into(),
            self.source
                .clone()
                .map(serde_json::Value::String)
                .unwrap_or(serde_json::Value::Null),
        );
        object.insert("seqnum".into(), self.seqnum.into());
        if let EventKind::StateChanged { old, new, pending } = &self.kind {
            object.insert("old-state".into(), old.as_str().into());
            object.insert("new-state".into(), new.as_str().into());
            object.insert("pending-state".into(), pending.as_str().into());
        }
        serde_json::Value::Object(object)
    }
}

impl Serialize for BusEvent {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn copy_fields(structure: &gst::StructureRef, fields: &mut Fields) {
    for (name, value) in structure.iter() {
        fields.insert(name.to_string(), FieldValue::from_value(value));
    }
}

/// Adds the readable parts of an error/warning/info message.
///
/// The raw `gerror` boxed value has no useful serialization, so it is
/// replaced by its message text.
fn report_fields(
    fields: &mut Fields,
    message: String,
    debug: Option<String>,
    details: Option<&gst::StructureRef>,
) {
    fields.remove("gerror");
    fields.insert("message".into(), FieldValue::Str(message));
    match debug {
        Some(debug) => fields.insert("debug".into(), FieldValue::Str(debug)),
        None => fields.remove("debug"),
    };
    if let Some(details) = details {
        copy_fields(details, fields);
    }
    fields.remove("details");
}

/// Names the message types that have no typed variant.
fn unknown_type_name(view: &MessageView<'_>, msg: &gst::Message) -> String {
    let name = match view {
        MessageView::StateDirty(_) => "state-dirty",
        MessageView::StepDone(_) => "step-done",
        MessageView::ClockProvide(_) => "clock-provide",
        MessageView::ClockLost(_) => "clock-lost",
        MessageView::NewClock(_) => "new-clock",
        MessageView::StructureChange(_) => "structure-change",
        MessageView::Application(_) => "application",
        MessageView::SegmentStart(_) => "segment-start",
        MessageView::SegmentDone(_) => "segment-done",
        MessageView::AsyncStart(_) => "async-start",
        MessageView::RequestState(_) => "request-state",
        MessageView::StepStart(_) => "step-start",
        MessageView::ResetTime(_) => "reset-time",
        MessageView::NeedContext(_) => "need-context",
        MessageView::HaveContext(_) => "have-context",
        MessageView::StreamCollection(_) => "stream-collection",
        MessageView::StreamsSelected(_) => "streams-selected",
        _ => {
            return msg
                .structure()
                .map(|s| s.name().to_string())
                .unwrap_or_else(|| "unknown".to_string());
        }
    };
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() -> gst::Element {
        gst::init().unwrap();
        gst::ElementFactory::make("identity")
            .name("origin")
            .build()
            .unwrap()
    }

    #[test]
    fn state_changed_carries_typed_states() {
        let origin = init();
        let msg = gst::message::StateChanged::builder(
            gst::State::Ready,
            gst::State::Paused,
            gst::State::Playing,
        )
        .src(&origin)
        .build();

        let event = BusEvent::from_message(&msg);
        assert_eq!(
            event.kind,
            EventKind::StateChanged {
                old: PipelineState::Ready,
                new: PipelineState::Paused,
                pending: PipelineState::Playing,
            }
        );
        assert_eq!(event.type_name(), "state-changed");
        assert_eq!(event.source.as_deref(), Some("origin"));

        let json = event.to_json();
        assert_eq!(json["new-state"], "PAUSED");
        assert_eq!(json["pending-state"], "PLAYING");
        assert_eq!(json["src"], "origin");
    }

    #[test]
    fn error_exposes_message_debug_and_details() {
        let origin = init();
        let details = gst::Structure::builder("details")
            .field("redirect-location", "http://example.com/next")
            .build();
        let msg = gst::message::Error::builder(gst::CoreError::Failed, "boom")
            .src(&origin)
            .debug("low-level detail")
            .details(details)
            .build();

        let event = BusEvent::from_message(&msg);
        assert_eq!(event.kind, EventKind::Error);
        assert_eq!(event.field("message").and_then(FieldValue::as_str), Some("boom"));
        assert_eq!(
            event.field("debug").and_then(FieldValue::as_str),
            Some("low-level detail")
        );
        assert_eq!(
            event
                .field("redirect-location")
                .and_then(FieldValue::as_str),
            Some("http://example.com/next")
        );
        assert!(event.field("gerror").is_none());
    }

    #[test]
    fn buffering_fields_pass_through() {
        let origin = init();
        let msg = gst::message::Buffering::builder(42).src(&origin).build();
        let event = BusEvent::from_message(&msg);
        assert_eq!(event.kind, EventKind::Buffering);
        assert_eq!(
            event.field("buffer-percent").and_then(FieldValue::as_i64),
            Some(42)
        );
    }

    #[test]
    fn element_messages_keep_arbitrary_fields() {
        let origin = init();
        let structure = gst::Structure::builder("level")
            .field("rms", 0.25f64)
            .field("channels", 2u32)
            .field("label", "left")
            .field("muted", false)
            .build();
        let msg = gst::message::Element::builder(structure)
            .src(&origin)
            .build();

        let event = BusEvent::from_message(&msg);
        assert_eq!(event.kind, EventKind::Element);
        assert_eq!(event.field("rms"), Some(&FieldValue::Float(0.25)));
        assert_eq!(event.field("channels"), Some(&FieldValue::UInt(2)));
        assert_eq!(event.field("label"), Some(&FieldValue::Str("left".into())));
        assert_eq!(event.field("muted"), Some(&FieldValue::Bool(false)));
    }

    #[test]
    fn narrow_and_long_integers_stay_numeric() {
        let origin = init();
        let structure = gst::Structure::builder("counters")
            .field("signed-char", -7i8)
            .field("unsigned-char", 200u8)
            .field("long", glib::ILong(-40_000))
            .field("unsigned-long", glib::ULong(40_000))
            .build();
        let msg = gst::message::Element::builder(structure)
            .src(&origin)
            .build();

        let event = BusEvent::from_message(&msg);
        assert_eq!(event.field("signed-char"), Some(&FieldValue::Int(-7)));
        assert_eq!(event.field("unsigned-char"), Some(&FieldValue::UInt(200)));
        assert_eq!(event.field("long"), Some(&FieldValue::Int(-40_000)));
        assert_eq!(event.field("unsigned-long"), Some(&FieldValue::UInt(40_000)));
    }

    #[test]
    fn unrecognized_types_are_kept_with_fields() {
        let origin = init();
        let structure = gst::Structure::builder("my-app-event")
            .field("answer", 42i32)
            .build();
        let msg = gst::message::Application::builder(structure)
            .src(&origin)
            .build();

        let event = BusEvent::from_message(&msg);
        assert!(event.kind.is_unknown());
        assert_eq!(event.type_name(), "application");
        assert_eq!(event.field("answer"), Some(&FieldValue::Int(42)));
    }

    #[test]
    fn non_scalar_values_are_serialized() {
        let origin = init();
        let structure = gst::Structure::builder("custom")
            .field("ratio", gst::Fraction::new(30000, 1001))
            .build();
        let msg = gst::message::Element::builder(structure)
            .src(&origin)
            .build();

        let event = BusEvent::from_message(&msg);
        match event.field("ratio") {
            Some(FieldValue::Serialized { type_name, value }) => {
                assert_eq!(type_name, "GstFraction");
                assert_eq!(value, "30000/1001");
            }
            other => panic!("unexpected field {:?}", other),
        }
    }

    #[test]
    fn eos_json_is_flat() {
        let origin = init();
        let msg = gst::message::Eos::builder().src(&origin).build();
        let event = BusEvent::from_message(&msg);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "eos");
        assert_eq!(json["src"], "origin");
        assert!(json.get("old-state").is_none());
    }
}
