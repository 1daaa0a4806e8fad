// SPDX-FileCopyrightText: 2025 2025 Contributors to the superficial project.
// SPDX-License-Identifier: Apache-2.0

//! Arena of elements and pads looked up in a pipeline.
//!
//! Lookups hand out small copyable handles instead of GStreamer object
//! references. A handle records which pipeline produced it and in which
//! *generation* of that pipeline's graph; teardown bumps the generation, so a
//! handle kept across `stop()` or `quit()` resolves to [`Error::StaleHandle`]
//! rather than to a dead object.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use glib::ParamFlags;
use glib::translate::{ToGlibPtr, ToGlibPtrMut, from_glib};
use gst::prelude::*;
use gstreamer as gst;
use tracing::debug;

use crate::message::FieldValue;
use crate::pipeline::{CAT, Pipeline};
use crate::{Error, Result};

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// Opaque reference to an element of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    owner: u64,
    generation: u32,
    slot: usize,
}

/// Opaque reference to a pad of an element of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PadHandle {
    owner: u64,
    generation: u32,
    slot: usize,
}

pub(crate) struct Registry {
    owner: u64,
    generation: u32,
    elements: Vec<gst::Element>,
    by_name: HashMap<String, usize>,
    pads: Vec<gst::Pad>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Registry {
            owner: NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
            generation: 0,
            elements: Vec::new(),
            by_name: HashMap::new(),
            pads: Vec::new(),
        }
    }

    /// Handle of a previously looked-up element, by lookup name.
    pub(crate) fn cached(&self, name: &str) -> Option<ElementHandle> {
        self.by_name.get(name).map(|&slot| self.element_handle(slot))
    }

    /// Adds an element (or finds it if already present) and returns its handle.
    pub(crate) fn insert_element(&mut self, name: &str, element: gst::Element) -> ElementHandle {
        let slot = match self.elements.iter().position(|e| *e == element) {
            Some(slot) => slot,
            None => {
                self.elements.push(element);
                self.elements.len() - 1
            }
        };
        self.by_name.insert(name.to_owned(), slot);
        self.element_handle(slot)
    }

    pub(crate) fn insert_pad(&mut self, pad: gst::Pad) -> PadHandle {
        let slot = match self.pads.iter().position(|p| *p == pad) {
            Some(slot) => slot,
            None => {
                self.pads.push(pad);
                self.pads.len() - 1
            }
        };
        PadHandle {
            owner: self.owner,
            generation: self.generation,
            slot,
        }
    }

    pub(crate) fn element(&self, handle: &ElementHandle) -> Result<&gst::Element> {
        self.check(handle.owner, handle.generation)?;
        self.elements.get(handle.slot).ok_or(Error::StaleHandle)
    }

    pub(crate) fn pad(&self, handle: &PadHandle) -> Result<&gst::Pad> {
        self.check(handle.owner, handle.generation)?;
        self.pads.get(handle.slot).ok_or(Error::StaleHandle)
    }

    /// Drops every object reference; all outstanding handles become stale.
    pub(crate) fn invalidate(&mut self) {
        self.elements.clear();
        self.by_name.clear();
        self.pads.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    fn element_handle(&self, slot: usize) -> ElementHandle {
        ElementHandle {
            owner: self.owner,
            generation: self.generation,
            slot,
        }
    }

    fn check(&self, owner: u64, generation: u32) -> Result<()> {
        if owner != self.owner {
            Err(Error::ForeignHandle)
        } else if generation != self.generation {
            Err(Error::StaleHandle)
        } else {
            Ok(())
        }
    }
}

impl Pipeline {
    /// Looks up an element anywhere in the graph by name.
    ///
    /// The search is recursive and depth-first in GStreamer's own order, so
    /// elements inside nested bins are found too. Repeated lookups of the same
    /// name return the same handle.
    ///
    /// # Returns
    /// * `Ok(Some(handle))` for the first element with that name
    /// * `Ok(None)` if no element has that name
    pub fn find_child(&mut self, name: &str) -> Result<Option<ElementHandle>> {
        let pipeline = self.live()?.clone();
        if let Some(handle) = self.registry.cached(name) {
            return Ok(Some(handle));
        }

        match pipeline.by_name(name) {
            Some(element) => {
                gst::trace!(CAT, obj = element, "Found child '{}'", name);
                Ok(Some(self.registry.insert_element(name, element)))
            }
            None => {
                debug!("No element named '{}' in {}", name, pipeline.name());
                Ok(None)
            }
        }
    }

    /// Looks up an existing pad of an element by name.
    ///
    /// Only pads that already exist are found; request pads are never
    /// created by this call.
    pub fn get_pad(&mut self, element: &ElementHandle, pad: &str) -> Result<Option<PadHandle>> {
        self.live()?;
        let found = self.registry.element(element)?.static_pad(pad);
        Ok(found.map(|pad| self.registry.insert_pad(pad)))
    }

    /// Sets a pad-typed property of an element to one of its own pads.
    ///
    /// The typical use is switching `input-selector`'s `active-pad`.
    ///
    /// # Arguments
    /// * `element` - The element carrying both the property and the pad
    /// * `attribute` - Property name, e.g. `"active-pad"`
    /// * `pad` - Name of an existing pad of `element`, e.g. `"sink_1"`
    ///
    /// # Errors
    /// * [`Error::PadNotFound`] if the element has no such pad
    /// * [`Error::PropertyNotFound`] if it has no such property
    /// * [`Error::PropertyType`] if the property is not a writable pad
    pub fn set_pad(&mut self, element: &ElementHandle, attribute: &str, pad: &str) -> Result<()> {
        self.live()?;
        let element = self.registry.element(element)?;

        let target = element
            .static_pad(pad)
            .ok_or_else(|| Error::PadNotFound {
                element: element.name().to_string(),
                pad: pad.to_owned(),
            })?;
        let pspec = writable_property(element, attribute)?;
        if !pspec.value_type().is_a(gst::Pad::static_type()) {
            return Err(Error::PropertyType {
                element: element.name().to_string(),
                property: attribute.to_owned(),
                expected: "a pad".to_owned(),
            });
        }

        element.set_property_from_value(attribute, &target.to_value());
        gst::debug!(CAT, obj = element, "{} set to pad {}", attribute, pad);
        Ok(())
    }

    /// Sets an element property from its string form.
    ///
    /// String properties take `value` as is. Anything else goes through
    /// GStreamer's value deserialization, the same parser `gst-launch-1.0`
    /// uses for `key=value` pairs (`"true"`, `"42"`, enum nicks, caps
    /// strings, ...).
    ///
    /// # Errors
    /// * [`Error::PropertyNotFound`] if the element has no such property
    /// * [`Error::PropertyType`] if the property is read-only or
    ///   construct-only, or `value` does not parse as the property's type or
    ///   lies outside its range
    pub fn set_property_from_str(
        &mut self,
        element: &ElementHandle,
        property: &str,
        value: &str,
    ) -> Result<()> {
        self.live()?;
        let element = self.registry.element(element)?;
        let pspec = writable_property(element, property)?;

        let rejected = || Error::PropertyType {
            element: element.name().to_string(),
            property: property.to_owned(),
            expected: format!("'{}'", value),
        };
        let type_ = pspec.value_type();
        let parsed = if type_ == glib::Type::STRING {
            value.to_value()
        } else {
            glib::Value::deserialize(value, type_).map_err(|_| rejected())?
        };
        if !in_range(&pspec, &parsed) {
            return Err(rejected());
        }

        element.set_property_from_value(property, &parsed);
        gst::debug!(CAT, obj = element, "{} set to {}", property, value);
        Ok(())
    }

    /// Reads an element property.
    ///
    /// Returns `Ok(None)` if the element has no readable property of that
    /// name.
    pub fn property(&self, element: &ElementHandle, property: &str) -> Result<Option<FieldValue>> {
        self.live()?;
        let element = self.registry.element(element)?;
        match element.find_property(property) {
            Some(pspec) if pspec.flags().contains(ParamFlags::READABLE) => Ok(Some(
                FieldValue::from_value(&element.property_value(property)),
            )),
            _ => Ok(None),
        }
    }

    /// Resolves an element handle to the underlying GStreamer element.
    pub fn element(&self, element: &ElementHandle) -> Result<&gst::Element> {
        self.live()?;
        self.registry.element(element)
    }

    /// Resolves a pad handle to the underlying GStreamer pad.
    pub fn pad(&self, pad: &PadHandle) -> Result<&gst::Pad> {
        self.live()?;
        self.registry.pad(pad)
    }
}

fn writable_property(element: &gst::Element, property: &str) -> Result<glib::ParamSpec> {
    let pspec = element
        .find_property(property)
        .ok_or_else(|| Error::PropertyNotFound {
            element: element.name().to_string(),
            property: property.to_owned(),
        })?;
    let flags = pspec.flags();
    if !flags.contains(ParamFlags::WRITABLE) || flags.contains(ParamFlags::CONSTRUCT_ONLY) {
        return Err(Error::PropertyType {
            element: element.name().to_string(),
            property: property.to_owned(),
            expected: "writes".to_owned(),
        });
    }
    Ok(pspec)
}

/// True if the param spec accepts `value` unchanged.
///
/// GLib clamps out-of-range values during validation; the setter treats any
/// such change as fatal unless the property allows lax validation.
fn in_range(pspec: &glib::ParamSpec, value: &glib::Value) -> bool {
    if pspec.flags().contains(ParamFlags::LAX_VALIDATION) {
        return true;
    }
    let mut scratch = value.clone();
    let changed: bool = unsafe {
        from_glib(glib::gobject_ffi::g_param_value_validate(
            pspec.to_glib_none().0,
            scratch.to_glib_none_mut().0,
        ))
    };
    !changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(factory: &str, name: &str) -> gst::Element {
        gst::init().unwrap();
        gst::ElementFactory::make(factory).name(name).build().unwrap()
    }

    #[test]
    fn same_element_gets_same_slot() {
        let mut registry = Registry::new();
        let identity = element("identity", "id0");
        let first = registry.insert_element("id0", identity.clone());
        let second = registry.insert_element("alias", identity);
        assert_eq!(first, second);
        assert_eq!(registry.cached("alias"), Some(first));
        assert_eq!(registry.element(&first).unwrap().name(), "id0");
    }

    #[test]
    fn handles_go_stale_after_invalidate() {
        let mut registry = Registry::new();
        let handle = registry.insert_element("id1", element("identity", "id1"));
        let src = registry
            .element(&handle)
            .unwrap()
            .static_pad("src")
            .unwrap();
        let pad = registry.insert_pad(src);
        registry.invalidate();
        assert!(matches!(registry.element(&handle), Err(Error::StaleHandle)));
        assert!(matches!(registry.pad(&pad), Err(Error::StaleHandle)));
        assert_eq!(registry.cached("id1"), None);
    }

    #[test]
    fn handles_are_bound_to_their_registry() {
        let mut first = Registry::new();
        let second = Registry::new();
        let handle = first.insert_element("id2", element("identity", "id2"));
        assert!(matches!(second.element(&handle), Err(Error::ForeignHandle)));
    }

    #[test]
    fn out_of_range_values_are_detected() {
        let identity = element("identity", "id3");
        let pspec = identity.find_property("datarate").unwrap();
        assert!(in_range(&pspec, &1000i32.to_value()));
        assert!(!in_range(&pspec, &(-5i32).to_value()));

        let writable = writable_property(&identity, "datarate").unwrap();
        assert_eq!(writable.name(), "datarate");
        assert!(matches!(
            writable_property(&identity, "last-message"),
            Err(Error::PropertyType { .. })
        ));
    }
}
