//! Token-level JSON generator used by the log writer.
//!
//! [`JsonSink`] emits compact JSON through `serde_json`'s
//! [`CompactFormatter`] into an in-memory buffer. It tracks the open
//! containers itself and refuses any token that would make the document
//! unbalanced or ill-formed: a key outside an object, a value without a key,
//! a mismatched closer, a second root value, or a non-finite float.

use anyhow::{bail, ensure, Result};
use serde_json::ser::{CompactFormatter, Formatter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Container {
    Object { first: bool, pending_value: bool },
    Array { first: bool },
}

/// In-memory JSON token sink.
#[derive(Debug)]
pub struct JsonSink {
    buf: Vec<u8>,
    fmt: CompactFormatter,
    stack: Vec<Container>,
    root_written: bool,
}

impl Default for JsonSink {
    fn default() -> Self {
        Self {
            buf: Vec::new(),
            fmt: CompactFormatter,
            stack: Vec::new(),
            root_written: false,
        }
    }
}

impl JsonSink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty sink with `bytes` of buffer reserved.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(bytes),
            ..Self::default()
        }
    }

    /// Drop all output and nesting state.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.stack.clear();
        self.root_written = false;
    }

    /// `true` once a root value has been written and every container closed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.root_written && self.stack.is_empty()
    }

    /// Current nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Serialized bytes so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Serialized text so far.
    pub fn as_str(&self) -> Result<&str> {
        Ok(std::str::from_utf8(&self.buf)?)
    }

    /// Write an object key; the next token must be its value.
    pub fn key(&mut self, key: &str) -> Result<()> {
        let Some(Container::Object {
            first,
            pending_value,
        }) = self.stack.last_mut()
        else {
            bail!("key {key:?} outside of an object");
        };
        ensure!(!*pending_value, "key {key:?} while the previous key has no value");
        self.fmt.begin_object_key(&mut self.buf, *first)?;
        *first = false;
        *pending_value = true;
        serde_json::to_writer(&mut self.buf, key)?;
        self.fmt.end_object_key(&mut self.buf)?;
        self.fmt.begin_object_value(&mut self.buf)?;
        Ok(())
    }

    /// `{`
    pub fn start_object(&mut self) -> Result<()> {
        self.begin_value()?;
        self.fmt.begin_object(&mut self.buf)?;
        self.stack.push(Container::Object {
            first: true,
            pending_value: false,
        });
        Ok(())
    }

    /// `}`
    pub fn end_object(&mut self) -> Result<()> {
        match self.stack.last() {
            Some(Container::Object {
                pending_value: false,
                ..
            }) => {}
            Some(Container::Object { .. }) => bail!("object closed while a key has no value"),
            Some(Container::Array { .. }) => bail!("object closed while an array is open"),
            None => bail!("object closed with nothing open"),
        }
        self.stack.pop();
        self.fmt.end_object(&mut self.buf)?;
        self.end_value()
    }

    /// `[`
    pub fn start_array(&mut self) -> Result<()> {
        self.begin_value()?;
        self.fmt.begin_array(&mut self.buf)?;
        self.stack.push(Container::Array { first: true });
        Ok(())
    }

    /// `]`
    pub fn end_array(&mut self) -> Result<()> {
        match self.stack.last() {
            Some(Container::Array { .. }) => {}
            Some(Container::Object { .. }) => bail!("array closed while an object is open"),
            None => bail!("array closed with nothing open"),
        }
        self.stack.pop();
        self.fmt.end_array(&mut self.buf)?;
        self.end_value()
    }

    /// A string value.
    pub fn string(&mut self, v: &str) -> Result<()> {
        self.begin_value()?;
        serde_json::to_writer(&mut self.buf, v)?;
        self.end_value()
    }

    /// A boolean value.
    pub fn boolean(&mut self, v: bool) -> Result<()> {
        self.begin_value()?;
        self.fmt.write_bool(&mut self.buf, v)?;
        self.end_value()
    }

    /// An unsigned integer value.
    pub fn unsigned(&mut self, v: u64) -> Result<()> {
        self.begin_value()?;
        self.fmt.write_u64(&mut self.buf, v)?;
        self.end_value()
    }

    /// A signed integer value.
    pub fn signed(&mut self, v: i64) -> Result<()> {
        self.begin_value()?;
        self.fmt.write_i64(&mut self.buf, v)?;
        self.end_value()
    }

    /// A float value, written in its shortest round-trip form.
    pub fn float(&mut self, v: f32) -> Result<()> {
        ensure!(v.is_finite(), "cannot encode non-finite float {v}");
        self.begin_value()?;
        self.fmt.write_f32(&mut self.buf, v)?;
        self.end_value()
    }

    fn begin_value(&mut self) -> Result<()> {
        match self.stack.last_mut() {
            None => {
                ensure!(!self.root_written, "document already has a root value");
                self.root_written = true;
            }
            Some(Container::Array { first }) => {
                self.fmt.begin_array_value(&mut self.buf, *first)?;
                *first = false;
            }
            Some(Container::Object { pending_value, .. }) => {
                ensure!(*pending_value, "object value without a key");
                *pending_value = false;
            }
        }
        Ok(())
    }

    fn end_value(&mut self) -> Result<()> {
        match self.stack.last() {
            Some(Container::Array { .. }) => self.fmt.end_array_value(&mut self.buf)?,
            Some(Container::Object { .. }) => self.fmt.end_object_value(&mut self.buf)?,
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_compact_nested_document() {
        let mut s = JsonSink::new();
        s.start_object().unwrap();
        s.key("a").unwrap();
        s.start_array().unwrap();
        s.unsigned(1).unwrap();
        s.signed(-2).unwrap();
        s.float(0.5).unwrap();
        s.end_array().unwrap();
        s.key("b").unwrap();
        s.boolean(true).unwrap();
        s.key("c").unwrap();
        s.string("q\"\n").unwrap();
        s.key("d").unwrap();
        s.start_object().unwrap();
        s.end_object().unwrap();
        assert!(!s.is_complete());
        s.end_object().unwrap();
        assert!(s.is_complete());
        assert_eq!(
            s.as_str().unwrap(),
            r#"{"a":[1,-2,0.5],"b":true,"c":"q\"\n","d":{}}"#
        );
    }

    #[test]
    fn floats_use_shortest_f32_form() {
        let mut s = JsonSink::new();
        s.start_array().unwrap();
        s.float(0.1).unwrap();
        s.float(1.0).unwrap();
        s.float(-0.0166).unwrap();
        s.end_array().unwrap();
        assert_eq!(s.as_str().unwrap(), "[0.1,1.0,-0.0166]");
    }

    #[test]
    fn rejects_non_finite_floats() {
        let mut s = JsonSink::new();
        s.start_array().unwrap();
        assert!(s.float(f32::NAN).is_err());
        assert!(s.float(f32::INFINITY).is_err());
        s.end_array().unwrap();
        assert_eq!(s.as_str().unwrap(), "[]");
    }

    #[test]
    fn rejects_unbalanced_closers() {
        let mut s = JsonSink::new();
        assert!(s.end_object().is_err());
        s.start_object().unwrap();
        assert!(s.end_array().is_err());

        let mut s = JsonSink::new();
        s.start_array().unwrap();
        assert!(s.end_object().is_err());
    }

    #[test]
    fn rejects_keys_and_values_out_of_place() {
        let mut s = JsonSink::new();
        assert!(s.key("k").is_err());
        s.start_array().unwrap();
        assert!(s.key("k").is_err());

        let mut s = JsonSink::new();
        s.start_object().unwrap();
        assert!(s.unsigned(1).is_err());
        s.key("k").unwrap();
        assert!(s.key("again").is_err());
        assert!(s.end_object().is_err());
    }

    #[test]
    fn rejects_second_root_value() {
        let mut s = JsonSink::new();
        s.start_object().unwrap();
        s.end_object().unwrap();
        assert!(s.start_object().is_err());
    }

    #[test]
    fn clear_starts_a_new_document() {
        let mut s = JsonSink::with_capacity(64);
        s.start_object().unwrap();
        s.clear();
        assert_eq!(s.depth(), 0);
        assert!(s.as_bytes().is_empty());
        s.start_array().unwrap();
        s.end_array().unwrap();
        assert_eq!(s.as_str().unwrap(), "[]");
    }
}
