//! Push-style JSON token stream on top of `serde_json`.
//!
//! `serde_json` does not expose a SAX interface, but its deserializer reports
//! every token to a [`Visitor`] when driven through `deserialize_any`. The
//! seeds below forward those tokens to an [`EventHandler`] without building
//! an intermediate `serde_json::Value`, so the handler sees the document in
//! order with constant extra memory.
//!
//! A handler error aborts tokenization immediately. It is carried out as a
//! `serde_json::Error`, which appends the line and column of the offending
//! token to the handler's message.

use std::fmt;

use anyhow::Result;
use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};

/// Receiver of tokenizer callbacks.
///
/// Each method returns `Err` to reject the token and stop the parse.
pub trait EventHandler {
    /// A `null` literal.
    fn null(&mut self) -> Result<()>;
    /// `true` or `false`.
    fn boolean(&mut self, v: bool) -> Result<()>;
    /// A non-negative integer.
    fn unsigned(&mut self, v: u64) -> Result<()>;
    /// A negative integer.
    fn signed(&mut self, v: i64) -> Result<()>;
    /// A number with a fraction or exponent.
    fn double(&mut self, v: f64) -> Result<()>;
    /// A string value (object keys go to [`key`](Self::key)).
    fn string(&mut self, v: &str) -> Result<()>;
    /// `{`
    fn start_object(&mut self) -> Result<()>;
    /// An object key.
    fn key(&mut self, k: &str) -> Result<()>;
    /// `}`
    fn end_object(&mut self) -> Result<()>;
    /// `[`
    fn start_array(&mut self) -> Result<()>;
    /// `]`
    fn end_array(&mut self) -> Result<()>;
}

/// Tokenize exactly one JSON document from `de`, feeding `handler`.
///
/// Trailing non-whitespace after the document is an error.
pub fn drive<'de, R, H>(
    de: &mut serde_json::Deserializer<R>,
    handler: &mut H,
) -> serde_json::Result<()>
where
    R: serde_json::de::Read<'de>,
    H: EventHandler,
{
    ValueSeed { handler }.deserialize(&mut *de)?;
    de.end()
}

fn reject<E: de::Error>(e: &anyhow::Error) -> E {
    E::custom(format!("{e:#}"))
}

struct ValueSeed<'h, H> {
    handler: &'h mut H,
}

impl<'de, H: EventHandler> DeserializeSeed<'de> for ValueSeed<'_, H> {
    type Value = ();

    fn deserialize<D: de::Deserializer<'de>>(self, d: D) -> Result<(), D::Error> {
        d.deserialize_any(self)
    }
}

impl<'de, H: EventHandler> Visitor<'de> for ValueSeed<'_, H> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        self.handler.null().map_err(|e| reject(&e))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<(), E> {
        self.handler.boolean(v).map_err(|e| reject(&e))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<(), E> {
        self.handler.unsigned(v).map_err(|e| reject(&e))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<(), E> {
        self.handler.signed(v).map_err(|e| reject(&e))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<(), E> {
        self.handler.double(v).map_err(|e| reject(&e))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<(), E> {
        self.handler.string(v).map_err(|e| reject(&e))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        let handler = self.handler;
        handler.start_object().map_err(|e| reject(&e))?;
        while map
            .next_key_seed(KeySeed {
                handler: &mut *handler,
            })?
            .is_some()
        {
            map.next_value_seed(ValueSeed {
                handler: &mut *handler,
            })?;
        }
        handler.end_object().map_err(|e| reject(&e))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        let handler = self.handler;
        handler.start_array().map_err(|e| reject(&e))?;
        while seq
            .next_element_seed(ValueSeed {
                handler: &mut *handler,
            })?
            .is_some()
        {}
        handler.end_array().map_err(|e| reject(&e))
    }
}

struct KeySeed<'h, H> {
    handler: &'h mut H,
}

impl<'de, H: EventHandler> DeserializeSeed<'de> for KeySeed<'_, H> {
    type Value = ();

    fn deserialize<D: de::Deserializer<'de>>(self, d: D) -> Result<(), D::Error> {
        d.deserialize_str(self)
    }
}

impl<'de, H: EventHandler> Visitor<'de> for KeySeed<'_, H> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object key")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<(), E> {
        self.handler.key(v).map_err(|e| reject(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    /// Records every callback as a short token string.
    #[derive(Default)]
    struct Recorder {
        tokens: Vec<String>,
        fail_on_key: Option<&'static str>,
    }

    impl EventHandler for Recorder {
        fn null(&mut self) -> Result<()> {
            self.tokens.push("null".into());
            Ok(())
        }
        fn boolean(&mut self, v: bool) -> Result<()> {
            self.tokens.push(format!("b:{v}"));
            Ok(())
        }
        fn unsigned(&mut self, v: u64) -> Result<()> {
            self.tokens.push(format!("u:{v}"));
            Ok(())
        }
        fn signed(&mut self, v: i64) -> Result<()> {
            self.tokens.push(format!("i:{v}"));
            Ok(())
        }
        fn double(&mut self, v: f64) -> Result<()> {
            self.tokens.push(format!("d:{v}"));
            Ok(())
        }
        fn string(&mut self, v: &str) -> Result<()> {
            self.tokens.push(format!("s:{v}"));
            Ok(())
        }
        fn start_object(&mut self) -> Result<()> {
            self.tokens.push("{".into());
            Ok(())
        }
        fn key(&mut self, k: &str) -> Result<()> {
            if self.fail_on_key == Some(k) {
                bail!("unexpected key {k:?}");
            }
            self.tokens.push(format!("k:{k}"));
            Ok(())
        }
        fn end_object(&mut self) -> Result<()> {
            self.tokens.push("}".into());
            Ok(())
        }
        fn start_array(&mut self) -> Result<()> {
            self.tokens.push("[".into());
            Ok(())
        }
        fn end_array(&mut self) -> Result<()> {
            self.tokens.push("]".into());
            Ok(())
        }
    }

    fn tokens(json: &str) -> serde_json::Result<Vec<String>> {
        let mut rec = Recorder::default();
        let mut de = serde_json::Deserializer::from_str(json);
        drive(&mut de, &mut rec)?;
        Ok(rec.tokens)
    }

    #[test]
    fn forwards_tokens_in_document_order() {
        let got = tokens(r#"{"a":[1,-2,0.5,"x\"y"],"b":{"c":true,"d":null}}"#).unwrap();
        let want = [
            "{", "k:a", "[", "u:1", "i:-2", "d:0.5", "s:x\"y", "]", "k:b", "{", "k:c", "b:true",
            "k:d", "null", "}", "}",
        ];
        assert_eq!(got, want);
    }

    #[test]
    fn empty_containers_still_open_and_close() {
        assert_eq!(tokens("[[],{}]").unwrap(), ["[", "[", "]", "{", "}", "]"]);
    }

    #[test]
    fn trailing_data_is_rejected() {
        assert!(tokens("{} {}").is_err());
        assert!(tokens("{}  \n").is_ok());
    }

    #[test]
    fn truncated_input_is_rejected() {
        assert!(tokens(r#"{"a":[1,2"#).is_err());
    }

    #[test]
    fn handler_error_stops_and_reports_position() {
        let mut rec = Recorder {
            fail_on_key: Some("bad"),
            ..Recorder::default()
        };
        let mut de = serde_json::Deserializer::from_str("{\"ok\":1,\n\"bad\":2,\"never\":3}");
        let err = drive(&mut de, &mut rec).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("unexpected key \"bad\""), "{msg}");
        assert!(msg.contains("line 2"), "{msg}");
        assert_eq!(rec.tokens, ["{", "k:ok", "u:1"]);
    }
}
