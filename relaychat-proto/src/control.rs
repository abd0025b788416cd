//! `ISC` control messages.
//!
//! ```text
//! client → relay   {"type": "ISC", "key": [e, n]}
//! relay  → client  {"type": "ISC", "key": c}
//! ```
//!
//! Integers are written as plain JSON number literals of any size.

use std::fmt;

use num_bigint::BigUint;
use relaychat_crypto::PublicKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::frame::Frame;

/// The `type` tag carried by every control frame ("install session key").
pub const CONTROL_TYPE: &str = "ISC";

/// Largest public modulus accepted in an offer.
pub const MAX_KEY_BITS: u64 = 8192;

/// Decimal digits of a `MAX_KEY_BITS`-bit integer. Longer literals are
/// rejected before conversion.
const MAX_INTEGER_DIGITS: usize = 2467;

// ─── Error ────────────────────────────────────────────────────────────────────

/// A control frame failed validation.
#[derive(Debug)]
pub enum ControlError {
    /// Not JSON, or not an object with `type` and `key`.
    Json(serde_json::Error),
    /// A binary frame arrived where a control frame was expected.
    NotText,
    /// `type` is not `"ISC"`.
    UnknownType(String),
    /// `key` has the wrong shape or holds something other than non-negative integers.
    InvalidKey(&'static str),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e)           => write!(f, "control frame is not valid JSON: {e}"),
            Self::NotText           => write!(f, "expected a text control frame"),
            Self::UnknownType(t)    => write!(f, "unknown control frame type {t:?}"),
            Self::InvalidKey(why)   => write!(f, "invalid key field: {why}"),
        }
    }
}

impl std::error::Error for ControlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ControlError {
    fn from(e: serde_json::Error) -> Self { Self::Json(e) }
}

// ─── ControlMessage ──────────────────────────────────────────────────────────

/// A validated control message.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlMessage {
    /// Client → relay: this connection's RSA public key.
    OfferPublicKey(PublicKey),
    /// Relay → client: the room key, RSA-OAEP wrapped under the offered key.
    InstallSessionKey(BigUint),
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    key:  Value,
}

impl ControlMessage {
    /// Serialize to the JSON text of a control frame.
    pub fn to_json(&self) -> Result<String, ControlError> {
        let key = match self {
            Self::OfferPublicKey(pk) => Value::Array(vec![number(pk.e())?, number(pk.n())?]),
            Self::InstallSessionKey(c) => number(c)?,
        };
        Ok(serde_json::to_string(&Envelope { kind: CONTROL_TYPE.to_string(), key })?)
    }

    /// Wrap as a text [`Frame`].
    pub fn to_frame(&self) -> Result<Frame, ControlError> {
        Ok(Frame::Text(self.to_json()?))
    }

    /// Parse and validate control-frame JSON.
    pub fn parse(text: &str) -> Result<Self, ControlError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        if envelope.kind != CONTROL_TYPE {
            return Err(ControlError::UnknownType(envelope.kind));
        }
        match &envelope.key {
            Value::Array(items) => {
                let [e, n] = items.as_slice() else {
                    return Err(ControlError::InvalidKey("public key must be [e, n]"));
                };
                let (e, n) = (integer(e)?, integer(n)?);
                if e < BigUint::from(2u32) || n < BigUint::from(3u32) {
                    return Err(ControlError::InvalidKey("public key components out of range"));
                }
                if n.bits() > MAX_KEY_BITS {
                    return Err(ControlError::InvalidKey("public modulus exceeds 8192 bits"));
                }
                if e >= n {
                    return Err(ControlError::InvalidKey("public exponent not below the modulus"));
                }
                Ok(Self::OfferPublicKey(PublicKey::new(e, n)))
            }
            key @ Value::Number(_) => Ok(Self::InstallSessionKey(integer(key)?)),
            _ => Err(ControlError::InvalidKey("expected [e, n] or an integer")),
        }
    }

    /// Parse a frame, rejecting binary frames.
    pub fn from_frame(frame: &Frame) -> Result<Self, ControlError> {
        match frame {
            Frame::Text(text) => Self::parse(text),
            Frame::Binary(_)  => Err(ControlError::NotText),
        }
    }
}

fn number(value: &BigUint) -> Result<Value, ControlError> {
    let n: serde_json::Number = value.to_str_radix(10).parse()?;
    Ok(Value::Number(n))
}

fn integer(value: &Value) -> Result<BigUint, ControlError> {
    match value {
        Value::Number(n) => {
            let digits = n.to_string();
            if digits.len() > MAX_INTEGER_DIGITS {
                return Err(ControlError::InvalidKey("integer too large"));
            }
            BigUint::parse_bytes(digits.as_bytes(), 10)
                .ok_or(ControlError::InvalidKey("not a non-negative integer"))
        }
        _ => Err(ControlError::InvalidKey("not a number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(s: &str) -> BigUint { BigUint::parse_bytes(s.as_bytes(), 10).unwrap() }

    #[test]
    fn offer_serializes_as_integer_tuple() {
        let n = "25195908475657893494027183240048398571429282126204032027777137836043662020707595556264018525880784406918290641249515082189298559149176184502808489120072844992687392807287776735971418347270261896375014971824691165077613379859095700097330459748808428401797429100642458691817195118746121515172654632282216869987549182422433637259085141865462043576798423387184774447920739934236584823824281198163815010674810451660377306056201619676256133844143603833904414952634432190114657544454178424020924616515723350778707749817125772467962926386356373289912154831438167899885040445364023527381951378636564391212010397122822120720357";
        let pk = PublicKey::new(BigUint::from(65537u32), big(n));
        let json = ControlMessage::OfferPublicKey(pk.clone()).to_json().unwrap();
        assert_eq!(json, format!(r#"{{"type":"ISC","key":[65537,{n}]}}"#));
        assert_eq!(ControlMessage::parse(&json).unwrap(), ControlMessage::OfferPublicKey(pk));
    }

    #[test]
    fn wrapped_key_is_a_bare_integer() {
        let c = big("123456789012345678901234567890123456789012345678901234567890");
        let json = ControlMessage::InstallSessionKey(c.clone()).to_json().unwrap();
        assert_eq!(json, format!(r#"{{"type":"ISC","key":{c}}}"#));
        assert_eq!(ControlMessage::parse(&json).unwrap(), ControlMessage::InstallSessionKey(c));
    }

    #[test]
    fn field_order_and_whitespace_do_not_matter() {
        let msg = ControlMessage::parse(r#"{ "key" : 42 , "type" : "ISC" }"#).unwrap();
        assert_eq!(msg, ControlMessage::InstallSessionKey(BigUint::from(42u32)));
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(matches!(ControlMessage::parse("not json"), Err(ControlError::Json(_))));
        assert!(matches!(ControlMessage::parse(r#"{"type":"ISC"}"#), Err(ControlError::Json(_))));
        assert!(matches!(
            ControlMessage::parse(r#"{"type":"CHAT","key":1}"#),
            Err(ControlError::UnknownType(t)) if t == "CHAT"
        ));
        for bad in [
            r#"{"type":"ISC","key":"12"}"#,
            r#"{"type":"ISC","key":-12}"#,
            r#"{"type":"ISC","key":1.5}"#,
            r#"{"type":"ISC","key":[65537]}"#,
            r#"{"type":"ISC","key":[65537, 3233, 1]}"#,
            r#"{"type":"ISC","key":[0, 3233]}"#,
            r#"{"type":"ISC","key":null}"#,
        ] {
            assert!(matches!(ControlMessage::parse(bad), Err(ControlError::InvalidKey(_))), "{bad}");
        }
        assert!(matches!(
            ControlMessage::from_frame(&Frame::Binary(vec![1, 2])),
            Err(ControlError::NotText)
        ));
    }

    #[test]
    fn rejects_oversized_or_inverted_keys() {
        let at_cap = (BigUint::from(1u32) << MAX_KEY_BITS) - 1u32;
        let json = format!(r#"{{"type":"ISC","key":[65537,{at_cap}]}}"#);
        assert!(matches!(ControlMessage::parse(&json), Ok(ControlMessage::OfferPublicKey(_))));

        let over_cap = BigUint::from(1u32) << MAX_KEY_BITS;
        let json = format!(r#"{{"type":"ISC","key":[65537,{over_cap}]}}"#);
        assert!(matches!(ControlMessage::parse(&json), Err(ControlError::InvalidKey(_))));

        let huge = "9".repeat(14_000);
        let json = format!(r#"{{"type":"ISC","key":[{huge},{huge}]}}"#);
        let started = std::time::Instant::now();
        assert!(matches!(ControlMessage::parse(&json), Err(ControlError::InvalidKey(_))));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));

        assert!(matches!(
            ControlMessage::parse(r#"{"type":"ISC","key":[3233, 3233]}"#),
            Err(ControlError::InvalidKey(_))
        ));
        assert!(matches!(
            ControlMessage::parse(r#"{"type":"ISC","key":[65537, 3233]}"#),
            Err(ControlError::InvalidKey(_))
        ));
    }
}
