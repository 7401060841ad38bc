//! Deterministic stand-ins for host globals obfuscated scripts
//! routinely call but that a bare [`boa_engine::Context`] doesn't
//! provide (browser/Node intrinsics, not part of the ECMAScript
//! standard library boa implements).
//!
//! Registered once per fresh sandbox (§4.C "prepared sandbox"); never
//! touches the filesystem or network, keeping the evaluator's sandbox
//! boundary intact by omission rather than by a deny-list.

use boa_engine::{js_string, Context, JsArgs, JsNativeError, JsResult, JsValue, NativeFunction};

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn base64_encode(input: &[u8]) -> String {
    let mut out = String::with_capacity(input.len().div_ceil(3) * 4);
    for chunk in input.chunks(3) {
        let b0 = chunk[0];
        let b1 = *chunk.get(1).unwrap_or(&0);
        let b2 = *chunk.get(2).unwrap_or(&0);
        let triple = ((b0 as u32) << 16) | ((b1 as u32) << 8) | b2 as u32;
        out.push(ALPHABET[(triple >> 18 & 0x3f) as usize] as char);
        out.push(ALPHABET[(triple >> 12 & 0x3f) as usize] as char);
        out.push(if chunk.len() > 1 { ALPHABET[(triple >> 6 & 0x3f) as usize] as char } else { '=' });
        out.push(if chunk.len() > 2 { ALPHABET[(triple & 0x3f) as usize] as char } else { '=' });
    }
    out
}

/// Exposed for rules that need to decode a base64 literal statically
/// (e.g. the `decode_base64_call` rule) without spinning up a sandbox.
pub(crate) fn base64_decode_bytes(input: &str) -> Option<Vec<u8>> {
    base64_decode(input)
}

fn base64_decode(input: &str) -> Option<Vec<u8>> {
    let cleaned: Vec<u8> = input.bytes().filter(|b| *b != b'=' && !b.is_ascii_whitespace()).collect();
    let mut out = Vec::with_capacity(cleaned.len() * 3 / 4);
    for chunk in cleaned.chunks(4) {
        let mut vals = [0u32; 4];
        for (i, &b) in chunk.iter().enumerate() {
            vals[i] = ALPHABET.iter().position(|&c| c == b)? as u32;
        }
        let triple = (vals[0] << 18) | (vals[1] << 12) | (vals[2] << 6) | vals[3];
        out.push((triple >> 16) as u8);
        if chunk.len() > 2 {
            out.push((triple >> 8) as u8);
        }
        if chunk.len() > 3 {
            out.push(triple as u8);
        }
    }
    Some(out)
}

fn atob(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let input = args.get_or_undefined(0).to_string(context)?.to_std_string_escaped();
    let bytes = base64_decode(&input)
        .ok_or_else(|| JsNativeError::typ().with_message("invalid base64 string").into())?;
    let text: String = bytes.into_iter().map(|b| b as char).collect();
    Ok(JsValue::from(js_string!(text)))
}

fn btoa(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let input = args.get_or_undefined(0).to_string(context)?.to_std_string_escaped();
    let bytes: Vec<u8> = input.chars().map(|c| c as u8).collect();
    Ok(JsValue::from(js_string!(base64_encode(&bytes))))
}

/// Installs the deterministic global shims a sandbox offers scripts.
/// Deliberately does not register `fetch`, `XMLHttpRequest`,
/// `require`, or anything filesystem/network-shaped — their absence
/// *is* the sandbox boundary (§4.C, §5 "no ambient network/filesystem
/// capability is ever wired in").
pub fn install(context: &mut Context) {
    let _ = context.register_global_builtin_callable(js_string!("atob"), 1, NativeFunction::from_fn_ptr(atob));
    let _ = context.register_global_builtin_callable(js_string!("btoa"), 1, NativeFunction::from_fn_ptr(btoa));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_round_trips() {
        let encoded = base64_encode(b"hello world");
        assert_eq!(encoded, "aGVsbG8gd29ybGQ=");
        assert_eq!(base64_decode(&encoded).unwrap(), b"hello world");
    }
}
