//! Readers for Postgres binary values the stock `FromSql` impls reject or
//! cannot hold.

use std::{
    error::Error,
    net::{Ipv4Addr, Ipv6Addr},
};
use tokio_postgres::types::{FromSql, Kind, Type};

type DecodeError = Box<dyn Error + Sync + Send>;

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// A `NUMERIC` value as its exact decimal text, `NaN` and infinities included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgNumeric(pub String);

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        numeric_text(raw).map(PgNumeric)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// Text form of any column, whatever type the server reports.
///
/// Used for columns with no dedicated reader. Types whose binary encoding is
/// not text are formatted the way `psql` shows them where that is known;
/// anything else that is not printable UTF-8 comes out as `\x` hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgText(pub String);

impl<'a> FromSql<'a> for PgText {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        if let Kind::Array(_) = ty.kind() {
            let elements = Vec::<Option<PgText>>::from_sql(ty, raw)?;
            return Ok(PgText(array_text(elements)));
        }

        let text = match *ty {
            Type::NUMERIC => numeric_text(raw)?,
            Type::INTERVAL => interval_text(raw)?,
            Type::MONEY => money_text(raw)?,
            Type::INET | Type::CIDR => inet_text(raw)?,
            Type::TIMETZ => timetz_text(raw)?,
            Type::BOOL => match raw {
                [0] => "f".to_string(),
                [_] => "t".to_string(),
                _ => return Err("invalid bool length".into()),
            },
            Type::INT2 => i16::from_be_bytes(fixed(raw)?).to_string(),
            Type::INT4 => i32::from_be_bytes(fixed(raw)?).to_string(),
            Type::INT8 => i64::from_be_bytes(fixed(raw)?).to_string(),
            Type::FLOAT4 => f32::from_be_bytes(fixed(raw)?).to_string(),
            Type::FLOAT8 => f64::from_be_bytes(fixed(raw)?).to_string(),
            _ => printable_or_hex(raw),
        };
        Ok(PgText(text))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

fn fixed<const N: usize>(raw: &[u8]) -> Result<[u8; N], DecodeError> {
    raw.try_into()
        .map_err(|_| format!("expected {N} bytes, got {}", raw.len()).into())
}

fn be_u16(raw: &[u8], at: usize) -> Result<u16, DecodeError> {
    raw.get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| "truncated value".into())
}

fn numeric_text(raw: &[u8]) -> Result<String, DecodeError> {
    let ndigits = usize::from(be_u16(raw, 0)?);
    let weight = i32::from(be_u16(raw, 2)? as i16);
    let sign = be_u16(raw, 4)?;
    let dscale = usize::from(be_u16(raw, 6)?);

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        NUMERIC_POS | NUMERIC_NEG => {}
        other => return Err(format!("invalid numeric sign 0x{other:04x}").into()),
    }

    let body = &raw[8..];
    if body.len() != ndigits * 2 {
        return Err("numeric digit count does not match its length".into());
    }
    let digits: Vec<u16> = body
        .chunks_exact(2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .collect();
    // base-10000 digit at position `i`, counted from the first integer group
    let digit_at = |i: i32| -> u16 {
        usize::try_from(i)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        out.push_str(&digit_at(0).to_string());
        for i in 1..=weight {
            out.push_str(&format!("{:04}", digit_at(i)));
        }
    }

    if dscale > 0 {
        out.push('.');
        let start = out.len();
        let mut i = weight + 1;
        while out.len() - start < dscale {
            out.push_str(&format!("{:04}", digit_at(i)));
            i += 1;
        }
        out.truncate(start + dscale);
    }
    Ok(out)
}

fn interval_text(raw: &[u8]) -> Result<String, DecodeError> {
    let raw: [u8; 16] = fixed(raw)?;
    let micros = i64::from_be_bytes(raw[0..8].try_into()?);
    let days = i32::from_be_bytes(raw[8..12].try_into()?);
    let months = i32::from_be_bytes(raw[12..16].try_into()?);

    let mut parts = Vec::new();
    for (count, unit) in [(months / 12, "year"), (months % 12, "mon"), (days, "day")] {
        match count {
            0 => {}
            1 | -1 => parts.push(format!("{count} {unit}")),
            _ => parts.push(format!("{count} {unit}s")),
        }
    }
    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        parts.push(format!("{sign}{}", clock_text(micros.unsigned_abs())));
    }
    Ok(parts.join(" "))
}

/// `HH:MM:SS` with the fraction trimmed of trailing zeros.
fn clock_text(micros: u64) -> String {
    let secs = micros / 1_000_000;
    let frac = micros % 1_000_000;
    let mut out = format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60);
    if frac != 0 {
        out.push_str(format!(".{frac:06}").trim_end_matches('0'));
    }
    out
}

fn money_text(raw: &[u8]) -> Result<String, DecodeError> {
    let cents = i64::from_be_bytes(fixed(raw)?);
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    Ok(format!("{sign}{}.{:02}", abs / 100, abs % 100))
}

fn inet_text(raw: &[u8]) -> Result<String, DecodeError> {
    let [family, bits, is_cidr, len, addr @ ..] = raw else {
        return Err("truncated inet value".into());
    };
    if usize::from(*len) != addr.len() {
        return Err("inet address length does not match".into());
    }
    let (text, max_bits) = match addr.len() {
        4 => (Ipv4Addr::from(fixed::<4>(addr)?).to_string(), 32),
        16 => (Ipv6Addr::from(fixed::<16>(addr)?).to_string(), 128),
        _ => return Err(format!("unsupported inet family {family}").into()),
    };
    if *is_cidr != 0 || *bits != max_bits {
        return Ok(format!("{text}/{bits}"));
    }
    Ok(text)
}

fn timetz_text(raw: &[u8]) -> Result<String, DecodeError> {
    let raw: [u8; 12] = fixed(raw)?;
    let micros = i64::from_be_bytes(raw[0..8].try_into()?);
    // seconds west of UTC
    let zone = i32::from_be_bytes(raw[8..12].try_into()?);

    let sign = if zone <= 0 { '+' } else { '-' };
    let zone = zone.unsigned_abs();
    let mut out = format!(
        "{}{sign}{:02}",
        clock_text(micros.unsigned_abs()),
        zone / 3600
    );
    if zone % 3600 != 0 {
        out.push_str(&format!(":{:02}", zone / 60 % 60));
    }
    Ok(out)
}

/// `{a,b,NULL}`, quoting elements the way Postgres array literals do.
fn array_text(elements: Vec<Option<PgText>>) -> String {
    let items: Vec<String> = elements
        .into_iter()
        .map(|element| match element {
            None => "NULL".to_string(),
            Some(PgText(text)) if needs_quotes(&text) => {
                format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
            }
            Some(PgText(text)) => text,
        })
        .collect();
    format!("{{{}}}", items.join(","))
}

fn needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text.eq_ignore_ascii_case("null")
        || text
            .chars()
            .any(|c| matches!(c, '{' | '}' | ',' | '"' | '\\') || c.is_whitespace())
}

fn printable_or_hex(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(text) if !text.chars().any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r')) => {
            text.to_string()
        }
        _ => {
            let mut out = String::with_capacity(2 + raw.len() * 2);
            out.push_str("\\x");
            for byte in raw {
                out.push_str(&format!("{byte:02x}"));
            }
            out
        }
    }
}
