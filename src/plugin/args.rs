//! Loose argument coercion for host-supplied block arguments.
//!
//! Hosts hand over whatever the user typed into a block slot. Numbers may
//! arrive as strings, blanks or garbage, so they are coerced the way the block
//! runtime does and then defaulted.

use serde_json::{Map, Value};

use crate::qr::DEFAULT_QR_SIZE;

pub const DEFAULT_QR_TEXT: &str = "https://rotur.dev/link";

/// Arguments of the `showQR` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowQrArgs {
    pub text: String,
    pub size: u32,
    pub y_offset: f64,
}

impl Default for ShowQrArgs {
    fn default() -> Self {
        Self {
            text: DEFAULT_QR_TEXT.to_string(),
            size: DEFAULT_QR_SIZE,
            y_offset: 0.0,
        }
    }
}

impl ShowQrArgs {
    /// Read `TEXT`, `SIZE` and `Y` from a block argument map.
    ///
    /// A missing `TEXT` becomes the empty string. A `SIZE` that is not a
    /// finite number, or is below 1, becomes [`DEFAULT_QR_SIZE`]; any other
    /// size is rounded to the nearest whole pixel. A `Y` that is not a finite
    /// number becomes `0`.
    pub fn from_block_args(args: &Map<String, Value>) -> Self {
        let text = args.get("TEXT").map(text_of).unwrap_or_default();

        let size = number_of(args.get("SIZE"));
        let size = if size.is_finite() && size >= 1.0 {
            size.round().min(f64::from(u32::MAX)) as u32
        } else {
            DEFAULT_QR_SIZE
        };

        let y_offset = number_of(args.get("Y"));
        let y_offset = if y_offset.is_finite() { y_offset } else { 0.0 };

        Self {
            text,
            size,
            y_offset,
        }
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numeric value of a block argument, `NaN` when it has none.
fn number_of(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Some(Value::Array(_)) | Some(Value::Object(_)) => f64::NAN,
    }
}
