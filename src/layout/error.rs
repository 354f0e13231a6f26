use thiserror::Error;

/// Failures raised by the layout engine and the font layer beneath it.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("invalid {axis} alignment: {value:?}")]
    InvalidAlignment { axis: &'static str, value: String },

    #[error("invalid wrap axis: {0:?}")]
    InvalidWrapAxis(String),

    #[error(
        "text does not fit {width}x{height} at any size from {start_size} down to 1: {preview:?}"
    )]
    TextOverflow {
        preview: String,
        width: f32,
        height: f32,
        start_size: u32,
    },

    #[error("font {reference}: {reason}")]
    Font { reference: String, reason: String },

    #[error("cannot allocate a {width}x{height} text layer")]
    Canvas { width: u32, height: u32 },
}

impl LayoutError {
    pub(crate) fn font(reference: impl ToString, reason: impl ToString) -> Self {
        LayoutError::Font {
            reference: reference.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_overflow(&self) -> bool {
        matches!(self, LayoutError::TextOverflow { .. })
    }
}

pub(crate) fn preview(text: &str) -> String {
    const LIMIT: usize = 40;
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= LIMIT {
        return flat;
    }
    let mut out: String = flat.chars().take(LIMIT).collect();
    out.push_str("...");
    out
}
