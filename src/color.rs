use anyhow::{Result, anyhow};
use csscolorparser::Color;
use image::Rgba;

/// Parses a CSS colour: hex (`#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`), any
/// named colour, or functional forms such as `rgb()` and `hsl()`.
pub fn parse_color(value: &str) -> Result<Rgba<u8>> {
    let parsed: Color = value
        .trim()
        .parse()
        .map_err(|err| anyhow!("invalid color {:?}: {}", value, err))?;
    Ok(Rgba(parsed.to_rgba8()))
}
