use rand::Rng;
use serde::{Deserialize, Serialize};

/// 8-bit RGB display color.
///
/// Serialized as an uppercase `#RRGGBB` hex string.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError(String);

impl std::fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unable to parse color: {:?}", self.0)
    }
}

impl std::error::Error for ColorParseError {}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::new(rng.r#gen(), rng.r#gen(), rng.r#gen())
    }

    /// Builds a color from the first three components; `None` if fewer are given.
    pub fn from_components(components: &[u8]) -> Option<Self> {
        match components {
            [r, g, b, ..] => Some(Self::new(*r, *g, *b)),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Parses `#RGB`, `#RRGGBB` (hash optional) or `rgb(r, g, b)`.
    pub fn parse(input: &str) -> Result<Self, ColorParseError> {
        let s = input.trim();
        let err = || ColorParseError(input.to_string());

        if let Some(body) = s
            .strip_prefix("rgb(")
            .or_else(|| s.strip_prefix("RGB("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts = body
                .split(',')
                .map(|p| p.trim().parse::<f64>().map_err(|_| err()))
                .collect::<Result<Vec<_>, _>>()?;
            let &[r, g, b] = parts.as_slice() else {
                return Err(err());
            };
            let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
            return Ok(Self::new(channel(r), channel(g), channel(b)));
        }

        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map_err(|_| err());
        match hex.len() {
            3 => Ok(Self::new(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
            6 => {
                let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
                Ok(Self::new(byte(0)?, byte(2)?, byte(4)?))
            }
            _ => Err(err()),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::parse(&value)
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::Rgb;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(Rgb::parse("#1A2b3C").unwrap(), Rgb::new(0x1a, 0x2b, 0x3c));
        assert_eq!(Rgb::parse("ff0000").unwrap(), Rgb::new(255, 0, 0));
        assert_eq!(Rgb::parse("#0f8").unwrap(), Rgb::new(0, 255, 136));
    }

    #[test]
    fn parses_rgb_function() {
        assert_eq!(Rgb::parse("rgb(10, 20, 300)").unwrap(), Rgb::new(10, 20, 255));
        assert!(Rgb::parse("rgb(1, 2)").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(Rgb::parse("").is_err());
        assert!(Rgb::parse("#12345").is_err());
        assert!(Rgb::parse("#gggggg").is_err());
    }

    #[test]
    fn hex_is_uppercase_and_reparses() {
        let c = Rgb::new(171, 205, 239);
        assert_eq!(c.to_hex(), "#ABCDEF");
        assert_eq!(Rgb::parse(&c.to_hex()).unwrap(), c);
    }

    #[test]
    fn components_need_three_values() {
        assert_eq!(Rgb::from_components(&[1, 2]), None);
        assert_eq!(Rgb::from_components(&[1, 2, 3, 4]), Some(Rgb::new(1, 2, 3)));
    }

    #[test]
    fn serde_uses_hex_string() {
        let json = serde_json::to_string(&Rgb::new(0, 128, 255)).unwrap();
        assert_eq!(json, "\"#0080FF\"");
        let back: Rgb = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Rgb::new(0, 128, 255));
    }
}
