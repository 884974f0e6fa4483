//! Flat-colour materials shared between primitives.

use anyhow::{Context as _, bail};

/// Index of a material inside a [`crate::data_structures::scene::Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub(crate) usize);

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub diffuse: [f32; 3],
    pub alpha: f32,
}

impl Material {
    pub fn new(name: &str, diffuse: [f32; 3]) -> Self {
        Self {
            name: name.to_string(),
            diffuse,
            alpha: 1.0,
        }
    }

    /// Parse a `#RRGGBB` colour.
    pub fn from_hex(name: &str, hex: &str) -> anyhow::Result<Self> {
        Ok(Self::new(name, parse_hex(hex)?))
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    pub fn is_transparent(&self) -> bool {
        self.alpha < 1.0
    }

    pub fn white(name: &str) -> Self {
        Self::new(name, [1.0, 1.0, 1.0])
    }

    pub fn red(name: &str) -> Self {
        Self::new(name, [1.0, 0.0, 0.0])
    }
}

fn parse_hex(hex: &str) -> anyhow::Result<[f32; 3]> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        bail!("expected a colour of the form #RRGGBB, got {:?}", hex);
    }
    let mut rgb = [0.0; 3];
    for (i, channel) in rgb.iter_mut().enumerate() {
        let byte = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16)
            .with_context(|| format!("invalid hex colour {:?}", hex))?;
        *channel = f32::from(byte) / 255.0;
    }
    Ok(rgb)
}
