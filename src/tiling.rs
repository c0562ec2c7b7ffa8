//! Image token formulas.
//!
//! Vision models charge images by resolution, and every provider draws the
//! tiers differently. The engine only sees the [`ImageTiling`] trait; the
//! formulas below are configuration (`[image_tiling]` in config.toml).

use serde::{Deserialize, Serialize};

use crate::content::{ImageDescriptor, ImageDetail};
use crate::error::CostError;

pub trait ImageTiling: Send + Sync {
    /// Tokens charged for one image. Dimensions are already validated as positive.
    fn tokens(&self, image: &ImageDescriptor) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelTier {
    /// Images with fewer pixels than this fall in the tier.
    pub max_pixels: u64,
    pub tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "formula", rename_all = "snake_case")]
pub enum TilingConfig {
    /// `base_tokens` up to one `tile_side`² square, plus `tokens_per_tile`
    /// for every further concentric tier the pixel area reaches into.
    AreaTiers {
        base_tokens: u64,
        tile_side: u32,
        tokens_per_tile: u64,
        #[serde(default)]
        max_tiles: Option<u64>,
    },
    /// `base_tokens` plus `tokens_per_tile` for each cell of a
    /// `tile_side` grid laid over the image.
    Grid {
        base_tokens: u64,
        tile_side: u32,
        tokens_per_tile: u64,
    },
    /// Fixed counts by pixel-count thresholds, checked in order.
    Stepped {
        tiers: Vec<PixelTier>,
        above_tokens: u64,
    },
}

impl Default for TilingConfig {
    fn default() -> Self {
        TilingConfig::AreaTiers {
            base_tokens: 85,
            tile_side: 512,
            tokens_per_tile: 170,
            max_tiles: None,
        }
    }
}

impl TilingConfig {
    /// The 512px grid used by GPT-4 class vision models.
    pub fn openai_grid() -> Self {
        TilingConfig::Grid {
            base_tokens: 85,
            tile_side: 512,
            tokens_per_tile: 170,
        }
    }

    /// Coarse pixel-count tiers used for Claude and Gemini style estimates.
    pub fn pixel_steps() -> Self {
        TilingConfig::Stepped {
            tiers: vec![
                PixelTier {
                    max_pixels: 400 * 400,
                    tokens: 1600,
                },
                PixelTier {
                    max_pixels: 800 * 800,
                    tokens: 3000,
                },
            ],
            above_tokens: 6000,
        }
    }

    pub fn validate(&self) -> Result<(), CostError> {
        match self {
            TilingConfig::AreaTiers { tile_side, .. } | TilingConfig::Grid { tile_side, .. } => {
                if *tile_side == 0 {
                    return Err(CostError::Config("image_tiling.tile_side must be positive".into()));
                }
            }
            TilingConfig::Stepped { tiers, .. } => {
                if tiers.windows(2).any(|w| w[0].max_pixels >= w[1].max_pixels) {
                    return Err(CostError::Config(
                        "image_tiling.tiers must have increasing max_pixels".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl ImageTiling for TilingConfig {
    fn tokens(&self, image: &ImageDescriptor) -> u64 {
        let width = u64::from(image.width);
        let height = u64::from(image.height);
        match self {
            TilingConfig::AreaTiers {
                base_tokens,
                tile_side,
                tokens_per_tile,
                max_tiles,
            } => {
                if image.detail == ImageDetail::Low {
                    return *base_tokens;
                }
                let extra = area_tiers_beyond_base(width * height, u64::from(*tile_side).max(1));
                let extra = max_tiles.map_or(extra, |cap| extra.min(cap));
                base_tokens + extra * tokens_per_tile
            }
            TilingConfig::Grid {
                base_tokens,
                tile_side,
                tokens_per_tile,
            } => {
                if image.detail == ImageDetail::Low {
                    return *base_tokens;
                }
                let side = u64::from(*tile_side).max(1);
                let tiles = width.div_ceil(side) * height.div_ceil(side);
                base_tokens + tiles * tokens_per_tile
            }
            TilingConfig::Stepped {
                tiers,
                above_tokens,
            } => {
                let pixels = width * height;
                tiers
                    .iter()
                    .find(|t| pixels < t.max_pixels)
                    .map_or(*above_tokens, |t| t.tokens)
            }
        }
    }
}

/// Number of `side`-square tiers beyond the first that `area` reaches:
/// the smallest `k` with `(k * side)² >= area`, minus one.
fn area_tiers_beyond_base(area: u64, side: u64) -> u64 {
    let mut root = area.isqrt();
    if root * root < area {
        root += 1;
    }
    root.div_ceil(side).saturating_sub(1)
}
