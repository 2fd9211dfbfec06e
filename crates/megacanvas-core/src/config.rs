//! Canvas configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geom::SizeBounds;

/// Per-pool eviction policy. Frame counts assume one `tick` per rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolPolicy {
    /// Fixed number of idle slots. The table never grows.
    pub capacity: usize,

    /// Granularity that fresh surface sizes are padded to.
    pub padding: u32,

    /// Frames between squish passes.
    pub squish_interval: u32,

    /// Frames an idle surface may sit unused before it is destroyed.
    pub max_age: u32,

    /// Slots kept by a squish pass; every occupied slot at or past this index is evicted.
    pub cull_target: usize,
}

impl Default for PoolPolicy {
    fn default() -> Self {
        Self {
            capacity: 64,
            padding: 128,
            squish_interval: 60 * 15,
            max_age: 60 * 5,
            cull_target: 32,
        }
    }
}

impl PoolPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::Config("pool capacity must be at least 1".into()));
        }
        if self.padding == 0 {
            return Err(Error::Config("padding must be at least 1".into()));
        }
        if self.squish_interval == 0 {
            return Err(Error::Config("squish_interval must be at least 1".into()));
        }
        if self.max_age == 0 {
            return Err(Error::Config("max_age must be at least 1".into()));
        }
        if self.cull_target > self.capacity {
            return Err(Error::Config(format!(
                "cull_target {} exceeds capacity {}",
                self.cull_target, self.capacity
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Smallest width/height a caller may request.
    pub min_size: u32,

    /// Largest width/height a caller may request. Padded sizes are clamped to this too.
    pub max_size: u32,

    /// Sample count used by the multisampled pool.
    pub multisample_count: u32,

    /// Policy shared by every pool the manager creates.
    pub pool: PoolPolicy,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_size: 1,
            max_size: 4096,
            multisample_count: 8,
            pool: PoolPolicy::default(),
        }
    }
}

impl CanvasConfig {
    pub fn bounds(&self) -> SizeBounds {
        SizeBounds::new(self.min_size, self.max_size)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_size == 0 {
            return Err(Error::Config("min_size must be at least 1".into()));
        }
        if self.min_size > self.max_size {
            return Err(Error::Config(format!(
                "min_size {} exceeds max_size {}",
                self.min_size, self.max_size
            )));
        }
        self.pool.validate()
    }

    /// Parse a JSON document; missing fields fall back to defaults.
    pub fn from_json(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `MEGACANVAS_MIN_SIZE` / `MEGACANVAS_MAX_SIZE`: request bounds
    /// - `MEGACANVAS_MULTISAMPLE_COUNT`: MSAA sample count
    /// - `MEGACANVAS_POOL_CAPACITY`: idle slots per pool
    /// - `MEGACANVAS_PADDING`: size padding granularity
    /// - `MEGACANVAS_SQUISH_INTERVAL`: frames between squish passes
    /// - `MEGACANVAS_MAX_AGE`: frames before an idle surface is destroyed
    /// - `MEGACANVAS_CULL_TARGET`: slots a squish pass keeps
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`CanvasConfig::from_env`] with a custom variable source.
    /// Unparseable values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = parse(&lookup, "MEGACANVAS_MIN_SIZE") {
            cfg.min_size = v;
        }

        if let Some(v) = parse(&lookup, "MEGACANVAS_MAX_SIZE") {
            cfg.max_size = v;
        }

        if let Some(v) = parse(&lookup, "MEGACANVAS_MULTISAMPLE_COUNT") {
            cfg.multisample_count = v;
        }

        if let Some(v) = parse(&lookup, "MEGACANVAS_POOL_CAPACITY") {
            cfg.pool.capacity = v;
        }

        if let Some(v) = parse(&lookup, "MEGACANVAS_PADDING") {
            cfg.pool.padding = v;
        }

        if let Some(v) = parse(&lookup, "MEGACANVAS_SQUISH_INTERVAL") {
            cfg.pool.squish_interval = v;
        }

        if let Some(v) = parse(&lookup, "MEGACANVAS_MAX_AGE") {
            cfg.pool.max_age = v;
        }

        if let Some(v) = parse(&lookup, "MEGACANVAS_CULL_TARGET") {
            cfg.pool.cull_target = v;
        }

        cfg
    }
}

fn parse<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}
