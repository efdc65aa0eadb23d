//! Layout analysis thresholds.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Named, overridable thresholds for reading order, segmentation and chapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Vertical gap (in body-size units) above which a paragraph breaks
    pub paragraph_gap_threshold: f32,

    /// Size ratio to body text at or above which a line is a heading
    pub heading_size_ratio: f32,

    /// Minimum gutter width, as a fraction of the page width, to split columns
    pub column_gap_fraction: f32,

    /// TOC entries nested deeper than this are folded
    pub max_toc_depth: u8,

    /// Heading level that starts a chapter; `None` uses the topmost observed
    pub chapter_heading_level: Option<u8>,

    /// Vertical centre tolerance, as a fraction of the height, for co-line fragments
    pub line_tolerance: f32,

    /// Size ratios (descending) for heading levels 1, 2, ...; below the last is one level lower
    pub heading_tiers: Vec<f32>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            paragraph_gap_threshold: 0.8,
            heading_size_ratio: 1.2,
            column_gap_fraction: 0.04,
            max_toc_depth: 3,
            chapter_heading_level: None,
            line_tolerance: 0.5,
            heading_tiers: vec![2.0, 1.5],
        }
    }
}

impl LayoutConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_paragraph_gap(mut self, threshold: f32) -> Self {
        self.paragraph_gap_threshold = threshold;
        self
    }

    pub fn with_heading_ratio(mut self, ratio: f32) -> Self {
        self.heading_size_ratio = ratio;
        self
    }

    pub fn with_column_gap(mut self, fraction: f32) -> Self {
        self.column_gap_fraction = fraction;
        self
    }

    pub fn with_max_toc_depth(mut self, depth: u8) -> Self {
        self.max_toc_depth = depth;
        self
    }

    pub fn with_chapter_level(mut self, level: u8) -> Self {
        self.chapter_heading_level = Some(level);
        self
    }

    pub fn with_heading_tiers(mut self, tiers: Vec<f32>) -> Self {
        self.heading_tiers = tiers;
        self
    }

    /// Lowest heading level the tiers can produce.
    pub fn lowest_heading_level(&self) -> u8 {
        (self.heading_tiers.len() + 1).min(6) as u8
    }

    /// Check that every threshold is in range.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f32) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )))
            }
        }

        positive("paragraph_gap_threshold", self.paragraph_gap_threshold)?;
        positive("heading_size_ratio", self.heading_size_ratio)?;
        positive("line_tolerance", self.line_tolerance)?;
        if !(self.column_gap_fraction.is_finite()
            && self.column_gap_fraction > 0.0
            && self.column_gap_fraction < 1.0)
        {
            return Err(Error::InvalidConfig(format!(
                "column_gap_fraction must be between 0 and 1, got {}",
                self.column_gap_fraction
            )));
        }
        if self.max_toc_depth == 0 {
            return Err(Error::InvalidConfig(
                "max_toc_depth must be at least 1".to_string(),
            ));
        }
        if let Some(level) = self.chapter_heading_level {
            if !(1..=6).contains(&level) {
                return Err(Error::InvalidConfig(format!(
                    "chapter_heading_level must be between 1 and 6, got {}",
                    level
                )));
            }
        }
        if self.heading_tiers.len() > 5 {
            return Err(Error::InvalidConfig(
                "at most five heading tiers are supported".to_string(),
            ));
        }
        for (i, tier) in self.heading_tiers.iter().enumerate() {
            positive("heading_tiers", *tier)?;
            if i > 0 && *tier >= self.heading_tiers[i - 1] {
                return Err(Error::InvalidConfig(
                    "heading_tiers must be strictly descending".to_string(),
                ));
            }
        }
        Ok(())
    }
}
