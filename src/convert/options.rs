//! Conversion options.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layout::LayoutConfig;
use crate::parser::{PageSelection, ParseOptions};

/// Options for a PDF to EPUB conversion.
///
/// Layout thresholds and parse options are flattened, so a JSON config file
/// lists every knob at the top level. Unspecified fields take defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Layout analysis thresholds
    #[serde(flatten)]
    pub layout: LayoutConfig,

    /// Extraction options
    #[serde(flatten)]
    pub parse: ParseOptions,

    /// Title overriding the document metadata
    pub title: Option<String>,

    /// Author overriding the document metadata
    pub author: Option<String>,

    /// Language tag overriding the document metadata
    pub language: Option<String>,

    /// Stylesheet contents replacing the default stylesheet
    #[serde(skip)]
    pub stylesheet: Option<String>,

    /// Emit page-break markers at source page starts
    pub page_markers: bool,

    /// Page holding a printed table of contents; its entries set the
    /// chapter boundaries and the page itself is left out of the book
    pub toc_page: Option<u32>,
}

impl ConvertOptions {
    /// Create new conversion options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Parse options from JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    /// Set layout thresholds.
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    /// Set extraction options.
    pub fn with_parse_options(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the language tag.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set a custom stylesheet.
    pub fn with_stylesheet(mut self, css: impl Into<String>) -> Self {
        self.stylesheet = Some(css.into());
        self
    }

    /// Enable or disable page-break markers.
    pub fn with_page_markers(mut self, enabled: bool) -> Self {
        self.page_markers = enabled;
        self
    }

    /// Take chapters from the printed contents on `page`.
    pub fn with_toc_page(mut self, page: u32) -> Self {
        self.toc_page = Some(page);
        self
    }

    /// Restrict conversion to some pages.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.parse.pages = pages;
        self
    }

    /// Check every option for range errors.
    pub fn validate(&self) -> Result<()> {
        self.layout.validate()?;
        if self.parse.max_form_depth == 0 {
            return Err(Error::InvalidConfig(
                "max_form_depth must be at least 1".to_string(),
            ));
        }
        if self.toc_page == Some(0) {
            return Err(Error::InvalidConfig(
                "toc_page is a 1-based page number".to_string(),
            ));
        }
        if let Some(ref language) = self.language {
            let valid = !language.is_empty()
                && language
                    .split('-')
                    .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()));
            if !valid {
                return Err(Error::InvalidConfig(format!(
                    "language must be a BCP 47 tag, got \"{}\"",
                    language
                )));
            }
        }
        Ok(())
    }
}
