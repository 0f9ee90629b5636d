//! Ordered extraction strategies
//!
//! A field is described by a [`StrategyChain`]: strategies are evaluated in
//! priority order and the first one producing a usable value wins. Layout
//! drift is handled by adding a strategy, not by writing a new parser. A
//! [`DefaultedChain`] closes a chain with an explicit configured value.

use anyhow::{Result, anyhow};
use scraper::{Html, Selector};
use tracing::{debug, trace, warn};

use super::error::ParseResult;

/// A single way of pulling raw text out of a document
#[derive(Debug, Clone)]
pub enum ExtractionStrategy {
    /// Trimmed text of the first matching element with non-empty text
    Text { selector: Selector, source: String },
    /// Trimmed, non-empty text of every matching element, newline-joined
    TextList { selector: Selector, source: String },
    /// Value of `attribute` on the first matching element that carries it
    Attribute {
        selector: Selector,
        attribute: String,
        source: String,
    },
}

impl ExtractionStrategy {
    pub fn text(selector: &str) -> Result<Self> {
        Ok(Self::Text {
            selector: compile(selector)?,
            source: selector.to_string(),
        })
    }

    pub fn text_list(selector: &str) -> Result<Self> {
        Ok(Self::TextList {
            selector: compile(selector)?,
            source: selector.to_string(),
        })
    }

    pub fn attribute(selector: &str, attribute: &str) -> Result<Self> {
        Ok(Self::Attribute {
            selector: compile(selector)?,
            attribute: attribute.to_string(),
            source: selector.to_string(),
        })
    }

    /// Human-readable description used in logs and errors
    pub fn describe(&self) -> String {
        match self {
            Self::Text { source, .. } | Self::TextList { source, .. } => source.clone(),
            Self::Attribute {
                source, attribute, ..
            } => format!("{source}[{attribute}]"),
        }
    }

    /// Applies the strategy. `None` means the strategy did not match.
    pub fn apply(&self, document: &Html) -> Option<String> {
        let value = match self {
            Self::Text { selector, .. } => document
                .select(selector)
                .map(|element| element.text().collect::<String>().trim().to_string())
                .find(|text| !text.is_empty()),
            Self::TextList { selector, .. } => {
                let items: Vec<String> = document
                    .select(selector)
                    .map(|element| element.text().collect::<String>().trim().to_string())
                    .filter(|text| !text.is_empty())
                    .collect();
                Some(items.join("\n"))
            }
            Self::Attribute {
                selector, attribute, ..
            } => document
                .select(selector)
                .filter_map(|element| element.value().attr(attribute))
                .map(str::trim)
                .find(|value| !value.is_empty())
                .map(str::to_string),
        };

        value.filter(|text| !text.is_empty())
    }
}

/// Priority-ordered strategies for one field
#[derive(Debug, Clone)]
pub struct StrategyChain {
    field: &'static str,
    strategies: Vec<ExtractionStrategy>,
}

impl StrategyChain {
    pub fn new(field: &'static str, strategies: Vec<ExtractionStrategy>) -> Self {
        Self { field, strategies }
    }

    /// Builds a chain from selector strings, skipping selectors that fail to
    /// compile. Errors only when none of them compile.
    pub fn from_selectors(
        field: &'static str,
        selectors: &[String],
        build: impl Fn(&str) -> Result<ExtractionStrategy>,
    ) -> Result<Self> {
        let mut strategies = Vec::new();
        let mut errors = Vec::new();

        for selector in selectors {
            match build(selector) {
                Ok(strategy) => strategies.push(strategy),
                Err(e) => {
                    warn!("Failed to compile {} selector '{}': {}", field, selector, e);
                    errors.push(format!("'{selector}': {e}"));
                }
            }
        }

        if strategies.is_empty() && !selectors.is_empty() {
            return Err(anyhow!(
                "No valid {} selectors compiled from {} attempts. Errors: {}",
                field,
                selectors.len(),
                errors.join(", ")
            ));
        }

        Ok(Self::new(field, strategies))
    }

    /// Closes the chain with `value`, used verbatim when no strategy yields
    /// a parsed value. Errors when `value` is blank.
    pub fn with_default(self, value: &str) -> Result<DefaultedChain> {
        let value = value.trim();
        if value.is_empty() {
            return Err(anyhow!("Default for {} must not be blank", self.field));
        }
        Ok(DefaultedChain {
            chain: self,
            default: value.to_string(),
        })
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn strategies(&self) -> &[ExtractionStrategy] {
        &self.strategies
    }

    pub fn describe(&self) -> Vec<String> {
        self.strategies.iter().map(ExtractionStrategy::describe).collect()
    }

    /// Raw text of the first strategy that matches
    pub fn first_text(&self, document: &Html) -> Option<String> {
        self.first_parsed(document, |raw| Ok(raw.to_string()))
    }

    /// First value that both matches and survives `parse`.
    ///
    /// A parse failure is treated exactly like a selector miss: it is logged
    /// and the next strategy is tried.
    pub fn first_parsed<T>(
        &self,
        document: &Html,
        parse: impl Fn(&str) -> ParseResult<T>,
    ) -> Option<T> {
        for (index, strategy) in self.strategies.iter().enumerate() {
            let Some(raw) = strategy.apply(document) else {
                trace!("{}: strategy {} ({}) did not match", self.field, index, strategy.describe());
                continue;
            };

            match parse(&raw) {
                Ok(value) => {
                    debug!("Extracted {} using strategy {} ({})", self.field, index, strategy.describe());
                    return Some(value);
                }
                Err(e) => {
                    debug!("{}: strategy {} ({}) matched but did not parse: {}", self.field, index, strategy.describe(), e);
                }
            }
        }

        debug!("Failed to extract {} using {} strategies", self.field, self.strategies.len());
        None
    }
}

/// A chain that always produces a value
#[derive(Debug, Clone)]
pub struct DefaultedChain {
    chain: StrategyChain,
    default: String,
}

impl DefaultedChain {
    pub fn default_value(&self) -> &str {
        &self.default
    }

    pub fn describe(&self) -> Vec<String> {
        let mut described = self.chain.describe();
        described.push(format!("default '{}'", self.default));
        described
    }

    /// First parsed strategy value, else the default. The default does not
    /// go through `parse`.
    pub fn resolve(&self, document: &Html, parse: impl Fn(&str) -> ParseResult<String>) -> String {
        self.chain.first_parsed(document, parse).unwrap_or_else(|| {
            debug!("Using default {} '{}'", self.chain.field, self.default);
            self.default.clone()
        })
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("invalid selector '{selector}': {e}"))
}
