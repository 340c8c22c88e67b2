//! HTML parser for extracting listing records
//!
//! A search-result page is a list of cards. Each card holds an info block
//! with the company, job title and location; the link to the posting sits on
//! an anchor next to the info block, so it is looked up from the block's
//! parent element.

use crate::record::Record;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

const RESULT_BLOCK: &str = "div.base-search-card__info";
const COMPANY: &str = "h4.base-search-card__subtitle";
const TITLE: &str = "h3.base-search-card__title";
const LINK: &str = "a[href]";
const LOCATION: &str = "span.job-search-card__location";

/// Errors produced while extracting records from a page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("result block {index} is missing its {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("invalid selector {selector}: {message}")]
    Selector {
        selector: &'static str,
        message: String,
    },
}

struct ListingSelectors {
    block: Selector,
    company: Selector,
    title: Selector,
    link: Selector,
    location: Selector,
}

impl ListingSelectors {
    fn new() -> Result<Self, ParseError> {
        Ok(Self {
            block: selector(RESULT_BLOCK)?,
            company: selector(COMPANY)?,
            title: selector(TITLE)?,
            link: selector(LINK)?,
            location: selector(LOCATION)?,
        })
    }
}

fn selector(css: &'static str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector {
        selector: css,
        message: format!("{:?}", e),
    })
}

/// Parses a search-result page into records
///
/// # Extraction Rules
///
/// | Field | Source |
/// |-------|--------|
/// | primary_key | `h4.base-search-card__subtitle` text |
/// | title | `h3.base-search-card__title` text |
/// | link | first `a[href]` under the block's parent |
/// | location | `span.job-search-card__location` text |
///
/// A page with no result blocks yields an empty vector. A block missing
/// any of the four fields fails the whole page.
///
/// # Example
///
/// ```
/// use listing_harvest::crawler::parse_listing;
///
/// let html = r#"<li><div class="base-card">
///   <a href="https://example.com/jobs/1"></a>
///   <div class="base-search-card__info">
///     <h3 class="base-search-card__title">Engineer</h3>
///     <h4 class="base-search-card__subtitle">Acme</h4>
///     <span class="job-search-card__location">Remote</span>
///   </div>
/// </div></li>"#;
/// let records = parse_listing(html).unwrap();
/// assert_eq!(records[0].primary_key(), "Acme");
/// ```
pub fn parse_listing(html: &str) -> Result<Vec<Record>, ParseError> {
    let selectors = ListingSelectors::new()?;
    let document = Html::parse_document(html);

    document
        .select(&selectors.block)
        .enumerate()
        .map(|(index, block)| extract_record(index, block, &selectors))
        .collect()
}

fn extract_record(
    index: usize,
    block: ElementRef<'_>,
    selectors: &ListingSelectors,
) -> Result<Record, ParseError> {
    let missing = |field| ParseError::MissingField { index, field };

    let company = element_text(block, &selectors.company).ok_or_else(|| missing("company"))?;
    let title = element_text(block, &selectors.title).ok_or_else(|| missing("title"))?;
    let location = element_text(block, &selectors.location).ok_or_else(|| missing("location"))?;

    let link = block
        .parent()
        .and_then(ElementRef::wrap)
        .and_then(|card| card.select(&selectors.link).next())
        .and_then(|anchor| anchor.value().attr("href"))
        .ok_or_else(|| missing("link"))?;

    Ok(Record::new(company, title, link, location))
}

fn element_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(|element| element.text().collect::<String>())
}
