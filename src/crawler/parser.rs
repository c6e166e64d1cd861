//! Listing page parser
//!
//! This module turns one catalog page into partial listings:
//! - Title normalization (announcement suffix and model-year ranges removed)
//! - Catalog identifier from the card's detail anchor
//! - Price, kilometers and model year from the card text
//! - Thumbnail and absolute listing URL

use crate::listing::ScrapedListing;
use crate::url::{absolutize_href, normalize_image_url};
use chrono::Datelike;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Suffix the catalog appends to every card title
pub const ANNOUNCEMENT_MARKER: &str = " - Annuncio";

/// Prefix of the card link's `data-target` attribute
const DETAIL_TARGET_PREFIX: &str = "#annuncio_";

const CARD_SELECTOR: &str = ".dlr-card";
const LINK_SELECTOR: &str = ".dlr-card__link";
const PRICE_SELECTOR: &str = ".dlr-card__extrainfo__price";
const META_SELECTOR: &str = ".dlr-card__meta__item";
const IMAGE_SELECTOR: &str = ".dlr-card__image__imagefile";

/// Failure to build the listing parser
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("Invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Parser for catalog listing pages
///
/// Selectors and patterns are compiled once and reused for every page of a
/// crawl.
pub struct ListingParser {
    card: Selector,
    link: Selector,
    price: Selector,
    meta: Selector,
    image: Selector,
    title_year: Regex,
    year: Regex,
}

impl ListingParser {
    /// Compiles the card selectors and text patterns
    pub fn new() -> Result<Self, ParserError> {
        Ok(Self {
            card: compile_selector(CARD_SELECTOR)?,
            link: compile_selector(LINK_SELECTOR)?,
            price: compile_selector(PRICE_SELECTOR)?,
            meta: compile_selector(META_SELECTOR)?,
            image: compile_selector(IMAGE_SELECTOR)?,
            title_year: Regex::new(r"\s*\([0-9]{4}.*?\)")?,
            year: Regex::new(r"([0-9]{4})")?,
        })
    }

    /// Parses every card on a listing page
    ///
    /// # Arguments
    ///
    /// * `html` - The listing page body
    /// * `origin` - Catalog origin used for relative links
    /// * `current_year` - Year assigned when a card carries none
    ///
    /// # Returns
    ///
    /// The number of cards found on the page, and the listings built from
    /// them. Cards whose normalized title is empty are counted but skipped.
    pub fn parse_page(
        &self,
        html: &str,
        origin: &str,
        current_year: i32,
    ) -> (usize, Vec<ScrapedListing>) {
        let document = Html::parse_document(html);

        let mut cards = 0;
        let mut listings = Vec::new();
        for card in document.select(&self.card) {
            cards += 1;
            if let Some(listing) = self.parse_card(card, origin, current_year) {
                listings.push(listing);
            }
        }

        (cards, listings)
    }

    /// Normalizes a raw card title
    ///
    /// Keeps the text before the announcement marker, uppercases it, and
    /// removes parentheticals that start with a 4-digit year.
    ///
    /// ```
    /// use moto_harvest::crawler::ListingParser;
    ///
    /// let parser = ListingParser::new().unwrap();
    /// assert_eq!(
    ///     parser.normalize_title("Honda CB 500 F (2017 - 19) - Annuncio 9820726"),
    ///     "HONDA CB 500 F"
    /// );
    /// ```
    pub fn normalize_title(&self, raw: &str) -> String {
        let left = raw.split(ANNOUNCEMENT_MARKER).next().unwrap_or("");
        let mut title = left.trim().to_uppercase();
        // Removing one group can close up a nested one, so repeat to a fixed point
        loop {
            let stripped = self.title_year.replace_all(&title, "").into_owned();
            if stripped == title {
                break;
            }
            title = stripped;
        }
        title.trim().to_string()
    }

    fn parse_card(
        &self,
        card: ElementRef<'_>,
        origin: &str,
        current_year: i32,
    ) -> Option<ScrapedListing> {
        let link = card.select(&self.link).next();

        let title = self.normalize_title(link_attr(link, "title"));
        if title.is_empty() {
            return None;
        }

        let source_id = source_id_from_target(link_attr(link, "data-target"));
        let external_url = absolutize_href(link_attr(link, "href"), origin);

        let price = card
            .select(&self.price)
            .next()
            .map(|e| digits_to_number(&element_text(e)))
            .unwrap_or(0);

        let mut kilometers = 0;
        let mut year = current_year;
        for item in card.select(&self.meta) {
            let text = element_text(item);
            let lower = text.to_lowercase();
            if lower.contains("km") {
                kilometers = digits_to_number(&text);
            } else if lower.contains("del") || self.year.is_match(&text) {
                if let Some(found) = self
                    .year
                    .captures(&text)
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse::<i32>().ok())
                {
                    year = found;
                }
            }
        }

        let thumbnail_url = card
            .select(&self.image)
            .next()
            .and_then(|img| {
                img.value()
                    .attr("src")
                    .filter(|s| !s.trim().is_empty())
                    .or_else(|| img.value().attr("data-src"))
            })
            .map(normalize_image_url)
            .unwrap_or_default();

        let images = if thumbnail_url.is_empty() {
            Vec::new()
        } else {
            vec![thumbnail_url.clone()]
        };

        Some(ScrapedListing {
            source_id,
            title,
            price,
            kilometers,
            year,
            thumbnail_url,
            images,
            external_url,
            selected: false,
        })
    }
}

/// Parses a listing page using the current calendar year as fallback
///
/// # Example
///
/// ```
/// use moto_harvest::crawler::parse_listing_page;
///
/// let html = r##"<div class="dlr-card">
///   <a class="dlr-card__link" title="Ktm 390 Duke - Annuncio 1" href="/d/1" data-target="#annuncio_1"></a>
/// </div>"##;
/// let listings = parse_listing_page(html, "https://dealer.moto.it").unwrap();
/// assert_eq!(listings[0].title, "KTM 390 DUKE");
/// assert_eq!(listings[0].source_id, "1");
/// ```
pub fn parse_listing_page(
    html: &str,
    origin: &str,
) -> Result<Vec<ScrapedListing>, ParserError> {
    let parser = ListingParser::new()?;
    Ok(parser.parse_page(html, origin, current_year()).1)
}

/// The current calendar year in local time
pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

fn compile_selector(css: &str) -> Result<Selector, ParserError> {
    Selector::parse(css).map_err(|e| ParserError::Selector {
        selector: css.to_string(),
        reason: format!("{:?}", e),
    })
}

fn link_attr<'a>(link: Option<ElementRef<'a>>, name: &str) -> &'a str {
    link.and_then(|l| l.value().attr(name)).unwrap_or("")
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Keeps only ASCII digits and parses them; anything unparseable is 0
fn digits_to_number(text: &str) -> u64 {
    text.chars()
        .filter(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

fn source_id_from_target(target: &str) -> String {
    let target = target.trim();
    target
        .strip_prefix(DETAIL_TARGET_PREFIX)
        .unwrap_or(target)
        .to_string()
}
