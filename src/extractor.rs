// 🔎 Extraction Framework - one strategy per historical markup scheme
//
// The registry page has changed layout several times. Each layout gets its own
// strategy; they are tried newest-first and the first one that yields at least
// one valid entry wins. New layouts are appended, old ones stay as fallback.

use crate::error::{ExtractionError, FetchError};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

// ============================================================================
// CORE TYPES
// ============================================================================

/// MarkupScheme - which historical layout a strategy understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkupScheme {
    /// Current layout: JetEngine listing grid with logo links
    JetListingGrid,
    /// Elementor image boxes with a title per organization
    ElementorImageBox,
    /// Hand-written `company-block` cards
    CompanyBlock,
    /// Oldest layout: a heading followed by a plain list of links
    HeadingList,
}

impl MarkupScheme {
    pub fn name(&self) -> &str {
        match self {
            MarkupScheme::JetListingGrid => "Jet listing grid",
            MarkupScheme::ElementorImageBox => "Elementor image box",
            MarkupScheme::CompanyBlock => "Company block",
            MarkupScheme::HeadingList => "Heading + list",
        }
    }

    pub fn code(&self) -> &str {
        match self {
            MarkupScheme::JetListingGrid => "jet-grid",
            MarkupScheme::ElementorImageBox => "elementor-box",
            MarkupScheme::CompanyBlock => "company-block",
            MarkupScheme::HeadingList => "heading-list",
        }
    }
}

/// One raw entry pulled out of the markup, before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub identifier: String,
    pub name: String,
}

impl Candidate {
    pub fn new(identifier: &str, name: &str) -> Self {
        Candidate {
            identifier: identifier.trim().to_string(),
            name: collapse_whitespace(name),
        }
    }
}

/// Listing - the organizations currently on the registry page.
///
/// Can only be built non-empty; an empty observation is not an observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    entries: BTreeMap<String, String>,
    scheme: Option<MarkupScheme>,
}

impl Listing {
    /// `None` when `entries` is empty or any key is blank
    pub fn new(entries: BTreeMap<String, String>) -> Option<Self> {
        if entries.is_empty() || entries.keys().any(|k| k.trim().is_empty()) {
            return None;
        }
        Some(Listing { entries, scheme: None })
    }

    /// Convenience for literal listings
    pub fn from_pairs<I, K, V>(pairs: I) -> Option<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Tag with the scheme that produced it
    pub fn with_scheme(mut self, scheme: MarkupScheme) -> Self {
        self.scheme = Some(scheme);
        self
    }

    pub fn scheme(&self) -> Option<MarkupScheme> {
        self.scheme
    }

    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.entries.get(identifier).map(String::as_str)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

}

/// ExtractionResult - trust-tagged outcome of one extraction attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    /// Non-empty set of organizations currently listed
    Observed(Listing),

    /// Nothing trustworthy was seen; the reason is for logs and reports
    Unavailable(String),
}

impl ExtractionResult {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        ExtractionResult::Unavailable(reason.into())
    }

    pub fn is_observed(&self) -> bool {
        matches!(self, ExtractionResult::Observed(_))
    }

    pub fn listing(&self) -> Option<&Listing> {
        match self {
            ExtractionResult::Observed(listing) => Some(listing),
            ExtractionResult::Unavailable(_) => None,
        }
    }
}

// ============================================================================
// STRATEGY TRAIT
// ============================================================================

/// ExtractionStrategy - pure function from a parsed page to raw candidates.
///
/// Adding a layout = implementing this trait and appending it to the list.
/// Strategies do not validate; [`Extractor`] applies the shared filters.
pub trait ExtractionStrategy: Send + Sync {
    fn scheme(&self) -> MarkupScheme;

    /// Every entry found at this strategy's anchor, in document order
    fn candidates(&self, document: &Html) -> Vec<Candidate>;
}

// ============================================================================
// EXTRACTOR
// ============================================================================

pub struct Extractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Extractor {
    /// All known schemes, newest first
    pub fn new(heading_needle: &str) -> Self {
        Extractor {
            strategies: default_strategies(heading_needle),
        }
    }

    /// Custom priority order (first = highest)
    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Extractor { strategies }
    }

    pub fn schemes(&self) -> Vec<MarkupScheme> {
        self.strategies.iter().map(|s| s.scheme()).collect()
    }

    /// Fold a fetch outcome into an observation; transport failures are Unavailable
    pub fn observe(&self, fetched: Result<String, FetchError>) -> ExtractionResult {
        match fetched {
            Ok(markup) => self.extract(&markup),
            Err(err) => {
                warn!("Fetch failed, observation unavailable: {}", err);
                ExtractionResult::Unavailable(format!("fetch failed: {err}"))
            }
        }
    }

    /// Run the strategies in order against raw markup
    pub fn extract(&self, markup: &str) -> ExtractionResult {
        let document = Html::parse_document(markup);

        for strategy in &self.strategies {
            let scheme = strategy.scheme();
            let raw = strategy.candidates(&document);
            let found = raw.len();
            let entries = accept_candidates(raw);

            debug!(
                "Strategy {}: {} candidates, {} valid",
                scheme.code(),
                found,
                entries.len()
            );

            if let Some(listing) = Listing::new(entries) {
                info!(
                    "Extracted {} organizations using {} markup",
                    listing.len(),
                    scheme.name()
                );
                return ExtractionResult::Observed(listing.with_scheme(scheme));
            }
        }

        let err = ExtractionError::Empty {
            tried: self.strategies.len(),
        };
        warn!("No organizations extracted; the page structure may have changed again");
        ExtractionResult::Unavailable(err.to_string())
    }
}

/// Factory: every known strategy in priority order
pub fn default_strategies(heading_needle: &str) -> Vec<Box<dyn ExtractionStrategy>> {
    vec![
        Box::new(JetListingGridStrategy),
        Box::new(ElementorImageBoxStrategy),
        Box::new(CompanyBlockStrategy),
        Box::new(HeadingListStrategy::new(heading_needle)),
    ]
}

// ============================================================================
// SHARED FILTERS
// ============================================================================

const DOCUMENT_EXTENSIONS: [&str; 5] = [".pdf", ".doc", ".docx", ".xls", ".xlsx"];
const NON_ORGANIZATION_SCHEMES: [&str; 3] = ["mailto:", "tel:", "javascript:"];

/// Whether a link can identify an organization (not a document, mail link, anchor, ...)
pub fn is_organization_link(identifier: &str) -> bool {
    let lower = identifier.trim().to_lowercase();

    if lower.is_empty() || lower.starts_with('#') {
        return false;
    }

    if NON_ORGANIZATION_SCHEMES.iter().any(|s| lower.starts_with(s)) {
        return false;
    }

    let path = lower
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or(&lower);
    !DOCUMENT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Drop unusable candidates; first occurrence of an identifier wins
fn accept_candidates(candidates: Vec<Candidate>) -> BTreeMap<String, String> {
    let mut entries = BTreeMap::new();

    for candidate in candidates {
        if candidate.identifier.is_empty() || candidate.name.is_empty() {
            continue;
        }
        if !is_organization_link(&candidate.identifier) {
            debug!("Skipping non-organization link {}", candidate.identifier);
            continue;
        }
        entries.entry(candidate.identifier).or_insert(candidate.name);
    }

    entries
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All matches of `css` under `scope`; an unparsable selector matches nothing
fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(err) => {
            debug!("Invalid selector {:?}: {:?}", css, err);
            Vec::new()
        }
    }
}

fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    select_all(scope, css).into_iter().next()
}

fn text_of(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn attr_of<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name)
}

// ============================================================================
// STRATEGIES
// ============================================================================

/// Current layout.
///
/// ```html
/// <div class="jet-listing-grid__item">
///   <a class="jet-listing-grid__item-instance" href="https://org.example">
///     <img alt="Org Name" src="logo.png">
///   </a>
/// </div>
/// ```
pub struct JetListingGridStrategy;

impl ExtractionStrategy for JetListingGridStrategy {
    fn scheme(&self) -> MarkupScheme {
        MarkupScheme::JetListingGrid
    }

    fn candidates(&self, document: &Html) -> Vec<Candidate> {
        select_all(document.root_element(), "div.jet-listing-grid__item")
            .into_iter()
            .filter_map(|block| {
                let link = select_first(block, "a.jet-listing-grid__item-instance")?;
                let img = select_first(link, "img")?;
                Some(Candidate::new(
                    attr_of(link, "href").unwrap_or(""),
                    attr_of(img, "alt").unwrap_or(""),
                ))
            })
            .collect()
    }
}

/// Elementor image boxes: title text, logo alt as fallback
pub struct ElementorImageBoxStrategy;

impl ExtractionStrategy for ElementorImageBoxStrategy {
    fn scheme(&self) -> MarkupScheme {
        MarkupScheme::ElementorImageBox
    }

    fn candidates(&self, document: &Html) -> Vec<Candidate> {
        select_all(document.root_element(), "div.elementor-image-box-wrapper")
            .into_iter()
            .filter_map(|wrapper| {
                let link = select_first(wrapper, "a[href]")?;
                let title = select_first(wrapper, ".elementor-image-box-title")
                    .map(text_of)
                    .filter(|t| !t.is_empty());
                let name = title.or_else(|| {
                    select_first(wrapper, "img")
                        .and_then(|img| attr_of(img, "alt"))
                        .map(str::to_string)
                })?;
                Some(Candidate::new(attr_of(link, "href").unwrap_or(""), &name))
            })
            .collect()
    }
}

/// `company-block` cards with a heading and a website link
pub struct CompanyBlockStrategy;

impl ExtractionStrategy for CompanyBlockStrategy {
    fn scheme(&self) -> MarkupScheme {
        MarkupScheme::CompanyBlock
    }

    fn candidates(&self, document: &Html) -> Vec<Candidate> {
        select_all(document.root_element(), "div.company-block")
            .into_iter()
            .filter_map(|block| {
                let link = select_first(block, "a[href]")?;
                let heading = select_first(block, "h2, h3, h4")
                    .map(text_of)
                    .filter(|t| !t.is_empty());
                let name = heading.unwrap_or_else(|| text_of(link));
                Some(Candidate::new(attr_of(link, "href").unwrap_or(""), &name))
            })
            .collect()
    }
}

/// Oldest layout: the first list after a heading mentioning the needle.
///
/// "After" means document order, so the list may be a sibling of the heading
/// or sit inside a later wrapper.
pub struct HeadingListStrategy {
    needle: String,
}

impl HeadingListStrategy {
    pub fn new(needle: &str) -> Self {
        HeadingListStrategy {
            needle: needle.trim().to_lowercase(),
        }
    }

    fn is_anchor_heading(&self, element: ElementRef<'_>) -> bool {
        matches!(element.value().name(), "h1" | "h2" | "h3" | "h4")
            && !self.needle.is_empty()
            && text_of(element).to_lowercase().contains(&self.needle)
    }
}

impl ExtractionStrategy for HeadingListStrategy {
    fn scheme(&self) -> MarkupScheme {
        MarkupScheme::HeadingList
    }

    fn candidates(&self, document: &Html) -> Vec<Candidate> {
        let mut past_heading = false;

        for node in document.root_element().descendants() {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };

            if !past_heading {
                past_heading = self.is_anchor_heading(element);
                continue;
            }

            if matches!(element.value().name(), "ul" | "ol") {
                return select_all(element, "li a[href]")
                    .into_iter()
                    .map(|link| Candidate::new(attr_of(link, "href").unwrap_or(""), &text_of(link)))
                    .collect();
            }
        }

        Vec::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const JET_GRID_PAGE: &str = r#"
        <html><body>
          <div class="jet-listing-grid">
            <div class="jet-listing-grid__item">
              <a class="jet-listing-grid__item-instance" href=" https://alpha.example/ ">
                <img src="alpha.png" alt=" Alpha   Beheer ">
              </a>
            </div>
            <div class="jet-listing-grid__item">
              <a class="jet-listing-grid__item-instance" href="https://beta.example">
                <img src="beta.png" alt="Beta BV">
              </a>
            </div>
            <div class="jet-listing-grid__item">
              <a class="jet-listing-grid__item-instance" href="https://nologo.example"></a>
            </div>
            <div class="jet-listing-grid__item">
              <a class="jet-listing-grid__item-instance" href="/wp-content/uploads/reglement.pdf">
                <img alt="Reglement">
              </a>
            </div>
          </div>
        </body></html>
    "#;

    const ELEMENTOR_PAGE: &str = r#"
        <html><body>
          <div class="elementor-image-box-wrapper">
            <figure><a href="https://gamma.example"><img alt="Gamma logo"></a></figure>
            <div class="elementor-image-box-content">
              <h3 class="elementor-image-box-title">Gamma Leegstand</h3>
            </div>
          </div>
          <div class="elementor-image-box-wrapper">
            <figure><a href="https://delta.example"><img alt="Delta"></a></figure>
            <div class="elementor-image-box-content">
              <h3 class="elementor-image-box-title">  </h3>
            </div>
          </div>
        </body></html>
    "#;

    const COMPANY_BLOCK_PAGE: &str = r#"
        <html><body>
          <div class="company-block">
            <h3>Epsilon Vastgoed</h3>
            <a href="https://epsilon.example">website</a>
          </div>
          <div class="company-block">
            <a href="https://zeta.example">Zeta Beheer</a>
          </div>
          <div class="company-block">
            <h3>Contact</h3>
            <a href="mailto:info@registry.example">mail ons</a>
          </div>
        </body></html>
    "#;

    const HEADING_LIST_PAGE: &str = r##"
        <html><body>
          <ul class="menu"><li><a href="https://registry.example/home">Home</a></li></ul>
          <div class="intro"><h2>Gecertificeerde   bedrijven</h2></div>
          <p>De volgende organisaties zijn gecertificeerd:</p>
          <div class="content">
            <ul>
              <li><a href="https://eta.example">Eta</a></li>
              <li><a href="https://theta.example"> Theta
                 Groep </a></li>
              <li><a href="https://eta.example">Eta (duplicate)</a></li>
              <li><a href="/docs/certificaat.PDF?v=2">Certificaat</a></li>
              <li><a href="#top">Naar boven</a></li>
            </ul>
          </div>
          <ul><li><a href="https://iota.example">Not part of the list</a></li></ul>
        </body></html>
    "##;

    fn extractor() -> Extractor {
        Extractor::new("gecertificeerd")
    }

    #[test]
    fn test_default_priority_order() {
        assert_eq!(
            extractor().schemes(),
            vec![
                MarkupScheme::JetListingGrid,
                MarkupScheme::ElementorImageBox,
                MarkupScheme::CompanyBlock,
                MarkupScheme::HeadingList,
            ]
        );
    }

    #[test]
    fn test_jet_listing_grid() {
        let result = extractor().extract(JET_GRID_PAGE);
        let listing = result.listing().expect("observed");

        assert_eq!(listing.scheme(), Some(MarkupScheme::JetListingGrid));
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.get("https://alpha.example/"), Some("Alpha Beheer"));
        assert_eq!(listing.get("https://beta.example"), Some("Beta BV"));
        assert!(!listing.contains("/wp-content/uploads/reglement.pdf"));
    }

    #[test]
    fn test_elementor_fallback_when_grid_absent() {
        let result = extractor().extract(ELEMENTOR_PAGE);
        let listing = result.listing().expect("observed");

        assert_eq!(listing.scheme(), Some(MarkupScheme::ElementorImageBox));
        assert_eq!(listing.get("https://gamma.example"), Some("Gamma Leegstand"));
        // Blank title falls back to the logo alt text
        assert_eq!(listing.get("https://delta.example"), Some("Delta"));
    }

    #[test]
    fn test_company_block() {
        let result = extractor().extract(COMPANY_BLOCK_PAGE);
        let listing = result.listing().expect("observed");

        assert_eq!(listing.scheme(), Some(MarkupScheme::CompanyBlock));
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.get("https://epsilon.example"), Some("Epsilon Vastgoed"));
        assert_eq!(listing.get("https://zeta.example"), Some("Zeta Beheer"));
    }

    #[test]
    fn test_heading_list() {
        let result = extractor().extract(HEADING_LIST_PAGE);
        let listing = result.listing().expect("observed");

        assert_eq!(listing.scheme(), Some(MarkupScheme::HeadingList));
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.get("https://eta.example"), Some("Eta"));
        assert_eq!(listing.get("https://theta.example"), Some("Theta Groep"));
        assert!(!listing.contains("https://registry.example/home"));
        assert!(!listing.contains("https://iota.example"));
    }

    #[test]
    fn test_anchor_without_valid_entries_falls_through() {
        // Grid present but every entry is unusable; the heading list still matches
        let page = r#"
            <div class="jet-listing-grid__item">
              <a class="jet-listing-grid__item-instance" href=""><img alt="Empty href"></a>
            </div>
            <h3>Gecertificeerden</h3>
            <ol><li><a href="https://kappa.example">Kappa</a></li></ol>
        "#;

        let result = extractor().extract(page);
        let listing = result.listing().expect("observed");

        assert_eq!(listing.scheme(), Some(MarkupScheme::HeadingList));
        assert_eq!(listing.get("https://kappa.example"), Some("Kappa"));
    }

    #[test]
    fn test_no_anchor_is_unavailable() {
        let result = extractor().extract("<html><body><p>Onderhoud</p></body></html>");

        assert!(!result.is_observed());
        assert_eq!(
            result,
            ExtractionResult::Unavailable("no extraction strategy matched (4 tried)".to_string())
        );
    }

    #[test]
    fn test_empty_strategy_list_is_unavailable() {
        let result = Extractor::with_strategies(Vec::new()).extract(JET_GRID_PAGE);
        assert!(!result.is_observed());
    }

    #[test]
    fn test_fetch_error_is_unavailable() {
        let result = extractor().observe(Err(FetchError::Timeout(15)));

        match result {
            ExtractionResult::Unavailable(reason) => assert!(reason.contains("timed out")),
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_observe_passes_markup_through() {
        let result = extractor().observe(Ok(JET_GRID_PAGE.to_string()));
        assert!(result.is_observed());
    }

    #[test]
    fn test_organization_link_filter() {
        assert!(is_organization_link("https://org.example/"));
        assert!(is_organization_link("https://org.example/pdf-tools"));
        assert!(!is_organization_link("https://org.example/brochure.pdf"));
        assert!(!is_organization_link("https://org.example/form.DOCX#page=2"));
        assert!(!is_organization_link("mailto:info@org.example"));
        assert!(!is_organization_link("tel:+31201234567"));
        assert!(!is_organization_link("#"));
        assert!(!is_organization_link("   "));
    }

    #[test]
    fn test_listing_rejects_empty() {
        assert!(Listing::new(BTreeMap::new()).is_none());
        assert!(Listing::from_pairs([("", "Blank")]).is_none());
    }
}
