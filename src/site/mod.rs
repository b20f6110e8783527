//! Site profile: every URL and selector the pipeline touches, in one place

/// Configuration for one retail site.
///
/// Selectors are grouped by the phase that consumes them so the navigation
/// code, the listing extractor, and the detail extractor each depend on
/// their own slice only.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    /// Display name for the site
    pub name: String,
    /// Fixed origin used to absolutize relative product links
    pub origin: String,
    /// Entry URL for a fresh session
    pub home_url: String,
    /// Selectors for the search-and-filter flow
    pub flow: FlowSelectors,
    /// Selectors for the listing page card fields
    pub listing: ListingSelectors,
    /// Selectors for the product detail page
    pub detail: DetailSelectors,
}

/// Controls driven while navigating from the home page to a filtered listing.
#[derive(Debug, Clone)]
pub struct FlowSelectors {
    /// Country/splash interstitial dismiss link (may not appear)
    pub splash_dismiss: String,
    /// Search input field
    pub search_input: String,
    /// Search submit button
    pub search_submit: String,
    /// Category chip, XPath with a `{label}` placeholder
    pub category_chip_xpath: String,
    /// "Show all" expansion control for the brand facet
    pub brand_expand: String,
    /// Header of the sheet/modal that can appear after brand selection
    pub modal_header: String,
    /// Close button of that sheet/modal
    pub modal_close: String,
    /// Rating-floor checkbox, XPath with a `{rating}` placeholder
    pub rating_floor_xpath: String,
}

/// CSS selectors resolving the six fields of a listing card.
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    /// Container selector for one product card
    pub card: String,
    /// Product title within a card
    pub title: String,
    /// Display price within a card
    pub price: String,
    /// Rating text within a card
    pub rating: String,
    /// Review count within a card
    pub review_count: String,
    /// Product link within a card (href attribute)
    pub link: String,
    /// Attribute rows carrying model and SKU labels
    pub attribute_row: String,
    /// Value span within an attribute row
    pub attribute_value: String,
}

/// Selectors for the specification table and paginated review widget.
#[derive(Debug, Clone)]
pub struct DetailSelectors {
    /// One specification row
    pub spec_row: String,
    /// Label half of a specification row
    pub spec_label: String,
    /// Value half of a specification row
    pub spec_value: String,
    /// One review item
    pub review_item: String,
    /// Review title within an item
    pub review_title: String,
    /// Review rating within an item
    pub review_rating: String,
    /// Review body within an item
    pub review_body: String,
    /// "Next page" control of the review widget; exhausted when absent or
    /// its class attribute carries the disabled marker
    pub review_next: String,
}

impl SiteProfile {
    /// Profile for bestbuy.com.
    pub fn bestbuy() -> Self {
        Self {
            name: "BestBuy".to_string(),
            origin: "https://www.bestbuy.com".to_string(),
            home_url: "https://www.bestbuy.com/?intl=nosplash".to_string(),
            flow: FlowSelectors {
                splash_dismiss: "a.us-link".to_string(),
                search_input: "#autocomplete-search-bar".to_string(),
                search_submit: "#autocomplete-search-button".to_string(),
                category_chip_xpath: "//span[contains(text(), '{label}')]".to_string(),
                brand_expand: "button[data-show-more='brand_facet']".to_string(),
                modal_header: "[data-testid='sheet-id-header']".to_string(),
                modal_close: "[data-testid='sheet-id-closeButton']".to_string(),
                rating_floor_xpath:
                    "//label[contains(., '{rating}') and contains(., 'Up')]//input".to_string(),
            },
            listing: ListingSelectors {
                card: "li.product-list-item".to_string(),
                title: "h2.product-title".to_string(),
                price: "div[data-testid='medium-customer-price']".to_string(),
                rating: ".c-ratings-reviews .visually-hidden".to_string(),
                review_count: ".c-reviews".to_string(),
                link: "a.product-list-item-link".to_string(),
                attribute_row: "div.product-attributes div.attribute".to_string(),
                attribute_value: "span.value".to_string(),
            },
            detail: DetailSelectors {
                spec_row: "div.row".to_string(),
                spec_label: "div.row-title".to_string(),
                spec_value: "div.row-value".to_string(),
                review_item: "div.review-item".to_string(),
                review_title: ".review-title".to_string(),
                review_rating: ".c-review-average".to_string(),
                review_body: ".pre-white-space".to_string(),
                review_next: ".review-pagination .pagination-button[aria-label='Next Page']"
                    .to_string(),
            },
        }
    }

    /// Resolve the category chip XPath for a concrete chip label.
    pub fn category_chip(&self, label: &str) -> String {
        self.flow.category_chip_xpath.replace("{label}", label)
    }

    /// Resolve the rating-floor XPath for a concrete minimum rating.
    pub fn rating_floor(&self, min_rating: u8) -> String {
        self.flow
            .rating_floor_xpath
            .replace("{rating}", &min_rating.to_string())
    }
}
