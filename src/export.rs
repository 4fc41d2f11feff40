//! Quote document export.
//!
//! Builds a paginated quote document from a priced result: environment summary,
//! plan features, selected options, labor, the price breakdown and contact
//! footer. The logo is optional; when it cannot be loaded the document is
//! produced without it.

use askama::Template;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::NaiveDate;
use image::ImageFormat;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, warn};

use crate::pricing::calculators::format_quantity;
use crate::pricing::{PricingEngine, QuoteOutcome, QuoteResult};
use crate::render::{Breakdown, RenderError};

/// Rendered logo width in page units
const LOGO_WIDTH: f32 = 40.0;
/// Length of the review meeting included in the fixed labor hours
const REVIEW_MEETING_HOURS: Decimal = dec!(0.5);

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Quote has not been priced")]
    NotPriced,

    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Debug, thiserror::Error)]
pub enum LogoError {
    #[error("Logo unavailable: {0}")]
    Unavailable(String),

    #[error("Logo could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
}

/// Where the document logo comes from
pub trait LogoSource {
    /// Raw PNG bytes
    fn load(&self) -> Result<Vec<u8>, LogoError>;
}

/// Logo held in memory
#[derive(Debug, Clone)]
pub struct StaticLogo(pub Vec<u8>);

impl LogoSource for StaticLogo {
    fn load(&self) -> Result<Vec<u8>, LogoError> {
        if self.0.is_empty() {
            return Err(LogoError::Unavailable("empty image".to_string()));
        }
        Ok(self.0.clone())
    }
}

/// Decoded logo placed at the top of the first page
#[derive(Debug, Clone, PartialEq)]
pub struct Logo {
    pub png: Vec<u8>,
    pub width: f32,
    /// Scaled to keep the source aspect ratio
    pub height: f32,
}

impl Logo {
    fn decode(png: Vec<u8>) -> Result<Self, LogoError> {
        let image = image::load_from_memory_with_format(&png, ImageFormat::Png)?;
        if image.width() == 0 {
            return Err(LogoError::Unavailable("zero width image".to_string()));
        }
        let height = image.height() as f32 * LOGO_WIDTH / image.width() as f32;
        Ok(Self {
            png,
            width: LOGO_WIDTH,
            height,
        })
    }

    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", BASE64.encode(&self.png))
    }
}

/// Static document copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branding {
    pub title: String,
    pub file_name: String,
    /// Printed at the bottom of every page
    pub contact_lines: Vec<String>,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            title: "IP Solutions Security Quote".to_string(),
            file_name: "IP_Solutions_Security_Quote.html".to_string(),
            contact_lines: vec![
                "For questions or to proceed with this quote, please contact IP Solutions."
                    .to_string(),
                "Call (574) 259-6000 or email sales@phonedatasupport.net".to_string(),
            ],
        }
    }
}

/// A unit of document content; never split across pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(String),
    Text(String),
    Bullet(String),
    /// Second-level bullet
    Detail(String),
    Total(String),
    Note(String),
    Spacer,
}

impl Block {
    /// Vertical space taken on the page
    pub fn height(&self) -> u32 {
        match self {
            Block::Heading(_) => 10,
            Block::Total(_) => 8,
            Block::Text(_) | Block::Bullet(_) | Block::Detail(_) | Block::Note(_) => 5,
            Block::Spacer => 5,
        }
    }

    pub fn text(&self) -> String {
        match self {
            Block::Heading(text) | Block::Text(text) | Block::Total(text) | Block::Note(text) => {
                text.clone()
            }
            Block::Bullet(text) => format!("• {}", text),
            Block::Detail(text) => format!("  - {}", text),
            Block::Spacer => String::new(),
        }
    }

    fn css_class(&self) -> &'static str {
        match self {
            Block::Heading(_) => "heading",
            Block::Text(_) => "text",
            Block::Bullet(_) => "bullet",
            Block::Detail(_) => "detail",
            Block::Total(_) => "total",
            Block::Note(_) => "note",
            Block::Spacer => "spacer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteDocument {
    pub title: String,
    pub file_name: String,
    pub generated_on: NaiveDate,
    pub logo: Option<Logo>,
    pub pages: Vec<Page>,
    pub footer: Vec<String>,
}

struct LineView {
    class: &'static str,
    text: String,
}

struct PageView {
    number: usize,
    lines: Vec<LineView>,
}

struct LogoView {
    data_uri: String,
    width: f32,
    height: f32,
}

#[derive(Template)]
#[template(path = "quote_document.html")]
struct QuoteDocumentTemplate<'a> {
    title: &'a str,
    generated_on: String,
    logo: Option<LogoView>,
    pages: Vec<PageView>,
    page_count: usize,
    footer: &'a [String],
}

impl QuoteDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn generated_on_text(&self) -> String {
        format!("Generated on: {}", self.generated_on.format("%m/%d/%Y"))
    }

    /// Plain text rendering, pages separated by a form feed
    pub fn to_text(&self) -> String {
        let pages: Vec<String> = self
            .pages
            .iter()
            .map(|page| {
                let mut lines = Vec::new();
                if page.number == 1 {
                    lines.push(self.title.clone());
                    lines.push(self.generated_on_text());
                    lines.push(String::new());
                }
                lines.extend(page.blocks.iter().map(Block::text));
                lines.push(String::new());
                lines.extend(self.footer.iter().cloned());
                lines.push(format!("Page {} of {}", page.number, self.page_count()));
                lines.join("\n")
            })
            .collect();
        pages.join("\n\x0c\n")
    }

    /// Standalone HTML document with one section per page
    pub fn to_html(&self) -> Result<String, RenderError> {
        let template = QuoteDocumentTemplate {
            title: &self.title,
            generated_on: self.generated_on_text(),
            logo: self.logo.as_ref().map(|logo| LogoView {
                data_uri: logo.data_uri(),
                width: logo.width,
                height: logo.height,
            }),
            pages: self
                .pages
                .iter()
                .map(|page| PageView {
                    number: page.number,
                    lines: page
                        .blocks
                        .iter()
                        .map(|block| LineView {
                            class: block.css_class(),
                            text: block.text(),
                        })
                        .collect(),
                })
                .collect(),
            page_count: self.page_count(),
            footer: &self.footer,
        };
        Ok(template.render()?)
    }
}

/// Lays quote content out into pages
#[derive(Debug, Clone)]
pub struct DocumentExporter {
    branding: Branding,
    page_height: u32,
}

/// Space above the body on every page
const TOP_MARGIN: u32 = 20;
/// Space reserved for the title block on the first page
const TITLE_HEIGHT: u32 = 25;
/// Space reserved for the contact footer
const FOOTER_HEIGHT: u32 = 30;

impl DocumentExporter {
    /// Exporter with A4-sized pages (297 units)
    pub fn new(branding: Branding) -> Self {
        Self {
            branding,
            page_height: 297,
        }
    }

    pub fn with_page_height(mut self, page_height: u32) -> Self {
        self.page_height = page_height;
        self
    }

    pub fn branding(&self) -> &Branding {
        &self.branding
    }

    /// Build the quote document from a priced outcome.
    ///
    /// Every value shown comes from the priced result, so the document always
    /// matches the pricing. A logo that fails to load is logged and skipped.
    pub fn export(
        &self,
        engine: &PricingEngine,
        outcome: &QuoteOutcome,
        generated_on: NaiveDate,
        logo: Option<&dyn LogoSource>,
    ) -> Result<QuoteDocument, ExportError> {
        let result = outcome.priced().ok_or(ExportError::NotPriced)?;
        let blocks = self.content(engine, result);
        let pages = self.paginate(blocks);
        debug!(pages = pages.len(), "Quote document laid out");

        Ok(QuoteDocument {
            title: self.branding.title.clone(),
            file_name: self.branding.file_name.clone(),
            generated_on,
            logo: logo.and_then(load_logo),
            pages,
            footer: self.branding.contact_lines.clone(),
        })
    }

    fn content(&self, engine: &PricingEngine, result: &QuoteResult) -> Vec<Block> {
        let rates = engine.rates();
        let tier = result.tier;
        let yes_no = |flag: bool| if flag { "Yes" } else { "No" };
        let mut blocks = Vec::new();

        blocks.push(Block::Heading("Environment Details".to_string()));
        blocks.push(Block::Text(format!("Users: {}", result.user_count)));
        blocks.push(Block::Text(format!("Devices: {}", result.device_count)));
        blocks.push(Block::Text(format!("Emails: {}", result.email_count)));
        blocks.push(Block::Text(format!(
            "Server Protection: {}",
            yes_no(result.server_protection)
        )));
        blocks.push(Block::Text(format!(
            "Server Backup: {}",
            result.server_backup_label.as_deref().unwrap_or("None")
        )));
        let msp_hours = if result.include_msp {
            format_quantity(result.msp_hours)
        } else {
            "None".to_string()
        };
        blocks.push(Block::Text(format!("MSP Hours: {}", msp_hours)));
        blocks.push(Block::Spacer);

        blocks.push(Block::Heading(format!("Selected Plan: {}", tier.display_name())));
        blocks.push(Block::Text("Included Features:".to_string()));
        for feature in &rates.base_features {
            blocks.push(Block::Bullet(feature.clone()));
        }
        let included = rates
            .included_features
            .get(tier)
            .iter()
            .filter_map(|id| rates.bolt_on(id))
            .chain(
                rates
                    .included_advanced_security
                    .get(tier)
                    .iter()
                    .filter_map(|id| rates.advanced_security_item(id)),
            );
        for feature in included {
            blocks.push(Block::Bullet(feature.label.clone()));
        }

        let selected: Vec<&str> = result
            .charged_bolt_ons
            .iter()
            .filter_map(|id| rates.bolt_on(id))
            .chain(
                result
                    .charged_advanced_security
                    .iter()
                    .filter_map(|id| rates.advanced_security_item(id)),
            )
            .map(|feature| feature.label.as_str())
            .collect();
        if !selected.is_empty() {
            blocks.push(Block::Spacer);
            blocks.push(Block::Text("Selected Additional Options:".to_string()));
            for label in selected {
                blocks.push(Block::Bullet(label.to_string()));
            }
        }

        let labor_hours = *rates.fixed_labor_hours.get(tier);
        let report_hours = (labor_hours - REVIEW_MEETING_HOURS).max(Decimal::ZERO);
        blocks.push(Block::Spacer);
        blocks.push(Block::Text("Fixed Monthly Labor:".to_string()));
        blocks.push(Block::Bullet(format!(
            "{} Hours Total:",
            format_quantity(labor_hours)
        )));
        blocks.push(Block::Detail("Security Review Meeting (30 minutes)".to_string()));
        blocks.push(Block::Detail(format!(
            "Deliverables & Reports ({} hours)",
            format_quantity(report_hours)
        )));
        blocks.push(Block::Spacer);

        let breakdown = Breakdown::build(result, engine);
        blocks.push(Block::Heading("Pricing Breakdown".to_string()));
        for line in breakdown.line_texts() {
            blocks.push(Block::Text(line));
        }
        blocks.push(Block::Total(breakdown.total_text()));

        if result.include_msp {
            blocks.push(Block::Note(format!(
                "Note: Any additional hours generated through support tickets will be billed at the discounted rate of ${}/hour.",
                format_quantity(rates.msp_hourly_rate)
            )));
        }

        blocks
    }

    /// Split blocks into pages, keeping each block whole.
    ///
    /// A block taller than an empty page still gets a page of its own.
    fn paginate(&self, blocks: Vec<Block>) -> Vec<Page> {
        let body = self.page_height.saturating_sub(TOP_MARGIN + FOOTER_HEIGHT);
        let mut pages = vec![Page {
            number: 1,
            blocks: Vec::new(),
        }];
        let mut used = TITLE_HEIGHT;

        for block in blocks {
            let height = block.height();
            let fits = used + height <= body;
            let page_is_empty = pages.last().map_or(true, |p| p.blocks.is_empty());

            // Spacers are dropped at page breaks
            if block == Block::Spacer && (!fits || (page_is_empty && pages.len() > 1)) {
                continue;
            }
            if !fits && !page_is_empty {
                pages.push(Page {
                    number: pages.len() + 1,
                    blocks: Vec::new(),
                });
                used = 0;
            }
            used += height;
            if let Some(page) = pages.last_mut() {
                page.blocks.push(block);
            }
        }

        pages
    }
}

impl Default for DocumentExporter {
    fn default() -> Self {
        Self::new(Branding::default())
    }
}

fn load_logo(source: &dyn LogoSource) -> Option<Logo> {
    let bytes = match source.load() {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Quote logo unavailable, exporting without it: {}", e);
            return None;
        }
    };

    match Logo::decode(bytes) {
        Ok(logo) => Some(logo),
        Err(e) => {
            warn!("Quote logo could not be used, exporting without it: {}", e);
            None
        }
    }
}
