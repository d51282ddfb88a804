//! Core types for piiscrub

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Axis-aligned rectangle in page coordinates (points)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    /// Create a new bounding box
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Zero-area, inverted, or non-finite boxes cannot be located on a page
    pub fn is_degenerate(&self) -> bool {
        let finite = [self.x0, self.y0, self.x1, self.y1]
            .iter()
            .all(|v| v.is_finite());
        !finite || self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Smallest box covering both boxes
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Whether the boxes overlap or lie within `tolerance` of each other.
    ///
    /// Touching edges count as intersecting.
    pub fn intersects(&self, other: &BBox, tolerance: f64) -> bool {
        self.x0 <= other.x1 + tolerance
            && other.x0 <= self.x1 + tolerance
            && self.y0 <= other.y1 + tolerance
            && other.y0 <= self.y1 + tolerance
    }

    /// Whether `other` lies fully inside this box
    pub fn contains(&self, other: &BBox) -> bool {
        const EPS: f64 = 1e-6;
        other.x0 >= self.x0 - EPS
            && other.y0 >= self.y0 - EPS
            && other.x1 <= self.x1 + EPS
            && other.y1 <= self.y1 + EPS
    }

    /// Text runs left-to-right when the box is at least as wide as it is tall
    pub fn is_horizontal(&self) -> bool {
        self.width() >= self.height()
    }

    /// Sub-box covering the `[start, end)` fraction of this box along its dominant axis
    pub fn slice(&self, start: f64, end: f64) -> BBox {
        let start = start.clamp(0.0, 1.0);
        let end = end.clamp(start, 1.0);
        if self.is_horizontal() {
            let w = self.width();
            BBox::new(self.x0 + w * start, self.y0, self.x0 + w * end, self.y1)
        } else {
            let h = self.height();
            BBox::new(self.x0, self.y0 + h * start, self.x1, self.y0 + h * end)
        }
    }

    /// Whether two boxes sit on the same visual line.
    ///
    /// Horizontal text shares a line when the vertical overlap covers at least
    /// half of the shorter box; vertical text is checked on the x axis.
    pub fn same_line(&self, other: &BBox) -> bool {
        let (a0, a1, b0, b1) = if self.is_horizontal() && other.is_horizontal() {
            (self.y0, self.y1, other.y0, other.y1)
        } else {
            (self.x0, self.x1, other.x0, other.x1)
        };
        let overlap = a1.min(b1) - a0.max(b0);
        let shorter = (a1 - a0).min(b1 - b0);
        shorter > 0.0 && overlap >= shorter * 0.5
    }

    /// Horizontal gap between this box and a box to its right (negative when overlapping)
    pub fn horizontal_gap(&self, next: &BBox) -> f64 {
        next.x0 - self.x1
    }
}

/// A contiguous piece of page text as produced by the document extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    /// Extracted text content
    pub content: String,

    /// Bounding box of the fragment on its page
    pub bbox: BBox,

    /// Page number this fragment belongs to
    pub page: u32,

    /// Reading-order index assigned by the extractor
    pub order_index: u32,
}

impl TextFragment {
    /// Create a new text fragment
    pub fn new(content: impl Into<String>, bbox: BBox, page: u32, order_index: u32) -> Self {
        Self {
            content: content.into(),
            bbox,
            page,
            order_index,
        }
    }
}

/// All fragments extracted from one page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page: u32,

    #[serde(default)]
    pub fragments: Vec<TextFragment>,
}

impl PageLayout {
    pub fn new(page: u32, fragments: Vec<TextFragment>) -> Self {
        Self { page, fragments }
    }

    /// Whether any fragment carries non-whitespace text
    pub fn has_text(&self) -> bool {
        self.fragments
            .iter()
            .any(|f| !f.content.trim().is_empty())
    }
}

/// Extractor output for a whole document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentLayout {
    /// Page count reported by the extractor
    #[serde(default)]
    pub page_count: u32,

    pub pages: Vec<PageLayout>,
}

impl DocumentLayout {
    pub fn new(pages: Vec<PageLayout>) -> Self {
        Self {
            page_count: pages.len() as u32,
            pages,
        }
    }

    /// Load a layout from its JSON representation
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether the document has any extractable text at all
    pub fn has_text(&self) -> bool {
        self.pages.iter().any(PageLayout::has_text)
    }
}

/// Category of personally identifiable information.
///
/// Adding a category means adding a variant here, a synonym in
/// [`PiiType::from_label`], and (optionally) a pattern plus validator in
/// the detectors' pattern registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiType {
    Name,
    Email,
    Phone,
    Address,
    NationalId,
    DateOfBirth,
    CreditCard,
    BankAccount,
    IpAddress,
    DeviceId,
    Itinerary,
    OrderId,
    Passport,
    DriverLicense,
    TaxId,
    Username,
    Url,
    LicensePlate,
    /// Classifier labels with no dedicated category
    Other,
}

impl PiiType {
    pub const ALL: [PiiType; 19] = [
        PiiType::Name,
        PiiType::Email,
        PiiType::Phone,
        PiiType::Address,
        PiiType::NationalId,
        PiiType::DateOfBirth,
        PiiType::CreditCard,
        PiiType::BankAccount,
        PiiType::IpAddress,
        PiiType::DeviceId,
        PiiType::Itinerary,
        PiiType::OrderId,
        PiiType::Passport,
        PiiType::DriverLicense,
        PiiType::TaxId,
        PiiType::Username,
        PiiType::Url,
        PiiType::LicensePlate,
        PiiType::Other,
    ];

    /// Stable snake_case label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::NationalId => "national_id",
            Self::DateOfBirth => "date_of_birth",
            Self::CreditCard => "credit_card",
            Self::BankAccount => "bank_account",
            Self::IpAddress => "ip_address",
            Self::DeviceId => "device_id",
            Self::Itinerary => "itinerary",
            Self::OrderId => "order_id",
            Self::Passport => "passport",
            Self::DriverLicense => "driver_license",
            Self::TaxId => "tax_id",
            Self::Username => "username",
            Self::Url => "url",
            Self::LicensePlate => "license_plate",
            Self::Other => "other",
        }
    }

    /// Map a free-form label (as returned by a semantic classifier) onto a category.
    ///
    /// Unknown labels map to [`PiiType::Other`] so that the text is still redacted.
    pub fn from_label(label: &str) -> PiiType {
        let key: String = label
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();

        match key.as_str() {
            "name" | "full_name" | "first_name" | "last_name" | "person" | "person_name"
            | "nickname" | "initials" => Self::Name,
            "email" | "email_address" | "e_mail" => Self::Email,
            "phone" | "phone_number" | "telephone" | "mobile" | "fax" | "fax_number" => {
                Self::Phone
            }
            "address" | "physical_address" | "street_address" | "postal_address"
            | "postal_code" | "zip_code" | "location" => Self::Address,
            "national_id" | "ssn" | "social_security_number" | "national_id_number"
            | "id_number" | "identity_number" => Self::NationalId,
            "date_of_birth" | "dob" | "birth_date" | "birthdate" => Self::DateOfBirth,
            "credit_card" | "credit_card_number" | "card_number" => Self::CreditCard,
            "bank_account" | "iban" | "bank_account_number" | "account_number" => {
                Self::BankAccount
            }
            "ip_address" | "ip" | "ipv4" | "ipv6" => Self::IpAddress,
            "device_id" | "device_identifier" | "imei" | "mac_address" | "cookie_id" => {
                Self::DeviceId
            }
            "itinerary" | "flight" | "flight_number" | "travel_itinerary" => Self::Itinerary,
            "order_id" | "order_number" | "booking_code" | "booking_reference"
            | "reservation_code" | "invoice_number" | "transaction_id" | "customer_id"
            | "reference_number" | "membership_number" | "loyalty_number" => Self::OrderId,
            "passport" | "passport_number" => Self::Passport,
            "driver_license" | "drivers_license" | "driving_licence" | "driver_license_number" => {
                Self::DriverLicense
            }
            "tax_id" | "tax_identification_number" | "tin" | "vat_number" => Self::TaxId,
            "username" | "user_name" | "handle" | "social_media_handle" => Self::Username,
            "url" | "personal_url" | "website" => Self::Url,
            "license_plate" | "vehicle_registration" | "plate_number" => Self::LicensePlate,
            _ => Self::Other,
        }
    }

    /// Machine-formatted identifiers whose separators carry no meaning
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            Self::Phone
                | Self::NationalId
                | Self::CreditCard
                | Self::BankAccount
                | Self::IpAddress
                | Self::DeviceId
                | Self::OrderId
                | Self::Passport
                | Self::DriverLicense
                | Self::TaxId
                | Self::LicensePlate
        )
    }

    /// Built-in edit-distance budget as a fraction of the normalized text length
    pub fn default_max_edit_ratio(&self) -> f64 {
        match self {
            Self::Phone
            | Self::NationalId
            | Self::CreditCard
            | Self::BankAccount
            | Self::IpAddress
            | Self::DeviceId
            | Self::OrderId
            | Self::Passport
            | Self::DriverLicense
            | Self::TaxId
            | Self::LicensePlate
            | Self::Email => 0.05,
            Self::DateOfBirth | Self::Username | Self::Url => 0.1,
            Self::Name | Self::Itinerary | Self::Other => 0.2,
            Self::Address => 0.25,
        }
    }
}

impl fmt::Display for PiiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PiiType {
    type Err = crate::Error;

    /// Strict parse of a snake_case label, used for configuration keys
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PiiType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| crate::Error::config(format!("unknown PII type '{}'", s)))
    }
}

/// Half-open byte range into a page's normalized text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether two half-open ranges share at least one position
    pub fn intersects(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

/// Where a candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Regex,
    Semantic,
}

/// A possible PII span found on one page, prior to reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Position of this candidate in the page's candidate list
    pub id: usize,

    #[serde(rename = "type")]
    pub pii_type: PiiType,

    pub text: String,

    /// Byte offset into the page text
    pub start: usize,

    /// Exclusive byte offset into the page text
    pub end: usize,

    pub source: CandidateSource,

    /// Confidence score (0.0-1.0)
    pub confidence: f32,

    /// Whether the type's validator accepted the text
    pub valid: bool,
}

impl Candidate {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

/// An authoritative PII instance ready to be located on its page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub pii_type: PiiType,

    pub text: String,

    pub page: u32,

    /// Offsets into the page text, when traceable back to extraction
    pub span_hint: Option<Span>,
}

impl Entity {
    /// An entity anchored to page-text offsets
    pub fn anchored(pii_type: PiiType, text: impl Into<String>, page: u32, span: Span) -> Self {
        Self {
            pii_type,
            text: text.into(),
            page,
            span_hint: Some(span),
        }
    }

    /// An entity known only by its text
    pub fn unanchored(pii_type: PiiType, text: impl Into<String>, page: u32) -> Self {
        Self {
            pii_type,
            text: text.into(),
            page,
            span_hint: None,
        }
    }
}

/// A bounding box slated for redaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub page: u32,

    pub bbox: BBox,

    /// Every entity type whose area contributed to this region
    pub entity_types: BTreeSet<PiiType>,
}

impl Region {
    pub fn new(page: u32, bbox: BBox, entity_type: PiiType) -> Self {
        let mut entity_types = BTreeSet::new();
        entity_types.insert(entity_type);
        Self {
            page,
            bbox,
            entity_types,
        }
    }

    /// Fold another region into this one
    pub fn absorb(&mut self, other: &Region) {
        self.bbox = self.bbox.union(&other.bbox);
        self.entity_types.extend(other.entity_types.iter().copied());
    }
}
