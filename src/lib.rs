pub mod boundary;
pub mod browser;
pub mod config;
pub mod element;
pub mod error;
pub mod executor;
pub mod extract;
pub mod field;
pub mod instructions;
pub mod mapper;
pub mod page;
pub mod patterns;
pub mod profile;
pub mod scrape;
pub mod surface;

pub use browser::{Browser, SessionHandle};
pub use config::{AutofillOptions, BrowserBuilder, BrowserConfig, ScrapeConfig};
pub use error::{Error, Result};
pub use executor::{autofill, AutofillRequest, AutofillResult, Autofiller, ExecutionState, FillMetrics};
pub use extract::{extract_fields, extract_form, ExtractedForm};
pub use field::{FieldDescriptor, FieldKind, FieldOption};
pub use instructions::{generate_instructions, FillInstruction, FillMethod, InstructionSet};
pub use mapper::{map_fields, FieldMapping, MappingResult, MatchSource};
pub use page::Page;
pub use patterns::FieldCategory;
pub use profile::{FlatProfile, ProfileStore, UserProfile};
pub use scrape::{scrape_rendered, ScrapedForm, Scraper};
pub use surface::FormSurface;
