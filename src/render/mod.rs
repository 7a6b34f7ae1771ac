//! Turning accumulated assistant text into structured elements.

pub mod element;
pub mod incremental;
pub mod policy;
pub mod scanner;
pub mod session;

pub use element::MessageElement;
pub use incremental::{ColorScheme, Finality, IncrementalParser, ParseMode};
pub use policy::{LargeMessagePolicy, RenderPlan};
pub use scanner::{scan_document, BlockScanner, Closing, ScanOptions};
pub use session::{RenderSession, RenderSnapshot};
