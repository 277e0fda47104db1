pub mod ai_classifier;
pub mod category_registry;
pub mod extractor;
pub mod keyword_classifier;

pub use ai_classifier::{AiClassifier, ClassifyOutcome};
pub use category_registry::CategoryRegistry;
pub use extractor::{ExtractorRegistry, TextExtractor};
pub use keyword_classifier::{classify_by_filename, KeywordTable};
