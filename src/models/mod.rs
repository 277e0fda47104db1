pub mod category;
pub mod listing;
pub mod report;
pub mod upload;

pub use category::{
    CategoryStats, ClassificationMethod, ClassifiedFile, OTHER_LABEL, PREDEFINED_CATEGORIES,
    UNCLASSIFIED,
};
pub use listing::{sort_listings, FileListing, SortKey, SortOrder};
pub use report::BatchReport;
pub use upload::{UploadFile, UploadSource};
