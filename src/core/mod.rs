//! Conversion core: value labels, dates, headers, and the pipeline tying them together

pub mod dates;
pub mod headers;
pub mod labels;
pub mod pipeline;

pub use dates::DateNormalizer;
pub use headers::map_headers;
pub use labels::LabelResolver;
pub use pipeline::{convert_file, transform, ConversionReport, Pipeline, PipelineStage, Transformed};
