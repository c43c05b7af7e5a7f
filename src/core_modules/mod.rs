pub mod color_summarizer;
pub mod image_resolver;
pub mod outcome_sink;
pub mod pixel;
pub mod reference_source;
