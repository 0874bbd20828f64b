#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod generate;
pub mod indexing;
pub mod pipeline;
pub mod prompt;
pub mod router;

pub use generate::{ExtractiveGenerator, RemoteGenerator};
pub use pipeline::Pipeline;
pub use prompt::PromptBuilder;
pub use router::Router;
