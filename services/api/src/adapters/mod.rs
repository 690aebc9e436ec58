pub mod db;
pub mod generator_llm;
pub mod memory;

pub use db::DbAdapter;
pub use generator_llm::OpenAiGeneratorAdapter;
pub use memory::InMemoryStore;
