mod lending_store;
mod store;

pub use store::InMemoryStore;
