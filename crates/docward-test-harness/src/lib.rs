//! # docward-test-harness
//!
//! Fixtures for exercising docward policies without a real repository:
//!
//! - [`InMemoryDocument`]: a [`Document`](docward_types::Document) built from
//!   literal values, with optional injected read failures
//! - [`StaticDirectory`]: a [`MembershipOracle`](docward_types::MembershipOracle)
//!   over a fixed user/group table, with call counting and an outage switch
//! - [`InMemoryRepository`]: runs listing queries over a set of documents
//!
//! ```ignore
//! let repo: InMemoryRepository = [
//!     InMemoryDocument::new("d1", "File").with_text("dc:rights", "GROUP2"),
//!     InMemoryDocument::new("d2", "File"),
//! ]
//! .into_iter()
//! .collect();
//!
//! let directory = StaticDirectory::new().with_user("user1", ["GROUP2"]);
//! ```

mod directory;
mod document;
mod repository;

pub use directory::StaticDirectory;
pub use document::InMemoryDocument;
pub use repository::InMemoryRepository;
