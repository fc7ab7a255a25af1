pub mod catalog;
pub mod commands;
pub mod context;
pub mod error;
pub mod menus;
pub mod parse;
pub mod router;
pub mod table;

#[cfg(test)]
mod testing;

pub use catalog::{ArchiveCatalog, Catalog, CatalogError, CatalogFile, CatalogItem};
pub use context::{CommandContext, Services};
pub use error::{CommandError, Result};
pub use parse::{parse, ParsedCommand};
pub use router::{CommandRouter, RouteOutcome};
pub use table::{spec_of, Category, CommandId, CommandSpec, CommandTable, COMMANDS};
